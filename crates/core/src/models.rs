pub mod schedule;
pub mod timeslot;

pub use schedule::{IndexSnapshot, Schedule, ScheduleId};
pub use timeslot::{RepeatCount, RepeatOccurrences, Timeslot, TimeslotId};
