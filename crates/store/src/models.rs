//! On-disk schema, one JSON document per schedule.
//!
//! Only user data is stored. Ids and indices are process-local and rebuilt on
//! load.

use chrono::{DateTime, Duration, Utc};
use eyre::{eyre, Result};
use planner_core::models::{RepeatCount, Schedule, Timeslot};
use serde::{Deserialize, Serialize};

use crate::schema::SCHEMA_VERSION;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSchedule {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    pub file_name: String,
    pub show: bool,
    pub timeslots: Option<Vec<StoredTimeslot>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTimeslot {
    pub name: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub repeat: bool,
    pub repeat_interval_seconds: i64,
    pub repeat_count: i32,
    pub activated: bool,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

impl From<&Timeslot> for StoredTimeslot {
    fn from(timeslot: &Timeslot) -> Self {
        Self {
            name: timeslot.name().map(str::to_string),
            start_time: timeslot.start_time(),
            end_time: timeslot.end_time(),
            repeat: timeslot.repeat(),
            repeat_interval_seconds: timeslot.repeat_interval().num_seconds(),
            repeat_count: timeslot.repeat_count().to_raw(),
            activated: timeslot.activated(),
        }
    }
}

impl From<&Schedule> for StoredSchedule {
    fn from(schedule: &Schedule) -> Self {
        Self {
            version: SCHEMA_VERSION,
            name: schedule.name().to_string(),
            file_name: schedule.file_name().to_string(),
            show: schedule.show(),
            timeslots: Some(schedule.timeslots().iter().map(StoredTimeslot::from).collect()),
        }
    }
}

impl StoredTimeslot {
    pub fn into_timeslot(self) -> Result<Timeslot> {
        let repeat_count = RepeatCount::from_raw(self.repeat_count)
            .ok_or_else(|| eyre!("Invalid repeat count {}", self.repeat_count))?;
        let repeat_interval = Duration::try_seconds(self.repeat_interval_seconds)
            .ok_or_else(|| eyre!("Invalid repeat interval {}s", self.repeat_interval_seconds))?;

        let mut timeslot = Timeslot::restore(self.name, self.start_time, self.end_time, self.activated);
        timeslot.set_repeat(self.repeat);
        timeslot.set_repeat_interval(repeat_interval);
        timeslot.set_repeat_count(repeat_count);
        Ok(timeslot)
    }
}

impl StoredSchedule {
    /// Builds a validated schedule. Fails when the version is unknown, a
    /// timeslot cannot be decoded, or the schedule does not validate.
    pub fn into_schedule(self, now: DateTime<Utc>) -> Result<Schedule> {
        if self.version > SCHEMA_VERSION {
            return Err(eyre!(
                "Unsupported schedule schema version {} (newest known is {})",
                self.version,
                SCHEMA_VERSION
            ));
        }

        let timeslots = self
            .timeslots
            .map(|stored| {
                stored
                    .into_iter()
                    .map(StoredTimeslot::into_timeslot)
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        Schedule::restore_at(self.name, self.file_name, self.show, timeslots, now)
            .map_err(eyre::Report::new)
    }
}
