use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::schedule::ScheduleId;

static NEXT_TIMESLOT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique timeslot identifier. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeslotId(u64);

impl TimeslotId {
    fn next() -> Self {
        Self(NEXT_TIMESLOT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimeslotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How many additional occurrences a repeating timeslot has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatCount {
    #[default]
    Forever,
    Times(u32),
}

impl RepeatCount {
    /// Sentinel used by the on-disk schema for [`RepeatCount::Forever`].
    pub const FOREVER_SENTINEL: i32 = -1;

    /// Decodes the integer form, `-1` meaning forever. Other negative values
    /// are rejected.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            Self::FOREVER_SENTINEL => Some(Self::Forever),
            n if n >= 0 => Some(Self::Times(n.unsigned_abs())),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Forever => Self::FOREVER_SENTINEL,
            Self::Times(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }
}

/// A single, possibly repeating, scheduled event.
///
/// Start and end are held in UTC whatever zone they were supplied in.
/// Equality and hashing use the id only.
#[derive(Debug)]
pub struct Timeslot {
    id: TimeslotId,
    schedule_id: Option<ScheduleId>,
    name: Option<String>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    repeat: bool,
    repeat_interval: Duration,
    repeat_count: RepeatCount,
    activated: bool,
}

impl Timeslot {
    /// Zero-length timeslot starting (and ending) at `start_time`.
    pub fn new<Tz: TimeZone>(name: impl Into<String>, start_time: DateTime<Tz>) -> Self {
        let start_time = start_time.with_timezone(&Utc);
        Self::restore(Some(name.into()), start_time, start_time, false)
    }

    pub fn with_end<Tz: TimeZone, Tz2: TimeZone>(
        name: impl Into<String>,
        start_time: DateTime<Tz>,
        end_time: DateTime<Tz2>,
    ) -> Self {
        Self::restore(Some(name.into()), start_time, end_time, false)
    }

    /// Rebuilds a timeslot from stored fields. An end at or before the start
    /// is clamped to the start. The name may be missing; such a timeslot fails
    /// [`Timeslot::validate`].
    pub fn restore<Tz: TimeZone, Tz2: TimeZone>(
        name: Option<String>,
        start_time: DateTime<Tz>,
        end_time: DateTime<Tz2>,
        activated: bool,
    ) -> Self {
        let start_time = start_time.with_timezone(&Utc);
        let end_time = end_time.with_timezone(&Utc).max(start_time);

        Self {
            id: TimeslotId::next(),
            schedule_id: None,
            name,
            start_time,
            end_time,
            repeat: false,
            repeat_interval: Duration::zero(),
            repeat_count: RepeatCount::Forever,
            activated,
        }
    }

    /// Builder form of the three repeat setters.
    pub fn repeating(mut self, interval: Duration, count: RepeatCount) -> Self {
        self.repeat = true;
        self.repeat_interval = interval;
        self.repeat_count = count;
        self
    }

    pub fn id(&self) -> TimeslotId {
        self.id
    }

    /// Owning schedule, once the timeslot has been added to one.
    pub fn schedule_id(&self) -> Option<ScheduleId> {
        self.schedule_id
    }

    pub(crate) fn set_schedule_id(&mut self, schedule_id: ScheduleId) {
        self.schedule_id = Some(schedule_id);
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn start_time_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        self.start_time.with_timezone(tz)
    }

    pub fn start_time_local(&self) -> DateTime<Local> {
        self.start_time_in(&Local)
    }

    /// Does not re-check the end; a later start may leave `end < start`.
    pub fn set_start_time<Tz: TimeZone>(&mut self, start_time: DateTime<Tz>) {
        self.start_time = start_time.with_timezone(&Utc);
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn end_time_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Tz> {
        self.end_time.with_timezone(tz)
    }

    pub fn end_time_local(&self) -> DateTime<Local> {
        self.end_time_in(&Local)
    }

    pub fn set_end_time<Tz: TimeZone>(&mut self, end_time: DateTime<Tz>) {
        self.end_time = end_time.with_timezone(&Utc);
    }

    /// UTC calendar date of the original occurrence.
    pub fn start_date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.repeat = repeat;
    }

    pub fn repeat_interval(&self) -> Duration {
        self.repeat_interval
    }

    pub fn set_repeat_interval(&mut self, repeat_interval: Duration) {
        self.repeat_interval = repeat_interval;
    }

    pub fn repeat_count(&self) -> RepeatCount {
        self.repeat_count
    }

    pub fn set_repeat_count(&mut self, repeat_count: RepeatCount) {
        self.repeat_count = repeat_count;
    }

    pub fn activated(&self) -> bool {
        self.activated
    }

    /// Instant of the last repeat when the timeslot repeats a bounded number
    /// of times; the start otherwise. Callers check [`Timeslot::repeat`] to
    /// tell the two apart.
    pub fn final_repeat_instant(&self) -> DateTime<Utc> {
        match (self.repeat, self.repeat_count) {
            (true, RepeatCount::Times(count)) => self
                .repeat_interval
                .num_seconds()
                .checked_mul(i64::from(count))
                .and_then(Duration::try_seconds)
                .and_then(|span| self.start_time.checked_add_signed(span))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            _ => self.start_time,
        }
    }

    /// Bounded repeat whose last occurrence is before `now`.
    pub fn is_elapsed_at(&self, now: DateTime<Utc>) -> bool {
        self.repeat
            && matches!(self.repeat_count, RepeatCount::Times(_))
            && self.final_repeat_instant() < now
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now > self.start_time && now < self.end_time
    }

    pub fn is_newly_active(&mut self) -> bool {
        self.is_newly_active_at(Utc::now())
    }

    /// True the first time it is called while the timeslot is active, false
    /// ever after. The latch is only cleared by rebuilding the timeslot.
    pub fn is_newly_active_at(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active_at(now) || self.activated {
            return false;
        }

        self.activated = true;
        true
    }

    /// A timeslot is valid when it has a name. Start/end ordering is not
    /// re-checked here.
    pub fn validate(&self) -> bool {
        self.name.is_some()
    }

    /// Dates of repeat occurrences (never the original) that fall strictly
    /// after the start and in `[range_start, range_end)`.
    ///
    /// The first occurrence is found by skipping whole intervals rather than
    /// walking from the original start, so long-lived repeats stay cheap.
    pub fn repeat_occurrences_in_range<Tz: TimeZone, Tz2: TimeZone>(
        &self,
        range_start: DateTime<Tz>,
        range_end: DateTime<Tz2>,
    ) -> RepeatOccurrences {
        let range_start = range_start.with_timezone(&Utc);
        let range_end = range_end.with_timezone(&Utc);
        let interval_seconds = self.repeat_interval.num_seconds();

        if !self.repeat
            || interval_seconds <= 0
            || self.start_time > range_end
            || (matches!(self.repeat_count, RepeatCount::Times(_))
                && self.final_repeat_instant() < range_start)
        {
            return RepeatOccurrences::empty();
        }

        let elapsed_seconds = (range_start - self.start_time).num_seconds();
        let first_index = if elapsed_seconds <= 0 {
            1
        } else {
            (elapsed_seconds / interval_seconds + i64::from(elapsed_seconds % interval_seconds != 0))
                .max(1)
        };

        let next = interval_seconds
            .checked_mul(first_index)
            .and_then(Duration::try_seconds)
            .and_then(|offset| self.start_time.checked_add_signed(offset));

        let last = match self.repeat_count {
            RepeatCount::Forever => None,
            RepeatCount::Times(_) => Some(self.final_repeat_instant()),
        };

        RepeatOccurrences {
            next,
            interval: Duration::seconds(interval_seconds),
            range_end,
            last,
        }
    }

    /// Dates of every occurrence in range: the original, when its date lies in
    /// `[range_start.date, range_end.date]`, followed by the repeats.
    pub fn occurrence_dates_in_range(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> impl Iterator<Item = NaiveDate> + '_ {
        let start_date = self.start_date();
        let original = (range_start.date_naive() <= start_date
            && start_date <= range_end.date_naive())
        .then_some(start_date);

        original
            .into_iter()
            .chain(self.repeat_occurrences_in_range(range_start, range_end))
    }
}

impl PartialEq for Timeslot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Timeslot {}

impl Hash for Timeslot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Lazy, restartable sequence of repeat-occurrence dates.
///
/// Cloning the iterator restarts from the clone point; nothing is mutated.
#[derive(Debug, Clone)]
pub struct RepeatOccurrences {
    next: Option<DateTime<Utc>>,
    interval: Duration,
    range_end: DateTime<Utc>,
    last: Option<DateTime<Utc>>,
}

impl RepeatOccurrences {
    fn empty() -> Self {
        Self {
            next: None,
            interval: Duration::zero(),
            range_end: DateTime::<Utc>::MIN_UTC,
            last: None,
        }
    }
}

impl Iterator for RepeatOccurrences {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if current >= self.range_end || self.last.is_some_and(|last| current > last) {
            self.next = None;
            return None;
        }

        self.next = current.checked_add_signed(self.interval);
        Some(current.date_naive())
    }
}
