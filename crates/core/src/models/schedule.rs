use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::timeslot::{Timeslot, TimeslotId};
use crate::errors::{PlannerError, PlannerResult};

static NEXT_SCHEDULE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique schedule identifier. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScheduleId(u64);

impl ScheduleId {
    fn next() -> Self {
        Self(NEXT_SCHEDULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lookup structures derived from the owned timeslot list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ScheduleIndex {
    built: bool,
    by_date: BTreeMap<NaiveDate, Vec<TimeslotId>>,
    by_id: HashMap<TimeslotId, usize>,
    active_repeats: Vec<TimeslotId>,
    elapsed_repeats: Vec<TimeslotId>,
}

/// Read-only copy of a schedule's derived indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSnapshot {
    pub by_date: BTreeMap<NaiveDate, Vec<TimeslotId>>,
    pub ids: Vec<TimeslotId>,
    pub active_repeats: Vec<TimeslotId>,
    pub elapsed_repeats: Vec<TimeslotId>,
}

/// Named collection of timeslots plus the indices used to answer range
/// queries.
///
/// The timeslot list is the single source of truth. Every mutation goes
/// through methods that keep the indices in step with it; the list itself is
/// never handed out mutably.
#[derive(Debug)]
pub struct Schedule {
    id: ScheduleId,
    name: String,
    file_name: String,
    show: bool,
    timeslots: Vec<Timeslot>,
    index: ScheduleIndex,
}

impl Schedule {
    /// Empty, visible schedule.
    pub fn new(name: impl Into<String>, file_name: impl Into<String>) -> Self {
        let mut schedule = Self {
            id: ScheduleId::next(),
            name: name.into(),
            file_name: file_name.into(),
            show: true,
            timeslots: Vec::new(),
            index: ScheduleIndex::default(),
        };
        schedule.rebuild_index(Utc::now());
        schedule
    }

    /// Rebuilds a schedule from stored fields, validating it and building its
    /// indices. A missing timeslot list or any invalid timeslot rejects the
    /// whole schedule.
    pub fn restore(
        name: impl Into<String>,
        file_name: impl Into<String>,
        show: bool,
        timeslots: Option<Vec<Timeslot>>,
    ) -> PlannerResult<Self> {
        Self::restore_at(name, file_name, show, timeslots, Utc::now())
    }

    pub fn restore_at(
        name: impl Into<String>,
        file_name: impl Into<String>,
        show: bool,
        timeslots: Option<Vec<Timeslot>>,
        now: DateTime<Utc>,
    ) -> PlannerResult<Self> {
        let name = name.into();
        let timeslots = timeslots.ok_or_else(|| {
            PlannerError::Validation(format!("Schedule '{}' has no timeslot list", name))
        })?;

        let mut schedule = Self {
            id: ScheduleId::next(),
            name,
            file_name: file_name.into(),
            show,
            timeslots,
            index: ScheduleIndex::default(),
        };

        if !schedule.validate_at(now) {
            return Err(PlannerError::Validation(format!(
                "Schedule '{}' contains an invalid timeslot",
                schedule.name
            )));
        }

        Ok(schedule)
    }

    pub fn id(&self) -> ScheduleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Storage file name, kept apart from the display name so renames can
    /// pick a fresh, collision-free file.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    pub fn show(&self) -> bool {
        self.show
    }

    pub fn set_show(&mut self, show: bool) {
        self.show = show;
    }

    /// Timeslots in insertion order.
    pub fn timeslots(&self) -> &[Timeslot] {
        &self.timeslots
    }

    pub fn timeslot(&self, id: TimeslotId) -> Option<&Timeslot> {
        self.index.by_id.get(&id).map(|&pos| &self.timeslots[pos])
    }

    pub fn add_timeslot(&mut self, timeslot: Timeslot) -> TimeslotId {
        self.add_timeslot_at(timeslot, Utc::now())
    }

    /// Appends a timeslot and indexes it. Repeats are classified as active or
    /// elapsed against `now` once, here.
    pub fn add_timeslot_at(&mut self, mut timeslot: Timeslot, now: DateTime<Utc>) -> TimeslotId {
        timeslot.set_schedule_id(self.id);
        let id = timeslot.id();
        self.timeslots.push(timeslot);
        self.index_timeslot(self.timeslots.len() - 1, now);
        id
    }

    pub fn remove_timeslot(&mut self, id: TimeslotId) -> Option<Timeslot> {
        self.remove_timeslot_at(id, Utc::now())
    }

    /// Removes a timeslot from the list and from every index. Returns `None`
    /// when no timeslot has that id.
    pub fn remove_timeslot_at(&mut self, id: TimeslotId, now: DateTime<Utc>) -> Option<Timeslot> {
        let pos = self.timeslots.iter().position(|t| t.id() == id)?;

        self.unindex_timeslot(pos, now);
        let removed = self.timeslots.remove(pos);

        for slot in self.index.by_id.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }

        Some(removed)
    }

    pub fn update_timeslot<F>(&mut self, id: TimeslotId, update: F) -> PlannerResult<()>
    where
        F: FnOnce(&mut Timeslot),
    {
        self.update_timeslot_at(id, update, Utc::now())
    }

    /// Mutates a timeslot in place, re-indexing it afterwards so a new start
    /// date or repeat setting is reflected in range queries.
    pub fn update_timeslot_at<F>(
        &mut self,
        id: TimeslotId,
        update: F,
        now: DateTime<Utc>,
    ) -> PlannerResult<()>
    where
        F: FnOnce(&mut Timeslot),
    {
        let pos = *self
            .index
            .by_id
            .get(&id)
            .ok_or_else(|| PlannerError::timeslot_not_found(id))?;

        self.unindex_timeslot(pos, now);
        update(&mut self.timeslots[pos]);
        self.timeslots[pos].set_schedule_id(self.id);
        self.index_timeslot(pos, now);

        Ok(())
    }

    /// Flips the activation latch of one timeslot. Does not touch the indices.
    pub(crate) fn take_newly_active(&mut self, id: TimeslotId, now: DateTime<Utc>) -> bool {
        match self.index.by_id.get(&id) {
            Some(&pos) => self.timeslots[pos].is_newly_active_at(now),
            None => false,
        }
    }

    pub fn timeslots_in_range<Tz: TimeZone, Tz2: TimeZone>(
        &self,
        range_start: DateTime<Tz>,
        range_end: DateTime<Tz2>,
    ) -> BTreeMap<NaiveDate, Vec<&Timeslot>> {
        self.timeslots_in_range_at(range_start, range_end, Utc::now())
    }

    /// Every occurrence between `range_start` and `range_end`, keyed by UTC
    /// date. Within a date, entries appear in discovery order: one-off
    /// timeslots, then active repeats, then elapsed repeats.
    ///
    /// Elapsed repeats are only consulted when the range does not start in
    /// the future.
    pub fn timeslots_in_range_at<Tz: TimeZone, Tz2: TimeZone>(
        &self,
        range_start: DateTime<Tz>,
        range_end: DateTime<Tz2>,
        now: DateTime<Utc>,
    ) -> BTreeMap<NaiveDate, Vec<&Timeslot>> {
        let range_start = range_start.with_timezone(&Utc);
        let range_end = range_end.with_timezone(&Utc);
        let mut result: BTreeMap<NaiveDate, Vec<&Timeslot>> = BTreeMap::new();

        if range_start > range_end {
            return result;
        }

        for (date, ids) in self
            .index
            .by_date
            .range(range_start.date_naive()..=range_end.date_naive())
        {
            let entries = result.entry(*date).or_default();
            entries.extend(ids.iter().filter_map(|id| self.timeslot(*id)));
        }

        let mut expand = |ids: &[TimeslotId]| {
            for timeslot in ids.iter().filter_map(|id| self.timeslot(*id)) {
                for date in timeslot.occurrence_dates_in_range(range_start, range_end) {
                    let entries = result.entry(date).or_default();
                    // sub-day intervals land on the same date more than once
                    if entries.last().is_none_or(|last| last.id() != timeslot.id()) {
                        entries.push(timeslot);
                    }
                }
            }
        };

        expand(&self.index.active_repeats);

        if range_start <= now {
            expand(&self.index.elapsed_repeats);
        }

        result
    }

    pub fn validate(&mut self) -> bool {
        self.validate_at(Utc::now())
    }

    /// Checks every timeslot, re-stamps each one's owner to this schedule and
    /// builds the indices if they have not been built yet.
    pub fn validate_at(&mut self, now: DateTime<Utc>) -> bool {
        for timeslot in &mut self.timeslots {
            if !timeslot.validate() {
                return false;
            }
            timeslot.set_schedule_id(self.id);
        }

        if !self.index.built {
            self.rebuild_index(now);
        }

        true
    }

    pub fn index_snapshot(&self) -> IndexSnapshot {
        let mut ids: Vec<TimeslotId> = self.index.by_id.keys().copied().collect();
        ids.sort();

        IndexSnapshot {
            by_date: self.index.by_date.clone(),
            ids,
            active_repeats: self.index.active_repeats.clone(),
            elapsed_repeats: self.index.elapsed_repeats.clone(),
        }
    }

    fn rebuild_index(&mut self, now: DateTime<Utc>) {
        self.index = ScheduleIndex {
            built: true,
            ..ScheduleIndex::default()
        };

        for pos in 0..self.timeslots.len() {
            self.index_timeslot(pos, now);
        }

        debug!(
            "Rebuilt index for schedule {}: {} timeslots, {} active repeats, {} elapsed repeats",
            self.id,
            self.timeslots.len(),
            self.index.active_repeats.len(),
            self.index.elapsed_repeats.len()
        );
    }

    fn index_timeslot(&mut self, pos: usize, now: DateTime<Utc>) {
        let timeslot = &self.timeslots[pos];
        let id = timeslot.id();

        if !timeslot.repeat() {
            self.index
                .by_date
                .entry(timeslot.start_date())
                .or_default()
                .push(id);
        } else if timeslot.is_elapsed_at(now) {
            self.index.elapsed_repeats.push(id);
        } else {
            self.index.active_repeats.push(id);
        }

        self.index.by_id.insert(id, pos);
    }

    fn unindex_timeslot(&mut self, pos: usize, now: DateTime<Utc>) {
        let timeslot = &self.timeslots[pos];
        let id = timeslot.id();

        if !timeslot.repeat() {
            let date = timeslot.start_date();
            if let Some(ids) = self.index.by_date.get_mut(&date) {
                ids.retain(|entry| *entry != id);
                if ids.is_empty() {
                    self.index.by_date.remove(&date);
                }
            }
        } else {
            // Classification happened at insertion; the timeslot may have
            // elapsed since, so look where it would belong now first.
            let (current, other) = if timeslot.is_elapsed_at(now) {
                (&mut self.index.elapsed_repeats, &mut self.index.active_repeats)
            } else {
                (&mut self.index.active_repeats, &mut self.index.elapsed_repeats)
            };

            match current.iter().position(|entry| *entry == id) {
                Some(found) => {
                    current.remove(found);
                }
                None => other.retain(|entry| *entry != id),
            }
        }

        self.index.by_id.remove(&id);
    }
}

impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Schedule {}

impl Hash for Schedule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
