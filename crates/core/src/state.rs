//! # Planning state
//!
//! [`PlanningState`] owns every loaded schedule, the current selection and the
//! visible six-week window, and caches the merged per-date view of all visible
//! schedules over that window.
//!
//! All mutation goes through the command methods here so the merged view is
//! recomputed whenever visible content changes. The state is meant to live on
//! one thread; the notification poll runs on that same thread.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::calendar;
use crate::clock::Clock;
use crate::errors::{PlannerError, PlannerResult};
use crate::models::{RepeatCount, Schedule, ScheduleId, Timeslot, TimeslotId};
use crate::notification::Notification;
use crate::repository::ScheduleRepository;

/// Position of one timeslot in the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeslotRef {
    pub schedule_id: ScheduleId,
    pub timeslot_id: TimeslotId,
}

/// Change published to subscribers after a command completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    ScheduleCreated(ScheduleId),
    ScheduleRenamed(ScheduleId),
    ScheduleDeleted(ScheduleId),
    TimeslotsChanged(ScheduleId),
    VisibilityChanged(ScheduleId),
    SelectionChanged(Option<ScheduleId>),
    ViewRecomputed,
}

type Listener = Box<dyn FnMut(&StateChange)>;

pub struct PlanningState {
    schedules: BTreeMap<ScheduleId, Schedule>,
    selected: Option<ScheduleId>,
    window_start: NaiveDate,
    merged: BTreeMap<NaiveDate, Vec<TimeslotRef>>,
    repository: Box<dyn ScheduleRepository>,
    clock: Arc<dyn Clock>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for PlanningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanningState")
            .field("schedules", &self.schedules.len())
            .field("selected", &self.selected)
            .field("window_start", &self.window_start)
            .field("merged_dates", &self.merged.len())
            .finish()
    }
}

impl PlanningState {
    /// Loads every schedule from `repository` and opens the window on the
    /// current month.
    pub fn load(
        repository: Box<dyn ScheduleRepository>,
        clock: Arc<dyn Clock>,
    ) -> PlannerResult<Self> {
        let schedules = repository.load_all()?;
        info!("Loaded {} schedules", schedules.len());
        Ok(Self::with_schedules(schedules, repository, clock))
    }

    pub fn with_schedules(
        schedules: BTreeMap<ScheduleId, Schedule>,
        repository: Box<dyn ScheduleRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let window_start = calendar::window_start_for(clock.now().date_naive());

        let mut state = Self {
            schedules,
            selected: None,
            window_start,
            merged: BTreeMap::new(),
            repository,
            clock,
            listeners: Vec::new(),
        };
        state.recompute_merged_view();
        state
    }

    /// Registers a listener called after every state change.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&StateChange) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn publish(&mut self, change: StateChange) {
        for listener in &mut self.listeners {
            listener(&change);
        }
    }

    // Schedules

    pub fn schedule(&self, id: ScheduleId) -> Option<&Schedule> {
        self.schedules.get(&id)
    }

    /// Schedules in creation order.
    pub fn schedules(&self) -> impl Iterator<Item = &Schedule> {
        self.schedules.values()
    }

    pub fn selected_schedule(&self) -> Option<&Schedule> {
        self.selected.and_then(|id| self.schedules.get(&id))
    }

    pub fn create_schedule(&mut self, name: &str) -> PlannerResult<ScheduleId> {
        let file_name = self.repository.generate_file_name(name)?;
        let schedule = Schedule::new(name, file_name);
        self.repository.save(&schedule)?;

        let id = schedule.id();
        info!("Created schedule {} '{}' ({})", id, name, schedule.file_name());
        self.schedules.insert(id, schedule);

        // new schedules start empty, so the merged view is unchanged
        self.publish(StateChange::ScheduleCreated(id));
        Ok(id)
    }

    /// Renames a schedule, moving it to a freshly generated file.
    pub fn rename_schedule(&mut self, id: ScheduleId, name: &str) -> PlannerResult<()> {
        let schedule = self
            .schedules
            .get(&id)
            .ok_or_else(|| PlannerError::schedule_not_found(id))?;

        self.repository.delete(schedule)?;
        let file_name = self.repository.generate_file_name(name)?;

        let schedule = self
            .schedules
            .get_mut(&id)
            .ok_or_else(|| PlannerError::schedule_not_found(id))?;
        schedule.set_name(name);
        schedule.set_file_name(file_name);
        self.repository.save(schedule)?;

        info!("Renamed schedule {} to '{}' ({})", id, name, schedule.file_name());
        self.publish(StateChange::ScheduleRenamed(id));
        Ok(())
    }

    /// Deletes a schedule and its backing file. Clears the selection if it
    /// pointed at this schedule.
    pub fn delete_schedule(&mut self, id: ScheduleId) -> PlannerResult<Schedule> {
        let schedule = self
            .schedules
            .get(&id)
            .ok_or_else(|| PlannerError::schedule_not_found(id))?;
        self.repository.delete(schedule)?;

        let schedule = self
            .schedules
            .remove(&id)
            .ok_or_else(|| PlannerError::schedule_not_found(id))?;
        info!("Deleted schedule {} '{}'", id, schedule.name());

        if self.selected == Some(id) {
            self.deselect_schedule();
        }

        self.publish(StateChange::ScheduleDeleted(id));

        if schedule.show() {
            self.recompute_merged_view();
        }

        Ok(schedule)
    }

    pub fn set_schedule_visibility(&mut self, id: ScheduleId, show: bool) -> PlannerResult<()> {
        self.schedules
            .get_mut(&id)
            .ok_or_else(|| PlannerError::schedule_not_found(id))?
            .set_show(show);

        self.publish(StateChange::VisibilityChanged(id));
        self.recompute_merged_view();
        Ok(())
    }

    pub fn select_schedule(&mut self, id: ScheduleId) -> PlannerResult<()> {
        if !self.schedules.contains_key(&id) {
            return Err(PlannerError::schedule_not_found(id));
        }

        self.selected = Some(id);
        self.publish(StateChange::SelectionChanged(Some(id)));
        Ok(())
    }

    pub fn deselect_schedule(&mut self) {
        self.selected = None;
        self.publish(StateChange::SelectionChanged(None));
    }

    /// Writes every schedule back to storage.
    pub fn save_all(&self) -> PlannerResult<()> {
        for schedule in self.schedules.values() {
            self.repository.save(schedule)?;
        }
        debug!("Saved {} schedules", self.schedules.len());
        Ok(())
    }

    // Timeslots

    pub fn timeslot(&self, schedule_id: ScheduleId, timeslot_id: TimeslotId) -> Option<&Timeslot> {
        self.schedules.get(&schedule_id)?.timeslot(timeslot_id)
    }

    /// Timeslots of all visible schedules occurring on `date` inside the
    /// visible window. Empty when there are none.
    pub fn timeslots(&self, date: NaiveDate) -> Vec<&Timeslot> {
        self.merged
            .get(&date)
            .map(|refs| {
                refs.iter()
                    .filter_map(|r| self.timeslot(r.schedule_id, r.timeslot_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn add_timeslot(
        &mut self,
        schedule_id: ScheduleId,
        timeslot: Timeslot,
    ) -> PlannerResult<TimeslotId> {
        let now = self.clock.now();
        let schedule = self
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| PlannerError::schedule_not_found(schedule_id))?;

        let id = schedule.add_timeslot_at(timeslot, now);
        let visible = schedule.show();
        debug!("Added timeslot {} to schedule {}", id, schedule_id);

        self.timeslots_changed(schedule_id, visible);
        Ok(id)
    }

    /// Moves and renames a timeslot. An end that is not after the new start
    /// collapses to the start.
    pub fn edit_timeslot(
        &mut self,
        schedule_id: ScheduleId,
        timeslot_id: TimeslotId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        name: &str,
    ) -> PlannerResult<()> {
        let end_time = end_time.max(start_time);
        self.modify_timeslot(schedule_id, timeslot_id, |timeslot| {
            timeslot.set_start_time(start_time);
            timeslot.set_end_time(end_time);
            timeslot.set_name(name);
        })
    }

    /// Changes the repeat settings of a timeslot.
    pub fn set_timeslot_repeat(
        &mut self,
        schedule_id: ScheduleId,
        timeslot_id: TimeslotId,
        repeat: bool,
        interval: Duration,
        count: RepeatCount,
    ) -> PlannerResult<()> {
        self.modify_timeslot(schedule_id, timeslot_id, |timeslot| {
            timeslot.set_repeat(repeat);
            timeslot.set_repeat_interval(interval);
            timeslot.set_repeat_count(count);
        })
    }

    fn modify_timeslot<F>(
        &mut self,
        schedule_id: ScheduleId,
        timeslot_id: TimeslotId,
        update: F,
    ) -> PlannerResult<()>
    where
        F: FnOnce(&mut Timeslot),
    {
        let now = self.clock.now();
        let schedule = self
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| PlannerError::schedule_not_found(schedule_id))?;

        schedule.update_timeslot_at(timeslot_id, update, now)?;
        let visible = schedule.show();

        self.timeslots_changed(schedule_id, visible);
        Ok(())
    }

    pub fn delete_timeslot(
        &mut self,
        schedule_id: ScheduleId,
        timeslot_id: TimeslotId,
    ) -> PlannerResult<Timeslot> {
        let now = self.clock.now();
        let schedule = self
            .schedules
            .get_mut(&schedule_id)
            .ok_or_else(|| PlannerError::schedule_not_found(schedule_id))?;

        let removed = schedule
            .remove_timeslot_at(timeslot_id, now)
            .ok_or_else(|| PlannerError::timeslot_not_found(timeslot_id))?;
        let visible = schedule.show();
        debug!("Deleted timeslot {} from schedule {}", timeslot_id, schedule_id);

        self.timeslots_changed(schedule_id, visible);
        Ok(removed)
    }

    fn timeslots_changed(&mut self, schedule_id: ScheduleId, visible: bool) {
        self.publish(StateChange::TimeslotsChanged(schedule_id));
        if visible {
            self.recompute_merged_view();
        }
    }

    // Visible window

    pub fn visible_window_start(&self) -> NaiveDate {
        self.window_start
    }

    /// Exclusive end of the window, 42 days after its start.
    pub fn visible_window_end(&self) -> NaiveDate {
        self.window_start + Duration::days(calendar::WINDOW_DAYS)
    }

    /// Month the window represents. A week-aligned window usually starts in
    /// the tail of the previous month.
    pub fn selected_month(&self) -> u32 {
        calendar::selected_month_date(self.window_start).month()
    }

    pub fn selected_month_label(&self) -> String {
        calendar::month_label(calendar::selected_month_date(self.window_start))
    }

    /// Moves the window by `delta` months and re-anchors it on the Monday on
    /// or before the first of the target month.
    pub fn shift_visible_month(&mut self, delta: i32) -> PlannerResult<()> {
        let mut anchor = self.window_start;
        if anchor.month() != self.selected_month() {
            anchor += Duration::weeks(1);
        }

        let target = calendar::shift_month(anchor, delta).ok_or_else(|| {
            PlannerError::Validation(format!("Cannot shift the calendar by {} months", delta))
        })?;

        self.window_start = calendar::start_of_week(target);
        debug!("Visible window now starts {}", self.window_start);

        self.recompute_merged_view();
        Ok(())
    }

    /// Rebuilds the merged date view from every visible schedule.
    pub fn recompute_merged_view(&mut self) {
        let now = self.clock.now();
        let range_start = calendar::start_of_day(self.window_start);
        let range_end = calendar::start_of_day(self.visible_window_end());

        let mut merged: BTreeMap<NaiveDate, Vec<TimeslotRef>> = BTreeMap::new();
        for schedule in self.schedules.values().filter(|s| s.show()) {
            for (date, timeslots) in schedule.timeslots_in_range_at(range_start, range_end, now) {
                merged
                    .entry(date)
                    .or_default()
                    .extend(timeslots.into_iter().map(|t| TimeslotRef {
                        schedule_id: schedule.id(),
                        timeslot_id: t.id(),
                    }));
            }
        }

        debug!("Merged view covers {} dates", merged.len());
        self.merged = merged;
        self.publish(StateChange::ViewRecomputed);
    }

    /// Entries of the merged view in date order.
    pub fn merged_view(&self) -> &BTreeMap<NaiveDate, Vec<TimeslotRef>> {
        &self.merged
    }

    // Notifications

    /// Timeslots in today's bucket of the merged view that have just become
    /// active. Each timeslot is reported at most once.
    pub fn poll_active_timeslots(&mut self) -> Vec<&Timeslot> {
        let refs = self.take_newly_active();
        refs.into_iter()
            .filter_map(|r| {
                self.schedules
                    .get(&r.schedule_id)
                    .and_then(|s| s.timeslot(r.timeslot_id))
            })
            .collect()
    }

    /// Polls and converts the newly active timeslots into notifications in
    /// `tz`.
    pub fn poll_notifications(&mut self, tz: Tz) -> Vec<Notification> {
        self.poll_active_timeslots()
            .into_iter()
            .map(|timeslot| Notification::from_timeslot(timeslot, tz))
            .collect()
    }

    fn take_newly_active(&mut self) -> Vec<TimeslotRef> {
        let now = self.clock.now();
        let Some(today) = self.merged.get(&now.date_naive()) else {
            return Vec::new();
        };

        let mut activated = Vec::new();
        for r in today {
            if let Some(schedule) = self.schedules.get_mut(&r.schedule_id) {
                if schedule.take_newly_active(r.timeslot_id, now) {
                    activated.push(*r);
                }
            }
        }
        activated
    }
}
