//! Notifications for timeslots that have just become active.
//!
//! Delivery (tray balloons, desktop toasts) belongs to the host; the core only
//! builds the payload and hands it to a [`Notifier`].

use chrono::DateTime;
use chrono_tz::Tz;
use eyre::Result;
use serde::Serialize;
use tracing::info;

use crate::models::{ScheduleId, Timeslot, TimeslotId};

/// Payload handed to the notification collaborator, with times converted to
/// the user's zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub schedule_id: Option<ScheduleId>,
    pub timeslot_id: TimeslotId,
    pub name: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Notification {
    pub fn from_timeslot(timeslot: &Timeslot, tz: Tz) -> Self {
        Self {
            schedule_id: timeslot.schedule_id(),
            timeslot_id: timeslot.id(),
            name: timeslot.name().unwrap_or_default().to_string(),
            start: timeslot.start_time_in(&tz),
            end: timeslot.end_time_in(&tz),
        }
    }
}

pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Notifier that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            "Timeslot '{}' is now active ({} - {})",
            notification.name,
            notification.start.format("%H:%M"),
            notification.end.format("%H:%M")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_notification_uses_local_zone() {
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap();
        let timeslot = Timeslot::with_end("Dentist", start, start + chrono::Duration::minutes(45));

        let notification = Notification::from_timeslot(&timeslot, Tz::America__New_York);

        assert_eq!(notification.name, "Dentist");
        assert_eq!(notification.schedule_id, None);
        assert_eq!(notification.start.format("%H:%M").to_string(), "04:00");
        assert_eq!(notification.end.format("%H:%M").to_string(), "04:45");
        assert!(LogNotifier.notify(&notification).is_ok());
    }

    #[test]
    fn test_notification_serializes_with_offset() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let timeslot = Timeslot::new("Lunch", start);

        let json = serde_json::to_value(Notification::from_timeslot(&timeslot, Tz::Europe__Berlin)).unwrap();

        assert_eq!(json["name"], "Lunch");
        assert_eq!(json["start"], "2026-01-15T13:00:00+01:00");
        assert_eq!(json["timeslot_id"], timeslot.id().get());
    }
}
