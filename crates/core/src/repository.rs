use std::collections::BTreeMap;

use eyre::Result;

use crate::models::{Schedule, ScheduleId};

/// Persistence collaborator for schedules.
///
/// Implementations store one record per schedule under the schedule's
/// storage file name. A record that is malformed or fails validation is left
/// out of [`ScheduleRepository::load_all`] without failing the batch.
pub trait ScheduleRepository {
    fn load_all(&self) -> Result<BTreeMap<ScheduleId, Schedule>>;

    /// Writes the schedule under its current file name.
    fn save(&self, schedule: &Schedule) -> Result<()>;

    /// Removes the schedule's backing record, if there is one.
    fn delete(&self, schedule: &Schedule) -> Result<()>;

    /// File name for `name` that collides with no existing record:
    /// `name.json`, then `name-0.json`, `name-1.json`, ...
    fn generate_file_name(&self, name: &str) -> Result<String>;
}
