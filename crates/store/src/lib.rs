//! # Planner Store
//!
//! JSON-file persistence for schedules: one file per schedule inside a data
//! directory, written in the versioned schema from [`models`].

pub mod models;
pub mod repositories;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use eyre::Result;
use planner_core::models::{Schedule, ScheduleId};
use planner_core::repository::ScheduleRepository;

use crate::repositories::schedule as files;

/// Schedule repository backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonScheduleStore {
    dir: PathBuf,
}

impl JsonScheduleStore {
    /// Opens the store, creating `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        schema::initialize_store(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_file_name_available(&self, file_name: &str) -> bool {
        files::is_file_name_available(&self.dir, file_name)
    }
}

impl ScheduleRepository for JsonScheduleStore {
    fn load_all(&self) -> Result<BTreeMap<ScheduleId, Schedule>> {
        files::load_all(&self.dir, Utc::now())
    }

    fn save(&self, schedule: &Schedule) -> Result<()> {
        files::save(&self.dir, schedule)
    }

    fn delete(&self, schedule: &Schedule) -> Result<()> {
        files::delete(&self.dir, schedule)
    }

    fn generate_file_name(&self, name: &str) -> Result<String> {
        Ok(files::generate_file_name(&self.dir, name))
    }
}
