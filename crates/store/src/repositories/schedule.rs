use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use eyre::{eyre, Result, WrapErr};
use planner_core::models::{Schedule, ScheduleId};
use tracing::{debug, warn};

use crate::models::StoredSchedule;
use crate::schema::{initialize_store, FILE_EXTENSION};

/// Loads every `*.json` file in `dir`. Files that fail to parse or validate
/// are logged and skipped.
pub fn load_all(dir: &Path, now: DateTime<Utc>) -> Result<BTreeMap<ScheduleId, Schedule>> {
    initialize_store(dir)?;

    let mut schedules = BTreeMap::new();
    let entries = fs::read_dir(dir)
        .wrap_err_with(|| format!("Failed to read schedule directory {}", dir.display()))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_schedule_extension(path))
        .collect();
    paths.sort();

    for path in paths {
        match load_file(&path, now) {
            Ok(schedule) => {
                debug!("Loaded schedule '{}' from {}", schedule.name(), path.display());
                schedules.insert(schedule.id(), schedule);
            }
            Err(e) => warn!("Skipping schedule file {}: {:#}", path.display(), e),
        }
    }

    Ok(schedules)
}

/// Reads and validates one schedule file. The name of the file actually read
/// replaces whatever file name is recorded inside it.
pub fn load_file(path: &Path, now: DateTime<Utc>) -> Result<Schedule> {
    if !has_schedule_extension(path) {
        return Err(eyre!("Not a schedule file: {}", path.display()));
    }

    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let stored: StoredSchedule = serde_json::from_str(&contents)
        .wrap_err_with(|| format!("Malformed schedule file {}", path.display()))?;

    let mut schedule = stored.into_schedule(now)?;

    if let Some(actual) = path.file_name().and_then(|name| name.to_str()) {
        if actual != schedule.file_name() {
            debug!(
                "Schedule '{}' recorded file name {}, using {}",
                schedule.name(),
                schedule.file_name(),
                actual
            );
            schedule.set_file_name(actual);
        }
    }

    Ok(schedule)
}

pub fn save(dir: &Path, schedule: &Schedule) -> Result<()> {
    initialize_store(dir)?;

    let path = dir.join(schedule.file_name());
    let json = serde_json::to_string_pretty(&StoredSchedule::from(schedule))?;
    fs::write(&path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))?;

    debug!("Saved schedule '{}' to {}", schedule.name(), path.display());
    Ok(())
}

pub fn delete(dir: &Path, schedule: &Schedule) -> Result<()> {
    let path = dir.join(schedule.file_name());
    if !path.exists() {
        return Ok(());
    }

    fs::remove_file(&path).wrap_err_with(|| format!("Failed to delete {}", path.display()))?;
    debug!("Deleted schedule file {}", path.display());
    Ok(())
}

/// `name.json` if free, otherwise the first free `name-<n>.json` counting from
/// zero.
pub fn generate_file_name(dir: &Path, name: &str) -> String {
    let stem = sanitize_file_stem(name);
    let mut file_name = format!("{}.{}", stem, FILE_EXTENSION);
    let mut suffix: u64 = 0;

    while !is_file_name_available(dir, &file_name) {
        file_name = format!("{}-{}.{}", stem, suffix, FILE_EXTENSION);
        suffix += 1;
    }

    file_name
}

pub fn is_file_name_available(dir: &Path, file_name: &str) -> bool {
    !dir.join(file_name).exists()
}

fn has_schedule_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION)
}

/// Replaces characters that cannot appear in a file name on common
/// platforms.
fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "schedule".to_string()
    } else {
        stem
    }
}
