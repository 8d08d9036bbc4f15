//! # Planner Configuration Module
//!
//! Loads runtime settings for the planner from environment variables, with
//! defaults for everything.
//!
//! ## Environment Variables
//!
//! - `PLANNER_DATA_DIR`: Directory holding one JSON file per schedule (default: "./data/schedules")
//! - `LOG_LEVEL`: Logging level (default: "info")
//! - `PLANNER_POLL_INTERVAL_SECONDS`: How often to check for newly active timeslots (default: 1)
//! - `PLANNER_TIMEZONE`: IANA time zone used for local times in notifications (default: "UTC")

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use eyre::{eyre, Result, WrapErr};
use tracing::Level;

pub const DEFAULT_DATA_DIR: &str = "./data/schedules";

/// Configuration for the planner runtime
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Directory the schedule files live in
    pub data_dir: PathBuf,

    /// Log level for the application
    pub log_level: Level,

    /// Interval between checks for newly active timeslots
    pub poll_interval: Duration,

    /// Zone used when presenting timeslot times to the user
    pub timezone: Tz,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_level: Level::INFO,
            poll_interval: Duration::from_secs(1),
            timezone: Tz::UTC,
        }
    }
}

impl PlannerConfig {
    /// Creates a PlannerConfig from environment variables
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - `PLANNER_POLL_INTERVAL_SECONDS` is not a positive integer
    /// - `PLANNER_TIMEZONE` is not a known IANA zone name
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`PlannerConfig::from_env`], reading values through `lookup`
    /// instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("PLANNER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let log_level = match lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()).as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let poll_seconds: u64 = lookup("PLANNER_POLL_INTERVAL_SECONDS")
            .unwrap_or_else(|| "1".to_string())
            .parse()
            .wrap_err("Invalid PLANNER_POLL_INTERVAL_SECONDS value")?;
        if poll_seconds == 0 {
            return Err(eyre!("PLANNER_POLL_INTERVAL_SECONDS must be greater than zero"));
        }

        let timezone = match lookup("PLANNER_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| eyre!("Invalid PLANNER_TIMEZONE value '{}': {}", name, e))?,
            None => Tz::UTC,
        };

        Ok(Self {
            data_dir,
            log_level,
            poll_interval: Duration::from_secs(poll_seconds),
            timezone,
        })
    }
}
