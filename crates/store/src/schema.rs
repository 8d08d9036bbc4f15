use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use tracing::info;

/// Version written into every schedule file.
pub const SCHEMA_VERSION: u32 = 1;

/// Extension of schedule files.
pub const FILE_EXTENSION: &str = "json";

/// Creates the schedule directory if it does not exist yet.
pub fn initialize_store(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    info!("Creating schedule directory {}", dir.display());
    fs::create_dir_all(dir)
        .wrap_err_with(|| format!("Failed to create schedule directory {}", dir.display()))?;

    Ok(())
}
