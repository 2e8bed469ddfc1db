use crate::error::PersistenceError;
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name of a project-local data directory
pub const LOCAL_DIR_NAME: &str = ".timetracker";

/// Environment variable overriding the data directory
pub const DIR_ENV_VAR: &str = "TIMETRACKER_DIR";

/// Data directory under the home directory when nothing else is configured
pub const HOME_DIR_NAME: &str = "time-tracker";

/// Resolve the data directory: explicit path, then $TIMETRACKER_DIR,
/// then a local .timetracker up the tree, then ~/time-tracker
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }

    if let Some(dir) = env::var_os(DIR_ENV_VAR).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let current_dir = env::current_dir().context("Could not determine current directory")?;
    if let Some(local_dir) = find_local_dir(&current_dir) {
        return Ok(local_dir);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(HOME_DIR_NAME))
}

/// Find local .timetracker directory by walking up the directory tree
pub fn find_local_dir(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let candidate = current.join(LOCAL_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }

        current = current.parent()?;
    }
}

/// Ensure the data directory exists
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Initialize a local .timetracker directory inside `base`
pub fn init_local_dir(base: &Path) -> Result<PathBuf> {
    let dir = base.join(LOCAL_DIR_NAME);

    if dir.exists() {
        anyhow::bail!("Tracker directory already exists: {}", dir.display());
    }

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    Ok(dir)
}

/// Per-day backup key: year and day of year, e.g. "2024-32"
pub fn backup_key(date: NaiveDate) -> String {
    format!("{}-{}", date.year(), date.ordinal())
}

/// Path of the backup copy of `state_path` for `date`
/// (time-tracker.json -> time-tracker-2024-32.json)
pub fn backup_path(state_path: &Path, date: NaiveDate) -> PathBuf {
    let stem = state_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("state");
    let file_name = match state_path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, backup_key(date), ext),
        None => format!("{}-{}", stem, backup_key(date)),
    };
    state_path.with_file_name(file_name)
}

/// Path of the markdown report for a date
pub fn report_file(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("report-{}.md", date.format("%Y-%m-%d")))
}

/// Atomically write content to a file using temp file + rename
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> Result<(), PersistenceError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| PersistenceError::io(dir, e))?;

    temp_file
        .write_all(content.as_bytes())
        .map_err(|e| PersistenceError::io(temp_file.path(), e))?;

    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| PersistenceError::io(temp_file.path(), e))?;

    temp_file
        .persist(path)
        .map_err(|e| PersistenceError::io(path, e.error))?;

    Ok(())
}

/// Copy a damaged file aside with a timestamp so it survives the next save
pub fn quarantine_file(path: &Path, now: DateTime<Local>) -> Result<PathBuf, PersistenceError> {
    let stamp = now.format("%Y%m%d_%H%M%S");
    let quarantined = path.with_extension(format!("corrupt.{}.json", stamp));

    fs::copy(path, &quarantined).map_err(|e| PersistenceError::io(path, e))?;

    Ok(quarantined)
}
