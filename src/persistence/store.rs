use super::document::StateDocument;
use super::files::{atomic_write, backup_path, quarantine_file};
use crate::config::Config;
use crate::error::PersistenceError;
use chrono::{DateTime, Local, NaiveDate};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Owner of the canonical state file and its daily backups
#[derive(Debug, Clone)]
pub struct Store {
    state_path: PathBuf,
    backups: bool,
}

impl Store {
    pub fn new(dir: &Path, config: &Config) -> Self {
        Self {
            state_path: dir.join(&config.state_file),
            backups: config.backups,
        }
    }

    #[cfg(test)]
    pub fn at(state_path: PathBuf, backups: bool) -> Self {
        Self { state_path, backups }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Write the document, then refresh the backup for `today`.
    /// Returns the backup path when one was written.
    pub fn save(
        &self,
        doc: &StateDocument,
        today: NaiveDate,
    ) -> Result<Option<PathBuf>, PersistenceError> {
        if let Some(dir) = self.state_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e))?;
        }

        let json = serde_json::to_string_pretty(doc)?;
        log::info!("Saving tracker state to {}", self.state_path.display());
        atomic_write(&self.state_path, &json)?;

        if !self.backups {
            return Ok(None);
        }

        let backup = backup_path(&self.state_path, today);
        fs::copy(&self.state_path, &backup).map_err(|e| PersistenceError::io(&backup, e))?;
        log::debug!("Backup written to {}", backup.display());
        Ok(Some(backup))
    }

    /// Read the document. A missing file is a first run, not an error.
    pub fn load(&self) -> Result<Option<StateDocument>, PersistenceError> {
        let content = match fs::read_to_string(&self.state_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::io(&self.state_path, e)),
        };

        let doc = serde_json::from_str(&content).map_err(|source| PersistenceError::Malformed {
            path: self.state_path.clone(),
            source,
        })?;
        log::info!("Tracker state loaded from {}", self.state_path.display());
        Ok(Some(doc))
    }

    /// Like `load`, but reports failures and carries on with no state.
    /// A malformed file is copied aside first so the next save cannot destroy it.
    pub fn load_or_recover(&self, now: DateTime<Local>) -> Option<StateDocument> {
        match self.load() {
            Ok(doc) => doc,
            Err(err) => {
                log::error!("{}; starting with an empty registry", err);
                if matches!(err, PersistenceError::Malformed { .. }) {
                    match quarantine_file(&self.state_path, now) {
                        Ok(copy) => log::warn!("Unreadable state kept at {}", copy.display()),
                        Err(e) => log::error!("Could not keep unreadable state: {}", e),
                    }
                }
                None
            }
        }
    }
}
