//! JSON file persistence, one schedule per file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use log::{info, warn};
use thiserror::Error;

use crate::Schedule;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed schedule in {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Schedule, StoreError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    /// Loads the stored schedule, or starts a new one at the week returned by
    /// `week_start` when nothing usable is stored. `None` only if both fail.
    pub fn load_or_else<F>(&self, week_start: F) -> Option<Schedule>
    where
        F: FnOnce() -> Option<NaiveDate>,
    {
        match self.load() {
            Ok(schedule) => {
                info!(
                    "Loaded {} events for week of {} from {}",
                    schedule.len(),
                    schedule.week_start(),
                    self.path.display()
                );
                Some(schedule)
            }
            Err(err) => {
                warn!("No existing schedule: {err}");
                week_start().map(Schedule::new)
            }
        }
    }

    pub fn save(&self, schedule: &Schedule) -> Result<(), StoreError> {
        let serialized =
            serde_json::to_string_pretty(schedule).map_err(|source| StoreError::Format {
                path: self.path.clone(),
                source,
            })?;

        fs::write(&self.path, serialized).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        info!(
            "Saved {} events to {}",
            schedule.len(),
            self.path.display()
        );
        Ok(())
    }
}
