use crate::model::AppState;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Whole-state persistence: one blob in, one blob out.
pub trait StateStore {
    /// Never fails; unreadable or corrupt data yields the empty state.
    fn load(&self) -> AppState;
    fn save(&self, state: &AppState) -> Result<()>;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    fn read(&self) -> Result<Option<AppState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data =
            fs::read_to_string(&self.path).with_context(|| format!("reading {:?}", self.path))?;
        let state: AppState = serde_json::from_str(&data).context("parsing planner state")?;
        Ok(Some(state))
    }
}

impl StateStore for FileStore {
    fn load(&self) -> AppState {
        match self.read() {
            Ok(Some(state)) => {
                tracing::debug!(
                    path = %self.path.display(),
                    days = state.plans.len(),
                    months = state.month_plans.len(),
                    "loaded planner state"
                );
                state
            }
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "no saved state, starting empty");
                AppState::default()
            }
            Err(err) => {
                tracing::error!(path = %self.path.display(), "failed to load state: {:#}", err);
                AppState::default()
            }
        }
    }

    fn save(&self, state: &AppState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let serialized = serde_json::to_string(state).context("serializing planner state")?;
        fs::write(&self.path, serialized).with_context(|| format!("writing {:?}", self.path))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store for tests that should not touch disk.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: std::cell::RefCell<Option<String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn with_blob(blob: impl Into<String>) -> Self {
        MemoryStore {
            blob: std::cell::RefCell::new(Some(blob.into())),
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.borrow().clone()
    }
}

#[cfg(test)]
impl StateStore for MemoryStore {
    fn load(&self) -> AppState {
        match self.blob.borrow().as_deref() {
            Some(data) => serde_json::from_str(data).unwrap_or_else(|err| {
                tracing::error!("failed to load state: {}", err);
                AppState::default()
            }),
            None => AppState::default(),
        }
    }

    fn save(&self, state: &AppState) -> Result<()> {
        let serialized = serde_json::to_string(state).context("serializing planner state")?;
        *self.blob.borrow_mut() = Some(serialized);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
