//! Personal memory.
//!
//! A small JSON document that survives restarts: who the user is, how
//! many turns they have shared, and when the last session ended. Loaded
//! once at startup, rewritten after every completed turn. Owned by the
//! main loop for the whole process lifetime.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonalMemory {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub interaction_count: u64,
    #[serde(default)]
    pub last_session: Option<DateTime<Utc>>,
}

pub struct MemoryStore {
    path: PathBuf,
}

impl MemoryStore {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Load the memory file, or start fresh when it does not exist. A
    /// corrupt file is an error: silently discarding the user's history
    /// would be worse than asking them to fix or delete it.
    pub fn load(&self) -> Result<PersonalMemory> {
        if !self.path.exists() {
            return Ok(PersonalMemory::default());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading memory file: {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing memory file: {}", self.path.display()))
    }

    pub fn save(&self, memory: &PersonalMemory) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(memory)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("failed writing memory file: {}", self.path.display()))?;
        Ok(())
    }
}

impl PersonalMemory {
    /// Bump the counter and stamp the session time; called once per
    /// completed turn.
    pub fn record_turn(&mut self, now: DateTime<Utc>) {
        self.interaction_count += 1;
        self.last_session = Some(now);
    }
}
