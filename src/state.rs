use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{ModelGraph, ResourceStore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// State Structures
// ============================================================================

/// Everything persisted between transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Model graph as of the last commit
    #[serde(default)]
    pub models: ModelGraph,

    /// Resource graphs, dirty state included
    #[serde(default)]
    pub resources: ResourceStore,

    /// Last time the snapshot was saved
    pub saved_at: DateTime<Utc>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            models: ModelGraph::new(),
            resources: ResourceStore::new(),
            saved_at: Utc::now(),
        }
    }
}

impl StateSnapshot {
    /// Read a snapshot file
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))
    }
}

// ============================================================================
// StateStore
// ============================================================================

/// JSON state file inside a state directory
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the state file path
    pub fn state_file(&self) -> PathBuf {
        self.dir.join("state.json")
    }

    /// Load state from disk, or return default if file doesn't exist
    pub fn load(&self) -> Result<StateSnapshot> {
        let path = self.state_file();

        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(StateSnapshot::default());
        }

        let state = StateSnapshot::read(&path)?;
        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk, stamping `saved_at`
    pub fn save(&self, state: &mut StateSnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create state directory: {}", self.dir.display()))?;

        state.saved_at = Utc::now();
        let path = self.state_file();
        let content =
            serde_json::to_string_pretty(state).context("Failed to serialize state to JSON")?;

        fs::write(&path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
