//! Settings and session persistence behind a minimal key-value interface.
//!
//! The host decides where bytes live; the core only needs string values
//! under a handful of keys. [`PacerStore`] layers typed, forgiving accessors
//! on top: anything missing or corrupt reads back as "absent".

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::cadence_fallback::StrideProfile;
use crate::errors::{PacerError, Result};
use crate::models::{GoalParams, SessionSnapshot, WorkoutMode};
use crate::scenario::{ComboScenario, Scenario};
use crate::summary::WorkoutSummary;

pub const STRIDE_PROFILE_KEY: &str = "stride_profile";
pub const GOAL_KEY: &str = "goal";
pub const INTERVAL_SCENARIO_KEY: &str = "interval_scenario";
pub const COMBO_SCENARIO_KEY: &str = "combo_scenario";
pub const RUNTIME_KEY: &str = "runtime";
pub const LAST_SUMMARY_KEY: &str = "last_summary";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file, rewritten on every change.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.values)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Typed access to the pacer's keys.
#[derive(Debug, Clone, Default)]
pub struct PacerStore<K> {
    inner: K,
}

impl<K: KeyValueStore> PacerStore<K> {
    pub fn new(inner: K) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }

    pub fn into_inner(self) -> K {
        self.inner
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.inner.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, "Store read failed: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, "Ignoring corrupt stored value: {e}");
                None
            }
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.inner
            .put(key, &json)
            .map_err(|e| PacerError::Store(format!("{key}: {e}")))
    }

    pub fn stride_profile(&self) -> StrideProfile {
        self.read(STRIDE_PROFILE_KEY).unwrap_or_default()
    }

    pub fn save_stride_profile(&mut self, profile: &StrideProfile) -> Result<()> {
        self.write(STRIDE_PROFILE_KEY, profile)
    }

    pub fn goal(&self) -> Option<GoalParams> {
        self.read(GOAL_KEY)
    }

    pub fn save_goal(&mut self, goal: &GoalParams) -> Result<()> {
        self.write(GOAL_KEY, goal)
    }

    pub fn interval_scenario(&self) -> Scenario {
        let raw = self.inner.get(INTERVAL_SCENARIO_KEY).unwrap_or_else(|e| {
            warn!("Store read failed: {e}");
            None
        });
        Scenario::load_or_empty(raw.as_deref())
    }

    pub fn save_interval_scenario(&mut self, scenario: &Scenario) -> Result<()> {
        self.write(INTERVAL_SCENARIO_KEY, scenario)
    }

    pub fn combo_scenario(&self) -> Option<ComboScenario> {
        let combo: ComboScenario = self.read(COMBO_SCENARIO_KEY)?;
        match combo.validate() {
            Ok(()) => Some(combo),
            Err(e) => {
                warn!("Ignoring invalid combo workout: {e}");
                None
            }
        }
    }

    pub fn save_combo_scenario(&mut self, combo: &ComboScenario) -> Result<()> {
        self.write(COMBO_SCENARIO_KEY, combo)
    }

    /// Scenario to execute for a workout mode; empty for free runs or bad data.
    pub fn scenario_for(&self, mode: WorkoutMode) -> Scenario {
        match mode {
            WorkoutMode::Normal => Scenario::default(),
            WorkoutMode::Interval => self.interval_scenario(),
            WorkoutMode::Combo => self
                .combo_scenario()
                .map(|c| c.flatten())
                .unwrap_or_default(),
        }
    }

    pub fn runtime(&self) -> Option<SessionSnapshot> {
        self.read(RUNTIME_KEY)
    }

    pub fn save_runtime(&mut self, snapshot: &SessionSnapshot) -> Result<()> {
        self.write(RUNTIME_KEY, snapshot)
    }

    pub fn clear_runtime(&mut self) -> Result<()> {
        self.inner.remove(RUNTIME_KEY)
    }

    pub fn last_summary(&self) -> Option<WorkoutSummary> {
        self.read(LAST_SUMMARY_KEY)
    }

    pub fn save_summary(&mut self, summary: &WorkoutSummary) -> Result<()> {
        self.write(LAST_SUMMARY_KEY, summary)
    }
}
