//! Tunable constants for the pacing core.
//!
//! Every threshold used by the filter, the cadence fallback, the scenario
//! executor and the goal pacer lives here. Hosts usually load a partial
//! JSON file on top of the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Top-level configuration, grouped per engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerConfig {
    pub filter: FilterConfig,
    pub fallback: FallbackConfig,
    pub executor: ExecutorConfig,
    pub goal: GoalPacerConfig,
}

impl PacerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Plausibility gates for raw position fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Fixes closer together than this (seconds) are dropped.
    pub min_interval_sec: f64,
    /// Worst acceptable horizontal accuracy in meters.
    pub max_accuracy_m: f64,
    /// Moves shorter than this are treated as jitter.
    pub min_distance_m: f64,
    /// Implied speed bounds in m/s.
    pub min_speed_mps: f64,
    pub max_speed_mps: f64,
    /// A jump longer than `jump_distance_m` within `jump_window_sec` is a glitch.
    pub jump_distance_m: f64,
    pub jump_window_sec: f64,
    /// Size of the moving-average smoothing window.
    pub smoothing_window: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_interval_sec: 0.2,
            max_accuracy_m: 15.0,
            min_distance_m: 0.8,
            min_speed_mps: 0.3,
            max_speed_mps: 12.0,
            jump_distance_m: 120.0,
            jump_window_sec: 10.0,
            smoothing_window: 3,
        }
    }
}

/// Timing and calibration constants of the cadence fallback state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Stable ticks accumulated before a stride calibration is attempted.
    pub calibration_ticks: u32,
    /// Ticks without an accepted fix before going blind.
    pub blind_after_ticks: u32,
    /// Length of the quarantine after signal comes back.
    pub quarantine_ticks: u32,
    pub min_stride_m: f64,
    pub max_stride_m: f64,
    /// Weight of the previous stride value in the moving average.
    pub ema_keep: f64,
    /// Number of per-tick step counts used to estimate cadence.
    pub cadence_window: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            calibration_ticks: 30,
            blind_after_ticks: 7,
            quarantine_ticks: 15,
            min_stride_m: 0.30,
            max_stride_m: 1.50,
            ema_keep: 0.8,
            cadence_window: 10,
        }
    }
}

/// Timing of coaching events inside a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Seconds at the start of a work segment ignored for pace.
    pub acceleration_ignore_sec: u32,
    /// Rolling window for instantaneous pace.
    pub pace_window_sec: usize,
    pub pace_window_min_samples: usize,
    pub pace_window_min_distance_m: f64,
    /// No mid-segment hints this close to the end of a segment.
    pub hint_quiet_tail_sec: u32,
    /// Seconds before the end of a time-bound segment for the "changing soon" warning.
    pub warning_before_end_sec: u32,
    /// In-segment second of the rest pace read.
    pub rest_read_at_sec: u32,
    /// Pace deviation (s/km) still considered on target.
    pub on_target_band_sec: i32,
    /// Stable-phase average needs at least this much to be reported.
    pub report_min_stable_sec: u32,
    pub report_min_stable_m: f64,
    /// Free-pace checkpoint spacing: min(max_m, fraction of target), at least min_m.
    pub checkpoint_max_m: f64,
    pub checkpoint_min_m: f64,
    pub checkpoint_fraction: f64,
    /// No checkpoint hints this close to the end of a free-pace segment.
    pub checkpoint_quiet_tail_m: f64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            acceleration_ignore_sec: 3,
            pace_window_sec: 8,
            pace_window_min_samples: 5,
            pace_window_min_distance_m: 8.0,
            hint_quiet_tail_sec: 15,
            warning_before_end_sec: 10,
            rest_read_at_sec: 40,
            on_target_band_sec: 15,
            report_min_stable_sec: 10,
            report_min_stable_m: 25.0,
            checkpoint_max_m: 500.0,
            checkpoint_min_m: 100.0,
            checkpoint_fraction: 0.1,
            checkpoint_quiet_tail_m: 50.0,
        }
    }
}

/// Thresholds of the single-goal pacer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalPacerConfig {
    /// Projected finish within this many seconds of target counts as on track.
    pub dead_band_sec: f64,
    /// Distance between emergency checks.
    pub emergency_every_km: f64,
    /// Emergency checks are skipped when a regular checkpoint is this close.
    pub emergency_min_lead_km: f64,
    /// Minimum distance covered before the first checkpoint.
    pub first_checkpoint_min_km: f64,
    /// Checkpoint-to-checkpoint pace needs at least this much distance.
    pub min_checkpoint_span_m: f64,
    /// Paces outside this range are treated as unknown.
    pub min_plausible_pace_sec: u32,
    pub max_plausible_pace_sec: u32,
}

impl Default for GoalPacerConfig {
    fn default() -> Self {
        Self {
            dead_band_sec: 30.0,
            emergency_every_km: 0.25,
            emergency_min_lead_km: 0.1,
            first_checkpoint_min_km: 0.1,
            min_checkpoint_span_m: 10.0,
            min_plausible_pace_sec: 180,
            max_plausible_pace_sec: 1200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PacerConfig::from_json_str(r#"{"fallback": {"quarantine_ticks": 20}}"#)
            .unwrap();
        assert_eq!(config.fallback.quarantine_ticks, 20);
        assert_eq!(config.fallback.blind_after_ticks, 7);
        assert_eq!(config.filter, FilterConfig::default());
    }

    #[test]
    fn test_empty_object_is_default() {
        let config = PacerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PacerConfig::default());
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(PacerConfig::from_json_str("{filter:").is_err());
    }
}
