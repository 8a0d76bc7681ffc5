//! Step-based dead reckoning for when position fixes cannot be trusted.
//!
//! The engine runs once per tick. While fixes flow it stays `Stable`,
//! leaves distance to the position path and quietly calibrates stride
//! length per cadence bucket. When fixes stop or get rejected it goes
//! `Blind` and produces distance from steps. The first good fix after a
//! blind spell only opens a `Quarantine`: its delta would double count
//! ground already covered by steps, so it is dropped and steps keep
//! driving distance until the quarantine has elapsed.

use std::collections::VecDeque;

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FallbackConfig;
use crate::position_filter::RejectReason;

/// Cadence ranges in steps per minute. Every cadence maps to exactly one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceBucket {
    Under140,
    From140To150,
    From151To160,
    Over160,
}

impl CadenceBucket {
    pub fn for_cadence(cadence: u32) -> Self {
        match cadence {
            0..=139 => CadenceBucket::Under140,
            140..=150 => CadenceBucket::From140To150,
            151..=160 => CadenceBucket::From151To160,
            _ => CadenceBucket::Over160,
        }
    }

    /// Stride used before any calibration exists.
    pub fn default_stride_m(&self) -> f64 {
        match self {
            CadenceBucket::Under140 => 0.70,
            CadenceBucket::From140To150 => 0.78,
            CadenceBucket::From151To160 => 0.85,
            CadenceBucket::Over160 => 0.92,
        }
    }
}

/// Calibrated stride lengths, persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrideProfile {
    buckets: EnumMap<CadenceBucket, Option<f64>>,
}

impl StrideProfile {
    pub fn get(&self, bucket: CadenceBucket) -> Option<f64> {
        self.buckets[bucket]
    }

    pub fn set(&mut self, bucket: CadenceBucket, stride_m: f64) {
        self.buckets[bucket] = Some(stride_m);
    }

    /// Stride for a cadence; zero cadence means no movement.
    pub fn stride_for(&self, cadence: u32) -> f64 {
        if cadence == 0 {
            return 0.0;
        }
        let bucket = CadenceBucket::for_cadence(cadence);
        self.buckets[bucket].unwrap_or_else(|| bucket.default_stride_m())
    }

    /// Blends an observation into its bucket and returns the new value.
    pub fn calibrate(&mut self, cadence: u32, observed_stride_m: f64, keep: f64) -> f64 {
        let bucket = CadenceBucket::for_cadence(cadence);
        let old = self.buckets[bucket].unwrap_or_else(|| bucket.default_stride_m());
        let blended = old * keep + observed_stride_m * (1.0 - keep);
        self.buckets[bucket] = Some(blended);
        blended
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    Stable,
    Blind,
    Quarantine,
}

#[derive(Debug, Clone)]
pub struct CadenceFallbackEngine {
    config: FallbackConfig,
    profile: StrideProfile,
    profile_dirty: bool,
    state: MotionState,
    stable_ticks: u32,
    quarantine_ticks: u32,
    ticks_since_fix: u32,
    step_history: VecDeque<u32>,
    phase_steps: u64,
    phase_distance_m: f64,
}

impl CadenceFallbackEngine {
    pub fn new(config: FallbackConfig, profile: StrideProfile) -> Self {
        let window = config.cadence_window.max(1);
        Self {
            config,
            profile,
            profile_dirty: false,
            state: MotionState::Stable,
            stable_ticks: 0,
            quarantine_ticks: 0,
            ticks_since_fix: 0,
            step_history: VecDeque::with_capacity(window),
            phase_steps: 0,
            phase_distance_m: 0.0,
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn profile(&self) -> &StrideProfile {
        &self.profile
    }

    /// Returns the profile once after each calibration commit.
    pub fn take_profile_update(&mut self) -> Option<StrideProfile> {
        if self.profile_dirty {
            self.profile_dirty = false;
            Some(self.profile.clone())
        } else {
            None
        }
    }

    /// Current cadence in steps per minute over the recent window.
    pub fn cadence(&self) -> u32 {
        if self.step_history.is_empty() {
            return 0;
        }
        let total: u32 = self.step_history.iter().sum();
        (total as f64 * 60.0 / self.step_history.len() as f64).round() as u32
    }

    /// Advances one second. Returns meters to add from steps.
    pub fn process_tick(&mut self, step_delta: u32) -> f64 {
        if self.step_history.len() >= self.config.cadence_window.max(1) {
            self.step_history.pop_front();
        }
        self.step_history.push_back(step_delta);
        let cadence = self.cadence();
        self.ticks_since_fix = self.ticks_since_fix.saturating_add(1);

        if self.state == MotionState::Stable && self.ticks_since_fix > self.config.blind_after_ticks
        {
            debug!(ticks = self.ticks_since_fix, "No fixes, going blind");
            self.enter_blind();
        }

        match self.state {
            MotionState::Stable => {
                self.stable_ticks += 1;
                self.phase_steps += step_delta as u64;
                if self.stable_ticks >= self.config.calibration_ticks {
                    self.commit_calibration();
                    self.reset_phase();
                }
                0.0
            }
            MotionState::Blind => step_delta as f64 * self.profile.stride_for(cadence),
            MotionState::Quarantine => {
                self.quarantine_ticks += 1;
                if self.quarantine_ticks >= self.config.quarantine_ticks {
                    debug!("Quarantine passed, trusting position again");
                    self.state = MotionState::Stable;
                    self.quarantine_ticks = 0;
                    self.reset_phase();
                }
                step_delta as f64 * self.profile.stride_for(cadence)
            }
        }
    }

    /// A fix passed the filter with a positive delta. Returns meters to add.
    pub fn on_fix_accepted(&mut self, delta_m: f64) -> f64 {
        self.ticks_since_fix = 0;
        match self.state {
            MotionState::Stable => {
                self.phase_distance_m += delta_m;
                delta_m
            }
            MotionState::Blind => {
                debug!(delta_m, "Signal back, entering quarantine");
                self.state = MotionState::Quarantine;
                self.quarantine_ticks = 0;
                0.0
            }
            MotionState::Quarantine => 0.0,
        }
    }

    pub fn on_fix_rejected(&mut self, reason: &RejectReason) {
        match self.state {
            MotionState::Stable => {
                debug!(%reason, "Fix rejected, going blind");
                self.enter_blind();
            }
            MotionState::Quarantine => {
                debug!(%reason, "Fix rejected during quarantine, back to blind");
                self.state = MotionState::Blind;
                self.quarantine_ticks = 0;
            }
            MotionState::Blind => {}
        }
    }

    fn enter_blind(&mut self) {
        self.state = MotionState::Blind;
        self.reset_phase();
    }

    fn reset_phase(&mut self) {
        self.stable_ticks = 0;
        self.phase_steps = 0;
        self.phase_distance_m = 0.0;
    }

    fn commit_calibration(&mut self) {
        if self.phase_steps == 0 || self.phase_distance_m <= 0.0 {
            return;
        }
        let observed = self.phase_distance_m / self.phase_steps as f64;
        let minutes = self.stable_ticks as f64 / 60.0;
        let avg_cadence = (self.phase_steps as f64 / minutes).round() as u32;

        if observed < self.config.min_stride_m || observed > self.config.max_stride_m {
            debug!(observed, "Stride outlier discarded");
            return;
        }
        let stride = self
            .profile
            .calibrate(avg_cadence, observed, self.config.ema_keep);
        self.profile_dirty = true;
        info!(
            cadence = avg_cadence,
            observed, stride, "Stride calibration committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CadenceFallbackEngine {
        CadenceFallbackEngine::new(FallbackConfig::default(), StrideProfile::default())
    }

    #[test]
    fn test_bucket_partition() {
        assert_eq!(CadenceBucket::for_cadence(0), CadenceBucket::Under140);
        assert_eq!(CadenceBucket::for_cadence(139), CadenceBucket::Under140);
        assert_eq!(CadenceBucket::for_cadence(140), CadenceBucket::From140To150);
        assert_eq!(CadenceBucket::for_cadence(150), CadenceBucket::From140To150);
        assert_eq!(CadenceBucket::for_cadence(151), CadenceBucket::From151To160);
        assert_eq!(CadenceBucket::for_cadence(160), CadenceBucket::From151To160);
        assert_eq!(CadenceBucket::for_cadence(161), CadenceBucket::Over160);
        assert_eq!(CadenceBucket::for_cadence(u32::MAX), CadenceBucket::Over160);
    }

    #[test]
    fn test_blind_after_silence_uses_default_stride() {
        let mut e = engine();
        // Alternating 2/3 steps per second is 150 steps/min.
        let steps = |tick: u32| if tick % 2 == 1 { 2 } else { 3 };
        for tick in 1..=7 {
            assert_eq!(e.process_tick(steps(tick)), 0.0);
            assert_eq!(e.state(), MotionState::Stable);
        }
        let d = e.process_tick(steps(8));
        assert_eq!(e.state(), MotionState::Blind);
        assert_eq!(e.cadence(), 150);
        assert!((d - 3.0 * 0.78).abs() < 1e-9);

        for tick in 9..=40 {
            let d = e.process_tick(steps(tick));
            assert!((d - steps(tick) as f64 * 0.78).abs() < 1e-9);
        }
        assert_eq!(e.state(), MotionState::Blind);
    }

    #[test]
    fn test_rejected_fix_goes_blind() {
        let mut e = engine();
        e.on_fix_rejected(&RejectReason::TooFast { speed_mps: 30.0 });
        assert_eq!(e.state(), MotionState::Blind);
    }

    #[test]
    fn test_quarantine_discards_first_delta_and_recovers() {
        let mut e = engine();
        e.on_fix_rejected(&RejectReason::Jitter { meters: 0.1 });
        assert_eq!(e.on_fix_accepted(80.0), 0.0);
        assert_eq!(e.state(), MotionState::Quarantine);

        for _ in 0..14 {
            assert!(e.process_tick(3) > 0.0);
            assert_eq!(e.on_fix_accepted(3.0), 0.0);
            assert_eq!(e.state(), MotionState::Quarantine);
        }
        e.process_tick(3);
        assert_eq!(e.state(), MotionState::Stable);
        assert_eq!(e.on_fix_accepted(3.0), 3.0);
    }

    #[test]
    fn test_rejection_in_quarantine_back_to_blind() {
        let mut e = engine();
        e.on_fix_rejected(&RejectReason::Jitter { meters: 0.1 });
        e.on_fix_accepted(10.0);
        e.on_fix_rejected(&RejectReason::TooSoon { dt_sec: 0.1 });
        assert_eq!(e.state(), MotionState::Blind);
    }

    #[test]
    fn test_calibration_blends_observation() {
        let mut e = engine();
        // 30 s at 3 steps/s (180 spm) covering 3 m/s: 1.0 m stride.
        for _ in 0..30 {
            e.on_fix_accepted(3.0);
            e.process_tick(3);
        }
        let profile = e.take_profile_update().expect("calibration committed");
        let expected = 0.92 * 0.8 + 1.0 * 0.2;
        assert!((profile.get(CadenceBucket::Over160).unwrap() - expected).abs() < 1e-9);
        assert!(e.take_profile_update().is_none());
    }

    #[test]
    fn test_calibration_outlier_discarded() {
        let mut e = engine();
        for _ in 0..30 {
            e.on_fix_accepted(10.0);
            e.process_tick(2);
        }
        assert!(e.take_profile_update().is_none());
        assert_eq!(e.profile(), &StrideProfile::default());
    }

    #[test]
    fn test_zero_cadence_is_zero_stride() {
        assert_eq!(StrideProfile::default().stride_for(0), 0.0);
    }
}
