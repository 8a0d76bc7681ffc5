//! Runner athletic profile.

use pacer::cadence_fallback::{CadenceBucket, StrideProfile};

/// Pace, day-to-day variance and cadence model of one runner.
///
/// Cadence rises linearly with speed around the base cadence; stride is
/// whatever length makes that cadence produce the speed.
#[derive(Debug, Clone)]
pub struct RunnerProfile {
    /// Comfortable pace in seconds per kilometer.
    base_pace_sec_per_km: f64,
    /// Per-leg performance variance (coefficient of variation).
    variance: f64,
    /// Steps per minute at the base pace.
    base_cadence_spm: f64,
    /// Extra steps per minute for each m/s above the base speed.
    cadence_gain: f64,
}

impl Default for RunnerProfile {
    fn default() -> Self {
        Self {
            base_pace_sec_per_km: 300.0,
            variance: 0.03,
            base_cadence_spm: 172.0,
            cadence_gain: 8.0,
        }
    }
}

impl RunnerProfile {
    pub fn with_pace(pace_sec_per_km: f64) -> Self {
        Self {
            base_pace_sec_per_km: pace_sec_per_km,
            ..Default::default()
        }
    }

    /// ~3:30/km.
    pub fn elite() -> Self {
        Self {
            base_cadence_spm: 185.0,
            ..Self::with_pace(210.0)
        }
    }

    /// ~6:00/km.
    pub fn recreational() -> Self {
        Self {
            base_cadence_spm: 166.0,
            ..Self::with_pace(360.0)
        }
    }

    pub fn with_variance(mut self, variance: f64) -> Self {
        self.variance = variance;
        self
    }

    pub fn with_cadence(mut self, base_cadence_spm: f64) -> Self {
        self.base_cadence_spm = base_cadence_spm;
        self
    }

    pub fn base_pace_sec_per_km(&self) -> f64 {
        self.base_pace_sec_per_km
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn base_speed_mps(&self) -> f64 {
        1000.0 / self.base_pace_sec_per_km
    }

    pub fn cadence_at(&self, speed_mps: f64) -> f64 {
        (self.base_cadence_spm + self.cadence_gain * (speed_mps - self.base_speed_mps())).max(60.0)
    }

    pub fn stride_at(&self, speed_mps: f64) -> f64 {
        speed_mps * 60.0 / self.cadence_at(speed_mps)
    }

    /// Stride profile as the pacer would have learned it from earlier runs
    /// at the base pace.
    pub fn calibrated_strides(&self) -> StrideProfile {
        let speed = self.base_speed_mps();
        let cadence = self.cadence_at(speed).round() as u32;
        let mut profile = StrideProfile::default();
        profile.set(CadenceBucket::for_cadence(cadence), self.stride_at(speed));
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = RunnerProfile::default();
        assert!((profile.base_speed_mps() - 1000.0 / 300.0).abs() < 1e-9);
        assert!((profile.cadence_at(profile.base_speed_mps()) - 172.0).abs() < 1e-9);
    }

    #[test]
    fn test_faster_means_higher_cadence_and_longer_stride() {
        let profile = RunnerProfile::default();
        let slow = 2.5;
        let fast = 4.5;
        assert!(profile.cadence_at(fast) > profile.cadence_at(slow));
        assert!(profile.stride_at(fast) > profile.stride_at(slow));
    }

    #[test]
    fn test_calibrated_strides_fill_the_running_bucket() {
        let profile = RunnerProfile::default();
        let strides = profile.calibrated_strides();
        let stride = strides.get(CadenceBucket::Over160).unwrap();
        assert!((stride - profile.stride_at(profile.base_speed_mps())).abs() < 1e-9);
        assert!(strides.get(CadenceBucket::Under140).is_none());
    }
}
