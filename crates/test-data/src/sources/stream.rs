//! Per-second step counts and position fixes for a simulated runner.

use std::ops::Range;

use pacer::RawFix;
use pacer::position_filter::distance_m;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use time::{Duration, OffsetDateTime};

use crate::config::SimConfig;
use crate::profiles::{self, RunnerProfile};

/// Meters per degree of latitude on the mean Earth sphere.
const METERS_PER_DEGREE: f64 = 111_195.08;

/// A stretch of the run held at one target pace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaceLeg {
    pub duration_sec: u32,
    pub pace_sec_per_km: u32,
}

impl PaceLeg {
    pub fn new(duration_sec: u32, pace_sec_per_km: u32) -> Self {
        Self {
            duration_sec,
            pace_sec_per_km,
        }
    }
}

/// What the phone delivers during one second of running.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorTick {
    pub second: u32,
    pub steps: u32,
    pub fix: Option<RawFix>,
    /// Distance actually covered since the start.
    pub true_distance_m: f64,
}

/// Generates sensor streams with realistic noise and failures.
#[derive(Debug, Clone)]
pub struct SensorStreamGenerator {
    config: SimConfig,
    profile: RunnerProfile,
    dropouts: Vec<Range<u32>>,
    glitches: Vec<u32>,
}

impl SensorStreamGenerator {
    pub fn new(profile: RunnerProfile) -> Self {
        Self {
            config: SimConfig::default(),
            profile,
            dropouts: Vec::new(),
            glitches: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_start(mut self, lat: f64, lon: f64) -> Self {
        self.config.start = Some((lat, lon));
        self
    }

    pub fn with_fix_interval(mut self, seconds: u32) -> Self {
        self.config.fix_interval_sec = seconds;
        self
    }

    pub fn with_gps_jitter(mut self, meters: f64) -> Self {
        self.config.gps_jitter_m = meters;
        self
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.config.accuracy_m = meters;
        self
    }

    /// No fixes are delivered for seconds in `window`.
    pub fn with_dropout(mut self, window: Range<u32>) -> Self {
        self.dropouts.push(window);
        self
    }

    /// The fix at `second` lands far from the runner.
    pub fn with_glitch(mut self, second: u32) -> Self {
        self.glitches.push(second);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn generate(&self, legs: &[PaceLeg], rng: &mut impl Rng) -> Vec<SensorTick> {
        let total: u32 = legs.iter().map(|l| l.duration_sec).sum();
        let mut ticks = Vec::with_capacity(total as usize);

        let (mut lat, mut lon) = self
            .config
            .start
            .unwrap_or_else(|| self.config.region.random_point(rng));
        let jitter = Normal::new(0.0, self.config.gps_jitter_m.max(0.0)).ok();
        let wander = self.config.heading_wander_rad.abs();
        let started_at = OffsetDateTime::now_utc();
        let interval = self.config.fix_interval_sec.max(1);

        let mut heading = rng.gen_range(0.0..std::f64::consts::TAU);
        let mut true_distance_m = 0.0;
        let mut step_carry = 0.0;
        let mut second = 0;

        for leg in legs {
            let factor = profiles::sample_variance(self.profile.variance(), rng);
            let speed = 1000.0 / leg.pace_sec_per_km.max(1) as f64 * factor;
            let stride = self.profile.stride_at(speed);

            for _ in 0..leg.duration_sec {
                second += 1;
                if wander > 0.0 {
                    heading += rng.gen_range(-wander..wander);
                }
                let (next_lat, next_lon) = offset(lat, lon, speed * heading.cos(), speed * heading.sin());
                true_distance_m += distance_m(lat, lon, next_lat, next_lon);
                lat = next_lat;
                lon = next_lon;

                step_carry += speed / stride;
                let steps = step_carry.floor();
                step_carry -= steps;

                let fix = if second % interval == 0 && !self.in_dropout(second) {
                    let (north, mut east) = match &jitter {
                        Some(j) => (j.sample(rng), j.sample(rng)),
                        None => (0.0, 0.0),
                    };
                    if self.glitches.contains(&second) {
                        east += self.config.glitch_offset_m;
                    }
                    let (fix_lat, fix_lon) = offset(lat, lon, north, east);
                    Some(RawFix {
                        timestamp: started_at + Duration::seconds(second as i64),
                        lat: fix_lat,
                        lon: fix_lon,
                        accuracy_m: Some(self.config.accuracy_m),
                        speed_mps: Some(speed),
                        monotonic_ms: second as u64 * 1000,
                    })
                } else {
                    None
                };

                ticks.push(SensorTick {
                    second,
                    steps: steps as u32,
                    fix,
                    true_distance_m,
                });
            }
        }
        ticks
    }

    fn in_dropout(&self, second: u32) -> bool {
        self.dropouts.iter().any(|w| w.contains(&second))
    }
}

/// Moves a coordinate by meters north and east.
fn offset(lat: f64, lon: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    let lat2 = lat + north_m / METERS_PER_DEGREE;
    let lon2 = lon + east_m / (METERS_PER_DEGREE * lat.to_radians().cos());
    (lat2, lon2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn generator() -> SensorStreamGenerator {
        SensorStreamGenerator::new(RunnerProfile::default().with_variance(0.0))
            .with_start(55.73, 37.60)
    }

    #[test]
    fn test_one_tick_per_second() {
        let mut rng = StdRng::seed_from_u64(42);
        let ticks = generator().generate(&[PaceLeg::new(60, 300), PaceLeg::new(30, 360)], &mut rng);
        assert_eq!(ticks.len(), 90);
        assert_eq!(ticks.last().map(|t| t.second), Some(90));
        assert!(ticks.iter().all(|t| t.fix.is_some()));
    }

    #[test]
    fn test_true_distance_follows_pace() {
        let mut rng = StdRng::seed_from_u64(42);
        let ticks = generator().generate(&[PaceLeg::new(300, 300)], &mut rng);
        let total = ticks.last().map_or(0.0, |t| t.true_distance_m);
        assert!((total - 1000.0).abs() < 1.0, "got {total}");
    }

    #[test]
    fn test_steps_match_cadence() {
        let mut rng = StdRng::seed_from_u64(42);
        let profile = RunnerProfile::default().with_variance(0.0);
        let expected = profile.cadence_at(profile.base_speed_mps());
        let ticks = SensorStreamGenerator::new(profile).generate(&[PaceLeg::new(120, 300)], &mut rng);
        let steps: u32 = ticks.iter().map(|t| t.steps).sum();
        assert!((steps as f64 / 2.0 - expected).abs() < 1.0);
    }

    #[test]
    fn test_dropout_and_glitch() {
        let mut rng = StdRng::seed_from_u64(42);
        let ticks = generator()
            .with_gps_jitter(0.0)
            .with_dropout(10..20)
            .with_glitch(30)
            .generate(&[PaceLeg::new(40, 300)], &mut rng);
        assert!(ticks[9..19].iter().all(|t| t.fix.is_none()));
        assert!(ticks[19].fix.is_some());

        let glitch = ticks[29].fix.as_ref().unwrap();
        let before = ticks[28].fix.as_ref().unwrap();
        let jump = distance_m(before.lat, before.lon, glitch.lat, glitch.lon);
        assert!(jump > 250.0);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let legs = [PaceLeg::new(30, 300)];
        let a = generator().generate(&legs, &mut StdRng::seed_from_u64(9));
        let b = generator().generate(&legs, &mut StdRng::seed_from_u64(9));
        let coords = |ticks: &[SensorTick]| -> Vec<(f64, f64)> {
            ticks.iter().filter_map(|t| t.fix.as_ref()).map(|f| (f.lat, f.lon)).collect()
        };
        assert_eq!(coords(&a), coords(&b));
    }
}
