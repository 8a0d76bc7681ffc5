//! Plausibility filter and moving-average smoother for raw position fixes.
//!
//! Each fix is checked against the previous *accepted* raw fix. Accepted
//! fixes enter a small sliding window whose mean coordinate is the smoothed
//! position; distance is only ever measured between consecutive smoothed
//! positions so one noisy fix cannot produce a large jump.

use std::collections::VecDeque;
use std::fmt;

use geo::{geometry::Point, Distance as _, Haversine};
use tracing::debug;

use crate::config::FilterConfig;
use crate::models::{RawFix, SmoothedFix};

/// Why a fix was kept out of the distance total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    TooSoon { dt_sec: f64 },
    PoorAccuracy { accuracy_m: Option<f64> },
    Jitter { meters: f64 },
    TooSlow { speed_mps: f64 },
    TooFast { speed_mps: f64 },
    Jump { meters: f64, dt_sec: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooSoon { dt_sec } => write!(f, "too frequent ({dt_sec:.2}s)"),
            RejectReason::PoorAccuracy {
                accuracy_m: Some(acc),
            } => write!(f, "bad accuracy ({acc:.1}m)"),
            RejectReason::PoorAccuracy { accuracy_m: None } => write!(f, "no accuracy reported"),
            RejectReason::Jitter { meters } => write!(f, "too close ({meters:.1}m)"),
            RejectReason::TooSlow { speed_mps } => write!(f, "too slow ({speed_mps:.1}m/s)"),
            RejectReason::TooFast { speed_mps } => {
                write!(f, "too fast ({speed_mps:.1}m/s), teleport")
            }
            RejectReason::Jump { meters, dt_sec } => {
                write!(f, "jump ({meters:.1}m in {dt_sec:.1}s)")
            }
        }
    }
}

/// Distance gained from one accepted fix. Never negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedDelta {
    pub meters: f64,
    pub smoothed: SmoothedFix,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// First usable fix after start or reset; it only anchors the track.
    Baseline(SmoothedFix),
    Accepted(AcceptedDelta),
    Rejected(RejectReason),
}

/// Arithmetic mean of the last `window` accepted coordinates.
#[derive(Debug, Clone)]
pub struct LocationSmoother {
    window: usize,
    points: VecDeque<(f64, f64)>,
}

impl LocationSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            points: VecDeque::with_capacity(window),
        }
    }

    pub fn push(&mut self, fix: &RawFix) -> SmoothedFix {
        if self.points.len() >= self.window {
            self.points.pop_front();
        }
        self.points.push_back((fix.lat, fix.lon));

        let n = self.points.len() as f64;
        let (lat_sum, lon_sum) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(la, lo), (lat, lon)| (la + lat, lo + lon));
        SmoothedFix {
            lat: lat_sum / n,
            lon: lon_sum / n,
            monotonic_ms: fix.monotonic_ms,
        }
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }
}

pub fn distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Haversine.distance(Point::new(lon1, lat1), Point::new(lon2, lat2))
}

#[derive(Debug, Clone)]
pub struct PositionFilter {
    config: FilterConfig,
    smoother: LocationSmoother,
    last_accepted: Option<RawFix>,
    last_smoothed: Option<SmoothedFix>,
}

impl PositionFilter {
    pub fn new(config: FilterConfig) -> Self {
        let smoother = LocationSmoother::new(config.smoothing_window);
        Self {
            config,
            smoother,
            last_accepted: None,
            last_smoothed: None,
        }
    }

    pub fn last_smoothed(&self) -> Option<SmoothedFix> {
        self.last_smoothed
    }

    /// Runs one fix through the gates and the smoother.
    pub fn accept(&mut self, fix: RawFix) -> FixOutcome {
        if let Err(reason) = self.check_accuracy(&fix) {
            debug!("Rejected fix: {reason}");
            return FixOutcome::Rejected(reason);
        }

        let Some(prev) = &self.last_accepted else {
            let smoothed = self.smoother.push(&fix);
            self.last_smoothed = Some(smoothed);
            self.last_accepted = Some(fix);
            return FixOutcome::Baseline(smoothed);
        };

        if let Some(reason) = self.rejection(prev, &fix) {
            debug!("Rejected fix: {reason}");
            return FixOutcome::Rejected(reason);
        }

        let smoothed = self.smoother.push(&fix);
        let meters = self
            .last_smoothed
            .map_or(0.0, |p| distance_m(p.lat, p.lon, smoothed.lat, smoothed.lon))
            .max(0.0);
        self.last_smoothed = Some(smoothed);
        self.last_accepted = Some(fix);
        FixOutcome::Accepted(AcceptedDelta { meters, smoothed })
    }

    /// Forgets history so the next fix becomes a fresh baseline.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.last_accepted = None;
        self.last_smoothed = None;
    }

    fn check_accuracy(&self, fix: &RawFix) -> Result<(), RejectReason> {
        match fix.accuracy_m {
            Some(acc) if acc.is_finite() && acc <= self.config.max_accuracy_m => Ok(()),
            accuracy_m => Err(RejectReason::PoorAccuracy { accuracy_m }),
        }
    }

    fn rejection(&self, prev: &RawFix, cur: &RawFix) -> Option<RejectReason> {
        let c = &self.config;
        let dt_sec = (cur.monotonic_ms as f64 - prev.monotonic_ms as f64) / 1000.0;
        if dt_sec <= c.min_interval_sec {
            return Some(RejectReason::TooSoon { dt_sec });
        }

        let meters = distance_m(prev.lat, prev.lon, cur.lat, cur.lon);
        if meters < c.min_distance_m {
            return Some(RejectReason::Jitter { meters });
        }

        let speed_mps = meters / dt_sec;
        if speed_mps < c.min_speed_mps {
            return Some(RejectReason::TooSlow { speed_mps });
        }
        if speed_mps > c.max_speed_mps {
            return Some(RejectReason::TooFast { speed_mps });
        }

        if meters > c.jump_distance_m && dt_sec < c.jump_window_sec {
            return Some(RejectReason::Jump { meters, dt_sec });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAT0: f64 = 40.0;
    const LON0: f64 = -105.3;
    /// Degrees of latitude per meter, close enough for test geometry.
    const DEG_PER_M: f64 = 1.0 / 111_195.0;

    fn fix_north(meters: f64, at_ms: u64) -> RawFix {
        RawFix::new(LAT0 + meters * DEG_PER_M, LON0, 5.0, at_ms)
    }

    fn filter() -> PositionFilter {
        PositionFilter::new(FilterConfig::default())
    }

    #[test]
    fn test_first_fix_is_baseline() {
        let mut f = filter();
        assert!(matches!(f.accept(fix_north(0.0, 0)), FixOutcome::Baseline(_)));
    }

    #[test]
    fn test_steady_run_accepted() {
        let mut f = filter();
        f.accept(fix_north(0.0, 0));
        let mut total = 0.0;
        for i in 1..=10 {
            match f.accept(fix_north(i as f64 * 3.0, i * 1000)) {
                FixOutcome::Accepted(d) => {
                    assert!(d.meters >= 0.0);
                    total += d.meters;
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        // Smoothed track lags the raw one by the window but stays close.
        assert!(total > 24.0 && total < 30.5, "total {total}");
    }

    #[test]
    fn test_rejection_predicates() {
        let cases = [
            (fix_north(3.0, 100), "too frequent"),
            (fix_north(0.3, 1000), "too close"),
            (fix_north(2.0, 10_000), "too slow"),
            (fix_north(40.0, 2000), "too fast"),
        ];
        for (fix, expected) in cases {
            let mut f = filter();
            f.accept(fix_north(0.0, 0));
            match f.accept(fix) {
                FixOutcome::Rejected(reason) => {
                    assert!(reason.to_string().starts_with(expected), "{reason}")
                }
                other => panic!("expected {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_jump_rejected() {
        let config = FilterConfig {
            max_speed_mps: 50.0,
            ..Default::default()
        };
        let mut f = PositionFilter::new(config);
        f.accept(fix_north(0.0, 0));
        assert!(matches!(
            f.accept(fix_north(150.0, 5000)),
            FixOutcome::Rejected(RejectReason::Jump { .. })
        ));
    }

    #[test]
    fn test_poor_or_missing_accuracy_rejected() {
        let mut f = filter();
        f.accept(fix_north(0.0, 0));
        let mut bad = fix_north(3.0, 1000);
        bad.accuracy_m = Some(25.0);
        assert!(matches!(
            f.accept(bad.clone()),
            FixOutcome::Rejected(RejectReason::PoorAccuracy { .. })
        ));
        bad.accuracy_m = None;
        assert!(matches!(
            f.accept(bad),
            FixOutcome::Rejected(RejectReason::PoorAccuracy { accuracy_m: None })
        ));
    }

    #[test]
    fn test_rejected_fix_does_not_move_reference() {
        let mut f = filter();
        f.accept(fix_north(0.0, 0));
        assert!(matches!(f.accept(fix_north(40.0, 1000)), FixOutcome::Rejected(_)));
        // Compared against the fix at 0 m, not the teleport.
        assert!(matches!(f.accept(fix_north(4.0, 2000)), FixOutcome::Accepted(_)));
    }

    #[test]
    fn test_reset_starts_new_baseline() {
        let mut f = filter();
        f.accept(fix_north(0.0, 0));
        f.accept(fix_north(3.0, 1000));
        f.reset();
        assert!(f.last_smoothed().is_none());
        assert!(matches!(
            f.accept(fix_north(500.0, 60_000)),
            FixOutcome::Baseline(_)
        ));
    }

    #[test]
    fn test_smoother_mean() {
        let mut s = LocationSmoother::new(3);
        for (i, lat) in [1.0, 2.0, 3.0, 4.0].iter().enumerate() {
            let out = s.push(&RawFix::new(*lat, 0.0, 1.0, i as u64));
            if i == 3 {
                assert!((out.lat - 3.0).abs() < 1e-12);
            }
        }
    }
}
