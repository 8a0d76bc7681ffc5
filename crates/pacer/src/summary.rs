//! End-of-workout history record.

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::executor::PhaseTotal;
use crate::models::{SegmentKind, WorkoutMode};
use crate::pacing::pace_from;

const MIN_SUMMARY_DISTANCE_M: f64 = 10.0;
const MIN_SUMMARY_TIME_SEC: u32 = 5;

/// Average paces per phase group; each is `None` when there was too little
/// movement to trust.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhasePaces {
    pub work: Option<u32>,
    pub rest: Option<u32>,
    pub work_and_rest: Option<u32>,
    pub total: Option<u32>,
}

impl PhasePaces {
    pub fn from_totals(totals: &EnumMap<SegmentKind, PhaseTotal>) -> Self {
        let work = totals[SegmentKind::Work];
        let rest = totals[SegmentKind::Rest];
        let sum = |kinds: &[SegmentKind]| {
            kinds.iter().fold(PhaseTotal::default(), |acc, k| PhaseTotal {
                distance_m: acc.distance_m + totals[*k].distance_m,
                time_sec: acc.time_sec + totals[*k].time_sec,
            })
        };
        Self {
            work: summary_pace(work),
            rest: summary_pace(rest),
            work_and_rest: summary_pace(sum(&[SegmentKind::Work, SegmentKind::Rest])),
            total: summary_pace(sum(&[
                SegmentKind::Warmup,
                SegmentKind::Work,
                SegmentKind::Rest,
                SegmentKind::Cooldown,
                SegmentKind::FreePace,
            ])),
        }
    }
}

fn summary_pace(total: PhaseTotal) -> Option<u32> {
    if total.distance_m < MIN_SUMMARY_DISTANCE_M || total.time_sec < MIN_SUMMARY_TIME_SEC {
        return None;
    }
    pace_from(total.distance_m, total.time_sec as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub date: OffsetDateTime,
    pub mode: WorkoutMode,
    pub distance_km: f64,
    pub elapsed_sec: u32,
    pub avg_speed_kmh: f64,
    /// Present for scenario workouts only.
    #[serde(default)]
    pub phase_paces: Option<PhasePaces>,
}

impl WorkoutSummary {
    pub fn new(date: OffsetDateTime, mode: WorkoutMode, distance_km: f64, elapsed_sec: u32) -> Self {
        let avg_speed_kmh = if elapsed_sec > 0 {
            distance_km / (elapsed_sec as f64 / 3600.0)
        } else {
            0.0
        };
        Self {
            date,
            mode,
            distance_km,
            elapsed_sec,
            avg_speed_kmh,
            phase_paces: None,
        }
    }

    pub fn with_phase_totals(mut self, totals: &EnumMap<SegmentKind, PhaseTotal>) -> Self {
        self.phase_paces = Some(PhasePaces::from_totals(totals));
        self
    }

    pub fn avg_pace_sec_per_km(&self) -> Option<u32> {
        pace_from(self.distance_km * 1000.0, self.elapsed_sec as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_paces() {
        let mut totals: EnumMap<SegmentKind, PhaseTotal> = EnumMap::default();
        totals[SegmentKind::Warmup] = PhaseTotal {
            distance_m: 600.0,
            time_sec: 240,
        };
        totals[SegmentKind::Work] = PhaseTotal {
            distance_m: 1000.0,
            time_sec: 250,
        };
        totals[SegmentKind::Rest] = PhaseTotal {
            distance_m: 4.0,
            time_sec: 60,
        };
        let paces = PhasePaces::from_totals(&totals);
        assert_eq!(paces.work, Some(250));
        assert_eq!(paces.rest, None);
        assert_eq!(paces.work_and_rest, Some(308));
        assert_eq!(paces.total, Some(342));
    }

    #[test]
    fn test_avg_speed() {
        let summary = WorkoutSummary::new(OffsetDateTime::UNIX_EPOCH, WorkoutMode::Normal, 5.0, 1500);
        assert!((summary.avg_speed_kmh - 12.0).abs() < 1e-9);
        assert_eq!(summary.avg_pace_sec_per_km(), Some(300));
        assert!(summary.phase_paces.is_none());

        let idle = WorkoutSummary::new(OffsetDateTime::UNIX_EPOCH, WorkoutMode::Normal, 0.0, 0);
        assert_eq!(idle.avg_speed_kmh, 0.0);
        assert_eq!(idle.avg_pace_sec_per_km(), None);
    }
}
