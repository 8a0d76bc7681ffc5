//! Workout scenarios and the builders that produce them.
//!
//! A [`Scenario`] is the flat, ordered list of [`Segment`]s the executor
//! runs. Interval plans and combo workouts are authored in richer shapes
//! and flattened into it once, when the workout is set up.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{PacerError, Result};
use crate::models::Segment;

/// Pace assumed for warm-up and cool-down blocks without a target, s/km.
pub const ASSUMED_EASY_PACE_SEC: u32 = 420;
/// Pace assumed for rest without a target, s/km.
pub const ASSUMED_REST_PACE_SEC: u32 = 720;

pub const MAX_REPEATS: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scenario {
    pub segments: Vec<Segment>,
}

impl Scenario {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a persisted scenario, degrading to an empty one when the data
    /// is missing or corrupt.
    pub fn load_or_empty(json: Option<&str>) -> Self {
        match json {
            Some(raw) if !raw.trim().is_empty() => Self::from_json(raw).unwrap_or_else(|e| {
                warn!("Discarding malformed scenario: {e}");
                Self::default()
            }),
            _ => Self::default(),
        }
    }
}

impl From<Vec<Segment>> for Scenario {
    fn from(segments: Vec<Segment>) -> Self {
        Self::new(segments)
    }
}

/// Fluent builder for a classic interval session:
/// optional warm-up, `repeats` x (work, rest), optional cool-down.
#[derive(Debug, Clone, Default)]
pub struct IntervalPlan {
    warmup: Option<(u32, Option<u32>)>,
    work: Option<(u32, u32)>,
    rest: Option<(u32, Option<u32>)>,
    repeats: u32,
    cooldown: Option<(u32, Option<u32>)>,
}

impl IntervalPlan {
    pub fn new() -> Self {
        Self {
            repeats: 1,
            ..Default::default()
        }
    }

    pub fn warmup(mut self, duration_sec: u32, pace: Option<u32>) -> Self {
        self.warmup = Some((duration_sec, pace));
        self
    }

    pub fn work(mut self, duration_sec: u32, pace_sec_per_km: u32) -> Self {
        self.work = Some((duration_sec, pace_sec_per_km));
        self
    }

    pub fn rest(mut self, duration_sec: u32, pace: Option<u32>) -> Self {
        self.rest = Some((duration_sec, pace));
        self
    }

    pub fn repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn cooldown(mut self, duration_sec: u32, pace: Option<u32>) -> Self {
        self.cooldown = Some((duration_sec, pace));
        self
    }

    pub fn build(self) -> Result<Scenario> {
        let (work_sec, work_pace) = self
            .work
            .ok_or_else(|| PacerError::InvalidInput("work segment is required".into()))?;
        let (rest_sec, rest_pace) = self
            .rest
            .ok_or_else(|| PacerError::InvalidInput("rest segment is required".into()))?;
        if work_sec == 0 || rest_sec == 0 {
            return Err(PacerError::InvalidInput(
                "work and rest durations must be positive".into(),
            ));
        }
        if !(1..=MAX_REPEATS).contains(&self.repeats) {
            return Err(PacerError::InvalidInput(format!(
                "repeats must be between 1 and {MAX_REPEATS}, got {}",
                self.repeats
            )));
        }

        let mut segments = Vec::with_capacity(self.repeats as usize * 2 + 2);
        if let Some((duration_sec, pace)) = self.warmup
            && duration_sec > 0
        {
            segments.push(Segment::Warmup {
                duration_sec,
                target_pace_sec_per_km: pace,
            });
        }
        for _ in 0..self.repeats {
            segments.push(Segment::Work {
                duration_sec: work_sec,
                target_pace_sec_per_km: Some(work_pace),
            });
            segments.push(Segment::Rest {
                duration_sec: rest_sec,
                target_pace_sec_per_km: rest_pace,
            });
        }
        if let Some((duration_sec, pace)) = self.cooldown
            && duration_sec > 0
        {
            segments.push(Segment::Cooldown {
                duration_sec,
                target_pace_sec_per_km: pace,
            });
        }
        Ok(Scenario::new(segments))
    }
}

/// One authoring block of a combo workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "block_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComboBlock {
    Warmup {
        duration_sec: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pace_sec_per_km: Option<u32>,
    },
    /// Distance run at a target pace. A missing distance flattens to an
    /// empty free-pace segment.
    Pace {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance_km: Option<f64>,
        pace_sec_per_km: u32,
    },
    Interval {
        work_sec: u32,
        work_pace_sec_per_km: u32,
        rest_sec: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rest_pace_sec_per_km: Option<u32>,
        repeats: u32,
    },
    Cooldown {
        duration_sec: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pace_sec_per_km: Option<u32>,
    },
}

impl ComboBlock {
    /// Rejects blocks that cannot be run: empty durations, zero paces and
    /// repeat counts outside `1..=MAX_REPEATS`.
    pub fn validate(&self) -> Result<()> {
        match self {
            ComboBlock::Warmup { duration_sec, .. } | ComboBlock::Cooldown { duration_sec, .. } => {
                if *duration_sec == 0 {
                    return Err(PacerError::InvalidInput(
                        "warm-up and cool-down need a positive duration".into(),
                    ));
                }
            }
            ComboBlock::Pace {
                distance_km,
                pace_sec_per_km,
            } => {
                if *pace_sec_per_km == 0 {
                    return Err(PacerError::InvalidInput("pace block needs a pace".into()));
                }
                if distance_km.is_some_and(|d| !d.is_finite() || d < 0.0) {
                    return Err(PacerError::InvalidInput(format!(
                        "invalid pace block distance {distance_km:?}"
                    )));
                }
            }
            ComboBlock::Interval {
                work_sec,
                work_pace_sec_per_km,
                rest_sec,
                repeats,
                ..
            } => {
                if *work_sec == 0 || *rest_sec == 0 || *work_pace_sec_per_km == 0 {
                    return Err(PacerError::InvalidInput(
                        "interval block needs positive work, rest and pace".into(),
                    ));
                }
                if !(1..=MAX_REPEATS).contains(repeats) {
                    return Err(PacerError::InvalidInput(format!(
                        "repeats must be between 1 and {MAX_REPEATS}, got {repeats}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of segments this block flattens into.
    pub fn segment_count(&self) -> usize {
        match self {
            ComboBlock::Interval { repeats, .. } => *repeats as usize * 2,
            ComboBlock::Warmup { .. } | ComboBlock::Pace { .. } | ComboBlock::Cooldown { .. } => 1,
        }
    }

    fn push_segments(&self, out: &mut Vec<Segment>) {
        match self {
            ComboBlock::Warmup {
                duration_sec,
                pace_sec_per_km,
            } => out.push(Segment::Warmup {
                duration_sec: *duration_sec,
                target_pace_sec_per_km: *pace_sec_per_km,
            }),
            ComboBlock::Pace {
                distance_km,
                pace_sec_per_km,
            } => out.push(Segment::FreePace {
                distance_km: distance_km.unwrap_or(0.0),
                target_pace_sec_per_km: Some(*pace_sec_per_km),
            }),
            ComboBlock::Interval {
                work_sec,
                work_pace_sec_per_km,
                rest_sec,
                rest_pace_sec_per_km,
                repeats,
            } => {
                for _ in 0..*repeats {
                    out.push(Segment::Work {
                        duration_sec: *work_sec,
                        target_pace_sec_per_km: Some(*work_pace_sec_per_km),
                    });
                    out.push(Segment::Rest {
                        duration_sec: *rest_sec,
                        target_pace_sec_per_km: *rest_pace_sec_per_km,
                    });
                }
            }
            ComboBlock::Cooldown {
                duration_sec,
                pace_sec_per_km,
            } => out.push(Segment::Cooldown {
                duration_sec: *duration_sec,
                target_pace_sec_per_km: *pace_sec_per_km,
            }),
        }
    }

    fn estimate_distance_km(&self) -> f64 {
        match self {
            ComboBlock::Warmup {
                duration_sec,
                pace_sec_per_km,
            }
            | ComboBlock::Cooldown {
                duration_sec,
                pace_sec_per_km,
            } => km_at_pace(*duration_sec, pace_sec_per_km.unwrap_or(ASSUMED_EASY_PACE_SEC)),
            ComboBlock::Pace { distance_km, .. } => distance_km.unwrap_or(0.0).max(0.0),
            ComboBlock::Interval {
                work_sec,
                work_pace_sec_per_km,
                rest_sec,
                rest_pace_sec_per_km,
                repeats,
            } => {
                let one = km_at_pace(*work_sec, *work_pace_sec_per_km)
                    + km_at_pace(
                        *rest_sec,
                        rest_pace_sec_per_km.unwrap_or(ASSUMED_REST_PACE_SEC),
                    );
                one * *repeats as f64
            }
        }
    }

    fn estimate_time_sec(&self) -> u32 {
        match self {
            ComboBlock::Warmup { duration_sec, .. } | ComboBlock::Cooldown { duration_sec, .. } => {
                *duration_sec
            }
            ComboBlock::Pace {
                distance_km,
                pace_sec_per_km,
            } => (distance_km.unwrap_or(0.0).max(0.0) * *pace_sec_per_km as f64) as u32,
            ComboBlock::Interval {
                work_sec,
                rest_sec,
                repeats,
                ..
            } => repeats.saturating_mul(work_sec.saturating_add(*rest_sec)),
        }
    }
}

fn km_at_pace(duration_sec: u32, pace_sec_per_km: u32) -> f64 {
    if pace_sec_per_km == 0 {
        return 0.0;
    }
    duration_sec as f64 / pace_sec_per_km as f64
}

/// Free-form workout made of heterogeneous blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboScenario {
    pub blocks: Vec<ComboBlock>,
}

impl ComboScenario {
    pub fn new(blocks: Vec<ComboBlock>) -> Self {
        Self { blocks }
    }

    /// Order-preserving expansion of the blocks into executor segments.
    /// Expects blocks that passed [`ComboScenario::validate`].
    pub fn flatten(&self) -> Scenario {
        let mut segments = Vec::with_capacity(self.segment_count());
        for block in &self.blocks {
            block.push_segments(&mut segments);
        }
        Scenario::new(segments)
    }

    pub fn segment_count(&self) -> usize {
        self.blocks.iter().map(ComboBlock::segment_count).sum()
    }

    pub fn estimate_total_distance_km(&self) -> f64 {
        self.blocks.iter().map(ComboBlock::estimate_distance_km).sum()
    }

    pub fn estimate_total_time_sec(&self) -> u32 {
        self.blocks
            .iter()
            .map(ComboBlock::estimate_time_sec)
            .fold(0, u32::saturating_add)
    }

    pub fn validate(&self) -> Result<()> {
        self.blocks.iter().try_for_each(ComboBlock::validate)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses and validates a combo workout.
    pub fn from_json(json: &str) -> Result<Self> {
        let combo: Self = serde_json::from_str(json)?;
        combo.validate()?;
        Ok(combo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SegmentKind;

    fn sample_combo() -> ComboScenario {
        ComboScenario::new(vec![
            ComboBlock::Warmup {
                duration_sec: 600,
                pace_sec_per_km: None,
            },
            ComboBlock::Pace {
                distance_km: Some(2.0),
                pace_sec_per_km: 300,
            },
            ComboBlock::Interval {
                work_sec: 120,
                work_pace_sec_per_km: 240,
                rest_sec: 60,
                rest_pace_sec_per_km: None,
                repeats: 4,
            },
            ComboBlock::Cooldown {
                duration_sec: 300,
                pace_sec_per_km: Some(400),
            },
        ])
    }

    #[test]
    fn test_flatten_preserves_order_and_count() {
        let combo = sample_combo();
        let flat = combo.flatten();

        assert_eq!(flat.len(), combo.segment_count());
        assert_eq!(flat.len(), 1 + 1 + 8 + 1);

        let kinds: Vec<SegmentKind> = flat.segments.iter().map(Segment::kind).collect();
        assert_eq!(kinds[0], SegmentKind::Warmup);
        assert_eq!(kinds[1], SegmentKind::FreePace);
        for pair in kinds[2..10].chunks(2) {
            assert_eq!(pair, [SegmentKind::Work, SegmentKind::Rest]);
        }
        assert_eq!(kinds[10], SegmentKind::Cooldown);
    }

    #[test]
    fn test_single_interval_block_yields_two_n_segments() {
        let combo = ComboScenario::new(vec![ComboBlock::Interval {
            work_sec: 60,
            work_pace_sec_per_km: 250,
            rest_sec: 30,
            rest_pace_sec_per_km: Some(500),
            repeats: 7,
        }]);
        assert_eq!(combo.flatten().len(), 14);
    }

    #[test]
    fn test_estimates() {
        let combo = sample_combo();
        // 600/420 + 2.0 + 4 * (120/240 + 60/720) + 300/400
        let expected = 600.0 / 420.0 + 2.0 + 4.0 * (0.5 + 60.0 / 720.0) + 0.75;
        assert!((combo.estimate_total_distance_km() - expected).abs() < 1e-9);
        assert_eq!(combo.estimate_total_time_sec(), 600 + 600 + 4 * 180 + 300);
    }

    #[test]
    fn test_pace_block_without_distance() {
        let combo = ComboScenario::new(vec![ComboBlock::Pace {
            distance_km: None,
            pace_sec_per_km: 300,
        }]);
        let flat = combo.flatten();
        assert_eq!(
            flat.segments[0],
            Segment::FreePace {
                distance_km: 0.0,
                target_pace_sec_per_km: Some(300)
            }
        );
        assert_eq!(combo.estimate_total_time_sec(), 0);
    }

    #[test]
    fn test_scenario_json_round_trip() {
        let scenario = sample_combo().flatten();
        let json = scenario.to_json().unwrap();
        assert!(json.starts_with('['));
        assert_eq!(Scenario::from_json(&json).unwrap(), scenario);
    }

    #[test]
    fn test_combo_json_uses_block_type_tag() {
        let json = sample_combo().to_json().unwrap();
        assert!(json.contains(r#""block_type":"INTERVAL""#));
        assert_eq!(ComboScenario::from_json(&json).unwrap(), sample_combo());
    }

    #[test]
    fn test_load_or_empty_recovers() {
        assert!(Scenario::load_or_empty(None).is_empty());
        assert!(Scenario::load_or_empty(Some("")).is_empty());
        assert!(Scenario::load_or_empty(Some("[{\"kind\":\"SPRINT\"}]")).is_empty());
        assert!(Scenario::load_or_empty(Some("not json")).is_empty());
        let ok = Scenario::load_or_empty(Some(r#"[{"kind":"REST","duration_sec":30}]"#));
        assert_eq!(ok.len(), 1);
    }

    #[test]
    fn test_combo_validation() {
        assert!(sample_combo().validate().is_ok());

        let too_many = r#"{"blocks":[{"block_type":"INTERVAL","work_sec":60,"work_pace_sec_per_km":250,"rest_sec":60,"repeats":4000000000}]}"#;
        assert!(matches!(
            ComboScenario::from_json(too_many),
            Err(PacerError::InvalidInput(_))
        ));

        let empty_warmup = ComboScenario::new(vec![ComboBlock::Warmup {
            duration_sec: 0,
            pace_sec_per_km: None,
        }]);
        assert!(empty_warmup.validate().is_err());

        let negative = ComboScenario::new(vec![ComboBlock::Pace {
            distance_km: Some(-1.0),
            pace_sec_per_km: 300,
        }]);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_time_estimate_saturates() {
        let combo = ComboScenario::new(vec![
            ComboBlock::Interval {
                work_sec: u32::MAX,
                work_pace_sec_per_km: 250,
                rest_sec: 60,
                rest_pace_sec_per_km: None,
                repeats: 100,
            },
            ComboBlock::Cooldown {
                duration_sec: 300,
                pace_sec_per_km: None,
            },
        ]);
        assert_eq!(combo.estimate_total_time_sec(), u32::MAX);
    }

    #[test]
    fn test_interval_plan() {
        let scenario = IntervalPlan::new()
            .warmup(300, None)
            .work(90, 250)
            .rest(60, Some(480))
            .repeats(5)
            .cooldown(300, None)
            .build()
            .unwrap();
        assert_eq!(scenario.len(), 12);
        assert_eq!(scenario.segments[0].kind(), SegmentKind::Warmup);
        assert_eq!(scenario.segments[11].kind(), SegmentKind::Cooldown);
        assert_eq!(scenario.segments[1].target_pace(), Some(250));
    }

    #[test]
    fn test_interval_plan_validation() {
        assert!(IntervalPlan::new().rest(60, None).build().is_err());
        assert!(IntervalPlan::new().work(0, 250).rest(60, None).build().is_err());
        assert!(
            IntervalPlan::new()
                .work(60, 250)
                .rest(60, None)
                .repeats(0)
                .build()
                .is_err()
        );
        assert!(
            IntervalPlan::new()
                .work(60, 250)
                .rest(60, None)
                .repeats(101)
                .build()
                .is_err()
        );
    }
}
