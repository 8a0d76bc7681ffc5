use enum_map::Enum;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One position sample as delivered by the host's location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    #[serde(default = "OffsetDateTime::now_utc")]
    pub timestamp: OffsetDateTime,
    pub lat: f64,
    pub lon: f64,
    /// Horizontal accuracy radius in meters. `None` is treated as the worst accuracy.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    #[serde(default)]
    pub speed_mps: Option<f64>,
    /// Monotonic clock reading in milliseconds, immune to wall-clock changes.
    pub monotonic_ms: u64,
}

impl RawFix {
    pub fn new(lat: f64, lon: f64, accuracy_m: f64, monotonic_ms: u64) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            lat,
            lon,
            accuracy_m: Some(accuracy_m),
            speed_mps: None,
            monotonic_ms,
        }
    }
}

/// Mean coordinate of the last few accepted fixes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedFix {
    pub lat: f64,
    pub lon: f64,
    pub monotonic_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentKind {
    Warmup,
    Work,
    Rest,
    Cooldown,
    FreePace,
}

impl SegmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            SegmentKind::Warmup => "Warm-up",
            SegmentKind::Work => "Work",
            SegmentKind::Rest => "Rest",
            SegmentKind::Cooldown => "Cool-down",
            SegmentKind::FreePace => "Pace segment",
        }
    }
}

/// How a segment ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentBound {
    Time { duration_sec: u32 },
    Distance { meters: f64 },
}

/// One phase of a workout. Time-bound kinds carry a duration, free pace
/// segments carry a distance; the serialized form is tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Segment {
    Warmup {
        duration_sec: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_pace_sec_per_km: Option<u32>,
    },
    Work {
        duration_sec: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_pace_sec_per_km: Option<u32>,
    },
    Rest {
        duration_sec: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_pace_sec_per_km: Option<u32>,
    },
    Cooldown {
        duration_sec: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_pace_sec_per_km: Option<u32>,
    },
    FreePace {
        distance_km: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_pace_sec_per_km: Option<u32>,
    },
}

impl Segment {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Warmup { .. } => SegmentKind::Warmup,
            Segment::Work { .. } => SegmentKind::Work,
            Segment::Rest { .. } => SegmentKind::Rest,
            Segment::Cooldown { .. } => SegmentKind::Cooldown,
            Segment::FreePace { .. } => SegmentKind::FreePace,
        }
    }

    pub fn target_pace(&self) -> Option<u32> {
        match self {
            Segment::Warmup {
                target_pace_sec_per_km,
                ..
            }
            | Segment::Work {
                target_pace_sec_per_km,
                ..
            }
            | Segment::Rest {
                target_pace_sec_per_km,
                ..
            }
            | Segment::Cooldown {
                target_pace_sec_per_km,
                ..
            }
            | Segment::FreePace {
                target_pace_sec_per_km,
                ..
            } => target_pace_sec_per_km.filter(|p| *p > 0),
        }
    }

    pub fn bound(&self) -> SegmentBound {
        match self {
            Segment::Warmup { duration_sec, .. }
            | Segment::Work { duration_sec, .. }
            | Segment::Rest { duration_sec, .. }
            | Segment::Cooldown { duration_sec, .. } => SegmentBound::Time {
                duration_sec: *duration_sec,
            },
            Segment::FreePace { distance_km, .. } => SegmentBound::Distance {
                meters: distance_km.max(0.0) * 1000.0,
            },
        }
    }

    pub fn duration_sec(&self) -> Option<u32> {
        match self.bound() {
            SegmentBound::Time { duration_sec } => Some(duration_sec),
            SegmentBound::Distance { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutMode {
    #[default]
    Normal,
    Interval,
    Combo,
}

/// Goal entered by the runner for a single distance/time workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalParams {
    #[serde(default)]
    pub mode: WorkoutMode,
    pub target_distance_km: f64,
    #[serde(default)]
    pub target_time_sec: Option<u32>,
    #[serde(default)]
    pub target_pace_sec_per_km: Option<u32>,
}

impl GoalParams {
    pub fn with_time(target_distance_km: f64, target_time_sec: u32) -> Self {
        Self {
            mode: WorkoutMode::Normal,
            target_distance_km,
            target_time_sec: Some(target_time_sec),
            target_pace_sec_per_km: None,
        }
    }

    pub fn with_pace(target_distance_km: f64, target_pace_sec_per_km: u32) -> Self {
        Self {
            mode: WorkoutMode::Normal,
            target_distance_km,
            target_time_sec: None,
            target_pace_sec_per_km: Some(target_pace_sec_per_km),
        }
    }

    /// Total target time, derived from the pace when only a pace was given.
    pub fn target_total_sec(&self) -> Option<u32> {
        match (self.target_time_sec, self.target_pace_sec_per_km) {
            (Some(t), _) if t > 0 => Some(t),
            (_, Some(p)) if p > 0 && self.target_distance_km > 0.0 => {
                Some((p as f64 * self.target_distance_km).round() as u32)
            }
            _ => None,
        }
    }

    /// Target pace, derived from the total time when only a time was given.
    pub fn target_pace(&self) -> Option<u32> {
        match (self.target_pace_sec_per_km, self.target_time_sec) {
            (Some(p), _) if p > 0 => Some(p),
            (_, Some(t)) if t > 0 && self.target_distance_km > 0.0 => {
                Some((t as f64 / self.target_distance_km).round() as u32)
            }
            _ => None,
        }
    }
}

/// Segment progress shown to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSegment {
    pub kind: SegmentKind,
    /// Seconds left for time-bound segments.
    pub remaining_sec: Option<u32>,
    /// Meters covered for distance-bound segments.
    pub covered_m: Option<f64>,
    pub index: usize,
    pub total: usize,
    pub target_pace_sec_per_km: Option<u32>,
}

/// Session state published every tick and persisted for kill recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub started_at: Option<OffsetDateTime>,
    pub elapsed_ms: u64,
    pub distance_km: f64,
    pub running: bool,
    pub paused: bool,
    #[serde(default)]
    pub goal_reached: bool,
    #[serde(default)]
    pub active_segment: Option<ActiveSegment>,
}
