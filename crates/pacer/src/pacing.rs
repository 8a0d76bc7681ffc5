//! Pace arithmetic and coaching decisions.
//!
//! Everything here is a pure function of its inputs. Callers thread the few
//! bits of memory the decisions need (praise alternation, previous
//! checkpoint classification) through explicitly.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::ExecutorConfig;

/// Pace in seconds per kilometer from a distance and a duration.
///
/// `None` when the inputs are degenerate or the implied speed is a crawl,
/// so a bad sample never turns into an infinite pace.
pub fn pace_from(distance_m: f64, seconds: f64) -> Option<u32> {
    if distance_m.is_nan() || seconds.is_nan() || distance_m <= 0.0 || seconds <= 0.0 {
        return None;
    }
    if distance_m / seconds <= 0.1 {
        return None;
    }
    Some((seconds * 1000.0 / distance_m) as u32)
}

/// Pace needed from here to finish exactly on the time goal.
pub fn dynamic_target_pace(remaining_km: f64, time_left_sec: f64, target_pace: u32) -> u32 {
    if remaining_km > 0.0 && time_left_sec > 0.0 {
        (time_left_sec / remaining_km).round() as u32
    } else {
        target_pace
    }
}

/// Projected finish time at the average pace so far, if any distance is covered.
pub fn project_finish_sec(elapsed_sec: f64, distance_km: f64, target_distance_km: f64) -> Option<f64> {
    if distance_km <= 0.0 || elapsed_sec < 0.0 {
        return None;
    }
    Some(elapsed_sec / distance_km * target_distance_km)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgressClass {
    #[default]
    OnTrack,
    Behind,
    Ahead,
}

impl ProgressClass {
    /// `delta_sec` is projected finish minus target finish.
    pub fn classify(delta_sec: f64, dead_band_sec: f64) -> Self {
        if delta_sec.abs() <= dead_band_sec {
            ProgressClass::OnTrack
        } else if delta_sec > dead_band_sec {
            ProgressClass::Behind
        } else {
            ProgressClass::Ahead
        }
    }
}

/// Rolling per-second distance samples for instantaneous pace.
#[derive(Debug, Clone)]
pub struct PaceWindow {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl PaceWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, delta_m: f64) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(delta_m.max(0.0));
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Window pace, or `None` when the window holds too little signal.
    pub fn pace(&self, min_samples: usize, min_distance_m: f64) -> Option<u32> {
        let seconds = self.samples.len();
        if seconds == 0 || seconds < min_samples {
            return None;
        }
        let meters: f64 = self.samples.iter().sum();
        if meters < min_distance_m {
            return None;
        }
        pace_from(meters, seconds as f64)
    }
}

/// Goal pacer checkpoint advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalAdvice {
    HoldingPace {
        alternate: bool,
    },
    SlightAdjust {
        speed_up: bool,
        dynamic_pace: u32,
    },
    Adjust {
        speed_up: bool,
        current_pace: u32,
        dynamic_pace: u32,
    },
    /// `at_km` is `None` when the runner will simply finish on time.
    BehindCatchingUp {
        deficit_sec: u32,
        at_km: Option<u32>,
    },
    BehindCannotCatchUp {
        deficit_sec: u32,
        dynamic_pace: u32,
    },
    BehindDeficitGrowing {
        deficit_sec: u32,
        dynamic_pace: u32,
    },
    /// `at_km` is `None` when the lead outlasts the remaining distance.
    AheadLosingLead {
        lead_sec: u32,
        at_km: Option<u32>,
        current_pace: u32,
        dynamic_pace: u32,
    },
    AheadBigCushion {
        lead_sec: u32,
        current_pace: u32,
        dynamic_pace: u32,
    },
    AheadHolding {
        lead_sec: u32,
    },
}

/// Inputs of one goal checkpoint evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalReading {
    pub elapsed_sec: f64,
    pub distance_km: f64,
    pub target_distance_km: f64,
    pub target_total_sec: f64,
    pub current_pace: u32,
}

impl GoalReading {
    pub fn target_pace(&self) -> u32 {
        if self.target_distance_km <= 0.0 {
            return 0;
        }
        (self.target_total_sec / self.target_distance_km).round() as u32
    }

    pub fn remaining_km(&self) -> f64 {
        (self.target_distance_km - self.distance_km).max(0.0)
    }

    pub fn time_left_sec(&self) -> f64 {
        self.target_total_sec - self.elapsed_sec
    }

    pub fn dynamic_pace(&self) -> u32 {
        dynamic_target_pace(self.remaining_km(), self.time_left_sec(), self.target_pace())
    }

    /// Projected finish minus target finish, in whole seconds.
    pub fn finish_delta_sec(&self) -> Option<i64> {
        project_finish_sec(self.elapsed_sec, self.distance_km, self.target_distance_km)
            .map(|p| (p - self.target_total_sec).round() as i64)
    }
}

/// Classifies standing and picks the checkpoint advice.
///
/// Returns `None` when nothing has been run yet. The second value of the
/// result is the next praise alternation flag.
pub fn goal_advice(
    reading: &GoalReading,
    dead_band_sec: f64,
    praise_alternate: bool,
) -> Option<(ProgressClass, GoalAdvice, bool)> {
    let delta = reading.finish_delta_sec()?;
    let class = ProgressClass::classify(delta as f64, dead_band_sec);
    let gap_sec = delta.unsigned_abs() as u32;

    let current = reading.current_pace as i64;
    let target = reading.target_pace() as i64;
    let dynamic = reading.dynamic_pace();
    let diff_vs_dynamic = current - dynamic as i64;
    let local = current - target;
    let remaining_km = reading.remaining_km();
    let time_left = reading.time_left_sec();

    let mut next_alternate = praise_alternate;
    let advice = match class {
        ProgressClass::OnTrack => match local.abs() {
            0..=20 => {
                next_alternate = !praise_alternate;
                GoalAdvice::HoldingPace {
                    alternate: next_alternate,
                }
            }
            21..=30 => GoalAdvice::SlightAdjust {
                speed_up: local > 0,
                dynamic_pace: dynamic,
            },
            _ => GoalAdvice::Adjust {
                speed_up: local > 0,
                current_pace: reading.current_pace,
                dynamic_pace: dynamic,
            },
        },
        ProgressClass::Behind => {
            let finishes_on_time =
                remaining_km > 0.0 && current as f64 * remaining_km <= time_left;
            if finishes_on_time && current < target {
                let behind_now = reading.elapsed_sec - target as f64 * reading.distance_km;
                let advantage = (target - current) as f64;
                let at_km = (behind_now > 0.0).then(|| {
                    ((reading.distance_km + behind_now / advantage).round() as u32).max(1)
                });
                GoalAdvice::BehindCatchingUp {
                    deficit_sec: gap_sec,
                    at_km,
                }
            } else if current < target {
                GoalAdvice::BehindCannotCatchUp {
                    deficit_sec: gap_sec,
                    dynamic_pace: dynamic,
                }
            } else {
                GoalAdvice::BehindDeficitGrowing {
                    deficit_sec: gap_sec,
                    dynamic_pace: dynamic,
                }
            }
        }
        ProgressClass::Ahead => {
            if current > target + 5 {
                let ahead_now = target as f64 * reading.distance_km - reading.elapsed_sec;
                let loss_rate = (current - target) as f64;
                let lose_at = ((reading.distance_km + ahead_now / loss_rate).round() as u32).max(1);
                let at_km = (lose_at as f64 <= reading.target_distance_km).then_some(lose_at);
                GoalAdvice::AheadLosingLead {
                    lead_sec: gap_sec,
                    at_km,
                    current_pace: reading.current_pace,
                    dynamic_pace: dynamic,
                }
            } else if diff_vs_dynamic < -20 {
                GoalAdvice::AheadBigCushion {
                    lead_sec: gap_sec,
                    current_pace: reading.current_pace,
                    dynamic_pace: dynamic,
                }
            } else {
                GoalAdvice::AheadHolding { lead_sec: gap_sec }
            }
        }
    };
    Some((class, advice, next_alternate))
}

/// Out-of-schedule alert raised on the edge into `Behind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyAlert {
    pub deficit_sec: u32,
    pub dynamic_pace: u32,
}

/// Fires only when the previous checkpoint was not already behind and the
/// average-pace projection now misses the target by more than the dead band.
pub fn emergency_alert(
    previous: ProgressClass,
    elapsed_sec: f64,
    distance_km: f64,
    target_distance_km: f64,
    target_total_sec: f64,
    dead_band_sec: f64,
) -> Option<EmergencyAlert> {
    if previous == ProgressClass::Behind || distance_km <= 0.01 || target_distance_km <= 0.0 {
        return None;
    }
    let predicted = project_finish_sec(elapsed_sec, distance_km, target_distance_km)?;
    let delta = (predicted - target_total_sec).round();
    if delta <= dead_band_sec {
        return None;
    }
    let target_pace = (target_total_sec / target_distance_km).round() as u32;
    let remaining_km = (target_distance_km - distance_km).max(0.0);
    Some(EmergencyAlert {
        deficit_sec: delta as u32,
        dynamic_pace: dynamic_target_pace(remaining_km, target_total_sec - elapsed_sec, target_pace),
    })
}

/// Mid-segment hint for interval work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalHint {
    Praise { alternate: bool },
    AverageSlow { average_pace: u32 },
    AverageFast { average_pace: u32 },
    BitFaster { current_pace: u32 },
    SpeedUp { current_pace: u32, target_pace: u32 },
    DontPush { current_pace: u32 },
    TooFast { current_pace: u32, target_pace: u32 },
}

/// Two-layer check: instantaneous pace first, then the stable-phase
/// average when the instant reading is on target.
pub fn interval_hint(
    current_pace: u32,
    target_pace: u32,
    average_pace: Option<u32>,
    alternate: bool,
    band_sec: i32,
) -> (IntervalHint, bool) {
    let diff = current_pace as i64 - target_pace as i64;
    let band = band_sec as i64;
    if diff.abs() <= band {
        let avg_diff = average_pace.map_or(0, |a| a as i64 - target_pace as i64);
        return match average_pace {
            Some(average_pace) if avg_diff > 10 => (IntervalHint::AverageSlow { average_pace }, alternate),
            Some(average_pace) if avg_diff < -10 => (IntervalHint::AverageFast { average_pace }, alternate),
            _ => (IntervalHint::Praise { alternate }, !alternate),
        };
    }
    let hint = if diff > 2 * band {
        IntervalHint::SpeedUp {
            current_pace,
            target_pace,
        }
    } else if diff > 0 {
        IntervalHint::BitFaster { current_pace }
    } else if diff >= -2 * band {
        IntervalHint::DontPush { current_pace }
    } else {
        IntervalHint::TooFast {
            current_pace,
            target_pace,
        }
    };
    (hint, alternate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReport {
    OnTarget,
    Slower { target_pace: u32, actual_pace: u32 },
    Faster { target_pace: u32, actual_pace: u32 },
    /// Stable phase too short or too little movement to judge.
    CouldNotEstimate,
    /// Segment ended before its stable phase began.
    WorkPhaseComplete,
}

pub fn interval_end_report(actual_pace: u32, target_pace: u32, band_sec: i32) -> EndReport {
    let diff = actual_pace as i64 - target_pace as i64;
    if diff.abs() <= band_sec as i64 {
        EndReport::OnTarget
    } else if diff > 0 {
        EndReport::Slower {
            target_pace,
            actual_pace,
        }
    } else {
        EndReport::Faster {
            target_pace,
            actual_pace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CheckpointAdvice {
    Good { remaining_km: f64 },
    SpeedUp { current_pace: u32, target_pace: u32 },
    EaseOff { current_pace: u32 },
}

pub fn free_pace_advice(
    current_pace: u32,
    target_pace: u32,
    remaining_km: f64,
    band_sec: i32,
) -> CheckpointAdvice {
    let diff = current_pace as i64 - target_pace as i64;
    if diff.abs() <= band_sec as i64 {
        CheckpointAdvice::Good { remaining_km }
    } else if diff > 0 {
        CheckpointAdvice::SpeedUp {
            current_pace,
            target_pace,
        }
    } else {
        CheckpointAdvice::EaseOff { current_pace }
    }
}

/// When mid-segment hints fire in a work segment, in stable-phase seconds
/// for the periodic schedules and in-segment seconds for the midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintSchedule {
    None,
    Midpoint { at_sec: u32 },
    Periodic { first_sec: u32, every_sec: u32 },
}

impl HintSchedule {
    pub fn for_duration(duration_sec: u32) -> Self {
        match duration_sec {
            0..=29 => HintSchedule::None,
            30..=119 => HintSchedule::Midpoint {
                at_sec: duration_sec / 2,
            },
            120..=299 => HintSchedule::Periodic {
                first_sec: 30,
                every_sec: 60,
            },
            300..=479 => HintSchedule::Periodic {
                first_sec: 60,
                every_sec: 60,
            },
            _ => HintSchedule::Periodic {
                first_sec: 60,
                every_sec: 120,
            },
        }
    }
}

/// Spacing of pace checkpoints inside a free-pace segment.
pub fn free_pace_checkpoint_step_m(target_m: f64, config: &ExecutorConfig) -> f64 {
    (target_m * config.checkpoint_fraction)
        .min(config.checkpoint_max_m)
        .max(config.checkpoint_min_m)
}

/// Distance between goal checkpoints: 10 % of the goal, tightening to
/// 1 km and then 0.5 km near the end of long goals.
pub fn goal_checkpoint_step_km(target_km: f64, distance_km: f64) -> Option<f64> {
    if target_km <= 0.0 {
        return None;
    }
    let progress = distance_km / target_km * 100.0;
    Some(if target_km < 10.0 || progress < 80.0 {
        target_km * 0.1
    } else if progress < 90.0 {
        1.0
    } else {
        0.5
    })
}
