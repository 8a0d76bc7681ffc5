//! English rendering of coaching decisions.
//!
//! The engines decide *what* to say as structured values; this module is
//! the only place that turns them into text for the speech sink.

use std::fmt;

use crate::models::{SegmentBound, SegmentKind};
use crate::pacing::{CheckpointAdvice, EmergencyAlert, EndReport, GoalAdvice, IntervalHint};

#[derive(Debug, Clone, PartialEq)]
pub enum Phrase {
    SegmentStart {
        kind: SegmentKind,
        bound: SegmentBound,
        target_pace: Option<u32>,
    },
    ChangingSoon {
        in_sec: u32,
    },
    IntervalHint(IntervalHint),
    RestRead {
        pace: Option<u32>,
    },
    Checkpoint(CheckpointAdvice),
    EndReport(EndReport),
    DistanceComplete {
        distance_km: f64,
    },
    WorkoutComplete,
    Goal(GoalAdvice),
    Emergency(EmergencyAlert),
    GoalReached,
}

/// Pace the way runners say it: 330 is "5 30", 300 "5 flat", 305 "5 oh 5".
pub fn spoken_pace(sec_per_km: u32) -> String {
    let m = sec_per_km / 60;
    let s = sec_per_km % 60;
    match s {
        0 => format!("{m} flat"),
        1..=9 => format!("{m} oh {s}"),
        _ => format!("{m} {s}"),
    }
}

fn plural(n: u32, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// "1 minute 5 seconds", "45 seconds", "2 minutes".
pub fn spoken_duration(total_sec: u32) -> String {
    let m = total_sec / 60;
    let s = total_sec % 60;
    match (m, s) {
        (0, s) => plural(s, "second", "seconds"),
        (m, 0) => plural(m, "minute", "minutes"),
        (m, s) => format!(
            "{} {}",
            plural(m, "minute", "minutes"),
            plural(s, "second", "seconds")
        ),
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phrase::SegmentStart {
                kind,
                bound,
                target_pace,
            } => {
                write!(f, "{}. ", kind.label())?;
                match bound {
                    SegmentBound::Time { duration_sec } => {
                        write!(f, "{}.", spoken_duration(*duration_sec))?
                    }
                    SegmentBound::Distance { meters } => {
                        write!(f, "{:.1} kilometers.", meters / 1000.0)?
                    }
                }
                if let Some(p) = target_pace {
                    write!(f, " Pace {}.", spoken_pace(*p))?;
                }
                Ok(())
            }
            Phrase::ChangingSoon { in_sec } => {
                write!(f, "Changing in {}.", spoken_duration(*in_sec))
            }
            Phrase::IntervalHint(hint) => write!(f, "{hint}"),
            Phrase::RestRead { pace: Some(p) } => write!(f, "Rest. Pace about {}.", spoken_pace(*p)),
            Phrase::RestRead { pace: None } => write!(f, "Rest."),
            Phrase::Checkpoint(advice) => write!(f, "{advice}"),
            Phrase::EndReport(report) => write!(f, "{report}"),
            Phrase::DistanceComplete { distance_km } => {
                write!(f, "Distance complete. {distance_km:.1} kilometers.")
            }
            Phrase::WorkoutComplete => write!(f, "Workout complete."),
            Phrase::Goal(advice) => write!(f, "{advice}"),
            Phrase::Emergency(alert) => write!(
                f,
                "Warning! Behind by {}. Need pace {}. Speed up.",
                spoken_duration(alert.deficit_sec),
                spoken_pace(alert.dynamic_pace)
            ),
            Phrase::GoalReached => write!(f, "Goal reached. Workout paused."),
        }
    }
}

impl fmt::Display for IntervalHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IntervalHint::Praise { alternate: true } => write!(f, "Keep it up."),
            IntervalHint::Praise { alternate: false } => write!(f, "Good pace."),
            IntervalHint::AverageSlow { average_pace } => write!(
                f,
                "Pace is good now, but averaging {}. Pick it up.",
                spoken_pace(average_pace)
            ),
            IntervalHint::AverageFast { average_pace } => write!(
                f,
                "Pace is good, averaging {}. You can relax.",
                spoken_pace(average_pace)
            ),
            IntervalHint::BitFaster { current_pace } => {
                write!(f, "Pace {}. A bit faster.", spoken_pace(current_pace))
            }
            IntervalHint::SpeedUp {
                current_pace,
                target_pace,
            } => write!(
                f,
                "Pace {}. Need {}. Speed up.",
                spoken_pace(current_pace),
                spoken_pace(target_pace)
            ),
            IntervalHint::DontPush { current_pace } => {
                write!(f, "Don't push. Pace {}.", spoken_pace(current_pace))
            }
            IntervalHint::TooFast {
                current_pace,
                target_pace,
            } => write!(
                f,
                "Too fast. Pace {}, need {}.",
                spoken_pace(current_pace),
                spoken_pace(target_pace)
            ),
        }
    }
}

impl fmt::Display for CheckpointAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            CheckpointAdvice::Good { remaining_km } => {
                write!(f, "Pace is good. {remaining_km:.1} kilometers left.")
            }
            CheckpointAdvice::SpeedUp {
                current_pace,
                target_pace,
            } => write!(
                f,
                "Pace {}. Need {}. Speed up.",
                spoken_pace(current_pace),
                spoken_pace(target_pace)
            ),
            CheckpointAdvice::EaseOff { current_pace } => {
                write!(f, "Ease off. Pace {}.", spoken_pace(current_pace))
            }
        }
    }
}

impl fmt::Display for EndReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EndReport::OnTarget => write!(f, "Great pace. Keep it up."),
            EndReport::Slower {
                target_pace,
                actual_pace,
            } => write!(
                f,
                "Slower than required. Target {}, actual {}.",
                spoken_pace(target_pace),
                spoken_pace(actual_pace)
            ),
            EndReport::Faster {
                target_pace,
                actual_pace,
            } => write!(
                f,
                "Faster than required. Target {}, actual {}.",
                spoken_pace(target_pace),
                spoken_pace(actual_pace)
            ),
            EndReport::CouldNotEstimate => write!(f, "Work done. Could not estimate the pace."),
            EndReport::WorkPhaseComplete => write!(f, "Work phase complete."),
        }
    }
}

impl fmt::Display for GoalAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            GoalAdvice::HoldingPace { alternate: true } => {
                write!(f, "Perfect pace. Right on schedule.")
            }
            GoalAdvice::HoldingPace { alternate: false } => write!(f, "Great pace. Keep it up."),
            GoalAdvice::SlightAdjust {
                speed_up,
                dynamic_pace,
            } => write!(
                f,
                "On schedule. Need pace {}. {}",
                spoken_pace(dynamic_pace),
                if speed_up {
                    "Speed up a little."
                } else {
                    "Slow down a little."
                }
            ),
            GoalAdvice::Adjust {
                speed_up,
                current_pace,
                dynamic_pace,
            } => write!(
                f,
                "On schedule. Current pace {}, need {}. {}",
                spoken_pace(current_pace),
                spoken_pace(dynamic_pace),
                if speed_up {
                    "Speed up a bit."
                } else {
                    "Ease off a bit."
                }
            ),
            GoalAdvice::BehindCatchingUp {
                deficit_sec,
                at_km: Some(km),
            } => write!(
                f,
                "Behind by {}. At this pace you will catch up by kilometer {km}.",
                spoken_duration(deficit_sec)
            ),
            GoalAdvice::BehindCatchingUp {
                deficit_sec,
                at_km: None,
            } => write!(
                f,
                "Behind by {}. At this pace you will finish on time.",
                spoken_duration(deficit_sec)
            ),
            GoalAdvice::BehindCannotCatchUp {
                deficit_sec,
                dynamic_pace,
            } => write!(
                f,
                "Behind by {}. At this pace you will not catch up. Need pace {}. Try to speed up.",
                spoken_duration(deficit_sec),
                spoken_pace(dynamic_pace)
            ),
            GoalAdvice::BehindDeficitGrowing {
                deficit_sec,
                dynamic_pace,
            } => write!(
                f,
                "Behind by {} and falling further behind. Need pace {}. Push harder.",
                spoken_duration(deficit_sec),
                spoken_pace(dynamic_pace)
            ),
            GoalAdvice::AheadLosingLead {
                lead_sec,
                at_km: Some(km),
                current_pace,
                dynamic_pace,
            } => write!(
                f,
                "Ahead by {}, but at this pace you will lose the lead by kilometer {km}. Current pace {}, need {}.",
                spoken_duration(lead_sec),
                spoken_pace(current_pace),
                spoken_pace(dynamic_pace)
            ),
            GoalAdvice::AheadLosingLead {
                lead_sec,
                at_km: None,
                current_pace,
                dynamic_pace,
            } => write!(
                f,
                "Ahead by {}, but the pace has dropped. Current pace {}, need {}. Pick it up.",
                spoken_duration(lead_sec),
                spoken_pace(current_pace),
                spoken_pace(dynamic_pace)
            ),
            GoalAdvice::AheadBigCushion {
                lead_sec,
                current_pace,
                dynamic_pace,
            } => write!(
                f,
                "Ahead by {}. Current pace {}, need {}. You can ease off a little.",
                spoken_duration(lead_sec),
                spoken_pace(current_pace),
                spoken_pace(dynamic_pace)
            ),
            GoalAdvice::AheadHolding { lead_sec } => {
                write!(f, "Ahead by {}. Pace is good.", spoken_duration(lead_sec))
            }
        }
    }
}
