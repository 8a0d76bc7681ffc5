//! Scenario execution: segment sequencing and timed coaching checkpoints.
//!
//! [`advance`] is the whole state machine. It takes the scenario, the
//! current [`ExecutionState`] and one tick's cumulative elapsed time and
//! distance, mutates the state and returns what should be said. Every
//! one-shot output is keyed by segment index, so evaluating the same tick
//! twice never repeats a phrase.

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ExecutorConfig;
use crate::events::CoachingEvent;
use crate::models::{ActiveSegment, Segment, SegmentBound, SegmentKind};
use crate::pacing::{
    self, EndReport, HintSchedule, PaceWindow, free_pace_advice, free_pace_checkpoint_step_m,
    interval_end_report, interval_hint,
};
use crate::phrases::Phrase;
use crate::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    pub elapsed_sec: u32,
    pub distance_m: f64,
}

/// Distance and time spent in one kind of segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTotal {
    pub distance_m: f64,
    pub time_sec: u32,
}

impl PhaseTotal {
    fn add(&mut self, distance_m: f64, time_sec: u32) {
        self.distance_m += distance_m;
        self.time_sec += time_sec;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StableMark {
    elapsed_sec: u32,
    distance_m: f64,
}

#[derive(Debug, Clone)]
pub struct ExecutionState {
    cursor: usize,
    segment_start_sec: u32,
    segment_start_m: f64,
    stable: Option<StableMark>,
    window: PaceWindow,
    last_tick_m: f64,
    last_tick_sec: Option<u32>,
    announced: Option<usize>,
    warned: Option<usize>,
    mid_hint: Option<usize>,
    rest_read: Option<usize>,
    end_report: Option<usize>,
    last_hint_stable_sec: Option<u32>,
    hint_alternate: bool,
    finished: bool,
    phase_totals: EnumMap<SegmentKind, PhaseTotal>,
}

impl ExecutionState {
    pub fn new(config: &ExecutorConfig, start: TickInput) -> Self {
        Self {
            cursor: 0,
            segment_start_sec: start.elapsed_sec,
            segment_start_m: start.distance_m,
            stable: None,
            window: PaceWindow::new(config.pace_window_sec),
            last_tick_m: start.distance_m,
            last_tick_sec: None,
            announced: None,
            warned: None,
            mid_hint: None,
            rest_read: None,
            end_report: None,
            last_hint_stable_sec: None,
            hint_alternate: false,
            finished: false,
            phase_totals: EnumMap::default(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Runs one tick of the scenario.
pub fn advance(
    scenario: &Scenario,
    config: &ExecutorConfig,
    state: &mut ExecutionState,
    input: TickInput,
) -> Vec<CoachingEvent> {
    let mut events = Vec::new();
    if state.finished {
        return events;
    }
    let Some(segment) = scenario.get(state.cursor) else {
        return events;
    };

    let index = state.cursor;
    let kind = segment.kind();
    let target_pace = segment.target_pace();
    let bound = segment.bound();
    let elapsed = input.elapsed_sec;
    let in_seg = elapsed.saturating_sub(state.segment_start_sec);
    let seg_dist = (input.distance_m - state.segment_start_m).max(0.0);
    let delta = (input.distance_m - state.last_tick_m).max(0.0);
    state.last_tick_m = input.distance_m;
    // A repeated evaluation of the same second must not feed the window again.
    let fresh = state.last_tick_sec.is_none_or(|s| elapsed > s);
    state.last_tick_sec = Some(elapsed);
    let remaining = match bound {
        SegmentBound::Time { duration_sec } => Some(duration_sec as i64 - in_seg as i64),
        SegmentBound::Distance { .. } => None,
    };
    let say = |phrase: Phrase| CoachingEvent::new(elapsed, Some(index), phrase);

    if state.announced != Some(index) {
        state.announced = Some(index);
        state.stable = None;
        state.window.clear();
        state.last_hint_stable_sec = None;
        info!(index, ?kind, "Segment started");
        events.push(say(Phrase::SegmentStart {
            kind,
            bound,
            target_pace,
        }));
    }

    if remaining == Some(config.warning_before_end_sec as i64) && state.warned != Some(index) {
        state.warned = Some(index);
        events.push(say(Phrase::ChangingSoon {
            in_sec: config.warning_before_end_sec,
        }));
    }

    if kind == SegmentKind::Work && state.stable.is_none() && in_seg >= config.acceleration_ignore_sec
    {
        state.stable = Some(StableMark {
            elapsed_sec: elapsed,
            distance_m: input.distance_m,
        });
        state.window.clear();
    }

    if fresh && (kind != SegmentKind::Work || state.stable.is_some()) {
        state.window.push(delta);
    }

    if let (Segment::Work { duration_sec, .. }, Some(target), Some(stable)) =
        (segment, target_pace, state.stable)
        && state.window.len() >= config.pace_window_min_samples
    {
        let stable_in = in_seg.saturating_sub(config.acceleration_ignore_sec);
        let schedule = HintSchedule::for_duration(*duration_sec);
        let due = match schedule {
            HintSchedule::None => false,
            HintSchedule::Midpoint { at_sec } => in_seg >= at_sec && state.mid_hint != Some(index),
            HintSchedule::Periodic {
                first_sec,
                every_sec,
            } => match state.last_hint_stable_sec {
                None => stable_in >= first_sec,
                Some(last) => stable_in.saturating_sub(last) >= every_sec && stable_in > last,
            },
        };
        let clear_of_end = remaining.is_some_and(|r| r > config.hint_quiet_tail_sec as i64);

        if due
            && clear_of_end
            && let Some(current) = window_pace(state, config)
        {
            let stable_dist = (input.distance_m - stable.distance_m).max(1.0);
            let stable_time = elapsed.saturating_sub(stable.elapsed_sec).max(1);
            let average = if stable_dist > config.report_min_stable_m {
                pacing::pace_from(stable_dist, stable_time as f64)
            } else {
                None
            };
            let (hint, next) = interval_hint(
                current,
                target,
                average,
                state.hint_alternate,
                config.on_target_band_sec,
            );
            state.hint_alternate = next;
            state.last_hint_stable_sec = Some(stable_in);
            if matches!(schedule, HintSchedule::Midpoint { .. }) {
                state.mid_hint = Some(index);
            }
            events.push(say(Phrase::IntervalHint(hint)));
        }
    }

    if let Segment::Rest { duration_sec, .. } = segment
        && *duration_sec >= config.rest_read_at_sec
        && in_seg == config.rest_read_at_sec
        && state.rest_read != Some(index)
    {
        state.rest_read = Some(index);
        events.push(say(Phrase::RestRead {
            pace: window_pace(state, config),
        }));
    }

    if let (SegmentBound::Distance { meters: target_m }, Some(target)) = (bound, target_pace)
        && target_m > 0.0
    {
        let step = free_pace_checkpoint_step_m(target_m, config);
        let last_n = ((seg_dist - delta).max(0.0) / step).floor();
        let cur_n = (seg_dist / step).floor();
        if cur_n > last_n
            && seg_dist < target_m - config.checkpoint_quiet_tail_m
            && let Some(current) = window_pace(state, config)
        {
            let remaining_km = (target_m - seg_dist) / 1000.0;
            events.push(say(Phrase::Checkpoint(free_pace_advice(
                current,
                target,
                remaining_km,
                config.on_target_band_sec,
            ))));
        }
    }

    let done = match bound {
        SegmentBound::Time { .. } => remaining.is_some_and(|r| r <= 0),
        SegmentBound::Distance { meters } => seg_dist >= meters,
    };
    if !done {
        return events;
    }

    if kind == SegmentKind::Work
        && let Some(target) = target_pace
        && state.end_report != Some(index)
    {
        state.end_report = Some(index);
        let report = match state.stable {
            None => EndReport::WorkPhaseComplete,
            Some(stable) => {
                let time = elapsed.saturating_sub(stable.elapsed_sec);
                let dist = (input.distance_m - stable.distance_m).max(0.0);
                if time < config.report_min_stable_sec || dist < config.report_min_stable_m {
                    EndReport::CouldNotEstimate
                } else {
                    match pacing::pace_from(dist, time as f64) {
                        Some(actual) => interval_end_report(actual, target, config.on_target_band_sec),
                        None => EndReport::CouldNotEstimate,
                    }
                }
            }
        };
        events.push(say(Phrase::EndReport(report)));
    }

    if let SegmentBound::Distance { meters } = bound
        && meters > 0.0
    {
        events.push(say(Phrase::DistanceComplete {
            distance_km: meters / 1000.0,
        }));
    }

    state.phase_totals[kind].add(seg_dist, in_seg);
    state.cursor += 1;
    debug!(index, elapsed, seg_dist, "Segment finished");

    if state.cursor >= scenario.len() {
        state.finished = true;
        info!(elapsed, "Scenario complete");
        events.push(CoachingEvent::new(elapsed, None, Phrase::WorkoutComplete));
        return events;
    }

    state.segment_start_sec = elapsed;
    state.segment_start_m = input.distance_m;
    state.last_hint_stable_sec = None;
    events
}

fn window_pace(state: &ExecutionState, config: &ExecutorConfig) -> Option<u32> {
    state
        .window
        .pace(config.pace_window_min_samples, config.pace_window_min_distance_m)
}

/// Owns a scenario and its execution state.
#[derive(Debug, Clone)]
pub struct ScenarioExecutor {
    scenario: Scenario,
    config: ExecutorConfig,
    state: ExecutionState,
}

impl ScenarioExecutor {
    pub fn new(scenario: Scenario, config: ExecutorConfig, start: TickInput) -> Self {
        let state = ExecutionState::new(&config, start);
        Self {
            scenario,
            config,
            state,
        }
    }

    pub fn tick(&mut self, input: TickInput) -> Vec<CoachingEvent> {
        advance(&self.scenario, &self.config, &mut self.state, input)
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    pub fn active_segment(&self, input: TickInput) -> Option<ActiveSegment> {
        if self.state.finished {
            return None;
        }
        let segment = self.scenario.get(self.state.cursor)?;
        let in_seg = input.elapsed_sec.saturating_sub(self.state.segment_start_sec);
        let covered = (input.distance_m - self.state.segment_start_m).max(0.0);
        let (remaining_sec, covered_m) = match segment.bound() {
            SegmentBound::Time { duration_sec } => (Some(duration_sec.saturating_sub(in_seg)), None),
            SegmentBound::Distance { .. } => (None, Some(covered)),
        };
        Some(ActiveSegment {
            kind: segment.kind(),
            remaining_sec,
            covered_m,
            index: self.state.cursor,
            total: self.scenario.len(),
            target_pace_sec_per_km: segment.target_pace(),
        })
    }

    /// Per-kind totals including the unfinished current segment.
    pub fn phase_totals(&self, input: TickInput) -> EnumMap<SegmentKind, PhaseTotal> {
        let mut totals = self.state.phase_totals.clone();
        if !self.state.finished
            && self.state.announced == Some(self.state.cursor)
            && let Some(segment) = self.scenario.get(self.state.cursor)
        {
            totals[segment.kind()].add(
                (input.distance_m - self.state.segment_start_m).max(0.0),
                input.elapsed_sec.saturating_sub(self.state.segment_start_sec),
            );
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pacing::{CheckpointAdvice, IntervalHint};

    fn run(scenario: &Scenario, speed_mps: f64, seconds: u32) -> Vec<CoachingEvent> {
        let config = ExecutorConfig::default();
        let mut state = ExecutionState::new(&config, TickInput {
            elapsed_sec: 0,
            distance_m: 0.0,
        });
        let mut events = Vec::new();
        for t in 1..=seconds {
            events.extend(advance(
                scenario,
                &config,
                &mut state,
                TickInput {
                    elapsed_sec: t,
                    distance_m: speed_mps * t as f64,
                },
            ));
        }
        events
    }

    fn work(duration_sec: u32, pace: u32) -> Segment {
        Segment::Work {
            duration_sec,
            target_pace_sec_per_km: Some(pace),
        }
    }

    fn rest(duration_sec: u32) -> Segment {
        Segment::Rest {
            duration_sec,
            target_pace_sec_per_km: None,
        }
    }

    #[test]
    fn test_time_segment_transitions_once_at_duration() {
        let scenario = Scenario::new(vec![rest(20), rest(20)]);
        let events = run(&scenario, 2.0, 45);
        let starts: Vec<u32> = events
            .iter()
            .filter(|e| matches!(e.phrase, Phrase::SegmentStart { .. }))
            .map(|e| e.elapsed_sec)
            .collect();
        // Second segment is announced on the tick after the first ends.
        assert_eq!(starts, vec![1, 21]);
        let complete: Vec<u32> = events
            .iter()
            .filter(|e| e.phrase == Phrase::WorkoutComplete)
            .map(|e| e.elapsed_sec)
            .collect();
        assert_eq!(complete, vec![40]);
    }

    #[test]
    fn test_warning_fires_once_ten_seconds_before_end() {
        let scenario = Scenario::new(vec![rest(30)]);
        let events = run(&scenario, 2.0, 30);
        let warnings: Vec<u32> = events
            .iter()
            .filter(|e| matches!(e.phrase, Phrase::ChangingSoon { .. }))
            .map(|e| e.elapsed_sec)
            .collect();
        assert_eq!(warnings, vec![20]);
    }

    #[test]
    fn test_redundant_ticks_do_not_double_fire() {
        let config = ExecutorConfig::default();
        let scenario = Scenario::new(vec![work(60, 300), rest(60)]);
        let mut state = ExecutionState::new(&config, TickInput {
            elapsed_sec: 0,
            distance_m: 0.0,
        });
        let mut events = Vec::new();
        for t in 1..=120u32 {
            let input = TickInput {
                elapsed_sec: t,
                distance_m: 3.3 * t as f64,
            };
            events.extend(advance(&scenario, &config, &mut state, input));
            events.extend(advance(&scenario, &config, &mut state, input));
        }
        let count = |pred: fn(&Phrase) -> bool| events.iter().filter(|e| pred(&e.phrase)).count();
        assert_eq!(count(|p| matches!(p, Phrase::ChangingSoon { .. })), 2);
        assert_eq!(count(|p| matches!(p, Phrase::EndReport(_))), 1);
        assert_eq!(count(|p| matches!(p, Phrase::IntervalHint(_))), 1);
        assert_eq!(count(|p| matches!(p, Phrase::RestRead { .. })), 1);
    }

    #[test]
    fn test_short_work_has_no_hints() {
        let scenario = Scenario::new(vec![work(20, 300)]);
        let events = run(&scenario, 1000.0 / 300.0, 20);
        assert!(!events.iter().any(|e| matches!(e.phrase, Phrase::IntervalHint(_))));
        assert!(matches!(
            events.iter().find(|e| matches!(e.phrase, Phrase::EndReport(_))).map(|e| &e.phrase),
            Some(Phrase::EndReport(EndReport::OnTarget))
        ));
    }

    #[test]
    fn test_work_shorter_than_ignore_window() {
        let scenario = Scenario::new(vec![work(2, 300)]);
        let events = run(&scenario, 3.0, 2);
        assert!(events
            .iter()
            .any(|e| e.phrase == Phrase::EndReport(EndReport::WorkPhaseComplete)));
    }

    #[test]
    fn test_standing_still_cannot_estimate() {
        let scenario = Scenario::new(vec![work(40, 300)]);
        let events = run(&scenario, 0.0, 40);
        assert!(events
            .iter()
            .any(|e| e.phrase == Phrase::EndReport(EndReport::CouldNotEstimate)));
        assert!(!events.iter().any(|e| matches!(e.phrase, Phrase::IntervalHint(_))));
    }

    #[test]
    fn test_midpoint_hint() {
        let scenario = Scenario::new(vec![work(90, 300)]);
        let events = run(&scenario, 1000.0 / 300.0, 90);
        let hints: Vec<&CoachingEvent> = events
            .iter()
            .filter(|e| matches!(e.phrase, Phrase::IntervalHint(_)))
            .collect();
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].elapsed_sec, 45);
        assert_eq!(hints[0].phrase, Phrase::IntervalHint(IntervalHint::Praise { alternate: false }));
    }

    #[test]
    fn test_long_work_hint_schedule() {
        let scenario = Scenario::new(vec![work(600, 300)]);
        let events = run(&scenario, 1000.0 / 300.0, 600);
        let at: Vec<u32> = events
            .iter()
            .filter(|e| matches!(e.phrase, Phrase::IntervalHint(_)))
            .map(|e| e.elapsed_sec)
            .collect();
        assert_eq!(at, vec![63, 183, 303, 423, 543]);
    }

    #[test]
    fn test_free_pace_checkpoints_and_completion() {
        let scenario = Scenario::new(vec![Segment::FreePace {
            distance_km: 1.0,
            target_pace_sec_per_km: Some(300),
        }]);
        // 4 m/s is 250 s/km: faster than target.
        let events = run(&scenario, 4.0, 260);
        let checkpoints: Vec<&CoachingEvent> = events
            .iter()
            .filter(|e| matches!(e.phrase, Phrase::Checkpoint(_)))
            .collect();
        // Every 100 m, none inside the last 50 m.
        assert_eq!(checkpoints.len(), 9);
        assert_eq!(checkpoints[0].elapsed_sec, 25);
        assert_eq!(
            checkpoints[0].phrase,
            Phrase::Checkpoint(CheckpointAdvice::EaseOff { current_pace: 250 })
        );
        let done: Vec<u32> = events
            .iter()
            .filter(|e| matches!(e.phrase, Phrase::DistanceComplete { .. }))
            .map(|e| e.elapsed_sec)
            .collect();
        assert_eq!(done, vec![250]);
        assert!(events.iter().any(|e| e.phrase == Phrase::WorkoutComplete));
    }

    #[test]
    fn test_empty_free_pace_completes_immediately() {
        let scenario = Scenario::new(vec![
            Segment::FreePace {
                distance_km: 0.0,
                target_pace_sec_per_km: Some(300),
            },
            rest(10),
        ]);
        let events = run(&scenario, 3.0, 3);
        let starts: Vec<(u32, Option<usize>)> = events
            .iter()
            .filter(|e| matches!(e.phrase, Phrase::SegmentStart { .. }))
            .map(|e| (e.elapsed_sec, e.segment_index))
            .collect();
        assert_eq!(starts, vec![(1, Some(0)), (2, Some(1))]);
    }

    #[test]
    fn test_empty_scenario_is_silent() {
        assert!(run(&Scenario::default(), 3.0, 10).is_empty());
    }

    #[test]
    fn test_phase_totals() {
        let config = ExecutorConfig::default();
        let scenario = Scenario::new(vec![work(30, 300), rest(30)]);
        let mut exec = ScenarioExecutor::new(scenario, config, TickInput {
            elapsed_sec: 0,
            distance_m: 0.0,
        });
        for t in 1..=45u32 {
            exec.tick(TickInput {
                elapsed_sec: t,
                distance_m: 2.0 * t as f64,
            });
        }
        let now = TickInput {
            elapsed_sec: 45,
            distance_m: 90.0,
        };
        let totals = exec.phase_totals(now);
        assert_eq!(totals[SegmentKind::Work], PhaseTotal {
            distance_m: 60.0,
            time_sec: 30
        });
        assert_eq!(totals[SegmentKind::Rest], PhaseTotal {
            distance_m: 30.0,
            time_sec: 15
        });
        let active = exec.active_segment(now).unwrap();
        assert_eq!(active.index, 1);
        assert_eq!(active.remaining_sec, Some(15));
    }
}
