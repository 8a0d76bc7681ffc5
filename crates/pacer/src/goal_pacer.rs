//! Pacing for a single distance goal with a time or pace target.
//!
//! Regular checkpoints fall every 10 % of the goal (tightening near the end
//! of long goals) and speak the decision-table advice. Between them an
//! emergency check runs every 250 m and raises an alert only on the edge
//! into `Behind`, after which it stays quiet until the next checkpoint.

use tracing::{debug, info};

use crate::config::{ExecutorConfig, GoalPacerConfig};
use crate::events::CoachingEvent;
use crate::executor::TickInput;
use crate::models::GoalParams;
use crate::pacing::{
    GoalReading, PaceWindow, ProgressClass, emergency_alert, goal_advice, goal_checkpoint_step_km,
    pace_from,
};
use crate::phrases::Phrase;

const GOAL_EPSILON_KM: f64 = 0.001;

#[derive(Debug, Clone)]
pub struct GoalPacer {
    goal: GoalParams,
    config: GoalPacerConfig,
    window_min_samples: usize,
    window_min_distance_m: f64,
    window: PaceWindow,
    last_tick_m: f64,
    last_checkpoint_km: f64,
    span_start_m: f64,
    span_start_sec: u32,
    previous_class: ProgressClass,
    praise_alternate: bool,
    last_emergency_check_km: f64,
    emergency_cooldown_until_km: f64,
    goal_reached: bool,
}

impl GoalPacer {
    pub fn new(goal: GoalParams, config: GoalPacerConfig, executor: &ExecutorConfig) -> Self {
        Self {
            goal,
            config,
            window_min_samples: executor.pace_window_min_samples,
            window_min_distance_m: executor.pace_window_min_distance_m,
            window: PaceWindow::new(executor.pace_window_sec),
            last_tick_m: 0.0,
            last_checkpoint_km: 0.0,
            span_start_m: 0.0,
            span_start_sec: 0,
            previous_class: ProgressClass::OnTrack,
            praise_alternate: false,
            last_emergency_check_km: 0.0,
            emergency_cooldown_until_km: 0.0,
            goal_reached: false,
        }
    }

    pub fn goal(&self) -> &GoalParams {
        &self.goal
    }

    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    pub fn previous_class(&self) -> ProgressClass {
        self.previous_class
    }

    /// Resumes a restored session at `input` without replaying old checkpoints.
    pub fn resume_at(&mut self, input: TickInput, goal_reached: bool) {
        let km = input.distance_m / 1000.0;
        self.last_tick_m = input.distance_m;
        self.last_checkpoint_km = km;
        self.span_start_m = input.distance_m;
        self.span_start_sec = input.elapsed_sec;
        self.last_emergency_check_km = km;
        self.goal_reached = goal_reached;
        self.window.clear();
    }

    /// Forgets the pace window so a pause does not leak into the next reading.
    pub fn on_resume(&mut self) {
        self.window.clear();
    }

    pub fn tick(&mut self, input: TickInput) -> Vec<CoachingEvent> {
        let mut events = Vec::new();
        let delta = (input.distance_m - self.last_tick_m).max(0.0);
        self.last_tick_m = input.distance_m;
        self.window.push(delta);

        let target_km = self.goal.target_distance_km;
        if self.goal_reached || target_km <= 0.0 {
            return events;
        }
        let distance_km = input.distance_m / 1000.0;

        if distance_km + GOAL_EPSILON_KM >= target_km {
            self.goal_reached = true;
            info!(distance_km, elapsed = input.elapsed_sec, "Goal reached");
            events.push(CoachingEvent::new(input.elapsed_sec, None, Phrase::GoalReached));
            return events;
        }

        let Some(step) = goal_checkpoint_step_km(target_km, distance_km) else {
            return events;
        };
        if distance_km - self.last_checkpoint_km >= step
            && distance_km > self.config.first_checkpoint_min_km
        {
            self.last_checkpoint_km = distance_km;
            if let Some(phrase) = self.checkpoint(input) {
                events.push(CoachingEvent::new(input.elapsed_sec, None, phrase));
            }
        }

        if let Some(phrase) = self.emergency(input, step) {
            events.push(CoachingEvent::new(input.elapsed_sec, None, phrase));
        }
        events
    }

    fn checkpoint(&mut self, input: TickInput) -> Option<Phrase> {
        let span_m = input.distance_m - self.span_start_m;
        let span_sec = input.elapsed_sec.saturating_sub(self.span_start_sec);
        self.span_start_m = input.distance_m;
        self.span_start_sec = input.elapsed_sec;

        let target_total = self.goal.target_total_sec()? as f64;
        let span_pace = if span_m >= self.config.min_checkpoint_span_m && span_sec > 0 {
            pace_from(span_m, span_sec as f64)
        } else {
            None
        };
        let current = self
            .window
            .pace(self.window_min_samples, self.window_min_distance_m)
            .or(span_pace)?;
        if current < self.config.min_plausible_pace_sec || current > self.config.max_plausible_pace_sec
        {
            debug!(current, "Implausible checkpoint pace ignored");
            return None;
        }

        let reading = GoalReading {
            elapsed_sec: input.elapsed_sec as f64,
            distance_km: input.distance_m / 1000.0,
            target_distance_km: self.goal.target_distance_km,
            target_total_sec: target_total,
            current_pace: current,
        };
        let (class, advice, next) =
            goal_advice(&reading, self.config.dead_band_sec, self.praise_alternate)?;
        self.praise_alternate = next;
        self.previous_class = class;
        self.emergency_cooldown_until_km = 0.0;
        debug!(?class, current, "Goal checkpoint");
        Some(Phrase::Goal(advice))
    }

    fn emergency(&mut self, input: TickInput, step_km: f64) -> Option<Phrase> {
        let target_total = self.goal.target_total_sec()? as f64;
        let distance_km = input.distance_m / 1000.0;
        if distance_km - self.last_emergency_check_km < self.config.emergency_every_km {
            return None;
        }
        self.last_emergency_check_km = distance_km;

        let next_checkpoint_km = self.last_checkpoint_km + step_km;
        if next_checkpoint_km - distance_km < self.config.emergency_min_lead_km {
            return None;
        }
        if distance_km < self.emergency_cooldown_until_km {
            return None;
        }

        let alert = emergency_alert(
            self.previous_class,
            input.elapsed_sec as f64,
            distance_km,
            self.goal.target_distance_km,
            target_total,
            self.config.dead_band_sec,
        )?;
        self.emergency_cooldown_until_km = next_checkpoint_km;
        info!(deficit = alert.deficit_sec, "Emergency pace alert");
        Some(Phrase::Emergency(alert))
    }
}
