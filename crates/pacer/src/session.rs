//! Workout session controller.
//!
//! [`WorkoutSession`] is the single owner of every piece of mutable workout
//! state. The host queues raw fixes and step counts as they arrive and calls
//! [`WorkoutSession::tick`] once per second while running; each tick drains
//! the queues through the filter and the fallback engine, advances the
//! cumulative distance and runs the active plan.

use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cadence_fallback::{CadenceFallbackEngine, MotionState};
use crate::config::PacerConfig;
use crate::events::CoachingEvent;
use crate::executor::{ScenarioExecutor, TickInput};
use crate::goal_pacer::GoalPacer;
use crate::models::{GoalParams, RawFix, SessionSnapshot, WorkoutMode};
use crate::phrases::Phrase;
use crate::position_filter::{FixOutcome, PositionFilter};
use crate::store::{KeyValueStore, PacerStore};
use crate::summary::WorkoutSummary;

/// What drives coaching for the current workout.
#[derive(Debug, Clone)]
pub enum Plan {
    FreeRun,
    Goal(GoalPacer),
    Scenario(ScenarioExecutor),
}

impl Plan {
    fn name(&self) -> &'static str {
        match self {
            Plan::FreeRun => "free_run",
            Plan::Goal(_) => "goal",
            Plan::Scenario(_) => "scenario",
        }
    }
}

/// Result of one tick: what the UI shows and what the runner hears.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub snapshot: SessionSnapshot,
    pub events: Vec<CoachingEvent>,
}

pub struct WorkoutSession<K> {
    config: PacerConfig,
    store: PacerStore<K>,
    session_id: Uuid,
    mode: WorkoutMode,
    started_at: Option<OffsetDateTime>,
    elapsed_sec: u32,
    distance_m: f64,
    running: bool,
    paused: bool,
    filter: PositionFilter,
    fallback: CadenceFallbackEngine,
    plan: Plan,
    pending_fixes: Vec<RawFix>,
    pending_steps: u32,
}

impl<K: KeyValueStore> WorkoutSession<K> {
    pub fn new(config: PacerConfig, store: K) -> Self {
        let store = PacerStore::new(store);
        let profile = store.stride_profile();
        let filter = PositionFilter::new(config.filter.clone());
        let fallback = CadenceFallbackEngine::new(config.fallback.clone(), profile);
        Self {
            config,
            store,
            session_id: Uuid::new_v4(),
            mode: WorkoutMode::Normal,
            started_at: None,
            elapsed_sec: 0,
            distance_m: 0.0,
            running: false,
            paused: false,
            filter,
            fallback,
            plan: Plan::FreeRun,
            pending_fixes: Vec::new(),
            pending_steps: 0,
        }
    }

    /// Rebuilds a session that was running when the process died.
    ///
    /// The session comes back paused; the next `start_or_resume` takes a
    /// fresh position baseline. Scenario progress is not persisted, so a
    /// restored interval or combo workout continues as a free run.
    pub fn restore(config: PacerConfig, store: K) -> Option<Self> {
        let mut session = Self::new(config, store);
        let snapshot = session.store.runtime()?;
        if !snapshot.running {
            return None;
        }
        session.session_id = snapshot.session_id;
        session.started_at = snapshot.started_at;
        session.elapsed_sec = (snapshot.elapsed_ms / 1000) as u32;
        session.distance_m = snapshot.distance_km * 1000.0;
        session.running = true;
        session.paused = true;

        let goal = session.store.goal();
        session.mode = goal.as_ref().map(|g| g.mode).unwrap_or_default();
        session.plan = match goal {
            Some(goal) if Self::is_goal_plan(&goal) => {
                let mut pacer = GoalPacer::new(
                    goal,
                    session.config.goal.clone(),
                    &session.config.executor,
                );
                pacer.resume_at(session.input(), snapshot.goal_reached);
                Plan::Goal(pacer)
            }
            _ => Plan::FreeRun,
        };
        info!(
            session_id = %session.session_id,
            elapsed_sec = session.elapsed_sec,
            distance_km = snapshot.distance_km,
            plan = session.plan.name(),
            "Restored session"
        );
        Some(session)
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    pub fn store(&self) -> &PacerStore<K> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PacerStore<K> {
        &mut self.store
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn mode(&self) -> WorkoutMode {
        self.mode
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_active(&self) -> bool {
        self.running && !self.paused
    }

    pub fn elapsed_sec(&self) -> u32 {
        self.elapsed_sec
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    pub fn motion_state(&self) -> MotionState {
        self.fallback.state()
    }

    pub fn start_or_resume(&mut self) {
        if self.is_active() {
            return;
        }
        if !self.running {
            self.running = true;
            self.paused = false;
            self.started_at = Some(OffsetDateTime::now_utc());
            self.elapsed_sec = 0;
            self.distance_m = 0.0;
            self.plan = self.load_plan();
            info!(
                session_id = %self.session_id,
                mode = ?self.mode,
                plan = self.plan.name(),
                "Workout started"
            );
        } else {
            self.paused = false;
            if let Plan::Goal(pacer) = &mut self.plan {
                pacer.on_resume();
            }
            info!(session_id = %self.session_id, elapsed_sec = self.elapsed_sec, "Workout resumed");
        }
        self.reset_tracking();
        self.persist_runtime();
    }

    pub fn pause(&mut self) {
        if !self.is_active() {
            return;
        }
        self.paused = true;
        self.reset_tracking();
        info!(session_id = %self.session_id, elapsed_sec = self.elapsed_sec, "Workout paused");
        self.persist_runtime();
    }

    /// Ends the workout and returns its history record, or `None` when
    /// nothing was running.
    pub fn stop_and_reset(&mut self) -> Option<WorkoutSummary> {
        if !self.running {
            return None;
        }
        let date = self.started_at.unwrap_or_else(OffsetDateTime::now_utc);
        let mut summary = WorkoutSummary::new(date, self.mode, self.distance_km(), self.elapsed_sec);
        if let Plan::Scenario(executor) = &self.plan {
            summary = summary.with_phase_totals(&executor.phase_totals(self.input()));
        }
        if let Err(e) = self.store.save_summary(&summary) {
            error!("Failed to save workout summary: {e}");
        }
        if let Err(e) = self.store.clear_runtime() {
            error!("Failed to clear runtime snapshot: {e}");
        }
        info!(
            session_id = %self.session_id,
            distance_km = summary.distance_km,
            elapsed_sec = summary.elapsed_sec,
            "Workout stopped"
        );

        self.session_id = Uuid::new_v4();
        self.started_at = None;
        self.elapsed_sec = 0;
        self.distance_m = 0.0;
        self.running = false;
        self.paused = false;
        self.plan = Plan::FreeRun;
        self.reset_tracking();
        Some(summary)
    }

    /// Queues a fix for the next tick. Ignored unless the workout is active.
    pub fn push_fix(&mut self, fix: RawFix) {
        if self.is_active() {
            self.pending_fixes.push(fix);
        }
    }

    /// Queues step-counter increments for the next tick.
    pub fn push_steps(&mut self, steps: u32) {
        if self.is_active() {
            self.pending_steps = self.pending_steps.saturating_add(steps);
        }
    }

    pub fn tick(&mut self) -> TickReport {
        if !self.is_active() {
            return TickReport {
                snapshot: self.snapshot(),
                events: Vec::new(),
            };
        }

        for fix in std::mem::take(&mut self.pending_fixes) {
            match self.filter.accept(fix) {
                FixOutcome::Baseline(_) => debug!("Position baseline set"),
                FixOutcome::Accepted(delta) => {
                    self.distance_m += self.fallback.on_fix_accepted(delta.meters);
                }
                FixOutcome::Rejected(reason) => self.fallback.on_fix_rejected(&reason),
            }
        }
        let steps = std::mem::take(&mut self.pending_steps);
        self.distance_m += self.fallback.process_tick(steps);
        if let Some(profile) = self.fallback.take_profile_update()
            && let Err(e) = self.store.save_stride_profile(&profile)
        {
            error!("Failed to save stride profile: {e}");
        }

        self.elapsed_sec += 1;
        let input = self.input();
        let events = match &mut self.plan {
            Plan::FreeRun => Vec::new(),
            Plan::Goal(pacer) => pacer.tick(input),
            Plan::Scenario(executor) => executor.tick(input),
        };

        let finished = events
            .iter()
            .any(|e| matches!(e.phrase, Phrase::WorkoutComplete | Phrase::GoalReached));
        if finished {
            self.pause();
        } else {
            self.persist_runtime();
        }

        TickReport {
            snapshot: self.snapshot(),
            events,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (goal_reached, active_segment) = match &self.plan {
            Plan::FreeRun => (false, None),
            Plan::Goal(pacer) => (pacer.goal_reached(), None),
            Plan::Scenario(executor) => (false, executor.active_segment(self.input())),
        };
        SessionSnapshot {
            session_id: self.session_id,
            started_at: self.started_at,
            elapsed_ms: self.elapsed_sec as u64 * 1000,
            distance_km: self.distance_km(),
            running: self.running,
            paused: self.paused,
            goal_reached,
            active_segment,
        }
    }

    fn input(&self) -> TickInput {
        TickInput {
            elapsed_sec: self.elapsed_sec,
            distance_m: self.distance_m,
        }
    }

    fn is_goal_plan(goal: &GoalParams) -> bool {
        goal.mode == WorkoutMode::Normal && goal.target_distance_km > 0.0
    }

    fn load_plan(&mut self) -> Plan {
        let goal = self.store.goal();
        self.mode = goal.as_ref().map(|g| g.mode).unwrap_or_default();
        match self.mode {
            WorkoutMode::Normal => match goal {
                Some(goal) if Self::is_goal_plan(&goal) => Plan::Goal(GoalPacer::new(
                    goal,
                    self.config.goal.clone(),
                    &self.config.executor,
                )),
                _ => Plan::FreeRun,
            },
            mode => {
                let scenario = self.store.scenario_for(mode);
                if scenario.is_empty() {
                    warn!(?mode, "No usable scenario stored, running free");
                    Plan::FreeRun
                } else {
                    Plan::Scenario(ScenarioExecutor::new(
                        scenario,
                        self.config.executor.clone(),
                        self.input(),
                    ))
                }
            }
        }
    }

    fn reset_tracking(&mut self) {
        self.filter.reset();
        self.pending_fixes.clear();
        self.pending_steps = 0;
    }

    fn persist_runtime(&mut self) {
        let snapshot = self.snapshot();
        if let Err(e) = self.store.save_runtime(&snapshot) {
            error!("Failed to save runtime snapshot: {e}");
        }
    }
}
