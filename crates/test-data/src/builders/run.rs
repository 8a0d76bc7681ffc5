//! Fluent builder for end-to-end simulated runs.

use std::ops::Range;
use std::time::Instant;

use pacer::cadence_fallback::StrideProfile;
use pacer::models::SegmentBound;
use pacer::scenario::{ASSUMED_EASY_PACE_SEC, ASSUMED_REST_PACE_SEC};
use pacer::{
    CoachingEvent, ComboScenario, GoalParams, MemoryStore, PacerConfig, PacerStore, Scenario,
    SegmentKind, SessionSnapshot, WorkoutMode, WorkoutSession, WorkoutSummary,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::SimError;
use crate::config::SimConfig;
use crate::profiles::RunnerProfile;
use crate::sources::{PaceLeg, SensorStreamGenerator};

/// Seconds of running added past a plan's nominal end so that the last
/// distance-bound segment and the goal are actually reached.
const OVERRUN_SEC: u32 = 60;

#[derive(Debug, Clone)]
enum PlanSpec {
    FreeRun,
    Goal(GoalParams),
    Interval(Scenario),
    Combo(ComboScenario),
}

/// Everything a simulated run produced.
#[derive(Debug, Clone)]
pub struct SimulatedRun {
    pub events: Vec<CoachingEvent>,
    pub snapshots: Vec<SessionSnapshot>,
    pub summary: WorkoutSummary,
    pub true_distance_m: f64,
}

impl SimulatedRun {
    pub fn phrases(&self) -> Vec<String> {
        self.events.iter().map(CoachingEvent::text).collect()
    }

    /// Measured over true distance; 1.0 is perfect.
    pub fn distance_ratio(&self) -> f64 {
        if self.true_distance_m <= 0.0 {
            return 0.0;
        }
        self.summary.distance_km * 1000.0 / self.true_distance_m
    }
}

/// Builder for a complete simulated workout.
///
/// # Example
///
/// ```rust,ignore
/// let run = SimulatedRunBuilder::new()
///     .with_goal(GoalParams::with_time(5.0, 1500))
///     .with_dropout(600..660)
///     .with_seed(7)
///     .build()?;
/// assert!((run.distance_ratio() - 1.0).abs() < 0.05);
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedRunBuilder {
    config: PacerConfig,
    sim: SimConfig,
    profile: RunnerProfile,
    plan: PlanSpec,
    legs: Vec<PaceLeg>,
    dropouts: Vec<Range<u32>>,
    glitches: Vec<u32>,
    strides: Option<StrideProfile>,
    seed: u64,
}

impl Default for SimulatedRunBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRunBuilder {
    pub fn new() -> Self {
        Self {
            config: PacerConfig::default(),
            sim: SimConfig::default(),
            profile: RunnerProfile::default(),
            plan: PlanSpec::FreeRun,
            legs: Vec::new(),
            dropouts: Vec::new(),
            glitches: Vec::new(),
            strides: None,
            seed: 42,
        }
    }

    pub fn with_config(mut self, config: PacerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sim_config(mut self, sim: SimConfig) -> Self {
        self.sim = sim;
        self
    }

    pub fn with_profile(mut self, profile: RunnerProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_goal(mut self, goal: GoalParams) -> Self {
        self.plan = PlanSpec::Goal(goal);
        self
    }

    pub fn with_interval(mut self, scenario: Scenario) -> Self {
        self.plan = PlanSpec::Interval(scenario);
        self
    }

    pub fn with_combo(mut self, combo: ComboScenario) -> Self {
        self.plan = PlanSpec::Combo(combo);
        self
    }

    /// Adds a leg run at `pace_sec_per_km`. Without explicit legs the runner
    /// follows the plan's targets.
    pub fn leg(mut self, duration_sec: u32, pace_sec_per_km: u32) -> Self {
        self.legs.push(PaceLeg::new(duration_sec, pace_sec_per_km));
        self
    }

    pub fn with_dropout(mut self, window: Range<u32>) -> Self {
        self.dropouts.push(window);
        self
    }

    pub fn with_glitch(mut self, second: u32) -> Self {
        self.glitches.push(second);
        self
    }

    /// Seeds the stored stride profile.
    pub fn with_strides(mut self, strides: StrideProfile) -> Self {
        self.strides = Some(strides);
        self
    }

    /// Seeds the stored stride profile with the runner's own strides.
    pub fn calibrated(mut self) -> Self {
        self.strides = Some(self.profile.calibrated_strides());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Result<SimulatedRun, SimError> {
        let start_time = Instant::now();
        let legs = if self.legs.is_empty() {
            self.plan_legs()?
        } else {
            self.legs.clone()
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut generator =
            SensorStreamGenerator::new(self.profile.clone()).with_config(self.sim.clone());
        for window in &self.dropouts {
            generator = generator.with_dropout(window.clone());
        }
        for second in &self.glitches {
            generator = generator.with_glitch(*second);
        }
        let ticks = generator.generate(&legs, &mut rng);

        let mut store = PacerStore::new(MemoryStore::new());
        if let Some(strides) = &self.strides {
            store.save_stride_profile(strides)?;
        }
        match &self.plan {
            PlanSpec::FreeRun => {}
            PlanSpec::Goal(goal) => store.save_goal(goal)?,
            PlanSpec::Interval(scenario) => {
                store.save_goal(&mode_only(WorkoutMode::Interval))?;
                store.save_interval_scenario(scenario)?;
            }
            PlanSpec::Combo(combo) => {
                store.save_goal(&mode_only(WorkoutMode::Combo))?;
                store.save_combo_scenario(combo)?;
            }
        }

        let mut session = WorkoutSession::new(self.config.clone(), store.into_inner());
        session.start_or_resume();

        let mut events = Vec::new();
        let mut snapshots = Vec::with_capacity(ticks.len());
        let mut true_distance_m = 0.0;
        for tick in ticks {
            if !session.is_active() {
                debug!(second = tick.second, "Session paused itself");
                break;
            }
            if let Some(fix) = tick.fix {
                session.push_fix(fix);
            }
            session.push_steps(tick.steps);
            let report = session.tick();
            events.extend(report.events);
            snapshots.push(report.snapshot);
            true_distance_m = tick.true_distance_m;
        }

        let summary = session
            .stop_and_reset()
            .ok_or_else(|| SimError::InvalidPlan("session never started".into()))?;

        info!(
            seconds = summary.elapsed_sec,
            distance_km = summary.distance_km,
            true_km = true_distance_m / 1000.0,
            events = events.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Simulated run complete"
        );

        Ok(SimulatedRun {
            events,
            snapshots,
            summary,
            true_distance_m,
        })
    }

    /// Legs that follow the plan's targets at the runner's paces.
    fn plan_legs(&self) -> Result<Vec<PaceLeg>, SimError> {
        let base = self.profile.base_pace_sec_per_km().round() as u32;
        let scenario = match &self.plan {
            PlanSpec::FreeRun => {
                return Err(SimError::InvalidPlan(
                    "a free run needs explicit legs".into(),
                ));
            }
            PlanSpec::Goal(goal) => {
                let pace = goal.target_pace().unwrap_or(base);
                let seconds = (goal.target_distance_km * pace as f64).ceil() as u32;
                return Ok(vec![PaceLeg::new(seconds + OVERRUN_SEC, pace)]);
            }
            PlanSpec::Interval(scenario) => scenario.clone(),
            PlanSpec::Combo(combo) => {
                combo.validate()?;
                combo.flatten()
            }
        };
        if scenario.is_empty() {
            return Err(SimError::InvalidPlan("scenario has no segments".into()));
        }

        let mut legs: Vec<PaceLeg> = scenario
            .segments
            .iter()
            .map(|segment| {
                let pace = segment.target_pace().unwrap_or(match segment.kind() {
                    SegmentKind::Rest => ASSUMED_REST_PACE_SEC,
                    SegmentKind::Warmup | SegmentKind::Cooldown => ASSUMED_EASY_PACE_SEC,
                    SegmentKind::Work | SegmentKind::FreePace => base,
                });
                let seconds = match segment.bound() {
                    SegmentBound::Time { duration_sec } => duration_sec,
                    SegmentBound::Distance { meters } => (meters / 1000.0 * pace as f64).ceil() as u32,
                };
                PaceLeg::new(seconds, pace)
            })
            .collect();
        if let Some(last) = legs.last_mut() {
            last.duration_sec += OVERRUN_SEC;
        }
        Ok(legs)
    }
}

fn mode_only(mode: WorkoutMode) -> GoalParams {
    GoalParams {
        mode,
        target_distance_km: 0.0,
        target_time_sec: None,
        target_pace_sec_per_km: None,
    }
}
