use std::env;

use anyhow::Context;
use pacer::{
    ComboScenario, GoalParams, MemoryStore, PacerConfig, PacerStore, RawFix, Scenario,
    TracingSink, WorkoutSession, events::deliver,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Sensor log captured from a real run: per-second step counts and fixes.
#[derive(Debug, Deserialize)]
struct Recording {
    #[serde(default)]
    goal: Option<GoalParams>,
    #[serde(default)]
    interval_scenario: Option<Scenario>,
    #[serde(default)]
    combo_scenario: Option<ComboScenario>,
    ticks: Vec<RecordedTick>,
}

#[derive(Debug, Deserialize)]
struct RecordedTick {
    #[serde(default)]
    steps: u32,
    #[serde(default)]
    fixes: Vec<RawFix>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let mut args = env::args().skip(1);
    let recording_path = args
        .next()
        .context("usage: pacer-replay <recording.json> [config.json]")?;
    let config = match args.next().or_else(|| env::var("PACER_CONFIG").ok()) {
        Some(path) => PacerConfig::load(&path).with_context(|| format!("loading config {path}"))?,
        None => PacerConfig::default(),
    };

    let raw = std::fs::read_to_string(&recording_path)
        .with_context(|| format!("reading {recording_path}"))?;
    let recording: Recording = serde_json::from_str(&raw)?;
    tracing::info!(
        "Replaying {} ticks from {}",
        recording.ticks.len(),
        recording_path
    );

    let mut store = PacerStore::new(MemoryStore::new());
    if let Some(goal) = &recording.goal {
        store.save_goal(goal)?;
    }
    if let Some(scenario) = &recording.interval_scenario {
        store.save_interval_scenario(scenario)?;
    }
    if let Some(combo) = &recording.combo_scenario {
        store.save_combo_scenario(combo)?;
    }

    let mut session = WorkoutSession::new(config, store.into_inner());
    let mut sink = TracingSink;
    session.start_or_resume();
    for tick in recording.ticks {
        if !session.is_active() {
            tracing::info!("Session paused itself, stopping replay");
            break;
        }
        for fix in tick.fixes {
            session.push_fix(fix);
        }
        session.push_steps(tick.steps);
        let report = session.tick();
        deliver(&report.events, &mut sink);
    }

    let summary = session
        .stop_and_reset()
        .context("session never started")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
