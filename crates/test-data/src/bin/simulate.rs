//! Runs a built-in combo workout through the pacer and logs every phrase.
//!
//! Run with:
//! ```
//! cargo run -p test-data --bin simulate
//! ```
//!
//! `SIM_SEED` picks the random seed and `SIM_DROPOUT` (seconds) inserts a
//! signal loss of that length halfway through the pace block.

use pacer::ComboBlock;
use test_data::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let seed = std::env::var("SIM_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(12345);
    let dropout_sec = std::env::var("SIM_DROPOUT")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);

    let combo = ComboScenario::new(vec![
        ComboBlock::Warmup {
            duration_sec: 300,
            pace_sec_per_km: None,
        },
        ComboBlock::Pace {
            distance_km: Some(2.0),
            pace_sec_per_km: 300,
        },
        ComboBlock::Interval {
            work_sec: 120,
            work_pace_sec_per_km: 260,
            rest_sec: 60,
            rest_pace_sec_per_km: None,
            repeats: 4,
        },
        ComboBlock::Cooldown {
            duration_sec: 300,
            pace_sec_per_km: None,
        },
    ]);
    tracing::info!(
        "Combo: {} segments, ~{:.2} km, ~{} s",
        combo.segment_count(),
        combo.estimate_total_distance_km(),
        combo.estimate_total_time_sec()
    );

    let mut builder = SimulatedRunBuilder::new()
        .with_combo(combo)
        .calibrated()
        .with_seed(seed);
    if dropout_sec > 0 {
        builder = builder.with_dropout(600..600 + dropout_sec);
    }
    let run = builder.build()?;

    for event in &run.events {
        tracing::info!(
            "[{:>4}s] {}",
            event.elapsed_sec,
            event.text()
        );
    }
    tracing::info!(
        "Measured {:.3} km of {:.3} km true ({:+.1}%)",
        run.summary.distance_km,
        run.true_distance_m / 1000.0,
        (run.distance_ratio() - 1.0) * 100.0
    );
    println!("{}", serde_json::to_string_pretty(&run.summary)?);

    Ok(())
}
