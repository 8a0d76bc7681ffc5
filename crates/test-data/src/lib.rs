//! Simulated runs for the pacer core.
//!
//! This crate generates realistic per-second sensor input (step counts and
//! noisy position fixes, with signal dropouts and glitches) for a runner
//! profile, and drives a real [`pacer::WorkoutSession`] with it so that
//! coaching behavior can be checked end to end.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_data::prelude::*;
//!
//! let run = SimulatedRunBuilder::new()
//!     .with_profile(RunnerProfile::recreational())
//!     .with_interval(IntervalPlan::new().work(120, 330).rest(60, None).repeats(4).build()?)
//!     .calibrated()
//!     .with_dropout(200..260)
//!     .build()?;
//!
//! for phrase in run.phrases() {
//!     println!("{phrase}");
//! }
//! ```

pub mod builders;
pub mod config;
pub mod profiles;
pub mod sources;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Pacer error: {0}")]
    Pacer(#[from] pacer::PacerError),

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
}

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::SimError;
    pub use crate::builders::{SimulatedRun, SimulatedRunBuilder};
    pub use crate::config::{BoundingBox, Region, SimConfig};
    pub use crate::profiles::{RunnerProfile, sample_variance};
    pub use crate::sources::{PaceLeg, SensorStreamGenerator, SensorTick};
    pub use pacer::{ComboBlock, ComboScenario, GoalParams, IntervalPlan, Scenario};
}
