//! Fluent builder APIs for simulated workouts.
//!
//! The [`SimulatedRunBuilder`] wires a generated sensor stream into a real
//! [`pacer::WorkoutSession`] and collects what the runner would have heard.

mod run;

pub use run::{SimulatedRun, SimulatedRunBuilder};
