pub mod cadence_fallback;
pub mod config;
pub mod driver;
pub mod errors;
pub mod events;
pub mod executor;
pub mod goal_pacer;
pub mod models;
pub mod pacing;
pub mod phrases;
pub mod position_filter;
pub mod scenario;
pub mod session;
pub mod store;
pub mod summary;

pub use crate::{
    config::PacerConfig,
    driver::{SessionCommand, run_session},
    errors::{PacerError, Result},
    events::{CoachingEvent, CoachingSink, RecordingSink, TracingSink},
    models::{GoalParams, RawFix, Segment, SegmentKind, SessionSnapshot, WorkoutMode},
    scenario::{ComboBlock, ComboScenario, IntervalPlan, Scenario},
    session::{TickReport, WorkoutSession},
    store::{JsonFileStore, KeyValueStore, MemoryStore, PacerStore},
    summary::WorkoutSummary,
};
