//! Synthetic sensor input for pacer sessions.

mod stream;

pub use stream::{PaceLeg, SensorStreamGenerator, SensorTick};
