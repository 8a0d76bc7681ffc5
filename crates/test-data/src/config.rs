//! Configuration types for sensor stream simulation.

use serde::{Deserialize, Serialize};

/// Geographic bounding box defined by southwest and northeast corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Returns a random point within the bounding box.
    pub fn random_point(&self, rng: &mut impl rand::Rng) -> (f64, f64) {
        let lat = rng.gen_range(self.min_lat..self.max_lat);
        let lon = rng.gen_range(self.min_lon..self.max_lon);
        (lat, lon)
    }
}

/// Places to start simulated runs from.
#[derive(Debug, Clone, Copy)]
pub struct Region;

impl Region {
    /// Moscow, Gorky Park and the embankments.
    pub const MOSCOW_PARK: BoundingBox = BoundingBox::new(55.72, 37.58, 55.74, 37.61);
}

/// Sensor characteristics of the simulated phone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fixed start point; random within `region` when unset.
    pub start: Option<(f64, f64)>,
    pub region: BoundingBox,
    /// Seconds between position fixes.
    pub fix_interval_sec: u32,
    /// GPS position jitter standard deviation in meters, per axis.
    pub gps_jitter_m: f64,
    /// Accuracy radius reported with every fix.
    pub accuracy_m: f64,
    /// How far a glitch fix lands from the true position.
    pub glitch_offset_m: f64,
    /// Heading wander per second in radians.
    pub heading_wander_rad: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start: None,
            region: Region::MOSCOW_PARK,
            fix_interval_sec: 1,
            gps_jitter_m: 1.0,
            accuracy_m: 6.0,
            glitch_offset_m: 300.0,
            heading_wander_rad: 0.05,
        }
    }
}

impl SimConfig {
    /// Clean signal, for runs whose distance should match the truth closely.
    pub fn clean() -> Self {
        Self {
            gps_jitter_m: 0.3,
            accuracy_m: 4.0,
            ..Default::default()
        }
    }
}
