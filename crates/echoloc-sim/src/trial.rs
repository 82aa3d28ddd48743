//! Trial Generation
//!
//! Draws random true source positions and derives the per-trial quantities
//! the synthesizer needs: distances to each sensor, propagation delays, and
//! integer sample paddings.
//!
//! Positions are drawn from a bounded cylinder — radius ~ U(0, 50),
//! angle ~ U(0, 2π), height ~ U(0, 20) — matching the working volume the
//! sensor ring surrounds. The generator owns its own `StdRng` so a seeded
//! run is reproducible end to end and restartable by re-seeding.

use echoloc_core::geometry::SensorArray;
use echoloc_core::types::{Point3, SPEED_OF_SOUND};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

/// Maximum source distance from the cylinder axis
pub const MAX_SOURCE_RADIUS: f64 = 50.0;

/// Source height range is `[0, MAX_SOURCE_HEIGHT)`
pub const MAX_SOURCE_HEIGHT: f64 = 20.0;

/// Random source position generator.
#[derive(Debug)]
pub struct TrialGenerator {
    rng: StdRng,
}

impl TrialGenerator {
    /// Generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw the next true source position.
    pub fn next_position(&mut self) -> Point3 {
        let r = self.rng.gen::<f64>() * MAX_SOURCE_RADIUS;
        let theta = self.rng.gen::<f64>() * TAU;
        let z = self.rng.gen::<f64>() * MAX_SOURCE_HEIGHT;
        Point3::new(r * theta.cos(), r * theta.sin(), z)
    }

    /// Draw a batch of positions.
    pub fn positions(&mut self, count: usize) -> Vec<Point3> {
        (0..count).map(|_| self.next_position()).collect()
    }
}

/// Everything the synthesizer needs to know about one trial.
///
/// Built fresh per trial from the true position and the array geometry,
/// consumed by [`crate::propagation::Multitrack::synthesize`], and dropped
/// once the trial's estimate is recorded.
#[derive(Debug, Clone)]
pub struct SourceTrial {
    /// True source position
    pub position: Point3,
    /// Euclidean distance from the source to each sensor
    pub distances: Vec<f64>,
    /// Absolute propagation delay to each sensor, in seconds
    pub delays: Vec<f64>,
    /// Delay converted to whole samples: round(delay × sample_rate)
    pub paddings: Vec<usize>,
}

impl SourceTrial {
    pub fn new(position: Point3, array: &SensorArray, sample_rate: f64) -> Self {
        let distances = array.distances_to(&position);
        let delays: Vec<f64> = distances.iter().map(|d| d / SPEED_OF_SOUND).collect();
        let paddings = delays
            .iter()
            .map(|t| (t * sample_rate).round() as usize)
            .collect();
        Self {
            position,
            distances,
            delays,
            paddings,
        }
    }

    /// Number of sensors this trial was prepared for
    pub fn sensor_count(&self) -> usize {
        self.distances.len()
    }
}
