//! Core types for TDOA localization
//!
//! This module defines the fundamental types shared by the whole pipeline:
//! 3D positions, the physical constants that tie signal synthesis and
//! solving together, and the error taxonomy.
//!
//! ## Time origin convention
//!
//! Sensor index 0 is the time origin: every delay in a delay vector is the
//! arrival time at a sensor *relative to sensor 0*, so the entry for sensor 0
//! itself is ~0 by construction. Sensor index 1 is the secondary reference
//! used by the solver's linearization.

use serde::{Deserialize, Serialize};

/// A floating point audio sample
pub type Sample = f64;

/// Speed of sound, in scene units per second.
///
/// Shared by synthesis (delay generation) and solving (range conversion);
/// using two different values silently breaks the round trip.
pub const SPEED_OF_SOUND: f64 = 340.29;

/// Sample rate of all waveforms, in Hz
pub const SAMPLE_RATE: f64 = 44_100.0;

/// Minimum sensor count the solver can work with.
///
/// Two sensors are consumed as references; the linearization needs at least
/// two equations beyond them.
pub const MIN_SENSORS: usize = 4;

/// A point in scene coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Squared distance from the origin (x² + y² + z²)
    pub fn norm_sqr(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }
}

impl std::fmt::Display for Point3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Result type for localization operations
pub type LocResult<T> = Result<T, LocError>;

/// Errors that can occur in the localization pipeline
///
/// All of these abort the trial they occur in. Numerically ill-conditioned
/// but well-formed solve systems are deliberately *not* in this list: the
/// solver degrades to a minimum-norm least-squares answer instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LocError {
    #[error("source coincides with sensor {sensor}: zero propagation distance")]
    DegenerateGeometry { sensor: usize },

    #[error("delay for sensor {sensor} is zero: linearization divides by it")]
    DegenerateReference { sensor: usize },

    #[error("need at least {required} sensors, got {actual}")]
    InsufficientSensors { required: usize, actual: usize },

    #[error("delay estimation worker for sensors {start}..{end} failed")]
    WorkerFailure { start: usize, end: usize },

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid waveform: {0}")]
    InvalidWaveform(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("numerical failure: {0}")]
    Numerical(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(a.distance_to(&b), 0.0);

        let c = Point3::new(4.0, 6.0, 3.0);
        assert!((a.distance_to(&c) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_norm_sqr() {
        let p = Point3::new(1.0, 2.0, 2.0);
        assert_eq!(p.norm_sqr(), 9.0);
    }

    #[test]
    fn test_error_display() {
        let err = LocError::InsufficientSensors { required: 4, actual: 3 };
        assert!(err.to_string().contains("at least 4"));
    }
}
