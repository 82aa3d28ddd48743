//! Microphone Array Geometry
//!
//! Builds the immutable sensor layout used by both signal synthesis and the
//! multilateration solver: a ring of microphones at equal angular spacing,
//! with heights alternating between two fixed offsets by sensor parity.
//!
//! ```text
//!        y
//!        ^    ● z=10
//!        |
//!  ●-----+-----● ----> x     (z=0 on even indices,
//!  z=0   |   z=0              z=10 on odd indices)
//!        ● z=10
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use echoloc_core::geometry::SensorArray;
//!
//! let array = SensorArray::ring(8, 50.0);
//! assert_eq!(array.len(), 8);
//! assert_eq!(array.position(0).x, 50.0);
//! ```

use crate::types::{Point3, SPEED_OF_SOUND};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Height of even-indexed sensors, in scene units
pub const HEIGHT_EVEN: f64 = 0.0;

/// Height of odd-indexed sensors, in scene units
pub const HEIGHT_ODD: f64 = 10.0;

/// Default ring radius, in scene units
pub const DEFAULT_RADIUS: f64 = 50.0;

/// An immutable, ordered set of sensor positions
///
/// The ordering matters: sensor 0 is the pipeline's time origin and sensor 1
/// the solver's secondary reference. Construction is deterministic; sensor
/// count validation is the caller's job (the solver rejects arrays that are
/// too small).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorArray {
    positions: Vec<Point3>,
}

impl SensorArray {
    /// Place `sensor_count` sensors on a ring of the given radius.
    ///
    /// Sensor `i` sits at angle `2π·i / sensor_count`, at height
    /// [`HEIGHT_EVEN`] for even `i` and [`HEIGHT_ODD`] for odd `i`.
    pub fn ring(sensor_count: usize, radius: f64) -> Self {
        let positions = (0..sensor_count)
            .map(|i| {
                let theta = TAU * i as f64 / sensor_count as f64;
                let z = if i % 2 == 0 { HEIGHT_EVEN } else { HEIGHT_ODD };
                Point3::new(radius * theta.cos(), radius * theta.sin(), z)
            })
            .collect();
        Self { positions }
    }

    /// Build an array from explicit positions (order is preserved).
    pub fn from_positions(positions: Vec<Point3>) -> Self {
        Self { positions }
    }

    /// Number of sensors
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of sensor `index` (panics if out of range, like slice indexing)
    pub fn position(&self, index: usize) -> Point3 {
        self.positions[index]
    }

    /// All positions, in sensor order
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    /// Euclidean distance from each sensor to `source`, in sensor order
    pub fn distances_to(&self, source: &Point3) -> Vec<f64> {
        self.positions
            .iter()
            .map(|p| p.distance_to(source))
            .collect()
    }

    /// Absolute propagation delay from `source` to each sensor, in seconds
    pub fn propagation_delays(&self, source: &Point3) -> Vec<f64> {
        self.positions
            .iter()
            .map(|p| p.distance_to(source) / SPEED_OF_SOUND)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_four_sensor_ring_layout() {
        // Radius 50, angles {0°, 90°, 180°, 270°}, heights {0, 10, 0, 10}
        let array = SensorArray::ring(4, 50.0);
        assert_eq!(array.len(), 4);

        let expected = [
            (50.0, 0.0, 0.0),
            (0.0, 50.0, 10.0),
            (-50.0, 0.0, 0.0),
            (0.0, -50.0, 10.0),
        ];
        for (i, &(x, y, z)) in expected.iter().enumerate() {
            let p = array.position(i);
            assert_relative_eq!(p.x, x, epsilon = 1e-9);
            assert_relative_eq!(p.y, y, epsilon = 1e-9);
            assert_relative_eq!(p.z, z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_ring_is_deterministic() {
        let a = SensorArray::ring(8, 50.0);
        let b = SensorArray::ring(8, 50.0);
        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn test_all_sensors_on_radius() {
        let array = SensorArray::ring(12, 50.0);
        for p in array.positions() {
            let ring_dist = (p.x * p.x + p.y * p.y).sqrt();
            assert_relative_eq!(ring_dist, 50.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_center_source_equidistant_in_plane() {
        // A source on the ring axis at mid-height sees two distance classes
        // only because of the alternating heights; in-plane the ring is
        // symmetric.
        let array = SensorArray::ring(6, 50.0);
        let center = Point3::new(0.0, 0.0, 0.0);
        let d = array.distances_to(&center);
        assert_relative_eq!(d[0], d[2], epsilon = 1e-9);
        assert_relative_eq!(d[1], d[3], epsilon = 1e-9);
    }

    #[test]
    fn test_propagation_delays_scale() {
        let array = SensorArray::ring(4, 50.0);
        let source = Point3::new(0.0, 0.0, 0.0);
        let delays = array.propagation_delays(&source);
        assert_relative_eq!(delays[0], 50.0 / SPEED_OF_SOUND, epsilon = 1e-12);
    }
}
