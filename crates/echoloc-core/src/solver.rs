//! Hyperbolic Multilateration Solver
//!
//! Converts a vector of arrival-time differences plus the known sensor
//! geometry into a 3D position estimate.
//!
//! ## Linearization
//!
//! Each sensor's range difference to the source defines a hyperboloid; the
//! system is made linear by differencing the range equations against two
//! fixed reference sensors (index 0, the time origin, and index 1, the
//! secondary reference). For each sensor `i ≥ 2`:
//!
//! ```text
//! A_i = 2(x_i − x_0)/(c·t_i) − 2(x_1 − x_0)/(c·t_1)     (B_i, C_i likewise)
//! D_i = c(t_i − t_1) + S_0i/(c·t_i) − S_01/(c·t_1)
//! S_0j = |p_0|² − |p_j|²
//! ```
//!
//! giving `A·x = −D`, an (N−2)×3 system solved in the least-squares sense
//! through the Moore–Penrose pseudo-inverse (SVD). A rank-deficient but
//! well-formed system is not an error: the SVD returns the minimum-norm
//! solution, which is the designed graceful degradation for flat or
//! symmetric arrays. Only defined-invalid inputs fail: fewer than four
//! sensors, or a zero delay in any divisor position.

use crate::geometry::SensorArray;
use crate::types::{LocError, LocResult, Point3, MIN_SENSORS, SPEED_OF_SOUND};
use nalgebra::{DMatrix, DVector};

/// Singular values below this (relative to the largest) are treated as zero
/// when inverting, which is what turns rank deficiency into a minimum-norm
/// answer instead of a blow-up.
const PINV_EPS: f64 = 1e-12;

/// Least-squares TDOA position solver.
#[derive(Debug, Clone)]
pub struct Multilateration {
    speed_of_sound: f64,
}

impl Default for Multilateration {
    fn default() -> Self {
        Self {
            speed_of_sound: SPEED_OF_SOUND,
        }
    }
}

impl Multilateration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the propagation speed (tests use this to decouple from the
    /// acoustic constant).
    pub fn with_speed_of_sound(mut self, speed: f64) -> Self {
        self.speed_of_sound = speed;
        self
    }

    /// Solve for the source position.
    ///
    /// `delays[i]` is the arrival time at sensor `i` relative to sensor 0,
    /// in seconds; `delays[0]` is zero by construction and is not used.
    pub fn solve(&self, array: &SensorArray, delays: &[f64]) -> LocResult<Point3> {
        let n = array.len();
        if n < MIN_SENSORS {
            return Err(LocError::InsufficientSensors {
                required: MIN_SENSORS,
                actual: n,
            });
        }
        if delays.len() != n {
            return Err(LocError::ShapeMismatch {
                expected: n,
                actual: delays.len(),
            });
        }

        let c = self.speed_of_sound;
        let p0 = array.position(0);
        let p1 = array.position(1);
        let t1 = delays[1];
        if t1 == 0.0 {
            return Err(LocError::DegenerateReference { sensor: 1 });
        }

        // |p_0|² − |p_1|²
        let s01 = p0.norm_sqr() - p1.norm_sqr();
        let inv_ct1 = 1.0 / (c * t1);

        let mut coeffs = Vec::with_capacity((n - 2) * 3);
        let mut rhs = Vec::with_capacity(n - 2);

        for i in 2..n {
            let ti = delays[i];
            if ti == 0.0 {
                return Err(LocError::DegenerateReference { sensor: i });
            }
            let pi = array.position(i);
            let inv_cti = 1.0 / (c * ti);

            coeffs.push(2.0 * (pi.x - p0.x) * inv_cti - 2.0 * (p1.x - p0.x) * inv_ct1);
            coeffs.push(2.0 * (pi.y - p0.y) * inv_cti - 2.0 * (p1.y - p0.y) * inv_ct1);
            coeffs.push(2.0 * (pi.z - p0.z) * inv_cti - 2.0 * (p1.z - p0.z) * inv_ct1);

            let s0i = p0.norm_sqr() - pi.norm_sqr();
            let d = c * (ti - t1) + s0i * inv_cti - s01 * inv_ct1;
            rhs.push(-d);
        }

        let a = DMatrix::from_row_slice(n - 2, 3, &coeffs);
        let b = DVector::from_vec(rhs);

        let svd = a.svd(true, true);
        let solution = svd
            .solve(&b, PINV_EPS)
            .map_err(|e| LocError::Numerical(e.to_string()))?;

        Ok(Point3::new(solution[0], solution[1], solution[2]))
    }

    /// Analytic delay vector for a known source, relative to sensor 0.
    ///
    /// This bypasses cross-correlation entirely; it exists so the solver's
    /// algebra can be validated on exact inputs and so callers can generate
    /// noise-free reference scenarios.
    pub fn exact_delays(&self, array: &SensorArray, source: &Point3) -> Vec<f64> {
        let absolute = array
            .positions()
            .iter()
            .map(|p| p.distance_to(source) / self.speed_of_sound)
            .collect::<Vec<_>>();
        let t0 = absolute.first().copied().unwrap_or(0.0);
        absolute.into_iter().map(|t| t - t0).collect()
    }
}
