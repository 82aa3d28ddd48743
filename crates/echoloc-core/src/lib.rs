//! # echoloc-core — TDOA Localization Numerics
//!
//! The deterministic numerical pipeline behind acoustic source localization
//! by Time-Difference-of-Arrival (TDOA) multilateration: sensor geometry,
//! the reference waveform, cross-correlation delay estimation, and the
//! linearized least-squares position solver.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌────────────────┐
//! │ geometry │──▶│ delay vector  │──▶│ multilateration │──▶ (x, y, z)
//! │  (ring)  │   │ (xcorr peaks) │   │  (SVD pinv LS)  │
//! └──────────┘   └───────────────┘   └────────────────┘
//! ```
//!
//! Signal synthesis and trial orchestration live in `echoloc-sim`; this
//! crate stays free of randomness so every operation here is reproducible
//! from its inputs alone.
//!
//! ## Usage
//!
//! ```rust
//! use echoloc_core::prelude::*;
//!
//! let array = SensorArray::ring(8, 50.0);
//! let solver = Multilateration::new();
//! let source = Point3::new(12.0, -7.0, 3.0);
//!
//! // Noise-free delays reproduce the source exactly
//! let delays = solver.exact_delays(&array, &source);
//! let estimate = solver.solve(&array, &delays).unwrap();
//! assert!(estimate.distance_to(&source) < 1e-6);
//! ```

pub mod delay;
pub mod geometry;
pub mod solver;
pub mod types;
pub mod waveform;

// Re-exports
pub use delay::DelayEstimator;
pub use geometry::{SensorArray, DEFAULT_RADIUS, HEIGHT_EVEN, HEIGHT_ODD};
pub use solver::Multilateration;
pub use types::{LocError, LocResult, Point3, Sample, MIN_SENSORS, SAMPLE_RATE, SPEED_OF_SOUND};
pub use waveform::{Waveform, PEAK_AMPLITUDE};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::delay::DelayEstimator;
    pub use crate::geometry::SensorArray;
    pub use crate::solver::Multilateration;
    pub use crate::types::{LocError, LocResult, Point3};
    pub use crate::waveform::Waveform;
}
