//! # echoloc-sim — TDOA Simulation Harness
//!
//! Everything that turns the deterministic numerics of `echoloc-core` into
//! a repeatable experiment: random source trials, the acoustic propagation
//! model that builds per-sensor signals, and the orchestrator that runs a
//! batch of trials and tabulates (true, estimated) position pairs.
//!
//! ## Pipeline per trial
//!
//! ```text
//! TrialGenerator ──▶ SourceTrial ──▶ Multitrack ──▶ DelayEstimator ──▶ Multilateration
//!   (random r,θ,z)    (distances,     (delayed,       (xcorr peaks)      (LS estimate)
//!                      delays, pads)   attenuated)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use echoloc_sim::prelude::*;
//! use echoloc_core::waveform::Waveform;
//!
//! let waveform = Waveform::chirp(200.0, 2000.0, 0.05).unwrap();
//! let config = RunnerConfig { trials: 25, seed: Some(1), ..Default::default() };
//! let mut runner = TrialRunner::new(config, waveform).unwrap();
//! let report = runner.run().unwrap();
//! println!("mean error: {:?}", report.mean_error());
//! ```

pub mod propagation;
pub mod runner;
pub mod trial;

// Re-exports
pub use propagation::Multitrack;
pub use runner::{FailurePolicy, RunReport, RunnerConfig, TrialFailure, TrialRecord, TrialRunner};
pub use trial::{SourceTrial, TrialGenerator, MAX_SOURCE_HEIGHT, MAX_SOURCE_RADIUS};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::propagation::Multitrack;
    pub use crate::runner::{FailurePolicy, RunReport, RunnerConfig, TrialRunner};
    pub use crate::trial::{SourceTrial, TrialGenerator};
}
