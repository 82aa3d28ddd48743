//! Trial Orchestrator
//!
//! Drives N localization trials end to end — draw a true position,
//! synthesize the multitrack, estimate delays, solve — and collects the
//! (true, estimated) pairs into a [`RunReport`].
//!
//! Per-trial delay-estimation time is measured and logged for diagnostics;
//! it is not part of the functional contract. A trial that hits a defined
//! invalid domain (degenerate geometry, zero reference delay, worker
//! failure) aborts that trial; whether the whole run stops is the caller's
//! [`FailurePolicy`]. A merely inaccurate trial is *not* a failure and
//! stays in the records with its error attached.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use echoloc_sim::runner::{RunnerConfig, TrialRunner};
//! use echoloc_core::waveform::Waveform;
//!
//! let waveform = Waveform::chirp(200.0, 2000.0, 0.05).unwrap();
//! let config = RunnerConfig {
//!     trials: 10,
//!     seed: Some(42),
//!     ..Default::default()
//! };
//! let mut runner = TrialRunner::new(config, waveform).unwrap();
//! let report = runner.run().unwrap();
//! println!("{}", report.format_text());
//! ```

use crate::propagation::Multitrack;
use crate::trial::{SourceTrial, TrialGenerator};
use echoloc_core::delay::DelayEstimator;
use echoloc_core::geometry::{SensorArray, DEFAULT_RADIUS};
use echoloc_core::solver::Multilateration;
use echoloc_core::types::{LocError, LocResult, Point3, MIN_SENSORS};
use echoloc_core::waveform::Waveform;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to do when a trial fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FailurePolicy {
    /// Record the failure and continue with the remaining trials.
    #[default]
    Skip,
    /// Stop the whole run on the first failed trial.
    Abort,
}

/// Batch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Number of trials to run
    pub trials: usize,
    /// Number of sensors on the ring
    pub sensors: usize,
    /// Ring radius in scene units
    pub radius: f64,
    /// Delay-estimation worker count (1 = sequential)
    pub workers: usize,
    /// RNG seed; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Optional additive noise level; `None` keeps trials clean
    pub snr_db: Option<f64>,
    /// Failed-trial handling
    pub failure_policy: FailurePolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            trials: 10,
            sensors: 8,
            radius: DEFAULT_RADIUS,
            workers: 1,
            seed: None,
            snr_db: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// One successful trial.
#[derive(Debug, Clone, Serialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub truth: Point3,
    pub estimate: Point3,
    /// Euclidean distance between truth and estimate
    pub error: f64,
    /// Wall-clock time spent in delay estimation, in seconds
    pub estimation_secs: f64,
}

/// One failed trial, kept separate from inaccurate-but-successful ones.
#[derive(Debug, Clone)]
pub struct TrialFailure {
    pub trial: usize,
    pub error: LocError,
}

/// The results table for a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub records: Vec<TrialRecord>,
    pub failures: Vec<TrialFailure>,
}

impl RunReport {
    pub fn success_count(&self) -> usize {
        self.records.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Mean Euclidean error over successful trials
    pub fn mean_error(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        Some(self.records.iter().map(|r| r.error).sum::<f64>() / self.records.len() as f64)
    }

    /// Largest single-trial error
    pub fn max_error(&self) -> Option<f64> {
        self.records
            .iter()
            .map(|r| r.error)
            .fold(None, |m, e| Some(m.map_or(e, |m: f64| m.max(e))))
    }

    /// Format the report as a text table
    pub fn format_text(&self) -> String {
        let mut output = String::new();
        output.push_str("TDOA Localization Results\n");
        output.push_str(&"═".repeat(78));
        output.push('\n');
        output.push_str(&format!(
            "{:>5}  {:>24}  {:>24}  {:>10}\n",
            "#", "true (x, y, z)", "estimated (x, y, z)", "error"
        ));
        output.push_str(&"─".repeat(78));
        output.push('\n');

        for r in &self.records {
            output.push_str(&format!(
                "{:>5}  {:>24}  {:>24}  {:>10.4}\n",
                r.trial,
                r.truth.to_string(),
                r.estimate.to_string(),
                r.error
            ));
        }
        for f in &self.failures {
            output.push_str(&format!("{:>5}  FAILED: {}\n", f.trial, f.error));
        }

        output.push_str(&"─".repeat(78));
        output.push('\n');
        match self.mean_error() {
            Some(mean) => output.push_str(&format!(
                "{} ok, {} failed, mean error {:.4}, max error {:.4}\n",
                self.success_count(),
                self.failure_count(),
                mean,
                self.max_error().unwrap_or(0.0)
            )),
            None => output.push_str(&format!(
                "0 ok, {} failed\n",
                self.failure_count()
            )),
        }
        output
    }

    /// Format successful trials as CSV (one row per trial)
    pub fn format_csv(&self) -> String {
        let mut output =
            String::from("trial,true_x,true_y,true_z,est_x,est_y,est_z,error,estimation_secs\n");
        for r in &self.records {
            output.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                r.trial,
                r.truth.x,
                r.truth.y,
                r.truth.z,
                r.estimate.x,
                r.estimate.y,
                r.estimate.z,
                r.error,
                r.estimation_secs
            ));
        }
        output
    }

    /// Format the report as JSON
    pub fn format_json(&self) -> String {
        let records: Vec<String> = self
            .records
            .iter()
            .map(|r| {
                format!(
                    r#"    {{
      "trial": {},
      "true": [{:.6}, {:.6}, {:.6}],
      "estimated": [{:.6}, {:.6}, {:.6}],
      "error": {:.6},
      "estimation_secs": {:.6}
    }}"#,
                    r.trial,
                    r.truth.x,
                    r.truth.y,
                    r.truth.z,
                    r.estimate.x,
                    r.estimate.y,
                    r.estimate.z,
                    r.error,
                    r.estimation_secs
                )
            })
            .collect();
        let failures: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!(r#"    {{ "trial": {}, "reason": "{}" }}"#, f.trial, f.error))
            .collect();

        format!(
            r#"{{
  "successes": {},
  "failures": {},
  "records": [
{}
  ],
  "failed_trials": [
{}
  ]
}}"#,
            self.success_count(),
            self.failure_count(),
            records.join(",\n"),
            failures.join(",\n")
        )
    }
}

/// End-to-end trial driver.
pub struct TrialRunner {
    config: RunnerConfig,
    array: SensorArray,
    waveform: Waveform,
    generator: TrialGenerator,
    estimator: DelayEstimator,
    solver: Multilateration,
    noise_rng: StdRng,
}

impl TrialRunner {
    /// Build a runner, validating the configuration up front.
    pub fn new(config: RunnerConfig, waveform: Waveform) -> LocResult<Self> {
        if config.sensors < MIN_SENSORS {
            return Err(LocError::InsufficientSensors {
                required: MIN_SENSORS,
                actual: config.sensors,
            });
        }
        if config.trials == 0 {
            return Err(LocError::InvalidConfig("trial count must be at least 1".into()));
        }
        if config.workers == 0 {
            return Err(LocError::InvalidConfig("worker count must be at least 1".into()));
        }

        let array = SensorArray::ring(config.sensors, config.radius);
        let estimator = DelayEstimator::new(waveform.sample_rate()).with_workers(config.workers);
        let generator = match config.seed {
            Some(seed) => TrialGenerator::seeded(seed),
            None => TrialGenerator::from_entropy(),
        };
        // Independent stream so noise draws never perturb position draws
        let noise_rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            array,
            waveform,
            generator,
            estimator,
            solver: Multilateration::new(),
            noise_rng,
        })
    }

    /// The sensor layout this runner simulates
    pub fn array(&self) -> &SensorArray {
        &self.array
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run the configured number of trials.
    pub fn run(&mut self) -> LocResult<RunReport> {
        info!(
            "starting run: {} trials, {} sensors, {} workers",
            self.config.trials, self.config.sensors, self.config.workers
        );
        let mut report = RunReport::default();

        for trial in 0..self.config.trials {
            let truth = self.generator.next_position();
            match self.run_one(trial, truth) {
                Ok(record) => {
                    info!(
                        "trial {} ok: error {:.4}, estimation {:.6}s",
                        trial, record.error, record.estimation_secs
                    );
                    report.records.push(record);
                }
                Err(error) => {
                    warn!("trial {} failed: {}", trial, error);
                    match self.config.failure_policy {
                        FailurePolicy::Abort => return Err(error),
                        FailurePolicy::Skip => report.failures.push(TrialFailure { trial, error }),
                    }
                }
            }
        }

        if let Some(mean) = report.mean_error() {
            info!(
                "run complete: {} ok, {} failed, mean error {:.4}",
                report.success_count(),
                report.failure_count(),
                mean
            );
        }
        Ok(report)
    }

    /// Run the full pipeline for one explicit source position.
    pub fn locate(&mut self, truth: Point3) -> LocResult<TrialRecord> {
        self.run_one(0, truth)
    }

    fn run_one(&mut self, trial: usize, truth: Point3) -> LocResult<TrialRecord> {
        let source = SourceTrial::new(truth, &self.array, self.waveform.sample_rate());
        let mut multitrack = Multitrack::synthesize(&self.waveform, &source)?;
        if let Some(snr_db) = self.config.snr_db {
            multitrack.add_noise(snr_db, &mut self.noise_rng);
        }

        let started = Instant::now();
        let delays = self.estimator.estimate_all(multitrack.rows(), 0)?;
        let estimation_secs = started.elapsed().as_secs_f64();
        debug!(
            "trial {}: estimated {} delays in {:.6}s",
            trial,
            delays.len(),
            estimation_secs
        );

        let estimate = self.solver.solve(&self.array, &delays)?;
        Ok(TrialRecord {
            trial,
            truth,
            estimate,
            error: estimate.distance_to(&truth),
            estimation_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_waveform() -> Waveform {
        Waveform::chirp(200.0, 2000.0, 0.01).unwrap()
    }

    #[test]
    fn test_too_few_sensors_rejected_at_construction() {
        let config = RunnerConfig {
            sensors: 3,
            ..Default::default()
        };
        let result = TrialRunner::new(config, test_waveform());
        assert!(matches!(
            result,
            Err(LocError::InsufficientSensors { required: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_four_sensors_accepted() {
        let config = RunnerConfig {
            sensors: 4,
            ..Default::default()
        };
        assert!(TrialRunner::new(config, test_waveform()).is_ok());
    }

    #[test]
    fn test_zero_trials_rejected() {
        let config = RunnerConfig {
            trials: 0,
            ..Default::default()
        };
        assert!(matches!(
            TrialRunner::new(config, test_waveform()),
            Err(LocError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = RunnerConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            TrialRunner::new(config, test_waveform()),
            Err(LocError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_report_bookkeeping() {
        let mut report = RunReport::default();
        assert_eq!(report.mean_error(), None);

        report.records.push(TrialRecord {
            trial: 0,
            truth: Point3::new(0.0, 0.0, 0.0),
            estimate: Point3::new(3.0, 4.0, 0.0),
            error: 5.0,
            estimation_secs: 0.001,
        });
        report.records.push(TrialRecord {
            trial: 1,
            truth: Point3::new(1.0, 0.0, 0.0),
            estimate: Point3::new(1.0, 0.0, 1.0),
            error: 1.0,
            estimation_secs: 0.001,
        });
        report.failures.push(TrialFailure {
            trial: 2,
            error: LocError::DegenerateReference { sensor: 1 },
        });

        assert_eq!(report.success_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.mean_error(), Some(3.0));
        assert_eq!(report.max_error(), Some(5.0));

        let text = report.format_text();
        assert!(text.contains("FAILED"));
        assert!(text.contains("2 ok, 1 failed"));

        let csv = report.format_csv();
        assert_eq!(csv.lines().count(), 3); // header + 2 records

        let json = report.format_json();
        assert!(json.contains("\"successes\": 2"));
        assert!(json.contains("\"trial\": 2"));
    }
}
