//! Acoustic Propagation Model
//!
//! Turns the reference waveform plus one trial's geometry into the signal
//! matrix the delay estimator consumes. The model is deliberately simple:
//!
//! 1. **Delay**: each sensor's row starts with `padding` zero samples,
//!    one per whole sample of propagation delay.
//! 2. **Common length**: every row is tail-padded with zeros to the longest
//!    row, so the matrix is rectangular.
//! 3. **Attenuation**: each row is scaled by `1/distance` (inverse-distance
//!    amplitude law).
//! 4. **Noise** (optional): additive white Gaussian noise at a configured
//!    SNR, for stressing the estimator beyond the clean baseline.
//!
//! A source sitting exactly on a sensor would require infinite amplitude;
//! that case fails with [`LocError::DegenerateGeometry`] before any
//! division happens.

use crate::trial::SourceTrial;
use echoloc_core::types::{LocError, LocResult, Sample};
use echoloc_core::waveform::Waveform;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

/// N equal-length delayed/attenuated copies of the template, one row per
/// sensor. Ephemeral: built and consumed within a single trial.
#[derive(Debug, Clone)]
pub struct Multitrack {
    rows: Vec<Vec<Sample>>,
    sample_rate: f64,
}

impl Multitrack {
    /// Synthesize the per-sensor signal matrix for one trial.
    pub fn synthesize(waveform: &Waveform, trial: &SourceTrial) -> LocResult<Self> {
        if let Some(sensor) = trial.distances.iter().position(|&d| d == 0.0) {
            return Err(LocError::DegenerateGeometry { sensor });
        }

        let template = waveform.samples();
        let row_len = trial
            .paddings
            .iter()
            .map(|&pad| pad + template.len())
            .max()
            .unwrap_or(0);

        let rows = trial
            .paddings
            .iter()
            .zip(&trial.distances)
            .map(|(&pad, &dist)| {
                let gain = 1.0 / dist;
                let mut row = vec![0.0; row_len];
                for (slot, &s) in row[pad..pad + template.len()].iter_mut().zip(template) {
                    *slot = s * gain;
                }
                row
            })
            .collect();

        Ok(Self {
            rows,
            sample_rate: waveform.sample_rate(),
        })
    }

    /// Add white Gaussian noise at the given SNR (dB), measured against the
    /// mean power across all rows.
    pub fn add_noise(&mut self, snr_db: f64, rng: &mut StdRng) {
        let total_samples: usize = self.rows.iter().map(|r| r.len()).sum();
        if total_samples == 0 {
            return;
        }
        let signal_power: f64 = self
            .rows
            .iter()
            .flat_map(|r| r.iter())
            .map(|&s| s * s)
            .sum::<f64>()
            / total_samples as f64;

        let snr_linear = 10.0_f64.powf(snr_db / 10.0);
        let noise_std = (signal_power / snr_linear).sqrt();
        let noise = Normal::new(0.0, noise_std).unwrap();

        for row in &mut self.rows {
            for s in row.iter_mut() {
                *s += noise.sample(rng);
            }
        }
    }

    /// Signal rows, in sensor order
    pub fn rows(&self) -> &[Vec<Sample>] {
        &self.rows
    }

    /// Number of sensor rows
    pub fn sensor_count(&self) -> usize {
        self.rows.len()
    }

    /// Shared row length in samples
    pub fn row_len(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
