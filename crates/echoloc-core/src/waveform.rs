//! Reference Waveform
//!
//! The template signal every sensor "hears". It is constructed once —
//! either from externally decoded mono samples or from the built-in chirp
//! generator — normalized so the peak amplitude is 0.8 of full scale, and
//! read-only afterwards.
//!
//! Audio file decoding and resampling are a loader's job, not this crate's;
//! the chirp generator exists so the CLI and the tests have a deterministic
//! template with a sharp autocorrelation peak.

use crate::types::{LocError, LocResult, Sample, SAMPLE_RATE};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Peak amplitude after normalization, as a fraction of full scale
pub const PEAK_AMPLITUDE: f64 = 0.8;

/// A normalized mono sample sequence at a fixed sample rate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waveform {
    samples: Vec<Sample>,
    sample_rate: f64,
}

impl Waveform {
    /// Build a waveform from raw mono samples at [`SAMPLE_RATE`].
    ///
    /// The samples are scaled so the largest absolute value becomes
    /// [`PEAK_AMPLITUDE`]. Empty or all-zero input has no meaningful
    /// normalization and is rejected.
    pub fn from_samples(samples: Vec<Sample>) -> LocResult<Self> {
        Self::from_samples_at(samples, SAMPLE_RATE)
    }

    /// Build a waveform from raw mono samples at an explicit sample rate.
    pub fn from_samples_at(samples: Vec<Sample>, sample_rate: f64) -> LocResult<Self> {
        if samples.is_empty() {
            return Err(LocError::InvalidWaveform("empty template".into()));
        }
        let peak = samples.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
        if peak == 0.0 {
            return Err(LocError::InvalidWaveform("silent template".into()));
        }
        let scale = PEAK_AMPLITUDE / peak;
        let samples = samples.into_iter().map(|s| s * scale).collect();
        Ok(Self { samples, sample_rate })
    }

    /// Generate a linear up-chirp sweeping `f0` to `f1` Hz over `duration`
    /// seconds at [`SAMPLE_RATE`], normalized like any other template.
    pub fn chirp(f0: f64, f1: f64, duration: f64) -> LocResult<Self> {
        let n = (duration * SAMPLE_RATE).round() as usize;
        if n == 0 {
            return Err(LocError::InvalidWaveform(format!(
                "chirp duration {duration}s is shorter than one sample"
            )));
        }
        let rate = (f1 - f0) / duration;
        let samples: Vec<Sample> = (0..n)
            .map(|i| {
                let t = i as f64 / SAMPLE_RATE;
                // Instantaneous phase of a linear sweep: 2π(f0·t + k·t²/2)
                (2.0 * PI * (f0 * t + 0.5 * rate * t * t)).sin()
            })
            .collect();
        Self::from_samples(samples)
    }

    /// The normalized samples
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Template duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }
}
