//! Time-Delay Estimation
//!
//! Estimates the arrival-time offset of each sensor's signal relative to a
//! reference sensor by locating the cross-correlation peak between the two
//! rows. The correlation is computed in the frequency domain:
//!
//! ```text
//! r[m] = Σ_n ref[n] · tgt[n + m]  =  IFFT( conj(FFT(ref)) · FFT(tgt) )[m]
//! ```
//!
//! Both rows are zero-padded to the next power of two at least twice their
//! length, so the circular correlation is alias-free; the peak index is then
//! unwrapped to a signed lag. A positive delay means the target row lags the
//! reference, and a row correlated against itself yields exactly zero.
//!
//! ## Execution modes
//!
//! The estimator runs sequentially (`workers == 1`) or fans the sensor index
//! range out over scoped OS threads (`workers > 1`). The index range `[0, N)`
//! is split into contiguous chunks of `N / workers` sensors, the remainder
//! absorbed by the last chunk; each worker writes only its own disjoint slice
//! of the pre-sized output buffer, so no lock is needed and both modes
//! produce bit-identical results.
//!
//! ## Usage
//!
//! ```rust
//! use echoloc_core::delay::DelayEstimator;
//!
//! let rows = vec![vec![0.0, 1.0, 0.5, 0.0], vec![0.0, 0.0, 1.0, 0.5]];
//! let estimator = DelayEstimator::new(44_100.0);
//! let delays = estimator.estimate_all(&rows, 0).unwrap();
//! assert_eq!(delays[0], 0.0);
//! assert!(delays[1] > 0.0);
//! ```

use crate::types::{LocError, LocResult, Sample};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use std::thread;

/// Cross-correlation based delay estimator.
#[derive(Debug, Clone)]
pub struct DelayEstimator {
    sample_rate: f64,
    workers: usize,
}

impl DelayEstimator {
    /// Create a sequential estimator for signals at `sample_rate` Hz.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            workers: 1,
        }
    }

    /// Set the worker count. Values above the sensor count are clamped at
    /// estimation time; zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Configured worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Estimate the signed delay of `target` relative to `reference`, in
    /// seconds. Both rows must have the same non-zero length.
    pub fn estimate_pair(&self, reference: &[Sample], target: &[Sample]) -> LocResult<f64> {
        if reference.is_empty() {
            return Err(LocError::ShapeMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if target.len() != reference.len() {
            return Err(LocError::ShapeMismatch {
                expected: reference.len(),
                actual: target.len(),
            });
        }
        let plan = XcorrPlan::new(reference.len());
        Ok(plan.delay_seconds(reference, target, self.sample_rate))
    }

    /// Estimate the delay of every row relative to `rows[reference]`.
    ///
    /// Returns one signed delay in seconds per row, in row order. The entry
    /// at `reference` is exactly zero. All rows must share one length; this
    /// is validated up front so a shape bug fails loudly instead of producing
    /// a nonsense correlation.
    pub fn estimate_all(&self, rows: &[Vec<Sample>], reference: usize) -> LocResult<Vec<f64>> {
        if reference >= rows.len() {
            return Err(LocError::ShapeMismatch {
                expected: rows.len(),
                actual: reference,
            });
        }
        let row_len = rows[reference].len();
        if row_len == 0 {
            return Err(LocError::ShapeMismatch {
                expected: 1,
                actual: 0,
            });
        }
        for row in rows {
            if row.len() != row_len {
                return Err(LocError::ShapeMismatch {
                    expected: row_len,
                    actual: row.len(),
                });
            }
        }

        let n = rows.len();
        let workers = self.workers.min(n).max(1);
        let plan = XcorrPlan::new(row_len);
        let reference_row = rows[reference].as_slice();
        let mut delays = vec![0.0_f64; n];

        if workers == 1 {
            for (slot, row) in delays.iter_mut().zip(rows) {
                *slot = plan.delay_seconds(reference_row, row, self.sample_rate);
            }
            return Ok(delays);
        }

        // One contiguous chunk per worker; the remainder lands in the last
        // chunk. Disjoint split_at_mut slices make slot ownership explicit.
        let chunk = n / workers;
        let sample_rate = self.sample_rate;
        let mut failed: Option<(usize, usize)> = None;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            let mut remaining = delays.as_mut_slice();
            let mut start = 0_usize;

            for w in 0..workers {
                let end = if w + 1 == workers { n } else { start + chunk };
                let (slots, rest) = remaining.split_at_mut(end - start);
                remaining = rest;

                let plan = &plan;
                let handle = scope.spawn(move || {
                    for (k, slot) in slots.iter_mut().enumerate() {
                        *slot = plan.delay_seconds(reference_row, &rows[start + k], sample_rate);
                    }
                });
                handles.push((start, end, handle));
                start = end;
            }

            for (start, end, handle) in handles {
                if handle.join().is_err() && failed.is_none() {
                    failed = Some((start, end));
                }
            }
        });

        match failed {
            Some((start, end)) => Err(LocError::WorkerFailure { start, end }),
            None => Ok(delays),
        }
    }
}

/// Reusable FFT plan for one row length.
///
/// Planning is done once per call to `estimate_all` and shared across
/// workers; rustfft plans are immutable and thread-safe.
struct XcorrPlan {
    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,
    fft_len: usize,
}

impl XcorrPlan {
    fn new(row_len: usize) -> Self {
        let fft_len = (2 * row_len).next_power_of_two();
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(fft_len),
            ifft: planner.plan_fft_inverse(fft_len),
            fft_len,
        }
    }

    fn delay_seconds(&self, reference: &[Sample], target: &[Sample], sample_rate: f64) -> f64 {
        self.peak_lag(reference, target) as f64 / sample_rate
    }

    /// Signed lag (in samples) of the cross-correlation peak.
    fn peak_lag(&self, reference: &[Sample], target: &[Sample]) -> isize {
        let mut ref_buf = self.load(reference);
        let mut tgt_buf = self.load(target);
        self.fft.process(&mut ref_buf);
        self.fft.process(&mut tgt_buf);

        let mut cross: Vec<Complex64> = ref_buf
            .iter()
            .zip(&tgt_buf)
            .map(|(r, t)| r.conj() * t)
            .collect();
        self.ifft.process(&mut cross);

        // Argmax over the real part; the IFFT scale factor does not move the
        // peak, and ties resolve to the earliest index for determinism.
        let mut best = 0_usize;
        let mut best_val = f64::NEG_INFINITY;
        for (m, c) in cross.iter().enumerate() {
            if c.re > best_val {
                best_val = c.re;
                best = m;
            }
        }

        // Unwrap circular index to a signed lag
        if best <= self.fft_len / 2 {
            best as isize
        } else {
            best as isize - self.fft_len as isize
        }
    }

    fn load(&self, row: &[Sample]) -> Vec<Complex64> {
        let mut buf = vec![Complex64::new(0.0, 0.0); self.fft_len];
        for (slot, &s) in buf.iter_mut().zip(row) {
            *slot = Complex64::new(s, 0.0);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::Waveform;
    use approx::assert_relative_eq;

    const FS: f64 = 44_100.0;

    /// Rows with the chirp template embedded at the given sample offsets,
    /// all padded to one shared length.
    fn shifted_rows(offsets: &[usize]) -> Vec<Vec<f64>> {
        let template = Waveform::chirp(200.0, 4000.0, 0.01).unwrap();
        let max_offset = offsets.iter().copied().max().unwrap_or(0);
        let row_len = template.len() + max_offset;
        offsets
            .iter()
            .map(|&off| {
                let mut row = vec![0.0; row_len];
                row[off..off + template.len()].copy_from_slice(template.samples());
                row
            })
            .collect()
    }

    #[test]
    fn test_self_delay_is_zero() {
        let rows = shifted_rows(&[0, 37]);
        let estimator = DelayEstimator::new(FS);
        let delays = estimator.estimate_all(&rows, 0).unwrap();
        assert_eq!(delays[0], 0.0);
    }

    #[test]
    fn test_known_positive_shift() {
        let rows = shifted_rows(&[0, 37]);
        let estimator = DelayEstimator::new(FS);
        let delays = estimator.estimate_all(&rows, 0).unwrap();
        assert_relative_eq!(delays[1], 37.0 / FS, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_shift_when_target_leads() {
        let rows = shifted_rows(&[50, 10]);
        let estimator = DelayEstimator::new(FS);
        let delays = estimator.estimate_all(&rows, 0).unwrap();
        assert_relative_eq!(delays[1], -40.0 / FS, epsilon = 1e-12);
    }

    #[test]
    fn test_estimate_pair_matches_estimate_all() {
        let rows = shifted_rows(&[0, 21]);
        let estimator = DelayEstimator::new(FS);
        let all = estimator.estimate_all(&rows, 0).unwrap();
        let pair = estimator.estimate_pair(&rows[0], &rows[1]).unwrap();
        assert_eq!(all[1], pair);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        // 8 sensors, worker count 3 deliberately not a divisor of 8
        let rows = shifted_rows(&[0, 11, 23, 5, 90, 42, 67, 33]);
        let sequential = DelayEstimator::new(FS).estimate_all(&rows, 0).unwrap();
        let parallel = DelayEstimator::new(FS)
            .with_workers(3)
            .estimate_all(&rows, 0)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_workers_clamped_to_row_count() {
        let rows = shifted_rows(&[0, 7, 14, 21]);
        let delays = DelayEstimator::new(FS)
            .with_workers(16)
            .estimate_all(&rows, 0)
            .unwrap();
        assert_eq!(delays.len(), 4);
        assert_relative_eq!(delays[3], 21.0 / FS, epsilon = 1e-12);
    }

    #[test]
    fn test_mismatched_row_lengths_rejected() {
        let mut rows = shifted_rows(&[0, 10]);
        rows[1].pop();
        let result = DelayEstimator::new(FS).estimate_all(&rows, 0);
        assert!(matches!(result, Err(LocError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_reference_out_of_range_rejected() {
        let rows = shifted_rows(&[0, 10]);
        let result = DelayEstimator::new(FS).estimate_all(&rows, 5);
        assert!(matches!(result, Err(LocError::ShapeMismatch { .. })));
    }
}
