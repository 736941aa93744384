//! YIN estimator (de Cheveigné & Kawahara, 2002).
//!
//! 1. **Difference function** - d(τ) = Σ(x[j] - x[j+τ])²
//! 2. **Cumulative mean normalized difference** - d'(τ)
//! 3. **Absolute threshold** - first local minimum of d'(τ) below the threshold
//! 4. **Parabolic interpolation** - sub-sample period
//!
//! Confidence is `1 - d'(τ)` at the chosen period.

use super::{parabolic_vertex, required_block_size, Estimate, PitchEstimator};

/// Default absolute threshold on d'(τ).
const DEFAULT_THRESHOLD: f32 = 0.1;

/// Best d'(τ) accepted when nothing dips below the threshold.
const FALLBACK_LIMIT: f32 = 0.5;

pub struct YinEstimator {
    sample_rate: f32,
    min_period: usize,
    max_period: usize,
    threshold: f32,

    // Pre-allocated, indexed by lag
    difference: Vec<f32>,
    normalized: Vec<f32>,
}

impl YinEstimator {
    pub fn new(sample_rate: u32, min_frequency_hz: f32, max_frequency_hz: f32) -> Self {
        let max_period = required_block_size(sample_rate, min_frequency_hz) / 2;
        let min_period = if max_frequency_hz > 0.0 {
            (sample_rate as f32 / max_frequency_hz).floor() as usize
        } else {
            0
        };

        Self {
            sample_rate: sample_rate as f32,
            min_period: min_period.max(2),
            max_period,
            threshold: DEFAULT_THRESHOLD,
            difference: vec![0.0; max_period + 1],
            normalized: vec![0.0; max_period + 1],
        }
    }

    /// Set the absolute threshold (0.01 - 0.5). Lower is stricter.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.01, FALLBACK_LIMIT);
    }

    fn compute_difference(&mut self, samples: &[f32], max_lag: usize) {
        let window = max_lag;
        self.difference[0] = 0.0;

        for tau in 1..=max_lag {
            let mut sum = 0.0f64;
            for j in 0..window {
                let delta = (samples[j] - samples[j + tau]) as f64;
                sum += delta * delta;
            }
            self.difference[tau] = sum as f32;
        }
    }

    /// d'(τ) = d(τ) / ((1/τ) Σ_{j=1..τ} d(j)), d'(0) = 1
    fn compute_normalized(&mut self, max_lag: usize) {
        self.normalized[0] = 1.0;

        let mut running_sum = 0.0f32;
        for tau in 1..=max_lag {
            running_sum += self.difference[tau];
            self.normalized[tau] = if running_sum > 1e-10 {
                self.difference[tau] * tau as f32 / running_sum
            } else {
                1.0
            };
        }
    }

    /// First local minimum below the threshold, else the global minimum if
    /// it is below [`FALLBACK_LIMIT`]. Returns `None` when unvoiced.
    fn find_period(&self, max_lag: usize) -> Option<usize> {
        let mut tau = self.min_period;
        while tau < max_lag {
            if self.normalized[tau] < self.threshold {
                while tau + 1 < max_lag && self.normalized[tau + 1] < self.normalized[tau] {
                    tau += 1;
                }
                return Some(tau);
            }
            tau += 1;
        }

        let (best_tau, best_val) = (self.min_period..=max_lag)
            .map(|tau| (tau, self.normalized[tau]))
            .fold((0, f32::MAX), |best, candidate| {
                if candidate.1 < best.1 {
                    candidate
                } else {
                    best
                }
            });

        (best_val < FALLBACK_LIMIT).then_some(best_tau)
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(&mut self, samples: &[f32]) -> Estimate {
        let max_lag = self.max_period.min(samples.len() / 2);
        if max_lag <= self.min_period {
            return Estimate::UNVOICED;
        }

        self.compute_difference(samples, max_lag);
        self.compute_normalized(max_lag);

        let Some(tau) = self.find_period(max_lag) else {
            return Estimate::UNVOICED;
        };

        let (period, aperiodicity) = if tau >= 1 && tau < max_lag {
            let (offset, value) = parabolic_vertex(
                self.normalized[tau - 1],
                self.normalized[tau],
                self.normalized[tau + 1],
            );
            (tau as f32 + offset, value.max(0.0))
        } else {
            (tau as f32, self.normalized[tau])
        };

        if period <= 0.0 {
            return Estimate::UNVOICED;
        }

        Estimate {
            frequency_hz: self.sample_rate / period,
            confidence: (1.0 - aperiodicity).clamp(0.0, 1.0),
        }
    }

    fn required_samples(&self) -> usize {
        self.max_period * 2
    }

    fn name(&self) -> &'static str {
        "yin"
    }
}
