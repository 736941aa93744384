//! McLeod pitch method (McLeod & Wyvill, 2005).
//!
//! Computes the normalized square difference function
//! `n(τ) = 2·r(τ) / m(τ)` where `r` is the autocorrelation and `m` the
//! summed energy of both overlapping windows. Between each positive-going and
//! negative-going zero crossing the highest value is a key maximum; the first
//! key maximum within `k` of the tallest one gives the period.
//!
//! Confidence is the interpolated NSDF height (the "clarity").

use super::{parabolic_vertex, required_block_size, Estimate, PitchEstimator};

/// Fraction of the tallest key maximum a candidate must reach.
const DEFAULT_CUTOFF: f32 = 0.93;

/// Key maxima below this are ignored outright.
const SMALL_CUTOFF: f32 = 0.5;

pub struct McLeodEstimator {
    sample_rate: f32,
    min_period: usize,
    max_period: usize,
    cutoff: f32,

    nsdf: Vec<f32>,
    key_maxima: Vec<usize>,
}

impl McLeodEstimator {
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
            cutoff: DEFAULT_CUTOFF,
            nsdf: vec![0.0; max_period + 2],
            key_maxima: Vec::with_capacity(64),
        }
    }

    /// Set the key-maximum cutoff `k` (0.5 - 1.0).
    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff = cutoff.clamp(SMALL_CUTOFF, 1.0);
    }

    fn compute_nsdf(&mut self, samples: &[f32], max_lag: usize) {
        let n = samples.len();
        for tau in 0..=max_lag {
            let mut acf = 0.0f64;
            let mut energy = 0.0f64;
            for j in 0..n - tau {
                let a = samples[j] as f64;
                let b = samples[j + tau] as f64;
                acf += a * b;
                energy += a * a + b * b;
            }
            self.nsdf[tau] = if energy > 1e-12 {
                (2.0 * acf / energy) as f32
            } else {
                0.0
            };
        }
    }

    fn collect_key_maxima(&mut self, max_lag: usize) {
        self.key_maxima.clear();

        // Skip the lobe around τ = 0
        let mut tau = 1;
        while tau < max_lag && self.nsdf[tau] > 0.0 {
            tau += 1;
        }

        let mut current: Option<usize> = None;
        while tau < max_lag {
            let prev = self.nsdf[tau - 1];
            let value = self.nsdf[tau];

            if prev <= 0.0 && value > 0.0 {
                current = Some(tau);
            } else if prev > 0.0 && value <= 0.0 {
                if let Some(peak) = current.take() {
                    self.key_maxima.push(peak);
                }
            }

            if let Some(peak) = current {
                if value > self.nsdf[peak] {
                    current = Some(tau);
                }
            }
            tau += 1;
        }

        // A lobe still open at the end of the lag range counts too
        if let Some(peak) = current {
            self.key_maxima.push(peak);
        }
    }
}

impl PitchEstimator for McLeodEstimator {
    fn estimate(&mut self, samples: &[f32]) -> Estimate {
        let max_lag = self.max_period.min(samples.len().saturating_sub(1));
        if max_lag <= self.min_period {
            return Estimate::UNVOICED;
        }

        self.compute_nsdf(samples, max_lag);
        self.collect_key_maxima(max_lag);

        let highest = self
            .key_maxima
            .iter()
            .map(|&tau| self.nsdf[tau])
            .fold(0.0f32, f32::max);
        if highest < SMALL_CUTOFF {
            return Estimate::UNVOICED;
        }

        let threshold = highest * self.cutoff;
        let Some(&tau) = self
            .key_maxima
            .iter()
            .find(|&&tau| tau >= self.min_period && self.nsdf[tau] >= threshold)
        else {
            return Estimate::UNVOICED;
        };

        let (period, clarity) = if tau < max_lag {
            let (offset, value) =
                parabolic_vertex(self.nsdf[tau - 1], self.nsdf[tau], self.nsdf[tau + 1]);
            (tau as f32 + offset, value)
        } else {
            (tau as f32, self.nsdf[tau])
        };

        Estimate {
            frequency_hz: self.sample_rate / period,
            confidence: clarity.clamp(0.0, 1.0),
        }
    }

    fn required_samples(&self) -> usize {
        self.max_period * 2
    }

    fn name(&self) -> &'static str {
        "mcleod"
    }
}
