//! Pitch smoothing.
//!
//! Two independent filters owned by each detector:
//! - [`PreFilter`]: one-pole low-pass on raw samples, before estimation
//! - [`RollingAverage`]: mean of the last K validated estimates, after estimation

use std::collections::VecDeque;

/// One-pole low-pass: `y[n] = α·x[n] + (1-α)·y[n-1]`.
///
/// State carries across blocks.
#[derive(Debug, Clone)]
pub struct PreFilter {
    alpha: f32,
    state: f32,
}

impl PreFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(f32::EPSILON, 1.0),
            state: 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Takes effect from the next sample; the filter state is kept.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(f32::EPSILON, 1.0);
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32) -> f32 {
        self.state = self.alpha * input + (1.0 - self.alpha) * self.state;
        self.state
    }

    /// Filter a buffer in place.
    #[inline]
    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

/// Fixed-length rolling average.
///
/// The mean is recomputed from the whole window on every push.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    window: VecDeque<f32>,
    capacity: usize,
}

impl RollingAverage {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueue a value, evicting the oldest when full, and return the new mean.
    pub fn push(&mut self, value: f32) -> f32 {
        self.window.push_back(value);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        self.mean()
    }

    /// Mean of the current window (0.0 when empty).
    pub fn mean(&self) -> f32 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f32>() / self.window.len() as f32
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Shrinking drops the oldest values.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// Pre-filter and post-filter pair owned by one detector.
#[derive(Debug, Clone)]
pub struct PitchSmoother {
    pub pre: PreFilter,
    pub post: RollingAverage,
}

impl PitchSmoother {
    pub fn new(alpha: f32, window: usize) -> Self {
        Self {
            pre: PreFilter::new(alpha),
            post: RollingAverage::new(window),
        }
    }

    pub fn reset(&mut self) {
        self.pre.reset();
        self.post.clear();
    }
}

impl Default for PitchSmoother {
    fn default() -> Self {
        Self::new(0.2, 5)
    }
}
