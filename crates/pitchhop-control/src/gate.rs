//! Stability gate: turns a noisy stream of levels into debounced jump triggers.

use pitchhop_core::{ControlLevel, JumpTrigger, StabilitySettings, MAX_LEVEL};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::trace;

/// Debounce state for one consumer of control levels.
///
/// Fires when at least `threshold` valid levels have accumulated since the
/// last invalid block, the current level is non-zero and the cooldown since
/// the previous trigger has elapsed. The buffered levels do not have to agree.
#[derive(Debug, Clone)]
pub struct StabilityGate {
    history: VecDeque<ControlLevel>,
    capacity: usize,
    threshold: usize,
    min_interval: Duration,
    last_trigger: Option<Instant>,
}

impl StabilityGate {
    pub fn new(settings: &StabilitySettings) -> Self {
        let capacity = settings.history.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            threshold: settings.threshold.clamp(1, capacity),
            min_interval: Duration::from_millis(settings.min_interval_ms),
            last_trigger: None,
        }
    }

    /// Apply new stability parameters. History beyond the new capacity is
    /// dropped (oldest first); the cooldown timestamp is kept.
    pub fn reconfigure(&mut self, settings: &StabilitySettings) {
        self.capacity = settings.history.max(1);
        self.threshold = settings.threshold.clamp(1, self.capacity);
        self.min_interval = Duration::from_millis(settings.min_interval_ms);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Feed one block. `None` means the block carried no valid pitch.
    pub fn process(&mut self, level: Option<ControlLevel>, now: Instant) -> Option<JumpTrigger> {
        let Some(level) = level else {
            self.history.clear();
            return None;
        };

        self.history.push_back(level);
        if self.history.len() > self.capacity {
            self.history.pop_front();
        }

        if self.history.len() < self.threshold || level == 0 || !self.cooled_down(now) {
            return None;
        }

        self.last_trigger = Some(now);
        let level = level.clamp(1, MAX_LEVEL);
        trace!("Jump trigger at level {}", level);
        Some(JumpTrigger {
            level,
            timestamp: now,
        })
    }

    fn cooled_down(&self, now: Instant) -> bool {
        match self.last_trigger {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        }
    }

    /// Forget buffered levels. The cooldown is not reset.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }
}

impl Default for StabilityGate {
    fn default() -> Self {
        Self::new(&StabilitySettings::default())
    }
}
