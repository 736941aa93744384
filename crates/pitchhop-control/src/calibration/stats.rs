//! Base-pitch statistics over the samples collected in one session.
//!
//! 1. Tukey fence outlier removal (only when more than 20 samples)
//! 2. Histogram keyed by semitone offset from A4
//! 3. Cluster selection:
//!    - re-calibration: lowest bin holding at least 15% of the samples
//!    - first calibration: most frequent bin if it holds at least 30%
//!    - otherwise the 25th percentile
//! 4. Quantization to the nearest equal-tempered semitone

use crate::error::{CalibrationError, Result};
use pitchhop_core::{frequency_from_semitones, quantize_to_semitone, REFERENCE_PITCH_HZ};
use std::collections::BTreeMap;

/// Outlier removal is skipped at or below this many samples.
pub const OUTLIER_MIN_SAMPLES: usize = 20;

/// Share of samples a bin needs to count as a cluster when re-calibrating.
pub const RECALIBRATION_CLUSTER_SHARE: f32 = 0.15;

/// Share of samples the most frequent bin needs on a first calibration.
pub const DOMINANT_CLUSTER_SHARE: f32 = 0.30;

/// Samples within this many semitones of the cluster center feed its median.
const CLUSTER_RADIUS_SEMITONES: f32 = 1.0;

/// Whether a calibration replaces an earlier result in the same session of use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationMode {
    First,
    Recalibration,
}

/// How the base pitch was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Lowest sufficiently populated bin (re-calibration)
    LowestCluster { semitone: i32 },
    /// Most frequent bin (first calibration)
    DominantCluster { semitone: i32 },
    /// No cluster qualified
    Percentile,
}

/// Result of [`estimate_base_pitch`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasePitchEstimate {
    /// Selected pitch, quantized to a semitone
    pub base_pitch_hz: f32,
    /// Selected pitch before quantization
    pub raw_hz: f32,
    pub selection: Selection,
    /// Samples left after outlier removal
    pub kept: usize,
    pub removed: usize,
}

fn sorted(samples: &[f32]) -> Vec<f32> {
    let mut values = samples.to_vec();
    values.sort_by(f32::total_cmp);
    values
}

/// Drop samples outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`.
///
/// Q1 and Q3 are taken by index (`n/4`, `3n/4`) on the sorted samples.
/// Returns the samples sorted ascending; inputs of 20 or fewer are only sorted.
pub fn remove_outliers(samples: &[f32]) -> Vec<f32> {
    let values = sorted(samples);
    let count = values.len();
    if count <= OUTLIER_MIN_SAMPLES {
        return values;
    }

    let q1 = values[count / 4];
    let q3 = values[3 * count / 4];
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;

    values.into_iter().filter(|&f| f >= lower && f <= upper).collect()
}

/// Semitone bin of `hz` relative to A4.
pub fn semitone_bin(hz: f32) -> i32 {
    (12.0 * (hz / REFERENCE_PITCH_HZ).log2()).round() as i32
}

/// Center frequency of a semitone bin.
pub fn bin_center_hz(semitone: i32) -> f32 {
    frequency_from_semitones(semitone as f32, REFERENCE_PITCH_HZ)
}

/// Count samples per semitone bin. Non-positive samples are skipped.
pub fn semitone_histogram(samples: &[f32]) -> BTreeMap<i32, usize> {
    let mut histogram = BTreeMap::new();
    for &hz in samples.iter().filter(|&&hz| hz > 0.0) {
        *histogram.entry(semitone_bin(hz)).or_insert(0) += 1;
    }
    histogram
}

/// Median; even-sized inputs average the two middle values.
pub fn median(samples: &[f32]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    let values = sorted(samples);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Median of the samples within one semitone of the bin center.
fn cluster_median(samples: &[f32], semitone: i32) -> Option<f32> {
    let center = bin_center_hz(semitone);
    let members: Vec<f32> = samples
        .iter()
        .copied()
        .filter(|&hz| (12.0 * (hz / center).log2()).abs() <= CLUSTER_RADIUS_SEMITONES)
        .collect();
    median(&members)
}

/// Lowest bin holding at least `share` of `total`.
fn lowest_cluster(histogram: &BTreeMap<i32, usize>, total: usize, share: f32) -> Option<i32> {
    let needed = share * total as f32;
    histogram
        .iter()
        .find(|(_, &count)| count as f32 >= needed)
        .map(|(&semitone, _)| semitone)
}

/// Most frequent bin if it holds at least `share` of `total`.
///
/// Ties go to the lower semitone.
fn dominant_cluster(histogram: &BTreeMap<i32, usize>, total: usize, share: f32) -> Option<i32> {
    let (&semitone, &count) = histogram
        .iter()
        .fold(None, |best: Option<(&i32, &usize)>, entry| match best {
            Some(b) if *b.1 >= *entry.1 => Some(b),
            _ => Some(entry),
        })?;
    (count as f32 >= share * total as f32).then_some(semitone)
}

/// Derive a base pitch from the pitched samples of a recording.
///
/// Fails with [`CalibrationError::InsufficientSamples`] when fewer than
/// `min_samples` samples were collected (before or after outlier removal).
pub fn estimate_base_pitch(
    samples: &[f32],
    mode: CalibrationMode,
    min_samples: usize,
) -> Result<BasePitchEstimate> {
    let pitched: Vec<f32> = samples.iter().copied().filter(|&hz| hz > 0.0).collect();
    let required = min_samples.max(1);
    if pitched.len() < required {
        return Err(CalibrationError::InsufficientSamples {
            collected: pitched.len(),
            required,
        });
    }

    let filtered = remove_outliers(&pitched);
    let total = filtered.len();
    if total == 0 {
        return Err(CalibrationError::InsufficientSamples {
            collected: 0,
            required,
        });
    }
    let histogram = semitone_histogram(&filtered);

    let mut chosen = None;
    if mode == CalibrationMode::Recalibration {
        chosen = lowest_cluster(&histogram, total, RECALIBRATION_CLUSTER_SHARE).and_then(
            |semitone| {
                cluster_median(&filtered, semitone)
                    .map(|hz| (hz, Selection::LowestCluster { semitone }))
            },
        );
    }
    if chosen.is_none() {
        chosen = dominant_cluster(&histogram, total, DOMINANT_CLUSTER_SHARE).and_then(
            |semitone| {
                cluster_median(&filtered, semitone)
                    .map(|hz| (hz, Selection::DominantCluster { semitone }))
            },
        );
    }
    let (raw_hz, selection) = chosen.unwrap_or((filtered[total / 4], Selection::Percentile));

    Ok(BasePitchEstimate {
        base_pitch_hz: quantize_to_semitone(raw_hz),
        raw_hz,
        selection,
        kept: total,
        removed: pitched.len() - total,
    })
}
