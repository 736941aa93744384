//! PCM decoding and level metering.

/// Level reported for digital silence (dBFS).
pub const SILENCE_DB: f32 = -100.0;

/// A block of mono 16-bit little-endian PCM as delivered by the capture source.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    pub bytes: Vec<u8>,
    pub sample_count: usize,
    /// Block level in dBFS, computed by the capture source.
    pub level_db: f32,
}

impl AudioBlock {
    /// Wrap raw PCM bytes with a level computed by the capture source.
    pub fn new(bytes: Vec<u8>, level_db: f32) -> Self {
        let sample_count = bytes.len() / 2;
        Self {
            bytes,
            sample_count,
            level_db,
        }
    }

    /// Encode float samples in [-1, 1] and compute their level.
    pub fn from_samples(samples: &[f32]) -> Self {
        Self {
            bytes: encode_pcm16(samples),
            sample_count: samples.len(),
            level_db: level_db(samples),
        }
    }
}

/// Decode 16-bit little-endian PCM into `out`, normalized to [-1, 1].
///
/// A trailing odd byte is ignored. `out` is cleared first.
pub fn decode_pcm16(bytes: &[u8], out: &mut Vec<f32>) {
    out.clear();
    out.extend(
        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0),
    );
}

/// Encode float samples as 16-bit little-endian PCM, clamping to [-1, 1].
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// RMS level in dBFS, floored at [`SILENCE_DB`].
pub fn level_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_DB;
    }
    let mean_square = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let rms = mean_square.sqrt();
    if rms <= 0.0 {
        return SILENCE_DB;
    }
    (20.0 * rms.log10()).max(SILENCE_DB)
}
