//! Utterance payload encoding.
//!
//! Pure functions: concatenate frame samples in order, quantize to signed
//! 16-bit little-endian PCM, and base64-encode for inclusion in a text
//! event line. Deterministic given identical input.

use crate::audio::frame::AudioFrame;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Quantize one floating-point sample to a 16-bit integer.
///
/// Samples in [-1.0, 1.0] map via `round(sample * 32767)`; out-of-range
/// input saturates at the representable bounds instead of wrapping.
pub fn sample_to_i16(sample: f32) -> i16 {
    (sample * i16::MAX as f32)
        .round()
        .clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Serialize accumulated frames as little-endian 16-bit PCM bytes.
pub fn pcm_bytes(frames: &[AudioFrame]) -> Vec<u8> {
    let total_samples: usize = frames.iter().map(|f| f.len()).sum();
    let mut bytes = Vec::with_capacity(total_samples * 2);

    for frame in frames {
        for &sample in &frame.samples {
            bytes.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
        }
    }

    bytes
}

/// Encode accumulated frames as a base64 transport payload.
pub fn encode(frames: &[AudioFrame]) -> String {
    STANDARD.encode(pcm_bytes(frames))
}
