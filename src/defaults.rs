//! Default configuration constants for vadpipe.
//!
//! This module provides shared constants used across different configuration
//! types to ensure consistency and eliminate duplication.

use std::time::Duration;

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech processing and is the rate the Silero
/// voice-activity model was trained on.
pub const SAMPLE_RATE: u32 = 16000;

/// Capture frame period in milliseconds.
///
/// Audio is chopped into fixed frames of this duration before classification.
/// 10ms at 16kHz yields 160-sample frames, small enough to keep boundary
/// latency low while amortizing per-frame inference cost.
pub const FRAME_MS: u32 = 10;

/// Default speech probability threshold.
///
/// Frames whose classifier score reaches this probability count as speech.
/// 0.5 is the Silero model's recommended operating point.
pub const THRESHOLD: f32 = 0.5;

/// Default minimum utterance duration in milliseconds.
///
/// Utterances shorter than this still produce boundary events but no audio
/// payload; 250ms filters out coughs, clicks and other transients.
pub const MIN_UTTERANCE_MS: u32 = 250;

/// Number of consecutive non-speech frames tolerated inside an open
/// utterance before it is closed.
///
/// 10 frames at 10ms framing is roughly 100ms of silence, enough to ride
/// out intra-word gaps without merging separate utterances.
pub const SILENCE_HANGOVER_FRAMES: u32 = 10;

/// Capacity of the capture-to-worker frame queue.
///
/// At 10ms framing this buffers ~640ms of audio. When the worker falls
/// behind for longer, incoming frames are dropped and counted rather than
/// stalling the capture callback.
pub const FRAME_QUEUE_CAPACITY: usize = 64;

/// Timeout for the worker's blocking queue pop.
///
/// Short enough that the running flag is re-checked promptly on shutdown;
/// a timeout is not an error and carries no state change.
pub const POP_TIMEOUT: Duration = Duration::from_millis(100);

/// Number of samples in one frame at the given sample rate.
pub const fn samples_per_frame(sample_rate: u32) -> usize {
    (sample_rate / 1000 * FRAME_MS) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_frame_at_16khz() {
        assert_eq!(samples_per_frame(16000), 160);
    }

    #[test]
    fn samples_per_frame_at_8khz() {
        assert_eq!(samples_per_frame(8000), 80);
    }

    #[test]
    fn hangover_spans_100ms_at_default_framing() {
        assert_eq!(SILENCE_HANGOVER_FRAMES * FRAME_MS, 100);
    }
}
