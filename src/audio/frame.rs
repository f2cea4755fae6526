//! Audio frame type and fixed-size framing of capture buffers.

use std::time::Instant;

/// A fixed-duration frame of mono audio samples with timing information.
///
/// Samples are floating-point in [-1.0, 1.0]. A frame is immutable once
/// captured and owned exclusively by whichever stage currently holds it;
/// ownership transfers capture → queue → segmenter, never shared.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Mono samples for one capture period.
    pub samples: Vec<f32>,
    /// Timestamp when this frame was captured.
    pub timestamp: Instant,
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
}

impl AudioFrame {
    /// Creates a new audio frame.
    pub fn new(samples: Vec<f32>, timestamp: Instant, sequence: u64) -> Self {
        Self {
            samples,
            timestamp,
            sequence,
        }
    }

    /// Number of samples in the frame.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the frame carries no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Chops arbitrarily-sized capture deliveries into fixed-size frames.
///
/// Audio backends deliver buffers of whatever size they like; the
/// classifier wants exact frame lengths. The framer carries the remainder
/// between calls and assigns monotonically increasing sequence numbers.
/// Runs inside the capture callback, so it only ever allocates one frame
/// at a time.
#[derive(Debug)]
pub struct Framer {
    frame_len: usize,
    carry: Vec<f32>,
    sequence: u64,
}

impl Framer {
    /// Creates a framer emitting frames of exactly `frame_len` samples.
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len,
            carry: Vec::with_capacity(frame_len * 2),
            sequence: 0,
        }
    }

    /// Feeds a capture delivery, invoking `emit` for each complete frame.
    ///
    /// All frames cut from one delivery share its timestamp; timestamps
    /// stay monotonically non-decreasing across deliveries.
    pub fn push(&mut self, samples: &[f32], timestamp: Instant, mut emit: impl FnMut(AudioFrame)) {
        self.carry.extend_from_slice(samples);

        while self.carry.len() >= self.frame_len {
            let rest = self.carry.split_off(self.frame_len);
            let frame_samples = std::mem::replace(&mut self.carry, rest);
            emit(AudioFrame::new(frame_samples, timestamp, self.sequence));
            self.sequence += 1;
        }
    }

    /// Frame length in samples.
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Samples currently carried over, waiting for a full frame.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_frames(framer: &mut Framer, samples: &[f32]) -> Vec<AudioFrame> {
        let mut out = Vec::new();
        framer.push(samples, Instant::now(), |frame| out.push(frame));
        out
    }

    #[test]
    fn test_frame_accessors() {
        let frame = AudioFrame::new(vec![0.1, -0.2, 0.3], Instant::now(), 7);
        assert_eq!(frame.len(), 3);
        assert!(!frame.is_empty());
        assert_eq!(frame.sequence, 7);

        let empty = AudioFrame::new(vec![], Instant::now(), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_framer_exact_delivery() {
        let mut framer = Framer::new(4);
        let frames = collect_frames(&mut framer, &[0.0, 0.1, 0.2, 0.3]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples, vec![0.0, 0.1, 0.2, 0.3]);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_carries_remainder() {
        let mut framer = Framer::new(4);

        let frames = collect_frames(&mut framer, &[0.0, 0.1, 0.2]);
        assert!(frames.is_empty());
        assert_eq!(framer.pending(), 3);

        let frames = collect_frames(&mut framer, &[0.3, 0.4]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].samples, vec![0.0, 0.1, 0.2, 0.3]);
        assert_eq!(framer.pending(), 1);
    }

    #[test]
    fn test_framer_splits_large_delivery() {
        let mut framer = Framer::new(2);
        let samples: Vec<f32> = (0..7).map(|i| i as f32 / 10.0).collect();
        let frames = collect_frames(&mut framer, &samples);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].samples, vec![0.0, 0.1]);
        assert_eq!(frames[1].samples, vec![0.2, 0.3]);
        assert_eq!(frames[2].samples, vec![0.4, 0.5]);
        assert_eq!(framer.pending(), 1);
    }

    #[test]
    fn test_framer_sequences_are_contiguous() {
        let mut framer = Framer::new(2);
        let mut all = Vec::new();
        for chunk in [[0.0f32; 3].as_slice(), &[0.0; 5], &[0.0; 2]] {
            framer.push(chunk, Instant::now(), |frame| all.push(frame));
        }

        let sequences: Vec<u64> = all.iter().map(|f| f.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_framer_empty_delivery_is_noop() {
        let mut framer = Framer::new(4);
        let frames = collect_frames(&mut framer, &[]);
        assert!(frames.is_empty());
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_timestamps_non_decreasing() {
        let mut framer = Framer::new(1);
        let mut all = Vec::new();
        let t0 = Instant::now();
        framer.push(&[0.0, 0.0], t0, |frame| all.push(frame));
        let t1 = Instant::now();
        framer.push(&[0.0], t1, |frame| all.push(frame));

        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
