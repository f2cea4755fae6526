use crate::audio::frame::AudioFrame;
use crate::audio::queue::FrameProducer;
use crate::error::{Result, VadPipeError};

/// Trait for audio frame sources.
///
/// A source delivers fixed-size frames by pushing them into the queue
/// producer handed to `start`. Delivery happens on the source's own thread
/// (an audio backend callback or a reader thread); the push path must never
/// block. This trait allows swapping implementations (real capture device,
/// WAV file, mock).
pub trait FrameSource: Send {
    /// Start delivering frames into `producer`.
    ///
    /// # Errors
    /// Returns an error if the source cannot start (e.g. capture device
    /// unavailable); the pipeline treats this as an unrecoverable startup
    /// failure.
    fn start(&mut self, producer: FrameProducer) -> Result<()>;

    /// Stop delivering frames and release the source.
    fn stop(&mut self) -> Result<()>;

    /// True if the source ends on its own (file input). Finite sources
    /// close the queue when exhausted; live sources run until stopped.
    fn is_finite(&self) -> bool {
        false
    }
}

/// Mock frame source for testing.
///
/// Pushes its configured frames synchronously during `start`, then drops
/// the producer so the queue reports end-of-stream.
#[derive(Debug, Clone)]
pub struct MockFrameSource {
    frames: Vec<AudioFrame>,
    is_started: bool,
    should_fail_start: bool,
    should_fail_stop: bool,
    error_message: String,
}

impl MockFrameSource {
    /// Create a new mock source with no frames.
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            is_started: false,
            should_fail_start: false,
            should_fail_stop: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to push specific frames on start.
    pub fn with_frames(mut self, frames: Vec<AudioFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Configure the mock to fail on start.
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on stop.
    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the source is started.
    pub fn is_started(&self) -> bool {
        self.is_started
    }
}

impl Default for MockFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for MockFrameSource {
    fn start(&mut self, producer: FrameProducer) -> Result<()> {
        if self.should_fail_start {
            return Err(VadPipeError::AudioCapture {
                message: self.error_message.clone(),
            });
        }

        self.is_started = true;
        for frame in self.frames.drain(..) {
            producer.push(frame);
        }
        // Producer dropped here: the queue closes once drained.
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            Err(VadPipeError::AudioCapture {
                message: self.error_message.clone(),
            })
        } else {
            self.is_started = false;
            Ok(())
        }
    }

    fn is_finite(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::queue::{PopResult, frame_queue};
    use std::time::{Duration, Instant};

    fn frames(count: u64) -> Vec<AudioFrame> {
        (0..count)
            .map(|seq| AudioFrame::new(vec![0.0; 4], Instant::now(), seq))
            .collect()
    }

    #[test]
    fn test_mock_source_pushes_frames_in_order() {
        let (producer, consumer) = frame_queue(16);
        let mut source = MockFrameSource::new().with_frames(frames(5));

        source.start(producer).expect("start");
        assert!(source.is_started());

        let mut sequences = Vec::new();
        loop {
            match consumer.pop(Duration::from_millis(10)) {
                PopResult::Frame(f) => sequences.push(f.sequence),
                PopResult::Empty => continue,
                PopResult::Closed => break,
            }
        }
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_mock_source_closes_queue_after_start() {
        let (producer, consumer) = frame_queue(4);
        let mut source = MockFrameSource::new();

        source.start(producer).expect("start");
        assert!(matches!(
            consumer.pop(Duration::from_millis(10)),
            PopResult::Closed
        ));
    }

    #[test]
    fn test_mock_source_start_failure() {
        let (producer, _consumer) = frame_queue(4);
        let mut source = MockFrameSource::new()
            .with_start_failure()
            .with_error_message("device not found");

        let result = source.start(producer);
        assert!(!source.is_started());
        match result {
            Err(VadPipeError::AudioCapture { message }) => {
                assert_eq!(message, "device not found");
            }
            other => panic!("expected AudioCapture error, got {:?}", other),
        }
    }

    #[test]
    fn test_mock_source_stop_failure() {
        let (producer, _consumer) = frame_queue(4);
        let mut source = MockFrameSource::new().with_stop_failure();

        source.start(producer).expect("start");
        assert!(source.stop().is_err());
        assert!(source.is_started());
    }

    #[test]
    fn test_mock_source_is_finite() {
        let source = MockFrameSource::new();
        assert!(source.is_finite());
    }

    #[test]
    fn test_source_trait_is_object_safe() {
        let (producer, _consumer) = frame_queue(4);
        let mut source: Box<dyn FrameSource> = Box::new(MockFrameSource::new());
        assert!(source.start(producer).is_ok());
        assert!(source.stop().is_ok());
    }
}
