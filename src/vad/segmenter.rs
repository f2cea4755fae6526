//! Speech segmentation state machine.
//!
//! Consumes classifier decisions frame by frame, applies silence-hangover
//! hysteresis and minimum-duration filtering, and accumulates contiguous
//! speech into utterances. Exactly one instance runs per pipeline, mutated
//! only by the worker thread.

use crate::audio::frame::AudioFrame;
use crate::defaults;
use crate::error::Result;
use crate::vad::classifier::SpeechClassifier;
use std::time::{Duration, Instant};

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Segmentation policy.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// Minimum utterance duration for a payload to be emitted
    /// (milliseconds). Measured in wall-clock time since speech onset, not
    /// sample count, so it is robust to frame drops at the queue.
    pub min_utterance_ms: u32,
    /// Consecutive non-speech frames tolerated inside an open utterance
    /// before it is closed.
    pub silence_hangover_frames: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_utterance_ms: defaults::MIN_UTTERANCE_MS,
            silence_hangover_frames: defaults::SILENCE_HANGOVER_FRAMES,
        }
    }
}

/// Current segmentation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No utterance open.
    Idle,
    /// An utterance is accumulating.
    Speech,
}

/// A completed utterance: contiguous speech bounded by silence.
///
/// Created on the speech→idle transition and consumed immediately by the
/// encoder; never persisted.
#[derive(Debug, Clone)]
pub struct Utterance {
    /// When speech onset was observed.
    pub started_at: Instant,
    /// Wall-clock duration from onset to close.
    pub duration: Duration,
    /// Accumulated frames, in arrival order, trailing silence included.
    pub frames: Vec<AudioFrame>,
}

impl Utterance {
    /// Total number of samples across all frames.
    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(|f| f.len()).sum()
    }
}

/// Events produced by the segmenter.
#[derive(Debug)]
pub enum SegmentEvent {
    /// An utterance boundary opened.
    SpeechStart,
    /// An utterance boundary closed. The payload is present only when the
    /// utterance met the minimum duration; boundary events themselves are
    /// unconditional.
    SpeechEnd { utterance: Option<Utterance> },
}

/// The speech segmentation state machine.
///
/// Owns the classifier: all decision-making happens inline on the single
/// worker thread, which is what makes the classifier's hidden state safe
/// without locking.
pub struct SpeechSegmenter<C: Clock = SystemClock> {
    config: SegmenterConfig,
    classifier: Box<dyn SpeechClassifier>,
    phase: Phase,
    speech_start: Option<Instant>,
    frames: Vec<AudioFrame>,
    silence_run: u32,
    clock: C,
}

impl<C: Clock> SpeechSegmenter<C> {
    /// Creates a segmenter with an injectable clock.
    pub fn with_clock(
        classifier: Box<dyn SpeechClassifier>,
        config: SegmenterConfig,
        clock: C,
    ) -> Self {
        Self {
            config,
            classifier,
            phase: Phase::Idle,
            speech_start: None,
            frames: Vec::new(),
            silence_run: 0,
            clock,
        }
    }

    /// Processes one dequeued frame, returning zero or more events.
    ///
    /// Frames are consumed in strict arrival order; the segmenter never
    /// reorders or skips a frame it was handed.
    ///
    /// # Errors
    /// Propagates classifier failures, which are fatal for the run.
    pub fn process(&mut self, frame: AudioFrame) -> Result<Vec<SegmentEvent>> {
        let eval = self.classifier.evaluate(&frame)?;
        let mut events = Vec::new();

        // Onset opens an utterance only from Idle; re-entrant onsets while
        // speech is open must not reset the accumulated buffer.
        if eval.onset && self.phase == Phase::Idle {
            self.phase = Phase::Speech;
            self.speech_start = Some(self.clock.now());
            self.frames.clear();
            self.silence_run = 0;
            events.push(SegmentEvent::SpeechStart);
        }

        if eval.is_speech {
            // Only an open utterance accumulates; a speech-scored frame
            // with no preceding onset has no utterance to belong to.
            if self.phase == Phase::Speech {
                self.frames.push(frame);
                self.silence_run = 0;
            }
        } else if self.phase == Phase::Speech {
            // Trailing silence is retained as part of the utterance,
            // matching natural speech tapering.
            self.silence_run += 1;
            self.frames.push(frame);

            if self.silence_run > self.config.silence_hangover_frames {
                events.push(self.close());
            }
        }

        Ok(events)
    }

    /// Force-closes any open utterance, using the same closing logic as
    /// the silence-hangover path. Called on pipeline stop so no
    /// in-progress utterance is silently lost.
    pub fn finish(&mut self) -> Option<SegmentEvent> {
        if self.phase == Phase::Speech {
            Some(self.close())
        } else {
            None
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Closes the open utterance: the boundary event is unconditional, the
    /// payload depends on the duration filter. Buffer and silence counter
    /// reset regardless of outcome.
    fn close(&mut self) -> SegmentEvent {
        let now = self.clock.now();
        let started_at = self.speech_start.take().unwrap_or(now);
        let duration = now.duration_since(started_at);
        let frames = std::mem::take(&mut self.frames);
        self.silence_run = 0;
        self.phase = Phase::Idle;

        let utterance = if duration.as_millis() >= self.config.min_utterance_ms as u128
            && !frames.is_empty()
        {
            Some(Utterance {
                started_at,
                duration,
                frames,
            })
        } else {
            None
        };

        SegmentEvent::SpeechEnd { utterance }
    }
}

impl SpeechSegmenter<SystemClock> {
    /// Creates a segmenter using the system clock.
    pub fn new(classifier: Box<dyn SpeechClassifier>, config: SegmenterConfig) -> Self {
        Self::with_clock(classifier, config, SystemClock)
    }
}
