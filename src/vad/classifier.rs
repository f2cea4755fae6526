//! Per-frame speech classification.
//!
//! The classifier is a capability interface owned exclusively by the
//! worker loop: the underlying model carries hidden recurrent state across
//! calls, so it is stateful and single-threaded by contract. It is never
//! shared or pooled across threads.

use crate::audio::frame::AudioFrame;
use crate::error::{Result, VadPipeError};
use voice_activity_detector::VoiceActivityDetector;

/// Per-frame classification result.
///
/// The onset marker fires once when the classifier's internal state
/// crosses from idle into speech; `is_speech` is the authoritative
/// per-frame continuation signal. The segmenter uses the marker only for
/// the idle→speech transition and its own silence-hangover accounting for
/// everything else — the classifier never signals "speech ended"
/// explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// A new speech region began on this frame.
    pub onset: bool,
    /// Raw speech probability for this frame, in [0, 1].
    pub probability: f32,
    /// Whether this frame's probability reached the threshold.
    pub is_speech: bool,
}

impl Evaluation {
    /// A frame scored as speech, optionally opening a new region.
    pub fn speech(onset: bool) -> Self {
        Self {
            onset,
            probability: 0.9,
            is_speech: true,
        }
    }

    /// A frame scored as non-speech.
    pub fn silence() -> Self {
        Self {
            onset: false,
            probability: 0.1,
            is_speech: false,
        }
    }
}

/// Trait for per-frame speech scoring.
pub trait SpeechClassifier: Send {
    /// Classify one frame.
    ///
    /// # Errors
    /// A classifier failure is fatal for the run: the model's hidden state
    /// cannot be safely resumed mid-utterance, so no partial recovery is
    /// attempted.
    fn evaluate(&mut self, frame: &AudioFrame) -> Result<Evaluation>;
}

/// Silero VAD classifier backed by the `voice_activity_detector` ONNX
/// model.
///
/// The probability threshold is fixed at construction. The adapter derives
/// the onset marker from threshold crossings of its own: it re-arms as
/// soon as a frame scores below threshold, which only affects idle-phase
/// sensitivity since re-entrant onsets are ignored while an utterance is
/// open.
pub struct SileroClassifier {
    detector: VoiceActivityDetector,
    threshold: f32,
    in_speech: bool,
}

impl SileroClassifier {
    /// Create a classifier for the given threshold and sample rate.
    ///
    /// # Errors
    /// Returns `VadPipeError::Classifier` if the model cannot be loaded or
    /// the sample rate is not supported by it (Silero supports 8kHz and
    /// 16kHz).
    pub fn new(threshold: f32, sample_rate: u32) -> Result<Self> {
        // The model consumes fixed windows of sample_rate/31.25 samples;
        // shorter frames are zero-padded by the detector.
        let chunk_size = (sample_rate as usize) * 32 / 1000;
        let detector = VoiceActivityDetector::builder()
            .sample_rate(sample_rate)
            .chunk_size(chunk_size)
            .build()
            .map_err(|e| VadPipeError::Classifier {
                message: format!("Failed to create VAD detector: {}", e),
            })?;

        Ok(Self {
            detector,
            threshold,
            in_speech: false,
        })
    }

    /// The configured probability threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl SpeechClassifier for SileroClassifier {
    fn evaluate(&mut self, frame: &AudioFrame) -> Result<Evaluation> {
        let probability = self.detector.predict(frame.samples.iter().copied());
        let is_speech = probability >= self.threshold;
        let onset = is_speech && !self.in_speech;
        self.in_speech = is_speech;

        Ok(Evaluation {
            onset,
            probability,
            is_speech,
        })
    }
}

/// Scripted classifier for testing.
///
/// Replays a fixed sequence of evaluations, then returns silence once the
/// script is exhausted. Can be configured to fail after a number of
/// frames to exercise the fatal-error path.
#[derive(Debug, Clone, Default)]
pub struct ScriptedClassifier {
    script: std::collections::VecDeque<Evaluation>,
    fail_after: Option<usize>,
    evaluated: usize,
}

impl ScriptedClassifier {
    /// Create a classifier replaying `script` in order.
    pub fn new(script: impl IntoIterator<Item = Evaluation>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fail_after: None,
            evaluated: 0,
        }
    }

    /// Configure the classifier to fail on the Nth evaluation (0-based).
    pub fn with_failure_at(mut self, frame_index: usize) -> Self {
        self.fail_after = Some(frame_index);
        self
    }

    /// Number of frames evaluated so far.
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }
}

impl SpeechClassifier for ScriptedClassifier {
    fn evaluate(&mut self, _frame: &AudioFrame) -> Result<Evaluation> {
        if self.fail_after == Some(self.evaluated) {
            return Err(VadPipeError::Classifier {
                message: "scripted failure".to_string(),
            });
        }
        self.evaluated += 1;
        Ok(self.script.pop_front().unwrap_or_else(Evaluation::silence))
    }
}

/// Builds the common "silence, speech, silence" scripts used in tests.
///
/// The first speech frame carries the onset marker; later speech frames
/// only carry `is_speech`, matching the classifier contract.
pub fn utterance_script(
    leading_silence: usize,
    speech: usize,
    trailing_silence: usize,
) -> Vec<Evaluation> {
    let mut script = Vec::with_capacity(leading_silence + speech + trailing_silence);
    script.extend(std::iter::repeat_n(Evaluation::silence(), leading_silence));
    for i in 0..speech {
        script.push(Evaluation::speech(i == 0));
    }
    script.extend(std::iter::repeat_n(Evaluation::silence(), trailing_silence));
    script
}
