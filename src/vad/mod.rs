//! Voice activity classification and speech segmentation.

pub mod classifier;
pub mod segmenter;

pub use classifier::{Evaluation, ScriptedClassifier, SileroClassifier, SpeechClassifier};
pub use segmenter::{
    Clock, Phase, SegmentEvent, SegmenterConfig, SpeechSegmenter, SystemClock, Utterance,
};
