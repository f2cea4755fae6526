//! vadpipe - Streaming voice-activity segmentation
//!
//! Splits a live audio stream into discrete speech utterances and emits a
//! line-based event protocol (`SPEECH_START` / `SPEECH_END` /
//! `AUDIO:<base64>`) for a downstream consumer.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod vad;

// Core traits (source → classify → emit)
pub use audio::source::FrameSource;
pub use protocol::emitter::EventSink;
pub use vad::classifier::SpeechClassifier;

// Pipeline
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle, PipelineStats};

// Error handling
pub use error::{Result, VadPipeError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.0.1+abc1234"` when git hash is available, `"0.0.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
