//! Composition root: wires config, source, classifier, and sink into a
//! running pipeline and manages its lifecycle.

use crate::audio::source::FrameSource;
use crate::audio::wav::WavFrameSource;
use crate::config::Config;
use crate::defaults;
use crate::error::{Result, VadPipeError};
use crate::pipeline::{Pipeline, PipelineConfig, PipelineStats};
use crate::protocol::emitter::stdout_sink;
use crate::vad::classifier::SileroClassifier;
use crate::vad::segmenter::SegmenterConfig;
use std::path::Path;

/// Run the segmentation pipeline until the input ends or Ctrl+C.
///
/// Protocol lines go to stdout; everything else (lifecycle notices, the
/// shutdown summary, device errors) goes to stderr so the two streams
/// never interleave.
///
/// # Arguments
/// * `config` - Validated-on-entry run configuration
/// * `input` - Optional WAV file path ("-" for stdin); live capture
///   otherwise
/// * `quiet` - Suppress stderr diagnostics
///
/// # Errors
/// Startup failures (invalid config, unavailable device, unreadable
/// input, model load) and fatal run failures (classifier, event output)
/// propagate to the caller for a non-zero exit.
pub async fn run_stream(config: Config, input: Option<&Path>, quiet: bool) -> Result<()> {
    config.validate()?;

    let sample_rate = config.audio.sample_rate;
    let source = make_source(&config, input)?;
    let finite = source.is_finite();

    let classifier = SileroClassifier::new(config.vad.threshold, sample_rate)?;

    let pipeline = Pipeline::new(PipelineConfig {
        segmenter: SegmenterConfig {
            min_utterance_ms: config.vad.min_utterance_ms,
            silence_hangover_frames: defaults::SILENCE_HANGOVER_FRAMES,
        },
        ..Default::default()
    });

    let handle = pipeline.start(source, Box::new(classifier), Box::new(stdout_sink()))?;

    if !quiet {
        eprintln!("Recording started");
    }

    let stats = if finite {
        // File input ends on its own; joining the worker is blocking.
        tokio::task::spawn_blocking(move || handle.wait())
            .await
            .map_err(|e| VadPipeError::Other(format!("worker task failed: {}", e)))??
    } else {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| VadPipeError::Other(format!("Failed to wait for Ctrl+C: {}", e)))?;

        if !quiet {
            eprintln!("\nShutting down...");
        }
        handle.stop()?
    };

    if !quiet {
        eprintln!("Recording stopped");
        report_stats(&stats);
    }

    Ok(())
}

/// Select the frame source: WAV file, stdin, or the live capture device.
fn make_source(config: &Config, input: Option<&Path>) -> Result<Box<dyn FrameSource>> {
    let sample_rate = config.audio.sample_rate;

    match input {
        Some(path) if path == Path::new("-") => {
            Ok(Box::new(WavFrameSource::from_stdin(sample_rate)?))
        }
        Some(path) => Ok(Box::new(WavFrameSource::from_path(path, sample_rate)?)),
        None => make_live_source(config),
    }
}

#[cfg(feature = "cpal-audio")]
fn make_live_source(config: &Config) -> Result<Box<dyn FrameSource>> {
    use crate::audio::capture::{CpalFrameSource, suppress_audio_warnings};

    suppress_audio_warnings();
    Ok(Box::new(CpalFrameSource::new(
        config.audio.device.as_deref(),
        config.audio.sample_rate,
    )?))
}

#[cfg(not(feature = "cpal-audio"))]
fn make_live_source(_config: &Config) -> Result<Box<dyn FrameSource>> {
    Err(VadPipeError::Other(
        "built without the cpal-audio feature; use --input to read WAV data".to_string(),
    ))
}

/// Print the shutdown summary to the diagnostic stream.
fn report_stats(stats: &PipelineStats) {
    eprintln!(
        "Processed {} frames ({} dropped), {} utterances emitted, {} discarded",
        stats.frames_processed,
        stats.frames_dropped,
        stats.utterances_emitted,
        stats.utterances_discarded,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VadConfig;

    #[tokio::test]
    async fn test_invalid_config_fails_fast() {
        let config = Config {
            vad: VadConfig {
                threshold: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };

        let result = run_stream(config, None, true).await;
        assert!(matches!(
            result,
            Err(VadPipeError::ConfigInvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_input_file_fails_fast() {
        let config = Config::default();
        let result = run_stream(config, Some(Path::new("/nonexistent/audio.wav")), true).await;
        assert!(matches!(result, Err(VadPipeError::AudioCapture { .. })));
    }
}
