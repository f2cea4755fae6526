//! Command-line interface for vadpipe
//!
//! Provides argument parsing using clap derive macros.

use crate::config::Config;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Streaming voice-activity segmentation
#[derive(Parser, Debug)]
#[command(
    name = "vadpipe",
    version = crate::version_string(),
    about = "Streaming voice-activity segmentation"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress diagnostic output (protocol lines still go to stdout)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Audio input device (e.g., pipewire)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Read audio from a WAV file instead of the capture device ("-" for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Speech probability threshold, strictly between 0 and 1
    #[arg(long, value_name = "FLOAT")]
    pub threshold: Option<f32>,

    /// Minimum utterance duration in milliseconds for payload emission
    #[arg(long, value_name = "MS")]
    pub min_duration: Option<u32>,

    /// Audio sample rate in Hz
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    #[cfg(feature = "cpal-audio")]
    Devices,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Apply CLI flag overrides on top of a loaded configuration.
///
/// Precedence, lowest to highest: config file, environment variables,
/// command-line flags. Validation runs after all layers are applied.
pub fn apply_overrides(cli: &Cli, mut config: Config) -> Config {
    if let Some(threshold) = cli.threshold {
        config.vad.threshold = threshold;
    }
    if let Some(min_duration) = cli.min_duration {
        config.vad.min_utterance_ms = min_duration;
    }
    if let Some(sample_rate) = cli.sample_rate {
        config.audio.sample_rate = sample_rate;
    }
    if let Some(ref device) = cli.device {
        config.audio.device = Some(device.clone());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args_runs_live() {
        let cli = Cli::parse_from(["vadpipe"]);
        assert!(cli.command.is_none());
        assert!(cli.input.is_none());
        assert!(!cli.quiet);
    }

    #[test]
    fn test_parse_tuning_flags() {
        let cli = Cli::parse_from([
            "vadpipe",
            "--threshold",
            "0.7",
            "--min-duration",
            "400",
            "--sample-rate",
            "8000",
        ]);
        assert_eq!(cli.threshold, Some(0.7));
        assert_eq!(cli.min_duration, Some(400));
        assert_eq!(cli.sample_rate, Some(8000));
    }

    #[test]
    fn test_parse_input_file() {
        let cli = Cli::parse_from(["vadpipe", "--input", "speech.wav"]);
        assert_eq!(cli.input, Some(PathBuf::from("speech.wav")));

        let cli = Cli::parse_from(["vadpipe", "-i", "-"]);
        assert_eq!(cli.input, Some(PathBuf::from("-")));
    }

    #[test]
    fn test_parse_quiet_and_device() {
        let cli = Cli::parse_from(["vadpipe", "--quiet", "--device", "pipewire"]);
        assert!(cli.quiet);
        assert_eq!(cli.device.as_deref(), Some("pipewire"));
    }

    #[cfg(feature = "cpal-audio")]
    #[test]
    fn test_parse_devices_subcommand() {
        let cli = Cli::parse_from(["vadpipe", "devices"]);
        assert!(matches!(cli.command, Some(Commands::Devices)));
    }

    #[test]
    fn test_parse_completions_subcommand() {
        let cli = Cli::parse_from(["vadpipe", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Completions { shell: Shell::Bash })
        ));
    }

    #[test]
    fn test_apply_overrides_take_precedence() {
        let cli = Cli::parse_from([
            "vadpipe",
            "--threshold",
            "0.9",
            "--device",
            "hw:1",
        ]);
        let config = apply_overrides(&cli, Config::default());

        assert_eq!(config.vad.threshold, 0.9);
        assert_eq!(config.audio.device.as_deref(), Some("hw:1"));
        // Untouched values keep their defaults
        assert_eq!(config.vad.min_utterance_ms, 250);
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn test_apply_overrides_without_flags_is_identity() {
        let cli = Cli::parse_from(["vadpipe"]);
        let config = apply_overrides(&cli, Config::default());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
