//! Real audio capture using CPAL (Cross-Platform Audio Library).
//!
//! The capture callback runs on the audio backend's real-time thread. Its
//! only responsibilities are copying the delivered samples, chopping them
//! into fixed frames, and attempting a non-blocking push into the frame
//! queue. No inference, no blocking, no unbounded allocation.

use crate::audio::frame::Framer;
use crate::audio::queue::FrameProducer;
use crate::audio::source::FrameSource;
use crate::audio::wav::resample;
use crate::defaults;
use crate::error::{Result, VadPipeError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to
/// users, and on this program they would land next to real diagnostics.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2
/// (stderr). Safe as long as no other thread is concurrently manipulating
/// fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Suppress noisy JACK/ALSA error messages that occur during audio backend
/// probing.
///
/// # Safety
/// This modifies environment variables which is safe when called before
/// spawning threads.
pub fn suppress_audio_warnings() {
    // SAFETY: Called at startup before any threads are spawned
    unsafe {
        // Suppress JACK "cannot connect" messages - don't try to start JACK server
        std::env::set_var("JACK_NO_START_SERVER", "1");
        // Disable JACK completely for CPAL probing
        std::env::set_var("JACK_NO_AUDIO_RESERVATION", "1");
        // Force PipeWire to not print debug messages
        std::env::set_var("PIPEWIRE_DEBUG", "0");
        // Suppress ALSA verbose messages
        std::env::set_var("ALSA_DEBUG", "0");
        // Tell PipeWire's JACK to be quiet
        std::env::set_var("PW_LOG", "0");
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice input).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Check if a device name should be filtered out.
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// List all available audio input devices with filtering and
/// recommendations.
///
/// # Returns
/// A vector of device names, with preferred devices marked with
/// "\[recommended\]". Filters out obviously unusable devices (surround
/// channels, HDMI, etc.).
///
/// # Errors
/// Returns `VadPipeError::AudioCapture` if device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| VadPipeError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }

            if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Get the best default input device, preferring PipeWire/PulseAudio.
///
/// This ensures we respect the desktop's audio device selection.
///
/// # Errors
/// Returns `VadPipeError::AudioDeviceNotFound` if no input device is
/// available.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.input_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_input_device()
            .ok_or_else(|| VadPipeError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only ever touched from the thread that owns the
/// source; `FrameSource` takes `&mut self`, so access is exclusive.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Live audio capture implementation using CPAL.
///
/// Captures mono floating-point audio at the configured rate, frames it,
/// and pushes frames into the queue from the backend callback. Tries the
/// preferred format first (f32/mono at the target rate), then an i16
/// variant, then falls back to the device's native config with software
/// conversion (channel mixing + resampling).
pub struct CpalFrameSource {
    device: cpal::Device,
    stream: Option<SendableStream>,
    callback_count: Arc<AtomicU64>,
    sample_rate: u32,
}

impl CpalFrameSource {
    /// Create a new CPAL frame source.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best
    ///   default input device.
    /// * `sample_rate` - Target capture rate in Hz.
    ///
    /// # Errors
    /// Returns errors if the device is not found or enumeration fails.
    pub fn new(device_name: Option<&str>, sample_rate: u32) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host
                    .input_devices()
                    .map_err(|e| VadPipeError::AudioCapture {
                        message: format!("Failed to enumerate devices: {}", e),
                    })?;

                let mut found_device = None;
                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        found_device = Some(dev);
                        break;
                    }
                }

                found_device.ok_or_else(|| VadPipeError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                get_best_default_device()
            }
        })?;

        Ok(Self {
            device,
            stream: None,
            callback_count: Arc::new(AtomicU64::new(0)),
            sample_rate,
        })
    }

    /// Build the audio stream with the configured format.
    ///
    /// Tries in order:
    /// 1. f32/target-rate/mono — preferred, samples used as-is
    /// 2. i16/target-rate/mono — converted to f32 in the callback
    /// 3. Device default config — native rate/channels with software
    ///    conversion
    ///
    /// Step 3 handles PipeWire setups where the ALSA compatibility layer
    /// accepts non-native configs but never fires the data callback.
    fn build_stream(&self, producer: &FrameProducer) -> Result<cpal::Stream> {
        let preferred_config = cpal::StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            // Delivery errors are diagnostics; the affected period is
            // simply not enqueued.
            eprintln!("Audio stream error: {}", err);
        };

        let frame_len = defaults::samples_per_frame(self.sample_rate);

        // Try f32/target/mono — works with PipeWire/PulseAudio which
        // convert transparently
        let tx = producer.clone();
        let counter = Arc::clone(&self.callback_count);
        let mut framer = Framer::new(frame_len);
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                let now = Instant::now();
                framer.push(data, now, |frame| {
                    tx.push(frame);
                });
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Try i16/target/mono — for devices that only expose integer formats
        let tx = producer.clone();
        let counter = Arc::clone(&self.callback_count);
        let mut framer = Framer::new(frame_len);
        let mut scratch: Vec<f32> = Vec::new();
        if let Ok(stream) = self.device.build_input_stream(
            &preferred_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                counter.fetch_add(1, Ordering::Relaxed);
                let now = Instant::now();
                scratch.clear();
                scratch.extend(data.iter().map(|&s| s as f32 / -(i16::MIN as f32)));
                framer.push(&scratch, now, |frame| {
                    tx.push(frame);
                });
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        // Fallback: capture at device's native config, convert in software.
        self.build_stream_native(producer)
    }

    /// Build a stream using the device's default/native config, with
    /// software channel mixing (stereo→mono) and resampling (native
    /// rate→target rate).
    fn build_stream_native(&self, producer: &FrameProducer) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| VadPipeError::AudioCapture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate().0;
        let native_channels = default_config.channels() as usize;
        let target_rate = self.sample_rate;
        let frame_len = defaults::samples_per_frame(target_rate);

        let stream_config: cpal::StreamConfig = default_config.clone().into();

        eprintln!(
            "vadpipe: using native audio format ({}ch/{}Hz/{:?}), converting in software",
            native_channels,
            native_rate,
            default_config.sample_format(),
        );

        let err_callback = |err| {
            eprintln!("Audio stream error: {}", err);
        };

        match default_config.sample_format() {
            SampleFormat::F32 => {
                let tx = producer.clone();
                let counter = Arc::clone(&self.callback_count);
                let mut framer = Framer::new(frame_len);
                self.device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            counter.fetch_add(1, Ordering::Relaxed);
                            let now = Instant::now();
                            let converted =
                                convert_to_mono_target(data, native_channels, native_rate, target_rate);
                            framer.push(&converted, now, |frame| {
                                tx.push(frame);
                            });
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| VadPipeError::AudioCapture {
                        message: format!("Failed to build native f32 stream: {}", e),
                    })
            }
            SampleFormat::I16 => {
                let tx = producer.clone();
                let counter = Arc::clone(&self.callback_count);
                let mut framer = Framer::new(frame_len);
                self.device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[i16], _: &cpal::InputCallbackInfo| {
                            counter.fetch_add(1, Ordering::Relaxed);
                            let now = Instant::now();
                            let float_data: Vec<f32> =
                                data.iter().map(|&s| s as f32 / -(i16::MIN as f32)).collect();
                            let converted = convert_to_mono_target(
                                &float_data,
                                native_channels,
                                native_rate,
                                target_rate,
                            );
                            framer.push(&converted, now, |frame| {
                                tx.push(frame);
                            });
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| VadPipeError::AudioCapture {
                        message: format!("Failed to build native i16 stream: {}", e),
                    })
            }
            fmt => Err(VadPipeError::AudioCapture {
                message: format!(
                    "Unsupported native sample format: {:?}. \
                     Try specifying a device with --device.",
                    fmt
                ),
            }),
        }
    }
}

/// Mix multi-channel audio to mono and resample to the target rate.
fn convert_to_mono_target(
    samples: &[f32],
    channels: usize,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    // Mix to mono by averaging channels
    let mono: Vec<f32> = if channels == 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    // Resample if needed
    if source_rate == target_rate {
        mono
    } else {
        resample(&mono, source_rate, target_rate)
    }
}

impl FrameSource for CpalFrameSource {
    fn start(&mut self, producer: FrameProducer) -> Result<()> {
        if self.stream.is_some() {
            return Ok(()); // Already started
        }

        let stream = self.build_stream(&producer)?;
        stream.play().map_err(|e| VadPipeError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        // Wait briefly to check if the CPAL callback actually fires.
        // Some PipeWire-ALSA setups accept non-native configs but never
        // deliver data.
        std::thread::sleep(std::time::Duration::from_millis(200));

        let final_stream = if self.callback_count.load(Ordering::Relaxed) == 0 {
            // Preferred config didn't deliver data — stop it, try native.
            // No frames were pushed, so the queue is still untouched.
            drop(stream);

            let native_stream = self.build_stream_native(&producer)?;
            native_stream
                .play()
                .map_err(|e| VadPipeError::AudioCapture {
                    message: format!("Failed to start native audio stream: {}", e),
                })?;
            native_stream
        } else {
            stream
        };

        self.stream = Some(SendableStream(final_stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(sendable_stream) = self.stream.take() {
            sendable_stream
                .0
                .pause()
                .map_err(|e| VadPipeError::AudioCapture {
                    message: format!("Failed to stop audio stream: {}", e),
                })?;
        }
        Ok(())
    }
}
