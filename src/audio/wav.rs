//! WAV file frame source for file and pipe input.

use crate::audio::frame::AudioFrame;
use crate::audio::queue::FrameProducer;
use crate::audio::source::FrameSource;
use crate::defaults;
use crate::error::{Result, VadPipeError};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Finite frame source that reads WAV data.
///
/// Supports arbitrary sample rates and channel counts, resampling to the
/// target rate and mixing to mono. Frames are pushed at real-time pace
/// (one frame per frame period) so that wall-clock utterance durations
/// match what a live capture of the same audio would produce; the producer
/// is dropped at end of file, closing the queue.
pub struct WavFrameSource {
    samples: Vec<f32>,
    sample_rate: u32,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WavFrameSource {
    /// Create from any reader (for testing/flexibility).
    pub fn from_reader(reader: Box<dyn Read + Send>, target_rate: u32) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| VadPipeError::AudioCapture {
                message: format!("Failed to parse WAV data: {}", e),
            })?;

        let spec = wav_reader.spec();
        let source_rate = spec.sample_rate;
        let source_channels = spec.channels as usize;

        // Decode to f32 regardless of on-disk sample format
        let raw_samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => wav_reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / -(i16::MIN as f32)))
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
        }
        .map_err(|e| VadPipeError::AudioCapture {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        // Mix to mono by averaging channels
        let mono_samples: Vec<f32> = if source_channels > 1 {
            raw_samples
                .chunks_exact(source_channels)
                .map(|chunk| chunk.iter().sum::<f32>() / source_channels as f32)
                .collect()
        } else {
            raw_samples
        };

        // Resample to the target rate if needed
        let samples = if source_rate != target_rate {
            resample(&mono_samples, source_rate, target_rate)
        } else {
            mono_samples
        };

        Ok(Self {
            samples,
            sample_rate: target_rate,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        })
    }

    /// Create from a WAV file on disk.
    pub fn from_path(path: &Path, target_rate: u32) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| VadPipeError::AudioCapture {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        Self::from_reader(Box::new(std::io::BufReader::new(file)), target_rate)
    }

    /// Create from stdin.
    pub fn from_stdin(target_rate: u32) -> Result<Self> {
        use std::io::Cursor;

        // Read all data from stdin into memory first (StdinLock is not Send)
        let mut buffer = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .map_err(|e| VadPipeError::AudioCapture {
                message: format!("Failed to read from stdin: {}", e),
            })?;

        Self::from_reader(Box::new(Cursor::new(buffer)), target_rate)
    }

    /// Total audio duration in milliseconds after conversion.
    pub fn duration_ms(&self) -> u64 {
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

impl FrameSource for WavFrameSource {
    fn start(&mut self, producer: FrameProducer) -> Result<()> {
        if self.handle.is_some() {
            return Ok(()); // Already started
        }

        let samples = std::mem::take(&mut self.samples);
        let frame_len = defaults::samples_per_frame(self.sample_rate);
        let period = Duration::from_millis(defaults::FRAME_MS as u64);

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let handle = std::thread::spawn(move || {
            let started = Instant::now();

            for (index, chunk) in samples.chunks(frame_len).enumerate() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if chunk.len() < frame_len {
                    // Trailing partial frame: fixed-size frames only
                    break;
                }

                // Pace against absolute deadlines so sleep jitter doesn't
                // accumulate into drift
                let due = started + period * index as u32;
                let now = Instant::now();
                if due > now {
                    std::thread::sleep(due - now);
                }

                producer.push(AudioFrame::new(
                    chunk.to_vec(),
                    Instant::now(),
                    index as u64,
                ));
            }
            // Producer dropped here: the queue closes once drained.
        });

        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| VadPipeError::AudioCapture {
                    message: "WAV reader thread panicked".to_string(),
                })?;
        }
        Ok(())
    }

    fn is_finite(&self) -> bool {
        true
    }
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx.min(samples.len() - 1)]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::queue::{PopResult, frame_queue};
    use std::io::Cursor;

    fn make_wav_data(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_from_reader_16khz_mono() {
        let input_samples = vec![16384i16; 320];
        let wav_data = make_wav_data(16000, 1, &input_samples);

        let source =
            WavFrameSource::from_reader(Box::new(Cursor::new(wav_data)), 16000).unwrap();

        assert_eq!(source.samples.len(), 320);
        assert!((source.samples[0] - 0.5).abs() < 1e-3);
        assert_eq!(source.duration_ms(), 20);
    }

    #[test]
    fn test_from_reader_mixes_stereo_to_mono() {
        let mut interleaved = Vec::new();
        for _ in 0..160 {
            interleaved.push(8192i16); // left
            interleaved.push(16384i16); // right
        }
        let wav_data = make_wav_data(16000, 2, &interleaved);

        let source =
            WavFrameSource::from_reader(Box::new(Cursor::new(wav_data)), 16000).unwrap();

        assert_eq!(source.samples.len(), 160);
        // Average of 0.25 and 0.5
        assert!((source.samples[0] - 0.375).abs() < 1e-3);
    }

    #[test]
    fn test_from_reader_resamples_to_target() {
        let input_samples = vec![0i16; 480]; // 10ms at 48kHz
        let wav_data = make_wav_data(48000, 1, &input_samples);

        let source =
            WavFrameSource::from_reader(Box::new(Cursor::new(wav_data)), 16000).unwrap();

        assert_eq!(source.samples.len(), 160);
    }

    #[test]
    fn test_from_reader_rejects_garbage() {
        let result =
            WavFrameSource::from_reader(Box::new(Cursor::new(b"not a wav".to_vec())), 16000);
        assert!(matches!(result, Err(VadPipeError::AudioCapture { .. })));
    }

    #[test]
    fn test_source_frames_audio_and_closes_queue() {
        // 3 full frames plus a partial trailing frame that must be dropped
        let input_samples = vec![1000i16; 160 * 3 + 40];
        let wav_data = make_wav_data(16000, 1, &input_samples);
        let mut source =
            WavFrameSource::from_reader(Box::new(Cursor::new(wav_data)), 16000).unwrap();

        let (producer, consumer) = frame_queue(16);
        source.start(producer).expect("start");

        let mut sequences = Vec::new();
        loop {
            match consumer.pop(Duration::from_millis(200)) {
                PopResult::Frame(frame) => {
                    assert_eq!(frame.len(), 160);
                    sequences.push(frame.sequence);
                }
                PopResult::Empty => continue,
                PopResult::Closed => break,
            }
        }
        source.stop().expect("stop");

        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_stop_interrupts_playback() {
        // 2 seconds of audio; stop should return long before that
        let input_samples = vec![0i16; 16000 * 2];
        let wav_data = make_wav_data(16000, 1, &input_samples);
        let mut source =
            WavFrameSource::from_reader(Box::new(Cursor::new(wav_data)), 16000).unwrap();

        let (producer, _consumer) = frame_queue(16);
        source.start(producer).expect("start");

        let started = Instant::now();
        std::thread::sleep(Duration::from_millis(50));
        source.stop().expect("stop");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_resample_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_downsamples_by_ratio() {
        let samples: Vec<f32> = (0..480).map(|i| i as f32 / 480.0).collect();
        let out = resample(&samples, 48000, 16000);
        assert_eq!(out.len(), 160);
        // Linear interpolation preserves a linear ramp
        assert!((out[80] - samples[240]).abs() < 1e-3);
    }

    #[test]
    fn test_resample_upsamples_by_ratio() {
        let samples: Vec<f32> = (0..80).map(|i| i as f32 / 80.0).collect();
        let out = resample(&samples, 8000, 16000);
        assert_eq!(out.len(), 160);
    }
}
