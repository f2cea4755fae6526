//! Pipeline orchestration: capture → queue → segmenter → encoder → sink.
//!
//! Two concurrent activities: the source's real-time delivery path, which
//! only copies frames and pushes them into the bounded queue, and a single
//! worker thread that classifies, segments, encodes, and emits. All
//! decision-making is confined to the worker, so the stateful classifier
//! needs no locking — there is only one writer to segmenter state.

use crate::audio::queue::{PopResult, frame_queue};
use crate::audio::source::FrameSource;
use crate::defaults;
use crate::error::{Result, VadPipeError};
use crate::protocol::emitter::{EventSink, ProtocolEvent};
use crate::protocol::encoder::encode;
use crate::vad::classifier::SpeechClassifier;
use crate::vad::segmenter::{SegmentEvent, SegmenterConfig, SpeechSegmenter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the segmentation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Segmentation policy (hangover, minimum duration).
    pub segmenter: SegmenterConfig,
    /// Capacity of the capture-to-worker frame queue.
    pub queue_capacity: usize,
    /// Timeout for the worker's blocking pop; bounds how long shutdown
    /// waits for the running flag to be noticed.
    pub pop_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            queue_capacity: defaults::FRAME_QUEUE_CAPACITY,
            pop_timeout: defaults::POP_TIMEOUT,
        }
    }
}

/// Counters reported when a pipeline run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames dequeued and classified.
    pub frames_processed: u64,
    /// Frames dropped at the queue under overload.
    pub frames_dropped: u64,
    /// Utterances that met the duration filter and produced a payload.
    pub utterances_emitted: u64,
    /// Utterances closed without a payload (below minimum duration).
    pub utterances_discarded: u64,
}

/// Handle to a running pipeline.
pub struct PipelineHandle {
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<PipelineStats>>>,
    source: Box<dyn FrameSource>,
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl PipelineHandle {
    /// Stops the pipeline: signals shutdown, force-closes any open
    /// utterance, joins the worker, and stops the source.
    pub fn stop(mut self) -> Result<PipelineStats> {
        self.running.store(false, Ordering::SeqCst);
        self.join_worker()
    }

    /// Waits for the pipeline to end on its own. Only finite sources end;
    /// for live capture use `stop`.
    pub fn wait(mut self) -> Result<PipelineStats> {
        self.join_worker()
    }

    /// Returns true until shutdown has been signalled.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn join_worker(&mut self) -> Result<PipelineStats> {
        let worker_result = match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| VadPipeError::Other("worker thread panicked".to_string()))?,
            None => Ok(PipelineStats::default()),
        };
        // Stop the source even when the worker failed, then surface the
        // worker's error first: it is the root cause.
        let stop_result = self.source.stop();
        let stats = worker_result?;
        stop_result?;
        Ok(stats)
    }
}

/// The segmentation pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a pipeline with the given configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Starts the pipeline.
    ///
    /// The worker thread is spawned before the source starts so no early
    /// frame waits on a consumer.
    ///
    /// # Arguments
    /// * `source` - Frame source (live capture or file)
    /// * `classifier` - Per-frame speech classifier
    /// * `sink` - Protocol event output
    ///
    /// # Returns
    /// Handle to control and stop the pipeline.
    ///
    /// # Errors
    /// Returns an error if the source fails to start; this is an
    /// unrecoverable startup failure and the worker is torn down again.
    pub fn start(
        self,
        mut source: Box<dyn FrameSource>,
        classifier: Box<dyn SpeechClassifier>,
        sink: Box<dyn EventSink>,
    ) -> Result<PipelineHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let (producer, consumer) = frame_queue(self.config.queue_capacity);

        let segmenter = SpeechSegmenter::new(classifier, self.config.segmenter);
        let pop_timeout = self.config.pop_timeout;

        let worker_running = running.clone();
        let worker = thread::spawn(move || {
            run_worker(worker_running, consumer, segmenter, sink, pop_timeout)
        });

        if let Err(e) = source.start(producer) {
            running.store(false, Ordering::SeqCst);
            let _joined = worker.join();
            return Err(e);
        }

        Ok(PipelineHandle {
            running,
            worker: Some(worker),
            source,
        })
    }
}

/// Worker loop: strict FIFO, one frame at a time, typed error handling.
///
/// A pop timeout is a normal retry that re-checks the running flag; a
/// classifier or sink failure is fatal and propagates. The force-close
/// path runs on every exit so no in-progress utterance is lost and every
/// `SPEECH_START` gets its `SPEECH_END`.
fn run_worker(
    running: Arc<AtomicBool>,
    consumer: crate::audio::queue::FrameConsumer,
    mut segmenter: SpeechSegmenter,
    mut sink: Box<dyn EventSink>,
    pop_timeout: Duration,
) -> Result<PipelineStats> {
    let mut stats = PipelineStats::default();

    let run_result: Result<()> = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(());
        }

        match consumer.pop(pop_timeout) {
            PopResult::Frame(frame) => {
                stats.frames_processed += 1;
                let events = match segmenter.process(frame) {
                    Ok(events) => events,
                    Err(e) => break Err(e),
                };
                if let Err(e) = emit_events(sink.as_mut(), events, &mut stats) {
                    break Err(e);
                }
            }
            PopResult::Empty => continue,
            PopResult::Closed => break Ok(()),
        }
    };

    // Force-close any open utterance with the same closing logic as the
    // hangover path. On a fatal error this is best-effort: the protocol
    // stays well-formed when the sink is still alive.
    let close_result = match segmenter.finish() {
        Some(event) => emit_events(sink.as_mut(), vec![event], &mut stats),
        None => Ok(()),
    };

    stats.frames_dropped = consumer.dropped();

    run_result?;
    close_result?;
    Ok(stats)
}

/// Maps segmenter events onto protocol lines. The payload, when present,
/// is emitted between the boundary pair.
fn emit_events(
    sink: &mut dyn EventSink,
    events: Vec<SegmentEvent>,
    stats: &mut PipelineStats,
) -> Result<()> {
    for event in events {
        match event {
            SegmentEvent::SpeechStart => {
                sink.emit(&ProtocolEvent::SpeechStart)?;
            }
            SegmentEvent::SpeechEnd { utterance } => {
                match utterance {
                    Some(utterance) => {
                        sink.emit(&ProtocolEvent::Audio(encode(&utterance.frames)))?;
                        stats.utterances_emitted += 1;
                    }
                    None => {
                        stats.utterances_discarded += 1;
                    }
                }
                sink.emit(&ProtocolEvent::SpeechEnd)?;
            }
        }
    }
    Ok(())
}
