//! Bounded hand-off queue between the capture callback and the worker loop.
//!
//! The producer side is wait-free: the capture path runs on a real-time
//! audio thread and must never block. When the queue is full the incoming
//! frame is dropped and counted; the consumer can read the counter for
//! observability. The consumer side polls with a timeout so its running
//! flag is re-checked promptly.

use crate::audio::frame::AudioFrame;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Creates a bounded frame queue, returning its producer and consumer ends.
pub fn frame_queue(capacity: usize) -> (FrameProducer, FrameConsumer) {
    let (tx, rx) = bounded(capacity);
    let dropped = Arc::new(AtomicU64::new(0));
    (
        FrameProducer {
            tx,
            dropped: dropped.clone(),
        },
        FrameConsumer { rx, dropped },
    )
}

/// Producer end: non-blocking push with drop-newest overflow policy.
///
/// Cloning is allowed so a capture backend can rebuild its stream, but the
/// queue is used single-producer/single-consumer by design.
#[derive(Debug, Clone)]
pub struct FrameProducer {
    tx: Sender<AudioFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameProducer {
    /// Attempts to enqueue a frame without blocking.
    ///
    /// Returns `true` if the frame was enqueued. On a full queue the frame
    /// is dropped (the incoming one, never a queued one) and the drop
    /// counter is incremented. A disconnected consumer also counts as a
    /// drop; the capture side keeps running until it is stopped.
    pub fn push(&self, frame: AudioFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Number of frames dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Result of a timed pop from the consumer end.
#[derive(Debug)]
pub enum PopResult {
    /// A frame was dequeued.
    Frame(AudioFrame),
    /// Timeout elapsed with no frame available. Not an error: the consumer
    /// re-polls its running flag and tries again.
    Empty,
    /// All producers are gone and the queue is drained; end of stream.
    Closed,
}

/// Consumer end: blocking pop with timeout.
#[derive(Debug)]
pub struct FrameConsumer {
    rx: Receiver<AudioFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameConsumer {
    /// Waits up to `timeout` for a frame.
    pub fn pop(&self, timeout: Duration) -> PopResult {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => PopResult::Frame(frame),
            Err(RecvTimeoutError::Timeout) => PopResult::Empty,
            Err(RecvTimeoutError::Disconnected) => PopResult::Closed,
        }
    }

    /// Number of frames the producer side has dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
