//! Audio capture, framing, and the capture-to-worker hand-off queue.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod frame;
pub mod queue;
pub mod source;
pub mod wav;

pub use frame::{AudioFrame, Framer};
pub use queue::{FrameConsumer, FrameProducer, PopResult, frame_queue};
pub use source::{FrameSource, MockFrameSource};
pub use wav::WavFrameSource;
