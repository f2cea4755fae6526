//! Utterance payload encoding and the line-based event protocol.

pub mod emitter;
pub mod encoder;

pub use emitter::{CollectorSink, EventSink, ProtocolEvent, WriterSink, stdout_sink};
pub use encoder::{encode, pcm_bytes, sample_to_i16};
