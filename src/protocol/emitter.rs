//! Line-oriented protocol event output.
//!
//! Three event kinds, one UTF-8 line each, flushed after every line so the
//! downstream reader observes events with minimal delay. Diagnostic text
//! never travels through a sink; it belongs on stderr.

use crate::error::{Result, VadPipeError};
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// A protocol event, one line on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// Utterance boundary opened.
    SpeechStart,
    /// Utterance boundary closed; always paired 1:1 with a prior
    /// `SpeechStart`.
    SpeechEnd,
    /// Base64-encoded little-endian 16-bit PCM payload; emitted zero or
    /// one times between a boundary pair.
    Audio(String),
}

impl fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolEvent::SpeechStart => write!(f, "SPEECH_START"),
            ProtocolEvent::SpeechEnd => write!(f, "SPEECH_END"),
            ProtocolEvent::Audio(payload) => write!(f, "AUDIO:{}", payload),
        }
    }
}

/// Pluggable protocol output handler.
/// Pairs with FrameSource for input - this handles utterance event output.
pub trait EventSink: Send {
    /// Emit one protocol event.
    fn emit(&mut self, event: &ProtocolEvent) -> Result<()>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Sink writing protocol lines to any writer, flushing after each line.
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    /// Create a sink over the given writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for WriterSink<W> {
    fn emit(&mut self, event: &ProtocolEvent) -> Result<()> {
        writeln!(self.writer, "{}", event).map_err(|e| VadPipeError::EventOutput {
            message: e.to_string(),
        })?;
        self.writer.flush().map_err(|e| VadPipeError::EventOutput {
            message: e.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "writer"
    }
}

/// Sink writing protocol lines to stdout.
pub fn stdout_sink() -> WriterSink<io::Stdout> {
    WriterSink::new(io::stdout())
}

/// Sink that collects events in memory for inspection after a run.
#[derive(Debug, Clone, Default)]
pub struct CollectorSink {
    events: Arc<Mutex<Vec<ProtocolEvent>>>,
}

impl CollectorSink {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected events; clones observe the same
    /// storage, so a test can keep one while the pipeline owns the sink.
    pub fn events(&self) -> Arc<Mutex<Vec<ProtocolEvent>>> {
        self.events.clone()
    }

    /// Snapshot of the events collected so far.
    pub fn collected(&self) -> Vec<ProtocolEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for CollectorSink {
    fn emit(&mut self, event: &ProtocolEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| VadPipeError::EventOutput {
                message: "collector mutex poisoned".to_string(),
            })?
            .push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}
