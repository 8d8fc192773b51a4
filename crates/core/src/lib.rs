//! Shared types for the oml client: the Ollama wire records, the display
//! events produced while a response streams in, and the sinks that receive
//! them.

pub mod api;
pub mod error;
pub mod event;
pub mod sink;

pub use error::OmlError;
pub use event::{DecodeMode, DecodeOutcome, DisplayEvent, TaskId, Update, UpdateKind};
pub use sink::{ChannelSink, EventSink, Transcript};
