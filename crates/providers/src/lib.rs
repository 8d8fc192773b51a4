//! HTTP side of the oml client: talking to an Ollama server and turning its
//! streamed responses into display events.

pub mod ollama;
pub mod session;

pub use session::{Session, TaskHandle};
