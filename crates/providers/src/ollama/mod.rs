pub mod client;
pub mod config;
pub mod decoder;

pub use client::{ByteStream, OllamaClient, Reply};
pub use config::OllamaConfig;
pub use decoder::{classify_line, decode, Decoder};
