//! NDJSON response decoding.
//!
//! Ollama answers `/api/chat` and `/api/pull` with one JSON object per line:
//! ```text
//! {"model":"gemma","created_at":"2024-02-10T18:20:01Z","message":{"role":"assistant","content":"Hel"},"done":false}
//! {"model":"gemma","created_at":"2024-02-10T18:20:01Z","message":{"role":"assistant","content":"lo"},"done":false}
//! {"error":"model 'gemma' not found, try pulling it first"}
//! ```
//! Each line is classified on its own and turned into at most one
//! [`DisplayEvent`]. An error record ends the stream; a line that fails to
//! decode is skipped.

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use oml_core::api::{ApiErrorRecord, ApiMessageRecord};
use oml_core::{DecodeMode, DecodeOutcome, DisplayEvent, EventSink, OmlError};
use tracing::{debug, trace};

use super::config::DEFAULT_MAX_LINE_BYTES;

/// Splits a byte stream into lines, buffering partial lines across chunks.
///
/// Splitting happens on raw bytes, so a UTF-8 sequence cut by a chunk
/// boundary is reassembled before conversion. Blank lines are dropped and a
/// trailing `\r` is removed.
#[derive(Debug)]
pub struct LineSplitter {
    buf: BytesMut,
    // Bytes of `buf` already known to contain no newline.
    scanned: usize,
    max_line_bytes: usize,
}

impl LineSplitter {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            scanned: 0,
            max_line_bytes,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Next complete non-blank line, or `None` until more bytes arrive.
    pub fn next_line(&mut self) -> Result<Option<String>, OmlError> {
        loop {
            let Some(pos) = twoway::find_bytes(&self.buf[self.scanned..], b"\n")
                .map(|p| p + self.scanned)
            else {
                self.scanned = self.buf.len();
                if self.buf.len() > self.max_line_bytes {
                    return Err(OmlError::LineTooLong {
                        limit: self.max_line_bytes,
                    });
                }
                return Ok(None);
            };
            let raw = self.buf.split_to(pos + 1);
            self.scanned = 0;
            if pos > self.max_line_bytes {
                return Err(OmlError::LineTooLong {
                    limit: self.max_line_bytes,
                });
            }
            if let Some(line) = to_line(&raw[..pos]) {
                return Ok(Some(line));
            }
        }
    }

    /// Whatever is left once the stream ends, as a final unterminated line.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.buf.split();
        self.scanned = 0;
        to_line(&rest)
    }
}

fn to_line(raw: &[u8]) -> Option<String> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let s = String::from_utf8_lossy(raw);
    if s.trim().is_empty() {
        None
    } else {
        Some(s.into_owned())
    }
}

/// Turn a response body into a stream of lines. A failed chunk ends the
/// stream with [`OmlError::Read`].
pub fn ndjson_lines<S, E>(
    byte_stream: S,
    max_line_bytes: usize,
) -> impl Stream<Item = Result<String, OmlError>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    async_stream::stream! {
        let mut byte_stream = std::pin::pin!(byte_stream);
        let mut lines = LineSplitter::new(max_line_bytes);

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(b) => lines.push(&b),
                Err(e) => {
                    yield Err(OmlError::Read(e.to_string()));
                    return;
                }
            }
            loop {
                match lines.next_line() {
                    Ok(Some(line)) => yield Ok(line),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if let Some(line) = lines.finish() {
            yield Ok(line);
        }
    }
}

/// Map one line to the event it produces, if any.
///
/// Error records win in both modes. In chat mode only non-empty
/// assistant content is shown; in raw mode the line itself is shown,
/// terminated by a newline.
pub fn classify_line(line: &str, mode: DecodeMode) -> Option<DisplayEvent> {
    if let Some(error) = ApiErrorRecord::from_line(line) {
        return Some(DisplayEvent::Error(error));
    }
    match mode {
        DecodeMode::Raw => Some(DisplayEvent::Append(format!("{}\n", line))),
        DecodeMode::Chat => match serde_json::from_str::<ApiMessageRecord>(line) {
            // Empty content (the closing `done` line) adds nothing to the reply.
            Ok(rec) if rec.is_assistant() && !rec.message.content.is_empty() => {
                Some(DisplayEvent::Append(rec.message.content))
            }
            Ok(_) => None,
            Err(e) => {
                debug!(target: "providers::ollama", "skipping undecodable line: {} ({:?})", e, line);
                None
            }
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoder {
    mode: DecodeMode,
    max_line_bytes: usize,
    status: Option<u16>,
}

impl Decoder {
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            mode,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            status: None,
        }
    }

    pub fn max_line_bytes(mut self, n: usize) -> Self {
        self.max_line_bytes = n.max(1);
        self
    }

    /// HTTP status the body was served with. A non-2xx body that shows
    /// nothing ends in an error naming the status instead of `Done`.
    pub fn http_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Consume `byte_stream`, emitting events to `sink` in line order.
    ///
    /// Returns after EOF (having emitted [`DisplayEvent::Done`]) or after the
    /// first error record. The stream is dropped on return, which closes the
    /// underlying connection. Read failures are returned without a `Done`.
    pub async fn decode<S, E, K>(&self, byte_stream: S, sink: &K) -> Result<DecodeOutcome, OmlError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: fmt::Display,
        K: EventSink + ?Sized,
    {
        let lines = ndjson_lines(byte_stream, self.max_line_bytes);
        let mut lines = std::pin::pin!(lines);
        let mut count = 0usize;
        let mut shown = 0usize;

        while let Some(line) = lines.next().await {
            let line = line?;
            count += 1;
            trace!(target: "providers::ollama", "line {} len={}", count, line.len());
            match classify_line(&line, self.mode) {
                Some(DisplayEvent::Error(text)) => {
                    debug!(target: "providers::ollama", "server error after {} lines: {}", count, text);
                    sink.emit(DisplayEvent::Error(text.clone()));
                    return Ok(DecodeOutcome::ErrorTerminated(text));
                }
                Some(event) => {
                    shown += 1;
                    sink.emit(event);
                }
                None => {}
            }
        }

        if let Some(status) = self.status.filter(|s| !(200..300).contains(s)) {
            if shown == 0 {
                let text = format!("server answered HTTP {}", status);
                debug!(target: "providers::ollama", "{} after {} lines", text, count);
                sink.emit(DisplayEvent::Error(text.clone()));
                return Ok(DecodeOutcome::ErrorTerminated(text));
            }
        }

        debug!(target: "providers::ollama", "stream finished mode={:?} lines={}", self.mode, count);
        sink.emit(DisplayEvent::Done);
        Ok(DecodeOutcome::Done)
    }
}

/// [`Decoder::decode`] with the default line limit.
pub async fn decode<S, E, K>(byte_stream: S, mode: DecodeMode, sink: &K) -> Result<DecodeOutcome, OmlError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
    K: EventSink + ?Sized,
{
    Decoder::new(mode).decode(byte_stream, sink).await
}
