//! Destinations for display events.
//!
//! Several requests may stream at once, so every sink applies an event as a
//! single write: either one message on an update queue or one append under a
//! lock.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use crate::{DisplayEvent, OmlError, TaskId, Update, UpdateKind};

pub trait EventSink: Send + Sync {
    fn emit(&self, event: DisplayEvent);
    /// Report a transport or read failure that ended the request.
    fn fail(&self, error: &OmlError);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: DisplayEvent) {
        (**self).emit(event)
    }
    fn fail(&self, error: &OmlError) {
        (**self).fail(error)
    }
}

/// Forwards events of one task onto a shared update queue.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    task: TaskId,
    tx: UnboundedSender<Update>,
}

impl ChannelSink {
    pub fn new(task: TaskId, tx: UnboundedSender<Update>) -> Self {
        Self { task, tx }
    }

    pub fn task(&self) -> TaskId {
        self.task
    }

    fn send(&self, kind: UpdateKind) {
        if self.tx.send(Update { task: self.task, kind }).is_err() {
            trace!(target: "oml_core::sink", "update queue closed task={}", self.task);
        }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: DisplayEvent) {
        self.send(UpdateKind::Display(event));
    }

    fn fail(&self, error: &OmlError) {
        self.send(UpdateKind::Failed(error.to_string()));
    }
}

#[derive(Debug, Default)]
struct TranscriptState {
    text: String,
    events: Vec<DisplayEvent>,
    failures: Vec<String>,
}

/// Shared text buffer guarded by a mutex. Cloning shares the buffer.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    inner: Arc<Mutex<TranscriptState>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TranscriptState> {
        // A panic while holding the lock cannot leave a half-written append.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn text(&self) -> String {
        self.state().text.clone()
    }

    /// Every event received so far, in arrival order.
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.state().events.clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.state().failures.clone()
    }

    pub fn push_str(&self, s: &str) {
        self.state().text.push_str(s);
    }

    pub fn clear(&self) {
        let mut st = self.state();
        st.text.clear();
        st.events.clear();
        st.failures.clear();
    }
}

impl EventSink for Transcript {
    fn emit(&self, event: DisplayEvent) {
        let mut st = self.state();
        match &event {
            DisplayEvent::Append(t) => st.text.push_str(t),
            DisplayEvent::Error(t) => {
                st.text.push_str(t);
                st.text.push('\n');
            }
            DisplayEvent::Done => {}
        }
        st.events.push(event);
    }

    fn fail(&self, error: &OmlError) {
        let msg = error.to_string();
        let mut st = self.state();
        st.text.push_str(&format!("[error] {}\n", msg));
        st.failures.push(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn transcript_appends_text_and_records_events() {
        let t = Transcript::new();
        t.emit(DisplayEvent::Append("Hello".into()));
        t.emit(DisplayEvent::Append(", world".into()));
        t.emit(DisplayEvent::Done);
        assert_eq!(t.text(), "Hello, world");
        assert_eq!(t.events().len(), 3);
        assert_eq!(t.events()[2], DisplayEvent::Done);
    }

    #[test]
    fn transcript_error_text_ends_with_newline() {
        let t = Transcript::new();
        t.push_str("You: hi\n\n");
        t.emit(DisplayEvent::Error("model not found".into()));
        assert_eq!(t.text(), "You: hi\n\nmodel not found\n");
    }

    #[test]
    fn transcript_clones_share_buffer() {
        let a = Transcript::new();
        let b = a.clone();
        b.emit(DisplayEvent::Append("shared".into()));
        assert_eq!(a.text(), "shared");
        a.clear();
        assert!(b.text().is_empty());
    }

    #[test]
    fn transcript_records_failures_apart_from_events() {
        let t = Transcript::new();
        t.fail(&OmlError::Transport("connection refused".into()));
        assert!(t.events().is_empty());
        assert_eq!(t.failures(), vec!["transport: connection refused".to_string()]);
        assert_eq!(t.text(), "[error] transport: connection refused\n");
    }

    #[tokio::test]
    async fn channel_sink_tags_updates_with_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelSink::new(TaskId(7), tx);
        sink.emit(DisplayEvent::Append("a".into()));
        sink.fail(&OmlError::Read("reset".into()));
        drop(sink);

        let first = rx.recv().await.expect("first update");
        assert_eq!(first.task, TaskId(7));
        assert_eq!(first.kind, UpdateKind::Display(DisplayEvent::Append("a".into())));
        let second = rx.recv().await.expect("second update");
        assert_eq!(second.kind, UpdateKind::Failed("read: reset".into()));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn channel_sink_ignores_closed_queue() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelSink::new(TaskId(1), tx);
        sink.emit(DisplayEvent::Done);
    }
}
