use std::fmt;

/// Unit of output handed to the presentation layer, in stream order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Append(String),
    Error(String),
    Done,
}

impl DisplayEvent {
    /// Hint that the view should follow the end of the text. The consumer
    /// decides whether to honour it (e.g. not while the user has scrolled up).
    pub fn should_autoscroll(&self) -> bool {
        !matches!(self, DisplayEvent::Done)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            DisplayEvent::Append(t) | DisplayEvent::Error(t) => Some(t),
            DisplayEvent::Done => None,
        }
    }
}

/// How response lines become display text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecodeMode {
    /// Only `message.content` of assistant-role records is shown.
    #[default]
    Chat,
    /// Every line is shown as-is (pull progress).
    Raw,
}

/// Terminal state of one decoded stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodeOutcome {
    Done,
    ErrorTerminated(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Message placed on the update queue by a running request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    pub task: TaskId,
    pub kind: UpdateKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateKind {
    Display(DisplayEvent),
    /// Transport or read failure; the request is over.
    Failed(String),
}

impl Update {
    /// True when no further updates will follow for this task.
    pub fn is_final(&self) -> bool {
        matches!(
            self.kind,
            UpdateKind::Failed(_)
                | UpdateKind::Display(DisplayEvent::Done)
                | UpdateKind::Display(DisplayEvent::Error(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_does_not_request_autoscroll() {
        assert!(DisplayEvent::Append("x".into()).should_autoscroll());
        assert!(DisplayEvent::Error("x".into()).should_autoscroll());
        assert!(!DisplayEvent::Done.should_autoscroll());
    }

    #[test]
    fn final_updates() {
        let task = TaskId(3);
        let append = Update {
            task,
            kind: UpdateKind::Display(DisplayEvent::Append("hi".into())),
        };
        assert!(!append.is_final());
        let failed = Update {
            task,
            kind: UpdateKind::Failed("connection refused".into()),
        };
        assert!(failed.is_final());
        assert_eq!(task.to_string(), "#3");
    }
}
