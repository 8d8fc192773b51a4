use std::collections::BTreeMap;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use oml_core::{DisplayEvent, TaskId, Update, UpdateKind};
use providers::session::{TaskHandle, TaskKind};
use providers::Session;
use ratatui::layout::Rect;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tracing::{info, warn};

use crate::strings::{failure_line, info_line, user_echo};

pub mod chat;
pub mod input;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Input,
    Chat,
}

impl Focus {
    pub fn label(self) -> &'static str {
        match self {
            Focus::Input => "Input",
            Focus::Chat => "Chat",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Model(String),
    Pull(String),
    Host(String),
    Models,
    Add(String),
    Remove(String),
    New,
    Quit,
    Unknown(String),
}

/// Parse `/cmd arg`; `None` when `text` is not a slash command.
pub fn parse_command(text: &str) -> Option<Command> {
    let rest = text.trim().strip_prefix('/')?;
    let mut parts = rest.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_lowercase();
    let arg = parts.next().unwrap_or("").trim().to_string();
    let needs_arg = |c: fn(String) -> Command| {
        if arg.is_empty() {
            Command::Unknown(cmd.clone())
        } else {
            c(arg.clone())
        }
    };
    Some(match cmd.as_str() {
        "model" => needs_arg(Command::Model),
        "pull" => needs_arg(Command::Pull),
        "host" => needs_arg(Command::Host),
        "add" => needs_arg(Command::Add),
        "rm" => needs_arg(Command::Remove),
        "models" => Command::Models,
        "new" => Command::New,
        "quit" | "q" => Command::Quit,
        _ => Command::Unknown(cmd.clone()),
    })
}

pub struct App {
    pub session: Session,
    updates: UnboundedReceiver<Update>,
    /// Everything shown in the chat pane; requests append to it concurrently
    /// through the update queue.
    pub transcript: String,
    pub input: String,
    pub input_cursor: usize,
    pub focus: Focus,
    pub chat_scroll: u16,
    pub stick_to_bottom: bool,
    pub chat_area: Option<Rect>,
    pub chat_wrap_width: u16,
    pub chat_wrap_len: usize,
    pub chat_lines: Vec<String>,
    pub active: BTreeMap<TaskId, TaskKind>,
    pub show_help: bool,
    pub dirty: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: Session, updates: UnboundedReceiver<Update>) -> Self {
        Self {
            session,
            updates,
            transcript: String::new(),
            input: String::new(),
            input_cursor: 0,
            focus: Focus::Input,
            chat_scroll: 0,
            stick_to_bottom: true,
            chat_area: None,
            chat_wrap_width: 0,
            chat_wrap_len: 0,
            chat_lines: Vec::new(),
            active: BTreeMap::new(),
            show_help: false,
            dirty: true,
            should_quit: false,
        }
    }

    fn track(&mut self, handle: TaskHandle) {
        self.active.insert(handle.id(), handle.kind());
        self.dirty = true;
    }

    fn note(&mut self, msg: &str) {
        self.transcript.push_str(&info_line(msg));
        self.dirty = true;
    }

    pub fn active_counts(&self) -> (usize, usize) {
        let chats = self.active.values().filter(|k| **k == TaskKind::Chat).count();
        (chats, self.active.len() - chats)
    }

    pub fn pull_current_model(&mut self) {
        let model = self.session.model().to_string();
        let handle = self.session.submit_pull(&model);
        self.track(handle);
    }

    pub fn submit(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        self.input.clear();
        self.input_cursor = 0;
        self.dirty = true;

        if let Some(cmd) = parse_command(&text) {
            self.run_command(cmd);
            return;
        }

        info!(target: "tui", "submit: model={} input_len={} chars", self.session.model(), text.len());
        self.transcript.push_str(&user_echo(&text));
        let handle = self.session.submit_chat(&text);
        self.track(handle);
        self.stick_to_bottom = true;
        self.chat_scroll = 0;
    }

    pub fn run_command(&mut self, cmd: Command) {
        match cmd {
            Command::Model(name) => {
                let handle = self.session.select_model(&name);
                self.track(handle);
                self.note(&format!("model set to '{}'", self.session.model()));
            }
            Command::Pull(name) => {
                let handle = self.session.submit_pull(&name);
                self.track(handle);
            }
            Command::Host(url) => {
                self.session.set_host(&url);
                self.note(&format!("host set to '{}'", self.session.host()));
            }
            Command::Models => {
                let list = self.session.models().join(", ");
                self.note(&format!("models: {}", list));
            }
            Command::Add(name) => {
                if self.session.add_model(&name) {
                    self.note(&format!("added '{}'", name));
                }
            }
            Command::Remove(name) => {
                if self.session.remove_model(&name) {
                    self.note(&format!("removed '{}'", name));
                }
            }
            Command::New => {
                self.transcript.clear();
                self.chat_scroll = 0;
                self.stick_to_bottom = true;
                self.dirty = true;
            }
            Command::Quit => self.should_quit = true,
            Command::Unknown(c) => {
                warn!(target: "tui", "unknown command /{}", c);
                self.note(&format!("unknown command '/{}'", c));
            }
        }
    }

    /// Apply one queued update to the transcript.
    pub fn apply_update(&mut self, update: Update) {
        let autoscroll = match &update.kind {
            UpdateKind::Display(event) => {
                match event {
                    DisplayEvent::Append(t) => self.transcript.push_str(t),
                    DisplayEvent::Error(t) => {
                        self.transcript.push_str(t);
                        self.transcript.push('\n');
                    }
                    DisplayEvent::Done => {}
                }
                event.should_autoscroll()
            }
            UpdateKind::Failed(msg) => {
                self.transcript.push_str(&failure_line(msg));
                true
            }
        };
        // Follow new output unless the user is reading the chat pane.
        if autoscroll && self.focus != Focus::Chat {
            self.stick_to_bottom = true;
            self.chat_scroll = 0;
        }
        if update.is_final() {
            self.active.remove(&update.task);
        }
        self.dirty = true;
    }

    pub fn on_tick(&mut self) {
        for _ in 0..256 {
            match self.updates.try_recv() {
                Ok(update) => self.apply_update(update),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    pub fn scroll_up(&mut self, n: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(n);
        self.stick_to_bottom = false;
        self.dirty = true;
    }

    pub fn scroll_down(&mut self, n: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(n);
        if self.chat_scroll == 0 {
            self.stick_to_bottom = true;
        }
        self.dirty = true;
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.dirty = true;
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q')) {
                self.show_help = false;
            }
            return;
        }
        match key.code {
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('l') if ctrl => self.run_command(Command::New),
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(1) => self.show_help = true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Input => Focus::Chat,
                    Focus::Chat => Focus::Input,
                };
            }
            _ => match self.focus {
                Focus::Chat => self.on_chat_key(key),
                Focus::Input => self.on_input_key(key),
            },
        }
    }

    fn on_chat_key(&mut self, key: KeyEvent) {
        let page = self
            .chat_area
            .map(|a| a.height.saturating_sub(2).max(1))
            .unwrap_or(10);
        match key.code {
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            KeyCode::PageUp => self.scroll_up(page),
            KeyCode::PageDown => self.scroll_down(page),
            KeyCode::Home => self.scroll_up(u16::MAX),
            KeyCode::End => self.scroll_down(u16::MAX),
            _ => {}
        }
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Enter if alt || shift => self.insert_text("\n"),
            KeyCode::Enter => self.submit(),
            KeyCode::Char('w') if ctrl => self.delete_prev_word(),
            KeyCode::Char('u') if ctrl => self.kill_to_line_start(),
            KeyCode::Char('a') if ctrl => self.move_cursor_line_start(),
            KeyCode::Char('e') if ctrl => self.move_cursor_line_end(),
            KeyCode::Char(c) if !ctrl => {
                let mut buf = [0u8; 4];
                self.insert_text(c.encode_utf8(&mut buf));
            }
            KeyCode::Backspace => self.delete_left_grapheme(),
            KeyCode::Delete => self.delete_right_grapheme(),
            KeyCode::Left => self.move_cursor_left(),
            KeyCode::Right => self.move_cursor_right(),
            KeyCode::Home => self.move_cursor_line_start(),
            KeyCode::End => self.move_cursor_line_end(),
            KeyCode::PageUp => self.scroll_up(5),
            KeyCode::PageDown => self.scroll_down(5),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::ollama::OllamaConfig;
    use tokio::runtime::Handle;
    use tokio::sync::mpsc;

    fn app() -> App {
        let (session, _rx) =
            Session::with_channel(OllamaConfig::with_host("http://127.0.0.1:9"), Handle::current())
                .expect("session");
        let (_tx, rx) = mpsc::unbounded_channel();
        App::new(session, rx)
    }

    fn display(task: u64, event: DisplayEvent) -> Update {
        Update {
            task: TaskId(task),
            kind: UpdateKind::Display(event),
        }
    }

    #[test]
    fn parses_slash_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/model llama2"), Some(Command::Model("llama2".into())));
        assert_eq!(
            parse_command("  /HOST http://box:11434/ "),
            Some(Command::Host("http://box:11434/".into()))
        );
        assert_eq!(parse_command("/models"), Some(Command::Models));
        assert_eq!(parse_command("/pull"), Some(Command::Unknown("pull".into())));
        assert_eq!(parse_command("/q"), Some(Command::Quit));
        assert_eq!(parse_command("/frobnicate x"), Some(Command::Unknown("frobnicate".into())));
    }

    #[tokio::test]
    async fn updates_append_in_order_and_finish_tasks() {
        let mut app = app();
        app.active.insert(TaskId(1), TaskKind::Chat);
        app.apply_update(display(1, DisplayEvent::Append("Hel".into())));
        app.apply_update(display(1, DisplayEvent::Append("lo".into())));
        assert_eq!(app.active_counts(), (1, 0));
        app.apply_update(display(1, DisplayEvent::Done));
        assert_eq!(app.transcript, "Hello");
        assert!(app.active.is_empty());
    }

    #[tokio::test]
    async fn errors_and_failures_are_visible() {
        let mut app = app();
        app.apply_update(display(1, DisplayEvent::Error("model not found".into())));
        app.apply_update(Update {
            task: TaskId(2),
            kind: UpdateKind::Failed("transport: cannot connect".into()),
        });
        assert_eq!(
            app.transcript,
            "model not found\n[error] transport: cannot connect\n"
        );
    }

    #[tokio::test]
    async fn autoscroll_is_suppressed_while_chat_is_focused() {
        let mut app = app();
        app.focus = Focus::Chat;
        app.scroll_up(4);
        app.apply_update(display(1, DisplayEvent::Append("more".into())));
        assert_eq!(app.chat_scroll, 4);
        assert!(!app.stick_to_bottom);

        app.focus = Focus::Input;
        app.apply_update(display(1, DisplayEvent::Append("again".into())));
        assert_eq!(app.chat_scroll, 0);
        assert!(app.stick_to_bottom);
    }

    #[tokio::test]
    async fn local_commands_edit_session_state() {
        let mut app = app();
        app.run_command(Command::Host("http://gpu:11434/".into()));
        assert_eq!(app.session.host(), "http://gpu:11434");
        app.run_command(Command::Add("phi".into()));
        assert!(app.session.models().iter().any(|m| m == "phi"));
        app.run_command(Command::New);
        assert!(app.transcript.is_empty());
        app.run_command(Command::Quit);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn submit_echoes_user_text_and_tracks_task() {
        let mut app = app();
        app.input = "why is the sky blue?".into();
        app.input_cursor = 20;
        app.submit();
        assert_eq!(app.transcript, "\nYou: why is the sky blue?\n\n");
        assert!(app.input.is_empty());
        assert_eq!(app.active_counts(), (1, 0));
    }
}
