// Centralized UI strings and labels.

use unicode_width::UnicodeWidthStr;

pub const APP_TITLE: &str = "Oh My Llama";
pub const PREFIX_USER: &str = "You: ";
pub const INPUT_HINT: &str = "Type your query... (Enter: send, Alt+Enter: newline, F1: help)";

pub const TITLE_CHAT: &str = " Chat ";
pub const TITLE_INPUT: &str = " Input ";
pub const TITLE_HELP: &str = " Help ";

pub fn user_echo(text: &str) -> String {
    format!("\n{}{}\n\n", PREFIX_USER, text)
}

pub fn failure_line(msg: &str) -> String {
    format!("[error] {}\n", msg)
}

pub fn info_line(msg: &str) -> String {
    format!("[info] {}\n", msg)
}

pub fn help_lines() -> Vec<&'static str> {
    vec![
        "Enter          send message",
        "Alt+Enter      newline in input",
        "Tab            switch focus input/chat",
        "Up/Down/PgUp   scroll chat (chat focus)",
        "Ctrl+L         new chat (clear display)",
        "Esc / Ctrl+C   quit",
        "",
        "/model <name>  select model and pull it",
        "/pull <name>   pull a model",
        "/host <url>    set API host",
        "/models        list models",
        "/add <name>    add model to list",
        "/rm <name>     remove model from list",
        "/new           clear the display",
        "/quit          quit",
    ]
}

pub fn header_line(model: &str, host: &str) -> String {
    format!("{}  model: {}  host: {}", APP_TITLE, model, host)
}

/// Status bar text, dropping the least useful parts until it fits `max_width`.
pub fn build_status_line(
    stick: bool,
    scroll: u16,
    focus: &str,
    active_chats: usize,
    active_pulls: usize,
    max_width: u16,
) -> String {
    let stick_label = if stick || scroll == 0 {
        "Bottom".to_string()
    } else {
        format!("+{} lines", scroll)
    };
    let busy = match (active_chats, active_pulls) {
        (0, 0) => "idle".to_string(),
        (c, 0) => format!("streaming {}", c),
        (0, p) => format!("pulling {}", p),
        (c, p) => format!("streaming {} | pulling {}", c, p),
    };
    let candidates = [
        format!("{} | {} | {}", busy, stick_label, focus),
        format!("{} | {}", busy, stick_label),
        busy.clone(),
    ];
    for c in candidates {
        if UnicodeWidthStr::width(c.as_str()) <= max_width as usize {
            return c;
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_compacts_to_width() {
        let full = build_status_line(true, 0, "Input", 1, 1, 200);
        assert_eq!(full, "streaming 1 | pulling 1 | Bottom | Input");
        let mid = build_status_line(false, 12, "Chat", 0, 0, 20);
        assert_eq!(mid, "idle | +12 lines");
        assert_eq!(build_status_line(true, 0, "Input", 0, 2, 9), "pulling 2");
        assert_eq!(build_status_line(true, 0, "Input", 0, 2, 3), "");
    }

    #[test]
    fn user_echo_matches_chat_layout() {
        assert_eq!(user_echo("hi"), "\nYou: hi\n\n");
    }
}
