use unicode_segmentation::UnicodeSegmentation;

use super::App;

// `input_cursor` counts graphemes, not bytes.
impl App {
    fn byte_offset(&self, grapheme: usize) -> usize {
        self.input
            .grapheme_indices(true)
            .nth(grapheme)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn grapheme_count(&self) -> usize {
        self.input.graphemes(true).count()
    }

    fn replace_range(&mut self, from: usize, to: usize, with: &str) {
        let (a, b) = (self.byte_offset(from), self.byte_offset(to));
        self.input.replace_range(a..b, with);
    }

    pub fn insert_text(&mut self, s: &str) {
        let at = self.input_cursor.min(self.grapheme_count());
        self.replace_range(at, at, s);
        self.input_cursor = (at + s.graphemes(true).count()).min(self.grapheme_count());
    }

    pub fn delete_left_grapheme(&mut self) {
        if self.input_cursor == 0 {
            return;
        }
        let at = self.input_cursor.min(self.grapheme_count());
        self.replace_range(at - 1, at, "");
        self.input_cursor = at - 1;
    }

    pub fn delete_right_grapheme(&mut self) {
        let at = self.input_cursor;
        if at < self.grapheme_count() {
            self.replace_range(at, at + 1, "");
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.grapheme_count());
    }

    fn line_start(&self) -> usize {
        let parts: Vec<&str> = self.input.graphemes(true).collect();
        let mut i = self.input_cursor.min(parts.len());
        while i > 0 && parts[i - 1] != "\n" {
            i -= 1;
        }
        i
    }

    pub fn move_cursor_line_start(&mut self) {
        self.input_cursor = self.line_start();
    }

    pub fn move_cursor_line_end(&mut self) {
        let parts: Vec<&str> = self.input.graphemes(true).collect();
        let mut i = self.input_cursor.min(parts.len());
        while i < parts.len() && parts[i] != "\n" {
            i += 1;
        }
        self.input_cursor = i;
    }

    pub fn delete_prev_word(&mut self) {
        let parts: Vec<&str> = self.input.graphemes(true).collect();
        let end = self.input_cursor.min(parts.len());
        let mut i = end;
        while i > 0 && parts[i - 1].trim().is_empty() {
            i -= 1;
        }
        while i > 0 && !parts[i - 1].trim().is_empty() {
            i -= 1;
        }
        self.replace_range(i, end, "");
        self.input_cursor = i;
    }

    pub fn kill_to_line_start(&mut self) {
        let start = self.line_start();
        self.replace_range(start, self.input_cursor, "");
        self.input_cursor = start;
    }

    /// (line, column) of the cursor, both 0-based, column in graphemes.
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for g in self.input.graphemes(true).take(self.input_cursor) {
            if g == "\n" {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

#[cfg(test)]
mod tests {
    use crate::app::App;
    use providers::ollama::OllamaConfig;
    use providers::Session;
    use tokio::runtime::Handle;
    use tokio::sync::mpsc;

    fn app_with(input: &str, cursor: usize) -> App {
        let (session, _rx) = Session::with_channel(OllamaConfig::default(), Handle::current())
            .expect("session");
        let (_tx, rx) = mpsc::unbounded_channel();
        let mut app = App::new(session, rx);
        app.input = input.to_string();
        app.input_cursor = cursor;
        app
    }

    #[tokio::test]
    async fn inserts_and_deletes_by_grapheme() {
        let mut app = app_with("héllo", 2);
        app.insert_text("🦙");
        assert_eq!(app.input, "hé🦙llo");
        assert_eq!(app.input_cursor, 3);
        app.delete_left_grapheme();
        assert_eq!(app.input, "héllo");
        app.delete_right_grapheme();
        assert_eq!(app.input, "hélo");
        assert_eq!(app.input_cursor, 2);
    }

    #[tokio::test]
    async fn word_and_line_editing() {
        let mut app = app_with("first line\nsecond word", 22);
        app.delete_prev_word();
        assert_eq!(app.input, "first line\nsecond ");
        assert_eq!(app.cursor_line_col(), (1, 7));
        app.kill_to_line_start();
        assert_eq!(app.input, "first line\n");
        app.move_cursor_left();
        app.move_cursor_line_start();
        assert_eq!(app.input_cursor, 0);
        app.move_cursor_line_end();
        assert_eq!(app.input_cursor, 10);
    }
}
