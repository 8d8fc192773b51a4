use textwrap::{wrap, Options};

use super::App;

impl App {
    /// Re-wrap the transcript when the pane width or the text changed.
    pub fn ensure_chat_wrapped(&mut self, width: u16) {
        let width = width.max(1);
        if self.chat_wrap_width == width && self.chat_wrap_len == self.transcript.len() {
            return;
        }
        self.chat_lines = wrap_transcript(&self.transcript, width);
        self.chat_wrap_width = width;
        self.chat_wrap_len = self.transcript.len();
    }

    /// Returns (first visible line, visible line count) for a pane of
    /// `height` rows, clamping `chat_scroll` to the scrollable range.
    pub fn compute_chat_layout(&mut self, height: u16) -> (usize, usize) {
        let total = self.chat_lines.len();
        let viewport = (height as usize).min(total);
        let max_scroll = total.saturating_sub(viewport);
        if self.stick_to_bottom {
            self.chat_scroll = 0;
        }
        self.chat_scroll = self.chat_scroll.min(max_scroll.min(u16::MAX as usize) as u16);
        let start = max_scroll - self.chat_scroll as usize;
        (start, viewport)
    }
}

fn wrap_transcript(text: &str, width: u16) -> Vec<String> {
    let opts = Options::new(width as usize);
    text.split('\n')
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                wrap(line, &opts)
                    .into_iter()
                    .map(|c| c.into_owned())
                    .collect()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_each_paragraph_and_keeps_blank_lines() {
        let lines = wrap_transcript("\nYou: hello there\n\nshort", 10);
        assert_eq!(lines, vec!["", "You: hello", "there", "", "short"]);
    }
}
