// Editable text widgets for the terminal UI.
// Cursors count characters, not bytes, so multibyte input edits cleanly.

use crossterm::event::KeyCode;

fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Single-line input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct TextInput {
    pub(super) value: String,
    pub(super) cursor: usize,
    pub(super) masked: bool,
}

impl TextInput {
    pub(super) fn new(value: impl Into<String>, masked: bool) -> Self {
        let v = value.into();
        Self {
            cursor: v.chars().count(),
            value: v,
            masked,
        }
    }

    pub(super) fn display(&self) -> String {
        if self.masked {
            "*".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    pub(super) fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    /// Apply an editing key. Returns true when the key was consumed.
    pub(super) fn handle_key(&mut self, code: KeyCode) -> bool {
        let len = self.value.chars().count();
        match code {
            KeyCode::Char(c) => {
                let at = byte_index(&self.value, self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = byte_index(&self.value, self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    let at = byte_index(&self.value, self.cursor);
                    self.value.remove(at);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = len;
                true
            }
            _ => false,
        }
    }
}

/// Multi-line editor used for the raw configuration text.
///
/// Lines are split on `\n` only, so `text()` returns exactly what `set_text` received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct TextArea {
    pub(super) lines: Vec<String>,
    pub(super) row: usize,
    pub(super) col: usize,
}

impl Default for TextArea {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

impl TextArea {
    pub(super) fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Replace the content, keeping the cursor where it still fits.
    pub(super) fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        self.row = self.row.min(self.lines.len() - 1);
        self.col = self.col.min(self.line_len(self.row));
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map_or(0, |l| l.chars().count())
    }

    /// Apply an editing key. Returns true when the text changed.
    pub(super) fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => {
                let line = &mut self.lines[self.row];
                let at = byte_index(line, self.col);
                line.insert(at, c);
                self.col += 1;
                true
            }
            KeyCode::Enter => {
                let line = &mut self.lines[self.row];
                let at = byte_index(line, self.col);
                let rest = line.split_off(at);
                self.row += 1;
                self.lines.insert(self.row, rest);
                self.col = 0;
                true
            }
            KeyCode::Backspace => {
                if self.col > 0 {
                    self.col -= 1;
                    let line = &mut self.lines[self.row];
                    let at = byte_index(line, self.col);
                    line.remove(at);
                    true
                } else if self.row > 0 {
                    let line = self.lines.remove(self.row);
                    self.row -= 1;
                    self.col = self.line_len(self.row);
                    self.lines[self.row].push_str(&line);
                    true
                } else {
                    false
                }
            }
            KeyCode::Delete => {
                if self.col < self.line_len(self.row) {
                    let line = &mut self.lines[self.row];
                    let at = byte_index(line, self.col);
                    line.remove(at);
                    true
                } else if self.row + 1 < self.lines.len() {
                    let next = self.lines.remove(self.row + 1);
                    self.lines[self.row].push_str(&next);
                    true
                } else {
                    false
                }
            }
            KeyCode::Left => {
                if self.col > 0 {
                    self.col -= 1;
                } else if self.row > 0 {
                    self.row -= 1;
                    self.col = self.line_len(self.row);
                }
                false
            }
            KeyCode::Right => {
                if self.col < self.line_len(self.row) {
                    self.col += 1;
                } else if self.row + 1 < self.lines.len() {
                    self.row += 1;
                    self.col = 0;
                }
                false
            }
            KeyCode::Up => {
                self.row = self.row.saturating_sub(1);
                self.col = self.col.min(self.line_len(self.row));
                false
            }
            KeyCode::Down => {
                self.row = (self.row + 1).min(self.lines.len() - 1);
                self.col = self.col.min(self.line_len(self.row));
                false
            }
            KeyCode::PageUp => {
                self.row = self.row.saturating_sub(10);
                self.col = self.col.min(self.line_len(self.row));
                false
            }
            KeyCode::PageDown => {
                self.row = (self.row + 10).min(self.lines.len() - 1);
                self.col = self.col.min(self.line_len(self.row));
                false
            }
            KeyCode::Home => {
                self.col = 0;
                false
            }
            KeyCode::End => {
                self.col = self.line_len(self.row);
                false
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(input: &mut TextInput, s: &str) {
        for c in s.chars() {
            input.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn input_edits_at_cursor() {
        let mut input = TextInput::new("relay", false);
        input.handle_key(KeyCode::Home);
        type_str(&mut input, "my");
        assert_eq!(input.value, "myrelay");
        input.handle_key(KeyCode::End);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.value, "myrela");
    }

    #[test]
    fn input_handles_multibyte_chars() {
        let mut input = TextInput::new("café", false);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.value, "caf");
        type_str(&mut input, "é!");
        input.handle_key(KeyCode::Left);
        input.handle_key(KeyCode::Left);
        input.handle_key(KeyCode::Delete);
        assert_eq!(input.value, "caf!");
    }

    #[test]
    fn masked_input_hides_value() {
        let input = TextInput::new("hunter2", true);
        assert_eq!(input.display(), "*******");
    }

    #[test]
    fn textarea_round_trips_text_exactly() {
        let mut area = TextArea::default();
        area.set_text("A=1\nB=2\n");
        assert_eq!(area.lines.len(), 3);
        assert_eq!(area.text(), "A=1\nB=2\n");
    }

    #[test]
    fn textarea_splits_and_joins_lines() {
        let mut area = TextArea::default();
        area.set_text("AB");
        area.handle_key(KeyCode::Right);
        assert!(area.handle_key(KeyCode::Enter));
        assert_eq!(area.text(), "A\nB");
        assert!(area.handle_key(KeyCode::Backspace));
        assert_eq!(area.text(), "AB");
        assert_eq!((area.row, area.col), (0, 1));
    }

    #[test]
    fn textarea_cursor_is_clamped_on_reload() {
        let mut area = TextArea::default();
        area.set_text("LONG_LINE=1\nX=2\nY=3");
        area.handle_key(KeyCode::Down);
        area.handle_key(KeyCode::Down);
        area.handle_key(KeyCode::End);
        area.set_text("A=1");
        assert_eq!((area.row, area.col), (0, 3));
    }
}
