//! Single-line text input with a character limit and a cursor.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInput {
    value: String,
    /// Cursor position in characters.
    cursor: usize,
    char_limit: usize,
}

impl LineInput {
    pub fn new(char_limit: usize) -> Self {
        Self {
            value: String::new(),
            cursor: 0,
            char_limit,
        }
    }

    pub fn with_value(char_limit: usize, value: &str) -> Self {
        let mut input = Self::new(char_limit);
        input.set_value(value);
        input
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Replaces the content, truncated to the character limit, and moves the
    /// cursor to the end.
    pub fn set_value(&mut self, value: &str) {
        self.value = value.chars().take(self.char_limit).collect();
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, ch: char) {
        if self.value.chars().count() >= self.char_limit || ch.is_control() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    /// Applies an editing key. Returns `false` when the key is not an
    /// editing key.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert(ch);
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.value.chars().count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.chars().count(),
            _ => return false,
        }
        true
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn respects_character_limit() {
        let mut input = LineInput::new(3);
        for ch in "12345".chars() {
            input.insert(ch);
        }
        assert_eq!(input.value(), "123");
        input.set_value("abcdef");
        assert_eq!(input.value(), "abc");
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn edits_at_cursor_with_multibyte_text() {
        let mut input = LineInput::with_value(10, "héllo");
        input.handle_key(&key(KeyCode::Home));
        input.handle_key(&key(KeyCode::Right));
        input.handle_key(&key(KeyCode::Right));
        input.handle_key(&key(KeyCode::Backspace));
        assert_eq!(input.value(), "hllo");
        input.handle_key(&key(KeyCode::Char('e')));
        assert_eq!(input.value(), "hello");
        input.handle_key(&key(KeyCode::Delete));
        assert_eq!(input.value(), "helo");
    }

    #[test]
    fn control_chords_are_not_inserted() {
        let mut input = LineInput::new(10);
        let consumed = input.handle_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!consumed);
        assert!(input.is_empty());
        assert!(!input.handle_key(&key(KeyCode::Enter)));
    }
}
