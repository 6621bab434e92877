//! Append-only output log with a clamped scroll offset.

/// Clamps a requested scroll offset into `[0, max(0, line_count - visible)]`.
pub fn clamp_scroll(offset: usize, line_count: usize, visible: usize) -> usize {
    offset.min(line_count.saturating_sub(visible))
}

/// The session's output log.
///
/// Lines are the log text split on `\n`, so a trailing newline yields an empty
/// last line and an empty log has one (empty) line.
#[derive(Debug, Clone)]
pub struct OutputLog {
    text: String,
    /// Byte offset where each line starts; the first entry is always 0.
    line_starts: Vec<usize>,
    offset: usize,
    /// Keep the view pinned to the tail.
    follow: bool,
}

impl Default for OutputLog {
    fn default() -> Self {
        Self {
            text: String::new(),
            line_starts: vec![0],
            offset: 0,
            follow: true,
        }
    }
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Appends a chunk and pins the view to the tail.
    pub fn push(&mut self, chunk: &str) {
        let base = self.text.len();
        self.line_starts.extend(
            chunk
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| base + i + 1),
        );
        self.text.push_str(chunk);
        self.follow = true;
    }

    /// Empties the log and resets scrolling.
    pub fn clear(&mut self) {
        self.text.clear();
        self.line_starts.clear();
        self.line_starts.push(0);
        self.offset = 0;
        self.follow = true;
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn follow_tail(&mut self) {
        self.follow = true;
    }

    pub fn max_offset(&self, visible: usize) -> usize {
        self.line_count().saturating_sub(visible)
    }

    /// First visible line for a viewport of `visible` rows.
    pub fn effective_offset(&self, visible: usize) -> usize {
        if self.follow {
            self.max_offset(visible)
        } else {
            clamp_scroll(self.offset, self.line_count(), visible)
        }
    }

    pub fn scroll_up(&mut self, visible: usize) {
        self.offset = self.effective_offset(visible).saturating_sub(1);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, visible: usize) {
        let max = self.max_offset(visible);
        self.offset = (self.effective_offset(visible) + 1).min(max);
        self.follow = self.offset >= max;
    }

    /// Line `index` without its trailing newline.
    fn line(&self, index: usize) -> &str {
        let start = self.line_starts[index];
        let end = self
            .line_starts
            .get(index + 1)
            .map_or(self.text.len(), |next| next - 1);
        &self.text[start..end]
    }

    /// Lines shown in a viewport of `visible` rows. Only the visible lines
    /// are touched, whatever the size of the log.
    pub fn visible_lines(&self, visible: usize) -> impl Iterator<Item = &str> {
        let first = self.effective_offset(visible);
        let last = (first + visible).min(self.line_count());
        (first..last).map(|index| self.line(index))
    }
}
