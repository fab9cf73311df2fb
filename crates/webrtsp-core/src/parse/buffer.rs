//! Cursor over an immutable message buffer

/// Read position into a text buffer.
///
/// `Copy`, so speculative lookahead is a matter of copying the cursor,
/// advancing the copy and assigning it back on success.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseBuffer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> ParseBuffer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn eos(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn tail_len(&self) -> usize {
        self.text.len().saturating_sub(self.pos)
    }

    /// Byte under the cursor, `None` at end of stream
    pub fn current(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    pub fn advance(&mut self) {
        self.advance_by(1);
    }

    pub fn advance_by(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.text.len());
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.text.as_bytes()[self.pos..].starts_with(prefix.as_bytes())
    }

    /// Text from `start` up to the cursor.
    ///
    /// Positions are only ever taken at ASCII delimiters or buffer ends,
    /// so they always fall on char boundaries.
    pub fn since(&self, start: usize) -> &'a str {
        &self.text[start..self.pos]
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[start..end]
    }

    pub fn tail(&self) -> &'a str {
        &self.text[self.pos..]
    }
}
