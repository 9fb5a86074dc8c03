// WHY: Line-indexed buffer standing in for the host editor's document
// Drivers only see the LineSource trait; TextDocument is the in-crate implementation

use anyhow::{bail, Result};
use std::ops::Range;
use tracing::debug;

/// One line of a buffer, terminator excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number
    pub number: usize,
    /// Byte offset of the first character
    pub from: usize,
    /// Byte offset just past the last character, before the terminator
    pub to: usize,
    /// Length of the terminator: 0 for the last line, 1 for `\n`, 2 for `\r\n`
    pub break_len: usize,
    pub text: &'a str,
}

impl<'a> Line<'a> {
    /// Offset of the next line's first character (or the document end)
    pub fn end(&self) -> usize {
        self.to + self.break_len
    }
}

/// Host line interface consumed by the viewport driver
pub trait LineSource {
    /// Total length in bytes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Line containing `offset`; offsets past the end resolve to the last line,
    /// an offset inside a terminator resolves to the line it terminates
    fn line_at(&self, offset: usize) -> Line<'_>;

    /// Text of `range`; both ends must be char boundaries within the document
    fn slice(&self, range: Range<usize>) -> &str;
}

/// In-memory document with a line-start index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    text: String,
    line_starts: Vec<usize>,
}

impl TextDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = index_lines(&text);
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line by 1-based number
    pub fn line(&self, number: usize) -> Option<Line<'_>> {
        if number == 0 || number > self.line_starts.len() {
            return None;
        }
        Some(self.build_line(number - 1))
    }

    pub fn lines(&self) -> impl Iterator<Item = Line<'_>> + '_ {
        (0..self.line_starts.len()).map(move |idx| self.build_line(idx))
    }

    /// Replace `range` with `insert` and reindex lines
    pub fn replace(&mut self, range: Range<usize>, insert: &str) -> Result<()> {
        if range.start > range.end || range.end > self.text.len() {
            bail!(
                "Edit range {}..{} is outside document of length {}",
                range.start,
                range.end,
                self.text.len()
            );
        }
        if !self.text.is_char_boundary(range.start) || !self.text.is_char_boundary(range.end) {
            bail!("Edit range {}..{} splits a UTF-8 character", range.start, range.end);
        }
        debug!("Replacing {}..{} with {} bytes", range.start, range.end, insert.len());
        self.text.replace_range(range, insert);
        self.line_starts = index_lines(&self.text);
        Ok(())
    }

    /// Append text at the end of the document
    pub fn push_str(&mut self, insert: &str) {
        let end = self.text.len();
        self.text.push_str(insert);
        // WHY: only lines from the old last line onward can change
        let last_start = self.line_starts.pop().unwrap_or(0);
        self.line_starts
            .extend(index_lines(&self.text[last_start..]).into_iter().map(|s| s + last_start));
        debug!("Appended {} bytes at {}", insert.len(), end);
    }

    fn build_line(&self, idx: usize) -> Line<'_> {
        let from = self.line_starts[idx];
        let (to, break_len) = match self.line_starts.get(idx + 1) {
            Some(&next) => {
                let nl = next - 1;
                if nl > from && self.text.as_bytes()[nl - 1] == b'\r' {
                    (nl - 1, 2)
                } else {
                    (nl, 1)
                }
            }
            None => (self.text.len(), 0),
        };
        Line {
            number: idx + 1,
            from,
            to,
            break_len,
            text: &self.text[from..to],
        }
    }
}

impl Default for TextDocument {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl LineSource for TextDocument {
    fn len(&self) -> usize {
        self.text.len()
    }

    fn line_at(&self, offset: usize) -> Line<'_> {
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(insert_at) => insert_at.saturating_sub(1),
        };
        self.build_line(idx.min(self.line_starts.len().saturating_sub(1)))
    }

    fn slice(&self, range: Range<usize>) -> &str {
        &self.text[range]
    }
}

fn index_lines(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(text.bytes().enumerate().filter(|&(_, b)| b == b'\n').map(|(i, _)| i + 1));
    starts
}

/// Largest char boundary in `text` that is `<= idx`
pub fn floor_char_boundary(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
