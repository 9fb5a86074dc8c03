// WHY: Legacy position-tracking policy kept for edge-case comparison with the boundary heuristic
// Exact glyph pairing via a stack; outputs intentionally differ on straight quotes

use std::ops::Range;

use super::glyphs::{is_close_quote, is_open_quote, partner_of};
use super::{spans_from_intervals, DialogueSpan, SpanPolicy};

/// An unmatched opening glyph and its absolute byte position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenQuote {
    pub glyph: char,
    pub position: usize,
}

/// Stack of open quotes carried between chunks
///
/// `consumed` is the number of bytes of all chunks already scanned, so positions
/// in the stack stay absolute when this state is threaded through a sequence
/// of chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingState {
    stack: Vec<OpenQuote>,
    consumed: usize,
}

impl PairingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open quotes still waiting for their partner, bottom of stack first
    pub fn open_quotes(&self) -> &[OpenQuote] {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

/// Scans text at absolute positions, pushing open glyphs and popping on an
/// exact partner, and records every popped `[open, close]` range.
///
/// The open check runs before the close check, so a self-pairing straight
/// quote always pushes and can never pop. That behaviour is kept as-is.
#[derive(Debug, Default)]
pub struct PairingScanner {
    stack: Vec<OpenQuote>,
    closed: Vec<Range<usize>>,
}

impl PairingScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a carried state
    pub fn with_state(state: PairingState) -> Self {
        Self {
            stack: state.stack,
            closed: Vec::new(),
        }
    }

    /// Scan `chunk`, whose first byte sits at absolute offset `base`
    pub fn feed(&mut self, chunk: &str, base: usize) {
        for (idx, ch) in chunk.char_indices() {
            let position = base + idx;
            if is_open_quote(ch) {
                self.stack.push(OpenQuote { glyph: ch, position });
            } else if is_close_quote(ch) {
                let matches_top = self
                    .stack
                    .last()
                    .and_then(|top| partner_of(top.glyph))
                    .is_some_and(|partner| partner == ch);
                if matches_top {
                    if let Some(open) = self.stack.pop() {
                        self.closed.push(open.position..position + ch.len_utf8());
                    }
                }
            }
        }
    }

    /// Open quotes currently on the stack
    pub fn pending(&self) -> &[OpenQuote] {
        &self.stack
    }

    /// Popped ranges so far, sorted and merged (nested pairs collapse into the outer one)
    pub fn closed_ranges(&self) -> Vec<Range<usize>> {
        merge_ranges(self.closed.clone())
    }

    /// Finish scanning: merged dialogue ranges plus the remaining stack
    pub fn finish(self) -> (Vec<Range<usize>>, Vec<OpenQuote>) {
        (merge_ranges(self.closed), self.stack)
    }
}

/// Sort and merge overlapping or touching ranges
pub fn merge_ranges(mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.sort_by_key(|r| (r.start, r.end));
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// `SpanPolicy` adapter for the legacy pairing scanner.
///
/// Per chunk, text inside a pair that closes within the chunk is dialogue. A pair
/// whose open glyph lies in an earlier chunk marks the chunk from its start up to
/// the close; the earlier chunks were already emitted as narration. Opens left on
/// the stack are never reported as dialogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairingPolicy;

impl SpanPolicy for PairingPolicy {
    type State = PairingState;

    fn classify<'a>(&self, chunk: &'a str, state: PairingState) -> (Vec<DialogueSpan<'a>>, PairingState) {
        let base = state.consumed;
        let mut scanner = PairingScanner::with_state(state);
        scanner.feed(chunk, base);
        let (closed, stack) = scanner.finish();

        let intervals: Vec<Range<usize>> = closed
            .into_iter()
            .map(|r| r.start.saturating_sub(base)..r.end - base)
            .collect();
        let spans = spans_from_intervals(chunk, &intervals);

        (
            spans,
            PairingState {
                stack,
                consumed: base + chunk.len(),
            },
        )
    }
}
