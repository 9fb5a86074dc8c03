// WHY: Shared span types and the policy interface both drivers dispatch through
// Classification is pure; callers thread the returned state into the next chunk

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

pub mod boundary;
pub mod glyphs;
pub mod pairing;

pub use boundary::{classify, BoundaryPolicy};
pub use pairing::{OpenQuote, PairingPolicy, PairingScanner, PairingState};

/// CSS class applied to dialogue runs
pub const DIALOGUE_CLASS: &str = "dialogue-text";
/// CSS class applied to narration runs
pub const NON_DIALOGUE_CLASS: &str = "non-dialogue-text";

/// Classification of a run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleClass {
    Dialogue,
    NonDialogue,
}

impl StyleClass {
    pub fn from_dialogue(is_dialogue: bool) -> Self {
        if is_dialogue {
            StyleClass::Dialogue
        } else {
            StyleClass::NonDialogue
        }
    }

    pub fn is_dialogue(self) -> bool {
        matches!(self, StyleClass::Dialogue)
    }

    /// Markup class name for this classification
    pub fn css_class(self) -> &'static str {
        match self {
            StyleClass::Dialogue => DIALOGUE_CLASS,
            StyleClass::NonDialogue => NON_DIALOGUE_CLASS,
        }
    }
}

impl fmt::Display for StyleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class())
    }
}

/// Borrowed variant - zero-copy slice of the classified chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogueSpan<'a> {
    pub text: &'a str,
    pub is_dialogue: bool,
}

impl<'a> DialogueSpan<'a> {
    pub fn new(text: &'a str, is_dialogue: bool) -> Self {
        Self { text, is_dialogue }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn class(&self) -> StyleClass {
        StyleClass::from_dialogue(self.is_dialogue)
    }

    pub fn to_owned_span(&self) -> DialogueSpanOwned {
        DialogueSpanOwned {
            text: self.text.to_string(),
            is_dialogue: self.is_dialogue,
        }
    }
}

/// Owned variant - for descriptors that outlive the source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSpanOwned {
    pub text: String,
    pub is_dialogue: bool,
}

impl DialogueSpanOwned {
    pub fn class(&self) -> StyleClass {
        StyleClass::from_dialogue(self.is_dialogue)
    }
}

/// Output of classifying one chunk with the boundary policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified<'a> {
    pub spans: Vec<DialogueSpan<'a>>,
    pub end_in_dialogue: bool,
}

/// Span-matching policy: chunk plus carried state in, spans plus new state out
///
/// Implementations must be total and must return spans that reconstruct the
/// chunk exactly, in order, as maximal runs.
pub trait SpanPolicy {
    /// State carried from one chunk to the next; `Default` is the start of a pass
    type State: Clone + Default + fmt::Debug;

    fn classify<'a>(&self, chunk: &'a str, state: Self::State) -> (Vec<DialogueSpan<'a>>, Self::State);
}

/// Selects which matching policy a driver runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    /// Carried flag plus the closing-boundary heuristic
    #[default]
    Boundary,
    /// Legacy stack of open glyphs with exact pairing
    Pairing,
}

/// Collects runs as byte ranges of one chunk, merging contiguous runs of the
/// same classification and dropping empty ones.
pub(crate) struct SpanBuilder<'a> {
    chunk: &'a str,
    runs: Vec<(Range<usize>, bool)>,
}

impl<'a> SpanBuilder<'a> {
    pub(crate) fn new(chunk: &'a str) -> Self {
        Self { chunk, runs: Vec::new() }
    }

    pub(crate) fn push(&mut self, range: Range<usize>, is_dialogue: bool) {
        if range.is_empty() {
            return;
        }
        if let Some((last, last_dialogue)) = self.runs.last_mut() {
            if *last_dialogue == is_dialogue && last.end == range.start {
                last.end = range.end;
                return;
            }
        }
        self.runs.push((range, is_dialogue));
    }

    pub(crate) fn finish(self) -> Vec<DialogueSpan<'a>> {
        let chunk = self.chunk;
        self.runs
            .into_iter()
            .map(|(range, is_dialogue)| DialogueSpan::new(&chunk[range], is_dialogue))
            .collect()
    }
}

/// Split `chunk` into maximal runs given sorted, non-overlapping dialogue intervals
/// expressed as byte ranges relative to the chunk.
pub(crate) fn spans_from_intervals<'a>(chunk: &'a str, intervals: &[Range<usize>]) -> Vec<DialogueSpan<'a>> {
    let mut builder = SpanBuilder::new(chunk);
    let mut cursor = 0;
    for interval in intervals {
        let start = interval.start.clamp(cursor, chunk.len());
        let end = interval.end.clamp(start, chunk.len());
        builder.push(cursor..start, false);
        builder.push(start..end, true);
        cursor = end;
    }
    builder.push(cursor..chunk.len(), false);
    builder.finish()
}

/// Concatenate span text; used to check reconstruction
pub fn reconstruct(spans: &[DialogueSpan<'_>]) -> String {
    spans.iter().map(|s| s.text).collect()
}
