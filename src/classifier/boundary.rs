// WHY: Primary matching policy - carried flag plus the closing-boundary heuristic
// Single left-to-right pass over the chunk, no backtracking

use super::glyphs::{is_close_quote, is_closing_boundary, is_open_quote};
use super::{Classified, DialogueSpan, SpanBuilder, SpanPolicy};

/// Classify one chunk into dialogue / narration runs.
///
/// `start_in_dialogue` is the flag returned for the previous chunk (or `false`
/// at the start of a pass). The returned spans reconstruct `chunk` exactly and
/// `end_in_dialogue` is the flag to hand to the next chunk.
///
/// A close glyph only ends a quotation when it is followed by whitespace, a
/// period, a comma, or the end of the chunk; otherwise it stays inside the
/// dialogue run. An open glyph starts a dialogue run and belongs to it.
pub fn classify(chunk: &str, start_in_dialogue: bool) -> Classified<'_> {
    let mut builder = SpanBuilder::new(chunk);
    let mut in_dialogue = start_in_dialogue;
    let mut run_start = 0;
    let mut chars = chunk.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if in_dialogue {
            if is_close_quote(ch) && is_closing_boundary(chars.peek().map(|&(_, next)| next)) {
                let run_end = idx + ch.len_utf8();
                builder.push(run_start..run_end, true);
                run_start = run_end;
                in_dialogue = false;
            }
        } else if is_open_quote(ch) {
            builder.push(run_start..idx, false);
            run_start = idx;
            in_dialogue = true;
        }
    }

    builder.push(run_start..chunk.len(), in_dialogue);

    Classified {
        spans: builder.finish(),
        end_in_dialogue: in_dialogue,
    }
}

/// `SpanPolicy` adapter for [`classify`]; state is the in-dialogue flag
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryPolicy;

impl SpanPolicy for BoundaryPolicy {
    type State = bool;

    fn classify<'a>(&self, chunk: &'a str, state: bool) -> (Vec<DialogueSpan<'a>>, bool) {
        let Classified { spans, end_in_dialogue } = classify(chunk, state);
        (spans, end_in_dialogue)
    }
}
