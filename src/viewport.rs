// WHY: Incremental driver - classifies only the visible lines of a large buffer
// Output is absolute-offset style ranges; buffer content is never mutated

use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};

use crate::classifier::{BoundaryPolicy, PairingScanner, PolicyKind, SpanPolicy, StyleClass};
use crate::document::{floor_char_boundary, LineSource};

/// Half-open byte interval `[from, to)` currently shown by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleRange {
    pub from: usize,
    pub to: usize,
}

impl VisibleRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.to <= self.from
    }
}

impl From<Range<usize>> for VisibleRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Position-anchored style range emitted for the host overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRange {
    pub start: usize,
    pub end: usize,
    pub is_dialogue: bool,
}

impl StyleRange {
    pub fn class(&self) -> StyleClass {
        StyleClass::from_dialogue(self.is_dialogue)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Where the carried flag starts for a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CarryMode {
    /// Reset at the top of the visible window; a quotation opened above the
    /// window is not seen
    #[default]
    VisibleOnly,
    /// Scan from offset 0 up to the window to seed the flag exactly
    FromDocumentStart,
}

/// Accumulates style ranges, merging contiguous runs of the same class
#[derive(Debug, Default)]
struct RangeSink {
    ranges: Vec<StyleRange>,
}

impl RangeSink {
    fn push(&mut self, start: usize, end: usize, is_dialogue: bool) {
        if end <= start {
            return;
        }
        if let Some(last) = self.ranges.last_mut() {
            if last.end == start && last.is_dialogue == is_dialogue {
                last.end = end;
                return;
            }
        }
        self.ranges.push(StyleRange { start, end, is_dialogue });
    }
}

/// Sort, clamp, snap to char boundaries, drop empties and merge overlaps
pub fn normalize_ranges<D: LineSource + ?Sized>(doc: &D, ranges: &[VisibleRange]) -> Vec<VisibleRange> {
    let snap = |offset: usize| -> usize {
        let offset = offset.min(doc.len());
        let line = doc.line_at(offset);
        if offset <= line.to {
            line.from + floor_char_boundary(line.text, offset - line.from)
        } else {
            offset
        }
    };

    let mut normalized: Vec<VisibleRange> = ranges
        .iter()
        .map(|r| VisibleRange::new(snap(r.from), snap(r.to)))
        .filter(|r| !r.is_empty())
        .collect();
    normalized.sort_by_key(|r| r.from);

    let mut merged: Vec<VisibleRange> = Vec::with_capacity(normalized.len());
    for range in normalized {
        match merged.last_mut() {
            Some(last) if range.from <= last.to => last.to = last.to.max(range.to),
            _ => merged.push(range),
        }
    }

    if merged.as_slice() != ranges {
        warn!(
            "Visible ranges normalized from {} to {} ranges",
            ranges.len(),
            merged.len()
        );
    }
    merged
}

/// A line touched by the visible window, terminator included, with the parts
/// of it that are actually visible
struct VisibleLine<'a> {
    from: usize,
    text: &'a str,
    clips: Vec<Range<usize>>,
}

/// Lines of `ranges` in document order, each once. `ranges` must be sorted
/// and disjoint (see [`normalize_ranges`]); two ranges inside one line share
/// a single entry.
fn visible_lines<'d, D: LineSource + ?Sized>(doc: &'d D, ranges: &[VisibleRange]) -> Vec<VisibleLine<'d>> {
    let mut lines: Vec<VisibleLine<'d>> = Vec::new();
    for range in ranges {
        let mut pos = range.from;
        while pos < range.to {
            let line = doc.line_at(pos);
            let seg_end = line.end().min(range.to);
            if seg_end <= pos {
                break;
            }
            match lines.last_mut() {
                Some(last) if last.from == line.from => last.clips.push(pos..seg_end),
                _ => lines.push(VisibleLine {
                    from: line.from,
                    text: doc.slice(line.from..line.end()),
                    clips: vec![pos..seg_end],
                }),
            }
            pos = seg_end;
        }
    }
    lines
}

/// Fold `policy` over the lines of `ranges`, threading state across line and
/// range boundaries. Whole lines are classified; the emitted ranges are then
/// clipped to the window. Returns the style ranges and the final state.
pub fn style_ranges_with<P, D>(policy: &P, doc: &D, ranges: &[VisibleRange], initial: P::State) -> (Vec<StyleRange>, P::State)
where
    P: SpanPolicy,
    D: LineSource + ?Sized,
{
    let mut sink = RangeSink::default();
    let mut state = initial;
    for line in visible_lines(doc, ranges) {
        let (spans, next) = policy.classify(line.text, std::mem::take(&mut state));
        for clip in &line.clips {
            let mut offset = line.from;
            for span in &spans {
                let end = offset + span.len();
                sink.push(offset.max(clip.start), end.min(clip.end), span.is_dialogue);
                offset = end;
            }
        }
        state = next;
    }
    (sink.ranges, state)
}

/// Legacy position-tracking pass: one pairing stack over the whole window.
/// Each pop becomes a dialogue range (nested pops merge); opens still on the
/// stack at the end are not emitted; everything else is narration.
pub fn legacy_pairing_ranges<D: LineSource + ?Sized>(doc: &D, ranges: &[VisibleRange], prefix: Option<VisibleRange>) -> Vec<StyleRange> {
    let mut scanner = PairingScanner::new();
    if let Some(prefix) = prefix {
        for line in visible_lines(doc, &[prefix]) {
            scanner.feed(line.text, line.from);
        }
    }
    for line in visible_lines(doc, ranges) {
        scanner.feed(line.text, line.from);
    }
    let (dialogue, pending) = scanner.finish();
    if !pending.is_empty() {
        debug!("{} unmatched open quotes left on the stack", pending.len());
    }

    let mut sink = RangeSink::default();
    for range in ranges {
        let mut cursor = range.from;
        for d in dialogue.iter().filter(|d| d.start < range.to && d.end > range.from) {
            let start = d.start.max(cursor);
            let end = d.end.min(range.to);
            sink.push(cursor, start, false);
            sink.push(start, end, true);
            cursor = end;
        }
        sink.push(cursor, range.to, false);
    }
    sink.ranges
}

/// Viewport driver configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewportDriver {
    pub policy: PolicyKind,
    pub carry: CarryMode,
}

impl ViewportDriver {
    pub fn new(policy: PolicyKind, carry: CarryMode) -> Self {
        Self { policy, carry }
    }

    /// Style ranges exactly covering `visible`. Disabled fade yields nothing.
    pub fn decorate<D: LineSource + ?Sized>(&self, doc: &D, visible: &[VisibleRange], fade_enabled: bool) -> Vec<StyleRange> {
        if !fade_enabled {
            return Vec::new();
        }
        let ranges = normalize_ranges(doc, visible);
        let prefix = match (self.carry, ranges.first()) {
            // the first visible line is classified whole, so seed up to its start
            (CarryMode::FromDocumentStart, Some(first)) => {
                let line_start = doc.line_at(first.from).from;
                (line_start > 0).then(|| VisibleRange::new(0, line_start))
            }
            _ => None,
        };

        let result = match self.policy {
            PolicyKind::Boundary => {
                let seed = match prefix {
                    Some(prefix) => style_ranges_with(&BoundaryPolicy, doc, &[prefix], false).1,
                    None => false,
                };
                style_ranges_with(&BoundaryPolicy, doc, &ranges, seed).0
            }
            PolicyKind::Pairing => legacy_pairing_ranges(doc, &ranges, prefix),
        };

        debug!(
            "Viewport pass over {} ranges produced {} style ranges ({:?})",
            ranges.len(),
            result.len(),
            self.policy
        );
        result
    }
}

/// Reasons the host asks for a recompute
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Update {
    pub doc_changed: bool,
    pub viewport_changed: bool,
    pub fade_toggled: bool,
}

impl Update {
    pub fn needs_recompute(&self) -> bool {
        self.doc_changed || self.viewport_changed || self.fade_toggled
    }
}

/// Owns the last computed ranges and recomputes them on host updates
#[derive(Debug, Default)]
pub struct ViewportHighlighter {
    driver: ViewportDriver,
    fade_enabled: bool,
    ranges: Vec<StyleRange>,
    passes: u64,
}

impl ViewportHighlighter {
    pub fn new(driver: ViewportDriver, fade_enabled: bool) -> Self {
        Self {
            driver,
            fade_enabled,
            ranges: Vec::new(),
            passes: 0,
        }
    }

    pub fn ranges(&self) -> &[StyleRange] {
        &self.ranges
    }

    pub fn fade_enabled(&self) -> bool {
        self.fade_enabled
    }

    /// Number of completed passes
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Change the fade flag; the returned update must be fed to [`Self::update`]
    pub fn set_fade_enabled(&mut self, enabled: bool) -> Update {
        let changed = self.fade_enabled != enabled;
        self.fade_enabled = enabled;
        Update {
            fade_toggled: changed,
            ..Update::default()
        }
    }

    /// Recompute unconditionally
    pub fn refresh<D: LineSource + ?Sized>(&mut self, doc: &D, visible: &[VisibleRange]) -> &[StyleRange] {
        self.ranges = self.driver.decorate(doc, visible, self.fade_enabled);
        self.passes += 1;
        &self.ranges
    }

    /// Recompute when `update` requires it; returns whether a pass ran
    pub fn update<D: LineSource + ?Sized>(&mut self, doc: &D, visible: &[VisibleRange], update: Update) -> bool {
        if !update.needs_recompute() {
            return false;
        }
        self.refresh(doc, visible);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TextDocument;

    fn whole(doc: &TextDocument) -> Vec<VisibleRange> {
        vec![VisibleRange::new(0, doc.len())]
    }

    fn range(start: usize, end: usize, is_dialogue: bool) -> StyleRange {
        StyleRange { start, end, is_dialogue }
    }

    fn assert_covers(ranges: &[StyleRange], visible: &[VisibleRange]) {
        let mut iter = ranges.iter().peekable();
        for v in visible {
            let mut cursor = v.from;
            while cursor < v.to {
                let r = iter.next().expect("coverage ended early");
                assert_eq!(r.start, cursor, "gap or overlap at {cursor}");
                assert!(r.end <= v.to);
                cursor = r.end;
            }
        }
        assert!(iter.next().is_none(), "ranges beyond the visible window");
    }

    #[test]
    fn test_flag_carries_across_lines() {
        let doc = TextDocument::new("He said \"hello\nthere.\" and left.");
        let ranges = ViewportDriver::default().decorate(&doc, &whole(&doc), true);
        // the open quotation spans the line break, so the terminator is dialogue
        assert_eq!(ranges, vec![range(0, 8, false), range(8, 22, true), range(22, 32, false)]);
        assert_eq!(&doc.text()[8..22], "\"hello\nthere.\"");
    }

    #[test]
    fn test_disabled_fade_yields_nothing() {
        let doc = TextDocument::new("\"Quoted\" text");
        assert!(ViewportDriver::default().decorate(&doc, &whole(&doc), false).is_empty());
    }

    #[test]
    fn test_empty_document_yields_nothing() {
        let doc = TextDocument::new("");
        assert!(ViewportDriver::default().decorate(&doc, &whole(&doc), true).is_empty());
    }

    #[test]
    fn test_coverage_of_partial_lines_and_multiple_ranges() {
        let doc = TextDocument::new("aa \"bb\" cc\ndd \"ee\nff\" gg\r\nhh");
        let visible = vec![VisibleRange::new(2, 9), VisibleRange::new(14, 24)];
        let ranges = ViewportDriver::default().decorate(&doc, &visible, true);
        assert_covers(&ranges, &visible);
        for r in &ranges {
            assert!(!r.is_empty());
        }
    }

    #[test]
    fn test_window_starting_mid_line_keeps_line_context() {
        let doc = TextDocument::new("She said \"hi there,\" he said.");
        let start = doc.text().find("there").unwrap();
        let visible = vec![VisibleRange::new(start, doc.len())];

        let ranges = ViewportDriver::default().decorate(&doc, &visible, true);
        let close = start + "there,\"".len();
        assert_eq!(ranges, vec![range(start, close, true), range(close, doc.len(), false)]);

        let legacy = ViewportDriver::new(PolicyKind::Pairing, CarryMode::VisibleOnly).decorate(&doc, &visible, true);
        assert_eq!(legacy, vec![range(start, doc.len(), false)]);
    }

    #[test]
    fn test_two_ranges_in_one_line_classify_it_once() {
        let doc = TextDocument::new("a \u{201C}bb cc\u{201D} d\nnext");
        let bb = doc.text().find("bb").unwrap();
        let d = doc.text().find(" d").unwrap();
        let visible = vec![VisibleRange::new(bb, bb + 1), VisibleRange::new(d, d + 2)];

        for policy in [PolicyKind::Boundary, PolicyKind::Pairing] {
            let ranges = ViewportDriver::new(policy, CarryMode::VisibleOnly).decorate(&doc, &visible, true);
            assert_eq!(ranges, vec![range(bb, bb + 1, true), range(d, d + 2, false)], "{policy:?}");
        }
    }

    #[test]
    fn test_flag_carries_across_ranges() {
        let doc = TextDocument::new("x \"open\nhidden line\nstill\" out");
        let first_line = doc.line(1).unwrap();
        let third_line = doc.line(3).unwrap();
        let visible = vec![
            VisibleRange::new(first_line.from, first_line.end()),
            VisibleRange::new(third_line.from, third_line.end()),
        ];
        let ranges = ViewportDriver::default().decorate(&doc, &visible, true);
        assert_covers(&ranges, &visible);
        // "still\"" is dialogue because the flag carried over the skipped line
        let still = ranges.iter().find(|r| r.start == third_line.from).unwrap();
        assert!(still.is_dialogue);
        assert_eq!(still.end, third_line.from + "still\"".len());
    }

    #[test]
    fn test_visible_only_versus_document_start_carry() {
        let doc = TextDocument::new("\"Opened above\nvisible tail\" here.");
        let second = doc.line(2).unwrap();
        let visible = vec![VisibleRange::new(second.from, second.end())];

        let reset = ViewportDriver::new(PolicyKind::Boundary, CarryMode::VisibleOnly).decorate(&doc, &visible, true);
        // starting fresh, the closing glyph is read as an opener
        assert_eq!(reset[0], range(second.from, second.from + "visible tail".len(), false));

        let seeded = ViewportDriver::new(PolicyKind::Boundary, CarryMode::FromDocumentStart).decorate(&doc, &visible, true);
        assert_eq!(seeded[0], range(second.from, second.from + "visible tail\"".len(), true));
    }

    #[test]
    fn test_normalize_ranges() {
        let doc = TextDocument::new("ab\u{201C}cd\nef");
        let input = vec![
            VisibleRange::new(6, 100),
            VisibleRange::new(0, 3), // splits the 3-byte glyph
            VisibleRange::new(4, 4),
            VisibleRange::new(1, 2),
        ];
        let normalized = normalize_ranges(&doc, &input);
        assert_eq!(normalized, vec![VisibleRange::new(0, 2), VisibleRange::new(6, doc.len())]);
    }

    #[test]
    fn test_legacy_pairing_spans_lines() {
        let doc = TextDocument::new("He said \u{201C}hello\nthere.\u{201D} and left.");
        let driver = ViewportDriver::new(PolicyKind::Pairing, CarryMode::VisibleOnly);
        let ranges = driver.decorate(&doc, &whole(&doc), true);
        let close_end = doc.text().find(" and").unwrap();
        assert_eq!(ranges, vec![range(0, 8, false), range(8, close_end, true), range(close_end, doc.len(), false)]);
    }

    #[test]
    fn test_legacy_pairing_ignores_straight_quotes() {
        let doc = TextDocument::new("She said \"hi there.\"");
        let legacy = ViewportDriver::new(PolicyKind::Pairing, CarryMode::VisibleOnly).decorate(&doc, &whole(&doc), true);
        assert_eq!(legacy, vec![range(0, doc.len(), false)]);

        let primary = ViewportDriver::default().decorate(&doc, &whole(&doc), true);
        assert_eq!(primary, vec![range(0, 9, false), range(9, doc.len(), true)]);
    }

    #[test]
    fn test_legacy_unmatched_open_not_emitted() {
        let doc = TextDocument::new("a \u{2018}b\u{2019} c \u{201C}never closed");
        let ranges = ViewportDriver::new(PolicyKind::Pairing, CarryMode::VisibleOnly).decorate(&doc, &whole(&doc), true);
        assert_covers(&ranges, &whole(&doc));
        assert_eq!(ranges.iter().filter(|r| r.is_dialogue).count(), 1);
        assert!(!ranges.last().unwrap().is_dialogue);
    }

    #[test]
    fn test_highlighter_recomputes_on_updates() {
        let mut doc = TextDocument::new("\"One\" two");
        let mut highlighter = ViewportHighlighter::new(ViewportDriver::default(), true);

        assert!(!highlighter.update(&doc, &whole(&doc), Update::default()));
        assert_eq!(highlighter.passes(), 0);

        highlighter.refresh(&doc, &whole(&doc));
        assert_eq!(highlighter.ranges().len(), 2);

        doc.replace(9..9, " \"three\"").unwrap();
        let changed = Update { doc_changed: true, ..Update::default() };
        assert!(highlighter.update(&doc, &whole(&doc), changed));
        assert_eq!(highlighter.ranges().len(), 3);

        let toggled = highlighter.set_fade_enabled(false);
        assert!(toggled.fade_toggled);
        assert!(highlighter.update(&doc, &whole(&doc), toggled));
        assert!(highlighter.ranges().is_empty());
        assert_eq!(highlighter.passes(), 3);

        // toggling to the same value is not a change
        assert!(!highlighter.set_fade_enabled(false).needs_recompute());
    }
}
