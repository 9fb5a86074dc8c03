// WHY: Static-render driver - one pass over the text leaves of a rendered tree
// Produces replacement descriptors; applying them to a tree is a separate step

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::{BoundaryPolicy, DialogueSpan, DialogueSpanOwned, SpanPolicy, StyleClass};

/// Tag used for the wrapping containers
pub const SPAN_TAG: &str = "span";

/// Node of a rendered content tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub class: Option<String>,
    pub children: Vec<RenderNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            class: None,
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_child(mut self, child: RenderNode) -> Self {
        self.children.push(child);
        self
    }
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        RenderNode::Text(text.into())
    }

    pub fn element(tag: impl Into<String>, children: Vec<RenderNode>) -> Self {
        RenderNode::Element(Element {
            tag: tag.into(),
            class: None,
            children,
        })
    }

    /// Build a `div` with one `p` per blank-line separated paragraph. Line
    /// terminators stay in the paragraph text and runs of blank lines become
    /// bare text leaves of the `div`, so `text_content` returns `text` exactly.
    pub fn from_paragraphs(text: &str) -> Self {
        let mut root = Element::new("div");
        let mut paragraph = String::new();
        let mut gap = String::new();
        for line in text.split_inclusive('\n') {
            if line.trim().is_empty() {
                if !paragraph.is_empty() {
                    root.children.push(Self::element("p", vec![Self::text(std::mem::take(&mut paragraph))]));
                }
                gap.push_str(line);
            } else {
                if !gap.is_empty() {
                    root.children.push(Self::text(std::mem::take(&mut gap)));
                }
                paragraph.push_str(line);
            }
        }
        if !paragraph.is_empty() {
            root.children.push(Self::element("p", vec![Self::text(paragraph)]));
        }
        if !gap.is_empty() {
            root.children.push(Self::text(gap));
        }
        RenderNode::Element(root)
    }

    /// Concatenated text of all leaves in document order
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for leaf in text_leaves(self) {
            out.push_str(leaf.text);
        }
        out
    }

    /// Serialize to HTML with escaped text
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_html(self, &mut out);
        out
    }

    fn child_at_mut(&mut self, idx: usize) -> Option<&mut RenderNode> {
        match self {
            RenderNode::Element(element) => element.children.get_mut(idx),
            RenderNode::Text(_) => None,
        }
    }
}

fn write_html(node: &RenderNode, out: &mut String) {
    match node {
        RenderNode::Text(text) => escape_into(text, out),
        RenderNode::Element(element) => {
            out.push('<');
            out.push_str(&element.tag);
            if let Some(class) = &element.class {
                out.push_str(" class=\"");
                escape_into(class, out);
                out.push('"');
            }
            out.push('>');
            for child in &element.children {
                write_html(child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// A text leaf and the child-index path from the root to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLeaf<'a> {
    pub path: Vec<usize>,
    pub text: &'a str,
}

/// Text leaves in document (pre-order) order
pub fn text_leaves(root: &RenderNode) -> Vec<TextLeaf<'_>> {
    let mut leaves = Vec::new();
    let mut path = Vec::new();
    collect_leaves(root, &mut path, &mut leaves);
    leaves
}

fn collect_leaves<'a>(node: &'a RenderNode, path: &mut Vec<usize>, leaves: &mut Vec<TextLeaf<'a>>) {
    match node {
        RenderNode::Text(text) => leaves.push(TextLeaf {
            path: path.clone(),
            text,
        }),
        RenderNode::Element(element) => {
            for (idx, child) in element.children.iter().enumerate() {
                path.push(idx);
                collect_leaves(child, path, leaves);
                path.pop();
            }
        }
    }
}

/// Replace the leaf at `path` with one container per span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafReplacement {
    pub path: Vec<usize>,
    pub spans: Vec<DialogueSpanOwned>,
}

impl LeafReplacement {
    /// Text the leaf must still hold for the replacement to apply
    pub fn original_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Containers that take the leaf's place
    pub fn containers(&self) -> Vec<RenderNode> {
        self.spans
            .iter()
            .map(|span| {
                RenderNode::Element(
                    Element::new(SPAN_TAG)
                        .with_class(span.class().css_class())
                        .with_child(RenderNode::Text(span.text.clone())),
                )
            })
            .collect()
    }
}

/// Outcome of applying replacements to a tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub applied: usize,
    pub skipped: usize,
}

/// Static-render driver, generic over the matching policy
#[derive(Debug, Clone, Default)]
pub struct StaticRenderer<P = BoundaryPolicy> {
    policy: P,
}

impl StaticRenderer<BoundaryPolicy> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: SpanPolicy> StaticRenderer<P> {
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    /// Classify every leaf in order, threading state from leaf to leaf.
    /// Only leaves that split into more than one span get a descriptor; a leaf
    /// that is all one span is left as it is.
    pub fn render(&self, root: &RenderNode, fade_enabled: bool) -> Vec<LeafReplacement> {
        if !fade_enabled {
            return Vec::new();
        }
        let classified = self.classify_leaves(root);
        let replacements: Vec<LeafReplacement> = classified
            .iter()
            .filter(|(_, spans)| spans.len() > 1)
            .map(|(leaf, spans)| LeafReplacement {
                path: leaf.path.clone(),
                spans: spans.iter().map(|s| s.to_owned_span()).collect(),
            })
            .collect();

        debug!(
            "Static pass over {} leaves produced {} replacements",
            classified.len(),
            replacements.len()
        );
        replacements
    }

    /// Spans of every text leaf in document order, state threaded across leaves
    pub fn classify_leaves<'a>(&self, root: &'a RenderNode) -> Vec<(TextLeaf<'a>, Vec<DialogueSpan<'a>>)> {
        let mut state = P::State::default();
        let classified: Vec<_> = text_leaves(root)
            .into_iter()
            .map(|leaf| {
                let (spans, next) = self.policy.classify(leaf.text, std::mem::take(&mut state));
                state = next;
                (leaf, spans)
            })
            .collect();
        debug!("Classified {} leaves, final state {:?}", classified.len(), state);
        classified
    }

    /// Render and apply in one step
    pub fn render_in_place(&self, root: &mut RenderNode, fade_enabled: bool) -> ApplyStats {
        let replacements = self.render(root, fade_enabled);
        apply_replacements(root, &replacements)
    }
}

/// Apply descriptors to `root`. Leaves without a parent, or whose path no
/// longer resolves to a text leaf with the same text, are skipped.
pub fn apply_replacements(root: &mut RenderNode, replacements: &[LeafReplacement]) -> ApplyStats {
    let mut stats = ApplyStats::default();
    // WHY: later leaves first; a replacement only shifts later siblings
    for replacement in replacements.iter().rev() {
        if apply_one(root, replacement) {
            stats.applied += 1;
        } else {
            warn!("Skipping replacement for leaf at {:?}: no parent attachment", replacement.path);
            stats.skipped += 1;
        }
    }
    stats
}

fn apply_one(root: &mut RenderNode, replacement: &LeafReplacement) -> bool {
    let Some((&leaf_idx, parent_path)) = replacement.path.split_last() else {
        return false;
    };

    let mut parent = root;
    for &idx in parent_path {
        match parent.child_at_mut(idx) {
            Some(child) => parent = child,
            None => return false,
        }
    }

    let RenderNode::Element(element) = parent else {
        return false;
    };
    match element.children.get(leaf_idx) {
        Some(RenderNode::Text(text)) if *text == replacement.original_text() => {}
        _ => return false,
    }
    element.children.splice(leaf_idx..=leaf_idx, replacement.containers());
    true
}

/// Style class of each container produced for `replacements`, in order
pub fn container_classes(replacements: &[LeafReplacement]) -> Vec<StyleClass> {
    replacements
        .iter()
        .flat_map(|r| r.spans.iter().map(|s| s.class()))
        .collect()
}
