pub mod classifier;
pub mod color;
pub mod document;
pub mod reader;
pub mod render;
pub mod settings;
pub mod viewport;

// Re-export main types for convenient access
pub use classifier::{
    classify, BoundaryPolicy, Classified, DialogueSpan, DialogueSpanOwned, PairingPolicy, PolicyKind, SpanPolicy,
    StyleClass,
};

// Re-export driver entry points
pub use document::{Line, LineSource, TextDocument};
pub use render::{apply_replacements, LeafReplacement, RenderNode, StaticRenderer};
pub use viewport::{CarryMode, StyleRange, Update, ViewportDriver, ViewportHighlighter, VisibleRange};

// Re-export host-side collaborators
pub use color::{FadeStyle, Rgb};
pub use settings::{FadeSettings, SettingsStore};
