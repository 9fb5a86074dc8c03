// Toggle command end to end: persisted flag drives both drivers and the colours
// WHY: disabling must remove every dialogue/narration container on the next pass

use dialogue_fade::{
    FadeStyle, LineSource, RenderNode, Rgb, SettingsStore, StaticRenderer, TextDocument, ViewportDriver, VisibleRange,
};
use tempfile::TempDir;

const TEXT: &str = "He said \"go now,\" and left.\n\n\u{201C}Wait!\u{201D} she cried.";

fn passes(fade_enabled: bool) -> (usize, usize) {
    let doc = TextDocument::new(TEXT);
    let ranges = ViewportDriver::default().decorate(&doc, &[VisibleRange::new(0, doc.len())], fade_enabled);

    let mut tree = RenderNode::from_paragraphs(TEXT);
    let stats = StaticRenderer::new().render_in_place(&mut tree, fade_enabled);
    (ranges.len(), stats.applied)
}

#[tokio::test]
async fn test_toggle_round_trip_drives_both_drivers() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("nested").join("dialogue_fade.json");

    let mut store = SettingsStore::load(&path).await;
    assert!(store.settings().fade_enabled, "Fade should default to enabled");
    let (ranges, applied) = passes(store.settings().fade_enabled);
    assert!(ranges > 0);
    assert_eq!(applied, 2);

    assert!(!store.toggle_fade().await.expect("toggle failed"));
    let reloaded = SettingsStore::load(&path).await;
    assert!(!reloaded.settings().fade_enabled, "Toggle should be persisted");
    assert_eq!(passes(reloaded.settings().fade_enabled), (0, 0));

    assert!(store.toggle_fade().await.expect("toggle failed"));
    let (ranges, applied) = passes(SettingsStore::load(&path).await.settings().fade_enabled);
    assert!(ranges > 0);
    assert_eq!(applied, 2);
}

#[tokio::test]
async fn test_disabled_fade_leaves_tree_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("settings.json");
    tokio::fs::write(&path, r#"{"fadeEnabled": false}"#).await.unwrap();

    let store = SettingsStore::load(&path).await;
    let mut tree = RenderNode::from_paragraphs(TEXT);
    let before = tree.clone();
    StaticRenderer::new().render_in_place(&mut tree, store.settings().fade_enabled);
    assert_eq!(tree, before);
    assert!(!tree.to_html().contains("dialogue-text"));
}

#[tokio::test]
async fn test_colour_refresh_follows_settings() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("settings.json");
    let mut store = SettingsStore::load(&path).await;
    let text = Rgb::WHITE;
    let background = Rgb::BLACK;

    let full = FadeStyle::from_settings(store.settings(), text, background);
    assert_eq!(full.dialogue, text);
    assert_ne!(full.narration, text);

    store
        .update(|s| {
            s.fade_intensity = 0;
            s.modify_dialogue_color = true;
            s.dialogue_color = "#FFCC00".to_string();
        })
        .await
        .unwrap();
    let reloaded = SettingsStore::load(&path).await;
    let style = FadeStyle::from_settings(reloaded.settings(), text, background);
    assert_eq!(style.narration, text);
    assert_eq!(style.dialogue, Rgb::new(0xFF, 0xCC, 0x00));
    assert!(style.css().contains(".dialogue-text { color: #FFCC00; }"));
}
