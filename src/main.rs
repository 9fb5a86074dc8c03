use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use dialogue_fade::color::{FadeStyle, Rgb};
use dialogue_fade::reader::{DocumentReader, ReaderConfig};
use dialogue_fade::render::{apply_replacements, RenderNode, StaticRenderer};
use dialogue_fade::settings::{SettingsStore, DEFAULT_SETTINGS_FILE};
use dialogue_fade::viewport::{CarryMode, ViewportDriver, VisibleRange};
use dialogue_fade::{LineSource, PairingPolicy, PolicyKind};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Wrap text in dialogue / narration containers and print HTML
    Render,
    /// Print absolute-offset style ranges as JSON lines
    Ranges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Carried flag with the closing-boundary heuristic
    Boundary,
    /// Legacy exact-pairing stack
    Pairing,
}

impl From<Policy> for PolicyKind {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Boundary => PolicyKind::Boundary,
            Policy::Pairing => PolicyKind::Pairing,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dialogue-fade")]
#[command(about = "Separate quoted dialogue from narration for fade-style highlighting")]
#[command(version)]
struct Args {
    /// Text document to classify
    input: PathBuf,

    /// Output mode
    #[arg(long, value_enum, default_value_t = Mode::Ranges)]
    mode: Mode,

    /// Quotation matching policy
    #[arg(long, value_enum, default_value_t = Policy::Boundary)]
    policy: Policy,

    /// Visible byte range FROM..TO (repeatable); defaults to the whole document
    #[arg(long = "range", value_parser = parse_range)]
    ranges: Vec<VisibleRange>,

    /// Seed the carried flag by scanning from the start of the document
    #[arg(long)]
    carry_from_start: bool,

    /// Settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Flip the persisted fade flag before running
    #[arg(long)]
    toggle: bool,

    /// Use memory-mapped I/O instead of async buffered
    #[arg(long)]
    use_mmap: bool,

    /// Base text colour used for the fade
    #[arg(long, default_value = "#DCDDDE")]
    text_color: String,

    /// Background colour the narration fades toward
    #[arg(long, default_value = "#202020")]
    background_color: String,
}

fn parse_range(value: &str) -> Result<VisibleRange> {
    let (from, to) = value
        .split_once("..")
        .ok_or_else(|| anyhow!("Expected FROM..TO, got {value}"))?;
    let from: usize = from.trim().parse()?;
    let to: usize = to.trim().parse()?;
    if to < from {
        anyhow::bail!("Range end {to} is before start {from}");
    }
    Ok(VisibleRange::new(from, to))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .json()
        .init();

    let args = Args::parse();
    info!(?args, "Parsed CLI arguments");

    if !args.input.is_file() {
        anyhow::bail!("Input is not a file: {}", args.input.display());
    }

    let mut store = SettingsStore::load(&args.settings).await;
    if args.toggle {
        store.toggle_fade().await?;
    }
    let settings = store.settings().clone();

    let reader = DocumentReader::new(ReaderConfig {
        use_mmap: args.use_mmap,
        ..ReaderConfig::default()
    });
    let (document, stats) = reader.read_document(&args.input).await?;
    info!("Loaded {} ({} lines)", stats.file_path, stats.lines_read);

    match args.mode {
        Mode::Render => {
            let mut tree = RenderNode::from_paragraphs(document.text());
            let replacements = match args.policy {
                Policy::Boundary => StaticRenderer::new().render(&tree, settings.fade_enabled),
                Policy::Pairing => StaticRenderer::with_policy(PairingPolicy).render(&tree, settings.fade_enabled),
            };
            let applied = apply_replacements(&mut tree, &replacements);
            info!(applied = applied.applied, skipped = applied.skipped, "Applied leaf replacements");

            // colour refresh runs on the same trigger, independent of classification
            let style = FadeStyle::from_settings(
                &settings,
                Rgb::parse_hex(&args.text_color)?,
                Rgb::parse_hex(&args.background_color)?,
            );
            println!("<style>\n{}</style>", style.css());
            println!("{}", tree.to_html());
        }
        Mode::Ranges => {
            let visible = if args.ranges.is_empty() {
                vec![VisibleRange::new(0, document.len())]
            } else {
                args.ranges.clone()
            };
            let carry = if args.carry_from_start {
                CarryMode::FromDocumentStart
            } else {
                CarryMode::VisibleOnly
            };
            let driver = ViewportDriver::new(args.policy.into(), carry);
            let ranges = driver.decorate(&document, &visible, settings.fade_enabled);
            for range in &ranges {
                println!("{}", serde_json::to_string(range)?);
            }
            info!("Emitted {} style ranges", ranges.len());
        }
    }

    Ok(())
}
