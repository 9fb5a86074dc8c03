use anyhow::{Context, Result};
use memmap2::Mmap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::document::TextDocument;

/// Configuration for document reading behavior
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Map the file into memory instead of async buffered reads
    pub use_mmap: bool,
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            use_mmap: false,
            buffer_size: 8192,
        }
    }
}

/// Statistics for one document read
#[derive(Debug, Clone)]
pub struct ReadStats {
    pub file_path: String,
    pub lines_read: u64,
    pub bytes_read: u64,
    pub duration_ms: u64,
}

/// Loads whole documents; the text is kept byte-exact so offsets stay valid
pub struct DocumentReader {
    config: ReaderConfig,
}

impl DocumentReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub async fn read_document<P: AsRef<Path>>(&self, file_path: P) -> Result<(TextDocument, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();
        debug!("Starting read of document: {}", path.display());

        let text = if self.config.use_mmap {
            read_mmap(path)?
        } else {
            let file = File::open(path)
                .await
                .with_context(|| format!("Failed to open file {}", path.display()))?;
            let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
            let mut text = String::new();
            reader.read_to_string(&mut text).await.map_err(|e| {
                warn!("UTF-8 decoding error in {}: {}", path.display(), e);
                anyhow::anyhow!("Failed to read {}: {}", path.display(), e)
            })?;
            text
        };

        let document = TextDocument::new(text);
        let stats = ReadStats {
            file_path: path.display().to_string(),
            lines_read: document.line_count() as u64,
            bytes_read: document.text().len() as u64,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Read {}: {} lines, {} bytes in {}ms",
            stats.file_path, stats.lines_read, stats.bytes_read, stats.duration_ms
        );
        Ok((document, stats))
    }
}

fn read_mmap(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;
    if file.metadata()?.len() == 0 {
        return Ok(String::new());
    }
    // SAFETY: the mapping is only read while `file` is open and copied out before returning
    let mmap = unsafe { Mmap::map(&file)? };
    let text = std::str::from_utf8(&mmap)
        .with_context(|| format!("UTF-8 validation failed: {}", path.display()))?;
    Ok(text.to_string())
}

/// Convenience function for reading a single document with default configuration
pub async fn read_document_async<P: AsRef<Path>>(file_path: P) -> Result<TextDocument> {
    let reader = DocumentReader::new(ReaderConfig::default());
    let (document, _stats) = reader.read_document(file_path).await?;
    Ok(document)
}
