//! Per-file pipeline: download -> decode -> resolve -> render -> upload + tag.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use crate::config::Config;
use crate::dam::{DamGateway, FieldRegistry};
use crate::error::{PipelineError, PipelineResult};

use super::decode::decode_preview;
use super::lexer::LexerResolver;
use super::queue::{WorkHandler, WorkItem};
use super::thumbnail::ThumbnailRenderer;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    /// Detected language name
    pub language: String,
    /// Whether the preview upload succeeded
    pub uploaded: bool,
    /// Whether the language tag was attached
    pub tagged: bool,
}

/// Runs the full pipeline for one depot path.
///
/// Holds only shared, internally synchronized state; one instance serves
/// every worker.
pub struct FileProcessor {
    gateway: Arc<dyn DamGateway>,
    resolver: Arc<LexerResolver>,
    renderer: Arc<ThumbnailRenderer>,
    fields: Arc<FieldRegistry>,
    field_name: String,
    read_limit: usize,
}

impl FileProcessor {
    /// Build a processor from configuration and the process-wide shared state.
    pub fn new(
        config: &Config,
        gateway: Arc<dyn DamGateway>,
        resolver: Arc<LexerResolver>,
        fields: Arc<FieldRegistry>,
    ) -> Self {
        Self {
            gateway,
            resolver,
            renderer: Arc::new(ThumbnailRenderer::new(
                config.thumbnail.clone(),
                config.font_path(),
            )),
            fields,
            field_name: config.metadata.field_name.clone(),
            read_limit: config.processing.read_limit_bytes,
        }
    }

    /// Process one file.
    ///
    /// Download, decode, lexing and rendering failures abort the item.
    /// Upload and tagging are attempted independently and their failures are
    /// only logged.
    pub async fn process(&self, depot_path: &str) -> PipelineResult<ProcessReport> {
        let start = std::time::Instant::now();
        tracing::info!("Downloading file: {depot_path}");

        // Dropped on every return path, removing the download.
        let scratch = tempfile::tempdir().map_err(|source| PipelineError::Io {
            path: depot_path.to_string(),
            source,
        })?;
        let local = scratch.path().join(local_name(depot_path));

        self.gateway.download(depot_path, &local).await?;
        let prefix = read_prefix(&local, self.read_limit)
            .await
            .map_err(|source| PipelineError::Io {
                path: depot_path.to_string(),
                source,
            })?;
        let download_time = start.elapsed();
        tracing::trace!("  Download: {:?}", download_time);

        let decoded = decode_preview(&prefix);
        if decoded.text.trim().is_empty() {
            tracing::debug!("No previewable text in {depot_path}, rendering anyway");
        }

        let lexer = self
            .resolver
            .resolve(depot_path)
            .ok_or_else(|| PipelineError::UnsupportedFile {
                path: depot_path.to_string(),
            })?;

        tracing::info!("Creating thumbnail for {depot_path}");
        let render_start = std::time::Instant::now();
        let renderer = Arc::clone(&self.renderer);
        let path_owned = depot_path.to_string();
        let thumbnail = tokio::task::spawn_blocking(move || {
            renderer.render(&path_owned, &decoded.text, &lexer)
        })
        .await
        .map_err(|e| PipelineError::Render {
            path: depot_path.to_string(),
            message: format!("Task join error: {e}"),
        })??;
        tracing::trace!("  Render: {:?}", render_start.elapsed());

        let uploaded = match self.gateway.upload_preview(depot_path, &thumbnail.png).await {
            Ok(()) => {
                tracing::info!("Successfully uploaded preview for {depot_path}");
                true
            }
            Err(e) => {
                tracing::error!("Error sending preview: {e}");
                false
            }
        };

        let tagged = match self
            .fields
            .tag(
                self.gateway.as_ref(),
                depot_path,
                &self.field_name,
                &thumbnail.language,
            )
            .await
        {
            Ok(()) => {
                tracing::info!("Successfully updated metadata for {depot_path}");
                true
            }
            Err(e) => {
                tracing::error!("Error sending metadata: {e}");
                false
            }
        };

        tracing::debug!(
            "Processed {depot_path} as {} in {:?}",
            thumbnail.language,
            start.elapsed()
        );

        Ok(ProcessReport {
            language: thumbnail.language,
            uploaded,
            tagged,
        })
    }
}

#[async_trait]
impl WorkHandler for FileProcessor {
    async fn handle(&self, item: &WorkItem) -> PipelineResult<()> {
        let report = self.process(item.depot_path()).await?;
        tracing::info!(
            "Finished {}: language={} uploaded={} tagged={}",
            item.depot_path(),
            report.language,
            report.uploaded,
            report.tagged
        );
        Ok(())
    }
}

/// Read at most `limit` bytes from the start of a file.
async fn read_prefix(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut buffer = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut buffer).await?;
    Ok(buffer)
}

/// Local file name for a depot path.
fn local_name(depot_path: &str) -> &str {
    match depot_path.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name,
        _ => "download",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dam::testing::MemoryDam;
    use image::GenericImageView;

    const SOURCE: &[u8] = b"import sys\n\ndef main():\n    print(sys.argv)\n";

    fn processor(dam: Arc<MemoryDam>, config: &Config) -> FileProcessor {
        FileProcessor::new(
            config,
            dam,
            Arc::new(LexerResolver::new(32)),
            Arc::new(FieldRegistry::new()),
        )
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.thumbnail.font_path = "/nonexistent/custom_font.ttf".into();
        config
    }

    #[tokio::test]
    async fn test_process_uploads_and_tags() {
        let dam = Arc::new(MemoryDam::new().with_file("//depot/a.py", SOURCE));
        let report = processor(dam.clone(), &config())
            .process("//depot/a.py")
            .await
            .unwrap();

        assert_eq!(report.language, "Python");
        assert!(report.uploaded && report.tagged);

        let previews = dam.previews();
        assert_eq!(previews.len(), 1);
        let image = image::load_from_memory(&previews[0].1).unwrap();
        assert_eq!(image.dimensions(), (240, 240));

        let tags = dam.tags();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].value, "Python");
        assert_eq!(dam.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_download_failure_stops_before_render() {
        let dam = Arc::new(MemoryDam::new());
        let err = processor(dam.clone(), &config())
            .process("//depot/missing.py")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Transport { .. }));
        assert!(dam.previews().is_empty());
        assert!(dam.tags().is_empty());
        assert_eq!(dam.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_still_tags() {
        let dam = Arc::new(
            MemoryDam::new()
                .with_file("//depot/lib.rs", b"fn main() {}\n")
                .failing_uploads(),
        );
        let report = processor(dam.clone(), &config())
            .process("//depot/lib.rs")
            .await
            .unwrap();

        assert!(!report.uploaded);
        assert!(report.tagged);
        assert_eq!(dam.tags()[0].value, "Rust");
    }

    #[tokio::test]
    async fn test_tag_failure_still_uploads() {
        let dam = Arc::new(
            MemoryDam::new()
                .with_file("//depot/a.py", SOURCE)
                .failing_tags(),
        );
        let report = processor(dam.clone(), &config())
            .process("//depot/a.py")
            .await
            .unwrap();

        assert!(report.uploaded);
        assert!(!report.tagged);
        assert_eq!(dam.previews().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_file_is_not_rendered() {
        let dam = Arc::new(MemoryDam::new().with_file("//depot/image.png", b"\x89PNG"));
        let err = processor(dam.clone(), &config())
            .process("//depot/image.png")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnsupportedFile { .. }));
        assert!(dam.previews().is_empty());
    }

    #[tokio::test]
    async fn test_binary_content_still_renders() {
        let dam = Arc::new(MemoryDam::new().with_file("//depot/blob.py", &[0u8, 159, 146, 150, 255]));
        let report = processor(dam.clone(), &config())
            .process("//depot/blob.py")
            .await
            .unwrap();
        assert!(report.uploaded);
    }

    #[tokio::test]
    async fn test_read_prefix_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'x'; 2000]).unwrap();

        assert_eq!(read_prefix(&path, 500).await.unwrap().len(), 500);
        assert_eq!(read_prefix(&path, 5000).await.unwrap().len(), 2000);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("//depot/src/a.py"), "a.py");
        assert_eq!(local_name("//depot/src/"), "download");
        assert_eq!(local_name(".."), "download");
    }

    #[tokio::test]
    async fn test_handler_succeeds_when_upload_and_tag_fail() {
        let dam = Arc::new(
            MemoryDam::new()
                .with_file("//depot/a.py", SOURCE)
                .failing_uploads()
                .failing_tags(),
        );
        let processor = processor(dam.clone(), &config());

        let report = processor.process("//depot/a.py").await.unwrap();
        assert!(!report.uploaded && !report.tagged);
        assert!(processor.handle(&WorkItem::new("//depot/a.py")).await.is_ok());
    }

    #[tokio::test]
    async fn test_handler_maps_report_to_unit() {
        let dam = Arc::new(MemoryDam::new().with_file("//depot/a.py", SOURCE));
        let processor = processor(dam, &config());
        assert!(processor.handle(&WorkItem::new("//depot/a.py")).await.is_ok());
        assert!(processor.handle(&WorkItem::new("//depot/gone.py")).await.is_err());
    }
}
