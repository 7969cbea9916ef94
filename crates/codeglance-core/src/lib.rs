//! codeglance core - source file previews for a DAM.
//!
//! The DAM notifies a webhook when files change. Every added or modified file
//! with a known grammar is queued; a fixed pool of workers downloads it,
//! renders a syntax-highlighted thumbnail of its first lines, uploads that as
//! the file's preview, and tags the file with its language.
//!
//! # Architecture
//!
//! ```text
//! Webhook → WorkQueue → Worker: Download → Decode → Lex → Render → Upload + Tag
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use codeglance_core::{Config, PreviewService};
//!
//! #[tokio::main]
//! async fn main() -> codeglance_core::Result<()> {
//!     let config = Config::load()?;
//!     let (service, pool) = PreviewService::connect(config)?;
//!
//!     let queued = service.ingest(br#"[{"objects":{"files":{"added":["//depot/a.py"]}}}]"#)?;
//!     println!("Queued {queued}");
//!     pool.await?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod dam;
pub mod error;
pub mod pipeline;
pub mod webhook;

// Re-exports for convenient access
pub use config::Config;
pub use dam::{DamGateway, FieldRegistry, HelixDamClient};
pub use error::{ConfigError, GlanceError, IngestError, PipelineError, PipelineResult, Result};
pub use pipeline::{
    FileProcessor, LexerResolver, RenderedThumbnail, StatsSnapshot, ThumbnailRenderer, WorkItem,
    WorkQueue, WorkerPool,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Running preview service: shared caches, the work queue, and its pool.
pub struct PreviewService {
    resolver: Arc<LexerResolver>,
    queue: WorkQueue,
}

impl PreviewService {
    /// Connect to the configured DAM and start the worker pool.
    ///
    /// Fails if the DAM URL or account key is missing.
    pub fn connect(config: Config) -> Result<(Self, JoinHandle<()>)> {
        let credentials = config.dam_credentials()?;
        let timeout = Duration::from_secs(config.dam.timeout_secs);
        let gateway = HelixDamClient::new(&credentials, timeout)?;
        tracing::info!("Using DAM at {}", credentials.url);
        Ok(Self::start(config, Arc::new(gateway)))
    }

    /// Start the worker pool against an arbitrary gateway.
    ///
    /// The returned handle completes only if the dispatcher stops.
    pub fn start(config: Config, gateway: Arc<dyn DamGateway>) -> (Self, JoinHandle<()>) {
        tracing::debug!("Initializing codeglance v{} ({})", VERSION, gateway.name());

        let resolver = Arc::new(LexerResolver::new(config.processing.lexer_cache_size));
        let fields = Arc::new(FieldRegistry::new());
        let processor = Arc::new(FileProcessor::new(
            &config,
            gateway,
            Arc::clone(&resolver),
            fields,
        ));

        let (queue, receiver) = pipeline::work_queue();
        let pool = WorkerPool::new(config.processing.parallel_workers);
        let handle = tokio::spawn(pool.run(receiver, processor));

        (
            Self { resolver, queue },
            handle,
        )
    }

    /// Handle a webhook body. Returns how many files were queued.
    pub fn ingest(&self, body: &[u8]) -> std::result::Result<usize, IngestError> {
        webhook::ingest(body, &self.resolver, &self.queue)
    }

    /// Current pool counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.queue.stats().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dam::testing::MemoryDam;

    fn config() -> Config {
        let mut config = Config::default();
        config.thumbnail.font_path = "/nonexistent/custom_font.ttf".into();
        config.thumbnail.size = 64;
        config
    }

    async fn wait_until(service: &PreviewService, done: impl Fn(&StatsSnapshot) -> bool) -> StatsSnapshot {
        for _ in 0..500 {
            let stats = service.stats();
            if done(&stats) {
                return stats;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pool did not settle: {:?}", service.stats());
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_connect_requires_credentials() {
        let mut config = config();
        config.dam.url = "${CODEGLANCE_TEST_UNSET_DAM_URL}".into();
        assert!(matches!(
            PreviewService::connect(config),
            Err(GlanceError::Config(ConfigError::MissingSetting { .. }))
        ));
    }

    #[tokio::test]
    async fn test_supported_file_is_dispatched_once() {
        let dam = Arc::new(MemoryDam::new().with_file("/depot/a.py", b"print('hi')\n"));
        let (service, _pool) = PreviewService::start(config(), dam.clone());

        let body = br#"[{"objects":{"files":{"added":["/depot/a.py"],"modified":[]}}}]"#;
        assert_eq!(service.ingest(body).unwrap(), 1);

        let stats = wait_until(&service, |s| s.finished() == 1).await;
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.succeeded, 1);
        assert_eq!(dam.previews().len(), 1);
        assert_eq!(dam.tags()[0].value, "Python");
    }

    #[tokio::test]
    async fn test_unsupported_file_creates_no_work() {
        let dam = Arc::new(MemoryDam::new());
        let (service, _pool) = PreviewService::start(config(), dam.clone());

        let body = br#"[{"objects":{"files":{"added":["/depot/image.png"]}}}]"#;
        assert_eq!(service.ingest(body).unwrap(), 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(service.stats(), StatsSnapshot::default());
        assert_eq!(dam.download_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_download_does_not_block_later_items() {
        let dam = Arc::new(MemoryDam::new().with_file("/depot/ok.rs", b"fn main() {}\n"));
        let mut config = config();
        config.processing.parallel_workers = 1;
        let (service, _pool) = PreviewService::start(config, dam.clone());

        service
            .ingest(br#"[{"objects":{"files":{"added":["/depot/missing.py"]}}}]"#)
            .unwrap();
        service
            .ingest(br#"[{"objects":{"files":{"modified":["/depot/ok.rs"]}}}]"#)
            .unwrap();

        let stats = wait_until(&service, |s| s.finished() == 2).await;
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.succeeded, 1);

        let previews = dam.previews();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].0, "/depot/ok.rs");
    }

    #[tokio::test]
    async fn test_downloads_never_exceed_worker_count() {
        let mut dam = MemoryDam::new().with_latency(Duration::from_millis(20));
        let mut paths = Vec::new();
        for i in 0..10 {
            let path = format!("/depot/src/m{i}.py");
            dam = dam.with_file(&path, b"x = 1\n");
            paths.push(path);
        }
        let dam = Arc::new(dam);
        let mut config = config();
        config.processing.parallel_workers = 3;
        let (service, _pool) = PreviewService::start(config, dam.clone());

        let body = serde_json::json!([{ "objects": { "files": { "added": paths } } }]);
        assert_eq!(service.ingest(body.to_string().as_bytes()).unwrap(), 10);

        let stats = wait_until(&service, |s| s.finished() == 10).await;
        assert_eq!(stats.succeeded, 10);
        assert_eq!(dam.download_calls(), 10);
        let peak = dam.max_in_flight();
        assert!((1..=3).contains(&peak), "{peak} concurrent downloads");
    }

    #[tokio::test]
    async fn test_workers_share_field_cache() {
        let dam = Arc::new(
            MemoryDam::new()
                .with_file("/depot/a.py", b"a = 1\n")
                .with_file("/depot/b.py", b"b = 2\n")
                .with_file("/depot/c.py", b"c = 3\n"),
        );
        let (service, _pool) = PreviewService::start(config(), dam.clone());

        service
            .ingest(br#"[{"objects":{"files":{"added":["/depot/a.py","/depot/b.py","/depot/c.py"]}}}]"#)
            .unwrap();

        wait_until(&service, |s| s.finished() == 3).await;
        assert_eq!(dam.create_calls(), 1);
        assert_eq!(dam.tags().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let (service, _pool) = PreviewService::start(config(), Arc::new(MemoryDam::new()));
        assert_eq!(service.ingest(b""), Err(IngestError::NoJsonData));
    }
}
