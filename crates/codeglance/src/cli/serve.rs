//! The `codeglance serve` command: run the webhook listener and worker pool.

use anyhow::Context;
use clap::Args;
use codeglance_core::{Config, PreviewService};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::server;

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides `server.host`)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Number of parallel workers (overrides `processing.parallel_workers`)
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl ServeArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(workers) = self.workers {
            config.processing.parallel_workers = workers.max(1);
        }
    }
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    tracing::info!(
        "Starting {} workers (read limit {} bytes, thumbnails {}px)",
        config.processing.parallel_workers,
        config.processing.read_limit_bytes,
        config.thumbnail.size
    );

    let (service, pool) = PreviewService::connect(config)?;

    tokio::select! {
        result = server::serve(addr, Arc::new(service)) => result,
        joined = pool => {
            // The dispatcher only returns if its queue closed or it panicked.
            match joined {
                Ok(()) => anyhow::bail!("Worker pool stopped unexpectedly"),
                Err(e) => anyhow::bail!("Worker pool crashed: {e}"),
            }
        }
    }
}
