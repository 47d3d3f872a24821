// src/bin/coedit_server.rs
//! Serve one shared document to WebSocket editors

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use coedit::network;
use coedit::sequencer::{SequencerConfig, SequencerHandle};
use coedit::storage::JsonFileStore;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "COEDIT_HOST", default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Directory holding the persisted document
    #[arg(long, env = "COEDIT_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Identifier of the served document
    #[arg(long, env = "COEDIT_DOCUMENT", default_value = coedit::ot::DEFAULT_DOCUMENT_ID)]
    document: String,

    /// Operations that may wait while a save is in flight
    #[arg(long, default_value_t = 256)]
    queue_capacity: usize,

    #[arg(long, default_value_t = 3)]
    persist_retries: u32,

    #[arg(long, default_value_t = 100)]
    retry_backoff_ms: u64,
}

impl Args {
    fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            queue_capacity: self.queue_capacity,
            persist_retries: self.persist_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            ..SequencerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = JsonFileStore::new(&args.data_dir, args.document.clone())
        .with_context(|| format!("Cannot use data directory {}", args.data_dir.display()))?;
    let handle = SequencerHandle::start(Arc::new(store), args.sequencer_config())
        .await
        .context("Failed to load document")?;

    let addr = SocketAddr::new(args.host, args.port);
    let (bound, server) = warp::serve(network::routes(handle))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .with_context(|| format!("Cannot listen on {}", addr))?;

    log::info!("Serving document '{}' on ws://{}/ws", args.document, bound);
    server.await;
    Ok(())
}
