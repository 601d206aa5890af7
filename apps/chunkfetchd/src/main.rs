//! chunkfetch server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use chunkfetch_server::ServerConfig;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Serves the regular files of a directory as chunked content.
#[derive(Parser, Debug)]
#[command(name = "chunkfetchd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory whose files are served
    directory: Option<PathBuf>,

    /// Name prefix to listen on
    #[arg(short = 'l', long = "listen-prefix")]
    listen_prefix: Option<String>,

    /// Payload bytes per chunk
    #[arg(short = 's', long = "chunk-size")]
    chunk_size: Option<usize>,

    /// Chunk each file into memory on first request
    #[arg(short = 'm', long = "pre-chunk")]
    pre_chunk: bool,

    /// Log every request and response
    #[arg(short, long)]
    verbose: bool,

    /// Address to accept client connections on
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// TOML configuration file; flags override its values
    #[arg(short, long, env = "CHUNKFETCHD_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(dir) = self.directory {
            config.source_dir = dir;
        }
        if let Some(prefix) = self.listen_prefix {
            config.listen_prefix = prefix;
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        config.pre_chunk |= self.pre_chunk;
        config.verbose |= self.verbose;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config()?;

    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    println!("{config}");
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting chunkfetch server"
    );

    let rt = tokio::runtime::Runtime::new()?;
    let answered = rt.block_on(async {
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received Ctrl-C");
                stop.cancel();
            }
        });
        chunkfetch_server::run(&config, cancel).await
    })?;

    tracing::info!(answered, "server shut down cleanly");
    Ok(())
}
