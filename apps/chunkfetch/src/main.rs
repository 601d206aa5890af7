//! chunkfetch client entry point.

use std::io::Write;
use std::path::PathBuf;

use chunkfetch_client::{ClientConfig, TransferOutcome};
use chunkfetch_protocol::Command;
use chunkfetch_transfer::TransferProgress;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Lists or fetches files from a chunkfetch server.
#[derive(Parser, Debug)]
#[command(name = "chunkfetch")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Action,

    /// Server address
    #[arg(long, env = "CHUNKFETCH_SERVER", default_value = "127.0.0.1:9695")]
    server: String,

    /// Name prefix the server publishes under
    #[arg(long, default_value = chunkfetch_protocol::constants::DOMAIN_PREFIX)]
    prefix: String,

    /// Directory fetched files are written to
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Give up after this many seconds without a response
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print the server's file listing
    List,
    /// Download one file
    Fetch {
        /// File name as shown by `list`
        file: String,
    },
}

fn print_progress(p: &TransferProgress) {
    print!(
        "\r{:5.1}%  chunk {}/{}  {} bytes  {:.0} B/s",
        p.percent(),
        p.chunk_index,
        p.final_index,
        p.bytes_received,
        p.bytes_per_second
    );
    let _ = std::io::stdout().flush();
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = ClientConfig {
        prefix: args.prefix,
        server: args.server,
        output_dir: args.output_dir,
        timeout_secs: args.timeout_secs,
    };
    let command = match args.command {
        Action::List => Command::List,
        Action::Fetch { file } => Command::Fetch(file),
    };

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        let mut client = chunkfetch_client::connect(&config).await?;
        if matches!(command, Command::Fetch(_)) {
            client = client.with_progress(Box::new(print_progress));
        }
        client.execute(&command).await
    })?;

    match outcome {
        TransferOutcome::Listing(listing) => print!("{listing}"),
        TransferOutcome::File {
            path,
            bytes,
            chunks,
        } => {
            println!();
            println!("{} ({bytes} bytes, {chunks} chunks)", path.display());
        }
    }
    Ok(())
}
