//! symsync broker entry point.
//!
//! Runs the central rename server over a directory of per-project claim
//! ledgers:
//!
//! ```text
//! symsync-server --directory /var/lib/symsync [--port 9501] [--resources <path>]
//! ```

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use symsync_server::{ServerConfig, SymbolServer, DEFAULT_PORT};
use tracing_subscriber::EnvFilter;

/// Central rename broker for collaborative reverse engineering.
#[derive(Parser)]
#[command(name = "symsync-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory where per-project claim ledgers live
    #[arg(short, long)]
    directory: PathBuf,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Directory of bootstrap resources to serve, if any
    #[arg(short, long)]
    resources: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = ServerConfig::new(cli.directory)
        .with_bind_addr(SocketAddr::new(cli.bind, cli.port));
    if let Some(resources) = cli.resources {
        config = config.with_resource_directory(resources);
    }

    let server = SymbolServer::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    server.close()?;
    Ok(())
}
