use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use adventure_game::{ChallengeRegistry, Manifest};
use adventure_server::{FileSessionStore, app};

#[derive(Debug, Parser)]
#[command(name = "adventure-server", version)]
#[command(about = "Adventure Path session API")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "ADVENTURE_PORT", default_value_t = 3000)]
    port: u16,

    /// Directory holding the `sessions/` folder
    #[arg(long, env = "ADVENTURE_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let manifest = Manifest::default();
    let registry = ChallengeRegistry::with_defaults()?;
    if let Err(err) = manifest.validate_games(&registry) {
        log::error!("manifest lists a game with no challenge module: {err}");
    }

    let store = FileSessionStore::open(&args.data_dir)
        .with_context(|| format!("failed to open data dir {}", args.data_dir.display()))?;
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!(
        "Adventure Path server listening on http://{addr} (sessions in {})",
        store.sessions_dir().display()
    );
    axum::serve(listener, app(store, manifest)).await?;
    Ok(())
}
