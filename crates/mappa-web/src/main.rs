//! mappa-web: serve a concept map as a navigable web page.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use mappa_core::{load_concept_map, read_settings, DEFAULT_MAP_FILE};
use mappa_web::{create_router, AppState};

#[derive(Parser)]
#[command(name = "mappa-web")]
#[command(about = "Navigable concept map with Telegram relay and AI answers")]
struct Cli {
    /// Concept map JSON file
    #[arg(short, long, env = "MAPPA_MAP", default_value = DEFAULT_MAP_FILE)]
    map: PathBuf,

    /// Address to listen on
    #[arg(short, long, env = "MAPPA_LISTEN", default_value = "127.0.0.1:8501")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may live in a .env file next to the map.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mappa_web=info".parse()?)
                .add_directive("mappa_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let map = match load_concept_map(&cli.map) {
        Ok(map) => map,
        Err(e) => {
            error!("{e}");
            return Err(e.into());
        }
    };

    let settings = read_settings();
    let state = Arc::new(AppState::from_settings(map, &settings));

    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!("Serving concept map on http://{}", cli.listen);
    axum::serve(listener, create_router(state)).await?;

    Ok(())
}
