use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

use gluca::api::{AppState, create_router};
use gluca::config::Config;

#[derive(Parser, Debug)]
#[command(name = "gluca", about = "Recipe search gateway in front of Spoonacular")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber (handles both tracing and log crate)
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let state = Arc::new(AppState::from_config(&config)?);

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    tracing::info!(
        "listening on {}, upstream {}",
        listener.local_addr()?,
        state.spoonacular.base_url()
    );

    axum::serve(listener, create_router(state)).await?;
    Ok(())
}
