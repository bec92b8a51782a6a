//! Learnify server binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use tokio::net::TcpListener;

use learnify::api::{self, AppState};
use learnify::config::Config;
use learnify::db::Db;

#[derive(Parser, Debug)]
#[command(name = "learnify-server", version, about = "Learnify API server")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config.
    #[arg(long)]
    bind: Option<String>,

    /// Override the database path from the config.
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    let token_secret = if config.token_secret.is_empty() {
        log::warn!("no token secret configured; tokens will not survive a restart");
        rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(64)
            .map(char::from)
            .collect()
    } else {
        config.token_secret.clone()
    };

    let db = Db::open(&config.database_path)
        .with_context(|| format!("opening database {:?}", config.database_path))?;

    let state = Arc::new(AppState::new(db, &config, &token_secret));
    state
        .achievements
        .ensure_catalog()
        .context("seeding achievement catalog")?;

    let app = api::router(state, &config.cors_origins);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    log::info!("Learnify API listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
