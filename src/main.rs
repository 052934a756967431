//! CLI entry point for the filhaal server.

use anyhow::{Context, Result};
use clap::Parser;
use filhaal_core::config::DatabaseLocation;
use filhaal_core::{AppState, Config, Database, DatabaseOptions, router, serve};
use tokio::net::TcpListener;
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Filhaal starting");

    let mut config = Config::from_env().context("invalid configuration")?;
    config.apply_overrides(args.bind, args.port, args.database.as_deref());
    config.log_summary();

    let db = match &config.database {
        DatabaseLocation::Memory => Database::new_in_memory().await?,
        DatabaseLocation::File(path) => {
            let options = DatabaseOptions {
                max_connections: config.db_max_connections,
                ..DatabaseOptions::default()
            };
            Database::new(path, options)
                .await
                .with_context(|| format!("failed to open database {}", path.display()))?
        }
    };

    let state = AppState::from_config(&config, &db)?;
    let app = router(state, config.max_upload_bytes);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    serve(listener, app).await?;

    db.close().await;
    println!("Server shutting down...");
    Ok(())
}
