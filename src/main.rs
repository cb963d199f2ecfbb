//! Understudy - stateful mock of a professional-network API
//!
//! Stands in for the real service so clients can rehearse invitations,
//! chats, posts, and engagement against a predictable local instance.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use understudy::config::Args;
use understudy::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("understudy={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Understudy - network-service mock");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Workspace: {}", args.workspace);
    info!(
        "Store: {}",
        if args.memory_store { "memory" } else { "file" }
    );
    if !args.memory_store {
        info!("Data file: {}", args.workspace_file().display());
    }
    info!(
        "Route prefix: {}",
        if args.route_prefix.is_empty() {
            "(none)"
        } else {
            args.route_prefix.as_str()
        }
    );
    info!(
        "Upstream: {}",
        if args.upstream_configured() {
            "configured"
        } else {
            "not configured (standalone)"
        }
    );
    info!("======================================");

    let state = match server::AppState::from_args(args).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Startup error: {}", e);
            std::process::exit(1);
        }
    };

    if state.args.seed_demo_data {
        match state.engine.seed_demo_data().await {
            Ok(true) => info!("Demo profiles written into empty workspace"),
            Ok(false) => {}
            Err(e) => error!("Demo seed failed: {}", e),
        }
    }

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
