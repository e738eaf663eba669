//! Agora - community feed API

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agora::{
    auth::TokenVerifier,
    config::Args,
    db::MongoClient,
    server,
    store::FeedStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("agora={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Agora - Community Feed API");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    if let Some(ref jwks) = args.jwks_url {
        info!("JWKS: {}", jwks);
    }
    if let Some(ref issuer) = args.jwt_issuer {
        info!("Issuer: {}", issuer);
    }
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let store = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => {
            info!("MongoDB connected successfully");
            match FeedStore::new(client).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to initialize collections: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using memory store): {}", e);
                Arc::new(FeedStore::memory_only())
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Token verification against the identity provider
    let verifier = match TokenVerifier::from_args(&args) {
        Ok(v) => v,
        Err(e) => {
            error!("Auth configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Create application state
    let state = Arc::new(server::AppState::new(args, store, verifier));

    // Run the server
    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
