//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection.

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{body::Incoming, Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::TokenVerifier;
use crate::config::Args;
use crate::karma::KarmaLedger;
use crate::routes::{self, BoxBody};
use crate::store::FeedStore;
use crate::types::FeedError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<FeedStore>,
    pub verifier: TokenVerifier,
    pub ledger: KarmaLedger,
}

impl AppState {
    pub fn new(args: Args, store: Arc<FeedStore>, verifier: TokenVerifier) -> Self {
        let ledger = KarmaLedger::new(Arc::clone(&store));
        Self {
            args,
            store,
            verifier,
            ledger,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), FeedError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Agora listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - token signatures are not verified");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // CORS preflight
    if method == Method::OPTIONS {
        return Ok(routes::cors_preflight());
    }

    let response = match path.as_str() {
        // API root doubles as the health check
        p if (p == "/api" || p == "/api/") && method == Method::GET => {
            routes::health::health_check()
        }

        p if p.starts_with("/api/users") => routes::users::handle(req, state).await,
        p if p.starts_with("/api/posts") => routes::posts::handle(req, state).await,
        p if p.starts_with("/api/comments") => routes::comments::handle(req, state).await,
        p if p == "/api/leaderboard" || p.starts_with("/api/leaderboard/") => {
            routes::leaderboard::handle(req, state).await
        }

        _ => routes::not_found(&path),
    };

    Ok(response)
}
