//! Leaderboard endpoint
//!
//! GET /api/leaderboard/?limit=N - top users by 24-hour karma (public)

use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::karma::{leaderboard, LeaderboardEntry, DEFAULT_LEADERBOARD_LIMIT};
use crate::routes::{
    error_response, json_response, method_not_allowed, query_param, BoxBody,
};
use crate::server::AppState;
use crate::types::Result;

#[derive(Serialize)]
struct LeaderboardResponse {
    count: usize,
    results: Vec<LeaderboardEntry>,
}

/// Handle /api/leaderboard/ requests
pub async fn handle(req: Request<hyper::body::Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let path = req.uri().path();
    if path != "/api/leaderboard" && path != "/api/leaderboard/" {
        return crate::routes::not_found(path);
    }
    if req.method() != Method::GET {
        return method_not_allowed();
    }

    let query = req.uri().query().map(|q| q.to_string());
    let limit = query_param(query.as_deref(), "limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT);

    top_users(&state, limit)
        .await
        .unwrap_or_else(|e| error_response(&e))
}

async fn top_users(state: &AppState, limit: usize) -> Result<Response<BoxBody>> {
    let results = leaderboard(&state.store, limit).await?;

    Ok(json_response(
        StatusCode::OK,
        &LeaderboardResponse {
            count: results.len(),
            results,
        },
    ))
}
