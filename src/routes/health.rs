//! API root / health endpoint

use hyper::StatusCode;
use serde::Serialize;

use crate::routes::{json_response, BoxBody};

/// Health payload served at the API root
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

#[derive(Serialize)]
pub struct Endpoints {
    pub posts: &'static str,
    pub comments: &'static str,
    pub users: &'static str,
    pub leaderboard: &'static str,
}

/// Handle GET /api/
pub fn health_check() -> hyper::Response<BoxBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            message: "Agora Community Feed API",
            version: env!("CARGO_PKG_VERSION"),
            endpoints: Endpoints {
                posts: "/api/posts/",
                comments: "/api/comments/",
                users: "/api/users/",
                leaderboard: "/api/leaderboard/",
            },
        },
    )
}
