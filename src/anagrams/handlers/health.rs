//! Health probe: build metadata plus a round-trip to the anagram store.

use crate::{anagrams::AppState, GIT_COMMIT_HASH};
use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Database connection is healthy", body = Health),
        (status = 503, description = "Database connection is unhealthy", body = Health)
    ),
    tag = "health",
)]
// axum handler for health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.anagrams.ping().await {
        Ok(()) => {
            debug!("Database connection is healthy");
            true
        }
        Err(err) => {
            error!("Database health check failed: {}", err);
            false
        }
    };

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if db_healthy {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let headers = x_app_header(&health);

    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, headers, Json(health))
}

fn x_app_header(health: &Health) -> HeaderMap {
    let short_hash = health.commit.get(..7).unwrap_or_default();

    format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|value| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", value);
            headers
        })
        .unwrap_or_else(|err| {
            debug!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        })
}
