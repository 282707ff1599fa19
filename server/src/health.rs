//! `GET /healthcheck` on a second port, separate from the game transport so
//! a liveness probe never contends with the tick loop. Router/State/Json
//! shape borrowed from the `axum` usage in the kinetic-ball pack example's
//! `api::rooms` module, adapted to this crate's `log`/`env_logger` stack
//! instead of `tracing`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::match_queue::{MatchQueueClient, RedisMatchQueue};
use crate::session_store::SessionStore;

#[derive(Clone)]
pub struct HealthState {
    session_store: Arc<SessionStore>,
    match_queue: Arc<RedisMatchQueue>,
}

impl HealthState {
    pub fn new(session_store: Arc<SessionStore>, match_queue: Arc<RedisMatchQueue>) -> Self {
        HealthState { session_store, match_queue }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dependencies {
    coord_store_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    coord_store_error: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Metrics {
    waiting_players: i64,
    active_games: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: u64,
    dependencies: Dependencies,
    metrics: Metrics,
}

/// `allowed_origins` empty means allow any origin (the common local/dev
/// default); otherwise only the listed origins get the CORS headers.
pub fn router(state: HealthState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any)
    } else {
        let origins: Vec<HeaderValue> =
            allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins).allow_methods(Any)
    };
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .layer(cors)
        .with_state(state)
}

async fn healthcheck(State(state): State<HealthState>) -> Json<HealthResponse> {
    let (coord_store_connected, coord_store_error) = match state.match_queue.ping().await {
        Ok(()) => (true, None),
        Err(e) => {
            log::warn!("healthcheck: coordination store ping failed: {e}");
            (false, Some(e.to_string()))
        }
    };

    let active_games = state.session_store.count().await;
    let waiting_players = if coord_store_connected {
        state.match_queue.depth().await.unwrap_or(0)
    } else {
        0
    };
    let status = if coord_store_connected { "Healthy" } else { "Degraded" };

    Json(HealthResponse {
        status,
        timestamp: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0),
        dependencies: Dependencies { coord_store_connected, coord_store_error },
        metrics: Metrics { waiting_players, active_games },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn metrics_reflect_empty_store() {
        let store = Arc::new(SessionStore::new());
        assert_eq!(store.count().await, 0);
    }
}
