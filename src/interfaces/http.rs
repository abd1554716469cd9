use std::future::Future;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;

use crate::{application::state::SharedState, domain::error::DomainError};

use super::slack_options;

pub const OPTIONS_PATH: &str = "/slack/options";

pub fn build_router(state: SharedState) -> Router {
    let max_body_bytes = state.config().max_body_bytes;

    Router::new()
        .route("/healthz", get(healthz_handler))
        .route(OPTIONS_PATH, post(slack_options::options_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

pub async fn serve(
    listener: TcpListener,
    state: SharedState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DomainError> {
    let local_addr = listener.local_addr().map_err(|error| {
        DomainError::Unavailable(format!("failed to read listener address: {error}"))
    })?;

    info!(
        "slack-options-gateway listening on http://{}:{}{}",
        local_addr.ip(),
        local_addr.port(),
        OPTIONS_PATH,
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|error| DomainError::Unavailable(format!("server runtime error: {error}")))
}

async fn healthz_handler(State(state): State<SharedState>) -> impl IntoResponse {
    match state.health_payload().await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "ok": false,
                "error": error.to_string(),
            })),
        )
            .into_response(),
    }
}
