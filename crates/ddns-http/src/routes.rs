use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ddns_core::UpdateRequest;
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::client_ip::client_ip;
use crate::error::ApiError;
use crate::model::{MessageBody, StatusEntry, UpdatePayload};
use crate::state::AppState;

/// Headroom between the update handler's own deadline and the router's
const ROUTER_TIMEOUT_GRACE: Duration = Duration::from_secs(1);

pub(crate) fn new(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthcheck", get(health_check))
        .route("/update", post(update))
        .route("/status", get(status));

    if state.admin_token.is_some() {
        router = router.merge(admin::routes(state.clone()));
    } else {
        tracing::info!("No admin token configured, admin API disabled");
    }

    // `/update` answers its own timeout with a JSON error before this fires
    let router_timeout = state.request_timeout + ROUTER_TIMEOUT_GRACE;

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::INTERNAL_SERVER_ERROR,
            router_timeout,
        ))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn update(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<UpdatePayload>, JsonRejection>,
) -> Result<Json<MessageBody>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!("rejected update from {}: {}", peer, rejection.body_text());
        ApiError::bad_request("Request body must be JSON.")
    })?;

    let request = UpdateRequest {
        hostname: payload.hostname.unwrap_or_default(),
        token: payload.token.unwrap_or_default(),
        ip: payload.ip,
        source_ip: client_ip(peer.ip(), &headers, state.trust_forwarded_for),
    };

    // Detached so a dropped connection or timeout cannot cut a
    // reconciliation between the provider write and the local commit
    let engine = state.engine.clone();
    let pending = state
        .tasks
        .spawn(async move { engine.apply_update(request).await });

    let outcome = tokio::time::timeout(state.request_timeout, pending)
        .await
        .map_err(|_| ApiError::UpdateTimeout)?
        .map_err(|e| ApiError::internal(format!("update task ended without a result: {}", e)))??;

    Ok(Json(MessageBody::success(outcome.message())))
}

async fn status(State(state): State<AppState>) -> Result<Json<Vec<StatusEntry>>, ApiError> {
    let hosts = state.registry.list_hosts().await?;
    Ok(Json(hosts.into_iter().map(StatusEntry::from).collect()))
}
