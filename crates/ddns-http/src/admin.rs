//! Administrative API
//!
//! Host CRUD and provider settings, guarded by a single bearer token.
//! Edits to a host take the same per-hostname lock as `POST /update`, so an
//! administrator never races an in-flight reconciliation of that name.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ddns_core::{Error, HostChanges, HostId, NewHost};

use crate::error::ApiError;
use crate::model::{
    CreateHostPayload, HostView, SettingsPayload, SettingsView, UpdateHostPayload,
};
use crate::state::AppState;

pub(crate) fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/hosts", get(list_hosts).post(create_host))
        .route(
            "/api/hosts/{id}",
            get(get_host).put(update_host).delete(delete_host),
        )
        .route("/api/settings", get(get_settings).put(put_settings))
        .route_layer(middleware::from_fn_with_state(state, admin_auth))
}

/// Accepts `X-Api-Key: <token>` or `Authorization: Bearer <token>`
async fn admin_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_ref() else {
        return Err(ApiError::AdminUnauthorized);
    };

    match extract_api_key(&headers) {
        Some(candidate) if expected.verify(candidate) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Rejected admin request: invalid token");
            Err(ApiError::AdminUnauthorized)
        }
        None => Err(ApiError::AdminUnauthorized),
    }
}

fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim());
    }

    None
}

fn host_id(path: Result<Path<u64>, PathRejection>) -> Result<HostId, ApiError> {
    path.map(|Path(id)| HostId(id))
        .map_err(|_| ApiError::bad_request("Host id must be a positive integer."))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn existing_host(state: &AppState, id: HostId) -> Result<ddns_core::Host, ApiError> {
    state
        .registry
        .get_host(id)
        .await?
        .ok_or_else(|| Error::not_found(format!("host {}", id)).into())
}

/// GET /api/hosts
async fn list_hosts(State(state): State<AppState>) -> Result<Json<Vec<HostView>>, ApiError> {
    let hosts = state.registry.list_hosts().await?;
    Ok(Json(hosts.into_iter().map(HostView::from).collect()))
}

/// POST /api/hosts
///
/// Returns 201 with the generated auth token.
async fn create_host(
    State(state): State<AppState>,
    payload: Result<Json<CreateHostPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(payload)?;

    let mut new_host = NewHost::new(payload.hostname);
    if let Some(record_type) = payload.record_type {
        new_host = new_host.with_record_type(record_type);
    }
    if let Some(ttl) = payload.ttl {
        new_host = new_host.with_ttl(ttl);
    }

    let host = state.registry.create_host(new_host).await?;
    tracing::info!("Created host {} ({})", host.hostname, host.id);
    Ok((StatusCode::CREATED, Json(HostView::from(host))))
}

/// GET /api/hosts/{id}
async fn get_host(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<HostView>, ApiError> {
    let host = existing_host(&state, host_id(id)?).await?;
    Ok(Json(host.into()))
}

/// PUT /api/hosts/{id}
async fn update_host(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<UpdateHostPayload>, JsonRejection>,
) -> Result<Json<HostView>, ApiError> {
    let id = host_id(id)?;
    let payload = json_body(payload)?;

    let current = existing_host(&state, id).await?;
    let _guard = state.engine.lock_hostname(&current.hostname).await?;

    let host = state
        .registry
        .update_host(
            id,
            HostChanges {
                hostname: payload.hostname,
                record_type: payload.record_type,
                ttl: payload.ttl,
            },
        )
        .await?;
    tracing::info!("Updated host {} ({})", host.hostname, host.id);
    Ok(Json(host.into()))
}

/// DELETE /api/hosts/{id}
async fn delete_host(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = host_id(id)?;

    let current = existing_host(&state, id).await?;
    let _guard = state.engine.lock_hostname(&current.hostname).await?;

    let removed = state.registry.delete_host(id).await?;
    tracing::info!("Deleted host {} ({})", removed.hostname, removed.id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/settings
async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsView>, ApiError> {
    let settings = state.settings.provider_settings().await?;
    Ok(Json(settings.into()))
}

/// PUT /api/settings
///
/// The zone id is replaced (blank clears it). The API token is encrypted and
/// stored only when a non-empty value is submitted.
async fn put_settings(
    State(state): State<AppState>,
    payload: Result<Json<SettingsPayload>, JsonRejection>,
) -> Result<Json<SettingsView>, ApiError> {
    let payload = json_body(payload)?;

    let zone_id = payload
        .zone_id
        .map(|zone| zone.trim().to_string())
        .filter(|zone| !zone.is_empty());
    state.settings.set_zone_id(zone_id).await?;

    if let Some(token) = payload.api_token.filter(|token| !token.is_empty()) {
        let ciphertext = state.secrets.encrypt(&token)?;
        state.settings.set_api_token_ciphertext(ciphertext).await?;
        tracing::info!("Provider API token replaced");
    }

    let settings = state.settings.provider_settings().await?;
    Ok(Json(settings.into()))
}
