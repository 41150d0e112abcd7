// # DDNS HTTP Boundary
//
// axum router in front of the reconciliation engine.
//
// ## Public endpoints
//
// - `POST /update`: `{hostname, token, ip?}`, authenticated by the per-host token
// - `GET /status`: hostname, current content and last update of every host
// - `GET /healthcheck`: liveness probe
//
// ## Admin endpoints
//
// Mounted only when an admin token is configured:
//
// - `GET|POST /api/hosts`, `GET|PUT|DELETE /api/hosts/{id}`
// - `GET|PUT /api/settings`
//
// Every error body is `{"status": "error", "message": "..."}`.
//
// The router needs the peer address, so serve it with
// `into_make_service_with_connect_info::<SocketAddr>()`. Updates run as
// detached tasks; drain `AppState::update_tasks()` before shutting down.

mod admin;
mod client_ip;
mod error;
mod model;
mod routes;
mod state;
mod tasks;

pub use model::MessageBody;
pub use state::{AppState, DEFAULT_REQUEST_TIMEOUT};
pub use tasks::UpdateTasks;

use axum::Router;

/// Build the application router
pub fn router(state: AppState) -> Router {
    routes::new(state)
}
