//! HTTP surface of the notifier service

pub mod config;
pub mod notify;

use axum::{
    Json, Router,
    extract::{Request, State as AxumState},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing,
};
use serde_json::json;
use tracing::warn;

use crate::SharedState;

pub use config::{
    check_config, get_config, reload_config_endpoint, test_connection_endpoint, update_config,
};
pub use notify::notify;

/// Returns service status and whether credentials are configured
pub async fn status(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let credentials = state.store.get().await;
    Json(json!({
        "server": {
            "name": "cloudaeye-notifier",
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
        },
        "credentials_configured": credentials.is_complete(),
    }))
}

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Rejects the request unless it carries the configured admin token.
/// Without one configured every caller is let through.
pub async fn require_admin_token(
    AxumState(state): AxumState<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = &state.admin_token {
        let given = request
            .headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok());
        if given != Some(expected.expose()) {
            warn!(
                "Rejected {} {} : missing or wrong {}",
                request.method(),
                request.uri().path(),
                ADMIN_TOKEN_HEADER
            );
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "status": "error",
                    "message": format!("Missing or invalid {} header", ADMIN_TOKEN_HEADER)
                })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

pub fn router(state: SharedState) -> Router {
    let admin = Router::new()
        .route("/api/config", routing::post(update_config))
        .route("/api/config/reload", routing::post(reload_config_endpoint))
        .route("/api/test-connection", routing::post(test_connection_endpoint))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    Router::new()
        .route("/", routing::get(status))
        .route("/api/config", routing::get(get_config))
        .route("/api/config/check", routing::post(check_config))
        .route("/api/notify", routing::post(notify))
        .merge(admin)
        .with_state(state)
}
