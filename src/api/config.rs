//! Credential configuration endpoints

use axum::{Json, extract::State as AxumState, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::SharedState;
use crate::credentials::{FormValidation, Secret, check_tenant_key, check_token, test_connection};

/// Current configuration. The token itself is never returned.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub tenant_key: String,
    pub token_configured: bool,
    pub endpoint: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsForm {
    pub tenant_key: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub tenant_key: FormValidation,
    pub token: FormValidation,
}

/// GET /api/config
pub async fn get_config(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let credentials = state.store.get().await;
    let endpoint = state.notifier.sender().await.endpoint(&credentials.tenant_key);
    Json(ConfigResponse {
        tenant_key: credentials.tenant_key,
        token_configured: !credentials.token.is_empty(),
        endpoint,
    })
}

/// POST /api/config - Set tenant key and/or token and persist them
pub async fn update_config(
    AxumState(state): AxumState<SharedState>,
    Json(form): Json<CredentialsForm>,
) -> impl IntoResponse {
    match state
        .store
        .update(form.tenant_key, form.token.map(Secret::from))
        .await
    {
        Ok(()) => {
            info!("Credentials updated at {:?}", state.store.path());
            Json(json!({
                "status": "success",
                "message": "Configuration saved"
            }))
            .into_response()
        }
        Err(e) => {
            error!("Failed to save credentials: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// POST /api/config/check - Validate form values without saving
pub async fn check_config(Json(form): Json<CredentialsForm>) -> impl IntoResponse {
    Json(CheckResponse {
        tenant_key: check_tenant_key(form.tenant_key.as_deref().unwrap_or_default()),
        token: check_token(form.token.as_deref().unwrap_or_default()),
    })
}

/// POST /api/config/reload - Re-read the configuration file
pub async fn reload_config_endpoint(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    match state.store.reload().await {
        Ok(()) => Json(json!({
            "status": "success",
            "message": "Configuration reloaded successfully"
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to reload config: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string()
                })),
            )
                .into_response()
        }
    }
}

/// POST /api/test-connection - Ping the endpoint with the given or stored credentials
pub async fn test_connection_endpoint(
    AxumState(state): AxumState<SharedState>,
    Json(form): Json<CredentialsForm>,
) -> impl IntoResponse {
    let stored = state.store.get().await;
    let tenant_key = form.tenant_key.unwrap_or(stored.tenant_key);
    let token = form.token.map(Secret::from).unwrap_or(stored.token);

    let sender = state.notifier.sender().await;
    Json(test_connection(&sender, &tenant_key, &token).await)
}
