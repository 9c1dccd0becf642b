pub mod api;
pub mod changelog;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod logs;
pub mod notifier;
pub mod payload;
pub mod record;
pub mod run;
pub mod sender;
pub mod source;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use credentials::{CredentialStore, Secret};
use error::{NotifierError, Result};
use notifier::Notifier;

pub const DEFAULT_ENDPOINT_BASE: &str = "https://api.cloudaeye.com/rca/test/v1";

/// How the token is carried in the `Authorization` header.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Basic <token>` with the token sent verbatim (what the endpoint expects today).
    #[default]
    Basic,
    /// `Bearer <token>`.
    Bearer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotifierConfig {
    #[serde(default)]
    pub tenant_key: String,
    #[serde(default)]
    pub token: Secret,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_base: Option<String>,
    #[serde(default)]
    pub auth_scheme: AuthScheme,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_log_lines: Option<usize>,
}

impl NotifierConfig {
    /// Returns the configured endpoint base, or the production one.
    pub fn endpoint_base(&self) -> &str {
        self.endpoint_base
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT_BASE)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_log_lines == Some(0) {
            return Err("max_log_lines must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Load and parse the configuration file.
/// A missing file yields an empty configuration so the service can start
/// and be configured through the API.
pub async fn load_config(path: impl AsRef<Path>) -> Result<NotifierConfig> {
    let path = path.as_ref();
    let config_str = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(NotifierConfig::default());
        }
        Err(e) => {
            return Err(NotifierError::ConfigError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            )));
        }
    };

    let config: NotifierConfig = toml::from_str(&config_str).map_err(|e| {
        NotifierError::ConfigError(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    config.validate().map_err(|msg| {
        NotifierError::ConfigError(format!("Invalid config file '{}': {}", path.display(), msg))
    })?;

    Ok(config)
}

pub struct AppState {
    pub store: Arc<CredentialStore>,
    pub notifier: Notifier,
    /// Required in `X-Admin-Token` by the endpoints that change the
    /// configuration or reach CloudAEye on the caller's behalf.
    pub admin_token: Option<Secret>,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let config: NotifierConfig = toml::from_str(
            r#"
            tenant_key = "T123"
            token = "s3cret"
            "#,
        )
        .unwrap();
        assert_eq!(config.tenant_key, "T123");
        assert_eq!(config.token.expose(), "s3cret");
        assert_eq!(config.auth_scheme, AuthScheme::Basic);
        assert_eq!(config.endpoint_base(), DEFAULT_ENDPOINT_BASE);
        assert_eq!(config.max_log_lines, None);
    }

    #[test]
    fn parses_full_config() {
        let config: NotifierConfig = toml::from_str(
            r#"
            tenant_key = "T123"
            token = "s3cret"
            endpoint_base = "http://localhost:9000/v1"
            auth_scheme = "bearer"
            max_log_lines = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint_base(), "http://localhost:9000/v1");
        assert_eq!(config.auth_scheme, AuthScheme::Bearer);
        assert_eq!(config.max_log_lines, Some(500));
    }

    #[tokio::test]
    async fn zero_max_log_lines_is_rejected() {
        let path = std::env::temp_dir().join(format!(
            "cloudaeye-notifier-{}.toml",
            uuid::Uuid::now_v7()
        ));
        std::fs::write(&path, "max_log_lines = 0\n").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(err.to_string().contains("max_log_lines"));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_config_file_is_empty_config() {
        let config = load_config("/nonexistent/notifier_config.toml")
            .await
            .unwrap();
        assert_eq!(config, NotifierConfig::default());
    }
}
