//! Tenant credentials: storage, form validation and the connectivity check

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::sender::NotificationSender;
use crate::{NotifierConfig, load_config};

/// A secret string. Never printed through `Debug` or `Display`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Snapshot of the tenant credentials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub tenant_key: String,
    pub token: Secret,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.tenant_key.is_empty() && !self.token.is_empty()
    }
}

/// Result of validating a form field or running the connectivity test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum FormValidation {
    Ok(Option<String>),
    Warning(String),
    Error(String),
}

impl FormValidation {
    pub fn ok() -> Self {
        FormValidation::Ok(None)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FormValidation::Ok(_))
    }
}

pub fn check_tenant_key(tenant_key: &str) -> FormValidation {
    if tenant_key.is_empty() {
        return FormValidation::Warning("Please specify a valid tenant key".to_string());
    }
    FormValidation::ok()
}

pub fn check_token(token: &str) -> FormValidation {
    if token.is_empty() {
        return FormValidation::Warning("Please provide a valid token".to_string());
    }
    FormValidation::ok()
}

/// Sends `{"ping": true}` to the tenant endpoint. Only HTTP 200 counts as success.
pub async fn test_connection(
    sender: &NotificationSender,
    tenant_key: &str,
    token: &Secret,
) -> FormValidation {
    let ping = json!({ "ping": true }).to_string();
    debug!("[#{}] Ping payload : {}", tenant_key, ping);

    match sender.send(&ping, tenant_key, token).await {
        Ok(response) if response.is_success() => {
            info!("[#{}] Ping successful", tenant_key);
            FormValidation::Ok(Some("Connection successful!".to_string()))
        }
        Ok(response) => {
            info!("[#{}] Ping failed : {}", tenant_key, response.body);
            FormValidation::Error(format!(
                "Connection failed! Got response: {}",
                response.body
            ))
        }
        Err(e) => {
            info!(
                "[#{}] Error while trying to ping CloudAEye webhook endpoint : {}",
                tenant_key, e
            );
            FormValidation::Error(format!(
                "Error while trying to ping CloudAEye webhook endpoint : {}",
                e
            ))
        }
    }
}

/// Persistent holder of the notifier configuration, credentials included.
///
/// Every setter saves the file immediately. Reads take a shared lock and
/// return a snapshot, so a notification never observes a half-written update.
pub struct CredentialStore {
    path: PathBuf,
    config: RwLock<NotifierConfig>,
}

impl CredentialStore {
    /// Load the store from `path`. A missing file starts empty.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = load_config(&path).await?;
        let store = Self::with_config(path, config);
        store.warn_if_incomplete().await;
        Ok(store)
    }

    /// Build a store around an already-loaded configuration.
    pub fn with_config(path: impl Into<PathBuf>, config: NotifierConfig) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(config),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> Credentials {
        let config = self.config.read().await;
        Credentials {
            tenant_key: config.tenant_key.clone(),
            token: config.token.clone(),
        }
    }

    pub async fn config(&self) -> NotifierConfig {
        self.config.read().await.clone()
    }

    pub async fn set_tenant_key(&self, tenant_key: impl Into<String>) -> Result<()> {
        self.update(Some(tenant_key.into()), None).await
    }

    pub async fn set_token(&self, token: impl Into<Secret>) -> Result<()> {
        self.update(None, Some(token.into())).await
    }

    /// Apply the given fields and persist. The in-memory configuration only
    /// changes once the file has been written.
    pub async fn update(&self, tenant_key: Option<String>, token: Option<Secret>) -> Result<()> {
        let mut config = self.config.write().await;
        let mut updated = config.clone();
        if let Some(tenant_key) = tenant_key {
            updated.tenant_key = tenant_key;
        }
        if let Some(token) = token {
            updated.token = token;
        }
        Self::save_locked(&self.path, &updated).await?;
        *config = updated;
        Ok(())
    }

    /// Write the current configuration back to disk.
    pub async fn save(&self) -> Result<()> {
        let config = self.config.read().await;
        Self::save_locked(&self.path, &config).await
    }

    /// Re-read the file, replacing the in-memory configuration.
    pub async fn reload(&self) -> Result<()> {
        let fresh = load_config(&self.path).await?;
        *self.config.write().await = fresh;
        info!("Configuration reloaded from {:?}", self.path);
        Ok(())
    }

    async fn save_locked(path: &Path, config: &NotifierConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = toml::to_string(config)?;
        tokio::fs::write(path, content).await?;
        restrict_permissions(path).await?;
        debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    async fn warn_if_incomplete(&self) {
        let credentials = self.get().await;
        if let FormValidation::Warning(msg) = check_tenant_key(&credentials.tenant_key) {
            warn!("{}", msg);
        }
        if let FormValidation::Warning(msg) = check_token(credentials.token.expose()) {
            warn!("{}", msg);
        }
    }
}

/// The file holds the token, so only the owner may read it.
#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("cloudaeye-notifier-{}", uuid::Uuid::now_v7()))
            .join("notifier_config.toml")
    }

    #[test]
    fn secret_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "Secret(****)");
        assert_eq!(secret.to_string(), "****");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn field_checks() {
        assert_eq!(
            check_tenant_key(""),
            FormValidation::Warning("Please specify a valid tenant key".to_string())
        );
        assert_eq!(
            check_token(""),
            FormValidation::Warning("Please provide a valid token".to_string())
        );
        assert!(check_tenant_key("T123").is_ok());
        assert!(check_token("abc").is_ok());
    }

    #[test]
    fn form_validation_json_shape() {
        let value = serde_json::to_value(FormValidation::Warning("w".to_string())).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "warning", "message": "w"}));
    }

    #[tokio::test]
    async fn setters_persist_to_disk() {
        let path = temp_config_path();
        let store = CredentialStore::load(&path).await.unwrap();
        assert_eq!(store.get().await, Credentials::default());

        store.set_tenant_key("T123").await.unwrap();
        store.set_token("s3cret").await.unwrap();

        let reopened = CredentialStore::load(&path).await.unwrap();
        let credentials = reopened.get().await;
        assert_eq!(credentials.tenant_key, "T123");
        assert_eq!(credentials.token.expose(), "s3cret");
        assert!(credentials.is_complete());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn explicit_save_writes_loaded_config() {
        let path = temp_config_path();
        let store = CredentialStore::with_config(
            &path,
            NotifierConfig {
                tenant_key: "T9".to_string(),
                token: Secret::new("t"),
                max_log_lines: Some(100),
                ..Default::default()
            },
        );
        store.save().await.unwrap();
        let reopened = CredentialStore::load(&path).await.unwrap();
        assert_eq!(reopened.config().await, store.config().await);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn update_keeps_unspecified_fields() {
        let path = temp_config_path();
        let store = CredentialStore::with_config(
            &path,
            NotifierConfig {
                tenant_key: "T1".to_string(),
                token: Secret::new("old"),
                ..Default::default()
            },
        );
        store.update(None, Some(Secret::new("new"))).await.unwrap();
        let credentials = store.get().await;
        assert_eq!(credentials.tenant_key, "T1");
        assert_eq!(credentials.token.expose(), "new");

        std::fs::write(&path, "tenant_key = \"T2\"\n").unwrap();
        store.reload().await.unwrap();
        assert_eq!(store.get().await.tenant_key, "T2");
        assert!(store.get().await.token.is_empty());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn failed_save_leaves_config_untouched() {
        let blocker =
            std::env::temp_dir().join(format!("cloudaeye-notifier-{}", uuid::Uuid::now_v7()));
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = CredentialStore::with_config(
            blocker.join("notifier_config.toml"),
            NotifierConfig {
                tenant_key: "T1".to_string(),
                token: Secret::new("old"),
                ..Default::default()
            },
        );

        assert!(
            store
                .update(Some("T2".to_string()), Some(Secret::new("new")))
                .await
                .is_err()
        );
        let credentials = store.get().await;
        assert_eq!(credentials.tenant_key, "T1");
        assert_eq!(credentials.token.expose(), "old");

        let _ = std::fs::remove_file(&blocker);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_config_path();
        let store = CredentialStore::load(&path).await.unwrap();
        store.set_token("s3cret").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
