//! Post-build notification step

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::credentials::{CredentialStore, FormValidation, check_tenant_key, check_token};
use crate::error::Result;
use crate::payload::PayloadBuilder;
use crate::run::{BuildResult, BuildRun};
use crate::sender::NotificationSender;

/// What happened to one notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    /// Export is switched off for this step.
    Disabled,
    /// The run result is not reported.
    Skipped { result: Option<BuildResult> },
    Delivered { status: u16, body: String },
    Rejected { status: u16, body: String },
    Failed { message: String },
}

/// Endpoint and auth scheme are read from the store on every call, so a
/// reloaded configuration applies to the next notification.
pub struct Notifier {
    store: Arc<CredentialStore>,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self {
            store,
            client: reqwest::Client::new(),
        }
    }

    /// Sender for the current configuration.
    pub async fn sender(&self) -> NotificationSender {
        NotificationSender::from_config(self.client.clone(), &self.store.config().await)
    }

    pub async fn perform(&self, run: &dyn BuildRun, enable_export: bool) -> Result<NotifyOutcome> {
        self.perform_at(run, enable_export, Utc::now()).await
    }

    /// Report `run` as finished at `now`.
    ///
    /// Payload assembly errors are returned; delivery problems are logged
    /// and reported as an outcome, never as an error.
    pub async fn perform_at(
        &self,
        run: &dyn BuildRun,
        enable_export: bool,
        now: DateTime<Utc>,
    ) -> Result<NotifyOutcome> {
        let number = run.number();
        info!("Received run notification for run : {}", number);

        if !enable_export {
            info!(
                "[#{}] Exporting to CloudAEye is not enabled. Skipping export",
                number
            );
            return Ok(NotifyOutcome::Disabled);
        }

        let result = run.result();
        if !result.is_some_and(BuildResult::is_notifiable) {
            info!(
                "[#{}] Build status is neither success nor failure. Further processing skipped",
                number
            );
            return Ok(NotifyOutcome::Skipped { result });
        }

        let config = self.store.config().await;
        let payload = PayloadBuilder::new()
            .with_max_log_lines(config.max_log_lines)
            .build(run, now)?;
        let body = payload.to_json()?;
        debug!("[#{}] Build details successfully captured : {}", number, body);

        for check in [
            check_tenant_key(&config.tenant_key),
            check_token(config.token.expose()),
        ] {
            if let FormValidation::Warning(msg) = check {
                warn!("[#{}] {}", number, msg);
            }
        }

        let sender = NotificationSender::from_config(self.client.clone(), &config);
        match sender.send(&body, &config.tenant_key, &config.token).await {
            Ok(response) if response.is_success() => {
                info!(
                    "[#{}] Success response received from CloudAEye endpoint : {}",
                    number, response.body
                );
                Ok(NotifyOutcome::Delivered {
                    status: response.status,
                    body: response.body,
                })
            }
            Ok(response) => {
                error!(
                    "[#{}] Error response received from CloudAEye endpoint ({}) : {}",
                    number, response.status, response.body
                );
                Ok(NotifyOutcome::Rejected {
                    status: response.status,
                    body: response.body,
                })
            }
            Err(e) => {
                error!(
                    "[#{}] Error while trying to send run details to CloudAEye : {}",
                    number, e
                );
                Ok(NotifyOutcome::Failed {
                    message: e.to_string(),
                })
            }
        }
    }
}
