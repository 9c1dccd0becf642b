//! Delivery of payloads to the CloudAEye webhook endpoint

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use crate::credentials::Secret;
use crate::error::Result;
use crate::{AuthScheme, DEFAULT_ENDPOINT_BASE, NotifierConfig};

/// Raw response of the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResponse {
    pub status: u16,
    pub body: String,
}

impl NotificationResponse {
    /// The endpoint answers 200 on acceptance; anything else is a failure.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[derive(Debug, Clone)]
pub struct NotificationSender {
    client: reqwest::Client,
    endpoint_base: String,
    auth_scheme: AuthScheme,
}

impl Default for NotificationSender {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT_BASE, AuthScheme::default())
    }
}

impl NotificationSender {
    pub fn new(endpoint_base: impl Into<String>, auth_scheme: AuthScheme) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint_base, auth_scheme)
    }

    /// Reuse an existing client (and its connection pool).
    pub fn with_client(
        client: reqwest::Client,
        endpoint_base: impl Into<String>,
        auth_scheme: AuthScheme,
    ) -> Self {
        Self {
            client,
            endpoint_base: endpoint_base.into(),
            auth_scheme,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &NotifierConfig) -> Self {
        Self::with_client(client, config.endpoint_base(), config.auth_scheme)
    }

    /// Webhook URL for the given tenant.
    pub fn endpoint(&self, tenant_key: &str) -> String {
        format!(
            "{}/tenants/{}/jenkins/process-build",
            self.endpoint_base.trim_end_matches('/'),
            tenant_key
        )
    }

    fn authorization(&self, token: &Secret) -> String {
        match self.auth_scheme {
            AuthScheme::Basic => format!("Basic {}", token.expose()),
            AuthScheme::Bearer => format!("Bearer {}", token.expose()),
        }
    }

    /// POST `payload` once. Only transport failures are errors; the status
    /// is left to the caller.
    pub async fn send(
        &self,
        payload: &str,
        tenant_key: &str,
        token: &Secret,
    ) -> Result<NotificationResponse> {
        let url = self.endpoint(tenant_key);
        debug!("Sending captured build details to CloudAEye : {}", tenant_key);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.authorization(token))
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(NotificationResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_for_tenant() {
        let sender = NotificationSender::default();
        assert_eq!(
            sender.endpoint("T123"),
            "https://api.cloudaeye.com/rca/test/v1/tenants/T123/jenkins/process-build"
        );
    }

    #[test]
    fn endpoint_ignores_trailing_slash_in_base() {
        let sender = NotificationSender::new("http://localhost:9000/v1/", AuthScheme::Basic);
        assert_eq!(
            sender.endpoint("T1"),
            "http://localhost:9000/v1/tenants/T1/jenkins/process-build"
        );
    }

    #[test]
    fn authorization_header_carries_token_verbatim() {
        let token = Secret::new("abc:def");
        let basic = NotificationSender::default();
        assert_eq!(basic.authorization(&token), "Basic abc:def");
        let bearer = NotificationSender::new(DEFAULT_ENDPOINT_BASE, AuthScheme::Bearer);
        assert_eq!(bearer.authorization(&token), "Bearer abc:def");
    }

    #[test]
    fn from_config_follows_endpoint_and_scheme() {
        let config = NotifierConfig {
            endpoint_base: Some("http://staging:9000/v1".to_string()),
            auth_scheme: AuthScheme::Bearer,
            ..Default::default()
        };
        let sender = NotificationSender::from_config(reqwest::Client::new(), &config);
        assert_eq!(
            sender.endpoint("T1"),
            "http://staging:9000/v1/tenants/T1/jenkins/process-build"
        );
        assert_eq!(sender.authorization(&Secret::new("t")), "Bearer t");
    }

    #[test]
    fn only_200_is_success() {
        let ok = NotificationResponse { status: 200, body: String::new() };
        let created = NotificationResponse { status: 201, body: String::new() };
        assert!(ok.is_success());
        assert!(!created.is_success());
    }
}
