//! Subscription access gate.
//!
//! The backend is the only authority on access. Anything other than an
//! explicit `has_access: true` denies, and every call is bounded by a timeout.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::AccessConfig;

pub const TIMEOUT_MESSAGE: &str = "Timed out while checking access.";
pub const TRANSPORT_MESSAGE: &str = "Failed to check access.";
pub const BACKEND_MESSAGE: &str = "Failed to check access (backend).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessStatus {
    #[default]
    Idle,
    Checking,
    Granted,
    Denied,
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Access backend is not configured")]
    NotConfigured,
    #[error("Request timed out")]
    Timeout,
    #[error("Backend answered with HTTP {0}")]
    Status(u16),
    #[error("Backend answered with an unreadable body")]
    MalformedBody,
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("{0}")]
    Backend(String),
    #[error("Backend did not return a checkout URL")]
    MissingUrl,
}

impl From<reqwest::Error> for GateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GateError::Timeout
        } else if err.is_decode() {
            GateError::MalformedBody
        } else {
            GateError::Transport(err.to_string())
        }
    }
}

impl GateError {
    /// Short message shown next to the paywall
    pub fn user_message(&self) -> String {
        match self {
            GateError::Timeout => TIMEOUT_MESSAGE.to_string(),
            GateError::Transport(_) | GateError::NotConfigured => TRANSPORT_MESSAGE.to_string(),
            GateError::Status(_) | GateError::MalformedBody => BACKEND_MESSAGE.to_string(),
            GateError::Backend(message) => message.clone(),
            GateError::MissingUrl => self.to_string(),
        }
    }
}

#[async_trait]
pub trait AccessGateway: Send + Sync {
    async fn has_access(&self, email: &str) -> Result<bool, GateError>;

    /// Start a hosted checkout and return the URL to send the user to
    async fn create_checkout_session(
        &self,
        email: &str,
        price_id: &str,
        return_url: &str,
    ) -> Result<String, GateError>;

    /// Ask the backend to settle a finished checkout
    async fn checkout_status(&self, session_id: &str) -> Result<(), GateError>;
}

/// Decode the `/access` body. Only a literal `true` grants.
pub fn interpret_access_body(body: &str) -> Result<bool, GateError> {
    let value: Value = serde_json::from_str(body).map_err(|_| GateError::MalformedBody)?;
    match value {
        Value::Object(map) => Ok(map.get("has_access") == Some(&Value::Bool(true))),
        _ => Err(GateError::MalformedBody),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest<'a> {
    email: &'a str,
    price_id: &'a str,
    return_url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct CheckoutResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpAccessGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpAccessGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GateError> {
        Self::with_client(Client::new(), base_url, timeout)
    }

    pub fn with_client(client: Client, base_url: &str, timeout: Duration) -> Result<Self, GateError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(GateError::NotConfigured);
        }
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &AccessConfig) -> Result<Self, GateError> {
        Self::new(&config.backend_url, Duration::from_secs(config.timeout_secs))
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, GateError>
    where
        F: Future<Output = Result<T, GateError>> + Send,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| GateError::Timeout)?
    }
}

#[async_trait]
impl AccessGateway for HttpAccessGateway {
    async fn has_access(&self, email: &str) -> Result<bool, GateError> {
        let url = format!("{}/access", self.base_url);
        self.bounded(async {
            let resp = self
                .client
                .get(&url)
                .query(&[("email", email)])
                .header("Accept", "application/json")
                .send()
                .await?;

            let status = resp.status();
            let body = resp.text().await?;
            if !status.is_success() {
                return Err(GateError::Status(status.as_u16()));
            }
            interpret_access_body(&body)
        })
        .await
    }

    async fn create_checkout_session(
        &self,
        email: &str,
        price_id: &str,
        return_url: &str,
    ) -> Result<String, GateError> {
        let url = format!("{}/create-checkout-session", self.base_url);
        let request = CheckoutRequest {
            email,
            price_id,
            return_url,
        };
        self.bounded(async {
            let resp = self
                .client
                .post(&url)
                .header("Accept", "application/json")
                .json(&request)
                .send()
                .await?;

            let status = resp.status();
            let body = resp.text().await?;
            let parsed: CheckoutResponse = serde_json::from_str(&body).unwrap_or_default();

            if !status.is_success() {
                return Err(GateError::Backend(
                    parsed
                        .error
                        .unwrap_or_else(|| "Failed to start checkout.".to_string()),
                ));
            }
            parsed.url.filter(|u| !u.is_empty()).ok_or(GateError::MissingUrl)
        })
        .await
    }

    async fn checkout_status(&self, session_id: &str) -> Result<(), GateError> {
        let url = format!("{}/checkout-status", self.base_url);
        self.bounded(async {
            let resp = self
                .client
                .get(&url)
                .query(&[("session_id", session_id)])
                .header("Accept", "application/json")
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(GateError::Status(status.as_u16()));
            }
            Ok(())
        })
        .await
    }
}

/// Access state for the current session
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    status: AccessStatus,
    error: Option<String>,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> AccessStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_granted(&self) -> bool {
        self.status == AccessStatus::Granted
    }

    /// Ask the backend and record the outcome; failures deny
    pub async fn check(&mut self, gateway: &dyn AccessGateway, email: &str) -> bool {
        self.status = AccessStatus::Checking;
        self.error = None;

        match gateway.has_access(email).await {
            Ok(true) => self.status = AccessStatus::Granted,
            Ok(false) => self.status = AccessStatus::Denied,
            Err(e) => {
                log::warn!("gate: access check for {} failed: {}", email, e);
                self.status = AccessStatus::Denied;
                self.error = Some(e.user_message());
            }
        }
        self.is_granted()
    }

    /// Returning from checkout: settle the session, then check again
    pub async fn confirm_checkout(
        &mut self,
        gateway: &dyn AccessGateway,
        session_id: &str,
        email: &str,
    ) -> bool {
        if let Err(e) = gateway.checkout_status(session_id).await {
            log::warn!("gate: checkout status for {} failed: {}", session_id, e);
        }
        self.check(gateway, email).await
    }
}
