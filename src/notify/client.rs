//! GC Notify style email client
//!
//! Each request is authenticated with a short-lived HS256 JWT whose issuer is
//! the service id embedded in the API key. The key has the form
//! `<name>-<service_id>-<secret>`, where service id and secret are both
//! 36-character UUIDs.

use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::Notifier;
use crate::types::{Result, WorkerError};

const UUID_LEN: usize = 36;

/// JWT claims expected by the notification API
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    iat: u64,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
    email_address: &'a str,
    template_id: &'a str,
    personalisation: &'a Value,
}

#[derive(Deserialize)]
struct EmailResponse {
    id: String,
}

/// Service id and secret split out of an API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    pub service_id: String,
    secret: String,
}

impl ApiKey {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        // `-<service_id>-<secret>` at minimum
        if !raw.is_ascii() || raw.len() < 2 * UUID_LEN + 1 {
            return Err(WorkerError::Config("Notification API key is malformed".into()));
        }

        let secret = &raw[raw.len() - UUID_LEN..];
        let service_id = &raw[raw.len() - 2 * UUID_LEN - 1..raw.len() - UUID_LEN - 1];
        if raw.as_bytes()[raw.len() - UUID_LEN - 1] != b'-' {
            return Err(WorkerError::Config("Notification API key is malformed".into()));
        }

        Ok(Self {
            service_id: service_id.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Bearer token valid for this request
    pub fn token(&self) -> Result<String> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| WorkerError::Internal(format!("System time error: {}", e)))?
            .as_secs();

        let claims = Claims {
            iss: self.service_id.clone(),
            iat,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| WorkerError::Notification(format!("Failed to sign token: {}", e)))
    }
}

/// HTTP client for the notification API
pub struct NotifyClient {
    client: reqwest::Client,
    base_url: String,
    key: ApiKey,
}

impl NotifyClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WorkerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: ApiKey::parse(api_key)?,
        })
    }
}

#[async_trait]
impl Notifier for NotifyClient {
    async fn send_email(&self, email: &str, template_id: &str, personalisation: &Value) -> Result<String> {
        let endpoint = format!("{}/v2/notifications/email", self.base_url);
        let body = EmailRequest {
            email_address: email,
            template_id,
            personalisation,
        };

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(self.key.token()?)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WorkerError::Notification(format!(
                "Notification API returned {}: {}",
                status.as_u16(),
                message
            )));
        }

        let receipt: EmailResponse = resp.json().await?;
        Ok(receipt.id)
    }
}
