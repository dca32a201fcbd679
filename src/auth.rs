use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Verified claims of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("identity verification is not configured")]
    NotConfigured,
    #[error("identity service unavailable: {0:#}")]
    Unavailable(anyhow::Error),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError>;
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Verifies Firebase ID tokens through the Identity Toolkit `accounts:lookup` endpoint.
#[derive(Debug, Clone)]
pub struct FirebaseIdentityVerifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FirebaseIdentityVerifier {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_IDENTITY_BASE_URL.to_owned());
        Ok(Self {
            client: crate::http::client_with_timeout(timeout)
                .context("build identity http client")?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        })
    }

    fn lookup_endpoint(&self) -> String {
        format!("{}/accounts:lookup", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

#[async_trait]
impl IdentityVerifier for FirebaseIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, VerifyError> {
        let endpoint = self.lookup_endpoint();
        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "idToken": token }))
            .send()
            .await
            .with_context(|| format!("POST {endpoint}"))
            .map_err(VerifyError::Unavailable)?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .context("read identity response body")
            .map_err(VerifyError::Unavailable)?;

        // The lookup endpoint answers 400 for expired, revoked or malformed tokens.
        if status == reqwest::StatusCode::BAD_REQUEST {
            let reason = parse_error_message(&raw).unwrap_or_else(|| "rejected".to_owned());
            return Err(VerifyError::InvalidCredential(reason));
        }
        if !status.is_success() {
            return Err(VerifyError::Unavailable(anyhow::anyhow!(
                "identity service error ({status})"
            )));
        }

        let parsed: LookupResponse = serde_json::from_str(&raw)
            .context("parse identity response")
            .map_err(VerifyError::Unavailable)?;
        let user = parsed
            .users
            .into_iter()
            .next()
            .ok_or_else(|| VerifyError::InvalidCredential("no user for token".to_owned()))?;

        Ok(Identity {
            uid: user.local_id,
            email: user.email,
            email_verified: user.email_verified,
        })
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

/// Stand-in used when no Firebase API key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredVerifier;

#[async_trait]
impl IdentityVerifier for UnconfiguredVerifier {
    async fn verify(&self, _token: &str) -> Result<Identity, VerifyError> {
        Err(VerifyError::NotConfigured)
    }
}
