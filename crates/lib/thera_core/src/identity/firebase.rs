//! Firebase Authentication via the Identity Toolkit REST API.
//!
//! `accounts:lookup` takes a Firebase ID token and returns the account it
//! belongs to; an invalid or expired token is answered with 400.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{IdentityError, IdentityProvider, VerifiedIdentity};

pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    provider_user_info: Vec<ProviderInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderInfo {
    provider_id: String,
}

impl AccountInfo {
    fn into_identity(self) -> VerifiedIdentity {
        // Federated providers win over "password" when an account has both.
        let provider = self
            .provider_user_info
            .iter()
            .map(|p| p.provider_id.as_str())
            .find(|id| *id == "google.com" || *id == "apple.com")
            .or_else(|| self.provider_user_info.first().map(|p| p.provider_id.as_str()))
            .unwrap_or_default()
            .to_string();
        VerifiedIdentity {
            provider_user_id: self.local_id,
            email: self.email,
            email_verified: self.email_verified,
            name: self.display_name,
            provider,
        }
    }
}

/// [`IdentityProvider`] backed by Firebase Authentication.
#[derive(Debug, Clone)]
pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: impl Into<String>) -> Result<Self, IdentityError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(IdentityError::Config("FIREBASE_API_KEY is required".into()));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IdentityError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        if credential.is_empty() {
            return Err(IdentityError::InvalidCredential("empty ID token".into()));
        }

        let url = format!("{}/accounts:lookup", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest {
                id_token: credential,
            })
            .send()
            .await
            .map_err(|e| IdentityError::Provider(e.to_string()))?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            debug!(%status, body, "Firebase rejected ID token");
            return Err(IdentityError::InvalidCredential(format!("lookup failed: {status}")));
        }
        if !status.is_success() {
            return Err(IdentityError::Provider(format!("lookup failed: {status}")));
        }

        let data: LookupResponse = resp
            .json()
            .await
            .map_err(|e| IdentityError::Provider(format!("response parse error: {e}")))?;
        data.users
            .into_iter()
            .next()
            .map(AccountInfo::into_identity)
            .ok_or_else(|| IdentityError::InvalidCredential("no account for ID token".into()))
    }
}
