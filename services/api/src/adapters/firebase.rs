//! services/api/src/adapters/firebase.rs
//!
//! This module contains the adapter for the external identity provider.
//! It implements the `TokenVerifier` port by delegating bearer-token
//! verification to the provider's `accounts:lookup` endpoint; no token
//! parsing happens locally.

use async_trait::async_trait;
use careprep_core::domain::Identity;
use careprep_core::ports::{AuthError, TokenVerifier};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TokenVerifier` against Firebase Auth.
/// Without an API key it reports `NotConfigured` and the health endpoint
/// shows the provider as not ready.
#[derive(Clone)]
pub struct FirebaseVerifier {
    client: reqwest::Client,
    api_key: Option<String>,
    lookup_url: String,
}

impl FirebaseVerifier {
    /// Creates a new `FirebaseVerifier`.
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            lookup_url: LOOKUP_URL.to_string(),
        }
    }

    /// Points the adapter at a different lookup endpoint. Used in tests.
    #[allow(dead_code)]
    pub fn with_lookup_url(mut self, lookup_url: String) -> Self {
        self.lookup_url = lookup_url;
        self
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct LookupErrorResponse {
    #[serde(default)]
    error: LookupErrorBody,
}

#[derive(Deserialize, Default)]
struct LookupErrorBody {
    #[serde(default)]
    message: String,
}

//=========================================================================================
// `TokenVerifier` Trait Implementation
//=========================================================================================

#[async_trait]
impl TokenVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let api_key = self.api_key.as_ref().ok_or(AuthError::NotConfigured)?;

        let response = self
            .client
            .post(format!("{}?key={}", self.lookup_url, api_key))
            .timeout(LOOKUP_TIMEOUT)
            .json(&json!({ "idToken": token }))
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let body: LookupErrorResponse = response.json().await.unwrap_or(LookupErrorResponse {
                error: LookupErrorBody::default(),
            });
            // The provider encodes the failure reason in the error message.
            return if body.error.message.starts_with("TOKEN_EXPIRED") {
                Err(AuthError::ExpiredToken)
            } else {
                Err(AuthError::InvalidToken(body.error.message))
            };
        }

        let parsed: LookupResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let user = parsed
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::InvalidToken("no matching user".to_string()))?;

        Ok(Identity {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name,
        })
    }

    fn ready(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let verifier = FirebaseVerifier::new(reqwest::Client::new(), None);
        assert!(!verifier.ready());
        let result = verifier.verify("some-token").await;
        assert!(matches!(result, Err(AuthError::NotConfigured)));
    }
}
