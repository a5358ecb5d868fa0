//! HTTP transport shared by every domain adapter.
//!
//! All requests go through [`TransportClient`], which attaches the bearer
//! credential held in [`AuthContext`] and maps failures into the [`ApiError`]
//! taxonomy. A 401 from the backend clears the credential and fires the
//! registered unauthorized hook before surfacing `ApiError::Unauthorized`.

use crate::error::{ApiError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

type UnauthorizedHook = Box<dyn Fn() + Send + Sync>;

/// Process-wide credential and base-URL state.
///
/// Set once on login success, cleared on 401 or explicit logout. Adapters
/// receive it injected via the transport client; nothing else writes to it.
pub struct AuthContext {
    base_url: String,
    credential: RwLock<Option<String>>,
    on_unauthorized: RwLock<Option<UnauthorizedHook>>,
}

impl AuthContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential: RwLock::new(None),
            on_unauthorized: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_credential(&self, token: impl Into<String>) {
        let mut cred = self.credential.write().expect("credential lock poisoned");
        *cred = Some(token.into());
    }

    pub fn clear_credential(&self) {
        let mut cred = self.credential.write().expect("credential lock poisoned");
        *cred = None;
    }

    pub fn credential(&self) -> Option<String> {
        self.credential
            .read()
            .expect("credential lock poisoned")
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.credential().is_some()
    }

    /// Registers the side effect to run when the backend answers 401
    /// (typically: navigate to the login view).
    pub fn set_unauthorized_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        let mut slot = self.on_unauthorized.write().expect("hook lock poisoned");
        *slot = Some(Box::new(hook));
    }

    fn handle_unauthorized(&self) {
        warn!("Backend rejected credential, clearing it");
        self.clear_credential();
        if let Some(hook) = self.on_unauthorized.read().expect("hook lock poisoned").as_ref() {
            hook();
        }
    }
}

/// Thin wrapper over `reqwest::Client` with typed JSON helpers.
#[derive(Clone)]
pub struct TransportClient {
    client: reqwest::Client,
    auth: Arc<AuthContext>,
}

impl TransportClient {
    pub fn new(auth: Arc<AuthContext>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::network(e.to_string()))?;

        Ok(Self { client, auth })
    }

    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.auth.base_url().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send(&self, mut builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        if let Some(token) = self.auth.credential() {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.auth.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_server_message(&body)
                .unwrap_or_else(|| format!("Server responded with status code: {}", status));
            info!("Request failed with status {}: {}", status, message);
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        // Read the raw text first so a shape mismatch can report what arrived
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response body: {}", e)))?;

        serde_json::from_str::<T>(&text).map_err(|e| {
            debug!("Undecodable response body: {}", text);
            ApiError::decoding(format!("{} - Response was: {}", e, text))
        })
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let builder = self.client.get(self.url(path)).query(query);
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let builder = self.client.post(self.url(path)).json(body);
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.client.post(self.url(path));
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let builder = self.client.post(self.url(path)).form(form);
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let builder = self.client.put(self.url(path)).json(body);
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    pub async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let builder = self.client.patch(self.url(path)).json(body);
        let response = self.send(builder).await?;
        Self::decode(response).await
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.client.delete(self.url(path));
        let response = self.send(builder).await?;
        Self::decode(response).await
    }
}

/// Pulls a human-readable message out of an error body when the backend
/// supplied one (`{"detail": ...}` or `{"message": ...}`).
fn extract_server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message"] {
        if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
            return Some(msg.to_string());
        }
    }
    None
}
