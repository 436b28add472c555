//! Azure Resource Manager client for job credentials.
//!
//! Uses reqwest against `{endpoint}{credential id}?api-version={version}` with
//! Bearer token authentication.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::client::{ClientError, JobCredential, RemoteCredentialClient};
use crate::config::ProviderConfig;
use crate::id::CredentialId;
use crate::secret::Secret;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// HTTP implementation of [`RemoteCredentialClient`].
#[derive(Debug, Clone)]
pub struct ArmCredentialClient {
    client: Client,
    endpoint: String,
    api_version: String,
    token: Option<Secret>,
}

impl ArmCredentialClient {
    /// Create a client for the given endpoint.
    pub fn new(
        endpoint: impl Into<String>,
        api_version: impl Into<String>,
        token: Option<Secret>,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            token,
        }
    }

    /// Create a client from resolved provider configuration.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.api_version.clone(),
            config.access_token.clone(),
        )
    }

    /// The URL for a credential.
    pub fn url(&self, id: &CredentialId) -> String {
        format!("{}{}?api-version={}", self.endpoint, id, self.api_version)
    }

    fn request(&self, method: Method, id: &CredentialId) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, self.url(id));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token.expose());
        }
        req
    }

    async fn error_from(response: Response) -> ClientError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
            Ok(envelope) if !envelope.error.code.is_empty() => {
                format!("{}: {}", envelope.error.code, envelope.error.message)
            },
            Ok(envelope) => envelope.error.message,
            Err(_) => text,
        };

        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
            _ => ClientError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    async fn decode(response: Response) -> Result<JobCredential, ClientError> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(JobCredential::default());
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Deserialize(e.to_string()))
    }
}

#[async_trait]
impl RemoteCredentialClient for ArmCredentialClient {
    async fn get(&self, id: &CredentialId) -> Result<Option<JobCredential>, ClientError> {
        debug!(%id, "GET job credential");
        let response = self.request(Method::GET, id).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Self::decode(response).await.map(Some)
    }

    async fn create_or_update(
        &self,
        id: &CredentialId,
        payload: JobCredential,
    ) -> Result<JobCredential, ClientError> {
        debug!(%id, "PUT job credential");
        let response = self.request(Method::PUT, id).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }
        Self::decode(response).await
    }

    async fn delete(&self, id: &CredentialId) -> Result<(), ClientError> {
        debug!(%id, "DELETE job credential");
        let response = self.request(Method::DELETE, id).send().await?;

        match response.status() {
            StatusCode::NO_CONTENT => Err(ClientError::NotFound(format!(
                "{} did not exist when it was deleted",
                id
            ))),
            status if status.is_success() => Ok(()),
            _ => Err(Self::error_from(response).await),
        }
    }
}
