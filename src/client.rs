//! Remote API surface for job agent credentials.
//!
//! [`RemoteCredentialClient`] is the seam between the resource controller and the
//! cloud API. [`crate::http::ArmCredentialClient`] talks to Azure Resource
//! Manager; [`crate::testing::InMemoryCredentialClient`] backs the tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::CredentialId;
use crate::secret::Secret;

/// Errors returned by a [`RemoteCredentialClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// Failed to deserialize response
    #[error("Deserialization error: {0}")]
    Deserialize(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl ClientError {
    /// Whether the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status, .. } => *status == 404,
            _ => false,
        }
    }
}

/// Properties of a job credential.
///
/// The password is write-only on the remote side: it is sent on create and
/// update but never returned by a read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCredentialProperties {
    /// The credential user name.
    pub username: String,
    /// The credential password. Empty means "leave unchanged".
    #[serde(default, skip_serializing_if = "Secret::is_empty")]
    pub password: Secret,
}

/// A job credential as exchanged with the remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCredential {
    /// Fully qualified resource ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resource type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Resource properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<JobCredentialProperties>,
}

impl JobCredential {
    /// Build a create/update payload.
    pub fn new(name: impl Into<String>, properties: JobCredentialProperties) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            resource_type: None,
            properties: Some(properties),
        }
    }
}

/// Operations the remote store offers for job credentials.
#[async_trait]
pub trait RemoteCredentialClient: Send + Sync {
    /// Fetch a credential. A missing credential is `Ok(None)`, not an error.
    async fn get(&self, id: &CredentialId) -> Result<Option<JobCredential>, ClientError>;

    /// Create the credential or replace its properties.
    async fn create_or_update(
        &self,
        id: &CredentialId,
        payload: JobCredential,
    ) -> Result<JobCredential, ClientError>;

    /// Delete the credential. Deleting a missing credential is an error.
    async fn delete(&self, id: &CredentialId) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_shape() {
        let payload = JobCredential::new(
            "cred1",
            JobCredentialProperties {
                username: "admin".to_string(),
                password: Secret::new("p@ss"),
            },
        );
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({"name": "cred1", "properties": {"username": "admin", "password": "p@ss"}})
        );
    }

    #[test]
    fn test_empty_password_is_omitted() {
        let props = JobCredentialProperties {
            username: "admin".to_string(),
            password: Secret::default(),
        };
        let value = serde_json::to_value(&props).unwrap();
        assert_eq!(value, json!({"username": "admin"}));
    }

    #[test]
    fn test_read_response_without_password() {
        let body = json!({
            "id": "/subscriptions/s/resourceGroups/r/providers/Microsoft.Sql/servers/v/jobAgents/a/credentials/c",
            "name": "c",
            "type": "Microsoft.Sql/servers/jobAgents/credentials",
            "properties": {"username": "admin"}
        });
        let cred: JobCredential = serde_json::from_value(body).unwrap();
        assert_eq!(cred.name.as_deref(), Some("c"));
        let props = cred.properties.unwrap();
        assert_eq!(props.username, "admin");
        assert!(props.password.is_empty());
    }

    #[test]
    fn test_is_not_found() {
        assert!(ClientError::NotFound("x".into()).is_not_found());
        assert!(ClientError::Api {
            status: 404,
            message: "gone".into()
        }
        .is_not_found());
        assert!(!ClientError::Api {
            status: 500,
            message: "boom".into()
        }
        .is_not_found());
        assert!(!ClientError::Unauthorized("no".into()).is_not_found());
    }
}
