//! Error types for the job credential provider.

use thiserror::Error;

use crate::id::IdError;

/// Errors that can occur while managing a resource.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal SDK error occurred.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The resource already exists and has to be imported to be managed.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// Operation timed out.
    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Operation failed due to current state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// The remote API rejected or failed a call.
    #[error("Remote error: {0}")]
    Remote(String),
}

impl ProviderError {
    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Sdk(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::AlreadyExists(msg) => msg,
            Self::DeadlineExceeded(msg) => msg,
            Self::FailedPrecondition(msg) => msg,
            Self::Remote(msg) => msg,
        }
    }

    /// The error returned when creating a resource that is already present remotely.
    ///
    /// The message tells the operator how to bring the object under management.
    ///
    /// # Examples
    ///
    /// ```
    /// use azurerm_mssql_job_credential::ProviderError;
    ///
    /// let err = ProviderError::import_as_exists("azurerm_mssql_job_credential", "/subscriptions/x");
    /// assert!(err.message().contains("needs to be imported"));
    /// ```
    pub fn import_as_exists(resource_type: &str, id: &str) -> Self {
        Self::AlreadyExists(format!(
            "a resource with the ID {:?} already exists - to be managed via this provider \
             this resource needs to be imported into the State. Please see the resource \
             documentation for {:?} for more information",
            id, resource_type
        ))
    }
}

impl From<IdError> for ProviderError {
    fn from(err: IdError) -> Self {
        Self::Validation(err.to_string())
    }
}
