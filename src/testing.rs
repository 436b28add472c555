//! Testing utilities for the provider.
//!
//! - [`InMemoryCredentialClient`] is a fake [`RemoteCredentialClient`] that keeps
//!   credentials in memory, records every call and can inject failures.
//! - [`ProviderTester`] drives a [`ProviderService`] through whole resource
//!   lifecycles without a host.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use azurerm_mssql_job_credential::testing::{InMemoryCredentialClient, ProviderTester};
//! use azurerm_mssql_job_credential::MssqlProvider;
//!
//! #[tokio::test]
//! async fn test_create_credential() {
//!     let client = Arc::new(InMemoryCredentialClient::new());
//!     let tester = ProviderTester::new(MssqlProvider::with_client(client.clone()));
//!
//!     let state = tester
//!         .lifecycle_create("azurerm_mssql_job_credential", config)
//!         .await
//!         .unwrap();
//!     assert_eq!(state["username"], "admin");
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{ClientError, JobCredential, JobCredentialProperties, RemoteCredentialClient};
use crate::error::ProviderError;
use crate::id::CredentialId;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::secret::Secret;
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Remote operation a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    /// `get`
    Get,
    /// `create_or_update`
    CreateOrUpdate,
    /// `delete`
    Delete,
}

/// A call recorded by [`InMemoryCredentialClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `get(id)`
    Get(String),
    /// `create_or_update(id, payload)`
    CreateOrUpdate {
        /// Target ID.
        id: String,
        /// Payload as sent.
        payload: JobCredential,
    },
    /// `delete(id)`
    Delete(String),
}

#[derive(Default)]
struct Inner {
    credentials: BTreeMap<String, JobCredential>,
    calls: Vec<Call>,
    failures: Vec<(FailOn, u16, String)>,
}

/// In-memory job credential store with the remote API's semantics.
///
/// Passwords are stored but never returned by `get`, and a payload without a
/// password leaves the stored one untouched.
#[derive(Default)]
pub struct InMemoryCredentialClient {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl InMemoryCredentialClient {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a credential as if it had been created out of band.
    pub fn insert(&self, id: &CredentialId, username: &str, password: &str) {
        self.insert_raw(
            id,
            JobCredential {
                id: Some(id.id()),
                name: Some(id.credential_name.clone()),
                resource_type: Some("Microsoft.Sql/servers/jobAgents/credentials".to_string()),
                properties: Some(JobCredentialProperties {
                    username: username.to_string(),
                    password: Secret::new(password),
                }),
            },
        );
    }

    /// Seed an arbitrary remote object.
    pub fn insert_raw(&self, id: &CredentialId, credential: JobCredential) {
        self.lock().credentials.insert(id.id(), credential);
    }

    /// Whether a credential exists.
    pub fn contains(&self, id: &CredentialId) -> bool {
        self.lock().credentials.contains_key(&id.id())
    }

    /// The stored password, which `get` never reveals.
    pub fn password_of(&self, id: &CredentialId) -> Option<String> {
        self.lock()
            .credentials
            .get(&id.id())
            .and_then(|c| c.properties.as_ref())
            .map(|p| p.password.expose().to_string())
    }

    /// Make the next call of `op` fail with the given HTTP status.
    pub fn fail_next(&self, op: FailOn, status: u16, message: &str) {
        self.lock().failures.push((op, status, message.to_string()));
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Payloads of every `create_or_update` call.
    pub fn payloads(&self) -> Vec<JobCredential> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::CreateOrUpdate { payload, .. } => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recent `create_or_update` payload.
    pub fn last_payload(&self) -> Option<JobCredential> {
        self.payloads().pop()
    }

    /// Number of `create_or_update` calls.
    pub fn write_count(&self) -> usize {
        self.payloads().len()
    }

    async fn enter(&self, call: Call, op: FailOn) -> Result<(), ClientError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.lock();
        inner.calls.push(call);
        if let Some(pos) = inner.failures.iter().position(|(o, _, _)| *o == op) {
            let (_, status, message) = inner.failures.remove(pos);
            return Err(if status == 404 {
                ClientError::NotFound(message)
            } else {
                ClientError::Api { status, message }
            });
        }
        Ok(())
    }
}

fn without_password(mut credential: JobCredential) -> JobCredential {
    if let Some(props) = credential.properties.as_mut() {
        props.password = Secret::default();
    }
    credential
}

#[async_trait]
impl RemoteCredentialClient for InMemoryCredentialClient {
    async fn get(&self, id: &CredentialId) -> Result<Option<JobCredential>, ClientError> {
        self.enter(Call::Get(id.id()), FailOn::Get).await?;
        Ok(self
            .lock()
            .credentials
            .get(&id.id())
            .cloned()
            .map(without_password))
    }

    async fn create_or_update(
        &self,
        id: &CredentialId,
        payload: JobCredential,
    ) -> Result<JobCredential, ClientError> {
        self.enter(
            Call::CreateOrUpdate {
                id: id.id(),
                payload: payload.clone(),
            },
            FailOn::CreateOrUpdate,
        )
        .await?;

        let mut inner = self.lock();
        let previous_password = inner
            .credentials
            .get(&id.id())
            .and_then(|c| c.properties.as_ref())
            .map(|p| p.password.clone())
            .unwrap_or_default();

        let mut props = payload.properties.unwrap_or_default();
        if props.password.is_empty() {
            props.password = previous_password;
        }

        let stored = JobCredential {
            id: Some(id.id()),
            name: Some(id.credential_name.clone()),
            resource_type: Some("Microsoft.Sql/servers/jobAgents/credentials".to_string()),
            properties: Some(props),
        };
        inner.credentials.insert(id.id(), stored.clone());
        Ok(without_password(stored))
    }

    async fn delete(&self, id: &CredentialId) -> Result<(), ClientError> {
        self.enter(Call::Delete(id.id()), FailOn::Delete).await?;
        match self.lock().credentials.remove(&id.id()) {
            Some(_) => Ok(()),
            None => Err(ClientError::NotFound(format!("{} does not exist", id))),
        }
    }
}

/// A test harness for provider implementations.
///
/// Wraps a [`ProviderService`] and runs plan/apply sequences the way a host would.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Run validate → plan → create → read. Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, config.clone())
            .await?;
        let plan = self.plan_create(resource_type, config.clone()).await?;
        let created = self
            .provider
            .create(resource_type, plan.planned_state, config)
            .await?;
        self.read_existing(resource_type, created).await
    }

    /// Run validate → plan → update → read. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, config.clone())
            .await?;
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config.clone())
            .await?;
        let updated = self
            .provider
            .update(resource_type, prior_state, plan.planned_state, config)
            .await?;
        self.read_existing(resource_type, updated).await
    }

    async fn read_existing(&self, resource_type: &str, state: Value) -> Result<Value, TestError> {
        self.read(resource_type, state).await?.ok_or_else(|| {
            TestError::Provider(ProviderError::NotFound(
                "resource disappeared right after apply".to_string(),
            ))
        })
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| d.is_error() && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}
