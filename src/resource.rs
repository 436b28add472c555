//! The `azurerm_mssql_job_credential` resource.
//!
//! [`JobCredentialResource`] maps declared state onto the job credentials API:
//!
//! - **create** refuses to adopt an existing credential, writes it, records the ID
//!   and re-reads
//! - **read** projects the remote username into state and clears the ID when the
//!   credential is gone
//! - **update** patches only the changed fields onto the current remote object
//! - **delete** removes the credential; a missing credential is an error
//!
//! Passwords are write-only remotely and are never read back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::client::{JobCredential, JobCredentialProperties, RemoteCredentialClient};
use crate::config::ResourceTimeouts;
use crate::error::ProviderError;
use crate::id::{CredentialId, JobAgentId};
use crate::schema::{Attribute, Schema, Validator};
use crate::secret::Secret;
use crate::state::{DeclaredStateStore, ID_ATTRIBUTE};

/// Resource type name.
pub const RESOURCE_TYPE: &str = "azurerm_mssql_job_credential";

/// Attribute names.
pub mod attr {
    /// Credential name.
    pub const NAME: &str = "name";
    /// Parent job agent ID.
    pub const JOB_AGENT_ID: &str = "job_agent_id";
    /// Credential user name.
    pub const USERNAME: &str = "username";
    /// Plain password.
    pub const PASSWORD: &str = "password";
    /// Write-only password.
    pub const PASSWORD_WO: &str = "password_wo";
    /// Version marker for the write-only password.
    pub const PASSWORD_WO_VERSION: &str = "password_wo_version";
}

/// Schema of the resource.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Manages an Elastic Job Credential.")
        .with_attribute(
            ID_ATTRIBUTE,
            Attribute::computed_string().with_description("The ID of the Elastic Job Credential."),
        )
        .with_attribute(
            attr::NAME,
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::NotEmpty)
                .with_description("The name of the Elastic Job Credential."),
        )
        .with_attribute(
            attr::JOB_AGENT_ID,
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::JobAgentId)
                .with_description("The ID of the Elastic Job Agent."),
        )
        .with_attribute(
            attr::USERNAME,
            Attribute::required_string().with_description("The username part of the credential."),
        )
        .with_attribute(
            attr::PASSWORD,
            Attribute::optional_string()
                .sensitive()
                .conflicts_with([attr::PASSWORD_WO])
                .exactly_one_of([attr::PASSWORD, attr::PASSWORD_WO])
                .with_description("The password part of the credential."),
        )
        .with_attribute(
            attr::PASSWORD_WO,
            Attribute::optional_string()
                .write_only()
                .conflicts_with([attr::PASSWORD])
                .exactly_one_of([attr::PASSWORD_WO, attr::PASSWORD])
                .required_with([attr::PASSWORD_WO_VERSION])
                .with_description("The write-only password part of the credential."),
        )
        .with_attribute(
            attr::PASSWORD_WO_VERSION,
            Attribute::optional_int64()
                .required_with([attr::PASSWORD_WO])
                .with_description("Bump to push a new `password_wo` value."),
        )
}

/// Where the credential password comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    /// The sensitive `password` attribute, stored in state.
    Plain(Secret),
    /// The write-only `password_wo` attribute. `version` only signals that a new
    /// value was supplied and is never sent remotely.
    WriteOnly {
        /// The password.
        value: Secret,
        /// The user-asserted version marker.
        version: i64,
    },
}

impl PasswordSource {
    /// Resolve the password channel from declared state.
    pub fn from_state<D: DeclaredStateStore + ?Sized>(d: &D) -> Result<Self, ProviderError> {
        if let Some(value) = d.get_write_only(attr::PASSWORD_WO) {
            return Ok(Self::WriteOnly {
                value: Secret::new(value),
                version: d.get_int(attr::PASSWORD_WO_VERSION),
            });
        }
        let plain = d.get_string(attr::PASSWORD);
        if plain.is_empty() {
            return Err(ProviderError::Validation(format!(
                "exactly one of `{}` or `{}` must be specified",
                attr::PASSWORD,
                attr::PASSWORD_WO
            )));
        }
        Ok(Self::Plain(Secret::new(plain)))
    }

    /// The password to send.
    pub fn secret(&self) -> &Secret {
        match self {
            Self::Plain(secret) => secret,
            Self::WriteOnly { value, .. } => value,
        }
    }
}

/// Controller for job credentials.
pub struct JobCredentialResource<C: ?Sized> {
    client: Arc<C>,
    timeouts: ResourceTimeouts,
}

impl<C: RemoteCredentialClient + ?Sized> JobCredentialResource<C> {
    /// Create a controller using the given client and deadlines.
    pub fn new(client: Arc<C>, timeouts: ResourceTimeouts) -> Self {
        Self { client, timeouts }
    }

    /// The deadlines this controller applies.
    pub fn timeouts(&self) -> &ResourceTimeouts {
        &self.timeouts
    }

    /// Create the credential described by `d`, then read it back.
    #[instrument(skip(self, d), name = "job_credential.create")]
    pub async fn create<D>(&self, d: &mut D) -> Result<(), ProviderError>
    where
        D: DeclaredStateStore + Send + Sync,
    {
        info!("preparing arguments for job credential creation");

        let id = desired_id(d)?;
        let password = PasswordSource::from_state(d)?;
        let payload = JobCredential::new(
            id.credential_name.clone(),
            JobCredentialProperties {
                username: d.get_string(attr::USERNAME),
                password: password.secret().clone(),
            },
        );

        let operation = format!("creating {}", id);
        with_deadline(
            self.timeouts.create,
            &operation,
            self.create_remote(&id, payload, &operation),
        )
        .await?;

        d.set_id(id.id());
        info!(%id, "job credential created");

        self.read(d).await
    }

    async fn create_remote(
        &self,
        id: &CredentialId,
        payload: JobCredential,
        operation: &str,
    ) -> Result<(), ProviderError> {
        match self.client.get(id).await {
            Ok(None) => {},
            Err(e) if e.is_not_found() => {},
            Ok(Some(_)) => return Err(ProviderError::import_as_exists(RESOURCE_TYPE, &id.id())),
            Err(e) => {
                return Err(ProviderError::Remote(format!(
                    "checking for presence of existing {}: {}",
                    id, e
                )));
            },
        }

        self.client
            .create_or_update(id, payload)
            .await
            .map_err(|e| ProviderError::Remote(format!("{}: {}", operation, e)))?;
        Ok(())
    }

    /// Refresh `d` from the remote credential.
    ///
    /// A missing credential clears the ID and is not an error.
    #[instrument(skip(self, d), name = "job_credential.read")]
    pub async fn read<D>(&self, d: &mut D) -> Result<(), ProviderError>
    where
        D: DeclaredStateStore + Send + Sync,
    {
        let id = CredentialId::parse(d.id())?;

        let operation = format!("reading {}", id);
        let existing = with_deadline(self.timeouts.read, &operation, async {
            match self.client.get(&id).await {
                Ok(found) => Ok(found),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(ProviderError::Remote(format!("{}: {}", operation, e))),
            }
        })
        .await?;

        let Some(model) = existing else {
            warn!(%id, "job credential was not found, removing from state");
            d.clear_id();
            return Ok(());
        };

        d.set(attr::NAME, json!(id.credential_name));
        d.set(attr::JOB_AGENT_ID, json!(id.job_agent_id().id()));
        if let Some(props) = model.properties {
            d.set(attr::USERNAME, json!(props.username));
        }
        if let Some(version) = d.get(attr::PASSWORD_WO_VERSION).cloned() {
            d.set(attr::PASSWORD_WO_VERSION, version);
        }

        debug!(%id, "job credential read");
        Ok(())
    }

    /// Push the changed fields of `d` to the remote credential, then read it back.
    #[instrument(skip(self, d), name = "job_credential.update")]
    pub async fn update<D>(&self, d: &mut D) -> Result<(), ProviderError>
    where
        D: DeclaredStateStore + Send + Sync,
    {
        info!("preparing arguments for job credential update");

        let id = desired_id(d)?;

        let operation = format!("updating {}", id);
        with_deadline(
            self.timeouts.update,
            &operation,
            self.update_remote(&id, &*d, &operation),
        )
        .await?;

        info!(%id, "job credential updated");
        self.read(d).await
    }

    async fn update_remote<D>(
        &self,
        id: &CredentialId,
        d: &D,
        operation: &str,
    ) -> Result<(), ProviderError>
    where
        D: DeclaredStateStore + Send + Sync,
    {
        let mut payload = self
            .client
            .get(id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ProviderError::NotFound(format!("retrieving {}: {}", id, e))
                } else {
                    ProviderError::Remote(format!("retrieving {}: {}", id, e))
                }
            })?
            .ok_or_else(|| {
                ProviderError::NotFound(format!("retrieving {}: credential does not exist", id))
            })?;

        let props = payload.properties.as_mut().ok_or_else(|| {
            ProviderError::FailedPrecondition(format!(
                "retrieving {}: `model.properties` was nil",
                id
            ))
        })?;

        // Passwords never come back from a read, so only a changed one is sent.
        props.password = Secret::default();
        apply_changes(d, props);

        self.client
            .create_or_update(id, payload)
            .await
            .map_err(|e| ProviderError::Remote(format!("{}: {}", operation, e)))?;
        Ok(())
    }

    /// Delete the remote credential. Any failure, including not-found, is returned.
    #[instrument(skip(self, d), name = "job_credential.delete")]
    pub async fn delete<D>(&self, d: &mut D) -> Result<(), ProviderError>
    where
        D: DeclaredStateStore + Send + Sync,
    {
        let id = CredentialId::parse(d.id())?;

        let operation = format!("deleting {}", id);
        with_deadline(self.timeouts.delete, &operation, async {
            self.client.delete(&id).await.map_err(|e| {
                if e.is_not_found() {
                    ProviderError::NotFound(format!("{}: {}", operation, e))
                } else {
                    ProviderError::Remote(format!("{}: {}", operation, e))
                }
            })
        })
        .await?;

        d.clear_id();
        info!(%id, "job credential deleted");
        Ok(())
    }

    /// Adopt an existing credential by its resource ID.
    ///
    /// The ID is validated before any remote call; a credential that does not exist
    /// cannot be imported.
    #[instrument(skip(self, d), name = "job_credential.import")]
    pub async fn import<D>(&self, import_id: &str, d: &mut D) -> Result<(), ProviderError>
    where
        D: DeclaredStateStore + Send + Sync,
    {
        let id = CredentialId::parse(import_id)?;
        d.set_id(id.id());
        self.read(d).await?;

        if d.id().is_empty() {
            return Err(ProviderError::NotFound(format!(
                "cannot import non-existent remote object {}",
                id
            )));
        }
        Ok(())
    }
}

fn desired_id<D: DeclaredStateStore + ?Sized>(d: &D) -> Result<CredentialId, ProviderError> {
    let job_agent_id = JobAgentId::parse(&d.get_string(attr::JOB_AGENT_ID))?;
    let name = d.get_string(attr::NAME);
    if name.is_empty() {
        return Err(ProviderError::Validation(format!("`{}` must not be empty", attr::NAME)));
    }
    if name.contains('/') {
        return Err(ProviderError::Validation(format!(
            "`{}` must not contain '/', got {:?}",
            attr::NAME,
            name
        )));
    }
    let id = job_agent_id.credential(name);
    // The handle stored in state must parse back to the same credential.
    CredentialId::parse(&id.id())?;
    Ok(id)
}

/// Copy changed fields onto the remote properties.
///
/// The write-only password cannot be diffed, so its version marker decides.
fn apply_changes<D: DeclaredStateStore + ?Sized>(d: &D, props: &mut JobCredentialProperties) {
    if d.has_change(attr::USERNAME) {
        props.username = d.get_string(attr::USERNAME);
    }

    if d.has_change(attr::PASSWORD) {
        props.password = Secret::new(d.get_string(attr::PASSWORD));
    }

    if d.has_change(attr::PASSWORD_WO_VERSION) {
        if let Some(value) = d.get_write_only(attr::PASSWORD_WO) {
            props.password = Secret::new(value);
        }
    }
}

async fn with_deadline<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::DeadlineExceeded(format!(
            "{} did not finish within {:?}",
            operation, limit
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceData;
    use crate::testing::{FailOn, InMemoryCredentialClient};
    use serde_json::Value;
    use tokio_test::{assert_err, assert_ok};

    const AGENT: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Sql/servers/sql1/jobAgents/agent1";

    fn state_for(id: &CredentialId, username: &str) -> Value {
        json!({
            ID_ATTRIBUTE: id.id(),
            attr::NAME: id.credential_name,
            attr::JOB_AGENT_ID: id.job_agent_id().id(),
            attr::USERNAME: username,
        })
    }

    fn credential_id() -> CredentialId {
        JobAgentId::parse(AGENT).unwrap().credential("cred1")
    }

    fn controller(client: &Arc<InMemoryCredentialClient>) -> JobCredentialResource<InMemoryCredentialClient> {
        JobCredentialResource::new(Arc::clone(client), ResourceTimeouts::default())
    }

    fn plain_create_data() -> ResourceData {
        let planned = json!({
            "name": "cred1",
            "job_agent_id": AGENT,
            "username": "admin",
            "password": "p@ss",
        });
        ResourceData::new(&schema())
            .with_planned(planned.clone())
            .unwrap()
            .with_config(planned)
            .unwrap()
    }

    fn write_only_data(prior: Value, version: i64, password_wo: &str) -> ResourceData {
        let planned = json!({
            "id": credential_id().id(),
            "name": "cred1",
            "job_agent_id": AGENT,
            "username": "admin",
            "password_wo_version": version,
        });
        let mut config = planned.clone();
        config["password_wo"] = json!(password_wo);
        ResourceData::new(&schema())
            .with_prior(prior)
            .unwrap()
            .with_planned(planned)
            .unwrap()
            .with_config(config)
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_read_yields_username() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let mut d = plain_create_data();
        assert_ok!(resource.create(&mut d).await);

        assert_eq!(d.id(), credential_id().id());
        assert_eq!(d.get_string("username"), "admin");
        assert_eq!(client.password_of(&credential_id()).as_deref(), Some("p@ss"));
        assert_eq!(client.write_count(), 1);

        // A fresh read projects no password at all.
        let mut fresh = ResourceData::new(&schema())
            .with_state(json!({"id": credential_id().id()}))
            .unwrap();
        assert_ok!(resource.read(&mut fresh).await);
        let state = fresh.into_state().unwrap();
        assert_eq!(state["username"], "admin");
        assert_eq!(state["name"], "cred1");
        assert_eq!(state["job_agent_id"], AGENT);
        assert!(state.get("password").is_none());
        assert!(state.get("password_wo").is_none());
    }

    #[tokio::test]
    async fn test_create_with_write_only_password() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let mut d = write_only_data(Value::Null, 1, "wo-secret");
        d.set_id(String::new());
        assert_ok!(resource.create(&mut d).await);

        assert_eq!(client.password_of(&credential_id()).as_deref(), Some("wo-secret"));
        let state = d.into_state().unwrap();
        assert_eq!(state["password_wo_version"], 1);
        assert!(state.get("password_wo").is_none());
    }

    #[tokio::test]
    async fn test_create_on_existing_conflicts_without_writing() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "someone", "theirs");
        let resource = controller(&client);

        let mut d = plain_create_data();
        let err = assert_err!(resource.create(&mut d).await);

        assert!(matches!(err, ProviderError::AlreadyExists(_)));
        assert_eq!(client.write_count(), 0);
        assert_eq!(client.password_of(&credential_id()).as_deref(), Some("theirs"));
        assert!(d.id().is_empty());
    }

    #[tokio::test]
    async fn test_create_lookup_failure_is_fatal() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.fail_next(FailOn::Get, 500, "boom");
        let resource = controller(&client);

        let err = assert_err!(resource.create(&mut plain_create_data()).await);
        assert!(matches!(err, ProviderError::Remote(_)));
        assert!(err.message().contains("checking for presence of existing"));
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn test_create_with_invalid_parent_makes_no_calls() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let planned = json!({
            "name": "cred1",
            "job_agent_id": "/subscriptions/sub/resourceGroups/rg",
            "username": "admin",
            "password": "p",
        });
        let mut d = ResourceData::new(&schema()).with_planned(planned).unwrap();

        let err = assert_err!(resource.create(&mut d).await);
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_slash_in_name_makes_no_calls() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let planned = json!({
            "name": "a/b",
            "job_agent_id": AGENT,
            "username": "admin",
            "password": "p",
        });
        let mut d = ResourceData::new(&schema()).with_planned(planned).unwrap();

        let err = assert_err!(resource.create(&mut d).await);
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(client.calls().is_empty());
        assert!(d.id().is_empty());
    }

    #[tokio::test]
    async fn test_create_without_password_makes_no_calls() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let planned = json!({"name": "cred1", "job_agent_id": AGENT, "username": "admin"});
        let mut d = ResourceData::new(&schema()).with_planned(planned).unwrap();

        let err = assert_err!(resource.create(&mut d).await);
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_absent_clears_state() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let mut d = ResourceData::new(&schema())
            .with_state(state_for(&credential_id(), "admin"))
            .unwrap();
        assert_ok!(resource.read(&mut d).await);
        assert!(d.id().is_empty());
        assert!(d.into_state().is_none());
    }

    #[tokio::test]
    async fn test_read_other_failure_is_fatal() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "admin", "p");
        client.fail_next(FailOn::Get, 503, "unavailable");
        let resource = controller(&client);

        let mut d = ResourceData::new(&schema())
            .with_state(state_for(&credential_id(), "admin"))
            .unwrap();
        let err = assert_err!(resource.read(&mut d).await);
        assert!(err.message().starts_with("reading "));
        assert_eq!(d.id(), credential_id().id());
    }

    #[tokio::test]
    async fn test_read_rejects_malformed_id() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let mut d = ResourceData::new(&schema())
            .with_state(json!({"id": "/subscriptions/sub"}))
            .unwrap();
        let err = assert_err!(resource.read(&mut d).await);
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_picks_up_drifted_username() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "changed-elsewhere", "p");
        let resource = controller(&client);

        let mut d = ResourceData::new(&schema())
            .with_state(state_for(&credential_id(), "admin"))
            .unwrap();
        assert_ok!(resource.read(&mut d).await);
        assert_eq!(d.get_string("username"), "changed-elsewhere");
    }

    #[tokio::test]
    async fn test_update_username_only_keeps_password() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "admin", "original");
        let resource = controller(&client);

        let prior = json!({
            "id": credential_id().id(),
            "name": "cred1",
            "job_agent_id": AGENT,
            "username": "admin",
            "password": "original",
        });
        let mut planned = prior.clone();
        planned["username"] = json!("operator");

        let mut d = ResourceData::new(&schema())
            .with_prior(prior)
            .unwrap()
            .with_planned(planned.clone())
            .unwrap()
            .with_config(planned)
            .unwrap();
        assert_ok!(resource.update(&mut d).await);

        assert_eq!(d.get_string("username"), "operator");
        assert_eq!(client.password_of(&credential_id()).as_deref(), Some("original"));
        let sent = client.last_payload().unwrap();
        assert!(sent.properties.unwrap().password.is_empty());
    }

    #[tokio::test]
    async fn test_update_plain_password() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "admin", "original");
        let resource = controller(&client);

        let mut prior = state_for(&credential_id(), "admin");
        prior["password"] = json!("original");
        let mut planned = prior.clone();
        planned["password"] = json!("rotated");

        let mut d = ResourceData::new(&schema())
            .with_prior(prior)
            .unwrap()
            .with_planned(planned)
            .unwrap();
        assert_ok!(resource.update(&mut d).await);

        assert_eq!(client.password_of(&credential_id()).as_deref(), Some("rotated"));
    }

    #[tokio::test]
    async fn test_update_version_bump_replaces_write_only_password_once() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "admin", "same-value");
        let resource = controller(&client);

        let mut prior = state_for(&credential_id(), "admin");
        prior["password_wo_version"] = json!(1);
        // The write-only value is identical; only the version moved.
        let mut d = write_only_data(prior, 2, "same-value");
        assert_ok!(resource.update(&mut d).await);

        let password_writes: Vec<_> = client
            .payloads()
            .into_iter()
            .filter(|p| p.properties.as_ref().is_some_and(|props| !props.password.is_empty()))
            .collect();
        assert_eq!(password_writes.len(), 1);
        assert_eq!(
            password_writes[0].properties.as_ref().unwrap().password.expose(),
            "same-value"
        );
        assert_eq!(d.get_int("password_wo_version"), 2);
    }

    #[tokio::test]
    async fn test_update_without_version_bump_ignores_write_only_password() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "admin", "first");
        let resource = controller(&client);

        let mut prior = state_for(&credential_id(), "admin");
        prior["password_wo_version"] = json!(1);
        let mut d = write_only_data(prior, 1, "second");
        assert_ok!(resource.update(&mut d).await);

        assert_eq!(client.password_of(&credential_id()).as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_update_missing_remote_is_fatal() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let prior = state_for(&credential_id(), "admin");
        let mut planned = prior.clone();
        planned["username"] = json!("other");
        let mut d = ResourceData::new(&schema())
            .with_prior(prior)
            .unwrap()
            .with_planned(planned)
            .unwrap();

        let err = assert_err!(resource.update(&mut d).await);
        assert!(matches!(err, ProviderError::NotFound(_)));
        assert_eq!(client.write_count(), 0);
        assert_eq!(d.id(), credential_id().id());
    }

    #[tokio::test]
    async fn test_update_lookup_not_found_error_is_not_found() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "admin", "p");
        client.fail_next(FailOn::Get, 404, "gone");
        let resource = controller(&client);

        let prior = state_for(&credential_id(), "admin");
        let mut planned = prior.clone();
        planned["username"] = json!("other");
        let mut d = ResourceData::new(&schema())
            .with_prior(prior)
            .unwrap()
            .with_planned(planned)
            .unwrap();

        let err = assert_err!(resource.update(&mut d).await);
        assert!(matches!(err, ProviderError::NotFound(_)));
        assert!(err.message().starts_with("retrieving "));
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_malformed_remote_is_fatal() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert_raw(&credential_id(), JobCredential::default());
        let resource = controller(&client);

        let mut d = ResourceData::new(&schema())
            .with_state(state_for(&credential_id(), "admin"))
            .unwrap();
        let err = assert_err!(resource.update(&mut d).await);
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
        assert_eq!(client.write_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_existing() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "admin", "p");
        let resource = controller(&client);

        let mut d = ResourceData::new(&schema())
            .with_state(state_for(&credential_id(), "admin"))
            .unwrap();
        assert_ok!(resource.delete(&mut d).await);
        assert!(d.id().is_empty());
        assert!(!client.contains(&credential_id()));
    }

    #[tokio::test]
    async fn test_delete_absent_is_fatal() {
        let client = Arc::new(InMemoryCredentialClient::new());
        let resource = controller(&client);

        let mut d = ResourceData::new(&schema())
            .with_state(state_for(&credential_id(), "admin"))
            .unwrap();
        let err = assert_err!(resource.delete(&mut d).await);
        assert!(matches!(err, ProviderError::NotFound(_)));
        assert!(err.message().starts_with("deleting "));
        assert_eq!(d.id(), credential_id().id());
    }

    #[tokio::test]
    async fn test_import_existing_and_missing() {
        let client = Arc::new(InMemoryCredentialClient::new());
        client.insert(&credential_id(), "admin", "p");
        let resource = controller(&client);

        let mut d = ResourceData::new(&schema());
        assert_ok!(resource.import(&credential_id().id(), &mut d).await);
        assert_eq!(d.get_string("username"), "admin");

        let missing = JobAgentId::parse(AGENT).unwrap().credential("nope");
        let mut d = ResourceData::new(&schema());
        let err = assert_err!(resource.import(&missing.id(), &mut d).await);
        assert!(matches!(err, ProviderError::NotFound(_)));

        let mut d = ResourceData::new(&schema());
        let err = assert_err!(resource.import("garbage", &mut d).await);
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let client = Arc::new(InMemoryCredentialClient::new().with_latency(Duration::from_millis(500)));
        let timeouts = ResourceTimeouts {
            create: Duration::from_millis(20),
            ..ResourceTimeouts::default()
        };
        let resource = JobCredentialResource::new(Arc::clone(&client), timeouts);

        let err = assert_err!(resource.create(&mut plain_create_data()).await);
        assert!(matches!(err, ProviderError::DeadlineExceeded(_)));
        assert!(err.message().starts_with("creating "));
    }

    #[test]
    fn test_password_source() {
        let d = ResourceData::new(&schema())
            .with_planned(json!({"password": "plain"}))
            .unwrap();
        assert_eq!(
            PasswordSource::from_state(&d).unwrap(),
            PasswordSource::Plain(Secret::new("plain"))
        );

        let d = write_only_data(Value::Null, 4, "wo");
        let source = PasswordSource::from_state(&d).unwrap();
        assert_eq!(
            source,
            PasswordSource::WriteOnly {
                value: Secret::new("wo"),
                version: 4
            }
        );
        assert_eq!(source.secret().expose(), "wo");
    }

    #[test]
    fn test_schema_shape() {
        let schema = schema();
        let forced: Vec<&str> = schema.force_new_attributes().collect();
        assert_eq!(forced, vec!["job_agent_id", "name"]);
        assert!(schema.attribute("password").unwrap().flags.sensitive);
        assert!(schema.attribute("password_wo").unwrap().flags.write_only);
    }
}
