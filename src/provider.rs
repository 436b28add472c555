//! The Azure SQL provider.
//!
//! [`MssqlProvider`] implements [`ProviderService`] for a single resource type,
//! `azurerm_mssql_job_credential`. Each call builds a [`ResourceData`] from the
//! JSON the host sends, hands it to [`JobCredentialResource`] and converts the
//! result back into state.

use std::sync::{Arc, RwLock};

use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};

use crate::client::RemoteCredentialClient;
use crate::config::{ProviderConfig, ResourceTimeouts, ACCESS_TOKEN_ENV};
use crate::error::ProviderError;
use crate::http::ArmCredentialClient;
use crate::resource::{self, JobCredentialResource, RESOURCE_TYPE};
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::state::{ResourceData, ID_ATTRIBUTE};
use crate::types::{AttributeChange, ImportedResource, PlanResult, SENSITIVE_PLACEHOLDER};

/// Provider serving `azurerm_mssql_job_credential`.
pub struct MssqlProvider {
    client: RwLock<Option<Arc<dyn RemoteCredentialClient>>>,
    timeouts: RwLock<ResourceTimeouts>,
    injected: bool,
}

impl Default for MssqlProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MssqlProvider {
    /// Create an unconfigured provider. `configure` builds the HTTP client.
    pub fn new() -> Self {
        Self {
            client: RwLock::new(None),
            timeouts: RwLock::new(ResourceTimeouts::default()),
            injected: false,
        }
    }

    /// Create a provider backed by the given client.
    ///
    /// `configure` still applies timeouts but keeps this client.
    pub fn with_client(client: Arc<dyn RemoteCredentialClient>) -> Self {
        Self {
            client: RwLock::new(Some(client)),
            timeouts: RwLock::new(ResourceTimeouts::default()),
            injected: true,
        }
    }

    /// The deadlines currently in effect.
    pub fn timeouts(&self) -> Result<ResourceTimeouts, ProviderError> {
        self.timeouts
            .read()
            .map(|t| *t)
            .map_err(|_| ProviderError::Sdk("provider timeouts lock poisoned".to_string()))
    }

    fn controller(&self) -> Result<JobCredentialResource<dyn RemoteCredentialClient>, ProviderError> {
        let client = self
            .client
            .read()
            .map_err(|_| ProviderError::Sdk("provider client lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| {
                ProviderError::FailedPrecondition(
                    "the provider has not been configured".to_string(),
                )
            })?;
        Ok(JobCredentialResource::new(client, self.timeouts()?))
    }

    fn provider_schema() -> Schema {
        Schema::v0()
            .with_description("Azure SQL provider.")
            .with_attribute(
                "endpoint",
                Attribute::optional_string().with_description("Azure Resource Manager endpoint."),
            )
            .with_attribute(
                "access_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("Bearer token for Azure Resource Manager."),
            )
            .with_attribute(
                "api_version",
                Attribute::optional_string().with_description("Job credentials API version."),
            )
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == RESOURCE_TYPE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn display_value(attr: &Attribute, value: &Value) -> Value {
    if attr.flags.sensitive {
        json!(SENSITIVE_PLACEHOLDER)
    } else {
        value.clone()
    }
}

fn as_object(value: Value, what: &str) -> Result<Map<String, Value>, ProviderError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::Validation(format!(
            "expected {} to be an object, got {}",
            what, other
        ))),
    }
}

#[async_trait::async_trait]
impl ProviderService for MssqlProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(Self::provider_schema())
            .with_resource(RESOURCE_TYPE, resource::schema())
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = if config.is_null() {
            Vec::new()
        } else {
            self.validate_provider_config(config.clone()).await?
        };
        if diagnostics.iter().any(Diagnostic::is_error) {
            return Ok(diagnostics);
        }

        let resolved = match ProviderConfig::from_value(&config) {
            Ok(resolved) => resolved,
            Err(e) => {
                diagnostics.push(
                    Diagnostic::error("Invalid provider configuration").with_detail(e.message()),
                );
                return Ok(diagnostics);
            },
        };

        *self
            .timeouts
            .write()
            .map_err(|_| ProviderError::Sdk("provider timeouts lock poisoned".to_string()))? =
            resolved.timeouts;

        if !self.injected {
            if resolved.access_token.is_none() {
                warn!("no access token configured");
                diagnostics.push(
                    Diagnostic::warning("No access token configured")
                        .with_detail(format!(
                            "Requests will be sent unauthenticated. Set `access_token` or {}.",
                            ACCESS_TOKEN_ENV
                        ))
                        .with_attribute("access_token"),
                );
            }
            let client: Arc<dyn RemoteCredentialClient> =
                Arc::new(ArmCredentialClient::from_config(&resolved));
            *self
                .client
                .write()
                .map_err(|_| ProviderError::Sdk("provider client lock poisoned".to_string()))? =
                Some(client);
        }

        info!(endpoint = %resolved.endpoint, api_version = %resolved.api_version, "provider configured");
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        check_resource_type(resource_type)?;
        let schema = resource::schema();
        let prior = as_object(prior_state.unwrap_or(Value::Null), "prior state")?;

        if proposed_state.is_null() {
            let changes = schema
                .attributes
                .iter()
                .filter(|(_, attr)| !attr.flags.write_only)
                .filter_map(|(name, attr)| {
                    non_null(prior.get(name))
                        .map(|before| AttributeChange::removed(name, display_value(attr, before)))
                })
                .collect();
            return Ok(PlanResult::with_changes(Value::Null, changes, false));
        }

        let mut planned = as_object(proposed_state, "proposed state")?;
        for (name, attr) in &schema.attributes {
            if attr.flags.write_only {
                planned.insert(name.clone(), Value::Null);
            }
        }
        if let Some(id) = non_null(prior.get(ID_ATTRIBUTE)) {
            planned.insert(ID_ATTRIBUTE.to_string(), id.clone());
        }

        let mut changes = Vec::new();
        let mut requires_replace = false;
        for (name, attr) in &schema.attributes {
            if attr.flags.write_only || name == ID_ATTRIBUTE {
                continue;
            }
            let before = non_null(prior.get(name));
            let after = non_null(planned.get(name));
            if before == after {
                continue;
            }
            if before.is_some() && attr.force_new {
                requires_replace = true;
            }
            changes.push(AttributeChange::new(
                name.clone(),
                before.map(|v| display_value(attr, v)),
                after.map(|v| display_value(attr, v)),
            ));
        }

        let planned = Value::Object(planned);
        if changes.is_empty() {
            Ok(PlanResult::no_change(planned))
        } else {
            Ok(PlanResult::with_changes(planned, changes, requires_replace))
        }
    }

    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let resource = self.controller()?;

        let mut d = ResourceData::new(&resource::schema())
            .with_planned(planned_state)?
            .with_config(config)?;
        resource.create(&mut d).await?;

        d.into_state().ok_or_else(|| {
            ProviderError::NotFound("job credential disappeared right after creation".to_string())
        })
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Option<Value>, ProviderError> {
        check_resource_type(resource_type)?;
        let resource = self.controller()?;

        let mut d = ResourceData::new(&resource::schema()).with_state(current_state)?;
        resource.read(&mut d).await?;
        Ok(d.into_state())
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let resource = self.controller()?;

        let mut d = ResourceData::new(&resource::schema())
            .with_prior(prior_state)?
            .with_planned(planned_state)?
            .with_config(config)?;
        resource.update(&mut d).await?;

        d.into_state().ok_or_else(|| {
            ProviderError::NotFound("job credential disappeared right after update".to_string())
        })
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        check_resource_type(resource_type)?;
        let resource = self.controller()?;

        let mut d = ResourceData::new(&resource::schema()).with_state(current_state)?;
        resource.delete(&mut d).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        check_resource_type(resource_type)?;
        let resource = self.controller()?;

        let mut d = ResourceData::new(&resource::schema());
        resource.import(id, &mut d).await?;

        let state = d.into_state().ok_or_else(|| {
            ProviderError::NotFound(format!("cannot import non-existent remote object {}", id))
        })?;
        Ok(vec![ImportedResource::new(RESOURCE_TYPE, state)])
    }
}
