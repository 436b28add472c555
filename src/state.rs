//! Declared state for a single resource instance.
//!
//! [`DeclaredStateStore`] is the view a resource controller has of the user's
//! configuration and the last-known remote state: typed getters, change
//! detection against the prior state, access to write-only values, and the durable
//! resource handle. [`ResourceData`] is the JSON-backed implementation used by the
//! provider.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::schema::Schema;

/// Attribute name holding the durable resource handle.
pub const ID_ATTRIBUTE: &str = "id";

/// Read/write access to a resource instance's declared state.
pub trait DeclaredStateStore {
    /// The durable resource handle. Empty when the resource does not exist.
    fn id(&self) -> &str;

    /// Record the durable resource handle. An empty handle marks the resource as gone.
    fn set_id(&mut self, id: String);

    /// The current value of an attribute.
    fn get(&self, field: &str) -> Option<&Value>;

    /// Set the value of an attribute.
    fn set(&mut self, field: &str, value: Value);

    /// Whether the attribute differs between the prior state and the desired state.
    fn has_change(&self, field: &str) -> bool;

    /// A write-only value from configuration. These are never persisted.
    fn get_write_only(&self, field: &str) -> Option<&str>;

    /// The attribute as a string, or an empty string when unset.
    fn get_string(&self, field: &str) -> String {
        self.get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// The attribute as an integer, or zero when unset.
    fn get_int(&self, field: &str) -> i64 {
        self.get(field).and_then(Value::as_i64).unwrap_or_default()
    }

    /// Clear the durable handle.
    fn clear_id(&mut self) {
        self.set_id(String::new());
    }
}

/// JSON-backed [`DeclaredStateStore`].
///
/// - `prior` is the state recorded after the last successful apply
/// - `planned` is the desired state and is mutated by `set`
/// - `config` is the raw configuration, the only place write-only values live
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    prior: Map<String, Value>,
    planned: Map<String, Value>,
    config: Map<String, Value>,
    write_only: BTreeSet<String>,
}

impl ResourceData {
    /// Create empty data for a resource with the given schema.
    pub fn new(schema: &Schema) -> Self {
        Self {
            write_only: schema
                .attributes
                .iter()
                .filter(|(_, attr)| attr.flags.write_only)
                .map(|(name, _)| name.clone())
                .collect(),
            ..Default::default()
        }
    }

    /// Attach the prior state. Its `id` becomes the durable handle.
    pub fn with_prior(mut self, prior: Value) -> Result<Self, ProviderError> {
        self.prior = into_object(prior, "prior state")?;
        if let Some(id) = self.prior.get(ID_ATTRIBUTE).and_then(Value::as_str) {
            self.id = id.to_string();
        }
        Ok(self)
    }

    /// Attach the desired state. An `id` in it overrides the one from the prior state.
    pub fn with_planned(mut self, planned: Value) -> Result<Self, ProviderError> {
        self.planned = into_object(planned, "planned state")?;
        if let Some(id) = self.planned.get(ID_ATTRIBUTE).and_then(Value::as_str) {
            if !id.is_empty() {
                self.id = id.to_string();
            }
        }
        Ok(self)
    }

    /// Attach the raw configuration.
    pub fn with_config(mut self, config: Value) -> Result<Self, ProviderError> {
        self.config = into_object(config, "configuration")?;
        Ok(self)
    }

    /// Attach existing state as both prior and desired, as read and delete see it.
    pub fn with_state(self, state: Value) -> Result<Self, ProviderError> {
        self.with_prior(state.clone())?.with_planned(state)
    }

    /// Convert into the state to persist.
    ///
    /// Returns `None` when the handle has been cleared. Write-only attributes are
    /// always dropped.
    pub fn into_state(self) -> Option<Value> {
        if self.id.is_empty() {
            return None;
        }
        let mut state = self.planned;
        for name in &self.write_only {
            state.remove(name);
        }
        state.insert(ID_ATTRIBUTE.to_string(), Value::String(self.id));
        Some(Value::Object(state))
    }
}

impl DeclaredStateStore for ResourceData {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn get(&self, field: &str) -> Option<&Value> {
        match self.planned.get(field) {
            None | Some(Value::Null) => self.config.get(field).filter(|v| !v.is_null()),
            some => some,
        }
    }

    fn set(&mut self, field: &str, value: Value) {
        self.planned.insert(field.to_string(), value);
    }

    fn has_change(&self, field: &str) -> bool {
        normalize(self.prior.get(field)) != normalize(self.planned.get(field))
    }

    fn get_write_only(&self, field: &str) -> Option<&str> {
        self.config.get(field).and_then(Value::as_str)
    }
}

fn normalize(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn into_object(value: Value, what: &str) -> Result<Map<String, Value>, ProviderError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ProviderError::Validation(format!(
            "expected {} to be an object, got {}",
            what, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("username", Attribute::required_string())
            .with_attribute("password_wo", Attribute::optional_string().write_only())
    }

    #[test]
    fn test_has_change_against_prior() {
        let data = ResourceData::new(&schema())
            .with_prior(json!({"id": "x", "username": "old", "password_wo_version": 1}))
            .unwrap()
            .with_planned(json!({"username": "new", "password_wo_version": 1}))
            .unwrap();

        assert!(data.has_change("username"));
        assert!(!data.has_change("password_wo_version"));
        assert_eq!(data.id(), "x");
    }

    #[test]
    fn test_null_and_missing_are_equal() {
        let data = ResourceData::new(&schema())
            .with_prior(json!({"password": null}))
            .unwrap()
            .with_planned(json!({}))
            .unwrap();
        assert!(!data.has_change("password"));
    }

    #[test]
    fn test_write_only_value_comes_from_config() {
        let data = ResourceData::new(&schema())
            .with_planned(json!({"username": "u", "password_wo": null}))
            .unwrap()
            .with_config(json!({"username": "u", "password_wo": "s3cret"}))
            .unwrap();

        assert_eq!(data.get_write_only("password_wo"), Some("s3cret"));
        assert_eq!(data.get_write_only("username"), Some("u"));
        assert_eq!(data.get_write_only("missing"), None);
    }

    #[test]
    fn test_into_state_drops_write_only_and_sets_id() {
        let mut data = ResourceData::new(&schema())
            .with_planned(json!({"username": "u", "password_wo": "leak?"}))
            .unwrap();
        data.set_id("/the/id".to_string());

        let state = data.into_state().unwrap();
        assert_eq!(state["id"], "/the/id");
        assert_eq!(state["username"], "u");
        assert!(state.get("password_wo").is_none());
    }

    #[test]
    fn test_cleared_id_means_no_state() {
        let mut data = ResourceData::new(&schema())
            .with_state(json!({"id": "/the/id", "username": "u"}))
            .unwrap();
        data.clear_id();
        assert!(data.into_state().is_none());
    }

    #[test]
    fn test_typed_getters() {
        let mut data = ResourceData::new(&schema());
        data.set("username", json!("admin"));
        data.set("password_wo_version", json!(3));

        assert_eq!(data.get_string("username"), "admin");
        assert_eq!(data.get_int("password_wo_version"), 3);
        assert_eq!(data.get_string("nothing"), "");
        assert_eq!(data.get_int("nothing"), 0);
    }

    #[test]
    fn test_rejects_non_object() {
        let err = ResourceData::new(&schema()).with_planned(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }
}
