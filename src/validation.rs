//! Schema validation helpers.
//!
//! This module validates a configuration `serde_json::Value` against a [`Schema`]
//! before any resource operation runs. Besides presence and type checks it
//! enforces the cross-attribute constraints declared on each attribute.
//!
//! # Example
//!
//! ```
//! use azurerm_mssql_job_credential::schema::{Attribute, Schema};
//! use azurerm_mssql_job_credential::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("password", Attribute::optional_string().conflicts_with(["password_wo"]))
//!     .with_attribute("password_wo", Attribute::optional_string().write_only());
//!
//! assert!(validate(&schema, &json!({"password": "a"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"password": "a", "password_wo": "b"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("password".to_string()));
//! ```

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::id::JobAgentId;
use crate::schema::{Attribute, AttributeType, Diagnostic, Schema, Validator};

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema
/// - Attached [`Validator`]s must accept the value
/// - `conflicts_with`, `exactly_one_of` and `required_with` hold
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    validate_constraints(schema, obj, &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        },
        Some(v) => {
            if validate_attribute_type(attr.attr_type, v, path, diagnostics) {
                if let Some(validator) = attr.validator {
                    run_validator(validator, v, path, diagnostics);
                }
            }
        },
    }
}

/// Returns whether the value had the expected type.
fn validate_attribute_type(
    attr_type: AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let ok = match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => is_int64(value),
        AttributeType::Bool => value.is_boolean(),
    };
    if !ok {
        let expected = match attr_type {
            AttributeType::String => "string",
            AttributeType::Int64 => "int64",
            AttributeType::Bool => "bool",
        };
        diagnostics.push(type_error(path, expected, value));
    }
    ok
}

fn run_validator(validator: Validator, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let Some(s) = value.as_str() else {
        return;
    };
    match validator {
        Validator::JobAgentId => {
            if let Err(err) = JobAgentId::parse(s) {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid job agent ID for '{}'", path))
                        .with_detail(err.to_string())
                        .with_attribute(path),
                );
            }
        },
        Validator::NotEmpty => {
            if s.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error(format!("Attribute '{}' must not be empty", path))
                        .with_attribute(path),
                );
            }
        },
    }
}

fn validate_constraints(schema: &Schema, obj: &Map<String, Value>, diagnostics: &mut Vec<Diagnostic>) {
    // exactly_one_of is usually declared on every member of the group
    let mut seen_groups: BTreeSet<Vec<String>> = BTreeSet::new();

    for (name, attr) in &schema.attributes {
        let present = is_set(obj, name);

        if present {
            for other in &attr.conflicts_with {
                if is_set(obj, other) {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "Conflicting configuration arguments '{}' and '{}'",
                            name, other
                        ))
                        .with_detail(format!("\"{}\": conflicts with {}", name, other))
                        .with_attribute(name.as_str()),
                    );
                }
            }

            let missing: Vec<&str> = attr
                .required_with
                .iter()
                .filter(|other| !is_set(obj, other))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required argument for '{}'", name))
                        .with_detail(format!(
                            "\"{}\": all of `{}` must be specified",
                            name,
                            std::iter::once(name.as_str())
                                .chain(missing.iter().copied())
                                .collect::<Vec<_>>()
                                .join(",")
                        ))
                        .with_attribute(name.as_str()),
                );
            }
        }

        if !attr.exactly_one_of.is_empty() {
            let mut group = attr.exactly_one_of.clone();
            group.sort();
            if !seen_groups.insert(group.clone()) {
                continue;
            }
            let set_count = group.iter().filter(|member| is_set(obj, member)).count();
            if set_count != 1 {
                diagnostics.push(
                    Diagnostic::error(format!("Invalid combination of arguments for '{}'", name))
                        .with_detail(format!(
                            "\"{}\": only one of `{}` can be specified, but {} were specified",
                            name,
                            group.join(","),
                            set_count
                        ))
                        .with_attribute(name.as_str()),
                );
            }
        }
    }
}

// Helper functions

fn is_set(obj: &Map<String, Value>, name: &str) -> bool {
    !matches!(obj.get(name), None | Some(Value::Null))
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        },
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}
