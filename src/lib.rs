//! Azure SQL Elastic Job credentials
//!
//! This crate manages `azurerm_mssql_job_credential` resources: a named
//! username/password pair stored under an Elastic Job agent and used by job
//! steps to connect to their targets.
//!
//! # Overview
//!
//! - **Identifiers**: [`id::JobAgentId`] and [`id::CredentialId`] parse and render
//!   Azure resource IDs
//! - **Resource controller**: [`JobCredentialResource`] implements create, read,
//!   update, delete and import over a [`RemoteCredentialClient`] and a
//!   [`DeclaredStateStore`]
//! - **Provider**: [`MssqlProvider`] exposes the resource through the
//!   [`ProviderService`] trait, with schema validation and planning
//! - **HTTP client**: [`ArmCredentialClient`] talks to Azure Resource Manager
//! - **Logging**: `tracing` based, written to stderr
//!
//! # Quick Start
//!
//! ```ignore
//! use azurerm_mssql_job_credential::{init_logging, MssqlProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = MssqlProvider::new();
//!     provider.configure(json!({"access_token": std::env::var("TOKEN")?})).await?;
//!
//!     let config = json!({
//!         "name": "job-user",
//!         "job_agent_id": "/subscriptions/.../providers/Microsoft.Sql/servers/sql1/jobAgents/agent1",
//!         "username": "job_user",
//!         "password_wo": "...",
//!         "password_wo_version": 1,
//!     });
//!     let plan = provider
//!         .plan("azurerm_mssql_job_credential", None, config.clone(), config.clone())
//!         .await?;
//!     let state = provider
//!         .create("azurerm_mssql_job_credential", plan.planned_state, config)
//!         .await?;
//!     tracing::info!(%state, "created");
//!     Ok(())
//! }
//! ```
//!
//! # Passwords
//!
//! A credential's password is either the sensitive `password` attribute, kept in
//! state, or the write-only `password_wo` attribute, which is never persisted.
//! Because a write-only value cannot be compared with anything, it is only sent
//! again when `password_wo_version` changes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod id;
pub mod logging;
pub mod models;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod secret;
pub mod service;
pub mod state;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{ClientError, JobCredential, JobCredentialProperties, RemoteCredentialClient};
pub use config::{ProviderConfig, ResourceTimeouts};
pub use error::ProviderError;
pub use http::ArmCredentialClient;
pub use id::{CredentialId, IdError, JobAgentId};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::MssqlProvider;
pub use resource::{JobCredentialResource, PasswordSource, RESOURCE_TYPE};
pub use schema::ProviderSchema;
pub use secret::Secret;
pub use service::ProviderService;
pub use state::{DeclaredStateStore, ResourceData};
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
