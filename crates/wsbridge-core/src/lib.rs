//! # wsbridge-core
//!
//! Core model for a WebSocket bridge that maps inbound messages onto host
//! variables.
//!
//! This crate provides:
//! - Data model types (Payload, VariableValue, VariableDefinition)
//! - Path expressions and value extraction
//! - The subscription table and variable projection
//! - Endpoint configuration, validation and migration
//! - The host collaborator trait
//!
//! This crate is intentionally runtime-agnostic and contains no async code.

pub mod config;
pub mod error;
pub mod host;
pub mod model;
pub mod path;
pub mod status;
pub mod subscription;
pub mod upgrade;
pub mod variables;

pub use config::{ConfigHandlers, ConfigStorage, EndpointConfig, TerminationMode};
pub use error::ConfigError;
pub use host::Host;
pub use model::*;
pub use path::{PathExpression, PathExtractor};
pub use status::ConnectionStatus;
pub use subscription::{Subscription, SubscriptionTable};
pub use upgrade::upgrade_config;
pub use variables::{is_valid_variable_name, Projection, VariableProjector};
