//! Replication Client Error Hierarchy
//!
//! Defines error types for the configuration replication client,
//! categorized by transport, event decoding, schema and validation concerns.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend communication failures (Redis commands, Consul HTTP)
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Change notifications that could not be decoded
    #[error(transparent)]
    Event(#[from] EventError),

    /// Schema registration and typed assignment failures
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Service, namespace or field names rejected at the API boundary
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unrecoverable failures requiring the client to be rebuilt
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Redis command or connection failure
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Consul HTTP request failure below the protocol level
    #[error("Http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success answer from the backend API
    #[error("Api error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Backend payload that could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Command exceeded its response budget
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Notification stream ended and could not be resumed
    #[error("Subscription closed")]
    SubscriptionClosed,

    /// Background task aborted or panicked
    #[error("Task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Tag did not match the `/service/identity/namespace` grammar
    #[error("Malformed event tag: {0}")]
    MalformedTag(String),

    /// Event id was not a 32-digit hex identifier
    #[error("Malformed event id: {0}")]
    MalformedId(String),

    /// Event list body was not valid JSON
    #[error("Malformed event body: {0}")]
    Body(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Assigned value kind differs from the declared field kind
    #[error("Unexpected type: reality: {actual}, expected: {expected}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Field is not declared by the namespace schema
    #[error("Unknown field {field} in schema {namespace}")]
    UnknownField { namespace: String, field: String },

    /// No schema registered under this namespace
    #[error("Unknown schema namespace: {0}")]
    UnknownNamespace(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Service name must not be empty")]
    EmptyService,

    #[error("Invalid service name: {0}")]
    InvalidService(String),

    #[error("Namespace name must not be empty")]
    EmptyNamespace,

    #[error("Invalid namespace name: {0}")]
    InvalidNamespace(String),

    #[error("Field name must not be empty")]
    EmptyField,
}

// ============== Conversion Implementations ============== //

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        TransportError::Redis(err).into()
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err).into()
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        TransportError::TaskFailed(err).into()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        EventError::Body(err).into()
    }
}
