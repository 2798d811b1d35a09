//! Error types for COURIER operations

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Entity type discriminator used in storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Message,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            EntityType::Message => "Message",
        };
        f.write_str(value)
    }
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Insert failed for {entity_type}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Serialization failed for {entity_type}: {reason}")]
    Serialization { entity_type: EntityType, reason: String },
}

/// Validation errors for malformed input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Reserved identifier used for {field}: {value}")]
    ReservedIdentifier { field: String, value: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Telemetry initialization failed: {reason}")]
    TelemetryInit { reason: String },
}

/// Agent registry errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent not registered: {agent_id}")]
    NotRegistered { agent_id: String },
}

/// Master error type for all COURIER errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CourierError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

/// Result type alias for COURIER operations.
pub type CourierResult<T> = Result<T, CourierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = CourierError::from(ValidationError::RequiredFieldMissing {
            field: "sender_id".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Validation error: Required field missing: sender_id"
        );

        let err = CourierError::from(StorageError::InsertFailed {
            entity_type: EntityType::Message,
            reason: "already exists".to_string(),
        });
        assert!(err.to_string().contains("Message"));
    }
}
