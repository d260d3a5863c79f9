//! Error types for Clientele operations

use crate::EntityType;
use chrono::NaiveDate;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Write failed for {entity_type:?}: {reason}")]
    WriteFailed { entity_type: EntityType, reason: String },

    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },
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
}

/// Domain rule violations raised by the user service.
///
/// These are expected outcomes of a registration attempt, not faults.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("User must be at least {minimum_age} years old")]
    Underage { minimum_age: u32 },

    #[error("Invalid date of birth: {date_of_birth}")]
    InvalidDateOfBirth { date_of_birth: NaiveDate },

    #[error("Email already exists: {email}")]
    EmailTaken { email: String },

    #[error("Client not found: {client_id}")]
    ClientNotFound { client_id: String },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: String },
}

/// Master error type for all Clientele errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClienteleError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Result type alias for Clientele operations.
pub type ClienteleResult<T> = Result<T, ClienteleError>;

// =============================================================================
// TESTS
// =============================================================================
