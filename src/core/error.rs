//! Typed error handling for the tally list pipeline
//!
//! Every failure a list or detail endpoint can produce is one of:
//!
//! - [`AuthorizationError`]: the caller's session is missing or its role is not allowed
//! - [`ValidationError`]: request parameters that cannot be safely defaulted
//! - [`TallyError::NotFound`]: a single document id that does not resolve
//! - [`StorageError`]: the backing store failed
//! - [`ConfigError`]: configuration parsing and validation (startup only)
//!
//! Handlers never let these cross into the presentation layer raw; they are
//! converted into the uniform [`Envelope`](crate::core::envelope::Envelope).

use axum::http::StatusCode;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Message shown to callers when the store fails. Internal details are logged only.
pub const GENERIC_STORAGE_MESSAGE: &str = "Something went wrong while loading data";

/// The main error type for the crate
#[derive(Debug, Error)]
pub enum TallyError {
    /// Authorization failures (evaluated before any data access)
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Input validation failures
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A single document lookup did not resolve
    #[error("{resource} not found")]
    NotFound { resource: String, id: Uuid },

    /// Storage backend failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration failures
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TallyError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TallyError::Authorization(e) => e.status_code(),
            TallyError::Validation(_) => StatusCode::BAD_REQUEST,
            TallyError::NotFound { .. } => StatusCode::NOT_FOUND,
            TallyError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TallyError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            TallyError::Authorization(AuthorizationError::Unauthenticated) => "UNAUTHENTICATED",
            TallyError::Authorization(AuthorizationError::Forbidden { .. }) => "FORBIDDEN",
            TallyError::Validation(_) => "VALIDATION_ERROR",
            TallyError::NotFound { .. } => "NOT_FOUND",
            TallyError::Storage(_) => "STORAGE_ERROR",
            TallyError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Message that is safe to show to the caller.
    ///
    /// Storage and configuration internals are replaced by a generic message.
    pub fn public_message(&self) -> String {
        match self {
            TallyError::Storage(_) | TallyError::Config(_) => GENERIC_STORAGE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Field-level details, only present for validation errors
    pub fn details(&self) -> Option<BTreeMap<String, Vec<String>>> {
        match self {
            TallyError::Validation(e) => Some(e.field_map()),
            _ => None,
        }
    }

    /// Build a not-found error for a singular resource name
    pub fn not_found(resource_singular: &str, id: Uuid) -> Self {
        TallyError::NotFound {
            resource: capitalize(resource_singular),
            id,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Authorization Errors
// =============================================================================

/// Errors raised by the authorization gate's caller
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// No session could be established for the request
    #[error("You must be signed in to view this page")]
    Unauthenticated,

    /// The session's role is not in the endpoint's allow-list
    #[error("You are not authorized to view {resource}")]
    Forbidden { resource: String },
}

impl AuthorizationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthorizationError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthorizationError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// A single field validation error
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One or more request parameters are malformed
    #[error("Invalid request parameters: {}", summarize_fields(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// A path id is not a valid identifier
    #[error("Invalid id format: {value}")]
    InvalidId { value: String },
}

fn summarize_fields(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    /// Group messages by field name
    pub fn field_map(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        match self {
            ValidationError::FieldErrors(errors) => {
                for e in errors {
                    map.entry(e.field.clone()).or_default().push(e.message.clone());
                }
            }
            ValidationError::InvalidId { .. } => {
                map.insert("id".to_string(), vec!["must be a valid id".to_string()]);
            }
        }
        map
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection error
    #[error("Failed to connect to {backend}: {message}")]
    ConnectionError { backend: String, message: String },

    /// Query execution error
    #[error("{backend} query error: {message}")]
    QueryError { backend: String, message: String },

    /// Stored data could not be decoded
    #[error("Failed to decode {resource}: {message}")]
    DecodeError { resource: String, message: String },

    /// Backend not available
    #[error("Storage backend '{backend}' is unavailable")]
    Unavailable { backend: String },
}

impl From<anyhow::Error> for StorageError {
    /// Backends that already classified their failure keep it; anything else
    /// is reported as a query error.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<StorageError>() {
            Ok(storage) => storage,
            Err(err) => StorageError::QueryError {
                backend: "store".to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for TallyError {
    fn from(err: anyhow::Error) -> Self {
        TallyError::Storage(err.into())
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", file_suffix(.file))]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found or unreadable
    #[error("Configuration file not readable: {path}: {message}")]
    Io { path: String, message: String },
}

fn file_suffix(file: &Option<String>) -> String {
    file.as_ref()
        .map(|f| format!(" file '{}'", f))
        .unwrap_or_default()
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

/// A specialized Result type for tally operations
pub type TallyResult<T> = Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_is_resource_specific() {
        let err = TallyError::not_found("purchase", Uuid::nil());
        assert_eq!(err.to_string(), "Purchase not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_validation_field_map_groups_messages() {
        let err = ValidationError::FieldErrors(vec![
            FieldValidationError::new("branchId", "must be a valid id"),
            FieldValidationError::new("status", "unknown value"),
            FieldValidationError::new("branchId", "second message"),
        ]);
        let map = err.field_map();
        assert_eq!(map["branchId"].len(), 2);
        assert_eq!(map["status"], vec!["unknown value".to_string()]);
    }

    #[test]
    fn test_storage_error_public_message_is_generic() {
        let err: TallyError = StorageError::ConnectionError {
            backend: "MongoDB".to_string(),
            message: "connection refused at 10.0.0.3".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), GENERIC_STORAGE_MESSAGE);
        assert!(!err.public_message().contains("10.0.0.3"));
        assert!(err.details().is_none());
    }

    #[test]
    fn test_authorization_status_codes() {
        let unauth: TallyError = AuthorizationError::Unauthenticated.into();
        assert_eq!(unauth.status_code(), StatusCode::UNAUTHORIZED);

        let forbidden: TallyError = AuthorizationError::Forbidden {
            resource: "purchases".to_string(),
        }
        .into();
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
        assert!(forbidden.public_message().contains("purchases"));
    }

    #[test]
    fn test_config_parse_error_display() {
        let err = ConfigError::ParseError {
            file: Some("tally.yaml".to_string()),
            message: "bad indent".to_string(),
        };
        assert!(err.to_string().contains("tally.yaml"));
        assert!(err.to_string().contains("bad indent"));
    }
}
