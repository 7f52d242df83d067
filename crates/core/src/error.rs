//! Error model.
//!
//! Two layers live here:
//!
//! - [`DomainError`]: deterministic failures raised by domain code itself
//!   (construction, validation, invariants).
//! - [`AppError`]: the closed taxonomy every module reports failed use cases
//!   with. A failed use case returns a non-empty `Vec<AppError>`; the
//!   presentation layer classifies the whole batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type returned by application use cases.
pub type UseCaseResult<T> = Result<T, Vec<AppError>>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An entity was constructed with its identifier type's default value.
    #[error("the identifier cannot be the default value")]
    DefaultId,

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// Authorization failure at the domain boundary.
    #[error("forbidden")]
    Forbidden,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Category of an [`AppError`]. Closed set: every failure is exactly one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input or shape problems.
    Validation,
    /// Business-rule violations.
    Domain,
    /// A referenced entity is absent.
    NotFound,
    /// Authorization denial.
    Forbidden,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Domain => "domain",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
        }
    }
}

/// Metadata key holding a machine-readable error code.
pub const CODE_KEY: &str = "code";

/// A classified, user-facing failure of an application operation.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    #[serde(default)]
    metadata: BTreeMap<String, JsonValue>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Domain, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Attach a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach a machine-readable code (stored under the `code` metadata key).
    pub fn with_code(self, code: impl Into<String>) -> Self {
        self.with_meta(CODE_KEY, code.into())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn metadata(&self) -> &BTreeMap<String, JsonValue> {
        &self.metadata
    }

    /// The `code` metadata entry, if present.
    pub fn code(&self) -> Option<&JsonValue> {
        self.metadata.get(CODE_KEY)
    }
}

impl From<DomainError> for AppError {
    fn from(value: DomainError) -> Self {
        let message = value.to_string();
        match value {
            DomainError::DefaultId | DomainError::Validation(_) | DomainError::InvalidId(_) => {
                AppError::validation(message)
            }
            DomainError::InvariantViolation(_) => AppError::domain(message),
            DomainError::NotFound => AppError::not_found(message),
            DomainError::Forbidden => AppError::forbidden(message),
        }
    }
}

impl From<DomainError> for Vec<AppError> {
    fn from(value: DomainError) -> Self {
        vec![value.into()]
    }
}
