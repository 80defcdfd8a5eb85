//! Shared error type across reqscope crates.

use thiserror::Error;

/// Stable error codes, attached as the `code` field when errors are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// A metric name was registered twice.
    DuplicateMetric,
    /// Malformed metric definition (name, labels, buckets).
    InvalidMetric,
    /// Configuration failed to parse or validate.
    BadConfig,
    /// Failure injected by the slow workload.
    SyntheticFailure,
    /// Remote log shipping failed.
    LogShipping,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::DuplicateMetric => "DUPLICATE_METRIC",
            ClientCode::InvalidMetric => "INVALID_METRIC",
            ClientCode::BadConfig => "BAD_CONFIG",
            ClientCode::SyntheticFailure => "SYNTHETIC_FAILURE",
            ClientCode::LogShipping => "LOG_SHIPPING",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ReqScopeError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum ReqScopeError {
    #[error("duplicate metric: {0}")]
    DuplicateMetric(String),
    #[error("invalid metric: {0}")]
    InvalidMetric(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    /// Display is the bare message; it ends up verbatim in HTTP bodies.
    #[error("{0}")]
    SyntheticFailure(String),
    #[error("log shipping: {0}")]
    LogShipping(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ReqScopeError {
    /// Map error to a stable code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            ReqScopeError::DuplicateMetric(_) => ClientCode::DuplicateMetric,
            ReqScopeError::InvalidMetric(_) => ClientCode::InvalidMetric,
            ReqScopeError::BadConfig(_) => ClientCode::BadConfig,
            ReqScopeError::SyntheticFailure(_) => ClientCode::SyntheticFailure,
            ReqScopeError::LogShipping(_) => ClientCode::LogShipping,
            ReqScopeError::Internal(_) => ClientCode::Internal,
        }
    }
}
