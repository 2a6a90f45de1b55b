//! Error types for compute provider calls.

use std::fmt;

use thiserror::Error;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Shared resources the provider can report as duplicate or missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    KeyPair,
    SecurityGroup,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::KeyPair => f.write_str("key pair"),
            ResourceKind::SecurityGroup => f.write_str("security group"),
        }
    }
}

/// Errors reported by a compute provider.
///
/// `AlreadyExists` and `NotFound` are recoverable by callers that create
/// shared resources idempotently. `Api` covers everything else
/// (permissions, quota, malformed parameters) and is never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{resource} already exists: {name}")]
    AlreadyExists { resource: ResourceKind, name: String },

    #[error("{resource} not found: {name}")]
    NotFound { resource: ResourceKind, name: String },

    #[error("{operation} failed{}: {message}", code_suffix(.code))]
    Api {
        operation: &'static str,
        code: Option<String>,
        message: String,
    },
}

impl ProviderError {
    /// Build an `Api` error without a provider error code.
    pub fn api(operation: &'static str, message: impl Into<String>) -> Self {
        ProviderError::Api {
            operation,
            code: None,
            message: message.into(),
        }
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ProviderError::AlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default()
}
