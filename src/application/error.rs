//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::application::registry::NodeId;
use crate::domain::DomainError;

/// Session and traversal errors.
///
/// `SessionNotFound`, `TokenNotFound`, `InvalidAnswer` and `TraversalComplete`
/// are caused by the client and leave session state untouched.
/// `NodeNotFound` means registry and queue went out of sync and is a defect.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("answer token not found: {0}")]
    TokenNotFound(String),

    #[error("invalid answer '{label}' for question: {question}")]
    InvalidAnswer { question: String, label: String },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("invalid decision tree: {0}")]
    InvalidTree(String),

    #[error("traversal already complete")]
    TraversalComplete,

    #[error("config error: {message}")]
    Config { message: String },
}

impl ApplicationError {
    /// True when the client can recover by retrying with other input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApplicationError::SessionNotFound(_)
                | ApplicationError::TokenNotFound(_)
                | ApplicationError::InvalidAnswer { .. }
                | ApplicationError::TraversalComplete
        )
    }

    /// HTTP status an HTTP layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ApplicationError::SessionNotFound(_) => 404,
            ApplicationError::TokenNotFound(_)
            | ApplicationError::InvalidAnswer { .. }
            | ApplicationError::TraversalComplete => 400,
            ApplicationError::Domain(_)
            | ApplicationError::NodeNotFound(_)
            | ApplicationError::InvalidTree(_)
            | ApplicationError::Config { .. } => 500,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
