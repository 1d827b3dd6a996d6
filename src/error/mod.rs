use thiserror::Error;

use crate::workflow::NodeName;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("History store error: {0}")]
    Store(#[from] StoreError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors returned by external adapter clients (model, search, fetch).
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AdapterError {
    /// Whether a node may retry after this error.
    ///
    /// Auth failures and non-transient API rejections are terminal; the
    /// caller must not retry them.
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::Timeout { .. } => true,
            AdapterError::Auth { .. } => false,
            AdapterError::Api { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            AdapterError::InvalidResponse { .. } => true,
            AdapterError::Http(_) => true,
        }
    }
}

/// History store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Schema validation failure for a single field.
#[derive(Debug, Error)]
#[error("Validation failed: {field} - {reason}")]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Why the field was rejected.
    pub reason: String,
}

impl ValidationError {
    /// Create a validation error for a named field.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A step node's failure, classified for the orchestrator's retry policy.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("retryable failure: {message}")]
    Retryable { message: String },

    #[error("fatal failure: {message}")]
    Fatal { message: String },

    #[error("consistency violation: {message}")]
    Consistency { message: String },
}

impl NodeError {
    /// A transient failure the orchestrator may retry.
    pub fn retryable(message: impl Into<String>) -> Self {
        NodeError::Retryable {
            message: message.into(),
        }
    }

    /// A terminal failure that halts the run immediately.
    pub fn fatal(message: impl Into<String>) -> Self {
        NodeError::Fatal {
            message: message.into(),
        }
    }

    /// An upstream contract violation (structurally invalid input).
    pub fn consistency(message: impl Into<String>) -> Self {
        NodeError::Consistency {
            message: message.into(),
        }
    }

    /// Whether the orchestrator may re-run the node after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::Retryable { .. })
    }
}

impl From<AdapterError> for NodeError {
    fn from(err: AdapterError) -> Self {
        if err.is_retryable() {
            NodeError::Retryable {
                message: err.to_string(),
            }
        } else {
            NodeError::Fatal {
                message: err.to_string(),
            }
        }
    }
}

impl From<ValidationError> for NodeError {
    fn from(err: ValidationError) -> Self {
        NodeError::Fatal {
            message: err.to_string(),
        }
    }
}

/// Terminal workflow failure handed back to callers.
///
/// Callers receive either a complete brief or exactly one of these; raw
/// adapter errors never cross this boundary.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{node} failed after {attempts} retries: {message}")]
    RetriesExhausted {
        node: NodeName,
        attempts: u32,
        message: String,
    },

    #[error("{node} failed: {message}")]
    Fatal { node: NodeName, message: String },

    #[error("Internal consistency error in {node}: {message}")]
    InternalConsistency { node: NodeName, message: String },

    #[error("Workflow cancelled during {node}")]
    Cancelled { node: NodeName },
}

/// Coarse classification of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowErrorKind {
    /// The request was rejected before any node ran.
    InvalidRequest,
    /// A node exhausted its retry budget.
    RetriesExhausted,
    /// A node failed terminally.
    Fatal,
    /// A downstream node received structurally invalid upstream output.
    InternalConsistency,
    /// An external cancellation signal aborted the run.
    Cancelled,
}

impl WorkflowError {
    /// Classify this error.
    pub fn kind(&self) -> WorkflowErrorKind {
        match self {
            WorkflowError::InvalidRequest { .. } => WorkflowErrorKind::InvalidRequest,
            WorkflowError::RetriesExhausted { .. } => WorkflowErrorKind::RetriesExhausted,
            WorkflowError::Fatal { .. } => WorkflowErrorKind::Fatal,
            WorkflowError::InternalConsistency { .. } => WorkflowErrorKind::InternalConsistency,
            WorkflowError::Cancelled { .. } => WorkflowErrorKind::Cancelled,
        }
    }

    /// The node the error is attributed to, if any.
    pub fn node(&self) -> Option<NodeName> {
        match self {
            WorkflowError::InvalidRequest { .. } => None,
            WorkflowError::RetriesExhausted { node, .. }
            | WorkflowError::Fatal { node, .. }
            | WorkflowError::InternalConsistency { node, .. }
            | WorkflowError::Cancelled { node } => Some(*node),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type alias for history store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for node executions
pub type NodeResult<T> = Result<T, NodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing key".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = AppError::Internal {
            message: "unexpected".to_string(),
        };
        assert_eq!(err.to_string(), "Internal error: unexpected");
    }

    #[test]
    fn test_adapter_error_display() {
        let err = AdapterError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.to_string(), "Request timeout after 5000ms");

        let err = AdapterError::Auth {
            message: "bad key".to_string(),
        };
        assert_eq!(err.to_string(), "Authentication failed: bad key");

        let err = AdapterError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - unavailable");
    }

    #[test]
    fn test_adapter_error_retryability() {
        assert!(AdapterError::Timeout { timeout_ms: 100 }.is_retryable());
        assert!(AdapterError::Api {
            status: 500,
            message: String::new()
        }
        .is_retryable());
        assert!(AdapterError::Api {
            status: 429,
            message: String::new()
        }
        .is_retryable());
        assert!(!AdapterError::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!AdapterError::Auth {
            message: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn test_adapter_error_classification_into_node_error() {
        let err: NodeError = AdapterError::Timeout { timeout_ms: 100 }.into();
        assert!(err.is_retryable());

        let err: NodeError = AdapterError::Auth {
            message: "invalid credentials".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
        assert!(matches!(err, NodeError::Fatal { .. }));
    }

    #[test]
    fn test_validation_error_is_fatal() {
        let err: NodeError = ValidationError::new("depth", "must be 1-5").into();
        assert!(matches!(err, NodeError::Fatal { .. }));
        assert!(err.to_string().contains("depth"));
    }

    #[test]
    fn test_workflow_error_display_names_node() {
        let err = WorkflowError::RetriesExhausted {
            node: NodeName::Search,
            attempts: 3,
            message: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "search failed after 3 retries: timeout");
        assert_eq!(err.kind(), WorkflowErrorKind::RetriesExhausted);
        assert_eq!(err.node(), Some(NodeName::Search));
    }

    #[test]
    fn test_workflow_error_kinds() {
        let err = WorkflowError::InvalidRequest {
            message: "too short".to_string(),
        };
        assert_eq!(err.kind(), WorkflowErrorKind::InvalidRequest);
        assert_eq!(err.node(), None);

        let err = WorkflowError::Cancelled {
            node: NodeName::Synthesis,
        };
        assert_eq!(err.kind(), WorkflowErrorKind::Cancelled);
        assert_eq!(err.to_string(), "Workflow cancelled during synthesis");
    }

    #[test]
    fn test_store_error_conversion_to_app_error() {
        let store_err = StoreError::Connection {
            message: "failed to connect".to_string(),
        };
        let app_err: AppError = store_err.into();
        assert!(matches!(app_err, AppError::Store(_)));
    }
}
