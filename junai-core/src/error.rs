//! Error taxonomy shared by every component of the navigation core.
//!
//! All kinds propagate unmodified up through [`crate::navigation::NavigationAgent`]
//! to the caller. Only [`NavigationError::is_retryable`] kinds are ever retried,
//! and only when a [`crate::retry::RetryPolicy`] allows it.

/// Errors raised by the navigation core.
#[derive(thiserror::Error, Debug)]
pub enum NavigationError {
    /// A task or plan step is malformed or missing a required field.
    #[error("validation error: {0}")]
    Validation(String),

    /// An agent that requires credentials was invoked without them.
    #[error("authentication missing for agent '{agent}'")]
    AuthenticationMissing { agent: String },

    /// An agent's (or planner's) external call failed or returned an error status.
    #[error("remote call failed ({agent}): {message}")]
    RemoteCallFailed { agent: String, message: String },

    /// The vector store failed to answer a query or insert.
    #[error("store unavailable during {operation}: {message}")]
    StoreUnavailable { operation: String, message: String },
}

impl NavigationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn remote(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteCallFailed {
            agent: agent.into(),
            message: message.into(),
        }
    }

    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Stable snake-case label, used as a log field and by the HTTP host.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::AuthenticationMissing { .. } => "authentication_missing",
            Self::RemoteCallFailed { .. } => "remote_call_failed",
            Self::StoreUnavailable { .. } => "store_unavailable",
        }
    }

    /// Transient kinds. Validation and missing credentials never heal on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteCallFailed { .. } | Self::StoreUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, NavigationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_kinds_are_retryable() {
        assert!(NavigationError::remote("bindai", "503").is_retryable());
        assert!(NavigationError::store("query", "connection reset").is_retryable());
        assert!(!NavigationError::validation("empty skill").is_retryable());
        assert!(!NavigationError::AuthenticationMissing {
            agent: "bindai".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_display_carries_context() {
        let err = NavigationError::store("insert", "qdrant down");
        assert_eq!(err.kind(), "store_unavailable");
        assert_eq!(err.to_string(), "store unavailable during insert: qdrant down");
    }
}
