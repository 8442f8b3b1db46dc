use std::fmt;
use thiserror::Error;

/// Repository operation that failed, reported inside [`CoreError::Repository`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryOperation {
    Obtain,
    Checkout,
    CommitHash,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Obtain => "obtain",
            Self::Checkout => "checkout",
            Self::CommitHash => "commit hash lookup",
        };
        f.write_str(label)
    }
}

/// Core error types for pipreq.
///
/// These are the failures reported by external collaborators (metadata
/// discovery and source repositories) plus the shared I/O, JSON and
/// configuration errors. The requirement model wraps them into its own
/// error taxonomy.
///
/// # Examples
///
/// ```
/// use pipreq_core::error::{CoreError, Result};
///
/// fn discover(location: &str) -> Result<()> {
///     if location.is_empty() {
///         return Err(CoreError::NotFound {
///             location: "<empty>".into(),
///         });
///     }
///     Ok(())
/// }
///
/// assert!(discover("").unwrap_err().is_not_found());
/// ```
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("metadata not found for {location}")]
    NotFound { location: String },

    #[error("metadata discovery failed for {location}: {source}")]
    Discovery {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("repository {operation} failed for {url}: {source}")]
    Repository {
        url: String,
        operation: RepositoryOperation,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a discovery error from any error source.
    pub fn discovery(
        location: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Discovery {
            location: location.into(),
            source: Box::new(source),
        }
    }

    /// Creates a repository error from any error source.
    pub fn repository(
        url: impl Into<String>,
        operation: RepositoryOperation,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Repository {
            url: url.into(),
            operation,
            source: Box::new(source),
        }
    }

    /// Returns true for the transient "not found" condition that metadata
    /// discovery is allowed to retry once.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Convenience type alias for `Result<T, CoreError>`.
pub type Result<T> = std::result::Result<T, CoreError>;
