//! Errors raised while parsing, constructing and resolving requirements.

use pipreq_core::CoreError;
use thiserror::Error;

/// Errors raised while parsing, constructing and resolving requirements.
///
/// Construction-time errors (`Parse`, `InvalidMarkers`, `MissingIdentity`,
/// `AmbiguousSource`) always abort the calling operation. Collaborator
/// failures are wrapped in `MetadataResolution` and `RepositoryOperation`.
#[derive(Error, Debug)]
pub enum RequirementError {
    /// The line matches no known requirement shape
    #[error("Failed to parse requirement '{line}': {reason}")]
    Parse { line: String, reason: String },

    /// The environment marker expression is not valid PEP 508
    #[error("Invalid environment markers '{markers}': {reason}")]
    InvalidMarkers { markers: String, reason: String },

    /// A VCS source carries no egg fragment and no explicit name
    #[error(
        "pipreq requires an #egg fragment or an explicit name for version controlled dependencies: {location}"
    )]
    MissingIdentity { location: String },

    /// A structured entry names more than one source
    #[error("Entry '{name}' specifies conflicting sources: {}", .keys.join(", "))]
    AmbiguousSource { name: String, keys: Vec<String> },

    /// A structured entry has a value of the wrong shape
    #[error("Invalid entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },

    /// Metadata discovery failed after its retry
    #[error("Metadata resolution failed for {location}: {source}")]
    MetadataResolution {
        location: String,
        #[source]
        source: CoreError,
    },

    /// Clone, checkout or commit lookup failed
    #[error("Repository operation failed for {url}: {source}")]
    RepositoryOperation {
        url: String,
        #[source]
        source: CoreError,
    },

    /// Failed to parse TOML entries
    #[error("Failed to parse TOML: {source}")]
    TomlParse {
        #[source]
        source: toml_edit::TomlError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by a collaborator outside a resolution context
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for requirement operations.
pub type Result<T> = std::result::Result<T, RequirementError>;

impl RequirementError {
    /// Create a parse error for a raw line.
    pub fn parse_error(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_markers(markers: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMarkers {
            markers: markers.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_identity(location: impl Into<String>) -> Self {
        Self::MissingIdentity {
            location: location.into(),
        }
    }

    pub fn ambiguous_source<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AmbiguousSource {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn invalid_entry(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a collaborator error raised during metadata discovery.
    pub fn metadata_resolution(location: impl Into<String>, source: CoreError) -> Self {
        Self::MetadataResolution {
            location: location.into(),
            source,
        }
    }

    /// Wrap a collaborator error raised by a source repository.
    pub fn repository_operation(url: impl Into<String>, source: CoreError) -> Self {
        Self::RepositoryOperation {
            url: url.into(),
            source,
        }
    }

    /// True for errors raised while building a requirement from its input.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::InvalidMarkers { .. }
                | Self::MissingIdentity { .. }
                | Self::AmbiguousSource { .. }
                | Self::InvalidEntry { .. }
                | Self::TomlParse { .. }
        )
    }
}

/// Convert into CoreError for callers that only deal in collaborator errors
impl From<RequirementError> for CoreError {
    fn from(err: RequirementError) -> Self {
        match err {
            RequirementError::MetadataResolution { source, .. }
            | RequirementError::RepositoryOperation { source, .. }
            | RequirementError::Core(source) => source,
            RequirementError::Io(e) => Self::Io(e),
            other => Self::Discovery {
                location: "requirement".into(),
                source: Box::new(other),
            },
        }
    }
}
