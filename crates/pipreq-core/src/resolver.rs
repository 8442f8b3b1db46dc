use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Metadata discovered for a source tree or artifact.
///
/// Produced by a [`MetadataResolver`], typically by running a build backend
/// against the source. Every field is optional because discovery frequently
/// yields partial results (an sdist without a readable version, a
/// project without build requirements).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Runtime requirements (`install_requires` / `Requires-Dist`).
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub setup_requires: Vec<String>,
    #[serde(default)]
    pub build_requires: Vec<String>,
    pub build_backend: Option<String>,
}

/// Where metadata should be discovered from.
///
/// `uri` is always set; `path` is set for sources that exist on the local
/// filesystem (local paths, `file:` URLs, VCS checkouts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub uri: String,
    pub path: Option<PathBuf>,
    pub subdirectory: Option<String>,
    pub editable: bool,
    pub extras: Vec<String>,
}

impl SourceLocation {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            path: None,
            subdirectory: None,
            editable: false,
            extras: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_subdirectory(mut self, subdirectory: Option<String>) -> Self {
        self.subdirectory = subdirectory;
        self
    }

    #[must_use]
    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    #[must_use]
    pub fn with_extras(mut self, extras: Vec<String>) -> Self {
        self.extras = extras;
        self
    }

    /// Local project directory, with the subdirectory applied.
    pub fn project_dir(&self) -> Option<PathBuf> {
        let base = self.path.as_ref()?;
        Some(match &self.subdirectory {
            Some(sub) => base.join(sub),
            None => base.clone(),
        })
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}", path.display())?,
            None => f.write_str(&self.uri)?,
        }
        if let Some(sub) = &self.subdirectory {
            write!(f, " (subdirectory {sub})")?;
        }
        Ok(())
    }
}

/// Discovers package metadata for a source location.
///
/// Implementations usually invoke a build backend or read a metadata cache.
/// The call is blocking and may take substantial time; the model applies no
/// timeout of its own.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`](crate::CoreError::NotFound) when the
/// metadata cannot be located (callers retry this once), or
/// [`CoreError::Discovery`](crate::CoreError::Discovery) for other failures.
///
/// # Examples
///
/// Closures implement the trait, which keeps test doubles short:
///
/// ```
/// use pipreq_core::{MetadataResolver, SetupInfo, SourceLocation};
///
/// let resolver = |_location: &SourceLocation| -> pipreq_core::Result<SetupInfo> {
///     Ok(SetupInfo {
///         name: Some("local-pkg".into()),
///         version: Some("0.1.0".into()),
///         ..SetupInfo::default()
///     })
/// };
///
/// let info = resolver.discover(&SourceLocation::new("file:///src/local-pkg")).unwrap();
/// assert_eq!(info.name.as_deref(), Some("local-pkg"));
/// ```
pub trait MetadataResolver {
    fn discover(&self, location: &SourceLocation) -> Result<SetupInfo>;
}

impl<F> MetadataResolver for F
where
    F: Fn(&SourceLocation) -> Result<SetupInfo>,
{
    fn discover(&self, location: &SourceLocation) -> Result<SetupInfo> {
        self(location)
    }
}
