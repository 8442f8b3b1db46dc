use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Version control systems recognized in requirement lines and entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    Hg,
    Svn,
    Bzr,
}

impl VcsKind {
    pub const ALL: [Self; 4] = [Self::Git, Self::Hg, Self::Svn, Self::Bzr];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Hg => "hg",
            Self::Svn => "svn",
            Self::Bzr => "bzr",
        }
    }

    /// Detects a `<vcs>+` prefix (case-insensitive) at the start of a URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use pipreq_core::VcsKind;
    ///
    /// assert_eq!(VcsKind::from_url_prefix("git+https://github.com/psf/requests.git"), Some(VcsKind::Git));
    /// assert_eq!(VcsKind::from_url_prefix("https://example.com/pkg.zip"), None);
    /// ```
    pub fn from_url_prefix(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once('+')?;
        scheme.parse().ok()
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known VCS.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown version control system: {0}")]
pub struct UnknownVcs(pub String);

impl FromStr for VcsKind {
    type Err = UnknownVcs;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVcs(s.to_string()))
    }
}

/// Everything a [`RepositoryProvider`] needs to open a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySpec {
    pub vcs: VcsKind,
    /// Repository URL without the `<vcs>+` prefix, ref, or fragment.
    pub url: String,
    pub name: String,
    pub reference: Option<String>,
    pub checkout_directory: PathBuf,
    pub subdirectory: Option<String>,
    /// True when the repository already lives on the local filesystem and
    /// must not be cloned.
    pub local: bool,
}

/// A handle on a version-controlled source tree.
///
/// All operations are blocking and may fail with connectivity,
/// authentication or not-found conditions reported as
/// [`CoreError::Repository`](crate::CoreError::Repository).
pub trait SourceRepository {
    /// Clones or updates the repository into its checkout directory.
    fn obtain(&mut self) -> Result<()>;

    /// Checks out a branch, tag or commit.
    fn checkout_ref(&mut self, reference: &str) -> Result<()>;

    /// Returns the commit currently checked out.
    fn commit_hash(&self) -> Result<String>;

    fn checkout_directory(&self) -> &Path;
}

/// Opens [`SourceRepository`] handles.
///
/// The model opens a fresh handle for each repository operation and drops
/// it when the operation ends.
pub trait RepositoryProvider {
    fn open(&self, spec: &RepositorySpec) -> Result<Box<dyn SourceRepository>>;
}
