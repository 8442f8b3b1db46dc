use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Normalized set of extras.
///
/// Extras are trimmed, lowercased and deduplicated; iteration and rendering
/// are always in sorted order, so normalization is idempotent and
/// independent of input order.
///
/// # Examples
///
/// ```
/// use pipreq::types::Extras;
///
/// let extras: Extras = ["A", "b", "B"].into_iter().collect();
/// assert_eq!(extras.to_vec(), vec!["a", "b"]);
/// assert_eq!(extras.as_pip(), "[a,b]");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Extras(BTreeSet<String>);

impl Extras {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the body of a bracketed extras list, with or without brackets.
    pub fn parse(text: &str) -> Self {
        let inner = text
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']');
        inner.split(',').collect()
    }

    pub fn insert(&mut self, extra: &str) {
        let extra = extra.trim().to_lowercase();
        if !extra.is_empty() {
            self.0.insert(extra);
        }
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }

    /// Renders as `[a,b]`, or an empty string when there are no extras.
    pub fn as_pip(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        format!("[{}]", self.to_vec().join(","))
    }
}

impl<S: AsRef<str>> FromIterator<S> for Extras {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut extras = Self::new();
        for extra in iter {
            extras.insert(extra.as_ref());
        }
        extras
    }
}

impl fmt::Display for Extras {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_pip())
    }
}

/// Key under which a file-like source appears in a structured entry.
///
/// When a source could be described by several keys, the one with the
/// highest precedence wins: `file` > `uri` > `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Path,
    Uri,
    File,
}

impl SourceKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Uri => "uri",
            Self::File => "file",
        }
    }

    pub const fn precedence(self) -> u8 {
        match self {
            Self::File => 3,
            Self::Uri => 2,
            Self::Path => 1,
        }
    }

    /// Picks the winning candidate by precedence.
    pub fn resolve_collision<T>(candidates: Vec<(Self, T)>) -> Option<(Self, T)> {
        candidates
            .into_iter()
            .max_by_key(|(key, _)| key.precedence())
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build descriptors found in a local project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupPaths {
    pub setup_py: Option<PathBuf>,
    pub setup_cfg: Option<PathBuf>,
    pub pyproject_toml: Option<PathBuf>,
}

impl SetupPaths {
    pub const DESCRIPTORS: [&'static str; 3] = ["setup.py", "setup.cfg", "pyproject.toml"];

    /// Inspects `dir` for build descriptors.
    pub fn discover(dir: &std::path::Path) -> Self {
        let existing = |file: &str| {
            let candidate = dir.join(file);
            candidate.is_file().then_some(candidate)
        };
        Self {
            setup_py: existing("setup.py"),
            setup_cfg: existing("setup.cfg"),
            pyproject_toml: existing("pyproject.toml"),
        }
    }

    /// True if any build descriptor exists.
    pub fn is_installable(&self) -> bool {
        self.setup_py.is_some() || self.setup_cfg.is_some() || self.pyproject_toml.is_some()
    }

    /// True for projects that build through `setup.py`/`setup.cfg` only.
    pub fn is_legacy(&self) -> bool {
        self.pyproject_toml.is_none() && (self.setup_py.is_some() || self.setup_cfg.is_some())
    }
}

/// Requirement lists reported for a file or VCS source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Runtime requirements.
    pub requires: Vec<String>,
    /// Setup-time requirements, deduplicated.
    pub setup_requires: Vec<String>,
    /// Build-time requirements, deduplicated.
    pub build_requires: Vec<String>,
}
