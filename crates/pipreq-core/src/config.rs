use crate::cache::MAX_CACHE_ENTRIES;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Build backend assumed for projects that ship a legacy build descriptor
/// without a `[build-system]` table.
pub const DEFAULT_BUILD_BACKEND: &str = "setuptools.build_meta:__legacy__";

/// Environment variable naming the root directory for VCS checkouts.
pub const SRC_DIR_ENV: &str = "PIP_SRC";

/// Root configuration for pipreq.
///
/// All fields use sensible defaults if not specified.
///
/// # Examples
///
/// ```
/// use pipreq_core::config::PipreqConfig;
///
/// let json = r#"{
///     "cache": { "max_entries": 64 },
///     "sources": [
///         { "name": "pypi", "url": "https://pypi.org/simple" }
///     ]
/// }"#;
///
/// let config = PipreqConfig::from_json(json).unwrap();
/// assert_eq!(config.cache.max_entries, 64);
/// assert!(config.sources[0].verify_ssl);
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PipreqConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub vcs: VcsConfig,
    #[serde(default)]
    pub sources: Vec<IndexSource>,
}

impl PipreqConfig {
    /// Parses configuration from JSON and validates it.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides (`PIP_SRC`).
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(SRC_DIR_ENV).filter(|v| !v.is_empty()) {
            tracing::debug!("using {} for VCS checkouts", SRC_DIR_ENV);
            self.vcs.src_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(CoreError::Config(
                "cache.max_entries must be greater than zero".into(),
            ));
        }
        if let Some(source) = self.sources.iter().find(|s| s.url.trim().is_empty()) {
            return Err(CoreError::Config(format!(
                "source '{}' has an empty url",
                source.name
            )));
        }
        Ok(())
    }
}

/// Configuration for the externally owned requirement cache.
///
/// # Defaults
///
/// - `max_entries`: `1000`
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Build-system defaults for local projects without a `[build-system]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_backend")]
    pub default_backend: String,
    #[serde(default = "default_requires")]
    pub default_requires: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            default_backend: default_backend(),
            default_requires: default_requires(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VcsConfig {
    /// Root directory for repository checkouts. Falls back to a directory
    /// under the system temp dir when unset.
    #[serde(default)]
    pub src_dir: Option<PathBuf>,
}

impl VcsConfig {
    /// Directory a repository named `name` is checked out into.
    pub fn checkout_directory(&self, name: &str) -> PathBuf {
        self.src_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pipreq-src"))
            .join(name)
    }
}

/// A package index, as listed in a Pipfile `[[source]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

impl IndexSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            verify_ssl: true,
        }
    }

    /// Host portion of the index URL, used for `--trusted-host`.
    pub fn host(&self) -> Option<&str> {
        let rest = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        let authority = rest.split('/').next()?;
        let host = authority.rsplit('@').next()?;
        (!host.is_empty()).then_some(host)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    MAX_CACHE_ENTRIES
}

fn default_backend() -> String {
    DEFAULT_BUILD_BACKEND.to_string()
}

fn default_requires() -> Vec<String> {
    vec!["setuptools>=40.8.0".to_string(), "wheel".to_string()]
}
