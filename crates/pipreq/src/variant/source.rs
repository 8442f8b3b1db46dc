//! State shared by file and VCS requirements.

use crate::build_system::BuildSystem;
use crate::error::{RequirementError, Result};
use crate::formatter::placeholder_name;
use crate::link::Link;
use crate::parser::RequirementLine;
use crate::types::{Dependencies, Extras, SetupPaths};
use pipreq_core::{BuildConfig, MetadataResolver, SetupInfo, SourceLocation};
use std::path::{Path, PathBuf};

/// A source that is not just a name: a local path, an artifact URL or a
/// repository.
///
/// Keeps the line it was parsed from, the identity (real or placeholder)
/// and the metadata discovered for it.
#[derive(Debug, Clone)]
pub struct ArtifactSource {
    name: String,
    placeholder: bool,
    path: Option<String>,
    absolute_path: Option<PathBuf>,
    link: Option<Link>,
    editable: bool,
    extras: Extras,
    setup_paths: SetupPaths,
    setup_info: Option<SetupInfo>,
    line: RequirementLine,
}

/// Mutable metadata saved before a scoped repository operation.
#[derive(Debug, Clone)]
pub(crate) struct SourceSnapshot {
    name: String,
    placeholder: bool,
    setup_paths: SetupPaths,
    setup_info: Option<SetupInfo>,
}

impl ArtifactSource {
    /// Builds the source from a parsed line.
    ///
    /// Name order: `explicit_name`, then the name the line carries (direct
    /// reference, egg fragment, wheel filename), then a placeholder derived
    /// from the location. An explicit name equal to the placeholder of the
    /// same location stays flagged as a placeholder.
    pub fn from_line(line: RequirementLine, explicit_name: Option<&str>) -> Self {
        let location = line_location(&line);
        let placeholder = placeholder_name(&location);

        let (name, is_placeholder) = match explicit_name.or(line.name()) {
            Some(name) => (name.to_string(), name == placeholder),
            None => {
                tracing::debug!("no name for {}, using placeholder {}", location, placeholder);
                (placeholder, true)
            }
        };

        Self {
            name,
            placeholder: is_placeholder,
            path: line.path().map(str::to_string),
            absolute_path: line.absolute_path().map(Path::to_path_buf),
            link: line.link().cloned(),
            editable: line.editable(),
            extras: line.extras().clone(),
            setup_paths: line.setup_paths().clone(),
            setup_info: None,
            line,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True while the name is a placeholder hash of the location.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.line.set_name(name.clone());
        self.name = name;
        self.placeholder = false;
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn extras(&self) -> &Extras {
        &self.extras
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn absolute_path(&self) -> Option<&Path> {
        self.absolute_path.as_deref()
    }

    pub fn link(&self) -> Option<&Link> {
        self.link.as_ref()
    }

    pub fn subdirectory(&self) -> Option<&str> {
        self.link.as_ref().and_then(Link::subdirectory)
    }

    pub fn setup_paths(&self) -> &SetupPaths {
        &self.setup_paths
    }

    /// Metadata discovered so far, without triggering discovery.
    pub fn setup_info(&self) -> Option<&SetupInfo> {
        self.setup_info.as_ref()
    }

    /// The line this source was parsed from.
    pub fn line(&self) -> &RequirementLine {
        &self.line
    }

    /// True for sources on the local filesystem.
    pub fn is_local(&self) -> bool {
        self.absolute_path.is_some()
    }

    /// The URL or path identifying the source.
    pub fn location(&self) -> String {
        line_location(&self.line)
    }

    /// The location handed to a [`MetadataResolver`].
    pub fn source_location(&self) -> SourceLocation {
        let mut location = SourceLocation::new(self.location())
            .with_subdirectory(self.subdirectory().map(str::to_string))
            .editable(self.editable)
            .with_extras(self.extras.to_vec());
        if let Some(path) = &self.absolute_path {
            location = location.with_path(path.clone());
        }
        location
    }

    /// Points the source at a checked-out tree and re-reads its build descriptors.
    pub(crate) fn set_checkout(&mut self, dir: &Path) {
        let project = match self.subdirectory() {
            Some(sub) => dir.join(sub),
            None => dir.to_path_buf(),
        };
        self.setup_paths = SetupPaths::discover(&project);
    }

    /// Discovers metadata once and caches it.
    ///
    /// A not-found failure is retried exactly once. A discovered name
    /// replaces a placeholder.
    pub fn discover(&mut self, resolver: &dyn MetadataResolver) -> Result<&SetupInfo> {
        let info = match self.setup_info.take() {
            Some(info) => info,
            None => {
                let info = discover_with_retry(resolver, &self.source_location())?;
                if let Some(name) = info.name.as_deref().filter(|n| !n.is_empty())
                    && self.placeholder
                {
                    tracing::debug!(
                        "replacing placeholder {} with discovered name {}",
                        self.name,
                        name
                    );
                    self.set_name(name);
                }
                info
            }
        };
        Ok(self.setup_info.insert(info))
    }

    /// The `[build-system]` table of the local project, or the configured
    /// legacy defaults.
    pub fn build_system(&self, defaults: &BuildConfig) -> Result<Option<BuildSystem>> {
        BuildSystem::for_project(&self.setup_paths, defaults)
    }

    /// Runtime, setup and build requirements.
    ///
    /// Build requirements combine the discovered ones with the local
    /// `[build-system] requires`.
    pub fn dependencies(
        &mut self,
        resolver: &dyn MetadataResolver,
        defaults: &BuildConfig,
    ) -> Result<Dependencies> {
        let local = self.build_system(defaults)?;
        let info = self.discover(resolver)?;

        let build_requires = dedup(
            info.build_requires
                .iter()
                .chain(local.iter().flat_map(|b| b.requires.iter())),
        );

        Ok(Dependencies {
            requires: info.requires.clone(),
            setup_requires: dedup(info.setup_requires.iter()),
            build_requires,
        })
    }

    /// The build backend: local `build-backend`, then the discovered one,
    /// then the configured default for projects with a build descriptor.
    pub fn build_backend(
        &mut self,
        resolver: &dyn MetadataResolver,
        defaults: &BuildConfig,
    ) -> Result<Option<String>> {
        if let Some(backend) = self.local_build_table()?.and_then(|b| b.backend) {
            return Ok(Some(backend));
        }

        let info = self.discover(resolver)?;
        if let Some(backend) = &info.build_backend {
            return Ok(Some(backend.clone()));
        }

        if self.setup_paths.is_installable() {
            return Ok(Some(defaults.default_backend.clone()));
        }
        Ok(None)
    }

    /// True when the project declares a `[build-system]` table or a backend was discovered.
    pub fn uses_pep517(&self) -> Result<bool> {
        if self.local_build_table()?.is_some() {
            return Ok(true);
        }
        Ok(self
            .setup_info
            .as_ref()
            .is_some_and(|info| info.build_backend.is_some()))
    }

    fn local_build_table(&self) -> Result<Option<BuildSystem>> {
        match &self.setup_paths.pyproject_toml {
            Some(pyproject) => {
                let content = std::fs::read_to_string(pyproject)?;
                BuildSystem::from_pyproject_str(&content)
            }
            None => Ok(None),
        }
    }

    pub(crate) fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            name: self.name.clone(),
            placeholder: self.placeholder,
            setup_paths: self.setup_paths.clone(),
            setup_info: self.setup_info.clone(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: SourceSnapshot) {
        if snapshot.name != self.name {
            self.line.set_name(snapshot.name.clone());
        }
        self.name = snapshot.name;
        self.placeholder = snapshot.placeholder;
        self.setup_paths = snapshot.setup_paths;
        self.setup_info = snapshot.setup_info;
    }
}

fn line_location(line: &RequirementLine) -> String {
    line.uri()
        .or_else(|| line.path().map(str::to_string))
        .unwrap_or_else(|| line.source().to_string())
}

/// Runs discovery, retrying once when the resolver reports not-found.
pub(crate) fn discover_with_retry(
    resolver: &dyn MetadataResolver,
    location: &SourceLocation,
) -> Result<SetupInfo> {
    match resolver.discover(location) {
        Ok(info) => Ok(info),
        Err(e) if e.is_not_found() => {
            tracing::debug!("metadata for {} not found, retrying once", location);
            resolver
                .discover(location)
                .map_err(|e| RequirementError::metadata_resolution(location.to_string(), e))
        }
        Err(e) => Err(RequirementError::metadata_resolution(
            location.to_string(),
            e,
        )),
    }
}

fn dedup<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LineParser;
    use pipreq_core::CoreError;
    use std::cell::Cell;
    use std::fs;

    fn remote(line: &str) -> ArtifactSource {
        ArtifactSource::from_line(RequirementLine::parse(line).unwrap(), None)
    }

    #[test]
    fn test_placeholder_name() {
        let source = remote("https://example.com/archive/master.zip");
        assert!(source.is_placeholder());
        assert_eq!(
            source.name(),
            placeholder_name("https://example.com/archive/master.zip")
        );
        assert_eq!(source.name().len(), 7);
    }

    #[test]
    fn test_distinct_locations_get_distinct_placeholders() {
        let a = remote("https://example.com/a/master.zip");
        let b = remote("https://example.com/b/master.zip");
        assert_ne!(a.name(), b.name());
    }

    #[test]
    fn test_explicit_placeholder_stays_flagged() {
        let url = "https://example.com/archive/master.zip";
        let line = RequirementLine::parse(url).unwrap();
        let source = ArtifactSource::from_line(line, Some(&placeholder_name(url)));
        assert!(source.is_placeholder());
    }

    #[test]
    fn test_egg_name_wins_over_placeholder() {
        let source = remote("https://example.com/archive/master.zip#egg=proj");
        assert_eq!(source.name(), "proj");
        assert!(!source.is_placeholder());
    }

    #[test]
    fn test_discover_replaces_placeholder_and_caches() {
        let calls = Cell::new(0);
        let resolver = |_: &SourceLocation| -> pipreq_core::Result<SetupInfo> {
            calls.set(calls.get() + 1);
            Ok(SetupInfo {
                name: Some("proj".into()),
                version: Some("1.0".into()),
                ..SetupInfo::default()
            })
        };

        let mut source = remote("https://example.com/archive/master.zip");
        source.discover(&resolver).unwrap();
        source.discover(&resolver).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(source.name(), "proj");
        assert!(!source.is_placeholder());
        assert_eq!(source.line().name(), Some("proj"));
    }

    #[test]
    fn test_discover_retries_not_found_once() {
        let calls = Cell::new(0);
        let resolver = |location: &SourceLocation| -> pipreq_core::Result<SetupInfo> {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                return Err(CoreError::NotFound {
                    location: location.uri.clone(),
                });
            }
            Ok(SetupInfo::default())
        };

        let mut source = remote("https://example.com/pkg-1.0.tar.gz#egg=pkg");
        assert!(source.discover(&resolver).is_ok());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_discover_gives_up_after_one_retry() {
        let calls = Cell::new(0);
        let resolver = |location: &SourceLocation| -> pipreq_core::Result<SetupInfo> {
            calls.set(calls.get() + 1);
            Err(CoreError::NotFound {
                location: location.uri.clone(),
            })
        };

        let mut source = remote("https://example.com/pkg-1.0.tar.gz#egg=pkg");
        let err = source.discover(&resolver).unwrap_err();
        assert!(matches!(err, RequirementError::MetadataResolution { .. }));
        assert_eq!(calls.get(), 2);
        assert!(source.setup_info().is_none());
    }

    #[test]
    fn test_other_failures_are_not_retried() {
        let calls = Cell::new(0);
        let resolver = |location: &SourceLocation| -> pipreq_core::Result<SetupInfo> {
            calls.set(calls.get() + 1);
            Err(CoreError::discovery(
                location.uri.clone(),
                std::io::Error::other("backend crashed"),
            ))
        };

        let mut source = remote("https://example.com/pkg-1.0.tar.gz#egg=pkg");
        assert!(source.discover(&resolver).is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_dependencies_merge_local_build_requires() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("proj");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("pyproject.toml"),
            "[build-system]\nrequires = [\"hatchling\", \"wheel\"]\nbuild-backend = \"hatchling.build\"\n",
        )
        .unwrap();

        let resolver = |_: &SourceLocation| -> pipreq_core::Result<SetupInfo> {
            Ok(SetupInfo {
                name: Some("proj".into()),
                requires: vec!["attrs".into()],
                setup_requires: vec!["cython".into(), "cython".into()],
                build_requires: vec!["wheel".into(), "cffi".into()],
                ..SetupInfo::default()
            })
        };

        let line = LineParser::with_base_dir(root.path()).parse("./proj").unwrap();
        let mut source = ArtifactSource::from_line(line, None);
        let deps = source
            .dependencies(&resolver, &BuildConfig::default())
            .unwrap();

        assert_eq!(deps.requires, vec!["attrs"]);
        assert_eq!(deps.setup_requires, vec!["cython"]);
        assert_eq!(deps.build_requires, vec!["wheel", "cffi", "hatchling"]);
        assert_eq!(
            source
                .build_backend(&resolver, &BuildConfig::default())
                .unwrap()
                .as_deref(),
            Some("hatchling.build")
        );
        assert!(source.uses_pep517().unwrap());
    }

    #[test]
    fn test_snapshot_restore() {
        let resolver = |_: &SourceLocation| -> pipreq_core::Result<SetupInfo> {
            Ok(SetupInfo {
                name: Some("proj".into()),
                ..SetupInfo::default()
            })
        };
        let mut source = remote("https://example.com/archive/master.zip");
        let snapshot = source.snapshot();
        source.discover(&resolver).unwrap();
        source.restore(snapshot);

        assert!(source.is_placeholder());
        assert!(source.setup_info().is_none());
    }
}
