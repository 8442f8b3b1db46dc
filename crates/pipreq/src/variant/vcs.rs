use super::source::ArtifactSource;
use crate::context::ResolveContext;
use crate::error::{RequirementError, Result};
use crate::link::build_vcs_uri;
use crate::parser::RequirementLine;
use crate::specifier::SpecifierSet;
use pipreq_core::{PipreqConfig, RepositorySpec, SourceRepository, VcsKind};
use std::path::PathBuf;

/// A requirement on a version-controlled source.
///
/// The ref written on the line (`declared_ref`) and the commit a checkout
/// resolved to (`resolved_commit`) are kept apart. Rendering uses the
/// declared ref; [`pinned_line_part`](Self::pinned_line_part) uses the
/// resolved commit.
#[derive(Debug, Clone)]
pub struct VcsRequirement {
    source: ArtifactSource,
    vcs: VcsKind,
    declared_ref: Option<String>,
    resolved_commit: Option<String>,
    direct_reference: bool,
}

impl VcsRequirement {
    /// Builds a VCS requirement from a line classified as VCS.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementError::MissingIdentity`] when the line has no egg
    /// fragment and no explicit name was given.
    pub fn from_line(line: RequirementLine, explicit_name: Option<&str>) -> Result<Self> {
        let Some(vcs) = line.vcs() else {
            return Err(RequirementError::parse_error(
                line.raw(),
                "not a version control requirement",
            ));
        };

        if explicit_name.or(line.name()).is_none() {
            return Err(RequirementError::missing_identity(line.raw()));
        }

        let declared_ref = line.reference().map(str::to_string);
        let direct_reference = line.is_direct_reference();
        Ok(Self {
            source: ArtifactSource::from_line(line, explicit_name),
            vcs,
            declared_ref,
            resolved_commit: None,
            direct_reference,
        })
    }

    pub fn source(&self) -> &ArtifactSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut ArtifactSource {
        &mut self.source
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn vcs(&self) -> VcsKind {
        self.vcs
    }

    /// Repository URL without VCS prefix, ref or fragment.
    pub fn url(&self) -> &str {
        self.source.link().map_or("", |link| link.url())
    }

    /// The branch, tag or commit written on the line.
    pub fn declared_ref(&self) -> Option<&str> {
        self.declared_ref.as_deref()
    }

    /// The commit the last repository update resolved to.
    pub fn resolved_commit(&self) -> Option<&str> {
        self.resolved_commit.as_deref()
    }

    pub fn is_direct_reference(&self) -> bool {
        self.direct_reference
    }

    /// Discovered version, pinned with `==`.
    pub fn specifier(&self) -> Option<SpecifierSet> {
        self.source
            .setup_info()
            .and_then(|info| info.version.as_deref())
            .map(SpecifierSet::pinned)
    }

    /// Canonical line fragment using the declared ref.
    pub fn line_part(&self, include_extras: bool) -> String {
        self.render(
            self.declared_ref.as_deref(),
            include_extras,
            self.direct_reference,
        )
    }

    /// The line fragment with direct references written in `#egg=` form.
    pub fn canonical_line_part(&self, include_extras: bool) -> String {
        self.render(self.declared_ref.as_deref(), include_extras, false)
    }

    /// Line fragment with the resolved commit in place of the declared ref.
    pub fn pinned_line_part(&self, include_extras: bool) -> String {
        let reference = self
            .resolved_commit
            .as_deref()
            .or(self.declared_ref.as_deref());
        self.render(reference, include_extras, self.direct_reference)
    }

    fn render(&self, reference: Option<&str>, include_extras: bool, direct: bool) -> String {
        let extras = if include_extras {
            self.source.extras().clone()
        } else {
            Default::default()
        };

        let body = if direct {
            let uri = build_vcs_uri(
                self.vcs,
                self.url(),
                reference,
                None,
                &Default::default(),
                self.source.subdirectory(),
            );
            format!("{}{} @ {uri}", self.name(), extras.as_pip())
        } else {
            build_vcs_uri(
                self.vcs,
                self.url(),
                reference,
                Some(self.name()),
                &extras,
                self.source.subdirectory(),
            )
        };

        if self.source.editable() {
            format!("-e {body}")
        } else {
            body
        }
    }

    /// Directory the repository is checked out into.
    ///
    /// Local repositories are used in place; others go under the configured
    /// source directory.
    pub fn checkout_directory(&self, config: &PipreqConfig) -> PathBuf {
        match self.source.absolute_path() {
            Some(path) => path.to_path_buf(),
            None => config.vcs.checkout_directory(self.name()),
        }
    }

    pub fn repository_spec(&self, config: &PipreqConfig) -> RepositorySpec {
        RepositorySpec {
            vcs: self.vcs,
            url: self.url().to_string(),
            name: self.name().to_string(),
            reference: self.declared_ref.clone(),
            checkout_directory: self.checkout_directory(config),
            subdirectory: self.source.subdirectory().map(str::to_string),
            local: self.source.is_local(),
        }
    }

    fn open(&self, ctx: &ResolveContext<'_>) -> Result<Box<dyn SourceRepository>> {
        let spec = self.repository_spec(ctx.config);
        tracing::debug!(
            "opening {} repository {} in {}",
            spec.vcs,
            spec.url,
            spec.checkout_directory.display()
        );
        ctx.repositories
            .open(&spec)
            .map_err(|e| RequirementError::repository_operation(&spec.url, e))
    }

    fn prepare(&self, repo: &mut dyn SourceRepository, reference: Option<&str>) -> Result<()> {
        let url = self.url();
        if !self.source.is_local() {
            repo.obtain()
                .map_err(|e| RequirementError::repository_operation(url, e))?;
        }
        if let Some(reference) = reference {
            repo.checkout_ref(reference)
                .map_err(|e| RequirementError::repository_operation(url, e))?;
        }
        Ok(())
    }

    /// Obtains the repository, checks out `reference` (or the declared ref)
    /// and records the commit it resolves to.
    ///
    /// The declared ref is left unchanged.
    pub fn update_repo(
        &mut self,
        ctx: &ResolveContext<'_>,
        reference: Option<&str>,
    ) -> Result<String> {
        let mut repo = self.open(ctx)?;
        let reference = reference.or(self.declared_ref.as_deref());
        self.prepare(repo.as_mut(), reference)?;

        let commit = repo
            .commit_hash()
            .map_err(|e| RequirementError::repository_operation(self.url(), e))?;
        let checkout = repo.checkout_directory().to_path_buf();

        tracing::debug!("{} resolved to commit {}", self.name(), commit);
        self.source.set_checkout(&checkout);
        self.resolved_commit = Some(commit.clone());
        Ok(commit)
    }

    /// The resolved commit, asking the repository when none is recorded yet.
    pub fn commit_hash(&mut self, ctx: &ResolveContext<'_>) -> Result<String> {
        if let Some(commit) = &self.resolved_commit {
            return Ok(commit.clone());
        }
        let repo = self.open(ctx)?;
        let commit = repo
            .commit_hash()
            .map_err(|e| RequirementError::repository_operation(self.url(), e))?;
        self.resolved_commit = Some(commit.clone());
        Ok(commit)
    }

    /// Runs `f` with a prepared repository handle.
    ///
    /// The handle is dropped when `f` returns. If `f` fails, the name,
    /// discovered metadata, build descriptors and resolved commit are
    /// restored to their values before the call.
    pub fn locked_repository<T, F>(&mut self, ctx: &ResolveContext<'_>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self, &mut dyn SourceRepository) -> Result<T>,
    {
        let mut repo = self.open(ctx)?;
        self.prepare(repo.as_mut(), self.declared_ref.as_deref())?;

        let snapshot = self.source.snapshot();
        let resolved_commit = self.resolved_commit.clone();

        let checkout = repo.checkout_directory().to_path_buf();
        self.source.set_checkout(&checkout);

        match f(self, repo.as_mut()) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::debug!("rolling back {} after failed repository operation", self.name());
                self.source.restore(snapshot);
                self.resolved_commit = resolved_commit;
                Err(e)
            }
        }
    }
}
