//! The requirement aggregate.

use crate::context::ResolveContext;
use crate::entry::StructuredEntry;
use crate::error::{RequirementError, Result};
use crate::formatter::{
    canonicalize_name, hash_as_pip, markers_as_pip, normalize_name, source_args,
};
use crate::link::build_vcs_uri;
use crate::markers::{merge_markers, validate_markers};
use crate::parser::{LineParser, RequirementLine, is_valid_name};
use crate::specifier::SpecifierSet;
use crate::types::{Dependencies, Extras, SourceKey};
use crate::variant::{NamedRequirement, RequirementVariant, VcsRequirement};
use pipreq_core::{IndexSource, LineCache, SetupInfo, SourceRepository};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Build backend reported for named requirements.
pub const NAMED_BUILD_BACKEND: &str = "setuptools.build_meta";

/// Caller-owned cache of parsed requirements keyed by raw line.
pub type RequirementCache = LineCache<Requirement>;

/// Options for [`Requirement::as_line`].
#[derive(Debug, Clone, Copy)]
pub struct LineOptions<'a> {
    pub include_hashes: bool,
    pub include_extras: bool,
    pub include_markers: bool,
    /// Package indexes to emit as `-i`/`--extra-index-url` arguments.
    pub sources: Option<&'a [IndexSource]>,
}

impl Default for LineOptions<'_> {
    fn default() -> Self {
        Self {
            include_hashes: true,
            include_extras: true,
            include_markers: true,
            sources: None,
        }
    }
}

impl<'a> LineOptions<'a> {
    #[must_use]
    pub fn without_hashes(mut self) -> Self {
        self.include_hashes = false;
        self
    }

    #[must_use]
    pub fn without_extras(mut self) -> Self {
        self.include_extras = false;
        self
    }

    #[must_use]
    pub fn without_markers(mut self) -> Self {
        self.include_markers = false;
        self
    }

    #[must_use]
    pub fn with_sources(mut self, sources: &'a [IndexSource]) -> Self {
        self.sources = Some(sources);
        self
    }
}

/// A single dependency: a variant plus markers, hashes and index preference.
///
/// Equality and hashing compare the canonical line (the default
/// [`as_line`](Self::as_line) output, with direct references written in
/// `#egg=` form), so requirements built from a line and from a structured
/// entry compare equal when they describe the same dependency.
///
/// # Examples
///
/// ```
/// use pipreq::{LineOptions, Requirement};
///
/// let req = Requirement::from_line("Requests[socks]>=2.0,<3; python_version>=\"3.8\"").unwrap();
/// assert_eq!(req.name(), "Requests");
/// assert_eq!(req.canonical_name(), "requests");
/// assert_eq!(
///     req.as_line(&LineOptions::default()),
///     "requests[socks]>=2.0,<3 ; python_version >= '3.8'"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Requirement {
    variant: RequirementVariant,
    markers: Option<String>,
    hashes: BTreeSet<String>,
    index: Option<String>,
}

impl Requirement {
    /// Parses a requirement line, resolving relative paths against the
    /// working directory.
    pub fn from_line(raw: &str) -> Result<Self> {
        Self::parse_with(&LineParser::new(), raw)
    }

    pub fn parse_with(parser: &LineParser, raw: &str) -> Result<Self> {
        Self::from_parsed(parser.parse(raw)?, None)
    }

    /// Builds the requirement from an already parsed line.
    pub fn from_parsed(line: RequirementLine, explicit_name: Option<&str>) -> Result<Self> {
        let markers = line.markers().map(str::to_string);
        let hashes = line.hashes().iter().cloned().collect();
        let variant = RequirementVariant::from_line(line, explicit_name)?;
        Ok(Self {
            variant,
            markers,
            hashes,
            index: None,
        })
    }

    /// Parses through a caller-owned cache; failures are not cached.
    pub fn from_line_cached(raw: &str, cache: &mut RequirementCache) -> Result<Self> {
        cache.get_or_try_insert_with(raw, Self::from_line)
    }

    /// Parses a line and discovers its metadata.
    ///
    /// Discovery failures are logged and the requirement keeps its
    /// placeholder identity; parse errors still abort.
    pub fn from_line_resolved(raw: &str, ctx: &ResolveContext<'_>) -> Result<Self> {
        let mut req = Self::from_line(raw)?;
        let outcome = req.resolve_metadata(ctx).map(|_| ());
        if let Err(e) = outcome {
            tracing::warn!(
                "metadata discovery failed for {}, keeping name {}: {}",
                raw.trim(),
                req.name(),
                e
            );
        }
        Ok(req)
    }

    /// Builds a requirement from a structured entry, resolving relative
    /// paths against the working directory.
    ///
    /// VCS keys are checked first, then `path`/`file`/`uri`; anything else
    /// is a named requirement.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementError::AmbiguousSource`] when the entry names more
    /// than one source, [`RequirementError::InvalidEntry`] for malformed values.
    pub fn from_structured_entry(name: &str, entry: &StructuredEntry) -> Result<Self> {
        Self::from_structured_entry_with(&LineParser::new(), name, entry)
    }

    /// Like [`from_structured_entry`](Self::from_structured_entry), with
    /// relative paths resolved by `parser`.
    pub fn from_structured_entry_with(
        parser: &LineParser,
        name: &str,
        entry: &StructuredEntry,
    ) -> Result<Self> {
        entry.validate(name)?;
        let extras: Extras = entry.extras.iter().collect();
        let editable = if entry.editable { "-e " } else { "" };

        let variant = if let Some(&(vcs, url)) = entry.vcs_sources().first() {
            let uri = build_vcs_uri(
                vcs,
                url,
                entry.reference.as_deref(),
                Some(name),
                &extras,
                entry.subdirectory.as_deref(),
            );
            let line = parser.parse(&format!("{editable}{uri}"))?;
            RequirementVariant::from_line(line, Some(name))?
        } else if let Some(&(key, value)) = entry.file_sources().first() {
            let mut text = format!("{editable}{value}{}", extras.as_pip());
            match (key, entry.subdirectory.as_deref()) {
                (SourceKey::Path, Some(sub)) => {
                    tracing::warn!("ignoring subdirectory '{}' on path entry '{}'", sub, name);
                }
                (_, Some(sub)) => text.push_str(&format!("#subdirectory={sub}")),
                (_, None) => {}
            }
            let line = parser.parse(&text)?;
            RequirementVariant::from_line(line, Some(name))?
        } else {
            if !is_valid_name(name) {
                return Err(RequirementError::invalid_entry(name, "invalid package name"));
            }
            let specifier = match entry.version.as_deref().map(str::trim) {
                None | Some("") | Some("*") => None,
                Some(version) => Some(
                    version
                        .parse::<SpecifierSet>()
                        .map_err(|e| RequirementError::invalid_entry(name, e.to_string()))?,
                ),
            };
            RequirementVariant::Named(NamedRequirement::new(name, extras, specifier))
        };

        Ok(Self {
            variant,
            markers: entry.combined_markers()?,
            hashes: entry.all_hashes().into_iter().collect(),
            index: entry.index.clone(),
        })
    }

    /// A named requirement pinned to `version`.
    pub fn from_metadata(
        name: &str,
        version: Option<&str>,
        extras: &[&str],
        markers: Option<&str>,
    ) -> Result<Self> {
        if !is_valid_name(name) {
            return Err(RequirementError::parse_error(name, "invalid package name"));
        }
        let specifier = version.map(SpecifierSet::pinned);
        Ok(Self {
            variant: RequirementVariant::Named(NamedRequirement::new(
                name,
                extras.iter().collect(),
                specifier,
            )),
            markers: markers.map(validate_markers).transpose()?,
            hashes: BTreeSet::new(),
            index: None,
        })
    }

    pub fn variant(&self) -> &RequirementVariant {
        &self.variant
    }

    pub fn variant_mut(&mut self) -> &mut RequirementVariant {
        &mut self.variant
    }

    pub fn name(&self) -> &str {
        self.variant.name()
    }

    /// Name lowercased with `_` replaced by `-`.
    pub fn normalized_name(&self) -> String {
        normalize_name(self.name())
    }

    /// PEP 503 name.
    pub fn canonical_name(&self) -> String {
        canonicalize_name(self.name())
    }

    pub fn extras(&self) -> &Extras {
        self.variant.extras()
    }

    pub fn markers(&self) -> Option<&str> {
        self.markers.as_deref()
    }

    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.hashes.iter().map(String::as_str)
    }

    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    #[must_use]
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn editable(&self) -> bool {
        self.variant.editable()
    }

    /// The specifier: a named requirement's own, else a pin from the wheel
    /// filename or the discovered version.
    pub fn specifiers(&self) -> Option<SpecifierSet> {
        self.variant.specifier()
    }

    /// The version of an exact pin, if the specifiers are one.
    pub fn version(&self) -> Option<String> {
        self.specifiers()
            .and_then(|s| s.pinned_version().map(str::to_string))
    }

    pub fn is_named(&self) -> bool {
        matches!(self.variant, RequirementVariant::Named(_))
    }

    pub fn is_vcs(&self) -> bool {
        matches!(self.variant, RequirementVariant::Vcs(_))
    }

    pub fn is_file_or_url(&self) -> bool {
        matches!(self.variant, RequirementVariant::File(_))
    }

    pub fn is_wheel(&self) -> bool {
        matches!(&self.variant, RequirementVariant::File(file) if file.is_wheel())
    }

    pub fn is_direct_url(&self) -> bool {
        self.variant.is_direct_reference()
    }

    pub fn is_remote_artifact(&self) -> bool {
        matches!(&self.variant, RequirementVariant::File(file) if file.is_remote_artifact())
    }

    pub fn is_local(&self) -> bool {
        self.variant.source().is_some_and(|source| source.is_local())
    }

    /// Renders the requirement line.
    ///
    /// Parts, in order: source (with extras), a named requirement's
    /// specifier, ` ; markers`, sorted `--hash` options, index arguments.
    /// Index arguments are never emitted for local or VCS requirements.
    pub fn as_line(&self, options: &LineOptions<'_>) -> String {
        self.finish_line(self.variant.line_part(options.include_extras), options)
    }

    /// Like [`as_line`](Self::as_line), with a VCS requirement's resolved
    /// commit in place of its declared ref.
    pub fn pinned_line(&self, options: &LineOptions<'_>) -> String {
        let part = match &self.variant {
            RequirementVariant::Vcs(vcs) => vcs.pinned_line_part(options.include_extras),
            other => other.line_part(options.include_extras),
        };
        self.finish_line(part, options)
    }

    /// The line compared by `Eq` and `Hash`.
    fn canonical_line(&self) -> String {
        let part = match &self.variant {
            RequirementVariant::Named(_) => self.variant.line_part(true),
            RequirementVariant::File(file) => file.canonical_line_part(true),
            RequirementVariant::Vcs(vcs) => vcs.canonical_line_part(true),
        };
        self.finish_line(part, &LineOptions::default())
    }

    fn finish_line(&self, mut line: String, options: &LineOptions<'_>) -> String {
        if options.include_markers
            && let Some(markers) = &self.markers
        {
            line.push_str(" ; ");
            line.push_str(&markers_as_pip(markers));
        }
        if options.include_hashes {
            for hash in &self.hashes {
                line.push(' ');
                line.push_str(&hash_as_pip(hash));
            }
        }
        for arg in self.index_args(options) {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }

    fn index_args(&self, options: &LineOptions<'_>) -> Vec<String> {
        match options.sources {
            Some(sources) if !self.is_local() && !self.is_vcs() => {
                source_args(sources, self.index.as_deref())
            }
            _ => Vec::new(),
        }
    }

    /// The line as installer arguments: the requirement (with markers), each
    /// `--hash`, then index flags and values as separate arguments.
    pub fn as_args(&self, options: &LineOptions<'_>) -> Vec<String> {
        let bare = LineOptions {
            include_hashes: false,
            sources: None,
            ..*options
        };
        let mut args = vec![self.as_line(&bare)];
        if options.include_hashes {
            args.extend(self.hashes.iter().map(|h| hash_as_pip(h)));
        }
        for arg in self.index_args(options) {
            args.extend(arg.split_whitespace().map(str::to_string));
        }
        args
    }

    /// The `--hash=...` options, space separated.
    pub fn hashes_as_pip(&self) -> String {
        self.hashes
            .iter()
            .map(|h| hash_as_pip(h))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A copy with `hashes` added.
    #[must_use]
    pub fn add_hashes<I, S>(&self, hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut req = self.clone();
        req.hashes.extend(
            hashes
                .into_iter()
                .map(|h| h.as_ref().trim().to_string())
                .filter(|h| !h.is_empty()),
        );
        req
    }

    /// ORs `other` into the markers, dropping clauses already present.
    pub fn merge_markers(&mut self, other: &str) -> Result<()> {
        self.markers = Some(merge_markers(self.markers.as_deref(), other)?);
        Ok(())
    }

    /// The structured entry and the name it is stored under.
    pub fn as_structured_entry(&self) -> (String, StructuredEntry) {
        let mut entry = StructuredEntry::default();
        match &self.variant {
            RequirementVariant::Named(named) => {
                entry.version = Some(
                    named
                        .specifier()
                        .map_or_else(|| "*".to_string(), ToString::to_string),
                );
            }
            RequirementVariant::File(file) => {
                let (key, value) = file.entry_source();
                entry.set_source(key, value);
                entry.subdirectory = file.source().subdirectory().map(str::to_string);
                entry.editable = file.source().editable();
            }
            RequirementVariant::Vcs(vcs) => {
                entry.set_vcs_url(vcs.vcs(), vcs.url());
                entry.reference = vcs.declared_ref().map(str::to_string);
                entry.subdirectory = vcs.source().subdirectory().map(str::to_string);
                entry.editable = vcs.source().editable();
            }
        }

        entry.extras = self.extras().to_vec();
        entry.markers = self.markers.as_deref().map(markers_as_pip);
        entry.hashes = self.hashes.iter().cloned().collect();
        entry.index = self.index.clone();
        (self.name().to_string(), entry)
    }

    /// Discovers metadata for file and VCS sources, once per instance.
    ///
    /// Returns `Ok(None)` for named requirements.
    pub fn resolve_metadata(&mut self, ctx: &ResolveContext<'_>) -> Result<Option<&SetupInfo>> {
        match self.variant.source_mut() {
            Some(source) => Ok(Some(source.discover(ctx.resolver)?)),
            None => Ok(None),
        }
    }

    /// Runtime, setup and build requirements; empty for named requirements.
    pub fn dependencies(&mut self, ctx: &ResolveContext<'_>) -> Result<Dependencies> {
        match self.variant.source_mut() {
            Some(source) => source.dependencies(ctx.resolver, &ctx.config.build),
            None => Ok(Dependencies::default()),
        }
    }

    pub fn build_backend(&mut self, ctx: &ResolveContext<'_>) -> Result<Option<String>> {
        match self.variant.source_mut() {
            Some(source) => source.build_backend(ctx.resolver, &ctx.config.build),
            None => Ok(Some(NAMED_BUILD_BACKEND.to_string())),
        }
    }

    pub fn uses_pep517(&self) -> Result<bool> {
        match self.variant.source() {
            Some(source) => source.uses_pep517(),
            None => Ok(true),
        }
    }

    fn vcs_mut(&mut self) -> Option<&mut VcsRequirement> {
        match &mut self.variant {
            RequirementVariant::Vcs(vcs) => Some(vcs),
            _ => None,
        }
    }

    /// Updates a VCS checkout and returns the resolved commit.
    ///
    /// Returns `Ok(None)` for requirements that are not VCS sources.
    pub fn update_repo(
        &mut self,
        ctx: &ResolveContext<'_>,
        reference: Option<&str>,
    ) -> Result<Option<String>> {
        self.vcs_mut()
            .map(|vcs| vcs.update_repo(ctx, reference))
            .transpose()
    }

    pub fn commit_hash(&mut self, ctx: &ResolveContext<'_>) -> Result<Option<String>> {
        self.vcs_mut().map(|vcs| vcs.commit_hash(ctx)).transpose()
    }

    /// Runs `f` against a prepared repository; see
    /// [`VcsRequirement::locked_repository`].
    pub fn locked_repository<T, F>(&mut self, ctx: &ResolveContext<'_>, f: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut VcsRequirement, &mut dyn SourceRepository) -> Result<T>,
    {
        self.vcs_mut()
            .map(|vcs| vcs.locked_repository(ctx, f))
            .transpose()
    }
}

impl PartialEq for Requirement {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_line() == other.canonical_line()
    }
}

impl Eq for Requirement {}

impl Hash for Requirement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_line().hash(state);
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_line(&LineOptions::default()))
    }
}

impl std::str::FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_line(s)
    }
}
