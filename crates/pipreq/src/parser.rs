use crate::error::{RequirementError, Result};
use crate::link::{Link, WheelName, has_url_scheme, is_archive_name, path_to_url};
use crate::markers::validate_markers;
use crate::specifier::SpecifierSet;
use crate::types::{Extras, SetupPaths};
use once_cell::sync::Lazy;
use pipreq_core::VcsKind;
use regex::Regex;
use std::path::{Path, PathBuf};

static NAMED_REQUIREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<spec>.*)$",
    )
    .unwrap()
});

static DIRECT_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*@\s*(?P<url>\S.*)$",
    )
    .unwrap()
});

static PACKAGE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").unwrap());

static TRAILING_EXTRAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>.*?)(?P<extras>\[[^\[\]]*\])$").unwrap());

/// How a requirement line was classified.
///
/// Exactly one kind holds for every parsed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// A package name with optional extras and specifiers.
    Named,
    /// A local file or directory.
    Path,
    /// A URL to an artifact or a local `file:` URL.
    Url,
    /// A `<vcs>+<url>` source.
    Vcs,
}

/// A requirement line broken into its fields.
///
/// Built once by [`LineParser::parse`]; every field is derived eagerly in a
/// fixed order and never recomputed. [`set_name`](Self::set_name) is the only
/// mutation and keeps the dependent fields consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementLine {
    raw: String,
    source: String,
    editable: bool,
    hashes: Vec<String>,
    markers: Option<String>,
    extras: Extras,
    kind: LineKind,
    link: Option<Link>,
    path: Option<String>,
    absolute_path: Option<PathBuf>,
    name: Option<String>,
    specifier: Option<SpecifierSet>,
    direct_reference: bool,
    setup_paths: SetupPaths,
    wheel: Option<WheelName>,
}

impl RequirementLine {
    /// Parses a line with the default [`LineParser`].
    pub fn parse(raw: &str) -> Result<Self> {
        LineParser::new().parse(raw)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The source part of the line, without editable flag, extras, markers or hashes.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    pub fn is_named(&self) -> bool {
        self.kind == LineKind::Named
    }

    pub fn is_vcs(&self) -> bool {
        self.kind == LineKind::Vcs
    }

    pub fn is_path(&self) -> bool {
        self.kind == LineKind::Path
    }

    pub fn is_url(&self) -> bool {
        self.kind == LineKind::Url
    }

    pub fn editable(&self) -> bool {
        self.editable
    }

    pub fn hashes(&self) -> &[String] {
        &self.hashes
    }

    pub fn markers(&self) -> Option<&str> {
        self.markers.as_deref()
    }

    pub fn extras(&self) -> &Extras {
        &self.extras
    }

    pub fn link(&self) -> Option<&Link> {
        self.link.as_ref()
    }

    pub fn vcs(&self) -> Option<VcsKind> {
        self.link.as_ref().and_then(Link::vcs)
    }

    /// The local path as written, normalized to a `./`-relative or absolute form.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Local filesystem location, for paths, `file:` URLs and local VCS repositories.
    pub fn absolute_path(&self) -> Option<&Path> {
        self.absolute_path.as_deref()
    }

    /// URL for the source: the link URL, or a `file://` URL for local paths.
    pub fn uri(&self) -> Option<String> {
        match (&self.link, &self.absolute_path) {
            (Some(link), _) => Some(link.url().to_string()),
            (None, Some(path)) => path_to_url(path),
            (None, None) => None,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        self.link.as_ref().and_then(Link::reference)
    }

    pub fn subdirectory(&self) -> Option<&str> {
        self.link.as_ref().and_then(Link::subdirectory)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn specifier(&self) -> Option<&SpecifierSet> {
        self.specifier.as_ref()
    }

    /// True for PEP 508 direct references (`name @ url`).
    pub fn is_direct_reference(&self) -> bool {
        self.direct_reference
    }

    pub fn setup_paths(&self) -> &SetupPaths {
        &self.setup_paths
    }

    pub fn wheel(&self) -> Option<&WheelName> {
        self.wheel.as_ref()
    }

    pub fn is_wheel(&self) -> bool {
        self.wheel.is_some()
    }

    /// True for sources on the local filesystem.
    pub fn is_local(&self) -> bool {
        self.absolute_path.is_some()
            || self.link.as_ref().is_some_and(Link::is_file_url)
    }

    /// True for archives downloaded from a remote URL.
    pub fn is_remote_artifact(&self) -> bool {
        self.kind == LineKind::Url
            && !self.is_local()
            && self.link.as_ref().is_some_and(Link::is_artifact)
    }

    /// Overrides the name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        tracing::debug!("line name set to {}", name);
        self.name = Some(name);
    }
}

/// Parser for requirement lines.
///
/// Relative paths are resolved against the base directory (the process
/// working directory unless set with [`with_base_dir`](Self::with_base_dir)).
///
/// # Examples
///
/// ```
/// use pipreq::parser::{LineKind, LineParser};
///
/// let parser = LineParser::new();
/// let line = parser.parse("requests[security]>=2.0,<3 ; python_version >= '3.8'").unwrap();
///
/// assert_eq!(line.kind(), LineKind::Named);
/// assert_eq!(line.name(), Some("requests"));
/// assert_eq!(line.extras().to_vec(), vec!["security"]);
/// assert_eq!(line.specifier().unwrap().to_string(), ">=2.0,<3");
/// assert_eq!(line.markers(), Some("python_version >= '3.8'"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    base_dir: Option<PathBuf>,
}

impl LineParser {
    /// Create a new line parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that resolves relative paths against `dir`.
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    pub fn base_dir(&self) -> PathBuf {
        self.base_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Parses a requirement line.
    ///
    /// The derivations run in a fixed order: editable flag, hashes, markers,
    /// extras, classification, then link or name details.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementError::Parse`] if:
    /// - the line is empty or a comment
    /// - brackets are unbalanced
    /// - a local path or `file:` URL is not installable
    /// - a named requirement has an invalid name or specifier
    /// - a URL cannot be parsed
    ///
    /// Returns [`RequirementError::InvalidMarkers`] for invalid markers.
    pub fn parse(&self, raw: &str) -> Result<RequirementLine> {
        let trimmed = strip_comment(raw.trim());
        if trimmed.is_empty() {
            return Err(RequirementError::parse_error(raw, "empty requirement line"));
        }

        let (editable, rest) = strip_editable(trimmed);
        let (rest, hashes) = split_hashes(rest);
        let (rest, markers) = split_markers(&rest);
        let markers = markers.map(|m| validate_markers(&m)).transpose()?;
        let rest = strip_quotes(rest.trim());
        check_brackets(raw, rest)?;

        let mut line = RequirementLine {
            raw: raw.trim().to_string(),
            source: rest.to_string(),
            editable,
            hashes,
            markers,
            extras: Extras::new(),
            kind: LineKind::Named,
            link: None,
            path: None,
            absolute_path: None,
            name: None,
            specifier: None,
            direct_reference: false,
            setup_paths: SetupPaths::default(),
            wheel: None,
        };

        if let Some(caps) = DIRECT_REFERENCE.captures(rest) {
            let target = caps["url"].trim();
            if is_source_like(target) {
                line.direct_reference = true;
                line.name = Some(caps["name"].to_string());
                if let Some(extras) = caps.name("extras") {
                    line.extras = Extras::parse(extras.as_str());
                }
                line.source = target.to_string();
                self.parse_source(raw, target, &mut line)?;
                return Ok(line);
            }
        }

        let (base, trailing_extras) = split_trailing_extras(rest);
        let base = base.as_str();
        if VcsKind::from_url_prefix(base).is_some() || has_url_scheme(base) {
            line.extras = trailing_extras;
            line.source = base.to_string();
            self.parse_source(raw, base, &mut line)?;
            return Ok(line);
        }

        let candidate = self.resolve_path(base);
        if is_installable_path(&candidate) {
            line.extras = trailing_extras;
            line.source = base.to_string();
            self.apply_local_path(base, candidate, &mut line);
            return Ok(line);
        }
        if looks_like_path(base) {
            return Err(RequirementError::parse_error(
                raw,
                format!("'{}' does not point to an installable project or archive", base),
            ));
        }

        if editable {
            return Err(RequirementError::parse_error(
                raw,
                "editable requirements must be a local path or a VCS URL",
            ));
        }
        parse_named(raw, rest, &mut line)?;
        Ok(line)
    }

    fn parse_source(&self, raw: &str, source: &str, line: &mut RequirementLine) -> Result<()> {
        if VcsKind::from_url_prefix(source).is_none() && !has_url_scheme(source) {
            let candidate = self.resolve_path(source);
            if !is_installable_path(&candidate) {
                return Err(RequirementError::parse_error(
                    raw,
                    format!("'{}' does not point to an installable project or archive", source),
                ));
            }
            self.apply_local_path(source, candidate, line);
            return Ok(());
        }

        let link = Link::parse(source)?;
        line.extras = line.extras.union(link.egg_extras());

        match (&line.name, link.egg()) {
            (Some(explicit), Some(egg)) if explicit != egg => {
                tracing::debug!("explicit name {} overrides egg fragment {}", explicit, egg);
            }
            (None, Some(egg)) => line.name = Some(egg.to_string()),
            _ => {}
        }

        if link.vcs().is_some() {
            line.kind = LineKind::Vcs;
            if let Some(path) = link.to_file_path() {
                if path.is_dir() {
                    line.setup_paths = discover_setup_paths(&path, link.subdirectory());
                }
                line.absolute_path = Some(path);
            }
        } else {
            line.kind = LineKind::Url;
            if let Some(path) = link.to_file_path() {
                if !is_installable_path(&path) {
                    return Err(RequirementError::parse_error(
                        raw,
                        format!("'{}' is not installable", link.url()),
                    ));
                }
                if path.is_dir() {
                    line.setup_paths = discover_setup_paths(&path, link.subdirectory());
                }
                line.absolute_path = Some(path);
            }
            line.wheel = link.wheel_name();
            if line.name.is_none() {
                line.name = line.wheel.as_ref().map(|w| w.name.clone());
            }
        }

        tracing::debug!("classified '{}' as {:?}", raw.trim(), line.kind);
        line.link = Some(link);
        Ok(())
    }

    fn apply_local_path(&self, text: &str, absolute: PathBuf, line: &mut RequirementLine) {
        line.kind = LineKind::Path;
        line.path = Some(normalize_relative_path(text));
        if absolute.is_dir() {
            line.setup_paths = SetupPaths::discover(&absolute);
        } else if let Some(file_name) = absolute.file_name().and_then(|n| n.to_str()) {
            line.wheel = WheelName::parse(file_name);
            if line.name.is_none() {
                line.name = line.wheel.as_ref().map(|w| w.name.clone());
            }
        }
        line.absolute_path = Some(absolute);
        tracing::debug!("classified '{}' as local path", text);
    }

    fn resolve_path(&self, text: &str) -> PathBuf {
        let expanded = match text.strip_prefix("~/") {
            Some(rest) => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(rest))
                .unwrap_or_else(|| PathBuf::from(text)),
            None => PathBuf::from(text),
        };
        if expanded.is_absolute() {
            expanded
        } else {
            self.base_dir().join(expanded)
        }
    }
}

/// True if `name` is a valid distribution name.
pub fn is_valid_name(name: &str) -> bool {
    PACKAGE_NAME.is_match(name)
}

fn parse_named(raw: &str, text: &str, line: &mut RequirementLine) -> Result<()> {
    let caps = NAMED_REQUIREMENT
        .captures(text)
        .ok_or_else(|| RequirementError::parse_error(raw, "not a valid requirement name"))?;

    line.name = Some(caps["name"].to_string());
    if let Some(extras) = caps.name("extras") {
        line.extras = Extras::parse(extras.as_str());
    }

    let spec = caps["spec"].trim();
    if !spec.is_empty() {
        let specifier: SpecifierSet = spec
            .parse()
            .map_err(|e: crate::specifier::InvalidSpecifier| {
                RequirementError::parse_error(raw, e.to_string())
            })?;
        if !specifier.is_empty() {
            line.specifier = Some(specifier);
        }
    }

    line.kind = LineKind::Named;
    Ok(())
}

/// Removes a trailing ` # comment`; `#` inside URLs is kept.
fn strip_comment(line: &str) -> &str {
    if line.starts_with('#') {
        return "";
    }
    match line.find(" #").or_else(|| line.find("\t#")) {
        Some(idx) => line[..idx].trim_end(),
        None => line,
    }
}

fn strip_editable(line: &str) -> (bool, &str) {
    for prefix in ["-e ", "--editable=", "--editable "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return (true, rest.trim_start());
        }
    }
    (false, line)
}

/// Removes `--hash=<alg>:<digest>` (or `--hash <value>`) tokens.
fn split_hashes(line: &str) -> (String, Vec<String>) {
    if !line.contains("--hash") {
        return (line.to_string(), Vec::new());
    }

    let mut kept = Vec::new();
    let mut hashes = Vec::new();
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        let value = match token.strip_prefix("--hash=") {
            Some(value) => Some(value),
            None if token == "--hash" => tokens.next(),
            None => None,
        };
        if let Some(value) = value {
            // `--hash=sha256:...;markers` leaves the separator on the token
            match value.strip_suffix(';') {
                Some(value) => {
                    hashes.push(value.to_string());
                    kept.push(";");
                }
                None => hashes.push(value.to_string()),
            }
        } else {
            kept.push(token);
        }
    }
    (kept.join(" "), hashes)
}

/// Splits off a marker clause. URL-like lines need `"; "` so a bare `;`
/// inside a URL is not mistaken for a separator.
fn split_markers(line: &str) -> (String, Option<String>) {
    let separator = if line.contains("://") || VcsKind::from_url_prefix(line).is_some() {
        "; "
    } else {
        ";"
    };

    match line.split_once(separator) {
        Some((source, markers)) => {
            let markers = markers.trim();
            let markers = (!markers.is_empty()).then(|| markers.to_string());
            (source.trim_end().to_string(), markers)
        }
        None => (line.to_string(), None),
    }
}

fn strip_quotes(line: &str) -> &str {
    for quote in ['"', '\''] {
        if line.len() >= 2 && line.starts_with(quote) && line.ends_with(quote) {
            return line[1..line.len() - 1].trim();
        }
    }
    line
}

fn check_brackets(raw: &str, line: &str) -> Result<()> {
    let mut depth = 0i32;
    for c in line.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(RequirementError::parse_error(raw, "unmatched ']'"));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(RequirementError::parse_error(raw, "unmatched '['"));
    }
    Ok(())
}

/// Splits a trailing `[extras]` from the part of the line before any fragment.
fn split_trailing_extras(line: &str) -> (String, Extras) {
    let (base, fragment) = match line.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (line, None),
    };

    let Some(caps) = TRAILING_EXTRAS.captures(base) else {
        return (line.to_string(), Extras::new());
    };
    let stripped = caps.name("base").map_or(base, |m| m.as_str());
    let extras = Extras::parse(&caps["extras"]);
    match fragment {
        Some(fragment) => (format!("{stripped}#{fragment}"), extras),
        None => (stripped.to_string(), extras),
    }
}

fn looks_like_path(text: &str) -> bool {
    text == "."
        || text == ".."
        || text.starts_with("./")
        || text.starts_with("../")
        || text.starts_with('/')
        || text.starts_with('~')
        || text.contains('/')
        || text.contains('\\')
        || is_archive_name(text)
}

/// True if the target of a `name @ target` line is a URL or path.
fn is_source_like(target: &str) -> bool {
    VcsKind::from_url_prefix(target).is_some() || has_url_scheme(target) || looks_like_path(target)
}

fn is_installable_path(path: &Path) -> bool {
    if path.is_dir() {
        SetupPaths::discover(path).is_installable()
    } else if path.is_file() {
        is_archive_name(&path.to_string_lossy())
    } else {
        false
    }
}

fn discover_setup_paths(path: &Path, subdirectory: Option<&str>) -> SetupPaths {
    match subdirectory {
        Some(sub) => SetupPaths::discover(&path.join(sub)),
        None => SetupPaths::discover(path),
    }
}

fn normalize_relative_path(text: &str) -> String {
    let text = text.replace('\\', "/");
    let trimmed = if text.len() > 1 {
        text.trim_end_matches('/')
    } else {
        text.as_str()
    };
    if trimmed.starts_with('/')
        || trimmed.starts_with('~')
        || trimmed == "."
        || trimmed == ".."
        || trimmed.starts_with("./")
        || trimmed.starts_with("../")
    {
        trimmed.to_string()
    } else {
        format!("./{trimmed}")
    }
}
