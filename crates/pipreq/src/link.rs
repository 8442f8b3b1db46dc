//! URL and VCS link parsing.
//!
//! A [`Link`] splits a requirement URL into the pieces the model works
//! with: the VCS prefix, the bare URL, an `@ref` suffix, and the `egg` and
//! `subdirectory` fragment parameters. SSH shorthand (`git@host:path`) is
//! parsed through an equivalent `ssh://` URL but kept as written.

use crate::error::{RequirementError, Result};
use crate::types::Extras;
use once_cell::sync::Lazy;
use pipreq_core::VcsKind;
use regex::Regex;
use std::path::{Path, PathBuf};
use url::Url;

/// File extensions pip accepts as installable archives.
pub const ARCHIVE_EXTENSIONS: [&str; 11] = [
    ".whl", ".tar.gz", ".tgz", ".tar.bz2", ".tbz", ".tar.xz", ".txz", ".tar.lz", ".tlz", ".tar",
    ".zip",
];

static SSH_SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<user>[A-Za-z0-9._~-]+)@(?P<host>[A-Za-z0-9.-]+):(?P<path>.+)$").unwrap()
});

/// True if `name` ends with a known archive extension.
pub fn is_archive_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// True if the text starts with a URL scheme (`scheme://` or `file:`).
pub fn has_url_scheme(text: &str) -> bool {
    let lower = text.to_lowercase();
    if lower.starts_with("file:") {
        return true;
    }
    match lower.split_once("://") {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Converts an absolute local path into a `file://` URL.
pub fn path_to_url(path: &Path) -> Option<String> {
    Url::from_file_path(path).ok().map(String::from)
}

/// Name and version embedded in a wheel filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelName {
    pub name: String,
    pub version: String,
}

impl WheelName {
    /// Parses `{name}-{version}(-{build})?-{python}-{abi}-{platform}.whl`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pipreq::link::WheelName;
    ///
    /// let wheel = WheelName::parse("six-1.16.0-py2.py3-none-any.whl").unwrap();
    /// assert_eq!(wheel.name, "six");
    /// assert_eq!(wheel.version, "1.16.0");
    /// ```
    pub fn parse(filename: &str) -> Option<Self> {
        let stem = filename.strip_suffix(".whl")?;
        let parts: Vec<&str> = stem.split('-').collect();
        if !(5..=6).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        Some(Self {
            name: parts[0].replace('_', "-"),
            version: parts[1].to_string(),
        })
    }
}

/// A parsed requirement URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    vcs: Option<VcsKind>,
    url: String,
    reference: Option<String>,
    egg: Option<String>,
    egg_extras: Extras,
    subdirectory: Option<String>,
    ssh_shorthand: bool,
    parsed: Url,
}

impl Link {
    /// Parses a URL, optionally prefixed with `<vcs>+`.
    ///
    /// A trailing `@ref` is split off only for VCS links.
    ///
    /// # Examples
    ///
    /// ```
    /// use pipreq::link::Link;
    /// use pipreq_core::VcsKind;
    ///
    /// let link = Link::parse("git+https://github.com/psf/requests.git@v2.31.0#egg=requests[socks]").unwrap();
    /// assert_eq!(link.vcs(), Some(VcsKind::Git));
    /// assert_eq!(link.url(), "https://github.com/psf/requests.git");
    /// assert_eq!(link.reference(), Some("v2.31.0"));
    /// assert_eq!(link.egg(), Some("requests"));
    /// assert_eq!(link.egg_extras().to_vec(), vec!["socks"]);
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let vcs = VcsKind::from_url_prefix(text);
        let body = match vcs {
            Some(kind) => &text[kind.as_str().len() + 1..],
            None => text,
        };

        let (base, fragment) = match body.split_once('#') {
            Some((base, fragment)) => (base, Some(fragment)),
            None => (body, None),
        };
        let base = repair_file_scheme(base);

        let ssh_shorthand = vcs.is_some() && !base.contains("://") && SSH_SHORTHAND.is_match(&base);

        let (url, reference) = if vcs.is_some() {
            split_ref(&base, ssh_shorthand)
        } else {
            (base.clone(), None)
        };

        let normalized = if ssh_shorthand {
            shorthand_to_ssh(&url).unwrap_or_else(|| url.clone())
        } else {
            url.clone()
        };
        let parsed = Url::parse(&normalized)
            .map_err(|e| RequirementError::parse_error(text, format!("invalid URL: {e}")))?;

        let mut link = Self {
            vcs,
            url,
            reference,
            egg: None,
            egg_extras: Extras::new(),
            subdirectory: None,
            ssh_shorthand,
            parsed,
        };

        if let Some(fragment) = fragment {
            link.apply_fragment(fragment);
        }

        tracing::debug!(
            "parsed link {} (vcs={:?}, ref={:?}, egg={:?})",
            link.url,
            link.vcs,
            link.reference,
            link.egg
        );
        Ok(link)
    }

    fn apply_fragment(&mut self, fragment: &str) {
        for param in fragment.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            match key {
                "egg" => {
                    let (name, extras) = match value.split_once('[') {
                        Some((name, extras)) => (name.to_string(), Extras::parse(extras)),
                        None => (value.clone(), Extras::new()),
                    };
                    if !name.trim().is_empty() {
                        self.egg = Some(name.trim().to_string());
                    }
                    self.egg_extras = self.egg_extras.union(&extras);
                }
                "subdirectory" if !value.is_empty() => self.subdirectory = Some(value),
                _ => tracing::debug!("ignoring link fragment parameter '{}'", key),
            }
        }
    }

    pub fn vcs(&self) -> Option<VcsKind> {
        self.vcs
    }

    /// URL without VCS prefix, ref or fragment.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL with the `<vcs>+` prefix restored, without ref or fragment.
    pub fn url_with_vcs_prefix(&self) -> String {
        match self.vcs {
            Some(kind) => format!("{kind}+{}", self.url),
            None => self.url.clone(),
        }
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn egg(&self) -> Option<&str> {
        self.egg.as_deref()
    }

    pub fn egg_extras(&self) -> &Extras {
        &self.egg_extras
    }

    pub fn subdirectory(&self) -> Option<&str> {
        self.subdirectory.as_deref()
    }

    pub fn is_ssh_shorthand(&self) -> bool {
        self.ssh_shorthand
    }

    pub fn scheme(&self) -> &str {
        self.parsed.scheme()
    }

    pub fn is_file_url(&self) -> bool {
        self.parsed.scheme() == "file"
    }

    /// Local filesystem path for `file:` URLs.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if !self.is_file_url() {
            return None;
        }
        self.parsed.to_file_path().ok()
    }

    /// Last path segment, percent-decoded.
    pub fn filename(&self) -> String {
        let segment = self
            .parsed
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .unwrap_or_default();
        urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_string())
    }

    pub fn is_wheel(&self) -> bool {
        self.filename().to_lowercase().ends_with(".whl")
    }

    pub fn is_artifact(&self) -> bool {
        self.vcs.is_none() && is_archive_name(&self.filename())
    }

    /// Name and version from a wheel filename, if this is a wheel link.
    pub fn wheel_name(&self) -> Option<WheelName> {
        if !self.is_wheel() {
            return None;
        }
        WheelName::parse(&self.filename())
    }
}

/// `git+file:/path` is accepted and means `git+file:///path`.
fn repair_file_scheme(base: &str) -> String {
    match base.strip_prefix("file:") {
        Some(rest) if !rest.starts_with("//") => format!("file:///{}", rest.trim_start_matches('/')),
        _ => base.to_string(),
    }
}

/// Splits a trailing `@ref` from the path portion of a VCS URL.
fn split_ref(base: &str, ssh_shorthand: bool) -> (String, Option<String>) {
    let path_start = if ssh_shorthand {
        base.find(':').map(|i| i + 1)
    } else {
        base.find("://").map(|i| {
            let after = i + 3;
            base[after..].find('/').map_or(base.len(), |p| after + p)
        })
    };

    let Some(path_start) = path_start else {
        return (base.to_string(), None);
    };

    let (prefix, path) = base.split_at(path_start);
    match path.rsplit_once('@') {
        Some((path, reference)) if !reference.is_empty() => {
            (format!("{prefix}{path}"), Some(reference.to_string()))
        }
        Some((path, _)) => (format!("{prefix}{path}"), None),
        None => (base.to_string(), None),
    }
}

fn shorthand_to_ssh(shorthand: &str) -> Option<String> {
    let caps = SSH_SHORTHAND.captures(shorthand)?;
    Some(format!(
        "ssh://{}@{}/{}",
        &caps["user"],
        &caps["host"],
        caps["path"].trim_start_matches('/')
    ))
}

/// Assembles a VCS requirement URL.
///
/// `{vcs}+{url}[@{ref}][#egg={name}{extras}][&subdirectory={sub}]`
pub fn build_vcs_uri(
    vcs: VcsKind,
    url: &str,
    reference: Option<&str>,
    name: Option<&str>,
    extras: &Extras,
    subdirectory: Option<&str>,
) -> String {
    let prefix = format!("{vcs}+");
    let mut uri = if url.starts_with(&prefix) {
        url.to_string()
    } else {
        format!("{prefix}{url}")
    };

    if let Some(reference) = reference {
        uri.push('@');
        uri.push_str(reference);
    }

    let mut separator = '#';
    if let Some(name) = name {
        uri.push_str(&format!("#egg={name}{}", extras.as_pip()));
        separator = '&';
    }
    if let Some(sub) = subdirectory {
        uri.push_str(&format!("{separator}subdirectory={sub}"));
    }
    uri
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_https_vcs_with_ref_and_egg() {
        let link = Link::parse("git+https://example.com/x.git@abc123#egg=x[extra1,extra2]").unwrap();
        assert_eq!(link.vcs(), Some(VcsKind::Git));
        assert_eq!(link.url(), "https://example.com/x.git");
        assert_eq!(link.reference(), Some("abc123"));
        assert_eq!(link.egg(), Some("x"));
        assert_eq!(link.egg_extras().to_vec(), vec!["extra1", "extra2"]);
        assert_eq!(link.scheme(), "https");
    }

    #[test]
    fn test_userinfo_is_not_a_ref() {
        let link = Link::parse("git+https://user@github.com/org/repo.git#egg=repo").unwrap();
        assert_eq!(link.url(), "https://user@github.com/org/repo.git");
        assert_eq!(link.reference(), None);

        let link = Link::parse("git+https://user@github.com/org/repo.git@main#egg=repo").unwrap();
        assert_eq!(link.url(), "https://user@github.com/org/repo.git");
        assert_eq!(link.reference(), Some("main"));
    }

    #[test]
    fn test_ssh_shorthand() {
        let link = Link::parse("git+git@github.com:sarugaku/vistir.git@v0.4#egg=vistir").unwrap();
        assert!(link.is_ssh_shorthand());
        assert_eq!(link.url(), "git@github.com:sarugaku/vistir.git");
        assert_eq!(link.reference(), Some("v0.4"));
        assert_eq!(link.scheme(), "ssh");
        assert_eq!(link.url_with_vcs_prefix(), "git+git@github.com:sarugaku/vistir.git");
    }

    #[test]
    fn test_subdirectory_fragment() {
        let link = Link::parse(
            "hg+https://hg.example.com/mono@default#egg=core&subdirectory=packages/core",
        )
        .unwrap();
        assert_eq!(link.vcs(), Some(VcsKind::Hg));
        assert_eq!(link.reference(), Some("default"));
        assert_eq!(link.subdirectory(), Some("packages/core"));
    }

    #[test]
    fn test_non_vcs_keeps_at_sign() {
        let link = Link::parse("https://example.com/files/pkg@2x.zip").unwrap();
        assert_eq!(link.url(), "https://example.com/files/pkg@2x.zip");
        assert!(link.reference().is_none());
        assert!(link.is_artifact());
    }

    #[test]
    fn test_file_scheme_repair() {
        let link = Link::parse("git+file:/srv/repos/pkg#egg=pkg").unwrap();
        assert_eq!(link.url(), "file:///srv/repos/pkg");
        assert!(link.is_file_url());
        assert_eq!(link.to_file_path(), Some(PathBuf::from("/srv/repos/pkg")));
    }

    #[test]
    fn test_wheel_link() {
        let link =
            Link::parse("https://files.example.com/six-1.16.0-py2.py3-none-any.whl").unwrap();
        assert!(link.is_wheel());
        assert!(link.is_artifact());
        assert_eq!(
            link.wheel_name(),
            Some(WheelName {
                name: "six".into(),
                version: "1.16.0".into()
            })
        );
    }

    #[test]
    fn test_percent_encoded_filename() {
        let link = Link::parse("https://example.com/dl/my%20pkg-1.0.tar.gz").unwrap();
        assert_eq!(link.filename(), "my pkg-1.0.tar.gz");
    }

    #[test]
    fn test_invalid_url() {
        let err = Link::parse("git+not a url#egg=x").unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_unknown_fragment_params_are_ignored() {
        let link = Link::parse("https://example.com/pkg-1.0.tar.gz#sha256=abcd&egg=pkg").unwrap();
        assert_eq!(link.egg(), Some("pkg"));
    }

    #[test]
    fn test_wheel_name_parse() {
        let wheel = WheelName::parse("typing_extensions-4.8.0-1-py3-none-any.whl").unwrap();
        assert_eq!(wheel.name, "typing-extensions");
        assert_eq!(wheel.version, "4.8.0");
        assert!(WheelName::parse("not-a-wheel.whl").is_none());
        assert!(WheelName::parse("six-1.0.tar.gz").is_none());
    }

    #[test]
    fn test_has_url_scheme() {
        assert!(has_url_scheme("https://example.com"));
        assert!(has_url_scheme("git+ssh://git@github.com/x/y.git"));
        assert!(has_url_scheme("file:///tmp/pkg"));
        assert!(has_url_scheme("file:/tmp/pkg"));
        assert!(!has_url_scheme("requests>=2.0"));
        assert!(!has_url_scheme("./local"));
    }

    #[test]
    fn test_build_vcs_uri() {
        let extras = Extras::parse("[b,a]");
        assert_eq!(
            build_vcs_uri(
                VcsKind::Git,
                "https://example.com/x.git",
                Some("abc123"),
                Some("x"),
                &extras,
                None
            ),
            "git+https://example.com/x.git@abc123#egg=x[a,b]"
        );
        assert_eq!(
            build_vcs_uri(
                VcsKind::Svn,
                "svn+svn://svn.example.com/trunk",
                None,
                Some("proj"),
                &Extras::new(),
                Some("src")
            ),
            "svn+svn://svn.example.com/trunk#egg=proj&subdirectory=src"
        );
        assert_eq!(
            build_vcs_uri(
                VcsKind::Bzr,
                "https://bzr.example.com/proj",
                None,
                None,
                &Extras::new(),
                Some("src")
            ),
            "bzr+https://bzr.example.com/proj#subdirectory=src"
        );
    }

    #[test]
    fn test_path_to_url() {
        let url = path_to_url(Path::new("/srv/pkg")).unwrap();
        assert_eq!(url, "file:///srv/pkg");
        assert!(path_to_url(Path::new("relative/pkg")).is_none());
    }
}
