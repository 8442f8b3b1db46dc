//! Rendering helpers shared by every requirement kind.

use crate::markers::normalize_markers;
use pipreq_core::IndexSource;
use sha2::{Digest, Sha256};

/// Normalizes a package name according to PEP 503.
///
/// Lowercases the name and collapses runs of `-`, `_` and `.` into a single
/// `-`. Used for comparisons and structured-entry keys.
///
/// # Examples
///
/// ```
/// use pipreq::formatter::canonicalize_name;
///
/// assert_eq!(canonicalize_name("Flask"), "flask");
/// assert_eq!(canonicalize_name("django_rest_framework"), "django-rest-framework");
/// assert_eq!(canonicalize_name("Pillow.Image"), "pillow-image");
/// assert_eq!(canonicalize_name("my__package"), "my-package");
/// ```
pub fn canonicalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace(&['_', '.'][..], "-")
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Normalizes a name for display in a requirement line.
///
/// Lowercases and replaces underscores with hyphens but keeps dots, the way
/// pip writes names back out.
pub fn normalize_name(name: &str) -> String {
    if !name.chars().any(|c| c.is_uppercase() || c == '_') {
        return name.to_string();
    }
    name.to_lowercase().replace('_', "-")
}

/// Deterministic placeholder name derived from a source location.
///
/// The last seven hex digits of the location's SHA-256 digest.
pub fn placeholder_name(location: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(location.as_bytes()));
    digest[digest.len() - 7..].to_string()
}

/// Marker text for line output.
///
/// Values are single-quoted unless they contain an apostrophe, in which case
/// they keep double quotes.
pub fn markers_as_pip(markers: &str) -> String {
    normalize_markers(markers)
}

pub fn hash_as_pip(hash: &str) -> String {
    format!("--hash={hash}")
}

/// Index arguments for a requirement line.
///
/// The first source becomes `-i`, the rest `--extra-index-url`; sources with
/// SSL verification disabled also add `--trusted-host`. When `index` names a
/// source, only that source is emitted.
pub fn source_args(sources: &[IndexSource], index: Option<&str>) -> Vec<String> {
    let selected: Vec<&IndexSource> = match index {
        Some(name) => sources.iter().filter(|s| s.name == name).collect(),
        None => sources.iter().collect(),
    };

    let mut args = Vec::new();
    for (position, source) in selected.into_iter().enumerate() {
        let flag = if position == 0 { "-i" } else { "--extra-index-url" };
        args.push(format!("{flag} {}", source.url));
        if !source.verify_ssl
            && let Some(host) = source.host()
        {
            args.push(format!("--trusted-host {host}"));
        }
    }
    args
}
