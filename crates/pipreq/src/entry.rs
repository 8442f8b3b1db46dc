//! Pipfile-style structured entries.
//!
//! An entry is the table (or bare version string) a Pipfile stores under a
//! package name:
//!
//! ```toml
//! [packages]
//! requests = "*"
//! flask = { version = ">=3.0", extras = ["async"] }
//! local-pkg = { path = "./local-pkg", editable = true }
//! tool = { git = "https://example.com/tool.git", ref = "v1.2" }
//! ```

use crate::error::{RequirementError, Result};
use crate::markers::{ENVIRONMENT_KEYS, markers_from_environment, validate_markers};
use crate::types::SourceKey;
use pipreq_core::VcsKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use toml_edit::{Array, DocumentMut, InlineTable, Item, Value};

fn is_false(value: &bool) -> bool {
    !*value
}

/// One structured entry.
///
/// At most one of `path`, `file`, `uri` and the VCS keys may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bzr: Option<String>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdirectory: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub editable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hashes: Vec<String>,
    /// Single hash, written back as read; [`all_hashes`](Self::all_hashes)
    /// merges it with `hashes`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Environment marker keys such as `os_name` or `python_version`.
    #[serde(flatten)]
    pub environment: BTreeMap<String, String>,
}

impl StructuredEntry {
    /// An entry holding only a version specifier (`"*"` for any version).
    pub fn from_version(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::default()
        }
    }

    /// The `path`, `file` and `uri` values that are set.
    pub fn file_sources(&self) -> Vec<(SourceKey, &str)> {
        [
            (SourceKey::Path, &self.path),
            (SourceKey::File, &self.file),
            (SourceKey::Uri, &self.uri),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }

    /// The VCS keys that are set.
    pub fn vcs_sources(&self) -> Vec<(VcsKind, &str)> {
        VcsKind::ALL
            .into_iter()
            .filter_map(|kind| self.vcs_url(kind).map(|url| (kind, url)))
            .collect()
    }

    fn vcs_url(&self, kind: VcsKind) -> Option<&str> {
        match kind {
            VcsKind::Git => self.git.as_deref(),
            VcsKind::Hg => self.hg.as_deref(),
            VcsKind::Svn => self.svn.as_deref(),
            VcsKind::Bzr => self.bzr.as_deref(),
        }
    }

    pub fn set_vcs_url(&mut self, kind: VcsKind, url: impl Into<String>) {
        let slot = match kind {
            VcsKind::Git => &mut self.git,
            VcsKind::Hg => &mut self.hg,
            VcsKind::Svn => &mut self.svn,
            VcsKind::Bzr => &mut self.bzr,
        };
        *slot = Some(url.into());
    }

    pub fn set_source(&mut self, key: SourceKey, value: impl Into<String>) {
        let slot = match key {
            SourceKey::Path => &mut self.path,
            SourceKey::File => &mut self.file,
            SourceKey::Uri => &mut self.uri,
        };
        *slot = Some(value.into());
    }

    /// Checks that the entry names at most one source.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementError::AmbiguousSource`] listing the conflicting keys.
    pub fn validate(&self, name: &str) -> Result<()> {
        let mut keys: Vec<&str> = self
            .file_sources()
            .into_iter()
            .map(|(key, _)| key.as_str())
            .collect();
        keys.extend(self.vcs_sources().into_iter().map(|(kind, _)| kind.as_str()));

        if keys.len() > 1 {
            return Err(RequirementError::ambiguous_source(name, keys));
        }
        Ok(())
    }

    /// `hashes` plus the single `hash`, deduplicated and sorted.
    pub fn all_hashes(&self) -> Vec<String> {
        let mut hashes: Vec<String> = self
            .hashes
            .iter()
            .chain(self.hash.iter())
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        hashes.sort();
        hashes.dedup();
        hashes
    }

    /// `markers` combined with the environment keys, validated.
    ///
    /// When both are present, `markers` is wrapped in parentheses so the
    /// environment clauses apply to the whole expression.
    pub fn combined_markers(&self) -> Result<Option<String>> {
        let environment = markers_from_environment(
            self.environment
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        let combined = match (self.markers.as_deref(), environment) {
            (Some(markers), Some(env)) => Some(format!("({markers}) and {env}")),
            (Some(markers), None) => Some(markers.to_string()),
            (None, env) => env,
        };
        combined.map(|m| validate_markers(&m)).transpose()
    }

    /// True when only `version` is set, so the entry can be written as a string.
    pub fn is_version_only(&self) -> bool {
        self.version.is_some()
            && Self {
                version: None,
                ..self.clone()
            } == Self::default()
    }

    /// Reads an entry from a TOML item: a version string or a (inline) table.
    pub fn from_item(name: &str, item: &Item) -> Result<Self> {
        if let Some(version) = item.as_str() {
            return Ok(Self::from_version(version));
        }

        let Some(table) = item.as_table_like() else {
            return Err(RequirementError::invalid_entry(
                name,
                "expected a version string or a table",
            ));
        };

        let mut entry = Self::default();
        for (key, value) in table.iter() {
            let text = || {
                value.as_str().map(str::to_string).ok_or_else(|| {
                    RequirementError::invalid_entry(name, format!("'{key}' must be a string"))
                })
            };
            let list = || {
                value
                    .as_array()
                    .map(|array| {
                        array
                            .iter()
                            .filter_map(|v| v.as_str().map(String::from))
                            .collect::<Vec<_>>()
                    })
                    .ok_or_else(|| {
                        RequirementError::invalid_entry(name, format!("'{key}' must be an array"))
                    })
            };

            match key {
                "version" => entry.version = Some(text()?),
                "path" => entry.path = Some(text()?),
                "file" => entry.file = Some(text()?),
                "uri" => entry.uri = Some(text()?),
                "git" => entry.git = Some(text()?),
                "hg" => entry.hg = Some(text()?),
                "svn" => entry.svn = Some(text()?),
                "bzr" => entry.bzr = Some(text()?),
                "ref" => entry.reference = Some(text()?),
                "subdirectory" => entry.subdirectory = Some(text()?),
                "markers" => entry.markers = Some(text()?),
                "hash" => entry.hash = Some(text()?),
                "index" => entry.index = Some(text()?),
                "editable" => {
                    entry.editable = value.as_bool().ok_or_else(|| {
                        RequirementError::invalid_entry(name, "'editable' must be a boolean")
                    })?;
                }
                "extras" => entry.extras = list()?,
                "hashes" => entry.hashes = list()?,
                key if ENVIRONMENT_KEYS.contains(&key) => {
                    entry.environment.insert(key.to_string(), text()?);
                }
                other => tracing::warn!("ignoring unknown key '{}' in entry '{}'", other, name),
            }
        }
        Ok(entry)
    }

    /// Writes the entry as a TOML item; version-only entries become a string.
    pub fn to_item(&self) -> Item {
        if self.is_version_only()
            && let Some(version) = &self.version
        {
            return toml_edit::value(version.as_str());
        }

        let mut table = InlineTable::new();
        let mut put = |key: &str, value: Value| {
            table.insert(key, value);
        };

        let strings = [
            ("version", &self.version),
            ("path", &self.path),
            ("file", &self.file),
            ("uri", &self.uri),
            ("git", &self.git),
            ("hg", &self.hg),
            ("svn", &self.svn),
            ("bzr", &self.bzr),
            ("ref", &self.reference),
            ("subdirectory", &self.subdirectory),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                put(key, Value::from(value.as_str()));
            }
        }
        if self.editable {
            put("editable", Value::from(true));
        }
        if !self.extras.is_empty() {
            put("extras", Value::Array(self.extras.iter().map(String::as_str).collect::<Array>()));
        }
        if let Some(markers) = &self.markers {
            put("markers", Value::from(markers.as_str()));
        }
        if !self.hashes.is_empty() {
            put("hashes", Value::Array(self.hashes.iter().map(String::as_str).collect::<Array>()));
        }
        if let Some(hash) = &self.hash {
            put("hash", Value::from(hash.as_str()));
        }
        if let Some(index) = &self.index {
            put("index", Value::from(index.as_str()));
        }
        for (key, value) in &self.environment {
            put(key, Value::from(value.as_str()));
        }

        Item::Value(Value::InlineTable(table))
    }
}

/// Reads every entry of a TOML table such as `[packages]`.
///
/// Returns an empty list when the section is missing.
pub fn parse_entries_table(content: &str, section: &str) -> Result<Vec<(String, StructuredEntry)>> {
    let doc = content
        .parse::<DocumentMut>()
        .map_err(|e| RequirementError::TomlParse { source: e })?;

    let Some(table) = doc.get(section).and_then(|i| i.as_table_like()) else {
        tracing::debug!("no [{}] section", section);
        return Ok(Vec::new());
    };

    table
        .iter()
        .map(|(name, item)| Ok((name.to_string(), StructuredEntry::from_item(name, item)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPFILE: &str = r#"
[[source]]
name = "pypi"
url = "https://pypi.org/simple"
verify_ssl = true

[packages]
requests = "*"
flask = { version = ">=3.0", extras = ["async"], markers = "python_version >= '3.8'" }
local-pkg = { path = "./local-pkg", editable = true }
tool = { git = "https://example.com/tool.git", ref = "v1.2", os_name = "== 'nt'" }
"#;

    #[test]
    fn test_parse_entries_table() {
        let entries = parse_entries_table(PIPFILE, "packages").unwrap();
        assert_eq!(entries.len(), 4);

        let (name, requests) = &entries[0];
        assert_eq!(name, "requests");
        assert!(requests.is_version_only());

        let (_, flask) = &entries[1];
        assert_eq!(flask.extras, vec!["async"]);
        assert_eq!(flask.version.as_deref(), Some(">=3.0"));

        let (_, local) = &entries[2];
        assert!(local.editable);
        assert_eq!(local.file_sources(), vec![(SourceKey::Path, "./local-pkg")]);

        let (_, tool) = &entries[3];
        assert_eq!(
            tool.vcs_sources(),
            vec![(VcsKind::Git, "https://example.com/tool.git")]
        );
        assert_eq!(tool.reference.as_deref(), Some("v1.2"));
        assert_eq!(tool.environment.get("os_name").map(String::as_str), Some("== 'nt'"));
    }

    #[test]
    fn test_missing_section() {
        assert!(parse_entries_table(PIPFILE, "dev-packages").unwrap().is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let err = parse_entries_table("[packages\n", "packages").unwrap_err();
        assert!(matches!(err, RequirementError::TomlParse { .. }));
    }

    #[test]
    fn test_path_and_uri_are_ambiguous() {
        let entry = StructuredEntry {
            path: Some("./pkg".into()),
            uri: Some("https://example.com/pkg.zip".into()),
            ..StructuredEntry::default()
        };
        let err = entry.validate("pkg").unwrap_err();
        assert!(matches!(err, RequirementError::AmbiguousSource { .. }));
        assert!(err.to_string().contains("path, uri"));
    }

    #[test]
    fn test_path_and_vcs_are_ambiguous() {
        let entry = StructuredEntry {
            path: Some("./pkg".into()),
            git: Some("https://example.com/pkg.git".into()),
            ..StructuredEntry::default()
        };
        assert!(entry.validate("pkg").is_err());

        let single = StructuredEntry {
            git: Some("https://example.com/pkg.git".into()),
            ..StructuredEntry::default()
        };
        assert!(single.validate("pkg").is_ok());
    }

    #[test]
    fn test_wrong_value_type() {
        let doc: DocumentMut = "pkg = { editable = \"yes\" }\n".parse().unwrap();
        let item = doc.get("pkg").unwrap();
        let err = StructuredEntry::from_item("pkg", item).unwrap_err();
        assert!(matches!(err, RequirementError::InvalidEntry { .. }));
    }

    #[test]
    fn test_combined_markers() {
        let entry = StructuredEntry {
            markers: Some("python_version < '3' or python_version >= '3.8'".into()),
            environment: BTreeMap::from([("os_name".to_string(), "=='nt'".to_string())]),
            ..StructuredEntry::default()
        };
        assert_eq!(
            entry.combined_markers().unwrap().as_deref(),
            Some("(python_version < '3' or python_version >= '3.8') and os_name == 'nt'")
        );
        assert!(StructuredEntry::default().combined_markers().unwrap().is_none());
    }

    #[test]
    fn test_combined_markers_always_groups_markers() {
        let linux = BTreeMap::from([("sys_platform".to_string(), "=='linux'".to_string())]);

        let single = StructuredEntry {
            markers: Some("python_version >= '3.8'".into()),
            environment: linux.clone(),
            ..StructuredEntry::default()
        };
        assert_eq!(
            single.combined_markers().unwrap().as_deref(),
            Some("(python_version >= '3.8') and sys_platform == 'linux'")
        );

        // Hand-written markers may omit the spaces around `or`.
        let unspaced = StructuredEntry {
            markers: Some("os_name=='nt'or os_name=='posix'".into()),
            environment: linux,
            ..StructuredEntry::default()
        };
        assert_eq!(
            unspaced.combined_markers().unwrap().as_deref(),
            Some("(os_name == 'nt' or os_name == 'posix') and sys_platform == 'linux'")
        );
    }

    #[test]
    fn test_hash_is_merged() {
        let entry = StructuredEntry {
            hashes: vec!["sha256:bbbb".into()],
            hash: Some("sha256:aaaa".into()),
            ..StructuredEntry::default()
        };
        assert_eq!(entry.all_hashes(), vec!["sha256:aaaa", "sha256:bbbb"]);
    }

    #[test]
    fn test_to_item_version_only() {
        let item = StructuredEntry::from_version("*").to_item();
        assert_eq!(item.as_str(), Some("*"));
    }

    #[test]
    fn test_to_item_table() {
        let entry = StructuredEntry {
            git: Some("https://example.com/tool.git".into()),
            reference: Some("v1.2".into()),
            editable: true,
            extras: vec!["cli".into()],
            ..StructuredEntry::default()
        };
        insta::assert_snapshot!(
            entry.to_item().to_string(),
            @r#"{ git = "https://example.com/tool.git", ref = "v1.2", editable = true, extras = ["cli"] }"#
        );

        let doc: DocumentMut = format!("tool = {}\n", entry.to_item()).parse().unwrap();
        let reread = StructuredEntry::from_item("tool", doc.get("tool").unwrap()).unwrap();
        assert_eq!(reread, entry);
    }

    #[test]
    fn test_json_round_trip() {
        let json = r#"{"version": "==1.0", "sys_platform": "linux", "hash": "sha256:aaaa"}"#;
        let entry: StructuredEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.version.as_deref(), Some("==1.0"));
        assert_eq!(
            entry.environment.get("sys_platform").map(String::as_str),
            Some("linux")
        );
        assert_eq!(entry.all_hashes(), vec!["sha256:aaaa"]);

        let written = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            written,
            r#"{"version":"==1.0","hash":"sha256:aaaa","sys_platform":"linux"}"#
        );
        let reread: StructuredEntry = serde_json::from_str(&written).unwrap();
        assert_eq!(reread, entry);
        assert_eq!(reread.all_hashes(), vec!["sha256:aaaa"]);
    }

    #[test]
    fn test_single_hash_survives_toml_and_json() {
        let entry = StructuredEntry {
            version: Some("==1.0".into()),
            hashes: vec!["sha256:bbbb".into()],
            hash: Some("sha256:aaaa".into()),
            ..StructuredEntry::default()
        };

        let doc: DocumentMut = format!("pkg = {}\n", entry.to_item()).parse().unwrap();
        let from_toml = StructuredEntry::from_item("pkg", doc.get("pkg").unwrap()).unwrap();
        let from_json: StructuredEntry =
            serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();

        assert_eq!(from_toml, entry);
        assert_eq!(from_json, from_toml);
        assert_eq!(from_toml.all_hashes(), vec!["sha256:aaaa", "sha256:bbbb"]);
    }
}
