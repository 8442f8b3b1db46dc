use super::source::ArtifactSource;
use crate::error::{RequirementError, Result};
use crate::link::WheelName;
use crate::parser::RequirementLine;
use crate::specifier::SpecifierSet;
use crate::types::SourceKey;

/// A requirement on a local path, a `file:` URL or a downloadable artifact.
#[derive(Debug, Clone)]
pub struct FileRequirement {
    source: ArtifactSource,
    wheel: Option<WheelName>,
    direct_reference: bool,
}

impl FileRequirement {
    /// Builds a file requirement from a line classified as a path or URL.
    pub fn from_line(line: RequirementLine, explicit_name: Option<&str>) -> Result<Self> {
        if line.is_named() || line.is_vcs() {
            return Err(RequirementError::parse_error(
                line.raw(),
                "not a file or URL requirement",
            ));
        }

        let wheel = line.wheel().cloned();
        let direct_reference = line.is_direct_reference();
        Ok(Self {
            source: ArtifactSource::from_line(line, explicit_name),
            wheel,
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

    pub fn is_wheel(&self) -> bool {
        self.wheel.is_some()
    }

    pub fn is_direct_reference(&self) -> bool {
        self.direct_reference
    }

    pub fn is_local(&self) -> bool {
        self.source.is_local()
    }

    pub fn is_remote_artifact(&self) -> bool {
        self.source.line().is_remote_artifact()
    }

    /// Version pin: the wheel filename version, then a discovered version.
    pub fn specifier(&self) -> Option<SpecifierSet> {
        if let Some(wheel) = &self.wheel {
            return Some(SpecifierSet::pinned(&wheel.version));
        }
        self.source
            .setup_info()
            .and_then(|info| info.version.as_deref())
            .map(SpecifierSet::pinned)
    }

    /// The canonical line fragment, without markers or hashes.
    ///
    /// Paths render as `{path}{extras}`, direct references as
    /// `{name}{extras} @ {url}`, and remote URLs as `{url}#egg={name}{extras}`
    /// unless the link is a wheel or the name is still a placeholder.
    /// `file:` URLs never carry an egg fragment.
    pub fn line_part(&self, include_extras: bool) -> String {
        self.render(include_extras, self.direct_reference)
    }

    /// The line fragment with direct references written in `#egg=` form.
    pub fn canonical_line_part(&self, include_extras: bool) -> String {
        self.render(include_extras, false)
    }

    fn render(&self, include_extras: bool, direct: bool) -> String {
        let extras = if include_extras {
            self.source.extras().as_pip()
        } else {
            String::new()
        };
        let subdirectory = self.source.subdirectory();

        let body = match (self.source.link(), self.source.path()) {
            (_, Some(path)) if direct => {
                format!("{}{extras} @ {path}", self.name())
            }
            (_, Some(path)) => format!("{path}{extras}"),
            (Some(link), None) if direct => {
                let mut url = link.url().to_string();
                if let Some(sub) = subdirectory {
                    url.push_str(&format!("#subdirectory={sub}"));
                }
                format!("{}{extras} @ {url}", self.name())
            }
            (Some(link), None) => {
                let mut url = link.url().to_string();
                let mut separator = '#';
                if self.wheel.is_none() && !link.is_file_url() && !self.source.is_placeholder() {
                    url.push_str(&format!("#egg={}{extras}", self.name()));
                    separator = '&';
                } else {
                    url.push_str(&extras);
                }
                if let Some(sub) = subdirectory {
                    url.push_str(&format!("{separator}subdirectory={sub}"));
                }
                url
            }
            (None, None) => self.source.location(),
        };

        if self.source.editable() {
            format!("-e {body}")
        } else {
            body
        }
    }

    /// Key and value for the structured entry.
    ///
    /// Remote artifacts can be described by both `uri` and `file`; the
    /// higher-precedence key is used.
    pub fn entry_source(&self) -> (SourceKey, String) {
        let mut candidates = Vec::new();
        if let Some(path) = self.source.path() {
            candidates.push((SourceKey::Path, path.to_string()));
        }
        if let Some(link) = self.source.link() {
            let url = link.url().to_string();
            if link.is_file_url() || link.is_artifact() {
                candidates.push((SourceKey::File, url.clone()));
            }
            candidates.push((SourceKey::Uri, url));
        }

        SourceKey::resolve_collision(candidates)
            .unwrap_or_else(|| (SourceKey::Path, self.source.location()))
    }
}
