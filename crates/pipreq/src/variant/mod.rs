//! The three requirement kinds.
//!
//! Every consumer matches [`RequirementVariant`] exhaustively; shared state
//! of file and VCS sources lives in [`ArtifactSource`].

mod file;
mod named;
mod source;
mod vcs;

pub use file::FileRequirement;
pub use named::NamedRequirement;
pub use source::ArtifactSource;
pub use vcs::VcsRequirement;

use crate::error::Result;
use crate::parser::{LineKind, RequirementLine};
use crate::specifier::SpecifierSet;
use crate::types::Extras;

#[derive(Debug, Clone)]
pub enum RequirementVariant {
    Named(NamedRequirement),
    File(FileRequirement),
    Vcs(VcsRequirement),
}

impl RequirementVariant {
    /// Selects and builds the variant for a parsed line.
    pub fn from_line(line: RequirementLine, explicit_name: Option<&str>) -> Result<Self> {
        match line.kind() {
            LineKind::Named => Ok(Self::Named(NamedRequirement::from_line(&line)?)),
            LineKind::Path | LineKind::Url => {
                Ok(Self::File(FileRequirement::from_line(line, explicit_name)?))
            }
            LineKind::Vcs => Ok(Self::Vcs(VcsRequirement::from_line(line, explicit_name)?)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Named(named) => named.name(),
            Self::File(file) => file.name(),
            Self::Vcs(vcs) => vcs.name(),
        }
    }

    pub fn extras(&self) -> &Extras {
        match self {
            Self::Named(named) => named.extras(),
            Self::File(file) => file.source().extras(),
            Self::Vcs(vcs) => vcs.source().extras(),
        }
    }

    pub fn editable(&self) -> bool {
        self.source().is_some_and(ArtifactSource::editable)
    }

    /// Shared source state; `None` for named requirements.
    pub fn source(&self) -> Option<&ArtifactSource> {
        match self {
            Self::Named(_) => None,
            Self::File(file) => Some(file.source()),
            Self::Vcs(vcs) => Some(vcs.source()),
        }
    }

    pub fn source_mut(&mut self) -> Option<&mut ArtifactSource> {
        match self {
            Self::Named(_) => None,
            Self::File(file) => Some(file.source_mut()),
            Self::Vcs(vcs) => Some(vcs.source_mut()),
        }
    }

    /// Specifier: the named requirement's own, or a version pin for file and
    /// VCS sources.
    pub fn specifier(&self) -> Option<SpecifierSet> {
        match self {
            Self::Named(named) => named.specifier().cloned(),
            Self::File(file) => file.specifier(),
            Self::Vcs(vcs) => vcs.specifier(),
        }
    }

    /// The canonical line fragment.
    ///
    /// Named requirements render `name[extras]` followed by their specifier;
    /// file and VCS fragments never carry a specifier.
    pub fn line_part(&self, include_extras: bool) -> String {
        match self {
            Self::Named(named) => {
                let mut part = named.line_part(include_extras);
                if let Some(specifier) = named.specifier() {
                    part.push_str(&specifier.to_string());
                }
                part
            }
            Self::File(file) => file.line_part(include_extras),
            Self::Vcs(vcs) => vcs.line_part(include_extras),
        }
    }

    pub fn is_direct_reference(&self) -> bool {
        match self {
            Self::Named(_) => false,
            Self::File(file) => file.is_direct_reference(),
            Self::Vcs(vcs) => vcs.is_direct_reference(),
        }
    }
}
