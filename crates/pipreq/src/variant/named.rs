use crate::error::{RequirementError, Result};
use crate::formatter::normalize_name;
use crate::parser::RequirementLine;
use crate::specifier::SpecifierSet;
use crate::types::Extras;

/// A requirement on a package name with optional extras and specifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRequirement {
    name: String,
    extras: Extras,
    specifier: Option<SpecifierSet>,
}

impl NamedRequirement {
    pub fn new(name: impl Into<String>, extras: Extras, specifier: Option<SpecifierSet>) -> Self {
        Self {
            name: name.into(),
            extras,
            specifier: specifier.filter(|s| !s.is_empty()),
        }
    }

    /// Builds a named requirement from a line classified as named.
    pub fn from_line(line: &RequirementLine) -> Result<Self> {
        let name = line
            .name()
            .filter(|_| line.is_named())
            .ok_or_else(|| RequirementError::parse_error(line.raw(), "not a named requirement"))?;
        Ok(Self::new(name, line.extras().clone(), line.specifier().cloned()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extras(&self) -> &Extras {
        &self.extras
    }

    /// The specifier as written; never inferred.
    pub fn specifier(&self) -> Option<&SpecifierSet> {
        self.specifier.as_ref()
    }

    /// `name[extras]` with the name lowercased and `_` written as `-`; the
    /// specifier is appended by the caller.
    pub fn line_part(&self, include_extras: bool) -> String {
        let name = normalize_name(&self.name);
        if include_extras {
            format!("{name}{}", self.extras.as_pip())
        } else {
            name
        }
    }
}
