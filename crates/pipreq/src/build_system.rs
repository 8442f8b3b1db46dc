use crate::error::{RequirementError, Result};
use crate::types::SetupPaths;
use pipreq_core::BuildConfig;
use toml_edit::DocumentMut;

/// The `[build-system]` table of a local project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSystem {
    pub requires: Vec<String>,
    pub backend: Option<String>,
}

impl BuildSystem {
    /// Reads `[build-system]` from pyproject.toml content.
    ///
    /// Returns `Ok(None)` when the document has no `[build-system]` table.
    ///
    /// # Examples
    ///
    /// ```
    /// use pipreq::build_system::BuildSystem;
    ///
    /// let content = r#"
    /// [build-system]
    /// requires = ["hatchling"]
    /// build-backend = "hatchling.build"
    /// "#;
    ///
    /// let build = BuildSystem::from_pyproject_str(content).unwrap().unwrap();
    /// assert_eq!(build.requires, vec!["hatchling"]);
    /// assert_eq!(build.backend.as_deref(), Some("hatchling.build"));
    /// ```
    pub fn from_pyproject_str(content: &str) -> Result<Option<Self>> {
        let doc = content
            .parse::<DocumentMut>()
            .map_err(|e| RequirementError::TomlParse { source: e })?;

        let Some(table) = doc.get("build-system").and_then(|i| i.as_table_like()) else {
            return Ok(None);
        };

        let requires = table
            .get("requires")
            .and_then(|i| i.as_array())
            .map(|array| {
                array
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let backend = table
            .get("build-backend")
            .and_then(|i| i.as_str())
            .map(str::to_string);

        Ok(Some(Self { requires, backend }))
    }

    /// Build system of a local project.
    ///
    /// A project with a legacy descriptor and no `[build-system]` table gets
    /// the configured defaults. Returns `Ok(None)` for directories that are
    /// not projects.
    pub fn for_project(paths: &SetupPaths, defaults: &BuildConfig) -> Result<Option<Self>> {
        if let Some(pyproject) = &paths.pyproject_toml {
            let content = std::fs::read_to_string(pyproject)?;
            if let Some(build) = Self::from_pyproject_str(&content)? {
                return Ok(Some(build));
            }
        }

        if paths.setup_py.is_some() || paths.setup_cfg.is_some() {
            tracing::debug!("using default build system for legacy project");
            return Ok(Some(Self {
                requires: defaults.default_requires.clone(),
                backend: Some(defaults.default_backend.clone()),
            }));
        }

        Ok(None)
    }
}
