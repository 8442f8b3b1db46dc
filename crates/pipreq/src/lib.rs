//! Pipenv-style requirement lines for Rust.
//!
//! This crate classifies requirement lines into a structured model and
//! renders the model back, either as a line or as a Pipfile-style entry.
//!
//! # Features
//!
//! - **Line parsing**: names with extras and specifiers, local paths,
//!   artifact URLs, PEP 508 direct references and `<vcs>+<url>` sources
//! - **Editable installs, hashes and markers**: `-e`, `--hash=...` and
//!   `; <markers>` are split off and rendered back in canonical form
//! - **Structured entries**: Pipfile tables read and written with `toml_edit`
//! - **Deferred metadata**: names, versions and build requirements of file
//!   and VCS sources come from a caller-supplied `MetadataResolver`
//! - **Repositories**: checkouts and commit lookups go through a
//!   caller-supplied `RepositoryProvider`
//!
//! # Architecture
//!
//! A raw line flows through [`LineParser`] into a [`RequirementLine`], which
//! selects one [`RequirementVariant`] (named, file or VCS). A [`Requirement`]
//! owns the variant together with markers, hashes and the index preference.
//! Equality compares the canonical rendered line.
//!
//! # Examples
//!
//! ## Parsing and rendering
//!
//! ```
//! use pipreq::{LineOptions, Requirement};
//!
//! let req = Requirement::from_line(
//!     "-e git+https://example.com/x.git@abc123#egg=x[extra2,extra1]",
//! )
//! .unwrap();
//!
//! assert!(req.is_vcs());
//! assert!(req.editable());
//! assert_eq!(req.name(), "x");
//! assert_eq!(
//!     req.as_line(&LineOptions::default()),
//!     "-e git+https://example.com/x.git@abc123#egg=x[extra1,extra2]"
//! );
//! ```
//!
//! ## Structured entries
//!
//! ```
//! use pipreq::{Requirement, parse_entries_table};
//!
//! let pipfile = r#"
//! [packages]
//! requests = "*"
//! flask = { version = ">=3.0", extras = ["async"] }
//! "#;
//!
//! let entries = parse_entries_table(pipfile, "packages").unwrap();
//! let reqs: Vec<Requirement> = entries
//!     .iter()
//!     .map(|(name, entry)| Requirement::from_structured_entry(name, entry).unwrap())
//!     .collect();
//!
//! assert_eq!(reqs[0].to_string(), "requests");
//! assert_eq!(reqs[1].to_string(), "flask[async]>=3.0");
//! ```

pub mod build_system;
pub mod context;
pub mod entry;
pub mod error;
pub mod formatter;
pub mod link;
pub mod markers;
pub mod parser;
pub mod requirement;
pub mod specifier;
pub mod types;
pub mod variant;

// Re-export commonly used types
pub use context::ResolveContext;
pub use entry::{StructuredEntry, parse_entries_table};
pub use error::{RequirementError, Result};
pub use markers::merge_markers;
pub use parser::{LineKind, LineParser, RequirementLine};
pub use requirement::{LineOptions, Requirement, RequirementCache};
pub use specifier::{Operator, SpecifierSet};
pub use types::{Dependencies, Extras, SourceKey};
pub use variant::{
    ArtifactSource, FileRequirement, NamedRequirement, RequirementVariant, VcsRequirement,
};
