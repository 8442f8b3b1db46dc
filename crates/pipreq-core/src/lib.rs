//! Core abstractions for pipreq.
//!
//! This crate provides the pieces the requirement model shares with the
//! code that embeds it.
//!
//! # Architecture
//!
//! pipreq-core defines:
//! - **Collaborator traits**: `MetadataResolver`, `SourceRepository`, `RepositoryProvider`
//! - **Line cache**: an externally owned, bounded cache keyed by raw requirement lines
//! - **Configuration**: serde-backed settings with defaults
//! - **Error Types**: failures reported by collaborators
//!
//! The traits are implemented outside the model: a build-backend runner for
//! metadata discovery, a VCS client for repositories. The model calls them
//! synchronously and never spawns work of its own.
//!
//! # Examples
//!
//! Implementing a repository provider:
//!
//! ```no_run
//! use pipreq_core::{RepositoryProvider, RepositorySpec, Result, SourceRepository};
//! use std::path::{Path, PathBuf};
//!
//! struct Checkout {
//!     dir: PathBuf,
//! }
//!
//! impl SourceRepository for Checkout {
//!     fn obtain(&mut self) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn checkout_ref(&mut self, _reference: &str) -> Result<()> {
//!         Ok(())
//!     }
//!
//!     fn commit_hash(&self) -> Result<String> {
//!         Ok("0123456789abcdef0123456789abcdef01234567".into())
//!     }
//!
//!     fn checkout_directory(&self) -> &Path {
//!         &self.dir
//!     }
//! }
//!
//! struct Provider;
//!
//! impl RepositoryProvider for Provider {
//!     fn open(&self, spec: &RepositorySpec) -> Result<Box<dyn SourceRepository>> {
//!         Ok(Box::new(Checkout {
//!             dir: spec.checkout_directory.clone(),
//!         }))
//!     }
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod repository;
pub mod resolver;

pub use cache::{LineCache, MAX_CACHE_ENTRIES};
pub use config::{BuildConfig, CacheConfig, IndexSource, PipreqConfig, VcsConfig};
pub use error::{CoreError, RepositoryOperation, Result};
pub use repository::{RepositoryProvider, RepositorySpec, SourceRepository, UnknownVcs, VcsKind};
pub use resolver::{MetadataResolver, SetupInfo, SourceLocation};
