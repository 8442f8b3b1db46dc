//! Common test utilities for integration tests.
//!
//! This module provides in-memory collaborators (metadata resolver and
//! repository provider) that record how the model calls them, plus helpers
//! for laying out local projects on disk.

#![allow(dead_code)] // Not every test file uses every helper

use pipreq_core::{
    CoreError, MetadataResolver, RepositoryOperation, RepositoryProvider, RepositorySpec, Result,
    SetupInfo, SourceLocation, SourceRepository,
};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a test subscriber honoring `RUST_LOG` (default `info`).
pub(crate) fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Resolver returning fixed metadata, optionally failing with not-found
/// for the first `not_found` calls.
pub(crate) struct StaticResolver {
    pub info: SetupInfo,
    pub not_found: Cell<usize>,
    pub calls: Cell<usize>,
}

impl StaticResolver {
    pub(crate) fn new(name: &str, version: &str) -> Self {
        Self {
            info: SetupInfo {
                name: Some(name.to_string()),
                version: Some(version.to_string()),
                ..SetupInfo::default()
            },
            not_found: Cell::new(0),
            calls: Cell::new(0),
        }
    }

    pub(crate) fn failing_first(mut self, times: usize) -> Self {
        self.not_found = Cell::new(times);
        self
    }
}

impl MetadataResolver for StaticResolver {
    fn discover(&self, location: &SourceLocation) -> Result<SetupInfo> {
        self.calls.set(self.calls.get() + 1);
        if self.not_found.get() > 0 {
            self.not_found.set(self.not_found.get() - 1);
            return Err(CoreError::NotFound {
                location: location.to_string(),
            });
        }
        Ok(self.info.clone())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("remote hung up unexpectedly")]
pub(crate) struct HungUp;

/// Shared state behind [`FakeRepositories`] and the handles it opens.
#[derive(Debug, Default)]
pub(crate) struct RepoLog {
    pub calls: Vec<String>,
    pub specs: Vec<RepositorySpec>,
}

/// Repository provider whose handles record every call.
pub(crate) struct FakeRepositories {
    pub log: Rc<RefCell<RepoLog>>,
    pub commit: String,
    pub fail_obtain: bool,
}

impl FakeRepositories {
    pub(crate) fn new(commit: &str) -> Self {
        Self {
            log: Rc::new(RefCell::new(RepoLog::default())),
            commit: commit.to_string(),
            fail_obtain: false,
        }
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail_obtain = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.log.borrow().calls.clone()
    }

    pub(crate) fn opened(&self) -> Vec<RepositorySpec> {
        self.log.borrow().specs.clone()
    }
}

impl RepositoryProvider for FakeRepositories {
    fn open(&self, spec: &RepositorySpec) -> Result<Box<dyn SourceRepository>> {
        self.log.borrow_mut().specs.push(spec.clone());
        Ok(Box::new(FakeRepository {
            url: spec.url.clone(),
            dir: spec.checkout_directory.clone(),
            commit: self.commit.clone(),
            fail_obtain: self.fail_obtain,
            log: Rc::clone(&self.log),
        }))
    }
}

struct FakeRepository {
    url: String,
    dir: PathBuf,
    commit: String,
    fail_obtain: bool,
    log: Rc<RefCell<RepoLog>>,
}

impl SourceRepository for FakeRepository {
    fn obtain(&mut self) -> Result<()> {
        self.log.borrow_mut().calls.push("obtain".into());
        if self.fail_obtain {
            return Err(CoreError::repository(
                &self.url,
                RepositoryOperation::Obtain,
                HungUp,
            ));
        }
        Ok(())
    }

    fn checkout_ref(&mut self, reference: &str) -> Result<()> {
        self.log
            .borrow_mut()
            .calls
            .push(format!("checkout {reference}"));
        Ok(())
    }

    fn commit_hash(&self) -> Result<String> {
        self.log.borrow_mut().calls.push("commit_hash".into());
        Ok(self.commit.clone())
    }

    fn checkout_directory(&self) -> &Path {
        &self.dir
    }
}

/// Creates `root/<name>` with a `setup.cfg` naming the project.
pub(crate) fn legacy_project(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("setup.cfg"),
        format!("[metadata]\nname = {name}\nversion = 0.1.0\n"),
    )
    .unwrap();
    dir
}

/// Creates `root/<name>` with a pyproject.toml `[build-system]` table.
pub(crate) fn pep517_project(root: &Path, name: &str, backend: &str, requires: &[&str]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let requires = requires
        .iter()
        .map(|r| format!("\"{r}\""))
        .collect::<Vec<_>>()
        .join(", ");
    fs::write(
        dir.join("pyproject.toml"),
        format!(
            "[project]\nname = \"{name}\"\n\n[build-system]\nrequires = [{requires}]\nbuild-backend = \"{backend}\"\n"
        ),
    )
    .unwrap();
    dir
}
