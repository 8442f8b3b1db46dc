use pipreq_core::{MetadataResolver, PipreqConfig, RepositoryProvider};

/// Collaborators and settings used by operations that leave the model.
///
/// Metadata discovery and repository operations are blocking; the context
/// only borrows the collaborators, so callers keep ownership (and any
/// timeout policy) on their side.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub resolver: &'a dyn MetadataResolver,
    pub repositories: &'a dyn RepositoryProvider,
    pub config: &'a PipreqConfig,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        resolver: &'a dyn MetadataResolver,
        repositories: &'a dyn RepositoryProvider,
        config: &'a PipreqConfig,
    ) -> Self {
        Self {
            resolver,
            repositories,
            config,
        }
    }
}

impl std::fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
