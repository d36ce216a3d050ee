//! Scheme-based routing to filesystem providers.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::FsError;
use super::local::LocalFs;
use super::mem::MemFs;
use super::traits::FileSystem;
use super::types::FileUri;

/// Resolves a [`FileUri`] to the provider registered for its scheme.
///
/// Scripts may hand back URIs on any configured filesystem, so the
/// worker resolves every script-produced location through the router
/// rather than assuming the source provider.
#[derive(Clone, Default)]
pub struct FsRouter {
    providers: HashMap<String, Arc<dyn FileSystem>>,
}

impl FsRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router with the built-in providers (`file`, `mem`).
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Arc::new(LocalFs::new()))
            .register(Arc::new(MemFs::new()))
    }

    /// Registers a provider under its scheme, replacing any previous one.
    pub fn register(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.providers.insert(fs.scheme().to_string(), fs);
        self
    }

    /// Returns the provider serving the URI's scheme.
    pub fn resolve(&self, uri: &FileUri) -> Result<Arc<dyn FileSystem>, FsError> {
        self.providers
            .get(uri.scheme())
            .cloned()
            .ok_or_else(|| FsError::UnsupportedScheme {
                scheme: uri.scheme().to_string(),
            })
    }
}
