//! Registry for all classifier backends.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ports::ClassifierPort;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors raised while resolving a backend.
pub enum RegistryError {
    /// No backend is registered under the requested id.
    #[error("Unknown classifier backend: {0}")]
    UnknownBackend(String),
}

/// Registry that resolves classifier backends by identifier.
pub struct ClassifierRegistry {
    backends: HashMap<String, Arc<dyn ClassifierPort>>,
}

impl ClassifierRegistry {
    /// Build a registry from the provided backends. Later entries replace
    /// earlier ones with the same id.
    #[must_use]
    pub fn new(backends: Vec<Arc<dyn ClassifierPort>>) -> Self {
        let backends = backends
            .into_iter()
            .map(|backend| (backend.id().to_owned(), backend))
            .collect();
        Self { backends }
    }

    /// Identifiers of all registered backends, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Look up a backend for the given id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownBackend`] when no backend is registered.
    pub fn backend(&self, id: &str) -> Result<Arc<dyn ClassifierPort>, RegistryError> {
        self.backends
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| RegistryError::UnknownBackend(id.to_owned()))
    }
}
