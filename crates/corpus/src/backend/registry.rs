//! Registry mapping backend identifiers to factories.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::contract::Backend;

/// Creates a fresh, uninitialised backend instance.
///
/// Entries are templates: every build gets its own instance, so no mutable
/// state is shared between runs.
pub type BackendFactory = Arc<dyn Fn() -> Box<dyn Backend> + Send + Sync>;

/// Registry of available backends.
///
/// Populated once at startup with explicit `register` calls and threaded
/// through the builder, rather than living in global state.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `identifier`.
    ///
    /// Registering an identifier twice replaces the earlier factory; the
    /// replaced one is returned.
    pub fn register<F>(
        &mut self,
        identifier: impl Into<String>,
        factory: F,
    ) -> Option<BackendFactory>
    where
        F: Fn() -> Box<dyn Backend> + Send + Sync + 'static,
    {
        let identifier = identifier.into();
        let previous = self.factories.insert(identifier.clone(), Arc::new(factory));
        if previous.is_some() {
            tracing::debug!("Backend '{}' re-registered, replacing previous factory", identifier);
        }
        previous
    }

    /// Register a backend type constructed through `Default`.
    pub fn register_type<B>(&mut self, identifier: impl Into<String>) -> Option<BackendFactory>
    where
        B: Backend + Default + 'static,
    {
        self.register(identifier, || Box::new(B::default()) as Box<dyn Backend>)
    }

    /// Look up the factory for an identifier. `None` means not found.
    pub fn lookup(&self, identifier: &str) -> Option<BackendFactory> {
        self.factories.get(identifier).cloned()
    }

    /// Instantiate a new backend for an identifier.
    pub fn create(&self, identifier: &str) -> Option<Box<dyn Backend>> {
        self.factories.get(identifier).map(|factory| factory())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}
