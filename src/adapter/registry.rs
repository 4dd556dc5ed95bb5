//! Named adapter registry.

use std::sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{Error, Result};

use super::{Adapter, MemoryAdapter, SqlAdapter, MEMORY_ADAPTER};

/// A registry shared between engines.
pub type SharedRegistry = Arc<RwLock<AdapterRegistry>>;

static GLOBAL: LazyLock<SharedRegistry> =
    LazyLock::new(|| Arc::new(RwLock::new(AdapterRegistry::default())));

/// Adapters by name, plus the name of the default one.
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn Adapter>>,
    default: Option<String>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        // Built-ins: the in-memory adapter (default) and the SQL generator.
        Self {
            adapters: vec![Arc::new(MemoryAdapter), Arc::new(SqlAdapter)],
            default: Some(MEMORY_ADAPTER.to_string()),
        }
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with no adapters and no default.
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
            default: None,
        }
    }

    /// The process-wide registry engines use unless given their own.
    pub fn global() -> &'static SharedRegistry {
        &GLOBAL
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register `adapter`. The first adapter registered into a registry
    /// without a default becomes the default.
    pub fn register(&mut self, adapter: Arc<dyn Adapter>) -> Result<()> {
        let name = adapter.name();
        if name.trim().is_empty() {
            return Err(Error::MalformedAdapter("adapter has no name".to_string()));
        }
        if self.contains(name) {
            return Err(Error::MalformedAdapter(format!(
                "an adapter named {:?} is already registered",
                name
            )));
        }

        let name = name.to_string();
        if self.default.is_none() {
            debug!(adapter = %name, "registered default adapter");
            self.default = Some(name);
        } else {
            debug!(adapter = %name, "registered adapter");
        }
        self.adapters.push(adapter);
        Ok(())
    }

    /// Unregister `name`. The default adapter cannot be removed.
    pub fn remove(&mut self, name: &str) -> Result<Arc<dyn Adapter>> {
        if self.default.as_deref() == Some(name) {
            return Err(Error::DefaultAdapterInUse(name.to_string()));
        }
        let index = self
            .adapters
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| Error::UnknownAdapter(name.to_string()))?;
        debug!(adapter = name, "removed adapter");
        Ok(self.adapters.remove(index))
    }

    /// Make the registered adapter `name` the default.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.contains(name) {
            return Err(Error::UnknownAdapter(name.to_string()));
        }
        debug!(adapter = name, "default adapter changed");
        self.default = Some(name.to_string());
        Ok(())
    }

    /// Make `adapter` the default, registering it or replacing the adapter
    /// already registered under its name.
    pub fn install_default(&mut self, adapter: Arc<dyn Adapter>) -> Result<()> {
        let name = adapter.name().to_string();
        match self.adapters.iter().position(|a| a.name() == name) {
            Some(index) => {
                debug!(adapter = %name, "replaced adapter");
                self.adapters[index] = adapter;
            }
            None => self.register(adapter)?,
        }
        self.set_default(&name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.iter().any(|a| a.name() == name)
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn default_adapter(&self) -> Option<Arc<dyn Adapter>> {
        self.default.as_deref().and_then(|name| self.get(name))
    }

    /// Look up `name`, or the default when `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Adapter>> {
        match name {
            Some(name) => self
                .get(name)
                .ok_or_else(|| Error::UnknownAdapter(name.to_string())),
            None => self.default_adapter().ok_or(Error::NoAdapter),
        }
    }

    /// Registered names, in registration order.
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }
}

/// Shared read access. A lock poisoned by a panicking writer is still used;
/// every registry mutation leaves it consistent.
pub fn read(registry: &SharedRegistry) -> RwLockReadGuard<'_, AdapterRegistry> {
    registry.read().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access, see [`read`].
pub fn write(registry: &SharedRegistry) -> RwLockWriteGuard<'_, AdapterRegistry> {
    registry.write().unwrap_or_else(PoisonError::into_inner)
}
