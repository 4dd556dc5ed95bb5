//! The query engine: one parsed query, compiled lazily per adapter.
//!
//! ```ignore
//! let mut q = UniversQl::new("/recipes{name}[sort=-rating,limit={{n}}]?(servings>=4)")?;
//! let rows = q.execute(None, &data, &context)?;      // default adapter
//! let sql = q.translate(Some("sql"), &context)?;      // same query, as SQL
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace};

use crate::adapter::registry::{read, write};
use crate::adapter::{Adapter, AdapterRegistry, BackendQuery, CompiledQuery, SharedRegistry};
use crate::ast::{parse_query_with, Context, Query, TemplateEngine};
use crate::error::{Error, Result};

/// A parsed query bound to an adapter registry.
pub struct UniversQl {
    query: Query,
    registry: SharedRegistry,
    templates: TemplateEngine,
    /// Per-instance adapter override.
    adapter: Option<String>,
    /// Compiled queries by adapter name.
    compiled: HashMap<String, CompiledQuery>,
}

impl UniversQl {
    /// Parse `query` against the global registry.
    pub fn new(query: &str) -> Result<Self> {
        Self::with_registry(query, Arc::clone(AdapterRegistry::global()))
    }

    pub fn with_registry(query: &str, registry: SharedRegistry) -> Result<Self> {
        Self::with_templates(query, registry, TemplateEngine::new())
    }

    /// Parse `query` with a different placeholder syntax, used for parsing
    /// and for every later translation.
    pub fn with_templates(
        query: &str,
        registry: SharedRegistry,
        templates: TemplateEngine,
    ) -> Result<Self> {
        let query = parse_query_with(query, &templates)?;
        Ok(Self {
            templates,
            ..Self::from_query(query, registry)
        })
    }

    pub fn from_query(query: Query, registry: SharedRegistry) -> Self {
        Self {
            query,
            registry,
            templates: TemplateEngine::new(),
            adapter: None,
            compiled: HashMap::new(),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Placeholder names the context must supply.
    pub fn placeholders(&self) -> Vec<String> {
        self.templates.query_placeholders(&self.query)
    }

    // Registry operations on the instance's registry (the global one unless
    // the engine was built with its own).

    pub fn add_adapter(&self, adapter: Arc<dyn Adapter>) -> Result<()> {
        write(&self.registry).register(adapter)
    }

    pub fn remove_adapter(&mut self, name: &str) -> Result<Arc<dyn Adapter>> {
        let removed = write(&self.registry).remove(name)?;
        self.compiled.remove(name);
        if self.adapter.as_deref() == Some(name) {
            self.adapter = None;
        }
        Ok(removed)
    }

    pub fn set_default_adapter(&self, name: &str) -> Result<()> {
        write(&self.registry).set_default(name)
    }

    /// Make `adapter` the default, registering it if needed.
    pub fn install_default_adapter(&mut self, adapter: Arc<dyn Adapter>) -> Result<()> {
        self.compiled.remove(adapter.name());
        write(&self.registry).install_default(adapter)
    }

    pub fn default_adapter(&self) -> Option<Arc<dyn Adapter>> {
        read(&self.registry).default_adapter()
    }

    // The same operations on the global registry.

    pub fn add_global_adapter(adapter: Arc<dyn Adapter>) -> Result<()> {
        write(AdapterRegistry::global()).register(adapter)
    }

    pub fn remove_global_adapter(name: &str) -> Result<Arc<dyn Adapter>> {
        write(AdapterRegistry::global()).remove(name)
    }

    pub fn set_global_default_adapter(name: &str) -> Result<()> {
        write(AdapterRegistry::global()).set_default(name)
    }

    pub fn install_global_default_adapter(adapter: Arc<dyn Adapter>) -> Result<()> {
        write(AdapterRegistry::global()).install_default(adapter)
    }

    pub fn global_default_adapter() -> Option<Arc<dyn Adapter>> {
        read(AdapterRegistry::global()).default_adapter()
    }

    /// Pin this instance to adapter `name`, overriding any name passed to
    /// later calls.
    pub fn set_adapter(&mut self, name: &str) -> Result<()> {
        if !read(&self.registry).contains(name) {
            return Err(Error::UnknownAdapter(name.to_string()));
        }
        self.adapter = Some(name.to_string());
        Ok(())
    }

    pub fn clear_adapter(&mut self) {
        self.adapter = None;
    }

    /// Resolve the adapter to use: the instance override, else `name`, else
    /// the registry default.
    pub fn adapter(&self, name: Option<&str>) -> Result<Arc<dyn Adapter>> {
        let name = self.adapter.as_deref().or(name);
        read(&self.registry).resolve(name)
    }

    /// Compile for the resolved adapter, reusing a cached compilation unless
    /// `recompile` is set.
    pub fn compile(&mut self, name: Option<&str>, recompile: bool) -> Result<CompiledQuery> {
        let adapter = self.adapter(name)?;
        self.compile_for(adapter.as_ref(), recompile)
    }

    fn compile_for(&mut self, adapter: &dyn Adapter, recompile: bool) -> Result<CompiledQuery> {
        if !recompile {
            if let Some(compiled) = self.compiled.get(adapter.name()) {
                trace!(adapter = adapter.name(), "compile cache hit");
                return Ok(Arc::clone(compiled));
            }
        }
        let compiled = adapter.compile(&self.query, &self.templates)?;
        info!(adapter = adapter.name(), query = %self.query, "compiled query");
        self.compiled
            .insert(adapter.name().to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Compile if needed, then apply `context`.
    pub fn translate(&mut self, name: Option<&str>, context: &Context) -> Result<BackendQuery> {
        let compiled = self.compile(name, false)?;
        compiled(context)
    }

    /// Translate and run against `data`. Fails with
    /// [`Error::RunNotSupported`] for compile-only adapters.
    pub fn execute(&mut self, name: Option<&str>, data: &Value, context: &Context) -> Result<Value> {
        let adapter = self.adapter(name)?;
        if !adapter.can_run() {
            return Err(Error::RunNotSupported(adapter.name().to_string()));
        }
        let compiled = self.compile_for(adapter.as_ref(), false)?;
        let backend = compiled(context)?;
        let result = adapter.run(&backend, data);
        debug!(adapter = adapter.name(), ok = result.is_ok(), "ran query");
        result
    }

    /// [`UniversQl::execute`], delivering the outcome to `callback` before
    /// returning.
    pub fn run<F>(&mut self, name: Option<&str>, data: &Value, context: &Context, callback: F)
    where
        F: FnOnce(Result<Value>),
    {
        callback(self.execute(name, data, context));
    }
}
