//! Backend adapters.
//!
//! An adapter turns the canonical [`Query`] into something its backend can
//! execute. Compilation is split in two:
//!
//! ```text
//! Query ──compile(query, templates)──▶ CompiledQuery      (once per adapter)
//! CompiledQuery ──(context)──────────▶ BackendQuery       (once per translate)
//! BackendQuery ──run(data)───────────▶ result             (optional)
//! ```
//!
//! Adapters that only generate text for an external driver (SQL, URLs)
//! implement `compile` alone and keep the default `run`.
use std::sync::Arc;

use serde_json::Value;

use crate::ast::{Context, Query, TemplateEngine};
use crate::error::{Error, Result};

pub mod memory;
pub mod registry;
pub mod sql;

pub use memory::{MemoryAdapter, MemoryQuery, MEMORY_ADAPTER};
pub use registry::{AdapterRegistry, SharedRegistry};
pub use sql::{SqlAdapter, SQL_ADAPTER};

/// A query compiled for one adapter, waiting for its context.
pub type CompiledQuery = Arc<dyn Fn(&Context) -> Result<BackendQuery> + Send + Sync>;

/// The output of translation.
#[derive(Debug, Clone)]
pub enum BackendQuery {
    /// Executable pipeline for [`MemoryAdapter`].
    Memory(MemoryQuery),
    /// Query text for an external system.
    Text(String),
}

impl BackendQuery {
    pub fn as_memory(&self) -> Option<&MemoryQuery> {
        match self {
            BackendQuery::Memory(q) => Some(q),
            BackendQuery::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BackendQuery::Text(text) => Some(text),
            BackendQuery::Memory(_) => None,
        }
    }
}

/// A pluggable query backend.
///
/// # Example
///
/// ```ignore
/// struct UrlAdapter;
///
/// impl Adapter for UrlAdapter {
///     fn name(&self) -> &str { "url" }
///     fn compile(&self, query: &Query, templates: &TemplateEngine) -> Result<CompiledQuery> {
///         let limit = query.limit.clone().unwrap_or_default();
///         let limit = templates.template_for(&limit, |l: &String| Ok(l.clone()))?;
///         Ok(Arc::new(move |ctx: &Context| Ok(BackendQuery::Text(format!("?limit={}", limit(ctx)?)))))
///     }
/// }
/// ```
pub trait Adapter: Send + Sync {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// Compile `query`, binding each fragment through `templates`.
    fn compile(&self, query: &Query, templates: &TemplateEngine) -> Result<CompiledQuery>;

    /// Whether [`Adapter::run`] is implemented.
    fn can_run(&self) -> bool {
        false
    }

    /// Execute a translated query against `data`.
    fn run(&self, _query: &BackendQuery, _data: &Value) -> Result<Value> {
        Err(Error::RunNotSupported(self.name().to_string()))
    }
}

/// Parse a rendered limit. Negative values select from the end.
pub fn parse_limit(text: &str) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| Error::InvalidLimit(text.to_string()))
}
