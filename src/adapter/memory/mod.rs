//! The built-in `json` adapter: runs queries over in-memory JSON arrays.
//!
//! Compilation binds each query fragment separately, so a query whose only
//! placeholder is the limit re-renders just the limit on every translate.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::ast::{postfix, Context, FilterToken, Query, SortOrder, SortSpec, TemplateEngine};
use crate::error::{Error, Result};

use super::{parse_limit, Adapter, BackendQuery, CompiledQuery};

mod exec;
pub mod predicate;
pub mod value;

pub use exec::execute;
pub use predicate::{compile_predicate, Predicate};

/// Registry name of [`MemoryAdapter`].
pub const MEMORY_ADAPTER: &str = "json";

/// Builds the projected copy of a record.
pub type Projector = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Sort keys and their directions, primary key first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortKeys {
    pub keys: Vec<String>,
    pub orders: Vec<SortOrder>,
}

impl SortKeys {
    fn from_specs(specs: &[SortSpec]) -> Self {
        Self {
            keys: specs.iter().map(|s| s.key.clone()).collect(),
            orders: specs.iter().map(|s| s.order).collect(),
        }
    }
}

/// A translated query, ready for [`execute`]. Absent stages are skipped.
#[derive(Clone, Default)]
pub struct MemoryQuery {
    pub sort: Option<SortKeys>,
    pub predicate: Option<Predicate>,
    pub projector: Option<Projector>,
    pub limit: Option<i64>,
}

impl fmt::Debug for MemoryQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQuery")
            .field("sort", &self.sort)
            .field("predicate", &self.predicate.as_ref().map(|_| "<fn>"))
            .field("projector", &self.projector.as_ref().map(|_| "<fn>"))
            .field("limit", &self.limit)
            .finish()
    }
}

/// In-memory reference adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryAdapter;

impl Adapter for MemoryAdapter {
    fn name(&self) -> &str {
        MEMORY_ADAPTER
    }

    fn compile(&self, query: &Query, templates: &TemplateEngine) -> Result<CompiledQuery> {
        let sort = if query.sort.is_empty() {
            None
        } else {
            Some(templates.template_for(&query.sort, |specs: &Vec<SortSpec>| {
                Ok(SortKeys::from_specs(specs))
            })?)
        };

        let predicate = if query.filters.is_empty() {
            None
        } else {
            // Shape errors surface now even when values are templated.
            postfix::check(&query.filters)?;
            Some(templates.template_for(&query.filters, |tokens: &Vec<FilterToken>| {
                compile_predicate(tokens)
            })?)
        };

        let projector = if query.fields.is_empty() {
            None
        } else {
            Some(templates.template_for(&query.fields, |fields: &Vec<String>| {
                Ok(build_projector(fields))
            })?)
        };

        let limit = match &query.limit {
            Some(limit) => Some(templates.template_for(limit, |text: &String| parse_limit(text))?),
            None => None,
        };

        debug!(
            adapter = MEMORY_ADAPTER,
            fields = query.fields.len(),
            filters = query.filters.len(),
            sort_keys = query.sort.len(),
            "compiled query"
        );

        Ok(Arc::new(move |context: &Context| {
            Ok(BackendQuery::Memory(MemoryQuery {
                sort: sort.as_ref().map(|f| f(context)).transpose()?,
                predicate: predicate.as_ref().map(|f| f(context)).transpose()?,
                projector: projector.as_ref().map(|f| f(context)).transpose()?,
                limit: limit.as_ref().map(|f| f(context)).transpose()?,
            }))
        }))
    }

    fn can_run(&self) -> bool {
        true
    }

    fn run(&self, query: &BackendQuery, data: &Value) -> Result<Value> {
        match query {
            BackendQuery::Memory(query) => execute(query, data),
            BackendQuery::Text(_) => Err(Error::IncompatibleBackendQuery {
                adapter: MEMORY_ADAPTER.to_string(),
            }),
        }
    }
}

fn build_projector(fields: &[String]) -> Projector {
    let paths: Vec<Vec<String>> = fields.iter().map(|f| value::split_path(f)).collect();
    Arc::new(move |record: &Value| exec::project(record, &paths))
}
