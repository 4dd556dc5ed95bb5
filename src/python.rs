//! Optional Python bindings for universql via PyO3.
//!
//! Enabled with the `python` feature flag. Data and contexts cross the
//! boundary as JSON strings.
//!
//! ## Usage from Python
//!
//! ```python
//! import json
//! from universql import _universql as uql
//!
//! uql.format_query("/users{ name }[sort=age]")       # '/users{name}[sort=+age]'
//! uql.placeholders("/users[limit={{n}}]")            # ['n']
//! uql.translate("/users?age>18", adapter="sql")      # 'SELECT * FROM "users" WHERE "age" > 18'
//!
//! rows = uql.run("/users{name}[limit={{n}}]", json.dumps(users), json.dumps({"n": 2}))
//! print(json.loads(rows))
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::adapter::BackendQuery;
use crate::ast::{Context, Query};
use crate::engine::UniversQl;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_context(context: Option<&str>) -> PyResult<Context> {
    match context {
        Some(text) => serde_json::from_str(text)
            .map_err(|e| PyValueError::new_err(format!("Invalid context JSON: {}", e))),
        None => Ok(Context::new()),
    }
}

/// Parse a query string and print it in canonical form.
///
/// Raises:
///     ValueError: If the query cannot be parsed.
#[pyfunction]
fn format_query(query: &str) -> PyResult<String> {
    let query = Query::parse(query).map_err(value_error)?;
    Ok(query.to_string())
}

/// List the placeholder names a query needs, in first-seen order.
#[pyfunction]
fn placeholders(query: &str) -> PyResult<Vec<String>> {
    let query = Query::parse(query).map_err(value_error)?;
    Ok(query.placeholders())
}

/// Translate a query for an adapter.
///
/// Args:
///     query: The query string.
///     adapter: Adapter name; the default adapter when omitted.
///     context: JSON object with placeholder values.
///
/// Returns:
///     The backend query text (the debug form for in-memory queries).
#[pyfunction]
#[pyo3(signature = (query, adapter=None, context=None))]
fn translate(query: &str, adapter: Option<&str>, context: Option<&str>) -> PyResult<String> {
    let context = parse_context(context)?;
    let mut engine = UniversQl::new(query).map_err(value_error)?;
    match engine.translate(adapter, &context).map_err(value_error)? {
        BackendQuery::Text(text) => Ok(text),
        BackendQuery::Memory(query) => Ok(format!("{:?}", query)),
    }
}

/// Run a query over a JSON array with the default adapter.
///
/// Returns:
///     The result array as a JSON string.
#[pyfunction]
#[pyo3(signature = (query, data, context=None))]
fn run(query: &str, data: &str, context: Option<&str>) -> PyResult<String> {
    let context = parse_context(context)?;
    let data: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| PyValueError::new_err(format!("Invalid data JSON: {}", e)))?;
    let mut engine = UniversQl::new(query).map_err(value_error)?;
    let result = engine.execute(None, &data, &context).map_err(value_error)?;
    serde_json::to_string(&result).map_err(value_error)
}

/// universql Python module.
#[pymodule]
fn _universql(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(format_query, m)?)?;
    m.add_function(wrap_pyfunction!(placeholders, m)?)?;
    m.add_function(wrap_pyfunction!(translate, m)?)?;
    m.add_function(wrap_pyfunction!(run, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
