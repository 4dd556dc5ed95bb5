//! Sort → filter → limit → project over a JSON array.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use tracing::trace;

use crate::ast::SortOrder;
use crate::error::{Error, Result};

use super::value::{get_path, kind_of, object_at, set_path, sort_cmp, split_path};
use super::{MemoryQuery, SortKeys};

/// Run `query` over `data`, which must be an array.
///
/// The input is never mutated; records that pass through unprojected are
/// cloned into the result.
pub fn execute(query: &MemoryQuery, data: &Value) -> Result<Value> {
    let Value::Array(records) = data else {
        return Err(Error::InvalidInputKind {
            found: kind_of(data),
        });
    };

    let mut rows: Vec<&Value> = records.iter().collect();
    if let Some(sort) = &query.sort {
        sort_rows(&mut rows, sort);
    }
    if let Some(predicate) = &query.predicate {
        rows.retain(|record| predicate(*record));
    }
    if let Some(limit) = query.limit {
        apply_limit(&mut rows, limit);
    }

    let out: Vec<Value> = match &query.projector {
        Some(projector) => rows.into_iter().map(|record| projector(record)).collect(),
        None => rows.into_iter().cloned().collect(),
    };
    trace!(input = records.len(), output = out.len(), "executed memory query");
    Ok(Value::Array(out))
}

/// Stable multi-key sort. Keys without an explicit order sort ascending.
fn sort_rows(rows: &mut [&Value], sort: &SortKeys) {
    let keys: Vec<(Vec<String>, SortOrder)> = sort
        .keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            (
                split_path(key),
                sort.orders.get(i).copied().unwrap_or_default(),
            )
        })
        .collect();

    rows.sort_by(|a, b| {
        for (path, order) in &keys {
            let ordering = sort_cmp(get_path(a, path), get_path(b, path));
            let ordering = match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Keep the first `limit` rows, or the last `|limit|` when negative.
fn apply_limit(rows: &mut Vec<&Value>, limit: i64) {
    let count = usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX);
    if limit >= 0 {
        rows.truncate(count);
    } else if count < rows.len() {
        let skip = rows.len() - count;
        rows.drain(..skip);
    }
}

/// Copy the selected paths of `record` into a fresh object.
///
/// A path the record lacks leaves out its last segment but still creates
/// the objects above it: `{user.name}` over `{"id": 1}` gives `{"user": {}}`.
pub(super) fn project(record: &Value, paths: &[Vec<String>]) -> Value {
    let mut out = Map::new();
    for path in paths {
        match get_path(record, path) {
            Some(value) => set_path(&mut out, path, value.clone()),
            None => {
                if let Some((_, parents)) = path.split_last() {
                    object_at(&mut out, parents);
                }
            }
        }
    }
    Value::Object(out)
}
