/// Query → PostgreSQL compiler.
///
/// Produces `SELECT … FROM … [WHERE …] [ORDER BY …] [LIMIT …]` text for an
/// external driver. The last path segment names the table and the
/// `collection:` prefix, when present, its schema. Identifiers are always
/// double-quoted and string values single-quoted, so no input can change
/// the statement's shape.
use std::sync::Arc;

use tracing::debug;

use crate::ast::{
    postfix, Comparator, Condition, Context, FilterToken, Literal, LogicalOp, Query, SortOrder,
    SortSpec, TemplateEngine,
};
use crate::error::{Error, Result};

use super::{parse_limit, Adapter, BackendQuery, CompiledQuery};

/// Registry name of [`SqlAdapter`].
pub const SQL_ADAPTER: &str = "sql";

/// Compile-only SQL generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlAdapter;

impl Adapter for SqlAdapter {
    fn name(&self) -> &str {
        SQL_ADAPTER
    }

    fn compile(&self, query: &Query, templates: &TemplateEngine) -> Result<CompiledQuery> {
        let table = compile_table_ref(query)?;

        let projection = if query.fields.is_empty() {
            None
        } else {
            Some(templates.template_for(&query.fields, |fields: &Vec<String>| {
                Ok(compile_projection(fields))
            })?)
        };

        let filter = if query.filters.is_empty() {
            None
        } else {
            postfix::check(&query.filters)?;
            Some(templates.template_for(&query.filters, |tokens: &Vec<FilterToken>| {
                compile_where(tokens)
            })?)
        };

        let order_by = if query.sort.is_empty() {
            None
        } else {
            Some(templates.template_for(&query.sort, |specs: &Vec<SortSpec>| {
                Ok(compile_order_by(specs))
            })?)
        };

        let limit = match &query.limit {
            Some(limit) => Some(templates.template_for(limit, |text: &String| compile_limit(text))?),
            None => None,
        };

        debug!(adapter = SQL_ADAPTER, table = %table, "compiled query");

        Ok(Arc::new(move |context: &Context| {
            let mut parts = Vec::new();

            // SELECT
            match &projection {
                Some(columns) => parts.push(format!("SELECT {}", columns(context)?)),
                None => parts.push("SELECT *".to_string()),
            }

            // FROM
            parts.push(format!("FROM {}", table));

            // WHERE
            if let Some(filter) = &filter {
                parts.push(format!("WHERE {}", filter(context)?));
            }

            // ORDER BY
            if let Some(order_by) = &order_by {
                parts.push(format!("ORDER BY {}", order_by(context)?));
            }

            // LIMIT
            if let Some(limit) = &limit {
                parts.push(format!("LIMIT {}", limit(context)?));
            }

            Ok(BackendQuery::Text(parts.join(" ")))
        }))
    }
}

fn unsupported(feature: impl Into<String>) -> Error {
    Error::Unsupported {
        adapter: SQL_ADAPTER.to_string(),
        feature: feature.into(),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn compile_column(path: &str) -> String {
    path.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

fn compile_table_ref(query: &Query) -> Result<String> {
    let table = query
        .path
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .ok_or_else(|| unsupported("a query path without a table name"))?;
    Ok(match &query.collection {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(table),
    })
}

fn compile_projection(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| compile_column(f))
        .collect::<Vec<_>>()
        .join(", ")
}

fn compile_where(tokens: &[FilterToken]) -> Result<String> {
    postfix::fold(tokens, compile_condition, |op, left, right| {
        let keyword = match op {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        };
        format!("({} {} {})", left, keyword, right)
    })
}

fn compile_condition(condition: &Condition) -> Result<String> {
    let column = compile_column(&condition.key);
    match (condition.comparator, &condition.value) {
        (_, Literal::Template(raw)) => Err(Error::InvalidSubstitution {
            position: "filter value",
            value: raw.clone(),
        }),
        (Comparator::Eq, Literal::Null) => Ok(format!("{} IS NULL", column)),
        (Comparator::Neq, Literal::Null) => Ok(format!("{} IS NOT NULL", column)),
        (_, Literal::Null) => Err(unsupported("ordering comparisons against null")),
        (Comparator::Match, Literal::Regex { pattern, flags }) => {
            let op = if flags.contains('i') { "~*" } else { "~" };
            Ok(format!("{} {} {}", column, op, quote_string(pattern)))
        }
        (Comparator::Match, Literal::String(pattern)) => {
            Ok(format!("{} ~ {}", column, quote_string(pattern)))
        }
        (Comparator::Match, _) | (_, Literal::Regex { .. }) => {
            Err(unsupported("regex comparisons other than '~' with a pattern"))
        }
        (comparator, value) => Ok(format!(
            "{} {} {}",
            column,
            compile_comparator(comparator),
            compile_literal(value)
        )),
    }
}

fn compile_comparator(comparator: Comparator) -> &'static str {
    match comparator {
        Comparator::Eq => "=",
        Comparator::Neq => "<>",
        Comparator::Gt => ">",
        Comparator::Gte => ">=",
        Comparator::Lt => "<",
        Comparator::Lte => "<=",
        Comparator::Match => "~",
    }
}

fn compile_literal(value: &Literal) -> String {
    match value {
        Literal::Null => "NULL".to_string(),
        Literal::Boolean(true) => "TRUE".to_string(),
        Literal::Boolean(false) => "FALSE".to_string(),
        Literal::Number(_) => value.to_string(),
        Literal::String(s) | Literal::Template(s) => quote_string(s),
        Literal::Regex { pattern, .. } => quote_string(pattern),
    }
}

fn compile_order_by(specs: &[SortSpec]) -> String {
    specs
        .iter()
        .map(|spec| {
            let direction = match spec.order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            format!("{} {}", compile_column(&spec.key), direction)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn compile_limit(text: &str) -> Result<i64> {
    let limit = parse_limit(text)?;
    if limit < 0 {
        return Err(unsupported("negative limits"));
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlparser::dialect::PostgreSqlDialect;
    use sqlparser::parser::Parser;

    fn to_sql(query: &str, context: serde_json::Value) -> Result<String> {
        let query = Query::parse(query).unwrap();
        let compiled = SqlAdapter.compile(&query, &TemplateEngine::new())?;
        let context: Context = serde_json::from_value(context).unwrap();
        match compiled(&context)? {
            BackendQuery::Text(sql) => Ok(sql),
            BackendQuery::Memory(_) => panic!("expected SQL text"),
        }
    }

    fn assert_valid_postgres(sql: &str) {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
            .unwrap_or_else(|e| panic!("generated SQL did not parse: {}\n{}", e, sql));
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_select_star() {
        let sql = to_sql("/users", json!({})).unwrap();
        assert_eq!(sql, r#"SELECT * FROM "users""#);
        assert_valid_postgres(&sql);
    }

    #[test]
    fn test_full_query() {
        let sql = to_sql(
            "app:/api/users{name,user.email}[sort=-age+name,limit=5]?(age>=18&name~/^a/i)",
            json!({}),
        )
        .unwrap();
        assert_eq!(
            sql,
            r#"SELECT "name", "user"."email" FROM "app"."users" WHERE ("age" >= 18 AND "name" ~* '^a') ORDER BY "age" DESC, "name" ASC LIMIT 5"#
        );
        assert_valid_postgres(&sql);
    }

    #[test]
    fn test_null_and_boolean_conditions() {
        let sql = to_sql("/t?(deleted=null|active!=true)", json!({})).unwrap();
        assert_eq!(
            sql,
            r#"SELECT * FROM "t" WHERE ("deleted" IS NULL OR "active" <> TRUE)"#
        );
        assert_valid_postgres(&sql);
    }

    #[test]
    fn test_quoting() {
        let sql = to_sql(r#"/t?name="it's""#, json!({})).unwrap();
        assert_eq!(sql, r#"SELECT * FROM "t" WHERE "name" = 'it''s'"#);
        assert_valid_postgres(&sql);
    }

    #[test]
    fn test_templated_query() {
        let sql = to_sql(
            "/t{{{col}}}[limit={{n}}]?name={{who}}",
            json!({"col": "id", "n": 3, "who": "Bob"}),
        )
        .unwrap();
        assert_eq!(sql, r#"SELECT "id" FROM "t" WHERE "name" = 'Bob' LIMIT 3"#);
        assert_valid_postgres(&sql);
    }

    #[test]
    fn test_negative_limit_unsupported() {
        assert!(matches!(
            to_sql("/t[limit=-2]", json!({})),
            Err(Error::Unsupported { .. })
        ));
    }

    #[test]
    fn test_cannot_run() {
        let adapter = SqlAdapter;
        assert!(!adapter.can_run());
        assert!(matches!(
            adapter.run(&BackendQuery::Text("SELECT 1".into()), &json!([])),
            Err(Error::RunNotSupported(_))
        ));
    }
}
