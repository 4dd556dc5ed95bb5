//! Canonical query-string printer.
//!
//! Prints a [`Query`] back to surface syntax. Filters are rebuilt from
//! postfix into fully parenthesized infix, so re-parsing the output yields
//! the same token stream regardless of how the original string grouped its
//! terms.
use std::fmt;

use super::postfix;
use super::types::*;

/// Format a query as its canonical query string.
pub fn format_query(query: &Query) -> String {
    query.to_string()
}

/// Infix rendering of a postfix filter stream, without the leading `?`.
///
/// Returns `None` for an empty or malformed stream.
pub fn format_filters(tokens: &[FilterToken]) -> Option<String> {
    if tokens.is_empty() {
        return None;
    }
    let (text, compound) = postfix::fold(
        tokens,
        |condition| Ok((format_condition(condition), false)),
        |op, left, right| {
            (
                format!("{}{}{}", group(left), op.symbol(), group(right)),
                true,
            )
        },
    )
    .ok()?;
    Some(if compound { format!("({})", text) } else { text })
}

fn group((text, compound): (String, bool)) -> String {
    if compound {
        format!("({})", text)
    } else {
        text
    }
}

fn format_condition(condition: &Condition) -> String {
    format!(
        "{}{}{}",
        condition.key,
        condition.comparator.symbol(),
        condition.value
    )
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(collection) = &self.collection {
            write!(f, "{}:", collection)?;
        }
        f.write_str(&self.path)?;

        if !self.fields.is_empty() {
            write!(f, "{{{}}}", self.fields.join(","))?;
        }

        let mut options = Vec::new();
        if !self.sort.is_empty() {
            let terms: String = self
                .sort
                .iter()
                .map(|spec| format!("{}{}", spec.order.sign(), spec.key))
                .collect();
            options.push(format!("sort={}", terms));
        }
        if let Some(limit) = &self.limit {
            options.push(format!("limit={}", limit));
        }
        if !options.is_empty() {
            write!(f, "[{}]", options.join(","))?;
        }

        if let Some(filters) = format_filters(&self.filters) {
            write!(f, "?{}", filters)?;
        }
        Ok(())
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Number(n) => f.write_str(&format_number(*n)),
            Literal::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                f.write_str("\"")
            }
            Literal::Regex { pattern, flags } => {
                write!(f, "/{}/{}", pattern.replace('/', "\\/"), flags)
            }
            Literal::Template(raw) => f.write_str(raw),
        }
    }
}
