//! Canonical query model for universql.
//!
//! The parser produces a [`Query`]; every adapter compiles from it. The model
//! is backend-agnostic and read-only once built:
//! - `fields` are dot-separated paths (possibly carrying `{{placeholders}}`)
//! - `filters` is a boolean expression in postfix (RPN) order
//! - `sort` is applied primary key first
//! - `limit` is kept as text until compile time since it may be templated

use std::str::FromStr;

use crate::error::SyntaxError;

use super::parser;
use super::template::TemplateEngine;

/// A parsed query string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Optional `collection:` prefix.
    pub collection: Option<String>,
    /// The `/`-prefixed resource path.
    pub path: String,
    pub fields: Vec<String>,
    /// Postfix-encoded filter expression.
    pub filters: Vec<FilterToken>,
    pub sort: Vec<SortSpec>,
    /// Integer literal or template, e.g. `"5"`, `"-2"`, `"{{limit}}"`.
    pub limit: Option<String>,
}

impl Query {
    /// Parse a query string.
    pub fn parse(input: &str) -> Result<Self, SyntaxError> {
        parser::parse_query(input)
    }

    /// Names of all placeholders used anywhere in the query, in first-seen
    /// order and without duplicates.
    pub fn placeholders(&self) -> Vec<String> {
        TemplateEngine::new().query_placeholders(self)
    }

    /// True when no fragment carries a placeholder.
    pub fn is_constant(&self) -> bool {
        self.placeholders().is_empty()
    }
}

impl FromStr for Query {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One element of a postfix filter stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterToken {
    Condition(Condition),
    Operator(LogicalOp),
}

impl FilterToken {
    pub fn condition(key: impl Into<String>, comparator: Comparator, value: Literal) -> Self {
        FilterToken::Condition(Condition {
            key: key.into(),
            comparator,
            value,
        })
    }

    pub fn and() -> Self {
        FilterToken::Operator(LogicalOp::And)
    }

    pub fn or() -> Self {
        FilterToken::Operator(LogicalOp::Or)
    }
}

/// `key comparator value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub key: String,
    pub comparator: Comparator,
    pub value: Literal,
}

impl Condition {
    pub fn is_regex(&self) -> bool {
        matches!(self.value, Literal::Regex { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Regular-expression match (`~`).
    Match,
}

impl Comparator {
    /// Canonical surface syntax. `Neq` prints as `!=` even when written `<>`.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Neq => "!=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Match => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&",
            LogicalOp::Or => "|",
        }
    }

    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            LogicalOp::And => left && right,
            LogicalOp::Or => left || right,
        }
    }
}

/// Filter values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// `/pattern/flags`; only valid with [`Comparator::Match`].
    Regex { pattern: String, flags: String },
    /// An unquoted value carrying placeholders, re-parsed once rendered.
    Template(String),
}

/// Regex flags accepted after the closing `/`.
pub const REGEX_FLAGS: &str = "gimsuy";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn sign(self) -> char {
        match self {
            SortOrder::Ascending => '+',
            SortOrder::Descending => '-',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub key: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            order: SortOrder::Descending,
        }
    }
}
