//! Placeholder substitution for query fragments.
//!
//! Any fragment of a [`Query`] (`fields`, `filters`, `sort`, `limit`) may
//! carry `{{name}}` markers. [`TemplateEngine::template_for`] binds a fragment
//! to a lowering function and returns a function of the translate-time
//! [`Context`]:
//!
//! - no markers: the fragment is lowered once and the result returned for
//!   every context
//! - markers: each text leaf is rendered against the context, the leaf is
//!   re-validated for its position (path, value, ...), then the rebuilt
//!   fragment is lowered
//!
//! Substitution walks the fragment's leaves rather than splicing serialized
//! text, so a bad value fails on its own leaf. Values are rendered once:
//! markers produced by a context value are left as literal text.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};

use super::parser::{is_valid_path, operands_compatible, parse_literal};
use super::types::{Condition, FilterToken, Literal, Query, SortSpec};

/// Placeholder values supplied at translate time.
pub type Context = serde_json::Map<String, Value>;

/// A fragment bound to the template engine.
pub type TemplateFn<T> = Arc<dyn Fn(&Context) -> Result<T> + Send + Sync>;

/// `{{name}}`, non-greedy, name in the first capture group.
pub const DEFAULT_MARKER: &str = r"\{\{([\s\S]+?)\}\}";

static DEFAULT_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_MARKER).expect("default marker pattern compiles"));

pub(crate) fn default_marker() -> &'static Regex {
    &DEFAULT_MARKER_RE
}

/// A query fragment whose text leaves may carry placeholders.
pub trait Fragment: Sized {
    /// Every text leaf, in order.
    fn leaves(&self) -> Vec<&str>;

    /// Rebuild the fragment with each leaf passed through `render`.
    ///
    /// Rendered leaves must still be valid for their position.
    fn substitute(&self, render: &mut dyn FnMut(&str) -> Result<String>) -> Result<Self>;
}

/// Limit text.
impl Fragment for String {
    fn leaves(&self) -> Vec<&str> {
        vec![self.as_str()]
    }

    fn substitute(&self, render: &mut dyn FnMut(&str) -> Result<String>) -> Result<Self> {
        render(self)
    }
}

/// Projection fields.
impl Fragment for Vec<String> {
    fn leaves(&self) -> Vec<&str> {
        self.iter().map(String::as_str).collect()
    }

    fn substitute(&self, render: &mut dyn FnMut(&str) -> Result<String>) -> Result<Self> {
        self.iter()
            .map(|field| render_path(render, field, "field path"))
            .collect()
    }
}

impl Fragment for Vec<SortSpec> {
    fn leaves(&self) -> Vec<&str> {
        self.iter().map(|spec| spec.key.as_str()).collect()
    }

    fn substitute(&self, render: &mut dyn FnMut(&str) -> Result<String>) -> Result<Self> {
        self.iter()
            .map(|spec| {
                Ok(SortSpec {
                    key: render_path(render, &spec.key, "sort field")?,
                    order: spec.order,
                })
            })
            .collect()
    }
}

impl Fragment for Vec<FilterToken> {
    fn leaves(&self) -> Vec<&str> {
        let mut leaves = Vec::new();
        for token in self {
            if let FilterToken::Condition(condition) = token {
                leaves.push(condition.key.as_str());
                match &condition.value {
                    Literal::String(text) | Literal::Template(text) => leaves.push(text.as_str()),
                    Literal::Regex { pattern, .. } => leaves.push(pattern.as_str()),
                    Literal::Null | Literal::Boolean(_) | Literal::Number(_) => {}
                }
            }
        }
        leaves
    }

    fn substitute(&self, render: &mut dyn FnMut(&str) -> Result<String>) -> Result<Self> {
        self.iter()
            .map(|token| match token {
                FilterToken::Operator(op) => Ok(FilterToken::Operator(*op)),
                FilterToken::Condition(condition) => {
                    substitute_condition(condition, render).map(FilterToken::Condition)
                }
            })
            .collect()
    }
}

fn render_path(
    render: &mut dyn FnMut(&str) -> Result<String>,
    path: &str,
    position: &'static str,
) -> Result<String> {
    let rendered = render(path)?;
    if !is_valid_path(&rendered) {
        return Err(Error::InvalidSubstitution {
            position,
            value: rendered,
        });
    }
    Ok(rendered)
}

fn substitute_condition(
    condition: &Condition,
    render: &mut dyn FnMut(&str) -> Result<String>,
) -> Result<Condition> {
    let key = render_path(render, &condition.key, "filter key")?;
    let value = match &condition.value {
        Literal::String(text) => Literal::String(render(text)?),
        Literal::Regex { pattern, flags } => Literal::Regex {
            pattern: render(pattern)?,
            flags: flags.clone(),
        },
        Literal::Template(raw) => {
            let text = render(raw)?;
            match parse_literal(&text) {
                Ok(Literal::Template(_)) | Err(_) => {
                    return Err(Error::InvalidSubstitution {
                        position: "filter value",
                        value: text,
                    })
                }
                Ok(value) => value,
            }
        }
        other => other.clone(),
    };

    if !operands_compatible(condition.comparator, &value) {
        return Err(Error::InvalidSubstitution {
            position: "filter value",
            value: format!("{} {}", condition.comparator.symbol(), value),
        });
    }

    Ok(Condition {
        key,
        comparator: condition.comparator,
        value,
    })
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

/// Detects and renders placeholders.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    marker: Regex,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER_RE.clone(),
        }
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom marker. The placeholder name must be capture group 1.
    pub fn with_marker(pattern: &str) -> Result<Self> {
        let marker =
            Regex::new(pattern).map_err(|e| Error::InvalidTemplatePattern(e.to_string()))?;
        if marker.captures_len() < 2 {
            return Err(Error::InvalidTemplatePattern(
                "the placeholder name must be captured by group 1".to_string(),
            ));
        }
        Ok(Self { marker })
    }

    pub fn marker(&self) -> &Regex {
        &self.marker
    }

    pub fn has_placeholders<F: Fragment>(&self, fragment: &F) -> bool {
        fragment
            .leaves()
            .iter()
            .any(|leaf| self.marker.is_match(leaf))
    }

    /// Placeholder names in `fragment`, trimmed, first occurrence only.
    pub fn placeholders<F: Fragment>(&self, fragment: &F) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(fragment, &mut names);
        names
    }

    /// Placeholder names across every fragment of `query`.
    pub fn query_placeholders(&self, query: &Query) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&query.fields, &mut names);
        self.collect_names(&query.filters, &mut names);
        self.collect_names(&query.sort, &mut names);
        if let Some(limit) = &query.limit {
            self.collect_names(limit, &mut names);
        }
        names
    }

    fn collect_names<F: Fragment>(&self, fragment: &F, names: &mut Vec<String>) {
        for leaf in fragment.leaves() {
            for caps in self.marker.captures_iter(leaf) {
                let name = caps.get(1).map_or("", |m| m.as_str()).trim();
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
    }

    /// Replace every marker in `text` with its context value.
    ///
    /// Strings render bare, everything else as JSON (`3`, `true`, `null`).
    pub fn render(&self, text: &str, context: &Context) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.marker.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let name = caps.get(1).map_or("", |m| m.as_str()).trim();
            let value = context
                .get(name)
                .ok_or_else(|| Error::MissingContextValue(name.to_string()))?;
            out.push_str(&text[last..whole.start()]);
            push_value(&mut out, value);
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Bind `fragment` to `lower`, returning a function of the context.
    ///
    /// Without placeholders `lower` runs here, once, and its errors surface
    /// immediately; with placeholders it runs on every call.
    pub fn template_for<F, T, L>(&self, fragment: &F, lower: L) -> Result<TemplateFn<T>>
    where
        F: Fragment + Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
        L: Fn(&F) -> Result<T> + Send + Sync + 'static,
    {
        if !self.has_placeholders(fragment) {
            let out = lower(fragment)?;
            return Ok(Arc::new(move |_: &Context| Ok(out.clone())));
        }

        let engine = self.clone();
        let fragment = fragment.clone();
        Ok(Arc::new(move |context: &Context| {
            let resolved = fragment.substitute(&mut |leaf: &str| engine.render(leaf, context))?;
            lower(&resolved)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::Comparator;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx(value: Value) -> Context {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_render_replaces_markers() {
        let engine = TemplateEngine::new();
        let out = engine
            .render("a{{ x }}b{{y}}", &ctx(json!({"x": "1", "y": 2})))
            .unwrap();
        assert_eq!(out, "a1b2");
    }

    #[test]
    fn test_render_non_string_values() {
        let engine = TemplateEngine::new();
        let out = engine
            .render("{{t}},{{n}}", &ctx(json!({"t": true, "n": null})))
            .unwrap();
        assert_eq!(out, "true,null");
    }

    #[test]
    fn test_render_missing_value() {
        let engine = TemplateEngine::new();
        let err = engine.render("{{limit}}", &Context::new()).unwrap_err();
        assert!(matches!(err, Error::MissingContextValue(ref n) if n == "limit"));
    }

    #[test]
    fn test_constant_fragment_lowers_once() {
        let engine = TemplateEngine::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let f = engine
            .template_for(&"5".to_string(), move |limit: &String| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(limit.parse::<i64>().unwrap())
            })
            .unwrap();

        assert_eq!(f(&Context::new()).unwrap(), 5);
        assert_eq!(f(&ctx(json!({"limit": "9"}))).unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_templated_limit() {
        let engine = TemplateEngine::new();
        let f = engine
            .template_for(&"{{limit}}".to_string(), |limit: &String| {
                limit
                    .parse::<i64>()
                    .map_err(|_| Error::InvalidLimit(limit.clone()))
            })
            .unwrap();
        assert_eq!(f(&ctx(json!({"limit": "3"}))).unwrap(), 3);
        assert_eq!(f(&ctx(json!({"limit": 7}))).unwrap(), 7);
    }

    #[test]
    fn test_field_substitution_validates_path() {
        let engine = TemplateEngine::new();
        let fields = vec!["name".to_string(), "{{field}}".to_string()];
        let f = engine
            .template_for(&fields, |fields: &Vec<String>| Ok(fields.clone()))
            .unwrap();

        assert_eq!(
            f(&ctx(json!({"field": "user.age"}))).unwrap(),
            vec!["name".to_string(), "user.age".to_string()]
        );
        // One placeholder never expands to several fields.
        assert!(matches!(
            f(&ctx(json!({"field": "a,b"}))),
            Err(Error::InvalidSubstitution { position: "field path", .. })
        ));
    }

    #[test]
    fn test_filter_template_value_reparsed() {
        let engine = TemplateEngine::new();
        let filters = vec![FilterToken::condition(
            "age",
            Comparator::Gt,
            Literal::Template("{{min}}".into()),
        )];
        let f = engine
            .template_for(&filters, |tokens: &Vec<FilterToken>| Ok(tokens.clone()))
            .unwrap();
        let resolved = f(&ctx(json!({"min": 18}))).unwrap();
        assert_eq!(
            resolved,
            vec![FilterToken::condition(
                "age",
                Comparator::Gt,
                Literal::Number(18.0)
            )]
        );
    }

    #[test]
    fn test_filter_quoted_and_regex_leaves() {
        let engine = TemplateEngine::new();
        let filters = vec![
            FilterToken::condition("name", Comparator::Eq, Literal::String("{{who}}".into())),
            FilterToken::condition(
                "tag",
                Comparator::Match,
                Literal::Regex {
                    pattern: "^{{prefix}}".into(),
                    flags: "i".into(),
                },
            ),
            FilterToken::and(),
        ];
        let f = engine
            .template_for(&filters, |tokens: &Vec<FilterToken>| Ok(tokens.clone()))
            .unwrap();
        let resolved = f(&ctx(json!({"who": "Bob Smith", "prefix": "ab"}))).unwrap();
        assert_eq!(
            resolved[0],
            FilterToken::condition("name", Comparator::Eq, Literal::String("Bob Smith".into()))
        );
        assert_eq!(
            resolved[1],
            FilterToken::condition(
                "tag",
                Comparator::Match,
                Literal::Regex {
                    pattern: "^ab".into(),
                    flags: "i".into()
                }
            )
        );
    }

    #[test]
    fn test_no_nested_evaluation() {
        let engine = TemplateEngine::new();
        let filters = vec![FilterToken::condition(
            "a",
            Comparator::Eq,
            Literal::Template("{{x}}".into()),
        )];
        let f = engine
            .template_for(&filters, |tokens: &Vec<FilterToken>| Ok(tokens.clone()))
            .unwrap();
        assert!(matches!(
            f(&ctx(json!({"x": "{{y}}", "y": 1}))),
            Err(Error::InvalidSubstitution { .. })
        ));
    }

    #[test]
    fn test_template_value_rendered_as_regex_needs_match() {
        let engine = TemplateEngine::new();
        let filters = vec![FilterToken::condition(
            "a",
            Comparator::Eq,
            Literal::Template("{{x}}".into()),
        )];
        let f = engine
            .template_for(&filters, |tokens: &Vec<FilterToken>| Ok(tokens.clone()))
            .unwrap();
        assert!(f(&ctx(json!({"x": "/^a/"}))).is_err());
    }

    #[test]
    fn test_custom_marker() {
        let engine = TemplateEngine::with_marker(r"\$\{(\w+)\}").unwrap();
        let out = engine
            .render("limit=${n}", &ctx(json!({"n": 4})))
            .unwrap();
        assert_eq!(out, "limit=4");
        assert!(!engine.has_placeholders(&"{{n}}".to_string()));
    }

    #[test]
    fn test_custom_marker_requires_group() {
        assert!(matches!(
            TemplateEngine::with_marker(r"\$\w+"),
            Err(Error::InvalidTemplatePattern(_))
        ));
        assert!(TemplateEngine::with_marker("(").is_err());
    }

    #[test]
    fn test_placeholders_deduplicated() {
        let engine = TemplateEngine::new();
        let fields = vec![
            "{{ a }}".to_string(),
            "x.{{b}}".to_string(),
            "{{a}}".to_string(),
        ];
        assert_eq!(
            engine.placeholders(&fields),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
