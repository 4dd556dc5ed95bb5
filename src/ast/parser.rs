//! Query string → canonical [`Query`] parser.
//!
//! Grammar:
//!
//! ```text
//! query    := [collection ":"] "/" path [projection] [options] ["?" filters]
//! projection := "{" field ("," field)* "}"
//! options  := "[" option ("," option)* "]"
//! option   := "sort=" sortTerm+ | "limit=" limitVal
//! sortTerm := ("+" | "-") field          (sign optional on the first term)
//! filters  := item (logic item)*         (left to right, no precedence)
//! item     := "(" orExpr ")" | term
//! orExpr   := andExpr (("|" | "||") andExpr)*
//! andExpr  := item (("&" | "&&") item)*
//! term     := field comparator value
//! ```
//!
//! Filter expressions are emitted directly in postfix order: operands
//! depth-first, each operator right after its two operands. A group holding
//! a single term emits just that term.

use regex::Regex;

use crate::error::SyntaxError;

use super::template::{default_marker, TemplateEngine};
use super::types::*;

type ParseResult<T> = Result<T, SyntaxError>;

const COMPARATORS: [(&str, Comparator); 8] = [
    ("!=", Comparator::Neq),
    ("<>", Comparator::Neq),
    (">=", Comparator::Gte),
    ("<=", Comparator::Lte),
    ("=", Comparator::Eq),
    (">", Comparator::Gt),
    ("<", Comparator::Lt),
    ("~", Comparator::Match),
];

/// Parse a full query string with `{{name}}` placeholders.
pub fn parse_query(input: &str) -> ParseResult<Query> {
    let mut parser = Parser::new(input);
    parser.query()
}

/// Parse a full query string, recognizing placeholders by `templates`'
/// marker.
pub fn parse_query_with(input: &str, templates: &TemplateEngine) -> ParseResult<Query> {
    let mut parser = Parser::with_marker(input, templates.marker());
    parser.query()
}

/// Parse a lone filter value, e.g. `42`, `"Bob"`, `/^a/i`, `true`.
///
/// Used to re-read unquoted values after placeholder substitution.
pub fn parse_literal(input: &str) -> ParseResult<Literal> {
    let mut parser = Parser::new(input);
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    parser.expect_end()?;
    Ok(value)
}

/// True for a dot-separated path of non-empty identifier segments.
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .split('.')
            .all(|seg| !seg.is_empty() && seg.chars().all(is_ident_char))
}

/// Whether `value` may appear on the right of `comparator`.
pub(crate) fn operands_compatible(comparator: Comparator, value: &Literal) -> bool {
    match (comparator, value) {
        (_, Literal::Template(_)) => true,
        (Comparator::Match, Literal::Regex { .. } | Literal::String(_)) => true,
        (Comparator::Match, _) => false,
        (_, Literal::Regex { .. }) => false,
        _ => true,
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn parse_number(raw: &str) -> Option<f64> {
    let unsigned = raw
        .strip_prefix(|c: char| c == '-' || c == '+')
        .unwrap_or(raw);
    if !unsigned.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    // f64's parser also takes "inf" and "NaN"; the prefix check above rules
    // those spellings out, this rules out overflow to infinity.
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn bare_literal(raw: &str) -> Literal {
    match raw {
        "true" => Literal::Boolean(true),
        "false" => Literal::Boolean(false),
        "null" => Literal::Null,
        _ => match parse_number(raw) {
            Some(n) => Literal::Number(n),
            None => Literal::String(raw.to_string()),
        },
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    marker: &'a Regex,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self::with_marker(src, default_marker())
    }

    fn with_marker(src: &'a str, marker: &'a Regex) -> Self {
        Self {
            src,
            pos: 0,
            marker,
        }
    }

    // ---------------------------------------------------------------------
    // Cursor helpers
    // ---------------------------------------------------------------------

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.at(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, c: char) -> ParseResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("'{}'", c)))
        }
    }

    fn expect_end(&self) -> ParseResult<()> {
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(self.error("end of query"))
        }
    }

    fn error(&self, expected: impl Into<String>) -> SyntaxError {
        self.error_at(self.pos, expected)
    }

    fn error_at(&self, position: usize, expected: impl Into<String>) -> SyntaxError {
        SyntaxError {
            position,
            expected: expected.into(),
            found: self.src[position..].chars().next(),
        }
    }

    // ---------------------------------------------------------------------
    // Query structure
    // ---------------------------------------------------------------------

    fn query(&mut self) -> ParseResult<Query> {
        self.skip_ws();
        let collection = self.collection();
        if !self.at("/") {
            return Err(self.error("'/'"));
        }
        let path = self.path();

        let mut query = Query {
            collection,
            path,
            ..Default::default()
        };

        if self.eat('{') {
            query.fields = self.fields()?;
        }
        if self.eat('[') {
            self.options(&mut query)?;
        }
        self.skip_ws();
        if self.eat('?') {
            self.filters(&mut query.filters)?;
        }
        self.skip_ws();
        self.expect_end()?;
        Ok(query)
    }

    fn collection(&mut self) -> Option<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_char(c) || c == '-' || c == '.') {
            self.bump();
        }
        if self.pos > start && self.eat(':') {
            Some(self.src[start..self.pos - 1].to_string())
        } else {
            self.pos = start;
            None
        }
    }

    fn path(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if !matches!(c, '{' | '[' | '?') && !c.is_whitespace())
        {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn fields(&mut self) -> ParseResult<Vec<String>> {
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            fields.push(self.field_path("field name")?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Ok(fields);
            }
            return Err(self.error("',' or '}'"));
        }
    }

    /// A dotted path whose segments may include placeholders.
    fn field_path(&mut self, what: &str) -> ParseResult<String> {
        let start = self.pos;
        let mut templated = false;
        loop {
            if self.placeholder()? {
                templated = true;
            } else if matches!(self.peek(), Some(c) if is_ident_char(c) || c == '.') {
                self.bump();
            } else {
                break;
            }
        }
        let path = &self.src[start..self.pos];
        if path.is_empty() || (!templated && !is_valid_path(path)) {
            return Err(self.error_at(start, what));
        }
        Ok(path.to_string())
    }

    /// Consume a placeholder starting at the cursor, if there is one.
    fn placeholder(&mut self) -> ParseResult<bool> {
        let found = self
            .marker
            .find_at(self.src, self.pos)
            .filter(|m| m.start() == self.pos && m.end() > self.pos);
        if let Some(m) = found {
            self.pos = m.end();
            return Ok(true);
        }

        // A `{{` the default marker rejects is empty or unterminated.
        if self.marker.as_str() != default_marker().as_str() || !self.at("{{") {
            return Ok(false);
        }
        if self.rest()[2..].starts_with("}}") {
            return Err(self.error_at(self.pos + 2, "placeholder name"));
        }
        Err(SyntaxError {
            position: self.src.len(),
            expected: format!("'}}}}' closing the placeholder opened at {}", self.pos),
            found: None,
        })
    }

    fn options(&mut self, query: &mut Query) -> ParseResult<()> {
        loop {
            self.skip_ws();
            let start = self.pos;
            if self.eat_str("sort") {
                if !query.sort.is_empty() {
                    return Err(self.error_at(start, "a single sort option"));
                }
                self.skip_ws();
                self.expect('=')?;
                self.skip_ws();
                query.sort = self.sort_terms()?;
            } else if self.eat_str("limit") {
                if query.limit.is_some() {
                    return Err(self.error_at(start, "a single limit option"));
                }
                self.skip_ws();
                self.expect('=')?;
                self.skip_ws();
                query.limit = Some(self.limit_value()?);
            } else {
                return Err(self.error("'sort=' or 'limit='"));
            }

            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(']') {
                return Ok(());
            }
            return Err(self.error("',' or ']'"));
        }
    }

    fn sort_terms(&mut self) -> ParseResult<Vec<SortSpec>> {
        let mut terms = Vec::new();
        loop {
            let order = if self.eat('+') {
                SortOrder::Ascending
            } else if self.eat('-') {
                SortOrder::Descending
            } else if terms.is_empty() {
                SortOrder::Ascending
            } else {
                break;
            };
            let key = self.field_path("sort field")?;
            terms.push(SortSpec { key, order });
        }
        Ok(terms)
    }

    fn limit_value(&mut self) -> ParseResult<String> {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.bump();
        }
        let mut templated = false;
        loop {
            if self.placeholder()? {
                templated = true;
            } else if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            } else {
                break;
            }
        }
        let raw = &self.src[start..self.pos];
        if !templated && raw.parse::<i64>().is_err() {
            return Err(self.error_at(start, "integer limit or placeholder"));
        }
        Ok(raw.to_string())
    }

    // ---------------------------------------------------------------------
    // Filters
    // ---------------------------------------------------------------------

    fn filters(&mut self, out: &mut Vec<FilterToken>) -> ParseResult<()> {
        self.operand(out)?;
        loop {
            self.skip_ws();
            let op = if self.eat_str("&&") || self.eat('&') {
                LogicalOp::And
            } else if self.eat_str("||") || self.eat('|') {
                LogicalOp::Or
            } else {
                return Ok(());
            };
            self.operand(out)?;
            out.push(FilterToken::Operator(op));
        }
    }

    fn operand(&mut self, out: &mut Vec<FilterToken>) -> ParseResult<()> {
        self.skip_ws();
        if self.eat('(') {
            self.or_expr(out)?;
            self.skip_ws();
            if !self.eat(')') {
                return Err(self.error("'&', '|' or ')'"));
            }
            Ok(())
        } else {
            self.condition(out)
        }
    }

    fn or_expr(&mut self, out: &mut Vec<FilterToken>) -> ParseResult<()> {
        self.and_expr(out)?;
        loop {
            self.skip_ws();
            if self.eat_str("||") || self.eat('|') {
                self.and_expr(out)?;
                out.push(FilterToken::Operator(LogicalOp::Or));
            } else {
                return Ok(());
            }
        }
    }

    fn and_expr(&mut self, out: &mut Vec<FilterToken>) -> ParseResult<()> {
        self.operand(out)?;
        loop {
            self.skip_ws();
            if self.eat_str("&&") || self.eat('&') {
                self.operand(out)?;
                out.push(FilterToken::Operator(LogicalOp::And));
            } else {
                return Ok(());
            }
        }
    }

    fn condition(&mut self, out: &mut Vec<FilterToken>) -> ParseResult<()> {
        let key = self.field_path("filter key")?;
        self.skip_ws();
        let comparator = self.comparator()?;
        self.skip_ws();
        let value_start = self.pos;
        let value = self.value()?;
        if !operands_compatible(comparator, &value) {
            let expected = if comparator == Comparator::Match {
                "regex or quoted pattern after '~'"
            } else {
                "'~' before a regex value"
            };
            return Err(self.error_at(value_start, expected));
        }
        out.push(FilterToken::Condition(Condition {
            key,
            comparator,
            value,
        }));
        Ok(())
    }

    fn comparator(&mut self) -> ParseResult<Comparator> {
        for (symbol, comparator) in COMPARATORS {
            if self.eat_str(symbol) {
                return Ok(comparator);
            }
        }
        Err(self.error("comparator (=, !=, <>, >, >=, <, <=, ~)"))
    }

    // ---------------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------------

    fn value(&mut self) -> ParseResult<Literal> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                self.quoted(quote).map(Literal::String)
            }
            Some('/') => self.regex(),
            _ => self.bare_value(),
        }
    }

    fn quoted(&mut self, quote: char) -> ParseResult<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => break,
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(self.error(format!("closing {}", quote)))
    }

    fn regex(&mut self) -> ParseResult<Literal> {
        self.bump();
        let mut pattern = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some('/') => pattern.push('/'),
                    Some(c) => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    None => return Err(self.error("closing '/' of the regex")),
                },
                Some('/') => break,
                Some(c) => pattern.push(c),
                None => return Err(self.error("closing '/' of the regex")),
            }
        }

        let flags_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.bump();
        }
        let flags = &self.src[flags_start..self.pos];
        if let Some(offset) = flags.find(|c: char| !REGEX_FLAGS.contains(c)) {
            return Err(self.error_at(flags_start + offset, "regex flag (g, i, m, s, u, y)"));
        }
        Ok(Literal::Regex {
            pattern,
            flags: flags.to_string(),
        })
    }

    fn bare_value(&mut self) -> ParseResult<Literal> {
        let start = self.pos;
        let mut templated = false;
        loop {
            if self.placeholder()? {
                templated = true;
                continue;
            }
            match self.peek() {
                Some(c) if !matches!(c, '&' | '|' | '(' | ')') && !c.is_whitespace() => {
                    self.bump();
                }
                _ => break,
            }
        }
        let raw = &self.src[start..self.pos];
        if raw.is_empty() {
            return Err(self.error("filter value"));
        }
        if templated {
            return Ok(Literal::Template(raw.to_string()));
        }
        Ok(bare_literal(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(key: &str, comparator: Comparator, value: Literal) -> FilterToken {
        FilterToken::condition(key, comparator, value)
    }

    fn num(n: f64) -> Literal {
        Literal::Number(n)
    }

    #[test]
    fn test_parse_path_only() {
        let q = parse_query("/users").unwrap();
        assert_eq!(q.path, "/users");
        assert!(q.collection.is_none());
        assert!(q.fields.is_empty());
        assert!(q.filters.is_empty());
    }

    #[test]
    fn test_parse_collection_prefix() {
        let q = parse_query("recipes:/api/users").unwrap();
        assert_eq!(q.collection.as_deref(), Some("recipes"));
        assert_eq!(q.path, "/api/users");
    }

    #[test]
    fn test_parse_requires_slash() {
        let err = parse_query("users{name}").unwrap_err();
        assert_eq!(err.position, 0);
        assert_eq!(err.expected, "'/'");
    }

    #[test]
    fn test_parse_projection() {
        let q = parse_query("/users{name,user.email, {{field}}}").unwrap();
        assert_eq!(
            q.fields,
            vec![
                "name".to_string(),
                "user.email".to_string(),
                "{{field}}".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_projection_leading_placeholder() {
        let q = parse_query("/recipes{{{field}},servings,titles.title}").unwrap();
        assert_eq!(q.fields[0], "{{field}}");
        assert_eq!(q.fields[2], "titles.title");
    }

    #[test]
    fn test_parse_unterminated_projection() {
        let err = parse_query("/users{name").unwrap_err();
        assert_eq!(err.position, 11);
        assert_eq!(err.expected, "',' or '}'");
        assert_eq!(err.found, None);
    }

    #[test]
    fn test_parse_bad_field_path() {
        assert!(parse_query("/users{a..b}").is_err());
        assert!(parse_query("/users{}").is_err());
        assert!(parse_query("/users{.a}").is_err());
    }

    #[test]
    fn test_parse_unterminated_placeholder() {
        let err = parse_query("/users{{{field}").unwrap_err();
        assert!(err.expected.contains("closing the placeholder"));
    }

    #[test]
    fn test_parse_empty_placeholder() {
        let err = parse_query("/users[limit={{}}]").unwrap_err();
        assert_eq!(err.position, 15);
        assert_eq!(err.expected, "placeholder name");
    }

    #[test]
    fn test_parse_custom_marker_everywhere() {
        let templates = TemplateEngine::with_marker(r"\$\{(\w+)\}").unwrap();
        let q = parse_query_with(
            "/r{${f},id}[sort=+${f}-id,limit=${n}]?(age>${min}&name='${who}')",
            &templates,
        )
        .unwrap();
        assert_eq!(q.fields, vec!["${f}".to_string(), "id".to_string()]);
        assert_eq!(
            q.sort,
            vec![SortSpec::ascending("${f}"), SortSpec::descending("id")]
        );
        assert_eq!(q.limit.as_deref(), Some("${n}"));
        assert_eq!(
            q.filters,
            vec![
                cond("age", Comparator::Gt, Literal::Template("${min}".into())),
                cond("name", Comparator::Eq, Literal::String("${who}".into())),
                FilterToken::and(),
            ]
        );
    }

    #[test]
    fn test_parse_custom_marker_ignores_braces() {
        let templates = TemplateEngine::with_marker(r"\$\{(\w+)\}").unwrap();
        assert!(parse_query_with("/r[limit={{n}}]", &templates).is_err());
        let q = parse_query_with("/r?a={{n}}", &templates).unwrap();
        assert_eq!(
            q.filters,
            vec![cond("a", Comparator::Eq, Literal::String("{{n}}".into()))]
        );
    }

    #[test]
    fn test_parse_sort_and_limit() {
        let q = parse_query("/users[sort=+signupDate-revenue,limit=5]").unwrap();
        assert_eq!(
            q.sort,
            vec![
                SortSpec::ascending("signupDate"),
                SortSpec::descending("revenue")
            ]
        );
        assert_eq!(q.limit.as_deref(), Some("5"));
    }

    #[test]
    fn test_parse_sort_first_term_unsigned() {
        let q = parse_query("/users[sort=name-age]").unwrap();
        assert_eq!(
            q.sort,
            vec![SortSpec::ascending("name"), SortSpec::descending("age")]
        );
    }

    #[test]
    fn test_parse_limit_only_and_negative() {
        let q = parse_query("/users[limit=-2]").unwrap();
        assert!(q.sort.is_empty());
        assert_eq!(q.limit.as_deref(), Some("-2"));
    }

    #[test]
    fn test_parse_limit_placeholder() {
        let q = parse_query("/users[sort=+{{field}},limit={{limit}}]").unwrap();
        assert_eq!(q.sort, vec![SortSpec::ascending("{{field}}")]);
        assert_eq!(q.limit.as_deref(), Some("{{limit}}"));
    }

    #[test]
    fn test_parse_bad_limit() {
        let err = parse_query("/users[limit=ten]").unwrap_err();
        assert_eq!(err.position, 13);
        assert_eq!(err.expected, "integer limit or placeholder");
    }

    #[test]
    fn test_parse_duplicate_option() {
        let err = parse_query("/users[limit=1,limit=2]").unwrap_err();
        assert_eq!(err.expected, "a single limit option");
    }

    #[test]
    fn test_parse_unknown_option() {
        let err = parse_query("/users[offset=3]").unwrap_err();
        assert_eq!(err.expected, "'sort=' or 'limit='");
    }

    #[test]
    fn test_parse_single_condition() {
        let q = parse_query("/users?age>=18").unwrap();
        assert_eq!(q.filters, vec![cond("age", Comparator::Gte, num(18.0))]);
    }

    #[test]
    fn test_parse_single_term_group_has_no_operator() {
        let q = parse_query("/users?(age>18)").unwrap();
        assert_eq!(q.filters, vec![cond("age", Comparator::Gt, num(18.0))]);
    }

    #[test]
    fn test_parse_and_group_postfix() {
        let q = parse_query("/r?(a=1&b=2)").unwrap();
        assert_eq!(
            q.filters,
            vec![
                cond("a", Comparator::Eq, num(1.0)),
                cond("b", Comparator::Eq, num(2.0)),
                FilterToken::and(),
            ]
        );
    }

    #[test]
    fn test_parse_and_binds_tighter_inside_group() {
        let q = parse_query("/r?(a=1|b=2&&c=3)").unwrap();
        assert_eq!(
            q.filters,
            vec![
                cond("a", Comparator::Eq, num(1.0)),
                cond("b", Comparator::Eq, num(2.0)),
                cond("c", Comparator::Eq, num(3.0)),
                FilterToken::and(),
                FilterToken::or(),
            ]
        );
    }

    #[test]
    fn test_parse_top_level_left_to_right() {
        let q = parse_query("/r?a=1|b=2&c=3").unwrap();
        assert_eq!(
            q.filters,
            vec![
                cond("a", Comparator::Eq, num(1.0)),
                cond("b", Comparator::Eq, num(2.0)),
                FilterToken::or(),
                cond("c", Comparator::Eq, num(3.0)),
                FilterToken::and(),
            ]
        );
    }

    #[test]
    fn test_parse_groups_joined() {
        let q =
            parse_query(r#"recipes:/users?(key=value|key1="value1")&(key2~/value2/gi)"#).unwrap();
        assert_eq!(
            q.filters,
            vec![
                cond("key", Comparator::Eq, Literal::String("value".into())),
                cond("key1", Comparator::Eq, Literal::String("value1".into())),
                FilterToken::or(),
                cond(
                    "key2",
                    Comparator::Match,
                    Literal::Regex {
                        pattern: "value2".into(),
                        flags: "gi".into()
                    }
                ),
                FilterToken::and(),
            ]
        );
    }

    #[test]
    fn test_parse_nested_groups() {
        let q = parse_query("/r?((a=1|b=2)&c=3)").unwrap();
        assert_eq!(
            q.filters,
            vec![
                cond("a", Comparator::Eq, num(1.0)),
                cond("b", Comparator::Eq, num(2.0)),
                FilterToken::or(),
                cond("c", Comparator::Eq, num(3.0)),
                FilterToken::and(),
            ]
        );
    }

    #[test]
    fn test_parse_all_comparators() {
        let cases = [
            ("a=1", Comparator::Eq),
            ("a!=1", Comparator::Neq),
            ("a<>1", Comparator::Neq),
            ("a>1", Comparator::Gt),
            ("a>=1", Comparator::Gte),
            ("a<1", Comparator::Lt),
            ("a<=1", Comparator::Lte),
        ];
        for (filter, expected) in cases {
            let q = parse_query(&format!("/r?{}", filter)).unwrap();
            match &q.filters[0] {
                FilterToken::Condition(c) => assert_eq!(c.comparator, expected, "{}", filter),
                other => panic!("expected condition, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_parse_unknown_comparator() {
        let err = parse_query("/r?a!1").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(err.expected.starts_with("comparator"));
    }

    #[test]
    fn test_parse_value_kinds() {
        let q = parse_query(
            r#"/r?(a=true&b=false&c=null&d='it\'s'&e=-1.5&f=active&g="x y")"#,
        )
        .unwrap();
        let values: Vec<&Literal> = q
            .filters
            .iter()
            .filter_map(|t| match t {
                FilterToken::Condition(c) => Some(&c.value),
                _ => None,
            })
            .collect();
        assert_eq!(
            values,
            vec![
                &Literal::Boolean(true),
                &Literal::Boolean(false),
                &Literal::Null,
                &Literal::String("it's".into()),
                &Literal::Number(-1.5),
                &Literal::String("active".into()),
                &Literal::String("x y".into()),
            ]
        );
    }

    #[test]
    fn test_parse_regex_escaped_slash() {
        let q = parse_query(r"/r?path~/^\/api\/v\d/").unwrap();
        match &q.filters[0] {
            FilterToken::Condition(c) => assert_eq!(
                c.value,
                Literal::Regex {
                    pattern: r"^/api/v\d".into(),
                    flags: String::new()
                }
            ),
            other => panic!("expected condition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_regex_bad_flag() {
        let err = parse_query("/r?a~/x/gq").unwrap_err();
        assert_eq!(err.position, 9);
        assert_eq!(err.found, Some('q'));
    }

    #[test]
    fn test_parse_regex_requires_match() {
        let err = parse_query("/r?a=/x/").unwrap_err();
        assert_eq!(err.position, 5);
        assert_eq!(err.expected, "'~' before a regex value");
    }

    #[test]
    fn test_parse_match_requires_pattern() {
        assert!(parse_query("/r?a~5").is_err());
        assert!(parse_query("/r?a~'^A'").is_ok());
    }

    #[test]
    fn test_parse_template_value() {
        let q = parse_query("/r?(age>{{min}})").unwrap();
        assert_eq!(
            q.filters,
            vec![cond(
                "age",
                Comparator::Gt,
                Literal::Template("{{min}}".into())
            )]
        );
    }

    #[test]
    fn test_parse_unterminated_group() {
        let err = parse_query("/r?(a=1&b=2").unwrap_err();
        assert_eq!(err.found, None);
        assert_eq!(err.expected, "'&', '|' or ')'");
    }

    #[test]
    fn test_parse_unterminated_string() {
        let err = parse_query("/r?a='abc").unwrap_err();
        assert_eq!(err.expected, "closing '");
    }

    #[test]
    fn test_parse_dangling_operator() {
        let err = parse_query("/r?a=1&").unwrap_err();
        assert_eq!(err.expected, "filter key");
    }

    #[test]
    fn test_parse_trailing_garbage() {
        let err = parse_query("/r?(a=1)(b=2)").unwrap_err();
        assert_eq!(err.position, 8);
        assert_eq!(err.expected, "end of query");
    }

    #[test]
    fn test_parse_full_query() {
        let q = parse_query(
            "/recipes{{{field}},servings,titles.title,missing}[sort=+{{field}},limit={{limit}}]?(servings~/6/|servings~/10/)&(missing=false)",
        )
        .unwrap();
        assert_eq!(q.fields.len(), 4);
        assert_eq!(q.sort.len(), 1);
        assert_eq!(q.filters.len(), 5);
        assert!(matches!(
            q.filters.last(),
            Some(FilterToken::Operator(LogicalOp::And))
        ));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("42").unwrap(), Literal::Number(42.0));
        assert_eq!(parse_literal(" Bob ").unwrap(), Literal::String("Bob".into()));
        assert_eq!(
            parse_literal("/^a/i").unwrap(),
            Literal::Regex {
                pattern: "^a".into(),
                flags: "i".into()
            }
        );
        assert!(parse_literal("two words").is_err());
    }

    #[test]
    fn test_parse_number_rejects_words() {
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("12abc"), None);
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
    }

    #[test]
    fn test_is_valid_path() {
        assert!(is_valid_path("user.name"));
        assert!(is_valid_path("items.0.id"));
        assert!(!is_valid_path(""));
        assert!(!is_valid_path("a."));
        assert!(!is_valid_path("a,b"));
    }
}
