//! Postfix filter streams compiled to record predicates.
//!
//! Each condition is lowered once into a [`Check`] (path split, regex built);
//! evaluation walks the lowered program with a boolean stack. Nothing is
//! generated or interpreted as source text at runtime.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::ast::{postfix, Comparator, Condition, FilterToken, LogicalOp, Literal};
use crate::error::{Error, Result};

use super::value::{get_path, loose_cmp, loose_eq, match_text, split_path};

/// A compiled filter.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

enum Test {
    Compare {
        comparator: Comparator,
        value: Literal,
    },
    Match(Regex),
}

struct Check {
    path: Vec<String>,
    test: Test,
}

impl Check {
    fn eval(&self, record: &Value) -> bool {
        let found = get_path(record, &self.path);
        match &self.test {
            Test::Compare { comparator, value } => compare(*comparator, found, value),
            // A missing value never matches, whatever the pattern.
            Test::Match(re) => found.is_some_and(|v| re.is_match(&match_text(v))),
        }
    }
}

enum Step {
    Check(Check),
    Combine(LogicalOp),
}

/// Compile a postfix filter stream.
///
/// Malformed streams, unsubstituted templates and invalid regexes are all
/// reported here rather than while filtering.
pub fn compile_predicate(tokens: &[FilterToken]) -> Result<Predicate> {
    let depth = postfix::check(tokens)?;
    let program = tokens
        .iter()
        .enumerate()
        .map(|(index, token)| lower(index, token))
        .collect::<Result<Vec<_>>>()?;
    Ok(Arc::new(move |record: &Value| {
        evaluate(&program, depth, record)
    }))
}

fn lower(index: usize, token: &FilterToken) -> Result<Step> {
    match token {
        FilterToken::Operator(op) => Ok(Step::Combine(*op)),
        FilterToken::Condition(condition) => Ok(Step::Check(Check {
            path: split_path(&condition.key),
            test: lower_test(index, condition)?,
        })),
    }
}

fn lower_test(index: usize, condition: &Condition) -> Result<Test> {
    match (condition.comparator, &condition.value) {
        (_, Literal::Template(raw)) => Err(Error::InvalidSubstitution {
            position: "filter value",
            value: raw.clone(),
        }),
        (Comparator::Match, Literal::Regex { pattern, flags }) => {
            build_regex(pattern, flags).map(Test::Match)
        }
        (Comparator::Match, Literal::String(pattern)) => build_regex(pattern, "").map(Test::Match),
        (Comparator::Match, _) => Err(Error::MalformedFilterExpression {
            index,
            reason: format!("'~' on {:?} needs a regex or string pattern", condition.key),
        }),
        (_, Literal::Regex { .. }) => Err(Error::MalformedFilterExpression {
            index,
            reason: format!("regex value on {:?} needs '~'", condition.key),
        }),
        (comparator, value) => Ok(Test::Compare {
            comparator,
            value: value.clone(),
        }),
    }
}

/// Build a regex honoring the `i`, `m` and `s` flags. `g`, `u` and `y` have
/// no effect on a single match test.
pub fn build_regex(pattern: &str, flags: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|source| Error::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })
}

fn compare(comparator: Comparator, found: Option<&Value>, value: &Literal) -> bool {
    use std::cmp::Ordering::*;

    match comparator {
        Comparator::Eq => loose_eq(found, value),
        Comparator::Neq => !loose_eq(found, value),
        Comparator::Gt => matches!(loose_cmp(found, value), Some(Greater)),
        Comparator::Gte => matches!(loose_cmp(found, value), Some(Greater | Equal)),
        Comparator::Lt => matches!(loose_cmp(found, value), Some(Less)),
        Comparator::Lte => matches!(loose_cmp(found, value), Some(Less | Equal)),
        // Lowered to Test::Match.
        Comparator::Match => false,
    }
}

fn evaluate(program: &[Step], depth: usize, record: &Value) -> bool {
    let mut stack: Vec<bool> = Vec::with_capacity(depth);
    for step in program {
        match step {
            Step::Check(check) => stack.push(check.eval(record)),
            Step::Combine(op) => {
                let right = stack.pop();
                let left = stack.pop();
                match (left, right) {
                    (Some(left), Some(right)) => stack.push(op.apply(left, right)),
                    (None, Some(only)) => stack.push(only),
                    _ => return false,
                }
            }
        }
    }
    stack.pop().unwrap_or(false)
}
