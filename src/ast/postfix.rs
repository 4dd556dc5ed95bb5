//! Helpers for postfix (RPN) filter streams.
//!
//! A stream is well formed when a stack machine pushing one value per
//! condition and popping two / pushing one per operator ends with exactly one
//! value. An operator that finds a single value on the stack leaves it in
//! place; hand-built streams rely on that, the parser never emits it.

use crate::error::{Error, Result};

use super::types::{Condition, FilterToken, LogicalOp};

fn malformed(index: usize, reason: impl Into<String>) -> Error {
    Error::MalformedFilterExpression {
        index,
        reason: reason.into(),
    }
}

/// Verify that `tokens` reduces to exactly one value.
///
/// Returns the deepest stack the stream reaches, which callers use to size
/// their evaluation stacks.
pub fn check(tokens: &[FilterToken]) -> Result<usize> {
    if tokens.is_empty() {
        return Err(malformed(0, "empty filter expression"));
    }

    let mut depth = 0usize;
    let mut deepest = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        match token {
            FilterToken::Condition(_) => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            FilterToken::Operator(op) => match depth {
                0 => {
                    return Err(malformed(
                        index,
                        format!("'{}' has no operands", op.symbol()),
                    ))
                }
                1 => {}
                _ => depth -= 1,
            },
        }
    }

    if depth != 1 {
        return Err(malformed(
            tokens.len(),
            format!("expression leaves {} values on the stack", depth),
        ));
    }
    Ok(deepest)
}

/// Reduce a postfix stream bottom-up: `leaf` lowers each condition,
/// `combine` joins the two operands of each operator.
pub fn fold<T>(
    tokens: &[FilterToken],
    mut leaf: impl FnMut(&Condition) -> Result<T>,
    mut combine: impl FnMut(LogicalOp, T, T) -> T,
) -> Result<T> {
    let deepest = check(tokens)?;
    let mut stack: Vec<T> = Vec::with_capacity(deepest);

    for (index, token) in tokens.iter().enumerate() {
        match token {
            FilterToken::Condition(condition) => stack.push(leaf(condition)?),
            FilterToken::Operator(op) => {
                let right = stack.pop();
                let left = stack.pop();
                match (left, right) {
                    (Some(left), Some(right)) => stack.push(combine(*op, left, right)),
                    (None, Some(only)) => stack.push(only),
                    _ => return Err(malformed(index, "operator with no operands")),
                }
            }
        }
    }

    stack
        .pop()
        .ok_or_else(|| malformed(tokens.len(), "empty filter expression"))
}
