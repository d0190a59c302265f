//! Image ordering input.
//!
//! After discovery the operator sees a numbered list and may type a
//! permutation such as `3,1,2`. Empty input keeps discovery order. The parse
//! is a pure predicate so the prompt layer can re-ask on error without any
//! state of its own.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("{value} is out of range (1-{max})")]
    OutOfRange { value: usize, max: usize },
    #[error("{0} appears more than once")]
    Duplicate(usize),
    #[error("expected all {expected} images, got {actual}")]
    Incomplete { expected: usize, actual: usize },
}

/// Parse an ordering answer for `count` images into zero-based indices.
///
/// Accepts `""` (identity) or a comma-separated permutation of `1..=count`.
/// Whitespace around entries is ignored.
pub fn parse_order(input: &str, count: usize) -> Result<Vec<usize>, OrderError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok((0..count).collect());
    }

    let mut seen = vec![false; count];
    let mut order = Vec::with_capacity(count);
    for raw in input.split(',') {
        let raw = raw.trim();
        let value: usize = raw
            .parse()
            .map_err(|_| OrderError::NotANumber(raw.to_string()))?;
        if value == 0 || value > count {
            return Err(OrderError::OutOfRange { value, max: count });
        }
        if std::mem::replace(&mut seen[value - 1], true) {
            return Err(OrderError::Duplicate(value));
        }
        order.push(value - 1);
    }

    if order.len() != count {
        return Err(OrderError::Incomplete {
            expected: count,
            actual: order.len(),
        });
    }
    Ok(order)
}

/// Reorder `items` by zero-based indices from [`parse_order`].
pub fn apply_order<T: Clone>(items: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| items[i].clone()).collect()
}
