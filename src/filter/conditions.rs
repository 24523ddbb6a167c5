// src/filter/conditions.rs

//! Pure per-condition predicates.
//!
//! Each predicate is total over `(input, values)`: a condition that needs a
//! value that is not there (an empty list for `<`, a single bound for
//! `between`) is simply not satisfied.

use std::cmp::Ordering;

use crate::filter::clause::{Condition, Operand};

/// Dispatch `condition` to its predicate.
pub fn check(condition: Condition, input: &Operand, values: &[Operand]) -> bool {
    match condition {
        Condition::LessThan => less_than(input, values),
        Condition::LessThanEqual => less_than_equal(input, values),
        Condition::GreaterThan => greater_than(input, values),
        Condition::GreaterThanEqual => greater_than_equal(input, values),
        Condition::Equal => equal(input, values),
        Condition::NotEqual => not_equal(input, values),
        Condition::Between => between(input, values),
        Condition::In => in_values(input, values),
        Condition::NotIn => not_in(input, values),
        Condition::Contains => contains(input, values),
        Condition::SubsetOf => subset_of(input, values),
        Condition::SupersetOf => superset_of(input, values),
    }
}

fn first_ordering(input: &Operand, values: &[Operand]) -> Option<Ordering> {
    input.compare(values.first()?)
}

/// `input < values[0]`
pub fn less_than(input: &Operand, values: &[Operand]) -> bool {
    first_ordering(input, values) == Some(Ordering::Less)
}

/// `input <= values[0]`
pub fn less_than_equal(input: &Operand, values: &[Operand]) -> bool {
    matches!(
        first_ordering(input, values),
        Some(Ordering::Less | Ordering::Equal)
    )
}

/// `input > values[0]`
pub fn greater_than(input: &Operand, values: &[Operand]) -> bool {
    first_ordering(input, values) == Some(Ordering::Greater)
}

/// `input >= values[0]`
pub fn greater_than_equal(input: &Operand, values: &[Operand]) -> bool {
    matches!(
        first_ordering(input, values),
        Some(Ordering::Greater | Ordering::Equal)
    )
}

/// `input == values[0]`
pub fn equal(input: &Operand, values: &[Operand]) -> bool {
    values.first().is_some_and(|v| input.matches(v))
}

/// `input != values[0]`; an empty list is not satisfied either.
pub fn not_equal(input: &Operand, values: &[Operand]) -> bool {
    values.first().is_some_and(|v| !input.matches(v))
}

/// `values[0] <= input <= values[1]`
pub fn between(input: &Operand, values: &[Operand]) -> bool {
    let (Some(low), Some(high)) = (values.first(), values.get(1)) else {
        return false;
    };
    matches!(
        input.compare(low),
        Some(Ordering::Greater | Ordering::Equal)
    ) && matches!(input.compare(high), Some(Ordering::Less | Ordering::Equal))
}

/// True if `input` equals a candidate, or is a member of a candidate that is
/// itself a collection.
pub fn in_values(input: &Operand, values: &[Operand]) -> bool {
    values.iter().any(|v| input.matches(v) || v.holds(input))
}

/// Negation of [`in_values`].
pub fn not_in(input: &Operand, values: &[Operand]) -> bool {
    !in_values(input, values)
}

/// True if `input` (a list or a string) holds any of the candidates.
pub fn contains(input: &Operand, values: &[Operand]) -> bool {
    values.iter().any(|v| input.holds(v))
}

/// Every element of `input` matches one of the candidates.
pub fn subset_of(input: &Operand, values: &[Operand]) -> bool {
    !values.is_empty()
        && input
            .elements()
            .iter()
            .all(|item| values.iter().any(|v| item.matches(v)))
}

/// Every candidate matches an element of `input`.
pub fn superset_of(input: &Operand, values: &[Operand]) -> bool {
    let items = input.elements();
    !values.is_empty() && values.iter().all(|v| items.iter().any(|item| item.matches(v)))
}
