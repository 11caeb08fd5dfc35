//! [Pickler]s derived by function from the [core](crate::core) combinators.

use crate::core::{adapt, opt};
use crate::Pickler;

/// Substitutes `fallback` when the wrapped pickler finds nothing; pickling
/// always emits the given value.
#[inline]
pub fn default<PA>(
    pa: PA,
    fallback: PA::Value,
) -> impl Pickler<Value = PA::Value>
where
    PA: Pickler,
    PA::Value: Clone,
{
    adapt(
        opt(pa),
        move |found| found.unwrap_or_else(|| fallback.clone()),
        |v| Some(v.clone()),
    )
}

/// Collapses presence/absence of a successful parse into a boolean,
/// discarding the parsed value. Pickling `true` runs the wrapped pickler on
/// `()`, `false` emits nothing.
#[inline]
pub fn marker<PA>(pa: PA) -> impl Pickler<Value = bool>
where
    PA: Pickler<Value = ()>,
{
    adapt(opt(pa), |found| found.is_some(), |b| b.then_some(()))
}
