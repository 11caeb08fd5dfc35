//! A bidirectional XML data-binding combinator library.
//!
//! A [Pickler] is a single declarative description of how a typed value maps
//! to an XML fragment, used both to serialize the value and to parse it back,
//! so the two directions stay in sync by construction. Picklers are plain
//! immutable values: build composites from the combinators in [core],
//! [derived] and [xml], share them freely, and run them against an
//! [XmlStore](xml::XmlStore) at the boundary.
#![warn(clippy::style)]
#![warn(clippy::perf)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]

use std::fmt::{self, Display, Formatter};

pub mod core;
pub mod derived;
pub mod macros;
pub mod xml;

use xml::XmlStore;

/// The outcome of an [unpickle](Pickler::unpickle) step.
///
/// [Failure](PickleResult::Failure) is recoverable: an enclosing alternative,
/// `opt` or `repeat` may absorb it. [Error](PickleResult::Error) is fatal and
/// propagates through every combinator without a fallback.
#[derive(PartialEq, Debug, Clone)]
pub enum PickleResult<A> {
    /// The decoded value and the store remaining after consumption.
    Success(A, XmlStore),
    /// A recoverable mismatch, with the store at the point of failure.
    Failure(String, XmlStore),
    /// A fatal misparse, with the store at the point of failure.
    Error(String, XmlStore),
}

impl<A> PickleResult<A> {
    /// Chains a computation onto a successful decode; non-success results
    /// pass through unchanged.
    pub fn and_then<B>(
        self,
        f: impl FnOnce(A, XmlStore) -> PickleResult<B>,
    ) -> PickleResult<B> {
        match self {
            PickleResult::Success(v, rest) => f(v, rest),
            PickleResult::Failure(m, st) => PickleResult::Failure(m, st),
            PickleResult::Error(m, st) => PickleResult::Error(m, st),
        }
    }

    /// Substitutes an alternative outcome for a [Failure](PickleResult::Failure).
    ///
    /// [Success](PickleResult::Success) and [Error](PickleResult::Error) are
    /// returned unchanged: this is the single rule that makes `Error`
    /// non-recoverable.
    pub fn or_else(self, f: impl FnOnce() -> PickleResult<A>) -> PickleResult<A> {
        match self {
            PickleResult::Failure(_, _) => f(),
            other => other,
        }
    }

    /// Transforms the decoded value, leaving the store and any non-success
    /// outcome untouched.
    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> PickleResult<B> {
        match self {
            PickleResult::Success(v, rest) => PickleResult::Success(f(v), rest),
            PickleResult::Failure(m, st) => PickleResult::Failure(m, st),
            PickleResult::Error(m, st) => PickleResult::Error(m, st),
        }
    }

    /// Collapses into a regular rust [`Result`], erasing the
    /// failure/error distinction (kept on [PickleError::recoverable]).
    pub fn to_result(self) -> Result<(A, XmlStore), PickleError> {
        match self {
            PickleResult::Success(v, rest) => Ok((v, rest)),
            PickleResult::Failure(message, store) => Err(PickleError {
                message,
                recoverable: true,
                store,
            }),
            PickleResult::Error(message, store) => Err(PickleError {
                message,
                recoverable: false,
                store,
            }),
        }
    }
}

/// A terminal unpickling failure surfaced through [PickleResult::to_result],
/// carrying the store snapshot at the failure point for diagnostics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}; remaining input: {store}")]
pub struct PickleError {
    pub message: String,
    pub recoverable: bool,
    pub store: XmlStore,
}

/// The core trait for bidirectional XML codecs.
///
/// A pickler is a stateless, reusable description of the mapping for one
/// value type. [pickle](Pickler::pickle) is total given well-typed input;
/// [unpickle](Pickler::unpickle) consumes a prefix of its store and reports
/// through the three-way [PickleResult].
pub trait Pickler {
    /// The value type this pickler binds.
    type Value;

    /// Serializes `value` into `store`, returning the extended store.
    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore;

    /// Parses a value out of `store`, consuming the prefix it matched.
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value>;

    /// Produces a representation of the pickler for diagnostics & error messages.
    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result;
}

impl<P: Pickler + ?Sized> Pickler for &P {
    type Value = P::Value;

    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        (**self).pickle(value, store)
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        (**self).unpickle(store)
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        (**self).repr(f)
    }
}

impl<P: Pickler + ?Sized> Pickler for Box<P> {
    type Value = P::Value;

    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        (**self).pickle(value, store)
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        (**self).unpickle(store)
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        (**self).repr(f)
    }
}

/// A simple wrapper to allow the [Pickler::repr] function to implement [Display]
pub struct Repr<T>(pub T);

impl<P: Pickler> Display for Repr<&P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.repr(f)
    }
}
