//! The structural combinators, independent of any one node shape.
//! - Each has a type, a construction site and a [Pickler] implementation.
//!
//! Composition combinators ([seq], [repeat], [opt], [alternative]) are the
//! only places that interpret the failure/error distinction; everything else
//! passes results through unchanged.

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;

use derive_where::derive_where;

use crate::xml::XmlStore;
use crate::{PickleResult, Pickler, Repr};

/// Applies the first pickler, then the second, pairing their values.
/// Unpickling short-circuits on any non-success from the first.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub struct seq<PA: Pickler, PB: Pickler>(pub PA, pub PB);

impl<PA: Pickler, PB: Pickler> Pickler for seq<PA, PB> {
    type Value = (PA::Value, PB::Value);

    #[inline]
    fn pickle(&self, (a, b): &Self::Value, store: XmlStore) -> XmlStore {
        let store = self.0.pickle(a, store);
        self.1.pickle(b, store)
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        self.0
            .unpickle(store)
            .and_then(|a, rest| self.1.unpickle(rest).map(|b| (a, b)))
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Repr(&self.0), Repr(&self.1))
    }
}

/// Absence-tolerant wrapper: unpickling never itself fails.
///
/// A [Failure](PickleResult::Failure) from the inner pickler becomes
/// `Success(None)` with the store *not* advanced; an
/// [Error](PickleResult::Error) propagates unchanged. Pickling emits nothing
/// for `None`.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub struct opt<PA: Pickler>(pub PA);

impl<PA: Pickler> Pickler for opt<PA> {
    type Value = Option<PA::Value>;

    #[inline]
    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        match value {
            Some(v) => self.0.pickle(v, store),
            None => store,
        }
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        let saved = store.clone();
        match self.0.unpickle(store) {
            PickleResult::Success(v, rest) => PickleResult::Success(Some(v), rest),
            PickleResult::Failure(_, _) => PickleResult::Success(None, saved),
            PickleResult::Error(m, st) => PickleResult::Error(m, st),
        }
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}?", Repr(&self.0))
    }
}

/// Greedy repetition in document order.
///
/// Unpickling accumulates until the first [Failure](PickleResult::Failure),
/// which terminates the repetition successfully with the store unadvanced
/// past the last match; an [Error](PickleResult::Error) from any iteration
/// aborts the whole repetition.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub struct repeat<PA: Pickler>(pub PA);

impl<PA: Pickler> Pickler for repeat<PA> {
    type Value = Vec<PA::Value>;

    #[inline]
    fn pickle(&self, value: &Self::Value, mut store: XmlStore) -> XmlStore {
        for v in value {
            store = self.0.pickle(v, store);
        }
        store
    }

    #[inline]
    fn unpickle(&self, mut store: XmlStore) -> PickleResult<Self::Value> {
        let mut acc = Vec::new();
        loop {
            let saved = store.clone();
            match self.0.unpickle(store) {
                PickleResult::Success(v, rest) => {
                    acc.push(v);
                    store = rest;
                }
                PickleResult::Failure(_, _) => return PickleResult::Success(acc, saved),
                PickleResult::Error(m, st) => return PickleResult::Error(m, st),
            }
        }
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}...", Repr(&self.0))
    }
}

/// Pickles always via the first pickler; unpickling tries it first and falls
/// back to the second only on [Failure](PickleResult::Failure), never on
/// [Error](PickleResult::Error).
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub struct alternative<PA, PB>(pub PA, pub PB)
where
    PA: Pickler,
    PB: Pickler<Value = PA::Value>;

impl<PA, PB> Pickler for alternative<PA, PB>
where
    PA: Pickler,
    PB: Pickler<Value = PA::Value>,
{
    type Value = PA::Value;

    #[inline]
    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        self.0.pickle(value, store)
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        let saved = store.clone();
        self.0.unpickle(store).or_else(|| self.1.unpickle(saved))
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({} | {})", Repr(&self.0), Repr(&self.1))
    }
}

/// Escalates [Failure](PickleResult::Failure) to [Error](PickleResult::Error).
///
/// Applied once a structural choice has been confirmed correct (an element
/// tag matched), so a misparse inside it cannot be silently masked by an
/// unrelated alternative elsewhere in the grammar. Pickling is unchanged.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub struct commit<PA: Pickler>(pub PA);

impl<PA: Pickler> Pickler for commit<PA> {
    type Value = PA::Value;

    #[inline]
    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        self.0.pickle(value, store)
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        match self.0.unpickle(store) {
            PickleResult::Failure(m, st) => PickleResult::Error(m, st),
            other => other,
        }
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.repr(f)
    }
}

/// Pins the parsed value to `expected`: unpickling fails on a mismatch, and
/// pickling emits `expected` regardless of the value it is handed.
#[allow(non_camel_case_types)]
#[derive(Clone, Debug)]
pub struct constant<PA: Pickler>(pub PA, pub PA::Value)
where
    PA::Value: Clone + PartialEq + Debug;

impl<PA: Pickler> Pickler for constant<PA>
where
    PA::Value: Clone + PartialEq + Debug,
{
    type Value = PA::Value;

    #[inline]
    fn pickle(&self, _value: &Self::Value, store: XmlStore) -> XmlStore {
        self.0.pickle(&self.1, store)
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        self.0.unpickle(store).and_then(|v, rest| {
            if v == self.1 {
                PickleResult::Success(v, rest)
            } else {
                PickleResult::Failure(format!("expected {:?}, found {:?}", self.1, v), rest)
            }
        })
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.1)
    }
}

/// Maps a pickler for one type to and from another through total conversion
/// functions.
pub fn adapt<A, PB, FD, FE>(pb: PB, decode: FD, encode: FE) -> Adapt<A, PB, FD, FE>
where
    PB: Pickler,
    FD: Fn(PB::Value) -> A,
    FE: Fn(&A) -> PB::Value,
{
    Adapt {
        pb,
        decode,
        encode,
        _marker: PhantomData,
    }
}

#[derive_where(Clone; PB: Clone, FD: Clone, FE: Clone)]
#[derive_where(Debug; PB: Debug, FD: Debug, FE: Debug)]
pub struct Adapt<A, PB, FD, FE>
where
    PB: Pickler,
    FD: Fn(PB::Value) -> A,
    FE: Fn(&A) -> PB::Value,
{
    pb: PB,
    decode: FD,
    encode: FE,
    _marker: PhantomData<A>,
}

impl<A, PB, FD, FE> Pickler for Adapt<A, PB, FD, FE>
where
    PB: Pickler,
    FD: Fn(PB::Value) -> A,
    FE: Fn(&A) -> PB::Value,
{
    type Value = A;

    #[inline]
    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        let inner = (self.encode)(value);
        self.pb.pickle(&inner, store)
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        self.pb.unpickle(store).map(|v| (self.decode)(v))
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.pb.repr(f)
    }
}

/// Like [adapt], but the decode direction may reject the parsed value,
/// yielding a [Failure](PickleResult::Failure) with the returned message.
pub fn filter<A, PB, FD, FE>(pb: PB, decode: FD, encode: FE) -> Filter<A, PB, FD, FE>
where
    PB: Pickler,
    FD: Fn(PB::Value) -> Result<A, String>,
    FE: Fn(&A) -> PB::Value,
{
    Filter {
        pb,
        decode,
        encode,
        _marker: PhantomData,
    }
}

#[derive_where(Clone; PB: Clone, FD: Clone, FE: Clone)]
#[derive_where(Debug; PB: Debug, FD: Debug, FE: Debug)]
pub struct Filter<A, PB, FD, FE>
where
    PB: Pickler,
    FD: Fn(PB::Value) -> Result<A, String>,
    FE: Fn(&A) -> PB::Value,
{
    pb: PB,
    decode: FD,
    encode: FE,
    _marker: PhantomData<A>,
}

impl<A, PB, FD, FE> Pickler for Filter<A, PB, FD, FE>
where
    PB: Pickler,
    FD: Fn(PB::Value) -> Result<A, String>,
    FE: Fn(&A) -> PB::Value,
{
    type Value = A;

    #[inline]
    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        let inner = (self.encode)(value);
        self.pb.pickle(&inner, store)
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        self.pb
            .unpickle(store)
            .and_then(|v, rest| match (self.decode)(v) {
                Ok(a) => PickleResult::Success(a, rest),
                Err(m) => PickleResult::Failure(m, rest),
            })
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.pb.repr(f)
    }
}

/// Deferred construction for mutually recursive schema graphs.
///
/// The factory runs only when pickling or unpickling actually happens, never
/// at construction time, so a feed schema can reference an entry schema that
/// embeds the feed schema again.
pub fn lazy<P, F>(factory: F) -> Lazy<P, F>
where
    P: Pickler,
    F: Fn() -> P,
{
    Lazy {
        factory,
        _marker: PhantomData,
    }
}

#[derive_where(Clone; F: Clone)]
#[derive_where(Debug; F: Debug)]
pub struct Lazy<P, F>
where
    P: Pickler,
    F: Fn() -> P,
{
    factory: F,
    _marker: PhantomData<P>,
}

impl<P, F> Pickler for Lazy<P, F>
where
    P: Pickler,
    F: Fn() -> P,
{
    type Value = P::Value;

    #[inline]
    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        (self.factory)().pickle(value, store)
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        (self.factory)().unpickle(store)
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "...")
    }
}
