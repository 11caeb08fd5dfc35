//! Forward-compatible round-tripping of content no known field claims.

use std::fmt::{self, Formatter};

use crate::xml::XmlStore;
use crate::{PickleResult, Pickler, Repr};

/// A value that can carry XML content belonging to it but not claimed by its
/// own known-field pickler.
///
/// The leftover store is written exactly once per decode, by [extensible];
/// schema authors never set it themselves. A decoded value holding leftovers
/// must not be pickled concurrently from multiple threads.
pub trait Extensible {
    fn extension(&self) -> Option<&XmlStore>;
    fn set_extension(&mut self, leftovers: XmlStore);
}

/// Captures whatever the wrapped pickler leaves unconsumed and attaches it
/// to the decoded value; pickling re-emits the attachment verbatim after the
/// known fields.
#[derive(Clone, Debug)]
pub struct MakeExtensible<P: Pickler> {
    known: P,
}

pub fn extensible<P>(known: P) -> MakeExtensible<P>
where
    P: Pickler,
    P::Value: Extensible,
{
    MakeExtensible { known }
}

impl<P> Pickler for MakeExtensible<P>
where
    P: Pickler,
    P::Value: Extensible,
{
    type Value = P::Value;

    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        let store = self.known.pickle(value, store);
        match value.extension() {
            Some(leftovers) => store.merge_leftovers(leftovers),
            None => store,
        }
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        self.known.unpickle(store).and_then(|mut v, rest| {
            let (captured, rest) = rest.drain();
            v.set_extension(captured);
            PickleResult::Success(v, rest)
        })
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}*", Repr(&self.known))
    }
}

/// Layers a second schema over the content preserved by [extensible].
///
/// Unpickling decodes the known fields, then runs the extension pickler
/// against precisely the captured leftover store — no re-parse of the whole
/// document. Pickling serializes the extension layer into an isolated store,
/// attaches it through the [Extensible] hook, and lets the known-field
/// pickler's leftover emission write it out.
#[derive(Clone, Debug)]
pub struct Extend<PA: Pickler, PB: Pickler> {
    known: PA,
    extension: PB,
}

pub fn extend<PA, PB>(known: PA, extension: PB) -> Extend<PA, PB>
where
    PA: Pickler,
    PA::Value: Extensible + Clone,
    PB: Pickler,
{
    Extend { known, extension }
}

impl<PA, PB> Pickler for Extend<PA, PB>
where
    PA: Pickler,
    PA::Value: Extensible + Clone,
    PB: Pickler,
{
    type Value = (PA::Value, PB::Value);

    fn pickle(&self, (known, ext): &Self::Value, store: XmlStore) -> XmlStore {
        let ext_store = self
            .extension
            .pickle(ext, XmlStore::with_scope(store.scope().clone()));
        let mut attached = known.clone();
        attached.set_extension(ext_store);
        self.known.pickle(&attached, store)
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        self.known.unpickle(store).and_then(|known, rest| {
            let captured = match known.extension() {
                Some(leftovers) => leftovers.clone(),
                None => XmlStore::with_scope(rest.scope().clone()),
            };
            match self.extension.unpickle(captured) {
                PickleResult::Success(ext, _) => PickleResult::Success((known, ext), rest),
                PickleResult::Failure(m, st) => PickleResult::Failure(m, st),
                PickleResult::Error(m, st) => PickleResult::Error(m, st),
            }
        })
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Repr(&self.known), Repr(&self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seq;
    use crate::xml::basic::text;
    use crate::xml::element::elem;
    use crate::xml::tree::XmlNode;

    #[derive(Clone, Debug, PartialEq)]
    struct Title {
        value: String,
        rest: Option<XmlStore>,
    }

    impl Extensible for Title {
        fn extension(&self) -> Option<&XmlStore> {
            self.rest.as_ref()
        }

        fn set_extension(&mut self, leftovers: XmlStore) {
            self.rest = Some(leftovers);
        }
    }

    fn title_p() -> impl Pickler<Value = Title> {
        extensible(crate::core::adapt(
            elem("title", text()),
            |value| Title { value, rest: None },
            |t: &Title| t.value.clone(),
        ))
    }

    fn entry_with_unknowns() -> XmlStore {
        let mut store = XmlStore::empty();
        store = elem("title", text()).pickle(&String::from("hello"), store);
        store = elem("future", text()).pickle(&String::from("one"), store);
        store = elem("beyond", text()).pickle(&String::from("two"), store);
        store
    }

    #[test]
    fn unknown_siblings_survive_a_round_trip_in_order() {
        let decoded = match title_p().unpickle(entry_with_unknowns()) {
            PickleResult::Success(v, rest) => {
                assert!(rest.is_empty());
                v
            }
            other => panic!("expected success, got {other:?}"),
        };
        assert_eq!(decoded.value, "hello");

        let reencoded = title_p().pickle(&decoded, XmlStore::empty());
        let names: Vec<_> = reencoded
            .nodes()
            .iter()
            .map(|n| match n {
                XmlNode::Element(e) => e.name.local.clone(),
                XmlNode::Text(t) => t.clone(),
            })
            .collect();
        assert_eq!(names, ["title", "future", "beyond"]);
    }

    #[test]
    fn second_schema_decodes_from_captured_content() {
        let layered = extend(title_p(), seq(elem("future", text()), elem("beyond", text())));
        match layered.unpickle(entry_with_unknowns()) {
            PickleResult::Success((known, (one, two)), _) => {
                assert_eq!(known.value, "hello");
                assert_eq!(one, "one");
                assert_eq!(two, "two");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn extension_layer_is_emitted_through_the_hook() {
        let layered = extend(title_p(), elem("future", text()));
        let value = (
            Title {
                value: String::from("hi"),
                rest: None,
            },
            String::from("one"),
        );
        let out = layered.pickle(&value, XmlStore::empty());
        assert_eq!(out.nodes().len(), 2);

        match layered.unpickle(out) {
            PickleResult::Success((known, ext), _) => {
                assert_eq!(known.value, "hi");
                assert_eq!(ext, "one");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}
