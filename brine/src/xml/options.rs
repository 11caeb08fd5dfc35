//! Parsing a fixed set of children out of order, and predicate-directed
//! selection of one child among many.

use std::fmt::{self, Formatter};

use crate::xml::tree::XmlNode;
use crate::xml::{AccessMode, XmlStore};
use crate::{PickleResult, Pickler, Repr};

/// Order-independent matching of a fixed set of children.
///
/// Unpickling switches the store to random access for the duration of the
/// wrapped pattern, so each element accept searches the remaining sequence
/// instead of only the head, then restores the linear view on the resulting
/// store regardless of outcome. Nodes no sub-pattern claimed stay in the
/// store, in their original relative order. Pickling is unaffected: output
/// always follows the order the sub-picklers run in.
#[derive(Clone, Debug)]
pub struct Interleaved<P: Pickler> {
    pattern: P,
}

pub fn interleaved<P: Pickler>(pattern: P) -> Interleaved<P> {
    Interleaved { pattern }
}

impl<P: Pickler> Pickler for Interleaved<P> {
    type Value = P::Value;

    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        self.pattern.pickle(value, store)
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        match self.pattern.unpickle(store.set_mode(AccessMode::Random)) {
            PickleResult::Success(v, rest) => {
                PickleResult::Success(v, rest.set_mode(AccessMode::Linear))
            }
            PickleResult::Failure(m, st) => {
                PickleResult::Failure(m, st.set_mode(AccessMode::Linear))
            }
            PickleResult::Error(m, st) => {
                PickleResult::Error(m, st.set_mode(AccessMode::Linear))
            }
        }
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "interleaved({})", Repr(&self.pattern))
    }
}

/// Selects the first element, in document order, on which the predicate
/// pickler parses successfully; the payload pickler then runs against that
/// element in isolation.
///
/// Predicates are ordinary picklers (e.g. "has attribute rel = enclosure").
/// Multiple matching siblings are not disambiguated further: first found
/// wins. On no match the diagnostic of the last attempted element is
/// reported, if any element was attempted at all. Pickling simply runs the
/// payload and appends its output.
#[derive(Clone, Debug)]
pub struct When<PC: Pickler, P: Pickler> {
    predicate: PC,
    payload: P,
}

pub fn when<PC: Pickler, P: Pickler>(predicate: PC, payload: P) -> When<PC, P> {
    When { predicate, payload }
}

impl<PC: Pickler, P: Pickler> Pickler for When<PC, P> {
    type Value = P::Value;

    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        self.payload.pickle(value, store)
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        let mut matched = None;
        let mut last_diag = None;
        for (idx, node) in store.nodes().iter().enumerate() {
            let XmlNode::Element(e) = node else { continue };
            let probe = XmlStore::of_element(e.clone(), store.scope().clone());
            match self.predicate.unpickle(probe) {
                PickleResult::Success(_, _) => {
                    matched = Some(idx);
                    break;
                }
                PickleResult::Failure(m, _) => last_diag = Some(m),
                PickleResult::Error(m, st) => return PickleResult::Error(m, st),
            }
        }
        match matched {
            Some(idx) => {
                let (target, rest) = store.take_node(idx);
                match self.payload.unpickle(target) {
                    PickleResult::Success(v, _) => PickleResult::Success(v, rest),
                    PickleResult::Failure(m, st) => PickleResult::Failure(m, st),
                    PickleResult::Error(m, st) => PickleResult::Error(m, st),
                }
            }
            None => match last_diag {
                Some(m) => PickleResult::Failure(m, store),
                None => PickleResult::Failure(String::from("no matching element"), store),
            },
        }
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "when({}, {})", Repr(&self.predicate), Repr(&self.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{constant, seq};
    use crate::macros::seqs;
    use crate::xml::basic::text;
    use crate::xml::element::{attr, elem, element};

    type Abc = (String, (String, String));

    fn abc() -> impl Pickler<Value = Abc> {
        interleaved(seqs!(
            elem("a", text()),
            elem("b", text()),
            elem("c", text())
        ))
    }

    fn abc_value() -> Abc {
        (
            String::from("1"),
            (String::from("2"), String::from("3")),
        )
    }

    fn store_in_order(order: &str) -> XmlStore {
        let mut store = XmlStore::empty();
        for name in order.chars() {
            let content = match name {
                'a' => "1",
                'b' => "2",
                _ => "3",
            };
            store = match name {
                'a' => elem("a", text()).pickle(&String::from(content), store),
                'b' => elem("b", text()).pickle(&String::from(content), store),
                _ => elem("c", text()).pickle(&String::from(content), store),
            };
        }
        store
    }

    #[test]
    fn interleaved_accepts_every_ordering() {
        for order in ["abc", "acb", "bac", "bca", "cab", "cba"] {
            match abc().unpickle(store_in_order(order)) {
                PickleResult::Success(v, rest) => {
                    assert_eq!(v, abc_value(), "order {order}");
                    assert!(rest.is_empty());
                    assert_eq!(rest.mode(), AccessMode::Linear);
                }
                other => panic!("order {order}: expected success, got {other:?}"),
            }
        }
    }

    #[test]
    fn sequential_form_rejects_misordering() {
        let strict = seqs!(
            elem("a", text()),
            elem("b", text()),
            elem("c", text())
        );
        assert!(matches!(
            strict.unpickle(store_in_order("abc")),
            PickleResult::Success(_, _)
        ));
        assert!(matches!(
            strict.unpickle(store_in_order("bca")),
            PickleResult::Failure(_, _)
        ));
    }

    #[test]
    fn interleaved_leaves_unclaimed_nodes_in_order() {
        let mut store = store_in_order("ba");
        store = elem("x", text()).pickle(&String::from("first"), store);
        store = elem("y", text()).pickle(&String::from("second"), store);

        let two = interleaved(seq(elem("a", text()), elem("b", text())));
        match two.unpickle(store) {
            PickleResult::Success(_, rest) => {
                let names: Vec<_> = rest
                    .nodes()
                    .iter()
                    .map(|n| match n {
                        XmlNode::Element(e) => e.name.local.clone(),
                        XmlNode::Text(t) => t.clone(),
                    })
                    .collect();
                assert_eq!(names, ["x", "y"]);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn when_selects_by_predicate_first_match_wins() {
        let link = |rel: &str, href: &str| {
            (String::from(rel), String::from(href))
        };
        let link_p = || element("link", seq(attr("rel", text()), attr("href", text())));

        let mut store = XmlStore::empty();
        store = link_p().pickle(&link("alternate", "http://a/"), store);
        store = link_p().pickle(&link("self", "http://b/"), store);
        store = link_p().pickle(&link("self", "http://c/"), store);

        let self_link = when(
            element(
                "link",
                constant(attr("rel", text()), String::from("self")),
            ),
            link_p(),
        );
        match self_link.unpickle(store) {
            PickleResult::Success((rel, href), rest) => {
                assert_eq!(rel, "self");
                assert_eq!(href, "http://b/");
                assert_eq!(rest.nodes().len(), 2);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn when_reports_last_attempt_or_generic_message() {
        let pred = element("link", constant(attr("rel", text()), String::from("self")));
        let p = when(pred, element("link", attr("href", text())));

        let mut store = XmlStore::empty();
        store = element("link", attr("rel", text())).pickle(&String::from("alternate"), store);
        match p.unpickle(store) {
            PickleResult::Failure(m, _) => assert!(m.contains("self")),
            other => panic!("expected failure, got {other:?}"),
        }

        match p.unpickle(XmlStore::empty()) {
            PickleResult::Failure(m, _) => assert_eq!(m, "no matching element"),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
