//! Property round trips over a small record schema: every value the schema
//! can produce decodes back to itself, at the store level and through
//! document strings.

use brine::core::{adapt, repeat, seq};
use brine::xml::basic::{integer, text};
use brine::xml::element::elem;
use brine::xml::text::{pickle_document, unpickle_document};
use brine::xml::XmlStore;
use brine::{PickleResult, Pickler};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

#[derive(Clone, Debug, PartialEq)]
struct Item {
    label: String,
    scores: Vec<i64>,
}

fn item() -> impl Pickler<Value = Item> {
    adapt(
        elem(
            "item",
            seq(elem("label", text()), repeat(elem("score", integer()))),
        ),
        |(label, scores)| Item { label, scores },
        |i: &Item| (i.label.clone(), i.scores.clone()),
    )
}

proptest! {
    #[test]
    fn store_round_trip(label in any::<String>(), scores in prop::collection::vec(any::<i64>(), 0..6)) {
        let value = Item { label, scores };
        let store = item().pickle(&value, XmlStore::empty());
        match item().unpickle(store) {
            PickleResult::Success(back, rest) => {
                prop_assert_eq!(back, value);
                prop_assert!(rest.is_empty());
            }
            other => prop_assert!(false, "expected success, got {:?}", other),
        }
    }

    #[test]
    fn document_round_trip(
        // Documents drop whitespace-only text, so keep the label visibly
        // non-blank; escapable characters are deliberately in range.
        label in "[ a-zA-Z0-9&<>'\"]{0,18}[a-zA-Z0-9]",
        scores in prop::collection::vec(any::<i64>(), 0..6),
    ) {
        let value = Item { label, scores };
        let doc = pickle_document(&item(), &value).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let back = unpickle_document(&item(), &doc).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(back, value);
    }
}
