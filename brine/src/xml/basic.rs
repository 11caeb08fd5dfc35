//! Leaf codecs operating at the text level.
//!
//! Everything here reads and writes bare text nodes; binding text to an
//! element or attribute is the job of [element](super::element).

use std::fmt::{self, Formatter};

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::core::{adapt, filter, opt};
use crate::xml::XmlStore;
use crate::{PickleResult, Pickler, Repr};

/// Consumes/produces exactly one text node.
#[derive(Clone, Debug)]
pub struct Text;

pub fn text() -> Text {
    Text
}

impl Pickler for Text {
    type Value = String;

    #[inline]
    fn pickle(&self, value: &String, store: XmlStore) -> XmlStore {
        store.add_text(value)
    }

    #[inline]
    fn unpickle(&self, store: XmlStore) -> PickleResult<String> {
        let (found, rest) = store.accept_text();
        match found {
            Some(t) => PickleResult::Success(t, rest),
            None => PickleResult::Failure(String::from("text expected"), rest),
        }
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<text>")
    }
}

/// Whole-number literals as [i64]. The literal is trimmed before parsing so
/// pretty-printed content and delimited-list members both decode.
pub fn integer() -> impl Pickler<Value = i64> {
    filter(
        text(),
        |s| {
            s.trim()
                .parse()
                .map_err(|_| String::from("integer literal expected"))
        },
        |i: &i64| i.to_string(),
    )
}

/// Floating-point literals as [f64].
pub fn float() -> impl Pickler<Value = f64> {
    filter(
        text(),
        |s| {
            s.trim()
                .parse()
                .map_err(|_| String::from("float literal expected"))
        },
        |v: &f64| v.to_string(),
    )
}

/// Case-insensitive boolean. `true` is the only truthy spelling; everything
/// else, including an absent text node, decodes to `false`. Never fails.
pub fn boolean() -> impl Pickler<Value = bool> {
    adapt(
        opt(text()),
        |found| matches!(found, Some(s) if s.trim().eq_ignore_ascii_case("true")),
        |b| Some(b.to_string()),
    )
}

/// RFC 3339 instants through [chrono]. A malformed literal is a recoverable
/// [Failure](PickleResult::Failure); zero UTC offsets print as `Z`.
pub fn datetime() -> impl Pickler<Value = DateTime<FixedOffset>> {
    filter(
        text(),
        |s| {
            DateTime::parse_from_rfc3339(s.trim())
                .map_err(|e| format!("date-time literal expected: {e}"))
        },
        |d: &DateTime<FixedOffset>| d.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    )
}

/// Multiple values carried in one separator-delimited text blob.
///
/// Serialization runs the member codec against an independent empty store
/// per list member and joins the text results; parsing splits the blob,
/// trims each part, and decodes it in isolation. The member codec must
/// therefore itself be representable as a bare text fragment, not an
/// element or attribute.
#[derive(Clone, Debug)]
pub struct DelimitedList<P: Pickler> {
    separator: char,
    member: P,
}

pub fn delimited_list<P: Pickler>(separator: char, member: P) -> DelimitedList<P> {
    DelimitedList { separator, member }
}

impl<P: Pickler> Pickler for DelimitedList<P> {
    type Value = Vec<P::Value>;

    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        let mut parts = Vec::with_capacity(value.len());
        for member in value {
            let out = self
                .member
                .pickle(member, XmlStore::with_scope(store.scope().clone()));
            parts.push(out.text_content());
        }
        let sep = self.separator.to_string();
        store.add_text(&parts.join(&sep))
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        let (found, rest) = store.accept_text();
        let Some(blob) = found else {
            return PickleResult::Failure(String::from("text expected"), rest);
        };
        let mut members = Vec::new();
        if !blob.trim().is_empty() {
            for part in blob.split(self.separator) {
                let part_store = XmlStore::of_text(part.trim(), rest.scope().clone());
                match self.member.unpickle(part_store) {
                    PickleResult::Success(v, _) => members.push(v),
                    PickleResult::Failure(m, st) => return PickleResult::Failure(m, st),
                    PickleResult::Error(m, st) => return PickleResult::Error(m, st),
                }
            }
        }
        PickleResult::Success(members, rest)
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}...", Repr(&self.member), self.separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn of_text(t: &str) -> XmlStore {
        XmlStore::empty().add_text(t)
    }

    #[test]
    fn integer_literals() {
        assert!(matches!(
            integer().unpickle(of_text("42")),
            PickleResult::Success(42, _)
        ));
        match integer().unpickle(of_text("abc")) {
            PickleResult::Failure(m, _) => assert_eq!(m, "integer literal expected"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn boolean_spelling() {
        assert!(matches!(
            boolean().unpickle(of_text("TRUE")),
            PickleResult::Success(true, _)
        ));
        assert!(matches!(
            boolean().unpickle(of_text("")),
            PickleResult::Success(false, _)
        ));
        assert!(matches!(
            boolean().unpickle(XmlStore::empty()),
            PickleResult::Success(false, _)
        ));
        assert_eq!(
            boolean().pickle(&true, XmlStore::empty()).text_content(),
            "true"
        );
    }

    #[test]
    fn delimited_list_trims_members() {
        let p = delimited_list(',', text());
        match p.unpickle(of_text("Sports, Technology, Arts")) {
            PickleResult::Success(vs, _) => {
                assert_eq!(vs, ["Sports", "Technology", "Arts"]);
            }
            other => panic!("expected success, got {other:?}"),
        }

        let out = p.pickle(
            &vec![
                String::from("Sports"),
                String::from("Technology"),
                String::from("Arts"),
            ],
            XmlStore::empty(),
        );
        assert_eq!(out.text_content(), "Sports,Technology,Arts");
    }

    #[test]
    fn delimited_list_of_integers() {
        let p = delimited_list(',', integer());
        assert!(matches!(
            p.unpickle(of_text("1, 2, 3")),
            PickleResult::Success(_, _)
        ));
        assert!(matches!(
            p.unpickle(of_text("1, x, 3")),
            PickleResult::Failure(_, _)
        ));
        assert!(matches!(
            p.unpickle(of_text("")),
            PickleResult::Success(_, _)
        ));
    }

    #[test]
    fn datetime_round_trips_the_literal() {
        let literal = "2008-02-15T16:16:02+01:00";
        let parsed = match datetime().unpickle(of_text(literal)) {
            PickleResult::Success(d, _) => d,
            other => panic!("expected success, got {other:?}"),
        };
        assert_eq!(
            datetime().pickle(&parsed, XmlStore::empty()).text_content(),
            literal
        );

        assert!(matches!(
            datetime().unpickle(of_text("not a date")),
            PickleResult::Failure(_, _)
        ));
    }

    #[test]
    fn utc_prints_as_z() {
        let parsed = match datetime().unpickle(of_text("2008-02-15T15:16:02+00:00")) {
            PickleResult::Success(d, _) => d,
            other => panic!("expected success, got {other:?}"),
        };
        assert_eq!(
            datetime().pickle(&parsed, XmlStore::empty()).text_content(),
            "2008-02-15T15:16:02Z"
        );
    }
}
