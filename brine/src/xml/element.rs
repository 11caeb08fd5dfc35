//! Binding content codecs to named, namespaced elements and attributes.
//!
//! [elem]/[nselem] are the forms schemas normally use: once the tag has
//! matched, the content codec runs under [commit], so a misparse inside a
//! correctly identified element cannot be silently masked by an unrelated
//! alternative. [element]/[nselement] are the uncommitted raw forms.

use std::fmt::{self, Formatter};

use crate::core::commit;
use crate::xml::tree::{QName, XmlElement, XmlNode};
use crate::xml::XmlStore;
use crate::{PickleResult, Pickler};

/// Matches/produces one element with the given qualified name; attributes
/// and children come from the content codec.
#[derive(Clone, Debug)]
pub struct Element<P: Pickler> {
    prefix: Option<&'static str>,
    uri: Option<&'static str>,
    local: &'static str,
    content: P,
}

/// An element in no namespace, without commit.
pub fn element<P: Pickler>(local: &'static str, content: P) -> Element<P> {
    Element {
        prefix: None,
        uri: None,
        local,
        content,
    }
}

/// A namespace-qualified element, without commit.
pub fn nselement<P: Pickler>(
    prefix: &'static str,
    uri: &'static str,
    local: &'static str,
    content: P,
) -> Element<P> {
    Element {
        prefix: Some(prefix),
        uri: Some(uri),
        local,
        content,
    }
}

/// An element in no namespace; content runs committed.
pub fn elem<P: Pickler>(local: &'static str, content: P) -> Element<commit<P>> {
    element(local, commit(content))
}

/// A namespace-qualified element; content runs committed.
pub fn nselem<P: Pickler>(
    prefix: &'static str,
    uri: &'static str,
    local: &'static str,
    content: P,
) -> Element<commit<P>> {
    nselement(prefix, uri, local, commit(content))
}

impl<P: Pickler> Pickler for Element<P> {
    type Value = P::Value;

    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        let mut content = XmlStore::with_scope(store.scope().clone());
        if let Some(uri) = self.uri {
            content = content.declare(self.prefix, uri);
        }
        let content = self.content.pickle(value, content);
        let (attributes, children, declarations) = content.into_parts();
        store.add_node(XmlNode::Element(XmlElement {
            name: QName {
                prefix: self.prefix.map(str::to_owned),
                uri: self.uri.map(str::to_owned),
                local: self.local.to_owned(),
            },
            attributes,
            declarations,
            children,
        }))
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        let (found, rest) = store.accept_element(self.uri, self.local);
        match found {
            Some(e) => {
                let content = XmlStore::enter(e, rest.scope());
                match self.content.unpickle(content) {
                    PickleResult::Success(v, _) => PickleResult::Success(v, rest),
                    PickleResult::Failure(m, st) => PickleResult::Failure(m, st),
                    PickleResult::Error(m, st) => PickleResult::Error(m, st),
                }
            }
            None => PickleResult::Failure(
                format!("expected element <{}>", self.display_name()),
                rest,
            ),
        }
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.display_name())
    }
}

impl<P: Pickler> Element<P> {
    fn display_name(&self) -> String {
        match self.prefix {
            Some(p) => format!("{}:{}", p, self.local),
            None => self.local.to_owned(),
        }
    }
}

/// Reads/writes a single attribute through a text-level value codec.
///
/// Absence of the attribute is a [Failure](PickleResult::Failure), not a
/// default: callers needing optional attributes wrap with
/// [opt](crate::core::opt).
#[derive(Clone, Debug)]
pub struct Attr<P: Pickler> {
    prefix: Option<&'static str>,
    uri: Option<&'static str>,
    key: &'static str,
    value: P,
}

/// An attribute in no namespace.
pub fn attr<P: Pickler>(key: &'static str, value: P) -> Attr<P> {
    Attr {
        prefix: None,
        uri: None,
        key,
        value,
    }
}

/// A namespace-qualified attribute.
pub fn nsattr<P: Pickler>(
    prefix: &'static str,
    uri: &'static str,
    key: &'static str,
    value: P,
) -> Attr<P> {
    Attr {
        prefix: Some(prefix),
        uri: Some(uri),
        key,
        value,
    }
}

impl<P: Pickler> Pickler for Attr<P> {
    type Value = P::Value;

    fn pickle(&self, value: &Self::Value, store: XmlStore) -> XmlStore {
        let out = self
            .value
            .pickle(value, XmlStore::with_scope(store.scope().clone()));
        let text = out.text_content();
        let store = match self.uri {
            Some(uri) => store.declare(self.prefix, uri),
            None => store,
        };
        store.add_attr(
            QName {
                prefix: self.prefix.map(str::to_owned),
                uri: self.uri.map(str::to_owned),
                local: self.key.to_owned(),
            },
            &text,
        )
    }

    fn unpickle(&self, store: XmlStore) -> PickleResult<Self::Value> {
        let (found, rest) = store.accept_attr(self.uri, self.key);
        match found {
            Some(raw) => {
                let text_store = XmlStore::of_text(&raw, rest.scope().clone());
                match self.value.unpickle(text_store) {
                    PickleResult::Success(v, _) => PickleResult::Success(v, rest),
                    PickleResult::Failure(m, st) => PickleResult::Failure(m, st),
                    PickleResult::Error(m, st) => PickleResult::Error(m, st),
                }
            }
            None => {
                PickleResult::Failure(format!("expected attribute '{}'", self.key), rest)
            }
        }
    }

    fn repr(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.key)
    }
}
