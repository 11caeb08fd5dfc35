//! The raw XML tree representation the store wraps.
//!
//! Elements carry a qualified name, an ordered attribute set, the namespace
//! declarations made on the element itself, and an ordered child sequence.
//! Identity for matching is namespace URI + local name; prefixes are
//! presentation only.

use std::fmt::{self, Display, Formatter};

/// A namespace-qualified name for elements and attributes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub uri: Option<String>,
    pub local: String,
}

impl QName {
    /// A name in no namespace.
    pub fn local(local: &str) -> Self {
        QName {
            prefix: None,
            uri: None,
            local: local.to_owned(),
        }
    }

    /// A prefixed, namespace-qualified name.
    pub fn qualified(prefix: &str, uri: &str, local: &str) -> Self {
        QName {
            prefix: Some(prefix.to_owned()),
            uri: Some(uri.to_owned()),
            local: local.to_owned(),
        }
    }

    /// Namespace-aware identity: URI and local name, ignoring the prefix.
    pub fn matches(&self, uri: Option<&str>, local: &str) -> bool {
        self.local == local && self.uri.as_deref() == uri
    }
}

impl Display for QName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A single node in an element's content sequence.
#[derive(Clone, Debug, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlNode {
    /// Text nodes containing nothing but whitespace are insignificant
    /// between elements.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, XmlNode::Text(t) if t.trim().is_empty())
    }
}

/// An XML element.
#[derive(Clone, Debug, PartialEq)]
pub struct XmlElement {
    pub name: QName,
    /// Ordered, key-unique attribute set.
    pub attributes: Vec<(QName, String)>,
    /// Prefix → URI bindings declared on this element (`xmlns`, `xmlns:p`).
    pub declarations: Vec<(Option<String>, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: QName) -> Self {
        XmlElement {
            name,
            attributes: Vec::new(),
            declarations: Vec::new(),
            children: Vec::new(),
        }
    }
}
