//! The XML instantiation of the pickler engine.
//!
//! [XmlStore] is the cursor threaded through every pickle/unpickle step:
//! consumed/unconsumed attributes, an ordered node sequence, a persistent
//! namespace-binding chain, and an access mode. Each nested combinator call
//! consumes a prefix of the store it owns and returns the disjoint
//! remainder, so no two combinators ever observe the same store at once.

use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

pub mod basic;
pub mod element;
pub mod extend;
pub mod options;
pub mod text;
pub mod tree;

use tree::{QName, XmlElement, XmlNode};

/// How `accept` operations locate nodes in the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessMode {
    /// Children are consumed strictly in document order.
    #[default]
    Linear,
    /// Children may be located by predicate, out of order. Entered only by
    /// `interleaved`, and always restored to [AccessMode::Linear] before the
    /// region's result reaches the caller.
    Random,
}

/// A persistent, push-only chain of namespace bindings.
///
/// Nesting a scope never mutates an ancestor: child scopes link to their
/// parent through an [Rc], so a pickler descending into an element extends
/// the chain without touching the enclosing one.
#[derive(Clone, Debug, Default)]
pub struct NsScope {
    head: Option<Rc<NsBinding>>,
}

#[derive(Debug)]
struct NsBinding {
    prefix: Option<String>,
    uri: String,
    parent: Option<Rc<NsBinding>>,
}

impl NsScope {
    /// Extends the chain with `prefix` → `uri`, shadowing outer bindings of
    /// the same prefix.
    pub fn bind(&self, prefix: Option<&str>, uri: &str) -> NsScope {
        NsScope {
            head: Some(Rc::new(NsBinding {
                prefix: prefix.map(str::to_owned),
                uri: uri.to_owned(),
                parent: self.head.clone(),
            })),
        }
    }

    /// The URI `prefix` is currently bound to, innermost binding winning.
    pub fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        let mut cur = self.head.as_deref();
        while let Some(b) = cur {
            if b.prefix.as_deref() == prefix {
                return Some(&b.uri);
            }
            cur = b.parent.as_deref();
        }
        None
    }

    /// Whether `prefix` is already bound to exactly `uri` in this scope, in
    /// which case re-declaring it would be redundant.
    pub fn is_bound(&self, prefix: Option<&str>, uri: &str) -> bool {
        self.lookup(prefix) == Some(uri)
    }

    fn bindings(&self) -> Vec<(Option<&str>, &str)> {
        let mut out = Vec::new();
        let mut cur = self.head.as_deref();
        while let Some(b) = cur {
            out.push((b.prefix.as_deref(), b.uri.as_str()));
            cur = b.parent.as_deref();
        }
        out
    }
}

impl PartialEq for NsScope {
    fn eq(&self, other: &Self) -> bool {
        self.bindings() == other.bindings()
    }
}

/// The serialization/parsing cursor.
///
/// Created empty at the start of a pickle or unpickle call, threaded by
/// ownership through nested combinator calls, and discarded at the end.
/// Attribute keys are unique within a store; node order is preserved except
/// transiently inside a random-access region.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlStore {
    attributes: Vec<(QName, String)>,
    nodes: Vec<XmlNode>,
    /// Serialization side only: prefix → URI declarations the enclosing
    /// element must carry. Input stores keep this empty; [XmlStore::enter]
    /// folds an element's declarations into the scope instead.
    declarations: Vec<(Option<String>, String)>,
    scope: NsScope,
    mode: AccessMode,
}

impl XmlStore {
    /// A fresh store with no content and an empty namespace chain.
    pub fn empty() -> Self {
        XmlStore::default()
    }

    /// A fresh store continuing an enclosing namespace scope.
    pub fn with_scope(scope: NsScope) -> Self {
        XmlStore {
            scope,
            ..XmlStore::default()
        }
    }

    /// A store holding a single text node, for text-level sub-picklers
    /// (attribute values, delimited-list members).
    pub fn of_text(text: &str, scope: NsScope) -> Self {
        XmlStore {
            nodes: vec![XmlNode::Text(text.to_owned())],
            scope,
            ..XmlStore::default()
        }
    }

    /// A store holding a single element node.
    pub fn of_element(elem: XmlElement, scope: NsScope) -> Self {
        XmlStore {
            nodes: vec![XmlNode::Element(elem)],
            scope,
            ..XmlStore::default()
        }
    }

    /// Descends into a matched element: its attributes and children become
    /// the store content, its declarations extend the enclosing scope.
    pub fn enter(elem: XmlElement, enclosing: &NsScope) -> Self {
        let mut scope = enclosing.clone();
        for (prefix, uri) in &elem.declarations {
            scope = scope.bind(prefix.as_deref(), uri);
        }
        XmlStore {
            attributes: elem.attributes,
            nodes: elem.children,
            declarations: Vec::new(),
            scope,
            mode: AccessMode::Linear,
        }
    }

    pub fn scope(&self) -> &NsScope {
        &self.scope
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn nodes(&self) -> &[XmlNode] {
        &self.nodes
    }

    pub fn attributes(&self) -> &[(QName, String)] {
        &self.attributes
    }

    /// No attributes and no nodes left.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.nodes.is_empty()
    }

    pub fn set_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    /// Consume a text node: the head in [AccessMode::Linear], the first one
    /// found in [AccessMode::Random]. The store is unchanged when none is
    /// found.
    pub fn accept_text(mut self) -> (Option<String>, Self) {
        let found = match self.mode {
            AccessMode::Linear => match self.nodes.first() {
                Some(XmlNode::Text(_)) => Some(0),
                _ => None,
            },
            AccessMode::Random => self
                .nodes
                .iter()
                .position(|n| matches!(n, XmlNode::Text(_))),
        };
        match found {
            Some(idx) => match self.nodes.remove(idx) {
                XmlNode::Text(t) => (Some(t), self),
                XmlNode::Element(e) => {
                    self.nodes.insert(idx, XmlNode::Element(e));
                    (None, self)
                }
            },
            None => (None, self),
        }
    }

    /// Consume and remove the named attribute. The store is unchanged when
    /// it is absent.
    pub fn accept_attr(mut self, uri: Option<&str>, local: &str) -> (Option<String>, Self) {
        match self.attributes.iter().position(|(k, _)| k.matches(uri, local)) {
            Some(idx) => {
                let (_, value) = self.attributes.remove(idx);
                (Some(value), self)
            }
            None => (None, self),
        }
    }

    /// Consume an element matching `uri` + `local`: the first non-whitespace
    /// node in [AccessMode::Linear] (stepping over whitespace-only text), or
    /// the first match anywhere in [AccessMode::Random] (unmatched nodes
    /// keep their relative order). The store is unchanged on a mismatch.
    pub fn accept_element(mut self, uri: Option<&str>, local: &str) -> (Option<XmlElement>, Self) {
        match self.mode {
            AccessMode::Linear => {
                let head = self.nodes.iter().position(|n| !n.is_whitespace());
                let matched = head.filter(|&idx| {
                    matches!(&self.nodes[idx], XmlNode::Element(e) if e.name.matches(uri, local))
                });
                match matched {
                    Some(idx) => {
                        self.nodes.drain(..idx);
                        match self.nodes.remove(0) {
                            XmlNode::Element(e) => (Some(e), self),
                            XmlNode::Text(t) => {
                                self.nodes.insert(0, XmlNode::Text(t));
                                (None, self)
                            }
                        }
                    }
                    None => (None, self),
                }
            }
            AccessMode::Random => {
                let found = self.nodes.iter().position(
                    |n| matches!(n, XmlNode::Element(e) if e.name.matches(uri, local)),
                );
                match found {
                    Some(idx) => match self.nodes.remove(idx) {
                        XmlNode::Element(e) => (Some(e), self),
                        XmlNode::Text(t) => {
                            self.nodes.insert(idx, XmlNode::Text(t));
                            (None, self)
                        }
                    },
                    None => (None, self),
                }
            }
        }
    }

    /// Serialization side: append a text node.
    pub fn add_text(mut self, text: &str) -> Self {
        self.nodes.push(XmlNode::Text(text.to_owned()));
        self
    }

    /// Serialization side: append a node.
    pub fn add_node(mut self, node: XmlNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Serialization side: set an attribute, keeping keys unique.
    pub fn add_attr(mut self, name: QName, value: &str) -> Self {
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.matches(name.uri.as_deref(), &name.local))
        {
            Some((_, v)) => *v = value.to_owned(),
            None => self.attributes.push((name, value.to_owned())),
        }
        self
    }

    /// Excise the node at `idx` into its own single-node store, returning it
    /// alongside the remainder.
    pub fn take_node(mut self, idx: usize) -> (XmlStore, XmlStore) {
        let node = self.nodes.remove(idx);
        let taken = XmlStore {
            nodes: vec![node],
            scope: self.scope.clone(),
            ..XmlStore::default()
        };
        (taken, self)
    }

    /// Move everything still unconsumed into a separate store, leaving this
    /// one exhausted. Used to capture extension content.
    pub fn drain(mut self) -> (XmlStore, XmlStore) {
        let captured = XmlStore {
            attributes: std::mem::take(&mut self.attributes),
            nodes: std::mem::take(&mut self.nodes),
            scope: self.scope.clone(),
            ..XmlStore::default()
        };
        (captured, self)
    }

    /// Re-emit another store's leftover attributes and nodes into this one,
    /// preserving their order.
    pub fn merge_leftovers(mut self, leftovers: &XmlStore) -> Self {
        for (name, value) in &leftovers.attributes {
            self = self.add_attr(name.clone(), value);
        }
        self.nodes.extend(leftovers.nodes.iter().cloned());
        self
    }

    /// The concatenation of every text node, used when a sub-pickler's
    /// output must collapse to a bare string (attribute values, delimited
    /// lists).
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            if let XmlNode::Text(t) = node {
                out.push_str(t);
            }
        }
        out
    }

    /// Serialization side: bind `prefix` → `uri` for the rest of this store
    /// and record the declaration for the enclosing element — unless the
    /// prefix is already bound to that URI in the current scope.
    pub fn declare(mut self, prefix: Option<&str>, uri: &str) -> Self {
        if !self.scope.is_bound(prefix, uri) {
            self.scope = self.scope.bind(prefix, uri);
            self.declarations
                .push((prefix.map(str::to_owned), uri.to_owned()));
        }
        self
    }

    /// Split into attribute set, node sequence and pending namespace
    /// declarations, for building a finished element out of a content store.
    pub fn into_parts(
        self,
    ) -> (
        Vec<(QName, String)>,
        Vec<XmlNode>,
        Vec<(Option<String>, String)>,
    ) {
        (self.attributes, self.nodes, self.declarations)
    }
}

impl Display for XmlStore {
    /// A short snapshot for diagnostics: counts and the next few nodes.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attribute(s), {} node(s)",
            self.attributes.len(),
            self.nodes.len()
        )?;
        for node in self.nodes.iter().take(3) {
            match node {
                XmlNode::Element(e) => write!(f, " <{}>", e.name)?,
                XmlNode::Text(t) => {
                    let shown: String = t.chars().take(16).collect();
                    write!(f, " \"{shown}\"")?;
                }
            }
        }
        Ok(())
    }
}
