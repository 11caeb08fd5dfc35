//! Reading and printing literal documents at the library's edge.
//!
//! The engine itself only ever sees the wrapped tree type; this module
//! converts between that tree and document strings with quick-xml events.
//! Whitespace-only text between elements is dropped on the way in; text
//! that carries content is preserved exactly.

use std::io::Write;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::xml::tree::{QName, XmlElement, XmlNode};
use crate::xml::{NsScope, XmlStore};
use crate::{PickleError, Pickler};

/// A malformed document string, or a failure while writing one out.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("malformed XML: {0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("malformed XML attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("bad character escape: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    #[error("unknown entity reference &{0};")]
    UnknownEntity(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("unexpected content outside the root element")]
    OutsideRoot,
    #[error("mismatched closing tag </{0}>")]
    MismatchedEnd(String),
    #[error("unclosed element at end of input")]
    Unclosed,
    #[error("i/o failure while writing: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure at either layer of a whole-document pickle/unpickle call.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error(transparent)]
    Text(#[from] TextError),
    #[error(transparent)]
    Pickle(#[from] PickleError),
    #[error("pickling produced no root element")]
    NoRootProduced,
}

fn split_qname(raw: &str) -> (Option<String>, String) {
    match raw.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_owned()), local.to_owned()),
        None => (None, raw.to_owned()),
    }
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Parses one document string into the wrapped tree representation,
/// resolving namespace prefixes against the declarations in scope.
pub fn parse_document(input: &str) -> Result<XmlElement, TextError> {
    debug!(bytes = input.len(), "parsing XML document");
    let mut reader = Reader::from_str(input);

    // (element under construction, scope in force inside it)
    let mut stack: Vec<(XmlElement, NsScope)> = Vec::new();
    let mut root: Option<XmlElement> = None;

    fn open(
        e: &BytesStart<'_>,
        enclosing: &NsScope,
    ) -> Result<(XmlElement, NsScope), TextError> {
        let mut declarations = Vec::new();
        let mut raw_attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = unescape(&String::from_utf8_lossy(&attr.value))?.into_owned();
            if key == "xmlns" {
                declarations.push((None, value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((Some(prefix.to_owned()), value));
            } else {
                raw_attrs.push((key, value));
            }
        }

        let mut scope = enclosing.clone();
        for (prefix, uri) in &declarations {
            scope = scope.bind(prefix.as_deref(), uri);
        }

        let (prefix, local) = split_qname(&String::from_utf8_lossy(e.name().as_ref()));
        let uri = scope.lookup(prefix.as_deref()).map(str::to_owned);

        let attributes = raw_attrs
            .into_iter()
            .map(|(key, value)| {
                let (prefix, local) = split_qname(&key);
                // Unprefixed attributes are in no namespace.
                let uri = prefix
                    .as_deref()
                    .and_then(|p| scope.lookup(Some(p)))
                    .map(str::to_owned);
                (QName { prefix, uri, local }, value)
            })
            .collect();

        Ok((
            XmlElement {
                name: QName { prefix, uri, local },
                attributes,
                declarations,
                children: Vec::new(),
            },
            scope,
        ))
    }

    fn attach(
        stack: &mut Vec<(XmlElement, NsScope)>,
        root: &mut Option<XmlElement>,
        node: XmlNode,
    ) -> Result<(), TextError> {
        match stack.last_mut() {
            Some((parent, _)) => {
                parent.children.push(node);
                Ok(())
            }
            None => match node {
                XmlNode::Element(e) if root.is_none() => {
                    *root = Some(e);
                    Ok(())
                }
                node if node.is_whitespace() => Ok(()),
                _ => Err(TextError::OutsideRoot),
            },
        }
    }

    // Consecutive text/entity events are one logical text run; whitespace-only
    // runs (outside CDATA) are insignificant and dropped at flush time.
    let mut pending = String::new();
    let mut pending_forced = false;

    fn flush(
        stack: &mut Vec<(XmlElement, NsScope)>,
        root: &mut Option<XmlElement>,
        pending: &mut String,
        forced: &mut bool,
    ) -> Result<(), TextError> {
        if !pending.is_empty() && (*forced || !pending.trim().is_empty()) {
            attach(stack, root, XmlNode::Text(std::mem::take(pending)))?;
        }
        pending.clear();
        *forced = false;
        Ok(())
    }

    loop {
        let enclosing = stack
            .last()
            .map(|(_, scope)| scope.clone())
            .unwrap_or_default();
        match reader.read_event()? {
            Event::Start(e) => {
                flush(&mut stack, &mut root, &mut pending, &mut pending_forced)?;
                if stack.is_empty() && root.is_some() {
                    return Err(TextError::OutsideRoot);
                }
                stack.push(open(&e, &enclosing)?);
            }
            Event::Empty(e) => {
                flush(&mut stack, &mut root, &mut pending, &mut pending_forced)?;
                if stack.is_empty() && root.is_some() {
                    return Err(TextError::OutsideRoot);
                }
                let (elem, _) = open(&e, &enclosing)?;
                attach(&mut stack, &mut root, XmlNode::Element(elem))?;
            }
            Event::End(e) => {
                flush(&mut stack, &mut root, &mut pending, &mut pending_forced)?;
                let raw = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match stack.pop() {
                    Some((elem, _)) => {
                        if qname_str(&elem.name) != raw {
                            return Err(TextError::MismatchedEnd(raw));
                        }
                        attach(&mut stack, &mut root, XmlNode::Element(elem))?;
                    }
                    None => return Err(TextError::OutsideRoot),
                }
            }
            Event::Text(t) => {
                pending.push_str(&unescape(&String::from_utf8_lossy(t.as_ref()))?);
            }
            Event::CData(t) => {
                pending.push_str(&String::from_utf8_lossy(t.as_ref()));
                pending_forced = true;
            }
            Event::GeneralRef(r) => {
                let name = String::from_utf8_lossy(r.as_ref()).into_owned();
                let resolved = resolve_entity(&name)
                    .ok_or_else(|| TextError::UnknownEntity(name))?;
                pending.push(resolved);
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    flush(&mut stack, &mut root, &mut pending, &mut pending_forced)?;
    if !stack.is_empty() {
        return Err(TextError::Unclosed);
    }
    root.ok_or(TextError::NoRoot)
}

/// Prints the tree back to a document string, attributes and namespace
/// declarations in stored order, text escaped.
pub fn print_document(root: &XmlElement) -> Result<String, TextError> {
    debug!("printing XML document");
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, root)?;
    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn qname_str(name: &QName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.clone(),
    }
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    elem: &XmlElement,
) -> Result<(), TextError> {
    let name = qname_str(&elem.name);
    let mut start = BytesStart::new(name.as_str());
    for (prefix, uri) in &elem.declarations {
        match prefix {
            Some(p) => start.push_attribute((format!("xmlns:{p}").as_str(), uri.as_str())),
            None => start.push_attribute(("xmlns", uri.as_str())),
        }
    }
    for (key, value) in &elem.attributes {
        start.push_attribute((qname_str(key).as_str(), value.as_str()));
    }

    if elem.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for child in &elem.children {
            match child {
                XmlNode::Element(e) => write_element(writer, e)?,
                XmlNode::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    }
    Ok(())
}

/// Unpickles a value straight from a literal document.
pub fn unpickle_document<P: Pickler>(pickler: &P, input: &str) -> Result<P::Value, DocError> {
    let root = parse_document(input)?;
    let store = XmlStore::empty().add_node(XmlNode::Element(root));
    let (value, _) = pickler.unpickle(store).to_result()?;
    Ok(value)
}

/// Pickles a value and prints the resulting document.
pub fn pickle_document<P: Pickler>(pickler: &P, value: &P::Value) -> Result<String, DocError> {
    let store = pickler.pickle(value, XmlStore::empty());
    let root = match store.nodes().first() {
        Some(XmlNode::Element(e)) => e,
        _ => return Err(DocError::NoRootProduced),
    };
    Ok(print_document(root)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::seq;
    use crate::xml::basic::{integer, text};
    use crate::xml::element::{elem, nselem};

    #[test]
    fn parse_resolves_namespaces() {
        let doc = r#"<atom:feed xmlns:atom="http://www.w3.org/2005/Atom"><atom:id>urn:1</atom:id></atom:feed>"#;
        let root = parse_document(doc).expect("well-formed");
        assert_eq!(root.name.local, "feed");
        assert_eq!(root.name.uri.as_deref(), Some("http://www.w3.org/2005/Atom"));
        let XmlNode::Element(id) = &root.children[0] else {
            panic!("expected an element child");
        };
        assert_eq!(id.name.uri.as_deref(), Some("http://www.w3.org/2005/Atom"));
    }

    #[test]
    fn parse_drops_insignificant_whitespace_only() {
        let doc = "<a>\n  <b>  kept  </b>\n</a>";
        let root = parse_document(doc).expect("well-formed");
        assert_eq!(root.children.len(), 1);
        let XmlNode::Element(b) = &root.children[0] else {
            panic!("expected an element child");
        };
        assert_eq!(b.children, [XmlNode::Text(String::from("  kept  "))]);
    }

    #[test]
    fn escapes_round_trip() {
        let p = elem("t", text());
        let value = String::from("a < b & \"c\"");
        let doc = pickle_document(&p, &value).expect("pickle");
        let back = unpickle_document(&p, &doc).expect("unpickle");
        assert_eq!(back, value);
    }

    #[test]
    fn document_round_trip() {
        let p = nselem(
            "atom",
            "http://www.w3.org/2005/Atom",
            "pair",
            seq(elem("x", integer()), elem("y", integer())),
        );
        let doc = pickle_document(&p, &(3, 4)).expect("pickle");
        assert_eq!(
            doc,
            r#"<atom:pair xmlns:atom="http://www.w3.org/2005/Atom"><x>3</x><y>4</y></atom:pair>"#
        );
        assert_eq!(unpickle_document(&p, &doc).expect("unpickle"), (3, 4));
    }

    #[test]
    fn malformed_documents_are_reported() {
        assert!(matches!(parse_document(""), Err(TextError::NoRoot)));
        assert!(parse_document("<a><b></a>").is_err());
        assert!(matches!(
            parse_document("<a/><b/>"),
            Err(TextError::OutsideRoot)
        ));
    }
}
