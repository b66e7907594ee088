// XML view documents (graph / tree definitions)

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A parsed XML element: tag, attributes in document order, child elements.
/// Text content is dropped; view definitions carry everything in attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    /// Attribute value, already XML-unescaped.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, treating an empty string like an absent attribute.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// First element named `tag`, depth-first, starting with `self`.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(tag))
    }

    /// Direct children named `tag`.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }
}

/// Parse an XML document into its root element.
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(start_element(&e)?),
            Ok(Event::Empty(e)) => {
                let element = start_element(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Xml(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                )))
            }
        }
    }

    if !stack.is_empty() {
        return Err(Error::Xml(format!("unclosed element <{}>", stack[stack.len() - 1].tag)));
    }
    root.ok_or_else(|| Error::Xml("document has no root element".to_string()))
}

fn start_element(e: &BytesStart) -> Result<Element> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| Error::Xml(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        tag,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::Xml("multiple root elements".to_string())),
    }
    Ok(())
}
