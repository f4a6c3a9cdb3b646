//! Minimal owned XML tree for feed documents.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::app::{FeedRelayError, Result};

#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    /// Element name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        let mut stack = Vec::new();
        push_children(&mut stack, self);
        Descendants { stack }
    }

    /// First descendant with the given local name.
    pub fn find(&self, local: &str) -> Option<&XmlElement> {
        self.descendants().find(|e| e.local_name() == local)
    }

    /// First descendant with the given prefixed name.
    pub fn find_qualified(&self, name: &str) -> Option<&XmlElement> {
        self.descendants().find(|e| e.name == name)
    }

    pub fn find_all(&self, local: &str) -> Vec<&XmlElement> {
        self.descendants()
            .filter(|e| e.local_name() == local)
            .collect()
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

fn push_children<'a>(stack: &mut Vec<&'a XmlElement>, element: &'a XmlElement) {
    for child in element.children.iter().rev() {
        if let XmlNode::Element(e) = child {
            stack.push(e);
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        push_children(&mut self.stack, next);
        Some(next)
    }
}

/// Parse a complete XML document and return its root element.
pub fn parse(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FeedRelayError::FeedParse(format!(
                "{} at position {}",
                e,
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(start) => open.push(element_from(&start)),
            Event::Empty(start) => attach(&mut open, &mut root, element_from(&start))?,
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| FeedRelayError::FeedParse("unexpected end tag".into()))?;
                attach(&mut open, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(parent) = open.last_mut() {
                    let value = text
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    parent.children.push(XmlNode::Text(value));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = open.last_mut() {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(value));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(FeedRelayError::FeedParse(format!(
            "unclosed element <{}>",
            unclosed.name
        )));
    }

    root.ok_or_else(|| FeedRelayError::FeedParse("document has no root element".into()))
}

fn element_from(start: &BytesStart<'_>) -> XmlElement {
    let attrs = start
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect();

    XmlElement {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attrs,
        children: Vec::new(),
    }
}

fn attach(open: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match open.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(FeedRelayError::FeedParse(
                "document has more than one root element".into(),
            ))
        }
    }
    Ok(())
}
