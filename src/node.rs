use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::{self, Read},
    path::Path,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed xml: {0}")]
    Xml(String),
    #[error("malformed json")]
    Json(#[from] serde_json::Error),
    #[error("document has no root element")]
    Empty,
    #[error("document ended inside element <{0}>")]
    Unbalanced(String),
    #[error("error reading response")]
    Io(#[from] io::Error),
}

/// Encoding of a saved response document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Xml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Xml,
        }
    }
}

// One element of a decoded response. Statistic sub-objects keep their
// schema type in `class`, which is what the dispatcher keys on; plain
// attributes and leaf elements are both reachable through `field`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).with_text(text)
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attrs.contains_key(name) || self.child(name).is_some()
    }

    /// Looks `name` up as an attribute first, then as the text of a child
    /// element. The appliance is not consistent about which one it uses.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.attr(name)
            .or_else(|| self.child(name).and_then(Node::text))
    }

    /// Text content, or the text of a `value` child for elements that carry
    /// attributes alongside their value.
    pub fn value(&self) -> Option<&str> {
        self.text().or_else(|| self.child("value").and_then(Node::text))
    }

    /// Depth-first search for the first element called `name`, including
    /// `self`.
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn from_json_str(json: &str) -> Result<Node, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_xml_reader<R: Read>(mut readable: R) -> Result<Node, Error> {
        let mut xml = String::new();
        readable.read_to_string(&mut xml)?;
        Self::from_xml_str(&xml)
    }

    pub fn from_xml_str(xml: &str) -> Result<Node, Error> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;
        loop {
            match reader.read_event().map_err(|e| Error::Xml(e.to_string()))? {
                Event::Start(start) => stack.push(element(&start)?),
                Event::Empty(start) => attach(&mut stack, &mut root, element(&start)?),
                Event::End(_) => match stack.pop() {
                    Some(node) => attach(&mut stack, &mut root, node),
                    None => return Err(Error::Xml("unexpected closing tag".to_string())),
                },
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                    push_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    push_text(&mut stack, &text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(Error::Unbalanced(open.name));
        }
        root.ok_or(Error::Empty)
    }

    pub fn from_path(path: &Path, format: Format) -> Result<Node, Error> {
        let contents = fs::read_to_string(path)?;
        match format {
            Format::Xml => Self::from_xml_str(&contents),
            Format::Json => Self::from_json_str(&contents),
        }
    }
}

fn element(start: &BytesStart) -> Result<Node, Error> {
    let mut node = Node::new(String::from_utf8_lossy(start.local_name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        if attr.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();
        let qualified = attr.key.prefix().is_some();
        match local.as_str() {
            // xsi:type="ns1:TimeSeries" names the statistic kind.
            "type" if qualified => {
                let class = value.rsplit(':').next().unwrap_or(&value).to_string();
                node.class = Some(class);
            }
            "nil" if qualified => {}
            _ => {
                node.attrs.insert(local, value);
            }
        }
    }
    Ok(node)
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

fn push_text(stack: &mut [Node], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        match top.text.as_mut() {
            Some(existing) => existing.push_str(text),
            None => top.text = Some(text.to_string()),
        }
    }
}
