// XML document model shared by the XML formatters

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

/// A parsed XML element: its children in document order and its text
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct XmlElement {
    pub(crate) name: String,
    pub(crate) children: Vec<XmlElement>,
    pub(crate) text: String,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// First child with `name`, compared case-insensitively
    pub(crate) fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.trim().is_empty()
    }
}

/// Parse a document into its root element
pub(crate) fn parse_document(body: &[u8]) -> Result<XmlElement, String> {
    let text = std::str::from_utf8(body).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                stack.push(XmlElement::new(name));
            }
            Event::Empty(empty) => {
                let name = String::from_utf8_lossy(empty.local_name().as_ref()).into_owned();
                let element = XmlElement::new(name);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

/// Rewrite object keys into valid XML element names
pub(crate) fn sanitize_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| (sanitize_name(key), sanitize_keys(val)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_keys).collect()),
        other => other.clone(),
    }
}

/// Names start with a letter or underscore and continue with letters,
/// digits, `_`, `-` or `.`; anything else becomes `_`
pub(crate) fn sanitize_name(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string();
    }
    let mut result = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if i == 0 {
            if c.is_ascii_alphabetic() || c == '_' {
                result.push(c);
            } else {
                result.push('_');
                if c.is_ascii_alphanumeric() {
                    result.push(c);
                }
            }
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
            result.push(c);
        } else {
            result.push('_');
        }
    }
    result
}

/// Shape a value so it serializes under a single root element
pub(crate) fn wrap_for_root(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        Value::Null => Value::Object(Map::new()),
        Value::Array(items) => {
            let mut map = Map::new();
            map.insert("item".to_string(), Value::Array(items));
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Value::Object(map)
        }
    }
}
