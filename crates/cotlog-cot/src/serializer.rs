//! XML serialization for parsed event trees.

use crate::element::XmlElement;
use crate::tokenizer::EVENT_BOUNDARY;
use std::fmt::Write;

/// Declaration line written at the top of every output log.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialize an element tree to XML.
///
/// Elements without text or children are written self-closed (`<point .../>`).
pub fn serialize_element(element: &XmlElement) -> String {
    let mut xml = String::new();
    write_element(&mut xml, element, false);
    xml
}

/// Serialize an event so that it ends with the `</event>` boundary and can
/// be tokenized again.
pub fn serialize_event(event: &XmlElement) -> String {
    let mut xml = serialize_element(event);
    let boundary = std::str::from_utf8(EVENT_BOUNDARY).unwrap_or("</event>");
    if !xml.ends_with(boundary) {
        xml.push_str(boundary);
    }
    xml
}

fn write_element(xml: &mut String, element: &XmlElement, with_tail: bool) {
    xml.push('<');
    xml.push_str(&element.tag);
    for (key, value) in &element.attributes {
        write!(xml, r#" {}="{}""#, key, escape_attribute(value)).unwrap();
    }

    let text = element.text.as_deref().unwrap_or("");
    if text.is_empty() && element.children.is_empty() {
        xml.push_str("/>");
    } else {
        xml.push('>');
        xml.push_str(&escape_text(text));
        for child in &element.children {
            write_element(xml, child, true);
        }
        write!(xml, "</{}>", element.tag).unwrap();
    }

    if with_tail {
        if let Some(ref tail) = element.tail {
            xml.push_str(&escape_text(tail));
        }
    }
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#09;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
