//! Two-tier event parsing: strict XML first, regex recovery on failure.

use crate::element::XmlElement;
use crate::fallback::FallbackExtractor;
use crate::record::FlatRecord;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;
use regex::bytes::Regex;
use thiserror::Error;

static QUOTED_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).expect("valid regex"));

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Invalid UTF-8 sequence: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Illegal control character U+{0:04X}")]
    IllegalCharacter(u32),

    #[error("XML declaration not at start of event")]
    MisplacedDeclaration,

    #[error("Malformed attribute list in <{0}>")]
    MalformedAttributes(String),

    #[error("Unclosed element: <{0}>")]
    UnclosedElement(String),

    #[error("Unexpected closing tag: </{0}>")]
    UnexpectedEndTag(String),

    #[error("Junk after document element")]
    TrailingContent,

    #[error("Text outside of the event element")]
    TextOutsideRoot,

    #[error("No element found")]
    NoRootElement,
}

/// Which tier produced a parsed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Strict XML parse; tag-aware and trusted
    Strict,
    /// Regex recovery; heuristic, attribute names may collide
    Fallback,
}

/// Result of parsing one reconstituted event fragment.
#[derive(Debug)]
pub enum ParseOutcome {
    /// Well-formed event tree
    Parsed(XmlElement),
    /// Best-effort attribute map recovered from a malformed event
    Recovered(FlatRecord),
    /// Malformed event, no recovery attempted
    Failed(ParseError),
}

impl ParseOutcome {
    /// Strict parse only: `Parsed` or `Failed`.
    pub fn strict(event: &[u8]) -> Self {
        match parse_strict(event) {
            Ok(element) => ParseOutcome::Parsed(element),
            Err(e) => ParseOutcome::Failed(e),
        }
    }

    /// Strict parse, falling back to regex recovery when it fails:
    /// `Parsed` or `Recovered`.
    pub fn tolerant(event: &str, fallback: &FallbackExtractor) -> Self {
        match parse_strict_str(event) {
            Ok(element) => ParseOutcome::Parsed(element),
            Err(_) => ParseOutcome::Recovered(fallback.extract(event)),
        }
    }

    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            ParseOutcome::Parsed(_) => Some(Provenance::Strict),
            ParseOutcome::Recovered(_) => Some(Provenance::Fallback),
            ParseOutcome::Failed(_) => None,
        }
    }
}

/// Parse a complete event from bytes into an element tree.
pub fn parse_strict(event: &[u8]) -> Result<XmlElement, ParseError> {
    parse_strict_str(std::str::from_utf8(event)?)
}

/// Parse a complete event into an element tree.
///
/// The event must hold exactly one root element, optionally preceded by an
/// XML declaration. A closing `</event>` directly after a self-closed root
/// is accepted, since that is how such records are delimited in a log.
pub fn parse_strict_str(event: &str) -> Result<XmlElement, ParseError> {
    if let Some(c) = event.chars().find(|c| is_illegal_xml_char(*c)) {
        return Err(ParseError::IllegalCharacter(c as u32));
    }

    let mut reader = Reader::from_str(event);
    reader.config_mut().allow_unmatched_ends = true;

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut seen_content = false;
    let mut stray_boundary = false;

    loop {
        let xml_event = reader.read_event()?;
        let is_decl = matches!(xml_event, XmlEvent::Decl(_));
        match xml_event {
            XmlEvent::Decl(_) => {
                if seen_content {
                    return Err(ParseError::MisplacedDeclaration);
                }
            }
            XmlEvent::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::TrailingContent);
                }
                stack.push(element_from_start(&e)?);
            }
            XmlEvent::Empty(e) => {
                let element = element_from_start(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            XmlEvent::End(e) => match stack.pop() {
                Some(element) => attach(&mut stack, &mut root, element)?,
                None => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if root.is_some() && name == "event" && !stray_boundary {
                        stray_boundary = true;
                    } else {
                        return Err(ParseError::UnexpectedEndTag(name));
                    }
                }
            },
            XmlEvent::Text(t) => {
                let data = t.unescape()?;
                append_text(&mut stack, &data)?;
            }
            XmlEvent::CData(c) => {
                let data = String::from_utf8_lossy(&c).into_owned();
                append_text(&mut stack, &data)?;
            }
            XmlEvent::Eof => break,
            XmlEvent::Comment(_) | XmlEvent::PI(_) | XmlEvent::DocType(_) => {}
        }
        if !is_decl {
            seen_content = true;
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::UnclosedElement(open.tag));
    }

    root.ok_or(ParseError::NoRootElement)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, ParseError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    check_attribute_list(start.attributes_raw(), &element.tag)?;

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::XmlError(quick_xml::Error::InvalidAttr(e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }

    Ok(element)
}

/// Rejects what quick-xml tolerates but XML forbids: a raw `<` in a value,
/// and an attribute not separated from the previous value by whitespace.
fn check_attribute_list(raw: &[u8], tag: &str) -> Result<(), ParseError> {
    for value in QUOTED_VALUE_RE.find_iter(raw) {
        let separated = match raw.get(value.end()) {
            None => true,
            Some(next) => next.is_ascii_whitespace() || *next == b'/',
        };
        if value.as_bytes().contains(&b'<') || !separated {
            return Err(ParseError::MalformedAttributes(tag.to_string()));
        }
    }
    Ok(())
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_some() => Err(ParseError::TrailingContent),
        None => {
            *root = Some(element);
            Ok(())
        }
    }
}

fn append_text(stack: &mut [XmlElement], data: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.append_text(data);
            Ok(())
        }
        None if data.trim().is_empty() => Ok(()),
        None => Err(ParseError::TextOutsideRoot),
    }
}

/// Characters XML 1.0 forbids anywhere in a document.
pub fn is_illegal_xml_char(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}')
}
