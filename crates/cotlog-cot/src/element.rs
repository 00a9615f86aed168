//! Tag-aware tree produced by the strict parser.

/// One XML element with its attributes, text and children.
///
/// `text` is the character data before the first child and `tail` the
/// character data following this element inside its parent, so a tree
/// re-serializes with its original whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Tag name
    pub tag: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Leading character data
    pub text: Option<String>,
    /// Character data after the closing tag
    pub tail: Option<String>,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Value of an attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, keeping its position when it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// First element with the given tag anywhere below this one, depth first.
    pub fn find_descendant(&self, tag: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.tag == tag {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Text with surrounding whitespace removed, if any remains.
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub(crate) fn append_text(&mut self, data: &str) {
        match self.children.last_mut() {
            Some(last) => last.tail.get_or_insert_with(String::new).push_str(data),
            None => self.text.get_or_insert_with(String::new).push_str(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> XmlElement {
        let mut contact = XmlElement::new("contact");
        contact.set_attr("callsign", "Alpha-1");

        let mut nested = XmlElement::new("link");
        nested.children.push(contact.clone());

        let mut detail = XmlElement::new("detail");
        detail.children.push(nested);

        let mut event = XmlElement::new("event");
        event.set_attr("uid", "A");
        event.children.push(detail);
        event
    }

    #[test]
    fn test_set_attr_keeps_position() {
        let mut event = sample();
        event.set_attr("time", "2024-01-01T00:00:00Z");
        event.set_attr("uid", "B");
        assert_eq!(event.attributes[0], ("uid".to_string(), "B".to_string()));
        assert_eq!(event.attr("time"), Some("2024-01-01T00:00:00Z"));
        assert_eq!(event.attr("stale"), None);
    }

    #[test]
    fn test_find_descendant() {
        let event = sample();
        assert!(event.child("contact").is_none());
        let contact = event.find_descendant("contact").unwrap();
        assert_eq!(contact.attr("callsign"), Some("Alpha-1"));
    }

    #[test]
    fn test_append_text_goes_to_tail_after_child() {
        let mut el = XmlElement::new("remarks");
        el.append_text("hello ");
        el.children.push(XmlElement::new("b"));
        el.append_text(" world");
        assert_eq!(el.text.as_deref(), Some("hello "));
        assert_eq!(el.children[0].tail.as_deref(), Some(" world"));
        assert_eq!(el.trimmed_text(), Some("hello"));
    }
}
