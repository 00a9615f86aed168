//! Regex-driven recovery for events the strict parser rejects.
//!
//! Recovery never fails: whatever can be found is returned as a flat
//! record, with the identity defaulting to a sentinel value.

use crate::record::{parse_remarks_lines, FlatRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static DETAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<detail>([\s\S]*?)</detail>").expect("valid regex"));
static REMARKS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<remarks[^>]*>([\s\S]*?)</remarks>").expect("valid regex"));
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(\w[\w\-_]*)([^>]*)>").expect("valid regex"));
static ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w[\w\-_]*)="([^"]*)""#).expect("valid regex"));
static CONTACT_CALLSIGN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<contact[^>]*callsign="([^"]+)""#).expect("valid regex"));
static POINT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<point[^>]+>").expect("valid regex"));
static TRACK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<track[^>]+>").expect("valid regex"));
static CONTROL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("valid regex"));

/// Positional attributes of `<point>`.
pub const POINT_ATTRIBUTES: [&str; 5] = ["lat", "lon", "hae", "ce", "le"];

/// Motion attributes of `<track>`.
pub const TRACK_ATTRIBUTES: [&str; 2] = ["speed", "course"];

/// Key the raw remarks text is stored under.
pub const REMARKS_TEXT_KEY: &str = "detail_detail_remarks_text";

/// Removes control characters that make otherwise readable logs unparsable.
pub fn strip_control_chars(text: &str) -> Cow<'_, str> {
    CONTROL_RE.replace_all(text, "")
}

/// Recovers a flat attribute map from a malformed event.
#[derive(Debug, Clone)]
pub struct FallbackExtractor {
    identity_attribute: String,
    unknown_identity: String,
    identity_re: Regex,
}

impl Default for FallbackExtractor {
    fn default() -> Self {
        Self::new("uid", "UNKNOWN_UID")
    }
}

impl FallbackExtractor {
    pub fn new(identity_attribute: &str, unknown_identity: &str) -> Self {
        let pattern = format!(r#"{}="([^"]+)""#, regex::escape(identity_attribute));
        Self {
            identity_attribute: identity_attribute.to_string(),
            unknown_identity: unknown_identity.to_string(),
            identity_re: Regex::new(&pattern).expect("escaped identity pattern is valid"),
        }
    }

    pub fn identity_attribute(&self) -> &str {
        &self.identity_attribute
    }

    pub fn unknown_identity(&self) -> &str {
        &self.unknown_identity
    }

    /// Extracts everything recognizable from `event`.
    pub fn extract(&self, event: &str) -> FlatRecord {
        let mut record = FlatRecord::new();

        let identity = self
            .identity_re
            .captures(event)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .unwrap_or(&self.unknown_identity);
        record.insert(self.identity_attribute.as_str(), identity);

        match DETAIL_RE.captures(event).and_then(|c| c.get(1)) {
            Some(detail) => extract_detail(detail.as_str(), &mut record),
            None => extract_without_detail(event, &mut record),
        }

        record
    }
}

fn extract_remarks(region: &str, record: &mut FlatRecord) {
    if let Some(remarks) = REMARKS_RE.captures(region).and_then(|c| c.get(1)) {
        let remarks = remarks.as_str().trim();
        parse_remarks_lines(remarks, record);
        record.insert(REMARKS_TEXT_KEY, remarks);
    }
}

fn extract_detail(detail: &str, record: &mut FlatRecord) {
    extract_remarks(detail, record);

    for tag in TAG_RE.captures_iter(detail) {
        let name = &tag[1];
        if name.eq_ignore_ascii_case("detail") || name.eq_ignore_ascii_case("remarks") {
            continue;
        }
        for attr in ATTR_RE.captures_iter(&tag[2]) {
            record.insert(format!("detail_{}_{}", name, &attr[1]), &attr[2]);
        }
    }
}

fn extract_without_detail(event: &str, record: &mut FlatRecord) {
    if let Some(callsign) = CONTACT_CALLSIGN_RE.captures(event).and_then(|c| c.get(1)) {
        record.insert("contact_callsign", callsign.as_str());
    }

    extract_remarks(event, record);

    if let Some(point) = POINT_RE.find(event) {
        for attr in POINT_ATTRIBUTES {
            if let Some(value) = tag_attribute(point.as_str(), attr) {
                record.insert(format!("point_{}", attr), value);
            }
        }
    }

    if let Some(track) = TRACK_RE.find(event) {
        for attr in TRACK_ATTRIBUTES {
            if let Some(value) = tag_attribute(track.as_str(), attr) {
                record.insert(format!("detail_track_{}", attr), value);
            }
        }
    }
}

/// Non-empty value of `name="..."` inside a single tag.
fn tag_attribute<'t>(tag: &'t str, name: &str) -> Option<&'t str> {
    ATTR_RE
        .captures_iter(tag)
        .find(|c| &c[1] == name)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
        .filter(|v| !v.is_empty())
}
