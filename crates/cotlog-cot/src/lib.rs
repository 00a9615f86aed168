//! Tolerant parsing for Cursor on Target (CoT) event logs
//!
//! Logs captured from TAK feeds are long runs of `<event>` records, often
//! damaged by truncation, stray bytes and unescaped entities. This crate
//! turns such a buffer into something the processing passes can use.
//!
//! # Features
//!
//! - Lazy tokenizing on the `</event>` boundary using `memchr`
//! - Strict XML parsing into an element tree using quick-xml
//! - Regex recovery of a flat attribute map when strict parsing fails
//! - Timestamp sanitizing for damaged time attributes
//!
//! # Example
//!
//! ```rust
//! use cotlog_cot::{tokenize, ParseOutcome};
//!
//! let log = br#"<?xml version="1.0"?>
//! <event version="2.0" uid="test-1" type="a-f-G" time="2024-01-15T10:30:00Z">
//!     <point lat="37.7749" lon="-122.4194" hae="100.0" ce="10.0" le="5.0"/>
//! </event>"#;
//!
//! let fragment = tokenize(log).next().expect("one event");
//! match ParseOutcome::strict(&fragment.complete()) {
//!     ParseOutcome::Parsed(event) => assert_eq!(event.attr("uid"), Some("test-1")),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

pub mod element;
pub mod fallback;
pub mod parser;
pub mod record;
pub mod serializer;
pub mod timestamp;
pub mod tokenizer;

pub use element::XmlElement;
pub use fallback::{strip_control_chars, FallbackExtractor, POINT_ATTRIBUTES};
pub use parser::{parse_strict, parse_strict_str, ParseError, ParseOutcome, Provenance};
pub use record::{parse_remarks_lines, FlatRecord};
pub use serializer::{serialize_element, serialize_event, XML_DECLARATION};
pub use timestamp::{
    format_cot_time, parse_cot_time, parse_logged_time, parse_target_time, sanitize_time,
    truncate_to_seconds, TimestampError, TIME_ATTRIBUTES,
};
pub use tokenizer::{count_events, tokenize, EventFragment, Fragments, EVENT_BOUNDARY};
