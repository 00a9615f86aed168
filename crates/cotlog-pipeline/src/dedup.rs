//! Duplicate suppression keyed on identity and whole-second time.

use crate::output::{prefixed_sibling, read_source, write_atomic, DEDUP_PREFIX};
use cotlog_core::{Cadence, ProcessingConfig, ProgressSink, Result, Session};
use cotlog_cot::{
    count_events, parse_strict, tokenize, truncate_to_seconds, XmlElement, EVENT_BOUNDARY,
    XML_DECLARATION,
};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

static DECLARATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\?xml[^>]*\?>(\r?\n)?").expect("valid regex"));

/// Identity of an event for duplicate detection.
///
/// Missing attributes are valid key components; all events lacking the
/// identity attribute at the same second collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub identity: Option<String>,
    pub time: Option<String>,
}

impl DedupKey {
    pub fn from_event(event: &XmlElement, identity_attribute: &str, time_attribute: &str) -> Self {
        Self {
            identity: event.attr(identity_attribute).map(str::to_string),
            time: event
                .attr(time_attribute)
                .map(|t| truncate_to_seconds(t).to_string()),
        }
    }
}

/// Counts from one dedup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupSummary {
    pub total: usize,
    pub kept: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

/// Output of [`Deduplicator::run`].
#[derive(Debug, Clone)]
pub struct DedupReport {
    pub output: PathBuf,
    pub summary: DedupSummary,
}

/// Keeps the first event for every key, in input order.
pub struct Deduplicator<'a> {
    config: &'a ProcessingConfig,
}

impl<'a> Deduplicator<'a> {
    pub fn new(config: &'a ProcessingConfig) -> Self {
        Self { config }
    }

    /// Deduplicates a log held in memory.
    ///
    /// A leading byte order mark and all XML declarations are removed before
    /// tokenizing, and a single declaration is written at the top of the
    /// output. Kept events are copied byte for byte; events that fail strict
    /// parsing are dropped.
    pub fn dedup(&self, content: &[u8], sink: &mut dyn ProgressSink) -> (Vec<u8>, DedupSummary) {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let content = DECLARATION_RE.replace_all(content, &b""[..]);
        let total = count_events(&content);
        let cadence = Cadence::new(self.config.progress_interval, total);

        let mut seen = HashSet::new();
        let mut summary = DedupSummary {
            total,
            ..Default::default()
        };

        let mut output = Vec::with_capacity(content.len() + XML_DECLARATION.len() + 1);
        output.extend_from_slice(XML_DECLARATION.as_bytes());
        output.push(b'\n');

        for (idx, fragment) in tokenize(&content).enumerate() {
            match parse_strict(&fragment.complete()) {
                Ok(event) => {
                    let key = DedupKey::from_event(
                        &event,
                        &self.config.identity_attribute,
                        &self.config.time_attribute,
                    );
                    if seen.insert(key) {
                        output.extend_from_slice(fragment.as_bytes());
                        output.extend_from_slice(EVENT_BOUNDARY);
                        summary.kept += 1;
                    } else {
                        summary.duplicates += 1;
                    }
                }
                Err(e) => {
                    debug!("Dropping malformed event {}: {}", idx, e);
                    summary.malformed += 1;
                }
            }
            cadence.tick(sink, "Processed", idx);
        }

        (output, summary)
    }

    /// Deduplicates the session's primary file into `NoDuplicates_<name>`
    /// and selects the new file.
    pub fn run(&self, session: &mut Session, sink: &mut dyn ProgressSink) -> Result<DedupReport> {
        let source = super::primary_file(session)?;
        let content = read_source(&source)?;
        sink.report(&format!("Removing duplicates from: {}", source.display()));

        let (deduplicated, summary) = self.dedup(&content, sink);
        let output = prefixed_sibling(&source, DEDUP_PREFIX)?;
        write_atomic(&output, &deduplicated)?;

        info!(
            total = summary.total,
            kept = summary.kept,
            duplicates = summary.duplicates,
            malformed = summary.malformed,
            "Deduplication finished"
        );
        sink.report(&format!(
            "Duplicates removed. Cleaned file saved as: {}",
            output.display()
        ));

        session.select(output.clone());
        Ok(DedupReport { output, summary })
    }
}
