//! Flattening events into flat records for tabular export.
//!
//! Well-formed events are flattened from their element tree; events the
//! strict parser rejects go through the regex fallback instead. Either
//! way every event yields a record, so a damaged entry never stops the
//! export of the rest of the file.

use crate::output::{parent_dir, read_source};
use crate::table::{write_tables, Table};
use cotlog_core::{Cadence, ProcessingConfig, ProgressSink, Result, Session};
use cotlog_cot::{
    count_events, parse_remarks_lines, parse_strict_str, strip_control_chars, tokenize,
    FallbackExtractor, FlatRecord, Provenance, XmlElement, POINT_ATTRIBUTES,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory, below the output directory, that receives the tables.
pub const DATA_DIR: &str = "CoT_Data";

/// File stem of the table combining several source files.
pub const COMBINED_TABLE: &str = "Combined_CoT_Data";

const CALLSIGN_KEY: &str = "contact_callsign";

/// Adds `{prefix}_{tag}_{attr}` for every attribute and `{prefix}_{tag}_text`
/// for non-blank text of `element` and all of its descendants. Children use
/// `{prefix}_{tag}` as their prefix.
pub fn flatten_element(element: &XmlElement, prefix: &str, record: &mut FlatRecord) {
    for (name, value) in &element.attributes {
        record.insert(format!("{}_{}_{}", prefix, element.tag, name), value.as_str());
    }

    if let Some(text) = element.trimmed_text() {
        record.insert(format!("{}_{}_text", prefix, element.tag), text);
    }

    let child_prefix = format!("{}_{}", prefix, element.tag);
    for child in &element.children {
        flatten_element(child, &child_prefix, record);
    }
}

/// One extracted event.
#[derive(Debug, Clone)]
pub struct ExtractedEvent {
    pub identity: String,
    pub provenance: Provenance,
    pub record: FlatRecord,
}

impl ExtractedEvent {
    pub fn callsign(&self) -> Option<&str> {
        self.record.get(CALLSIGN_KEY).filter(|c| !c.is_empty())
    }
}

/// All records of one identity.
#[derive(Debug, Clone)]
pub struct EventGroup {
    pub identity: String,
    pub records: Vec<FlatRecord>,
    callsign: Option<String>,
}

impl EventGroup {
    /// Grouping key shown to users: the first callsign seen for this
    /// identity, else the identity itself.
    pub fn display_name(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.identity)
    }

    pub fn to_table(&self) -> Table {
        Table::from_records(self.display_name(), &self.records)
    }
}

/// Groups in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub groups: Vec<EventGroup>,
    pub recovered: usize,
}

impl Extraction {
    pub fn push(&mut self, event: ExtractedEvent) {
        if event.provenance == Provenance::Fallback {
            self.recovered += 1;
        }
        let callsign = event.callsign().map(str::to_string);

        match self.groups.iter_mut().find(|g| g.identity == event.identity) {
            Some(group) => {
                if group.callsign.is_none() {
                    group.callsign = callsign;
                }
                group.records.push(event.record);
            }
            None => self.groups.push(EventGroup {
                identity: event.identity,
                records: vec![event.record],
                callsign,
            }),
        }
    }

    pub fn event_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// One table per group, or the placeholder table when empty.
    pub fn tables(&self) -> Vec<Table> {
        if self.is_empty() {
            return vec![Table::placeholder()];
        }
        self.groups.iter().map(EventGroup::to_table).collect()
    }
}

/// Output of [`FieldExtractor::run`].
#[derive(Debug, Clone)]
pub struct ExtractReport {
    pub tables: Vec<PathBuf>,
    pub events: usize,
    pub recovered: usize,
}

pub struct FieldExtractor<'a> {
    config: &'a ProcessingConfig,
    fallback: FallbackExtractor,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(config: &'a ProcessingConfig) -> Self {
        Self {
            config,
            fallback: FallbackExtractor::new(&config.identity_attribute, &config.unknown_identity),
        }
    }

    /// Extracts a single reconstituted event.
    pub fn extract_event(&self, event: &str) -> ExtractedEvent {
        match parse_strict_str(event) {
            Ok(element) => self.strict_event(&element),
            Err(e) => {
                debug!("XML parse failed ({}), using fallback extraction", e);
                self.recovered_event(self.fallback.extract(event))
            }
        }
    }

    fn strict_event(&self, event: &XmlElement) -> ExtractedEvent {
        let identity = event
            .attr(&self.config.identity_attribute)
            .unwrap_or(&self.config.unknown_identity)
            .to_string();

        let mut record = FlatRecord::new();
        if let Some(detail) = event.child("detail") {
            flatten_element(detail, "detail", &mut record);
        }

        if let Some(point) = event.child("point") {
            for attr in POINT_ATTRIBUTES {
                if let Some(value) = point.attr(attr).filter(|v| !v.is_empty()) {
                    record.insert(format!("point_{}", attr), value);
                }
            }
        }

        let remarks: Vec<String> = record
            .iter()
            .filter(|(key, _)| key.contains("remarks_text"))
            .map(|(_, value)| value.to_string())
            .collect();
        for text in remarks {
            parse_remarks_lines(&text, &mut record);
        }

        normalize_callsign(&mut record);
        ExtractedEvent {
            identity,
            provenance: Provenance::Strict,
            record,
        }
    }

    fn recovered_event(&self, mut record: FlatRecord) -> ExtractedEvent {
        let identity = record
            .get(self.fallback.identity_attribute())
            .unwrap_or(self.fallback.unknown_identity())
            .to_string();

        normalize_callsign(&mut record);
        ExtractedEvent {
            identity,
            provenance: Provenance::Fallback,
            record,
        }
    }

    /// Extracts every event of a log.
    ///
    /// Invalid UTF-8 is replaced and control characters are stripped before
    /// tokenizing.
    pub fn extract(&self, content: &[u8], sink: &mut dyn ProgressSink) -> Extraction {
        let text = String::from_utf8_lossy(content);
        let text = strip_control_chars(&text);

        let total = count_events(text.as_bytes());
        let cadence = Cadence::new(self.config.progress_interval, total);
        let mut extraction = Extraction::default();

        for (idx, fragment) in tokenize(text.as_bytes()).enumerate() {
            let event = String::from_utf8_lossy(&fragment.complete_trimmed()).into_owned();
            extraction.push(self.extract_event(&event));
            cadence.tick(sink, "Processed", idx);
        }

        extraction
    }

    /// Extracts every file of the session into `<output_dir>/CoT_Data/`.
    ///
    /// One file yields one table per group. Several files yield a single
    /// combined table with `identity` and `source_file` columns. The output
    /// directory defaults to the directory of the first file.
    pub fn run(
        &self,
        session: &Session,
        output_dir: Option<&Path>,
        sink: &mut dyn ProgressSink,
    ) -> Result<ExtractReport> {
        let primary = super::primary_file(session)?;
        let data_dir = output_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| parent_dir(&primary))
            .join(DATA_DIR);

        let mut extractions = Vec::with_capacity(session.len());
        for path in session.files() {
            sink.report(&format!("Parsing {} for CoT details export...", path.display()));
            let content = read_source(path)?;
            extractions.push((path.clone(), self.extract(&content, sink)));
        }

        let events = extractions.iter().map(|(_, e)| e.event_count()).sum();
        let recovered = extractions.iter().map(|(_, e)| e.recovered).sum();

        let tables = match extractions.as_slice() {
            [(_, single)] => single.tables(),
            many => vec![combined_table(many)],
        };

        sink.report("Writing extracted CoT details...");
        let written = write_tables(&data_dir, &tables)?;

        info!(
            files = session.len(),
            events,
            recovered,
            tables = written.len(),
            "Extraction finished"
        );
        sink.report(&format!(
            "Extraction complete. {} table(s) written to {}",
            written.len(),
            data_dir.display()
        ));

        Ok(ExtractReport {
            tables: written,
            events,
            recovered,
        })
    }
}

/// Copies the first key containing `contact_callsign` into the
/// `contact_callsign` column.
fn normalize_callsign(record: &mut FlatRecord) {
    let found = record
        .iter()
        .find(|(key, _)| key.contains(CALLSIGN_KEY))
        .map(|(_, value)| value.to_string());
    if let Some(callsign) = found {
        record.insert(CALLSIGN_KEY, callsign);
    }
}

/// Single table over several files, with explicit identity and source
/// columns ahead of the flattened fields.
pub fn combined_table(extractions: &[(PathBuf, Extraction)]) -> Table {
    let mut rows = Vec::new();
    for (path, extraction) in extractions {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        for group in &extraction.groups {
            for record in &group.records {
                let mut row = FlatRecord::new();
                row.insert("identity", group.identity.as_str());
                row.insert("source_file", source.as_str());
                for (key, value) in record.iter() {
                    if key != "identity" && key != "source_file" {
                        row.insert(key, value);
                    }
                }
                rows.push(row);
            }
        }
    }

    if rows.is_empty() {
        return Table::placeholder();
    }
    Table::from_records(COMBINED_TABLE, &rows)
}
