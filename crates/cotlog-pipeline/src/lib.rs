//! Processing passes over CoT event logs
//!
//! Each pass reads the selected log once, streams its events through and
//! writes its own artifacts. Passes never call each other; they share only
//! the tokenizer and parsers from `cotlog-cot`.
//!
//! | Pass | Artifact |
//! |------|----------|
//! | [`Deduplicator`] | `NoDuplicates_<name>` |
//! | [`TimeShifter`] | `TimeAdjusted_<name>` |
//! | [`ChunkExporter`] | `<stem>_Log<N>.txt` |
//! | [`FieldExtractor`] | `CoT_Data/<group>.csv` |
//! | [`CallsignLister`] | `UIDs_Callsigns.csv`, `Error_Log.txt` |
//!
//! # Example
//!
//! ```
//! use cotlog_core::{NoProgress, ProcessingConfig};
//! use cotlog_pipeline::Deduplicator;
//!
//! let config = ProcessingConfig::default();
//! let log = br#"<e uid="A" time="2024-01-01T00:00:00Z"/></event><e uid="A" time="2024-01-01T00:00:00Z"/></event>"#;
//! let (output, summary) = Deduplicator::new(&config).dedup(log, &mut NoProgress);
//! assert_eq!(summary.kept, 1);
//! assert!(output.starts_with(b"<?xml"));
//! ```

pub mod callsigns;
pub mod chunk;
pub mod dedup;
pub mod extract;
pub mod output;
pub mod table;
pub mod timeshift;

pub use callsigns::{CallsignListing, CallsignLister, CallsignReport};
pub use chunk::{format_event, ChunkExporter, ChunkLimit, ChunkReport};
pub use dedup::{DedupKey, DedupReport, DedupSummary, Deduplicator};
pub use extract::{
    combined_table, flatten_element, EventGroup, ExtractReport, ExtractedEvent, Extraction,
    FieldExtractor,
};
pub use table::{sanitize_table_name, write_tables, Table};
pub use timeshift::{shift_event, ShiftReport, ShiftSummary, TimeShifter};

use cotlog_core::{CotLogError, Result, Session};
use std::path::PathBuf;

/// The file a single-file pass operates on.
fn primary_file(session: &Session) -> Result<PathBuf> {
    session
        .primary()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| CotLogError::not_a_file("<no file selected>"))
}
