//! Re-chunking a log into size-bounded segments.

use crate::output::{read_source, segment_path, write_atomic};
use cotlog_core::{
    Cadence, CotLogError, ProcessingConfig, ProgressSink, Result, Session, MAX_CHUNK_MIB,
};
use cotlog_cot::{
    count_events, parse_strict, serialize_event, tokenize, EventFragment, XML_DECLARATION,
};
use std::path::PathBuf;
use tracing::{debug, info};

const MIB: u64 = 1024 * 1024;

/// Upper bound on the event bytes of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLimit {
    bytes: u64,
}

impl ChunkLimit {
    /// Validates a size requested in MiB against `max_mib` and the hard
    /// ceiling.
    pub fn from_mib(requested_mib: i64, max_mib: u64) -> Result<Self> {
        if requested_mib <= 0 {
            return Err(CotLogError::InvalidChunkSize { requested_mib });
        }

        let max_mib = max_mib.min(MAX_CHUNK_MIB);
        let requested = requested_mib as u64;
        if requested > max_mib {
            return Err(CotLogError::SizeLimitExceeded {
                requested_mib,
                max_mib,
            });
        }

        Ok(Self {
            bytes: requested * MIB,
        })
    }

    /// Limit in bytes, below the MiB granularity callers are offered.
    pub fn from_bytes(bytes: u64) -> Self {
        Self {
            bytes: bytes.clamp(1, MAX_CHUNK_MIB * MIB),
        }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Formats one fragment as a segment line.
///
/// Well-formed events are re-serialized; anything else is written as the
/// raw (lossily decoded) fragment text.
pub fn format_event(fragment: &EventFragment<'_>) -> String {
    let event = fragment.complete_trimmed();
    let mut line = match parse_strict(&event) {
        Ok(element) => serialize_event(&element),
        Err(e) => {
            debug!("Writing event at offset {} unformatted: {}", fragment.offset(), e);
            String::from_utf8_lossy(&event).into_owned()
        }
    };
    line.push('\n');
    line
}

/// Output of [`ChunkExporter::run`].
#[derive(Debug, Clone)]
pub struct ChunkReport {
    pub segments: Vec<PathBuf>,
    pub events: usize,
}

pub struct ChunkExporter<'a> {
    config: &'a ProcessingConfig,
}

impl<'a> ChunkExporter<'a> {
    pub fn new(config: &'a ProcessingConfig) -> Self {
        Self { config }
    }

    /// Splits `content` into segments in event order.
    ///
    /// Each segment starts with a declaration line that is not counted
    /// against the limit. A segment is closed before an event that would
    /// push it over the limit, unless the segment is still empty; an
    /// oversized event therefore gets a segment of its own.
    pub fn segments(
        &self,
        content: &[u8],
        limit: ChunkLimit,
        sink: &mut dyn ProgressSink,
    ) -> Vec<String> {
        let total = count_events(content);
        let cadence = Cadence::new(self.config.progress_interval, total);

        let mut segments = Vec::new();
        let mut current = new_segment();
        let mut current_size: u64 = 0;
        let mut current_events = 0usize;

        for (idx, fragment) in tokenize(content).enumerate() {
            let line = format_event(&fragment);
            let size = line.len() as u64;

            if current_events > 0 && current_size + size > limit.bytes() {
                segments.push(std::mem::replace(&mut current, new_segment()));
                current_size = 0;
                current_events = 0;
            }

            current.push_str(&line);
            current_size += size;
            current_events += 1;

            cadence.tick(sink, "Processed", idx);
        }

        if current_events > 0 {
            segments.push(current);
        }
        segments
    }

    /// Writes the segments of the session's primary file as
    /// `<stem>_Log<N>.txt`, numbered from 1.
    pub fn run(
        &self,
        session: &Session,
        limit: ChunkLimit,
        sink: &mut dyn ProgressSink,
    ) -> Result<ChunkReport> {
        let source = super::primary_file(session)?;
        let content = read_source(&source)?;

        let events = count_events(&content);
        if events == 0 {
            return Err(CotLogError::empty_stream(&source));
        }
        sink.report(&format!("Splitting and exporting the file: {}", source.display()));

        let mut written = Vec::new();
        for (number, segment) in self.segments(&content, limit, sink).iter().enumerate() {
            let path = segment_path(&source, number + 1)?;
            write_atomic(&path, segment.as_bytes())?;
            sink.report(&format!("Created: {}", path.display()));
            written.push(path);
        }

        info!(
            events,
            segments = written.len(),
            limit_bytes = limit.bytes(),
            "Chunk export finished"
        );
        sink.report(&format!(
            "File splitting and export complete. {} files created.",
            written.len()
        ));

        Ok(ChunkReport {
            segments: written,
            events,
        })
    }
}

fn new_segment() -> String {
    let mut segment = String::with_capacity(XML_DECLARATION.len() + 1);
    segment.push_str(XML_DECLARATION);
    segment.push('\n');
    segment
}
