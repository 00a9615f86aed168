//! Constant-offset rewriting of event time attributes.
//!
//! The offset is taken from the first event of a log and applied to the
//! `time`, `start` and `stale` attributes of every event, so relative
//! spacing between events is preserved exactly.

use crate::output::{prefixed_sibling, read_source, write_atomic, TIME_SHIFT_PREFIX};
use chrono::{Duration, NaiveDateTime};
use cotlog_core::{Cadence, CotLogError, ProcessingConfig, ProgressSink, Result, Session};
use cotlog_cot::{
    count_events, format_cot_time, parse_logged_time, parse_strict, parse_target_time,
    serialize_event, tokenize, XmlElement, TIME_ATTRIBUTES, XML_DECLARATION,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Counts from one rewrite pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShiftSummary {
    pub total: usize,
    pub rewritten: usize,
    pub malformed: usize,
}

/// Output of [`TimeShifter::run`].
#[derive(Debug, Clone)]
pub struct ShiftReport {
    pub output: PathBuf,
    pub offset: Duration,
    pub summary: ShiftSummary,
}

pub struct TimeShifter<'a> {
    config: &'a ProcessingConfig,
}

impl<'a> TimeShifter<'a> {
    pub fn new(config: &'a ProcessingConfig) -> Self {
        Self { config }
    }

    /// Time of the first event, or `None` for a log without events.
    pub fn reference_time(&self, content: &[u8]) -> Result<Option<NaiveDateTime>> {
        let Some(first) = tokenize(content).next() else {
            return Ok(None);
        };

        let event = parse_strict(&first.complete()).map_err(|e| CotLogError::MalformedEvent {
            index: 0,
            reason: e.to_string(),
        })?;

        let attribute = &self.config.time_attribute;
        let raw = event.attr(attribute).ok_or_else(|| {
            CotLogError::invalid_time(format!("reference event has no '{}' attribute", attribute))
        })?;

        parse_logged_time(raw)
            .map(Some)
            .map_err(|e| CotLogError::invalid_time(e.0))
    }

    /// Offset from the first event's time to `target`.
    ///
    /// The target is validated before the log is looked at, so a bad
    /// target is reported even for an empty log.
    pub fn compute_offset(&self, content: &[u8], target: &str) -> Result<Option<Duration>> {
        let target = parse_target_time(target).map_err(|e| CotLogError::invalid_time(e.0))?;
        Ok(self.reference_time(content)?.map(|reference| target - reference))
    }

    /// Rewrites every strictly parsable event by `offset`.
    ///
    /// The output starts with a declaration and holds one event per line.
    /// Malformed events are dropped.
    pub fn shift(
        &self,
        content: &[u8],
        offset: Duration,
        sink: &mut dyn ProgressSink,
    ) -> (Vec<u8>, ShiftSummary) {
        let total = count_events(content);
        let cadence = Cadence::new(self.config.progress_interval, total);
        let mut summary = ShiftSummary {
            total,
            ..Default::default()
        };

        let mut output = String::with_capacity(content.len() + XML_DECLARATION.len() + 1);
        output.push_str(XML_DECLARATION);
        output.push('\n');

        for (idx, fragment) in tokenize(content).enumerate() {
            match parse_strict(&fragment.complete()) {
                Ok(mut event) => {
                    shift_event(&mut event, offset);
                    output.push_str(&serialize_event(&event));
                    output.push('\n');
                    summary.rewritten += 1;
                }
                Err(e) => {
                    debug!("Dropping malformed event {}: {}", idx, e);
                    summary.malformed += 1;
                }
            }
            cadence.tick(sink, "Adjusted", idx);
        }

        (output.into_bytes(), summary)
    }

    /// Shifts the session's primary file so its first event lands on
    /// `target`, writing `TimeAdjusted_<name>` and selecting it.
    pub fn run(
        &self,
        session: &mut Session,
        target: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<ShiftReport> {
        let source = super::primary_file(session)?;
        let content = read_source(&source)?;

        let offset = self
            .compute_offset(&content, target)?
            .ok_or_else(|| CotLogError::empty_stream(&source))?;
        info!("Shifting {} by {} seconds", source.display(), offset.num_seconds());
        sink.report(&format!("Adjusting event times in: {}", source.display()));

        let (shifted, summary) = self.shift(&content, offset, sink);
        let output = prefixed_sibling(&source, TIME_SHIFT_PREFIX)?;
        write_atomic(&output, &shifted)?;

        info!(
            total = summary.total,
            rewritten = summary.rewritten,
            malformed = summary.malformed,
            "Time shift finished"
        );
        sink.report(&format!(
            "Event times adjusted. File saved as: {}",
            output.display()
        ));

        session.select(output.clone());
        Ok(ShiftReport {
            output,
            offset,
            summary,
        })
    }
}

/// Applies `offset` to each time attribute present on `event`.
///
/// Values that cannot be parsed even after sanitizing are left untouched.
pub fn shift_event(event: &mut XmlElement, offset: Duration) {
    for attribute in TIME_ATTRIBUTES {
        let Some(raw) = event.attr(attribute).filter(|v| !v.is_empty()) else {
            continue;
        };

        let shifted = match parse_logged_time(raw) {
            Ok(time) => time.checked_add_signed(offset),
            Err(e) => {
                warn!("Leaving {} unchanged: {}", attribute, e);
                continue;
            }
        };

        match shifted {
            Some(time) => event.set_attr(attribute, format_cot_time(&time)),
            None => warn!("Leaving {} unchanged: shifted time out of range", attribute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cotlog_core::NoProgress;
    use cotlog_cot::parse_strict_str;

    const LOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<event uid="A" time="2024-01-01T00:00:00Z" start="2024-01-01T00:00:00Z" stale="2024-01-01T00:05:00Z"><point lat="1" lon="2"/></event>
<event uid="B" time="2024-01-01T12:00:00.250Z" start="2024-01-01T12:00:00Z" stale="2024-01-01T12:05:00Z"/></event>
"#;

    fn shifter_config() -> ProcessingConfig {
        ProcessingConfig::default()
    }

    #[test]
    fn test_offset_from_reference_event() {
        let config = shifter_config();
        let shifter = TimeShifter::new(&config);
        let offset = shifter
            .compute_offset(LOG.as_bytes(), "2024-01-02T00:00:00Z")
            .unwrap()
            .unwrap();
        assert_eq!(offset, Duration::hours(24));
    }

    #[test]
    fn test_shift_rewrites_all_time_attributes() {
        let config = shifter_config();
        let shifter = TimeShifter::new(&config);
        let (output, summary) = shifter.shift(LOG.as_bytes(), Duration::hours(24), &mut NoProgress);
        let output = String::from_utf8(output).unwrap();

        assert_eq!(summary.rewritten, 2);
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some(XML_DECLARATION));
        assert_eq!(
            lines.next(),
            Some(r#"<event uid="A" time="2024-01-02T00:00:00Z" start="2024-01-02T00:00:00Z" stale="2024-01-02T00:05:00Z"><point lat="1" lon="2"/></event>"#)
        );
        assert_eq!(
            lines.next(),
            Some(r#"<event uid="B" time="2024-01-02T12:00:00Z" start="2024-01-02T12:00:00Z" stale="2024-01-02T12:05:00Z"/></event>"#)
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_shift_round_trip() {
        let config = shifter_config();
        let shifter = TimeShifter::new(&config);
        let offset = Duration::seconds(-987_654);

        let (forward, _) = shifter.shift(LOG.as_bytes(), offset, &mut NoProgress);
        let (back, _) = shifter.shift(&forward, -offset, &mut NoProgress);

        let originals: Vec<_> = tokenize(LOG.as_bytes())
            .map(|f| parse_strict(&f.complete()).unwrap())
            .collect();
        let restored: Vec<_> = tokenize(&back)
            .map(|f| parse_strict(&f.complete()).unwrap())
            .collect();

        assert_eq!(originals.len(), restored.len());
        for (original, restored) in originals.iter().zip(&restored) {
            for attribute in TIME_ATTRIBUTES {
                let expected = parse_logged_time(original.attr(attribute).unwrap()).unwrap();
                let actual = parse_logged_time(restored.attr(attribute).unwrap()).unwrap();
                assert_eq!(expected, actual);
            }
        }
    }

    #[test]
    fn test_malformed_events_dropped() {
        let config = shifter_config();
        let log = "<e uid=\"A\" time=\"2024-01-01T00:00:00Z\"/></event><e uid=\"B\" time=\"x\"><broken></event>";
        let (output, summary) =
            TimeShifter::new(&config).shift(log.as_bytes(), Duration::zero(), &mut NoProgress);

        assert_eq!(summary.malformed, 1);
        assert!(!String::from_utf8(output).unwrap().contains("uid=\"B\""));
    }

    #[test]
    fn test_missing_and_damaged_attributes() {
        let mut event =
            parse_strict_str(r#"<e time="2024-01-01T1:2:3.5Z" stale="garbage" start=""/>"#).unwrap();
        shift_event(&mut event, Duration::minutes(1));

        assert_eq!(event.attr("time"), Some("2024-01-01T01:03:03Z"));
        assert_eq!(event.attr("stale"), Some("garbage"));
        assert_eq!(event.attr("start"), Some(""));
    }

    #[test]
    fn test_invalid_target_rejected() {
        let config = shifter_config();
        let err = TimeShifter::new(&config)
            .compute_offset(LOG.as_bytes(), "next tuesday")
            .unwrap_err();
        assert!(matches!(err, CotLogError::InvalidTimeFormat { .. }));

        let err = TimeShifter::new(&config)
            .compute_offset(b"", "garbage")
            .unwrap_err();
        assert!(matches!(err, CotLogError::InvalidTimeFormat { .. }));
    }

    #[test]
    fn test_empty_log_has_no_offset() {
        let config = shifter_config();
        let offset = TimeShifter::new(&config)
            .compute_offset(b"<event uid=\"partial\"", "2024-01-01T00:00:00")
            .unwrap();
        assert!(offset.is_none());
    }

    #[test]
    fn test_reference_failures() {
        let config = shifter_config();
        let shifter = TimeShifter::new(&config);

        let err = shifter.reference_time(b"<e uid=\"A\"><x></event>").unwrap_err();
        assert!(matches!(err, CotLogError::MalformedEvent { index: 0, .. }));

        let err = shifter.reference_time(b"<e uid=\"A\"/></event>").unwrap_err();
        assert!(matches!(err, CotLogError::InvalidTimeFormat { .. }));

        let err = shifter
            .reference_time(b"<e uid=\"A\" time=\"not a time\"/></event>")
            .unwrap_err();
        assert!(matches!(err, CotLogError::InvalidTimeFormat { .. }));
    }
}
