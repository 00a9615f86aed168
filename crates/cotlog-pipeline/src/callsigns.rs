//! Listing the distinct identities and callsigns seen in a log.

use crate::output::{parent_dir, read_source, write_atomic};
use cotlog_core::{Cadence, CotLogError, ProcessingConfig, ProgressSink, Result, Session};
use cotlog_cot::{count_events, parse_strict, tokenize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;

/// File receiving the sorted list.
pub const CALLSIGNS_FILE: &str = "UIDs_Callsigns.csv";

/// File receiving per-event problems.
pub const ERROR_LOG_FILE: &str = "Error_Log.txt";

/// Identities containing this marker are listed by their contact callsign.
const DEVICE_MARKER: &str = "ANDROID-";

/// Distinct values and the problems met collecting them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallsignListing {
    pub values: BTreeSet<String>,
    pub errors: Vec<String>,
}

/// Output of [`CallsignLister::run`].
#[derive(Debug, Clone)]
pub struct CallsignReport {
    pub listing: PathBuf,
    pub error_log: Option<PathBuf>,
    pub count: usize,
}

pub struct CallsignLister<'a> {
    config: &'a ProcessingConfig,
}

impl<'a> CallsignLister<'a> {
    pub fn new(config: &'a ProcessingConfig) -> Self {
        Self { config }
    }

    /// Collects identities, substituting the `contact` callsign for
    /// device identities.
    pub fn collect(&self, content: &[u8], sink: &mut dyn ProgressSink) -> CallsignListing {
        let total = count_events(content);
        let cadence = Cadence::new(self.config.progress_interval, total);
        let mut listing = CallsignListing::default();

        for (idx, fragment) in tokenize(content).enumerate() {
            match parse_strict(&fragment.complete()) {
                Ok(event) => match event.attr(&self.config.identity_attribute) {
                    None => listing.errors.push("Missing UID in event".to_string()),
                    Some(identity) if identity.contains(DEVICE_MARKER) => {
                        let callsign = event
                            .find_descendant("contact")
                            .and_then(|contact| contact.attr("callsign"));
                        match callsign {
                            Some(callsign) => {
                                listing.values.insert(callsign.to_string());
                            }
                            None => listing.errors.push(format!(
                                "Missing or malformed callsign for UID: {}",
                                identity
                            )),
                        }
                    }
                    Some(identity) => {
                        listing.values.insert(identity.to_string());
                    }
                },
                Err(_) => listing.errors.push("Malformed XML in event".to_string()),
            }
            cadence.tick(sink, "Processed", idx);
        }

        listing
    }

    /// Writes `UIDs_Callsigns.csv` (and `Error_Log.txt` when problems were
    /// found) beside the session's primary file.
    pub fn run(&self, session: &Session, sink: &mut dyn ProgressSink) -> Result<CallsignReport> {
        let source = super::primary_file(session)?;
        let content = read_source(&source)?;
        sink.report(&format!(
            "Extracting UIDs and Callsigns from: {}",
            source.display()
        ));

        let listing = self.collect(&content, sink);
        let dir = parent_dir(&source);

        let path = dir.join(CALLSIGNS_FILE);
        let mut writer = csv::Writer::from_writer(Vec::new());
        for value in &listing.values {
            writer
                .write_record([value])
                .map_err(|e| CotLogError::export(&path, e))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CotLogError::export(&path, e.error()))?;
        write_atomic(&path, &bytes)?;
        sink.report(&format!(
            "Extraction complete. UIDs and Callsigns saved to: {}",
            path.display()
        ));

        let error_log = if listing.errors.is_empty() {
            None
        } else {
            let log_path = dir.join(ERROR_LOG_FILE);
            write_atomic(&log_path, listing.errors.join("\n").as_bytes())?;
            sink.report(&format!(
                "Errors encountered. See {} for details.",
                log_path.display()
            ));
            Some(log_path)
        };

        info!(
            values = listing.values.len(),
            errors = listing.errors.len(),
            "Callsign listing finished"
        );

        Ok(CallsignReport {
            listing: path,
            error_log,
            count: listing.values.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cotlog_core::NoProgress;

    #[test]
    fn test_collect_identities_and_callsigns() {
        let log = r#"<event uid="ANDROID-1"><detail><link><contact callsign="Zulu"/></link></detail></event>
<event uid="SERVER-7"/></event>
<event uid="ANDROID-2"><detail/></event>
<event type="a-f-G"/></event>
<event uid="broken"><x></event>
<event uid="SERVER-7"/></event>
<event uid="ANDROID-3"><detail><contact callsign="Alpha"/></detail></event>"#;

        let config = ProcessingConfig::default();
        let listing = CallsignLister::new(&config).collect(log.as_bytes(), &mut NoProgress);

        assert_eq!(
            listing.values.iter().collect::<Vec<_>>(),
            vec!["Alpha", "SERVER-7", "Zulu"]
        );
        assert_eq!(
            listing.errors,
            vec![
                "Missing or malformed callsign for UID: ANDROID-2",
                "Missing UID in event",
                "Malformed XML in event",
            ]
        );
    }

    #[test]
    fn test_run_writes_error_log_only_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("feed.txt");
        std::fs::write(&source, r#"<event uid="B, Team"/></event><event uid="A"/></event>"#)
            .unwrap();

        let config = ProcessingConfig::default();
        let session = Session::load(&source).unwrap();
        let report = CallsignLister::new(&config)
            .run(&session, &mut NoProgress)
            .unwrap();

        assert_eq!(report.count, 2);
        assert!(report.error_log.is_none());
        assert!(!dir.path().join(ERROR_LOG_FILE).exists());
        assert_eq!(
            std::fs::read_to_string(&report.listing).unwrap(),
            "A\n\"B, Team\"\n"
        );
    }
}
