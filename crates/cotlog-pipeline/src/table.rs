//! Tabular export of extracted records as CSV files.

use crate::output::write_atomic;
use cotlog_core::{CotLogError, Result};
use cotlog_cot::FlatRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Longest table name kept, matching spreadsheet sheet-name limits.
pub const MAX_TABLE_NAME_LEN: usize = 31;

/// Name of the placeholder table written when nothing was extracted.
pub const NO_DATA_TABLE: &str = "No_Data";

static ILLEGAL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:\[\]<>|"\x00-\x1F]"#).expect("valid regex"));

/// Strips characters unusable in sheet or file names and truncates to
/// [`MAX_TABLE_NAME_LEN`] characters.
pub fn sanitize_table_name(name: &str) -> String {
    let cleaned = ILLEGAL_NAME_RE.replace_all(name, "");
    let truncated: String = cleaned.chars().take(MAX_TABLE_NAME_LEN).collect();
    let trimmed = truncated.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        "Unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A named table with a fixed column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table whose columns are the union of record keys in first
    /// seen order. Missing cells are empty.
    pub fn from_records<'r>(name: &str, records: impl IntoIterator<Item = &'r FlatRecord>) -> Self {
        let records: Vec<&FlatRecord> = records.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        let mut known = HashSet::new();
        for record in &records {
            for key in record.keys() {
                if known.insert(key.to_string()) {
                    columns.push(key.to_string());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).unwrap_or("").to_string())
                    .collect()
            })
            .collect();

        Self {
            name: name.to_string(),
            columns,
            rows,
        }
    }

    /// Single-row table stating that no data was found.
    pub fn placeholder() -> Self {
        Self {
            name: NO_DATA_TABLE.to_string(),
            columns: vec!["Info".to_string()],
            rows: vec![vec!["No data available.".to_string()]],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// CSV encoding: header row then data rows.
    pub fn to_csv(&self) -> std::result::Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// Writes each table to `<dir>/<sanitized name>.csv`.
///
/// Names that collide after sanitizing (compared case-insensitively) get a
/// `_<n>` suffix. Returns the written paths in table order.
pub fn write_tables(dir: &Path, tables: &[Table]) -> Result<Vec<PathBuf>> {
    let mut used = HashSet::new();
    let mut written = Vec::with_capacity(tables.len());

    for table in tables {
        let name = unique_name(&sanitize_table_name(&table.name), &mut used);
        let path = dir.join(format!("{}.csv", name));
        let bytes = table.to_csv().map_err(|e| CotLogError::export(&path, e))?;
        write_atomic(&path, &bytes)?;
        debug!("Wrote table {} ({} rows)", path.display(), table.rows.len());
        written.push(path);
    }

    Ok(written)
}

fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_lowercase()) {
        return base.to_string();
    }

    let mut n = 1;
    loop {
        let suffix = format!("_{}", n);
        let keep = MAX_TABLE_NAME_LEN.saturating_sub(suffix.len());
        let candidate: String = base.chars().take(keep).collect::<String>() + &suffix;
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
