//! Dataset ingestion.
//!
//! Reads the dissertation table (comma or tab separated, one dissertation
//! per row with up to eight advisor column groups) and validates each row
//! into a [`DissertationRecord`]. Rows that fail validation are skipped and
//! reported; they never abort the load.

use crate::error::{IngestError, RecordError, Result};
use crate::model::{AdvisorRole, AdvisorSlot, Dissertation, DissertationRecord, MAX_ADVISOR_SLOTS};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Advisor ids with this value mean "no advisor" in the dataset.
const NO_ADVISOR: &str = "na";

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// A row that was rejected during ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based position of the row below the header.
    pub row: usize,
    pub error: RecordError,
}

/// Result of reading a dataset.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    /// Rows that passed validation, in file order.
    pub records: Vec<DissertationRecord>,
    /// Rows that were rejected.
    pub skipped: Vec<SkippedRow>,
    /// Total data rows seen.
    pub rows_read: usize,
}

/// Header name to column position.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();
        Self { index }
    }

    /// Returns the trimmed value of a column, or `None` when the column is
    /// absent or blank.
    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        let i = *self.index.get(name)?;
        let value = record.get(i)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn owned(&self, record: &StringRecord, name: &str) -> Option<String> {
        self.get(record, name).map(str::to_string)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reading
// ─────────────────────────────────────────────────────────────────────────────

/// Reads and validates the dataset at `path`.
pub fn read_dissertations<P: AsRef<Path>>(path: P) -> Result<LoadOutcome> {
    let path = path.as_ref();
    info!("Loading dataset from {}", path.display());
    let bytes = fs::read(path)?;
    read_dissertations_from(bytes.as_slice())
}

/// Reads and validates a dataset from any reader.
pub fn read_dissertations_from<R: Read>(mut reader: R) -> Result<LoadOutcome> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let body = bytes
        .strip_prefix("\u{feff}".as_bytes())
        .unwrap_or(&bytes[..]);
    let delimiter = detect_delimiter(body);

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(body);

    let headers = csv_reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IngestError::MissingHeader);
    }
    let columns = Columns::new(&headers);

    let mut outcome = LoadOutcome::default();

    for (i, result) in csv_reader.records().enumerate() {
        let row = i + 1;
        outcome.rows_read += 1;

        let validated = result
            .map_err(|e| RecordError::Unreadable(e.to_string()))
            .and_then(|record| validate_row(&columns, &record));

        match validated {
            Ok(record) => outcome.records.push(record),
            Err(error) => {
                warn!("Skipping row {}: {}", row, error);
                outcome.skipped.push(SkippedRow { row, error });
            }
        }
    }

    info!(
        "Read {} rows ({} accepted, {} skipped)",
        outcome.rows_read,
        outcome.records.len(),
        outcome.skipped.len()
    );

    Ok(outcome)
}

/// Picks TAB when the first line has more tabs than commas.
fn detect_delimiter(body: &[u8]) -> u8 {
    let first_line = body.split(|&b| b == b'\n').next().unwrap_or_default();
    let tabs = first_line.iter().filter(|&&b| b == b'\t').count();
    let commas = first_line.iter().filter(|&&b| b == b',').count();
    if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

fn validate_row(
    columns: &Columns,
    record: &StringRecord,
) -> std::result::Result<DissertationRecord, RecordError> {
    let id = columns
        .owned(record, "ID")
        .ok_or(RecordError::MissingDissertationId)?;
    let author_id = columns
        .owned(record, "Author_ID")
        .ok_or(RecordError::MissingAuthorId)?;
    let author_name = columns
        .owned(record, "Author_Name")
        .ok_or(RecordError::MissingAuthorName)?;

    let advisors = (1..=MAX_ADVISOR_SLOTS)
        .filter_map(|slot| advisor_slot(columns, record, slot))
        .collect();

    Ok(DissertationRecord {
        dissertation: Dissertation {
            id,
            author_id,
            title: columns.owned(record, "Title"),
            year: columns.owned(record, "Year"),
            institution_id: columns.owned(record, "School_ID"),
            institution_name: columns.owned(record, "School"),
            department: columns.owned(record, "Department"),
            subject: columns.owned(record, "Subject_broad"),
            advisors,
        },
        author_name,
        author_years: columns.owned(record, "Years"),
    })
}

fn advisor_slot(columns: &Columns, record: &StringRecord, slot: u8) -> Option<AdvisorSlot> {
    let advisor_id = columns.get(record, &format!("Advisor_ID_{}", slot))?;
    if advisor_id.eq_ignore_ascii_case(NO_ADVISOR) {
        return None;
    }

    let role = columns
        .get(record, &format!("Advisor_Role_{}", slot))
        .map(AdvisorRole::parse)
        .unwrap_or(AdvisorRole::Advisor);

    Some(AdvisorSlot {
        slot,
        advisor_id: advisor_id.to_string(),
        advisor_name: columns.owned(record, &format!("Advisor_Name_{}", slot)),
        role,
    })
}
