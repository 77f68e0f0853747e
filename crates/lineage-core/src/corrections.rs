//! Append-only log of user-submitted corrections.
//!
//! Corrections are recorded for later review; they never change the loaded
//! graph. Only the shape of a submission is checked here.

use crate::error::CorrectionError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::info;
use uuid::Uuid;

const LOG_HEADER: [&str; 5] = ["Timestamp", "User_Name", "Action_Type", "Record_ID", "Details"];

/// What a correction asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionAction {
    /// Fix details of an existing person.
    Edit,
    /// Propose a person missing from the dataset.
    AddNew,
}

impl CorrectionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrectionAction::Edit => "edit",
            CorrectionAction::AddNew => "add_new",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "edit" => Some(Self::Edit),
            "add_new" => Some(Self::AddNew),
            _ => None,
        }
    }
}

/// Proposed values; any of them may be left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionDetails {
    pub person_name: Option<String>,
    pub years: Option<String>,
    pub school: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
}

/// A correction as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    /// Name of the person submitting the correction.
    pub submitter: String,
    pub action: CorrectionAction,
    /// Person being corrected. Required for edits, ignored for additions.
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub details: CorrectionDetails,
}

/// A correction as written to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedCorrection {
    pub timestamp: String,
    pub submitter: String,
    pub action: CorrectionAction,
    pub record_id: String,
    /// The submitted details as JSON.
    pub details: String,
}

/// CSV correction log. Appends are serialized by an internal mutex.
#[derive(Debug)]
pub struct CorrectionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CorrectionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates and appends a correction.
    ///
    /// The header row is written when the log is created. Additions get a
    /// generated `NEW_` identifier, which is returned in the logged entry.
    pub fn append(&self, record: CorrectionRecord) -> Result<LoggedCorrection, CorrectionError> {
        let submitter = record.submitter.trim();
        if submitter.is_empty() {
            return Err(CorrectionError::MissingSubmitter);
        }

        let record_id = match record.action {
            CorrectionAction::Edit => record
                .record_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or(CorrectionError::MissingRecordId)?,
            CorrectionAction::AddNew => new_record_id(),
        };

        let entry = LoggedCorrection {
            timestamp: Utc::now().to_rfc3339(),
            submitter: submitter.to_string(),
            action: record.action,
            record_id,
            details: serde_json::to_string(&record.details)?,
        };

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let is_new = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::Writer::from_writer(file);

        if is_new {
            writer.write_record(LOG_HEADER)?;
        }
        writer.write_record([
            entry.timestamp.as_str(),
            entry.submitter.as_str(),
            entry.action.as_str(),
            entry.record_id.as_str(),
            entry.details.as_str(),
        ])?;
        writer.flush()?;

        info!(
            "Logged {} correction for {} from {}",
            entry.action.as_str(),
            entry.record_id,
            entry.submitter
        );

        Ok(entry)
    }

    /// Reads back every logged correction. A missing log is empty.
    pub fn entries(&self) -> Result<Vec<LoggedCorrection>, CorrectionError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut entries = Vec::new();

        for result in reader.records() {
            let row = result?;
            let field = |i: usize| row.get(i).unwrap_or_default().to_string();
            let Some(action) = CorrectionAction::parse(row.get(2).unwrap_or_default()) else {
                continue;
            };
            entries.push(LoggedCorrection {
                timestamp: field(0),
                submitter: field(1),
                action,
                record_id: field(3),
                details: field(4),
            });
        }

        Ok(entries)
    }
}

/// Temporary id for a proposed person: `NEW_` and 8 hex digits.
fn new_record_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("NEW_{}", &hex[..8])
}
