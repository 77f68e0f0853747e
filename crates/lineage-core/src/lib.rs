//! Lineage Core - Dissertation records and dataset ingestion
//!
//! This crate defines the entities of the academic genealogy dataset
//! (people, institutions, dissertations and their advisor slots) and turns
//! the raw dissertation table into validated records.
//!
//! # Overview
//!
//! - [`ingest`] reads the tabular dataset and validates every row into a
//!   [`DissertationRecord`]. Malformed rows are skipped, never fatal.
//! - [`normalize`] folds case, accents and whitespace so that "José" and
//!   "Jose" match the same index entries.
//! - [`corrections`] appends user-submitted corrections to a CSV log.
//!
//! # Example
//!
//! ```no_run
//! use lineage_core::read_dissertations;
//!
//! let outcome = read_dissertations("data/dissertations.csv").unwrap();
//! println!("{} records, {} skipped", outcome.records.len(), outcome.skipped.len());
//! ```

pub mod corrections;
mod error;
pub mod ingest;
mod model;
pub mod normalize;

pub use corrections::{
    CorrectionAction, CorrectionDetails, CorrectionLog, CorrectionRecord, LoggedCorrection,
};
pub use error::{CorrectionError, IngestError, RecordError, Result};
pub use ingest::{read_dissertations, read_dissertations_from, LoadOutcome, SkippedRow};
pub use model::{
    AdvisorRole, AdvisorSlot, Dissertation, DissertationRecord, Institution, Person,
    MAX_ADVISOR_SLOTS,
};
pub use normalize::normalize;
