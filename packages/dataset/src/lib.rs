#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV loading and filtering for the crime lens dataset.
//!
//! The dataset is loaded once at startup, validated, and published as an
//! immutable [`CrimeDataset`]. Every endpoint narrows it through
//! [`filter::apply`], which always allocates a fresh view — the loaded
//! records are never mutated.

pub mod filter;
pub mod load;

use crime_lens_dataset_models::CrimeRecord;

/// Errors that can occur while loading the dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// I/O error (file missing or unreadable).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// The file header is missing required columns.
    #[error("Missing required columns in data file: {}", columns.join(", "))]
    MissingColumns {
        /// The absent column names.
        columns: Vec<String>,
    },
}

/// The loaded dataset. Immutable after construction.
#[derive(Debug, Clone)]
pub struct CrimeDataset {
    records: Vec<CrimeRecord>,
}

impl CrimeDataset {
    /// Wraps already-parsed records.
    #[must_use]
    pub fn new(records: Vec<CrimeRecord>) -> Self {
        Self { records }
    }

    /// All records, in file order.
    #[must_use]
    pub fn records(&self) -> &[CrimeRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
