#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Record and filter types for the crime lens dataset.
//!
//! [`CrimeRecord`] is the canonical in-memory row: one incident, immutable
//! once loaded. [`FilterSpec`] carries the optional equality predicates
//! shared by every endpoint.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single crime incident.
///
/// Coordinates are always present after load — the loader fills missing
/// values with the column means before the dataset is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrimeRecord {
    /// When the incident occurred.
    pub date: NaiveDateTime,
    /// Crime category label (e.g. `"THEFT"`).
    pub primary_type: String,
    /// Where the incident took place (e.g. `"STREET"`).
    pub location_description: Option<String>,
    /// Whether an arrest was made.
    pub arrest: bool,
    /// Whether the incident was domestic.
    pub domestic: bool,
    /// Latitude, possibly mean-filled.
    pub latitude: f64,
    /// Longitude, possibly mean-filled.
    pub longitude: f64,
    /// Police district number, when reported.
    pub district: Option<i32>,
    /// Incident year, taken from the source column or derived from `date`.
    pub year: i32,
}

/// How the `crime_type` predicate compares against `primary_type`.
///
/// The raw record endpoint matches case-insensitively; every analytic
/// endpoint matches exactly. The split mirrors the dashboard's observed
/// behavior and is part of the API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    /// Byte-for-byte equality.
    Exact,
    /// ASCII-uppercase both sides before comparing.
    IgnoreCase,
}

/// Optional equality predicates applied to the dataset.
///
/// Absent fields mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Restrict to a single year.
    pub year: Option<i32>,
    /// Restrict to a single crime type.
    pub crime_type: Option<String>,
    /// Restrict to a single police district.
    pub district: Option<i32>,
}

impl FilterSpec {
    /// Returns `true` when the record satisfies every present predicate.
    #[must_use]
    pub fn matches(&self, record: &CrimeRecord, type_match: TypeMatch) -> bool {
        if let Some(year) = self.year
            && record.year != year
        {
            return false;
        }

        if let Some(ref crime_type) = self.crime_type {
            let matched = match type_match {
                TypeMatch::Exact => record.primary_type == *crime_type,
                TypeMatch::IgnoreCase => {
                    record.primary_type.eq_ignore_ascii_case(crime_type)
                }
            };
            if !matched {
                return false;
            }
        }

        if let Some(district) = self.district
            && record.district != Some(district)
        {
            return false;
        }

        true
    }
}
