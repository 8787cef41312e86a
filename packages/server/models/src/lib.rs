#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime lens server.
//!
//! These types are serialized to JSON for the REST API. Field names
//! match the dashboard's observed wire format, so they stay snake_case.
//!
//! Filter parameters arrive as raw strings and are validated by the
//! filter stage — a non-integer `year` or `district` must surface as a
//! 400 with an explanatory body, not a framework deserialization error.

use std::collections::BTreeMap;

use crime_lens_analytics_models::SafeFloat;
use serde::{Deserialize, Serialize};

/// Query parameters shared by the filtered endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    /// Year filter, unparsed.
    pub year: Option<String>,
    /// Crime type filter.
    #[serde(rename = "type")]
    pub crime_type: Option<String>,
    /// District filter, unparsed.
    pub district: Option<String>,
}

/// Query parameters for the time-series endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeSeriesParams {
    /// Crime type filter.
    #[serde(rename = "type")]
    pub crime_type: Option<String>,
}

/// Query parameters for the arrest-prediction endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionParams {
    /// Year filter, unparsed.
    pub year: Option<String>,
    /// Crime type filter.
    #[serde(rename = "type")]
    pub crime_type: Option<String>,
}

/// Summary statistics over the whole dataset.
#[derive(Debug, Clone, Serialize)]
pub struct CrimeSummary {
    /// Total number of records.
    pub total_crimes: u64,
    /// Record count per crime type.
    pub crimes_by_type: BTreeMap<String, u64>,
    /// Record count per year, ascending.
    pub crimes_by_year: BTreeMap<i32, u64>,
    /// Percentage of records with an arrest.
    pub arrest_rate: SafeFloat,
    /// Percentage of records flagged domestic.
    pub domestic_rate: SafeFloat,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}
