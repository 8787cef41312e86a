#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analytic result types for the crime lens dashboard.
//!
//! These types are serialized to JSON for the REST API. Every float leaf
//! is a [`SafeFloat`], so a payload can never carry a literal `NaN` or
//! `Infinity` token regardless of nesting depth.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// Ceiling substituted for `+Infinity` at serialization time.
pub const DISPLAY_CHANGE_CAP: f64 = 40.0;

/// A display-safe float.
///
/// Serializes `NaN` as `null` and infinities as ±[`DISPLAY_CHANGE_CAP`].
/// Finite values pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SafeFloat(pub f64);

impl SafeFloat {
    /// The wrapped value, unsanitized.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for SafeFloat {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Serialize for SafeFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_nan() {
            serializer.serialize_none()
        } else if self.0 == f64::INFINITY {
            serializer.serialize_f64(DISPLAY_CHANGE_CAP)
        } else if self.0 == f64::NEG_INFINITY {
            serializer.serialize_f64(-DISPLAY_CHANGE_CAP)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// One crime type's estimated average monthly change, in percent.
#[derive(Debug, Clone, Serialize)]
pub struct CrimeTrend {
    /// Crime category label.
    pub crime_type: String,
    /// Estimated average monthly percentage change.
    pub avg_monthly_change: SafeFloat,
}

impl CrimeTrend {
    /// Convenience constructor.
    #[must_use]
    pub fn new(crime_type: impl Into<String>, change: f64) -> Self {
        Self {
            crime_type: crime_type.into(),
            avg_monthly_change: SafeFloat(change),
        }
    }
}

/// Trend analysis output: which crime types are rising and falling.
///
/// Each list holds at most five entries, sorted descending by magnitude
/// of change within its direction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendSummary {
    /// Crime types with rising incidence.
    pub increasing_crimes: Vec<CrimeTrend>,
    /// Crime types with falling incidence.
    pub decreasing_crimes: Vec<CrimeTrend>,
}

impl TrendSummary {
    /// Whether both direction lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.increasing_crimes.is_empty() && self.decreasing_crimes.is_empty()
    }
}

/// The center of one spatial hotspot cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterCenter {
    /// Cluster label.
    pub cluster_id: i64,
    /// Mean latitude of assigned points.
    pub lat: f64,
    /// Mean longitude of assigned points.
    pub lon: f64,
    /// Number of assigned points.
    pub count: u64,
}

/// Hotspot clustering output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterResult {
    /// Number of clusters found (noise excluded).
    pub n_clusters: usize,
    /// Per-cluster centers with point counts.
    pub cluster_centers: Vec<ClusterCenter>,
    /// Point count per cluster label.
    pub cluster_counts: BTreeMap<i64, u64>,
}

/// One feature's importance in the arrest classifier.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureImportance {
    /// Encoded feature name (e.g. `"primary_type_THEFT"`).
    pub feature: String,
    /// Mean impurity decrease attributed to the feature.
    pub importance: SafeFloat,
}

/// Arrest classifier metrics.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    /// Accuracy on the training split.
    pub train_accuracy: SafeFloat,
    /// Accuracy on the held-out split.
    pub test_accuracy: SafeFloat,
    /// Top features by importance, descending, at most ten.
    pub top_features: Vec<FeatureImportance>,
    /// Always `"success"`.
    pub status: String,
}

/// Outcome of an arrest-prediction request.
///
/// Insufficient input volume is a value, not an error — it serializes as
/// `{"error": ..., "status": "error"}`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    /// The model trained and was evaluated.
    Ready(PredictionResult),
    /// Too few usable rows to train.
    InsufficientData {
        /// Human-readable explanation.
        error: String,
        /// Always `"error"`.
        status: String,
    },
}

impl PredictionOutcome {
    /// The marker returned when fewer than the minimum usable rows exist.
    #[must_use]
    pub fn insufficient_data() -> Self {
        Self::InsufficientData {
            error: "Not enough data for prediction model".to_string(),
            status: "error".to_string(),
        }
    }
}
