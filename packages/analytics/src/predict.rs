//! Arrest-probability classifier over filtered incidents.
//!
//! One-hot encodes the categorical features, trains a random forest on a
//! seeded 80/20 split, and reports split accuracies plus the top feature
//! importances. Too little usable data is a value, not an error.

use std::collections::BTreeSet;

use crime_lens_analytics_models::{
    FeatureImportance, PredictionOutcome, PredictionResult, SafeFloat,
};
use crime_lens_dataset_models::CrimeRecord;

use crate::forest::{ForestConfig, RandomForest};
use crate::rng::{Lcg, sample_without_replacement};

/// Minimum usable rows required to train at all.
pub const MIN_PREDICTION_ROWS: usize = 100;

/// Maximum rows sampled from the filtered view before training.
pub const MAX_PREDICTION_SAMPLE: usize = 10_000;

/// Seed for both the input sample and the train/test shuffle.
pub const SPLIT_SEED: u64 = 42;

/// How many features the response reports.
const TOP_FEATURES: usize = 10;

/// Trains the arrest classifier and reports its metrics.
///
/// Usable rows have a non-empty `primary_type` and a present
/// `location_description`; fewer than [`MIN_PREDICTION_ROWS`] of them
/// yields the insufficient-data marker.
#[must_use]
pub fn predict_arrests(records: &[&CrimeRecord]) -> PredictionOutcome {
    let usable: Vec<&CrimeRecord> = records
        .iter()
        .copied()
        .filter(|r| !r.primary_type.is_empty() && r.location_description.is_some())
        .collect();

    if usable.len() < MIN_PREDICTION_ROWS {
        return PredictionOutcome::insufficient_data();
    }

    let (feature_names, rows) = encode(&usable);
    let labels: Vec<bool> = usable.iter().map(|r| r.arrest).collect();

    // Seeded 80/20 split: shuffle once, last fifth held out.
    let mut rng = Lcg::new(SPLIT_SEED);
    let shuffled = sample_without_replacement(rows.len(), rows.len(), &mut rng);
    let test_len = rows.len() / 5;
    let (train_idx, test_idx) = shuffled.split_at(rows.len() - test_len);

    let take = |indices: &[usize]| -> (Vec<Vec<f64>>, Vec<bool>) {
        (
            indices.iter().map(|&i| rows[i].clone()).collect(),
            indices.iter().map(|&i| labels[i]).collect(),
        )
    };
    let (train_rows, train_labels) = take(train_idx);
    let (test_rows, test_labels) = take(test_idx);

    let forest = RandomForest::fit(&train_rows, &train_labels, &ForestConfig::default());

    let mut ranked: Vec<FeatureImportance> = feature_names
        .iter()
        .zip(forest.feature_importances())
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance: SafeFloat(importance),
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.importance
            .value()
            .partial_cmp(&a.importance.value())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    ranked.truncate(TOP_FEATURES);

    PredictionOutcome::Ready(PredictionResult {
        train_accuracy: SafeFloat(forest.accuracy(&train_rows, &train_labels)),
        test_accuracy: SafeFloat(forest.accuracy(&test_rows, &test_labels)),
        top_features: ranked,
        status: "success".to_string(),
    })
}

/// One-hot encodes `primary_type` and `location_description`; `domestic`
/// is a single 0/1 column.
fn encode(records: &[&CrimeRecord]) -> (Vec<String>, Vec<Vec<f64>>) {
    let types: BTreeSet<&str> =
        records.iter().map(|r| r.primary_type.as_str()).collect();
    let locations: BTreeSet<&str> = records
        .iter()
        .filter_map(|r| r.location_description.as_deref())
        .collect();

    let type_names: Vec<&str> = types.into_iter().collect();
    let location_names: Vec<&str> = locations.into_iter().collect();

    let mut feature_names: Vec<String> = Vec::new();
    for name in &type_names {
        feature_names.push(format!("primary_type_{name}"));
    }
    for name in &location_names {
        feature_names.push(format!("location_description_{name}"));
    }
    feature_names.push("domestic".to_string());

    let width = feature_names.len();
    let rows: Vec<Vec<f64>> = records
        .iter()
        .map(|record| {
            let mut row = vec![0.0; width];
            if let Ok(i) =
                type_names.binary_search(&record.primary_type.as_str())
            {
                row[i] = 1.0;
            }
            if let Some(location) = record.location_description.as_deref()
                && let Ok(i) = location_names.binary_search(&location)
            {
                row[type_names.len() + i] = 1.0;
            }
            if record.domestic {
                row[width - 1] = 1.0;
            }
            row
        })
        .collect();

    (feature_names, rows)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(
        primary_type: &str,
        location: Option<&str>,
        arrest: bool,
    ) -> CrimeRecord {
        CrimeRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            primary_type: primary_type.to_string(),
            location_description: location.map(ToString::to_string),
            arrest,
            domestic: false,
            latitude: 41.88,
            longitude: -87.63,
            district: Some(1),
            year: 2024,
        }
    }

    fn outcome(records: &[CrimeRecord]) -> PredictionOutcome {
        let refs: Vec<&CrimeRecord> = records.iter().collect();
        predict_arrests(&refs)
    }

    #[test]
    fn too_few_rows_yields_the_marker() {
        let records: Vec<CrimeRecord> = (0..99)
            .map(|_| record("THEFT", Some("STREET"), false))
            .collect();
        assert!(matches!(
            outcome(&records),
            PredictionOutcome::InsufficientData { .. }
        ));
    }

    #[test]
    fn rows_without_location_are_not_usable() {
        // 150 rows, but only 80 carry a location description.
        let mut records: Vec<CrimeRecord> = (0..80)
            .map(|_| record("THEFT", Some("STREET"), false))
            .collect();
        records.extend((0..70).map(|_| record("THEFT", None, true)));
        assert!(matches!(
            outcome(&records),
            PredictionOutcome::InsufficientData { .. }
        ));
    }

    #[test]
    fn exactly_one_hundred_usable_rows_trains() {
        let records: Vec<CrimeRecord> = (0..100)
            .map(|i| record("THEFT", Some("STREET"), i % 2 == 0))
            .collect();
        assert!(matches!(outcome(&records), PredictionOutcome::Ready(_)));
    }

    #[test]
    fn learns_a_type_determined_arrest_rule() {
        let mut records = Vec::new();
        for i in 0..200 {
            let location = if i % 2 == 0 { "STREET" } else { "RESIDENCE" };
            records.push(record("NARCOTICS", Some(location), true));
            records.push(record("THEFT", Some(location), false));
        }
        let PredictionOutcome::Ready(result) = outcome(&records) else {
            panic!("expected a trained model");
        };

        assert!(result.train_accuracy.value() > 0.95);
        assert!(result.test_accuracy.value() > 0.9);
        assert_eq!(result.status, "success");

        // The determining feature carries the importance.
        let top = &result.top_features[0];
        assert!(
            top.feature == "primary_type_NARCOTICS"
                || top.feature == "primary_type_THEFT"
        );
    }

    #[test]
    fn importances_are_sorted_and_capped() {
        let records: Vec<CrimeRecord> = (0..400)
            .map(|i| {
                let t = format!("TYPE_{}", i % 20);
                record(&t, Some("STREET"), i % 3 == 0)
            })
            .collect();
        let PredictionOutcome::Ready(result) = outcome(&records) else {
            panic!("expected a trained model");
        };
        assert!(result.top_features.len() <= 10);
        for pair in result.top_features.windows(2) {
            assert!(
                pair[0].importance.value() >= pair[1].importance.value()
            );
        }
        for feature in &result.top_features {
            let v = feature.importance.value();
            assert!(v.is_finite() && v >= 0.0);
        }
    }

    #[test]
    fn prediction_is_reproducible() {
        let records: Vec<CrimeRecord> = (0..300)
            .map(|i| record("THEFT", Some("STREET"), i % 4 == 0))
            .collect();
        let a = outcome(&records);
        let b = outcome(&records);
        let (PredictionOutcome::Ready(a), PredictionOutcome::Ready(b)) = (a, b)
        else {
            panic!("expected trained models");
        };
        assert_eq!(a.train_accuracy.value(), b.train_accuracy.value());
        assert_eq!(a.test_accuracy.value(), b.test_accuracy.value());
    }
}
