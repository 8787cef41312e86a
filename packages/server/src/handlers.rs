//! HTTP handler functions for the crime lens API.
//!
//! Every handler narrows the cached dataset through the filter stage,
//! runs one analytic component, and returns display-safe JSON. Internal
//! failures degrade to a well-formed `{"error": ...}` object.

use std::collections::{BTreeMap, BTreeSet};

use actix_web::{HttpResponse, web};
use chrono::{Datelike as _, NaiveDate};
use crime_lens_analytics::rng::{Lcg, sample_without_replacement};
use crime_lens_analytics::{cluster, predict, sanitize, trends};
use crime_lens_analytics_models::SafeFloat;
use crime_lens_dataset::filter::{self, FilterError};
use crime_lens_dataset_models::{CrimeRecord, FilterSpec, TypeMatch};
use crime_lens_server_models::{
    ApiHealth, CrimeSummary, FilterParams, PredictionParams, TimeSeriesParams,
};

use crate::AppState;

/// Cap on rows/points returned by the raw record and heatmap endpoints.
const MAX_RESPONSE_ROWS: usize = 5000;

/// Seed for response-level down-sampling, so a filter combination
/// always returns the same rows.
const SAMPLE_SEED: u64 = 42;

/// City-center fallback point when no valid coordinates match.
const FALLBACK_POINT: [f64; 2] = [41.8781, -87.6298];

/// Display-valid latitude bounds (exclusive).
const LAT_RANGE: (f64, f64) = (30.0, 50.0);

/// Display-valid longitude bounds (exclusive).
const LNG_RANGE: (f64, f64) = (-100.0, -70.0);

fn bad_request(err: &FilterError) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": err.to_string() }))
}

fn parse_spec(
    year: Option<&str>,
    crime_type: Option<&str>,
    district: Option<&str>,
) -> Result<FilterSpec, HttpResponse> {
    filter::parse_filters(year, crime_type, district).map_err(|e| {
        log::debug!("Rejected filter: {e}");
        bad_request(&e)
    })
}

/// Down-samples a view to `cap` rows with a seeded shuffle. Views at or
/// below the cap pass through untouched.
fn sample_view<'a>(view: Vec<&'a CrimeRecord>, cap: usize) -> Vec<&'a CrimeRecord> {
    if view.len() <= cap {
        return view;
    }
    let mut rng = Lcg::new(SAMPLE_SEED);
    sample_without_replacement(view.len(), cap, &mut rng)
        .into_iter()
        .map(|i| view[i])
        .collect()
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/crime-data`
///
/// Raw filtered records, capped at [`MAX_RESPONSE_ROWS`]. The crime type
/// filter matches case-insensitively on this endpoint only.
pub async fn crime_data(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let spec = match parse_spec(
        params.year.as_deref(),
        params.crime_type.as_deref(),
        params.district.as_deref(),
    ) {
        Ok(spec) => spec,
        Err(resp) => return resp,
    };

    let view = filter::apply(state.dataset.records(), &spec, TypeMatch::IgnoreCase);
    let rows: Vec<&CrimeRecord> = view.into_iter().take(MAX_RESPONSE_ROWS).collect();
    HttpResponse::Ok().json(rows)
}

/// `GET /api/crime-summary`
#[allow(clippy::cast_precision_loss)]
pub async fn crime_summary(state: web::Data<AppState>) -> HttpResponse {
    let records = state.dataset.records();

    let mut crimes_by_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut crimes_by_year: BTreeMap<i32, u64> = BTreeMap::new();
    let mut arrests: u64 = 0;
    let mut domestic: u64 = 0;

    for record in records {
        *crimes_by_type.entry(record.primary_type.clone()).or_default() += 1;
        *crimes_by_year.entry(record.year).or_default() += 1;
        if record.arrest {
            arrests += 1;
        }
        if record.domestic {
            domestic += 1;
        }
    }

    let total = records.len() as f64;

    HttpResponse::Ok().json(CrimeSummary {
        total_crimes: records.len() as u64,
        crimes_by_type,
        crimes_by_year,
        arrest_rate: SafeFloat(arrests as f64 / total * 100.0),
        domestic_rate: SafeFloat(domestic as f64 / total * 100.0),
    })
}

/// `GET /api/heatmap-data`
///
/// Coordinate pairs for the heatmap layer, range-validated and capped.
/// An empty result degrades to a single city-center point.
pub async fn heatmap_data(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let spec = match parse_spec(
        params.year.as_deref(),
        params.crime_type.as_deref(),
        params.district.as_deref(),
    ) {
        Ok(spec) => spec,
        Err(resp) => return resp,
    };

    let view = filter::apply(state.dataset.records(), &spec, TypeMatch::Exact);
    if view.is_empty() {
        return HttpResponse::Ok().json(vec![FALLBACK_POINT]);
    }

    let sampled = sample_view(view, MAX_RESPONSE_ROWS);
    let points: Vec<[f64; 2]> = sampled
        .into_iter()
        .filter(|r| {
            r.latitude > LAT_RANGE.0
                && r.latitude < LAT_RANGE.1
                && r.longitude > LNG_RANGE.0
                && r.longitude < LNG_RANGE.1
        })
        .map(|r| [r.latitude, r.longitude])
        .collect();

    if points.is_empty() {
        return HttpResponse::Ok().json(vec![FALLBACK_POINT]);
    }
    HttpResponse::Ok().json(points)
}

/// `GET /api/crime-types`
pub async fn crime_types(state: web::Data<AppState>) -> HttpResponse {
    let types: BTreeSet<&str> = state
        .dataset
        .records()
        .iter()
        .map(|r| r.primary_type.as_str())
        .collect();
    HttpResponse::Ok().json(types)
}

/// `GET /api/years`
pub async fn years(state: web::Data<AppState>) -> HttpResponse {
    let years: BTreeSet<i32> = state.dataset.records().iter().map(|r| r.year).collect();
    HttpResponse::Ok().json(years)
}

/// `GET /api/districts`
pub async fn districts(state: web::Data<AppState>) -> HttpResponse {
    let districts: BTreeSet<i32> = state
        .dataset
        .records()
        .iter()
        .filter_map(|r| r.district)
        .collect();
    HttpResponse::Ok().json(districts)
}

/// `GET /api/time-series`
///
/// Monthly incident counts as `[ISO-timestamp, count]` pairs.
pub async fn time_series(
    state: web::Data<AppState>,
    params: web::Query<TimeSeriesParams>,
) -> HttpResponse {
    let spec = match parse_spec(None, params.crime_type.as_deref(), None) {
        Ok(spec) => spec,
        Err(resp) => return resp,
    };

    let view = filter::apply(state.dataset.records(), &spec, TypeMatch::Exact);

    let mut monthly: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for record in view {
        *monthly
            .entry((record.date.year(), record.date.month()))
            .or_default() += 1;
    }

    let series: Vec<(String, u64)> = monthly
        .into_iter()
        .filter_map(|((year, month), count)| {
            let stamp = NaiveDate::from_ymd_opt(year, month, 1)?
                .and_hms_opt(0, 0, 0)?
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string();
            Some((stamp, count))
        })
        .collect();

    HttpResponse::Ok().json(series)
}

/// `GET /api/clusters`
pub async fn clusters(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let spec = match parse_spec(
        params.year.as_deref(),
        params.crime_type.as_deref(),
        params.district.as_deref(),
    ) {
        Ok(spec) => spec,
        Err(resp) => return resp,
    };

    let view = filter::apply(state.dataset.records(), &spec, TypeMatch::Exact);
    HttpResponse::Ok().json(cluster::cluster_hotspots(&view))
}

/// `GET /api/arrest-prediction`
pub async fn arrest_prediction(
    state: web::Data<AppState>,
    params: web::Query<PredictionParams>,
) -> HttpResponse {
    let spec = match parse_spec(params.year.as_deref(), params.crime_type.as_deref(), None) {
        Ok(spec) => spec,
        Err(resp) => return resp,
    };

    let view = filter::apply(state.dataset.records(), &spec, TypeMatch::Exact);
    let sampled = sample_view(view, predict::MAX_PREDICTION_SAMPLE);
    HttpResponse::Ok().json(predict::predict_arrests(&sampled))
}

/// `GET /api/crime-trends`
///
/// Trend cascade output, clamped by the response sanitizer.
pub async fn crime_trends(
    state: web::Data<AppState>,
    params: web::Query<FilterParams>,
) -> HttpResponse {
    let spec = match parse_spec(
        params.year.as_deref(),
        params.crime_type.as_deref(),
        params.district.as_deref(),
    ) {
        Ok(spec) => spec,
        Err(resp) => return resp,
    };

    let view = filter::apply(state.dataset.records(), &spec, TypeMatch::Exact);

    // Jitter in the heuristic tier is display noise, so it seeds from
    // the clock; the measuring tiers ignore the generator entirely.
    let mut rng = Lcg::from_time();
    let summary = sanitize::finalize_trends(trends::analyze_trends(&view, &mut rng));
    HttpResponse::Ok().json(summary)
}
