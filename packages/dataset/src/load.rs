//! CSV loader for the crime dataset.
//!
//! Reads the raw export once, validates the header, parses rows into
//! [`CrimeRecord`]s, and fills missing coordinates with the column means.
//! Rows with an unparseable date or an empty crime type are skipped.

use std::io::Read;
use std::path::Path;

use chrono::{Datelike as _, NaiveDateTime};
use crime_lens_dataset_models::CrimeRecord;

use crate::{CrimeDataset, DatasetError};

/// Columns that must be present in the file header.
const REQUIRED_COLUMNS: &[&str] = &[
    "Date",
    "Primary Type",
    "Latitude",
    "Longitude",
    "Year",
    "Arrest",
    "Domestic",
];

/// Loads the dataset from a CSV file on disk.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file cannot be opened, the header is
/// missing required columns, or the CSV is malformed.
pub fn load_csv(path: &Path) -> Result<CrimeDataset, DatasetError> {
    let file = std::fs::File::open(path)?;
    from_reader(file)
}

/// Loads the dataset from any CSV byte stream.
///
/// # Errors
///
/// Returns [`DatasetError`] if the header is missing required columns or
/// the CSV is malformed.
pub fn from_reader<R: Read>(reader: R) -> Result<CrimeDataset, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| column(name).is_none())
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DatasetError::MissingColumns { columns: missing });
    }

    let date_idx = column("Date").unwrap_or_default();
    let type_idx = column("Primary Type").unwrap_or_default();
    let lat_idx = column("Latitude").unwrap_or_default();
    let lng_idx = column("Longitude").unwrap_or_default();
    let year_idx = column("Year").unwrap_or_default();
    let arrest_idx = column("Arrest").unwrap_or_default();
    let domestic_idx = column("Domestic").unwrap_or_default();
    let district_idx = column("District");
    let location_idx = column("Location Description");

    // First pass: parse rows, keeping coordinates optional so the means
    // can be computed over present values only.
    #[allow(clippy::items_after_statements)]
    struct ParsedRow {
        record: CrimeRecord,
        latitude: Option<f64>,
        longitude: Option<f64>,
    }

    let mut rows: Vec<ParsedRow> = Vec::new();
    let mut skipped: u64 = 0;

    for result in csv_reader.records() {
        let row = result?;
        let field = |idx: usize| row.get(idx).unwrap_or("").trim();

        let Some(date) = parse_date(field(date_idx)) else {
            log::debug!("Skipping row with unparseable date '{}'", field(date_idx));
            skipped += 1;
            continue;
        };

        let primary_type = field(type_idx).to_string();
        if primary_type.is_empty() {
            skipped += 1;
            continue;
        }

        let year = field(year_idx)
            .parse::<i32>()
            .unwrap_or_else(|_| date.year());

        let location_description = location_idx
            .map(|idx| field(idx).to_string())
            .filter(|s| !s.is_empty());

        let district = district_idx
            .and_then(|idx| parse_district(field(idx)));

        rows.push(ParsedRow {
            record: CrimeRecord {
                date,
                primary_type,
                location_description,
                arrest: parse_bool(field(arrest_idx)),
                domestic: parse_bool(field(domestic_idx)),
                latitude: 0.0,
                longitude: 0.0,
                district,
                year,
            },
            latitude: parse_coordinate(field(lat_idx)),
            longitude: parse_coordinate(field(lng_idx)),
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} unparseable rows while loading dataset");
    }

    // Second pass: fill absent coordinates with the column means.
    let lat_mean = mean(rows.iter().filter_map(|r| r.latitude));
    let lng_mean = mean(rows.iter().filter_map(|r| r.longitude));

    let records: Vec<CrimeRecord> = rows
        .into_iter()
        .map(|row| {
            let mut record = row.record;
            record.latitude = row.latitude.unwrap_or(lat_mean);
            record.longitude = row.longitude.unwrap_or(lng_mean);
            record
        })
        .collect();

    log::info!("Loaded {} crime records", records.len());
    Ok(CrimeDataset::new(records))
}

/// Parses a timestamp in any of the formats the municipal exports use.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    for format in [
        "%m/%d/%Y %I:%M:%S %p",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    None
}

/// Parses a boolean flag column. Accepts `true`/`false` in any case and
/// `0`/`1`; anything else is `false`.
#[must_use]
pub fn parse_bool(s: &str) -> bool {
    s.eq_ignore_ascii_case("true") || s == "1"
}

/// Parses a coordinate, rejecting non-finite values.
fn parse_coordinate(s: &str) -> Option<f64> {
    let value = s.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Parses a district number. Some exports carry the column as a float
/// (`"8.0"`) once missing values appear, so fall back to a float parse.
#[allow(clippy::cast_possible_truncation)]
fn parse_district(s: &str) -> Option<i32> {
    if let Ok(n) = s.parse::<i32>() {
        return Some(n);
    }
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v as i32)
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count: u64 = 0;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}
