//! Filter stage shared by every endpoint.
//!
//! Parses raw query-string values into a [`FilterSpec`] and narrows the
//! dataset into a fresh borrowed view. The cached records are never
//! mutated.

use crime_lens_dataset_models::{CrimeRecord, FilterSpec, TypeMatch};

/// Errors from parsing filter values.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// A year/district value that is not an integer.
    #[error("Invalid {field} filter value '{value}': expected an integer")]
    InvalidFilterValue {
        /// Which query parameter was malformed.
        field: &'static str,
        /// The raw value received.
        value: String,
    },
}

/// Parses optional raw query values into a [`FilterSpec`].
///
/// Empty strings count as absent, matching the dashboard's behavior when
/// a filter dropdown is cleared.
///
/// # Errors
///
/// Returns [`FilterError::InvalidFilterValue`] when `year` or `district`
/// is present but not parseable as an integer.
pub fn parse_filters(
    year: Option<&str>,
    crime_type: Option<&str>,
    district: Option<&str>,
) -> Result<FilterSpec, FilterError> {
    let year = parse_int_filter("year", year)?;
    let district = parse_int_filter("district", district)?;
    let crime_type = crime_type
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(FilterSpec {
        year,
        crime_type,
        district,
    })
}

fn parse_int_filter(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<i32>, FilterError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i32>()
            .map(Some)
            .map_err(|_| FilterError::InvalidFilterValue {
                field,
                value: raw.to_string(),
            }),
    }
}

/// Applies the filter to the dataset, returning a fresh view of matching
/// records.
#[must_use]
pub fn apply<'a>(
    records: &'a [CrimeRecord],
    spec: &FilterSpec,
    type_match: TypeMatch,
) -> Vec<&'a CrimeRecord> {
    records
        .iter()
        .filter(|record| spec.matches(record, type_match))
        .collect()
}
