//! Response-layer clamp for trend payloads.
//!
//! Runs after the trend cascade and before serialization: drops any
//! entry that is still non-finite and caps displayed changes at
//! ±[`DISPLAY_CHANGE_CAP`]. The Tier-2 ±50 bound and this ±40 bound are
//! distinct calibrations — they are applied at their own call sites, not
//! unified. `NaN`/`Infinity` never reach the wire regardless, because
//! every float leaf serializes through
//! [`SafeFloat`](crime_lens_analytics_models::SafeFloat).

use crime_lens_analytics_models::{CrimeTrend, DISPLAY_CHANGE_CAP, TrendSummary};

/// Applies the final display clamp to a trend summary.
#[must_use]
pub fn finalize_trends(summary: TrendSummary) -> TrendSummary {
    let clamp_list = |trends: Vec<CrimeTrend>, decreasing: bool| -> Vec<CrimeTrend> {
        trends
            .into_iter()
            .filter(|t| t.avg_monthly_change.value().is_finite())
            .map(|t| {
                let change = t.avg_monthly_change.value();
                let clamped = if decreasing && change < 0.0 {
                    (-change.abs()).max(-DISPLAY_CHANGE_CAP)
                } else if !decreasing && change > 0.0 {
                    change.abs().min(DISPLAY_CHANGE_CAP)
                } else {
                    change
                };
                CrimeTrend::new(t.crime_type, clamped)
            })
            .collect()
    };

    TrendSummary {
        increasing_crimes: clamp_list(summary.increasing_crimes, false),
        decreasing_crimes: clamp_list(summary.decreasing_crimes, true),
    }
}
