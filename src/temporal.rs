//! Actual-versus-estimate classification against a caller-supplied as-of date.
//!
//! Nothing here reads the wall clock; the embedding application decides what "now" is.

use crate::error::Result;
use crate::period::{Period, PeriodMarker};
use crate::utils::quarter_end_on_or_after;
use chrono::{Datelike, NaiveDate};

/// `E`-suffixed periods are always estimates. Every other period, `A`-suffixed included, is
/// an estimate iff its end date is strictly after `as_of`.
pub fn is_estimate(period: &Period, as_of: NaiveDate) -> bool {
    if period.marker == Some(PeriodMarker::Estimate) {
        return true;
    }
    period.end_date().map(|end| end > as_of).unwrap_or(false)
}

/// The quarter-end period of the fiscal quarter containing `as_of`.
pub fn current_quarter(as_of: NaiveDate, fiscal_year_end_month: u32) -> Result<Period> {
    let end = quarter_end_on_or_after(as_of, fiscal_year_end_month)?;
    Ok(Period::quarter(end.year(), end.month(), None))
}

/// Human label such as `Sep-25 (FY2025 Q4)`.
pub fn describe_quarter(period: &Period, fiscal_year_end_month: u32) -> String {
    match period.fiscal_quarter(fiscal_year_end_month) {
        Some((fiscal_year, quarter)) => {
            format!("{} (FY{} Q{})", period.label, fiscal_year, quarter)
        }
        None => period.label.clone(),
    }
}
