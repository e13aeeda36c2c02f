use crate::error::{Result, StatementError};
use chrono::{Datelike, Days, NaiveDate};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.checked_sub_days(Days::new(1)))
        .ok_or_else(|| {
            StatementError::DateError(format!("No month end for {:04}-{:02}", year, month))
        })
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(StatementError::InvalidFiscalYearEndMonth(month));
    }
    Ok(())
}

/// Returns the 0-based index of the month within the fiscal year.
///
/// # Examples
/// - If FY ends in Dec (12): Jan=0, Feb=1, ..., Dec=11
/// - If FY ends in Sep (9): Oct=0, Nov=1, ..., Sep=11
pub fn get_fiscal_month_index(calendar_month: u32, fiscal_year_end_month: u32) -> usize {
    let fy_start_month = if fiscal_year_end_month == 12 {
        1
    } else {
        fiscal_year_end_month + 1
    };

    if calendar_month >= fy_start_month {
        (calendar_month - fy_start_month) as usize
    } else {
        (calendar_month + 12 - fy_start_month) as usize
    }
}

/// Fiscal year and 1-based fiscal quarter that a calendar month belongs to.
/// A fiscal year is named after the calendar year in which it ends.
pub fn fiscal_quarter_of(year: i32, month: u32, fiscal_year_end_month: u32) -> (i32, u32) {
    let fiscal_year = if month <= fiscal_year_end_month {
        year
    } else {
        year + 1
    };
    let quarter = get_fiscal_month_index(month, fiscal_year_end_month) as u32 / 3 + 1;
    (fiscal_year, quarter)
}

pub fn is_quarter_end_month(month: u32, fiscal_year_end_month: u32) -> bool {
    (month + 12 - fiscal_year_end_month) % 3 == 0
}

/// The quarter-end date of the fiscal quarter containing `date`.
pub fn quarter_end_on_or_after(date: NaiveDate, fiscal_year_end_month: u32) -> Result<NaiveDate> {
    validate_fiscal_year_end_month(fiscal_year_end_month)?;

    let mut year = date.year();
    let mut month = date.month();
    while !is_quarter_end_month(month, fiscal_year_end_month) {
        if month == 12 {
            month = 1;
            year += 1;
        } else {
            month += 1;
        }
    }

    last_day_of_month(year, month)
}

pub fn month_from_abbreviation(token: &str) -> Option<u32> {
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(token))
        .map(|idx| idx as u32 + 1)
}

pub fn month_abbreviation(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_ABBREVIATIONS[(month - 1) as usize],
        _ => "???",
    }
}

/// Two-digit years in exhibit headers are always this century.
pub fn expand_two_digit_year(yy: i32) -> i32 {
    if yy < 100 {
        2000 + yy
    } else {
        yy
    }
}
