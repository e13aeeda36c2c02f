//! Reporting-period tokens found in exhibit header rows.
//!
//! Three token families are recognised:
//! - quarter-end tokens: `Mar-24`, `Sep-24E`
//! - fiscal-year tokens: `FY2024`, `FY2025E`
//! - bare-year tokens with a marker: `2024A`, `2026E`
//!
//! A bare four-digit year without a marker is not a period; it is indistinguishable from a
//! value cell.

use crate::error::Result;
use crate::utils::{
    expand_two_digit_year, fiscal_quarter_of, last_day_of_month, month_abbreviation,
    month_from_abbreviation,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

static QUARTER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)-(\d{2})([ae])?$")
        .expect("quarter token pattern is valid")
});

static FISCAL_YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^fy'?(\d{4})([ae])?$").expect("fiscal year token pattern is valid")
});

static BARE_YEAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{4})([ae])$").expect("bare year token pattern is valid"));

static HEADER_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(quarter|fiscal|calendar)\b").expect("header keyword pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PeriodKind {
    #[schemars(description = "A fiscal quarter identified by its quarter-end month")]
    Quarterly,
    #[schemars(description = "A full fiscal year identified by the year in which it ends")]
    Annual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PeriodMarker {
    Actual,
    Estimate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Period {
    #[schemars(description = "Normalized label, e.g. 'Mar-24', 'Sep-24E' or 'FY2025E'")]
    pub label: String,
    pub kind: PeriodKind,
    #[schemars(description = "Calendar year of the period end")]
    pub year: i32,
    #[schemars(description = "Calendar month (1-12) of the period end")]
    pub month: u32,
    #[schemars(description = "Explicit actual/estimate suffix carried by the token, if any")]
    pub marker: Option<PeriodMarker>,
}

impl Period {
    /// Parses a single header token. Annual tokens resolve to the fiscal-year-end month.
    pub fn parse(token: &str, fiscal_year_end_month: u32) -> Option<Self> {
        let token = token.trim();

        if let Some(caps) = QUARTER_TOKEN.captures(token) {
            let month = month_from_abbreviation(&caps[1])?;
            let yy: i32 = caps[2].parse().ok()?;
            let marker = caps.get(3).and_then(|m| parse_marker(m.as_str()));
            return Some(Self::quarter(expand_two_digit_year(yy), month, marker));
        }

        let annual = FISCAL_YEAR_TOKEN
            .captures(token)
            .or_else(|| BARE_YEAR_TOKEN.captures(token));
        if let Some(caps) = annual {
            let year: i32 = caps[1].parse().ok()?;
            let marker = caps.get(2).and_then(|m| parse_marker(m.as_str()));
            return Some(Self::annual(year, fiscal_year_end_month, marker));
        }

        None
    }

    pub fn quarter(year: i32, month: u32, marker: Option<PeriodMarker>) -> Self {
        let label = format!(
            "{}-{:02}{}",
            month_abbreviation(month),
            year.rem_euclid(100),
            marker_suffix(marker)
        );
        Self {
            label,
            kind: PeriodKind::Quarterly,
            year,
            month,
            marker,
        }
    }

    pub fn annual(year: i32, fiscal_year_end_month: u32, marker: Option<PeriodMarker>) -> Self {
        Self {
            label: format!("FY{}{}", year, marker_suffix(marker)),
            kind: PeriodKind::Annual,
            year,
            month: fiscal_year_end_month,
            marker,
        }
    }

    pub fn is_quarterly(&self) -> bool {
        self.kind == PeriodKind::Quarterly
    }

    pub fn is_annual(&self) -> bool {
        self.kind == PeriodKind::Annual
    }

    pub fn end_date(&self) -> Result<NaiveDate> {
        last_day_of_month(self.year, self.month)
    }

    /// `(fiscal_year, quarter)` for quarter tokens, e.g. `Dec-25` is FY2026 Q1 for a
    /// September year end.
    pub fn fiscal_quarter(&self, fiscal_year_end_month: u32) -> Option<(i32, u32)> {
        match self.kind {
            PeriodKind::Quarterly => Some(fiscal_quarter_of(
                self.year,
                self.month,
                fiscal_year_end_month,
            )),
            PeriodKind::Annual => None,
        }
    }

    /// Same reporting interval, ignoring any actual/estimate suffix.
    pub fn same_interval(&self, other: &Period) -> bool {
        self.kind == other.kind && self.year == other.year && self.month == other.month
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month, self.kind, &self.label).cmp(&(
            other.year,
            other.month,
            other.kind,
            &other.label,
        ))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Splits a run on whitespace and returns every period token it contains.
pub fn periods_in_text(text: &str, fiscal_year_end_month: u32) -> Vec<Period> {
    text.split_whitespace()
        .filter_map(|token| Period::parse(token, fiscal_year_end_month))
        .collect()
}

pub fn contains_header_keyword(text: &str) -> bool {
    HEADER_KEYWORD.is_match(text)
}

fn parse_marker(suffix: &str) -> Option<PeriodMarker> {
    match suffix {
        "A" | "a" => Some(PeriodMarker::Actual),
        "E" | "e" => Some(PeriodMarker::Estimate),
        _ => None,
    }
}

fn marker_suffix(marker: Option<PeriodMarker>) -> &'static str {
    match marker {
        Some(PeriodMarker::Actual) => "A",
        Some(PeriodMarker::Estimate) => "E",
        None => "",
    }
}
