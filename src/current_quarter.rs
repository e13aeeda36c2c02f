//! Projection of assembled statements onto the fiscal quarter containing the as-of date.
//!
//! The projection never touches the statements it reads and returns the same result for the
//! same `as_of`.

use crate::error::Result;
use crate::period::Period;
use crate::schema::{StatementDocument, StatementKind};
use crate::temporal::{current_quarter, describe_quarter};
use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CurrentQuarterValue {
    pub value: f64,
    pub raw: String,
    pub period: String,
    pub is_estimate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CurrentQuarterExtract {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub period: Period,
    #[schemars(description = "Period label with its fiscal year and quarter, e.g. 'Sep-25 (FY2025 Q4)'")]
    pub fiscal_label: String,
    pub statements: BTreeMap<StatementKind, BTreeMap<String, CurrentQuarterValue>>,
}

impl CurrentQuarterExtract {
    pub fn metric_count(&self) -> usize {
        self.statements.values().map(BTreeMap::len).sum()
    }

    /// The single plain-text block handed to the prompt layer.
    pub fn to_prompt_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} current quarter {} as of {}\n",
            self.ticker,
            self.fiscal_label,
            self.as_of.format("%Y-%m-%d")
        ));

        for (kind, metrics) in &self.statements {
            output.push_str(&format!("\n{}:\n", kind.display_name()));
            for (name, cell) in metrics {
                let status = if cell.is_estimate { "estimate" } else { "actual" };
                output.push_str(&format!(
                    "- {}: {} (raw \"{}\", {}, {})\n",
                    name, cell.value, cell.raw, cell.period, status
                ));
            }
        }

        output
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CurrentQuarterOutcome {
    Extracted(CurrentQuarterExtract),
    /// No statement carried a numeric value for the current quarter.
    NoEstimateData { ticker: String, period: Period },
}

impl CurrentQuarterOutcome {
    pub fn extract(&self) -> Option<&CurrentQuarterExtract> {
        match self {
            CurrentQuarterOutcome::Extracted(extract) => Some(extract),
            CurrentQuarterOutcome::NoEstimateData { .. } => None,
        }
    }
}

/// Collects every metric with a numeric value in the quarter containing `as_of`. A quarter
/// column matches regardless of its `A`/`E` suffix.
pub fn extract_current_quarter(
    ticker: &str,
    statements: &[&StatementDocument],
    as_of: NaiveDate,
    fiscal_year_end_month: u32,
) -> Result<CurrentQuarterOutcome> {
    let period = current_quarter(as_of, fiscal_year_end_month)?;
    let mut collected: BTreeMap<StatementKind, BTreeMap<String, CurrentQuarterValue>> =
        BTreeMap::new();

    for statement in statements {
        let Some(column) = statement
            .periods
            .iter()
            .find(|p| p.same_interval(&period))
        else {
            debug!(
                "{} {}: no column for {}",
                ticker, statement.kind, period.label
            );
            continue;
        };

        let metrics: BTreeMap<String, CurrentQuarterValue> = statement
            .ordered_metrics()
            .filter_map(|metric| {
                let cell = metric.values.iter().find(|v| v.period.same_interval(column))?;
                let value = cell.value?;
                Some((
                    metric.name.clone(),
                    CurrentQuarterValue {
                        value,
                        raw: cell.raw.clone(),
                        period: cell.period.label.clone(),
                        is_estimate: cell.is_estimate,
                    },
                ))
            })
            .collect();

        if !metrics.is_empty() {
            collected.insert(statement.kind, metrics);
        }
    }

    if collected.is_empty() {
        return Ok(CurrentQuarterOutcome::NoEstimateData {
            ticker: ticker.to_string(),
            period,
        });
    }

    Ok(CurrentQuarterOutcome::Extracted(CurrentQuarterExtract {
        ticker: ticker.to_string(),
        as_of,
        fiscal_label: describe_quarter(&period, fiscal_year_end_month),
        period,
        statements: collected,
    }))
}
