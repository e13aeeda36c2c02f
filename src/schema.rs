use crate::error::{Result, StatementError};
use crate::period::Period;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One atomic piece of positioned text from a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextRun {
    pub content: String,
    pub x: f64,
    pub y: f64,
}

impl TextRun {
    pub fn new(content: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            content: content.into(),
            x,
            y,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum StatementKind {
    #[schemars(description = "Revenue, costs, margins and per-share earnings by period")]
    IncomeStatement,
    #[schemars(description = "Assets, liabilities and equity balances at period end")]
    BalanceSheet,
    #[schemars(description = "Operating, investing and financing cash flows by period")]
    CashFlow,
    #[schemars(description = "Gross and segment margin percentages by period")]
    MarginAnalysis,
}

impl StatementKind {
    pub const ALL: [StatementKind; 4] = [
        StatementKind::IncomeStatement,
        StatementKind::BalanceSheet,
        StatementKind::CashFlow,
        StatementKind::MarginAnalysis,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            StatementKind::IncomeStatement => "Income Statement",
            StatementKind::BalanceSheet => "Balance Sheet",
            StatementKind::CashFlow => "Cash Flow",
            StatementKind::MarginAnalysis => "Margin Analysis",
        }
    }

    /// File names tried, in order, under `<data-root>/research/<TICKER>/estimates/`.
    pub fn file_candidates(&self) -> &'static [&'static str] {
        match self {
            StatementKind::IncomeStatement => &[
                "IncomeStatement.svg",
                "income_statement.svg",
                "Income_Statement.svg",
            ],
            StatementKind::BalanceSheet => &[
                "BalanceSheet.svg",
                "balance_sheet.svg",
                "Balance_Sheet.svg",
            ],
            StatementKind::CashFlow => &[
                "CashFlow.svg",
                "cash_flow.svg",
                "Cash_Flow.svg",
                "CashFlowStatement.svg",
                "cash_flow_statement.svg",
            ],
            StatementKind::MarginAnalysis => &[
                "MarginAnalysis.svg",
                "margin_analysis.svg",
                "Margin_Analysis.svg",
            ],
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for StatementKind {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "income" | "incomestatement" => Ok(StatementKind::IncomeStatement),
            "balance" | "balancesheet" => Ok(StatementKind::BalanceSheet),
            "cashflow" | "cashflowstatement" => Ok(StatementKind::CashFlow),
            "margin" | "marginanalysis" => Ok(StatementKind::MarginAnalysis),
            _ => Err(StatementError::UnknownStatementKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetricValue {
    #[schemars(description = "Cell text exactly as it appeared in the exhibit")]
    pub raw: String,
    #[schemars(description = "Numeric value, absent for placeholders such as '—' or 'n/a'")]
    pub value: Option<f64>,
    pub period: Period,
    #[schemars(description = "True when the period is a forward-looking estimate relative to the as-of date")]
    pub is_estimate: bool,
}

/// A named line item. Values are kept in chronological period order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Metric {
    pub name: String,
    pub values: Vec<MetricValue>,
}

impl Metric {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Inserts or replaces the value for `value.period`.
    pub fn insert(&mut self, value: MetricValue) {
        match self.values.binary_search_by(|v| v.period.cmp(&value.period)) {
            Ok(idx) => self.values[idx] = value,
            Err(idx) => self.values.insert(idx, value),
        }
    }

    pub fn get(&self, period: &Period) -> Option<&MetricValue> {
        self.values.iter().find(|v| &v.period == period)
    }

    pub fn get_by_label(&self, label: &str) -> Option<&MetricValue> {
        self.values.iter().find(|v| v.period.label == label)
    }

    /// Chronological numeric values, skipping placeholders.
    pub fn numeric_series(&self) -> Vec<(&Period, f64)> {
        self.values
            .iter()
            .filter_map(|v| v.value.map(|n| (&v.period, n)))
            .collect()
    }

    pub fn periods(&self) -> impl Iterator<Item = &Period> {
        self.values.iter().map(|v| &v.period)
    }
}

/// One flattened cell, the unit the knowledge-base indexer embeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatementRecord {
    pub ticker: String,
    pub statement: StatementKind,
    pub metric: String,
    pub period: String,
    pub value: Option<f64>,
    pub raw: String,
    pub is_estimate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StatementDocument {
    pub ticker: String,
    pub kind: StatementKind,
    #[schemars(description = "Reference date used to classify cells as actual or estimate")]
    pub as_of: NaiveDate,
    #[schemars(description = "Declared periods in chronological order")]
    pub periods: Vec<Period>,
    pub metrics: BTreeMap<String, Metric>,
    #[schemars(description = "Metric names in the order they appear in the exhibit")]
    pub metric_order: Vec<String>,
}

impl StatementDocument {
    pub fn new(ticker: impl Into<String>, kind: StatementKind, as_of: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            kind,
            as_of,
            periods: Vec::new(),
            metrics: BTreeMap::new(),
            metric_order: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    /// Case-insensitive lookup: exact name first, then the first metric (in exhibit order)
    /// whose name contains `needle`.
    pub fn find_metric(&self, needle: &str) -> Option<&Metric> {
        let needle = needle.to_lowercase();
        self.ordered_metrics()
            .find(|m| m.name.to_lowercase() == needle)
            .or_else(|| {
                self.ordered_metrics()
                    .find(|m| m.name.to_lowercase().contains(&needle))
            })
    }

    pub fn ordered_metrics(&self) -> impl Iterator<Item = &Metric> {
        self.metric_order
            .iter()
            .filter_map(move |name| self.metrics.get(name))
    }

    pub fn period(&self, label: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.label == label)
    }

    pub fn records(&self) -> Vec<StatementRecord> {
        self.ordered_metrics()
            .flat_map(|metric| {
                metric.values.iter().map(move |v| StatementRecord {
                    ticker: self.ticker.clone(),
                    statement: self.kind,
                    metric: metric.name.clone(),
                    period: v.period.label.clone(),
                    value: v.value,
                    raw: v.raw.clone(),
                    is_estimate: v.is_estimate,
                })
            })
            .collect()
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {} - {}\n\n", self.kind.display_name(), self.ticker));
        output.push_str(&format!("**As of:** {}\n\n", self.as_of.format("%Y-%m-%d")));

        if self.periods.is_empty() {
            output.push_str("_No periods declared._\n");
            return output;
        }

        output.push_str("| Metric |");
        for period in &self.periods {
            output.push_str(&format!(" {} |", period.label));
        }
        output.push('\n');

        output.push_str("|---|");
        for _ in &self.periods {
            output.push_str("---:|");
        }
        output.push('\n');

        for metric in self.ordered_metrics() {
            output.push_str(&format!("| {} |", metric.name));
            for period in &self.periods {
                let cell = match metric.get(period) {
                    Some(v) if v.is_estimate => format!(" {} (E) |", v.raw),
                    Some(v) => format!(" {} |", v.raw),
                    None => " |".to_string(),
                };
                output.push_str(&cell);
            }
            output.push('\n');
        }

        output
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(StatementDocument)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(raw: &str, v: Option<f64>, label: &str, is_estimate: bool) -> MetricValue {
        MetricValue {
            raw: raw.to_string(),
            value: v,
            period: Period::parse(label, 9).unwrap(),
            is_estimate,
        }
    }

    #[test]
    fn test_metric_insert_keeps_chronological_order() {
        let mut metric = Metric::new("Revenue");
        metric.insert(value("$89.3B", Some(89.3), "Sep-24E", true));
        metric.insert(value("$94.0B", Some(94.0), "Mar-24", false));
        metric.insert(value("—", None, "Jun-24", false));

        let labels: Vec<&str> = metric.periods().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Mar-24", "Jun-24", "Sep-24E"]);

        let series = metric.numeric_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].1, 89.3);

        metric.insert(value("$95.0B", Some(95.0), "Mar-24", false));
        assert_eq!(metric.values.len(), 3);
        assert_eq!(metric.get_by_label("Mar-24").unwrap().value, Some(95.0));
    }

    #[test]
    fn test_statement_kind_from_str() {
        assert_eq!(
            "balance_sheet".parse::<StatementKind>().unwrap(),
            StatementKind::BalanceSheet
        );
        assert_eq!(
            "Cash Flow".parse::<StatementKind>().unwrap(),
            StatementKind::CashFlow
        );
        assert!("ledger".parse::<StatementKind>().is_err());
    }

    #[test]
    fn test_markdown_and_records() {
        let as_of = NaiveDate::from_ymd_opt(2025, 7, 30).unwrap();
        let mut doc = StatementDocument::new("AAPL", StatementKind::IncomeStatement, as_of);
        let mut metric = Metric::new("Revenue");
        metric.insert(value("$94.0B", Some(94.0), "Mar-24", false));
        metric.insert(value("$89.3B", Some(89.3), "Sep-25", true));
        doc.periods = metric.periods().cloned().collect();
        doc.metric_order.push(metric.name.clone());
        doc.metrics.insert(metric.name.clone(), metric);

        let markdown = doc.to_markdown();
        assert!(markdown.contains("# Income Statement - AAPL"));
        assert!(markdown.contains("| Revenue | $94.0B | $89.3B (E) |"));

        let records = doc.records();
        assert_eq!(records.len(), 2);
        assert!(records[1].is_estimate);
        assert_eq!(doc.find_metric("revenue").unwrap().name, "Revenue");
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = StatementDocument::schema_as_json().unwrap();
        assert!(schema_json.contains("metric_order"));
        assert!(schema_json.contains("is_estimate"));
    }
}
