//! Per-ticker dataset loading from `<data-root>/research/<TICKER>/estimates/`.
//!
//! A missing or malformed statement never fails the dataset: it is recorded as a
//! [`LoadOutcome`] and the remaining statements are parsed and analysed as usual.

use crate::analytics::CrossStatementAnalytics;
use crate::assembler::{ParseReport, ParsedStatement};
use crate::config::PipelineConfig;
use crate::current_quarter::{extract_current_quarter, CurrentQuarterOutcome};
use crate::error::{Result, StatementError};
use crate::parse_statement_file;
use crate::schema::{StatementDocument, StatementKind};
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn estimates_dir(data_root: &Path, ticker: &str) -> PathBuf {
    data_root.join("research").join(ticker).join("estimates")
}

/// First existing file among the statement's name candidates.
pub fn statement_path(data_root: &Path, ticker: &str, kind: StatementKind) -> Option<PathBuf> {
    let dir = estimates_dir(data_root, ticker);
    kind.file_candidates()
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded {
        path: String,
        metrics: usize,
        report: ParseReport,
    },
    NotFound {
        searched: Vec<String>,
    },
    Malformed {
        path: String,
        details: String,
    },
    Unreadable {
        path: String,
        details: String,
    },
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded { .. })
    }
}

/// Up to four statements for one ticker plus the analytics derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialDataset {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub fiscal_year_end_month: u32,
    pub income_statement: Option<StatementDocument>,
    pub balance_sheet: Option<StatementDocument>,
    pub cash_flow: Option<StatementDocument>,
    pub margin_analysis: Option<StatementDocument>,
    pub outcomes: BTreeMap<StatementKind, LoadOutcome>,
    pub analytics: CrossStatementAnalytics,
}

impl FinancialDataset {
    pub fn from_statements(
        ticker: &str,
        as_of: NaiveDate,
        statements: Vec<StatementDocument>,
        config: &PipelineConfig,
    ) -> Self {
        let mut dataset = FinancialDataset {
            ticker: ticker.to_string(),
            as_of,
            fiscal_year_end_month: config.fiscal_year_end_month,
            income_statement: None,
            balance_sheet: None,
            cash_flow: None,
            margin_analysis: None,
            outcomes: BTreeMap::new(),
            analytics: CrossStatementAnalytics::default(),
        };

        for statement in statements {
            let kind = statement.kind;
            *dataset.slot_mut(kind) = Some(statement);
        }

        dataset.analytics = CrossStatementAnalytics::compute(&dataset.statements(), &config.segments);
        dataset
    }

    pub fn statement(&self, kind: StatementKind) -> Option<&StatementDocument> {
        match kind {
            StatementKind::IncomeStatement => self.income_statement.as_ref(),
            StatementKind::BalanceSheet => self.balance_sheet.as_ref(),
            StatementKind::CashFlow => self.cash_flow.as_ref(),
            StatementKind::MarginAnalysis => self.margin_analysis.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: StatementKind) -> &mut Option<StatementDocument> {
        match kind {
            StatementKind::IncomeStatement => &mut self.income_statement,
            StatementKind::BalanceSheet => &mut self.balance_sheet,
            StatementKind::CashFlow => &mut self.cash_flow,
            StatementKind::MarginAnalysis => &mut self.margin_analysis,
        }
    }

    /// Present statements in [`StatementKind::ALL`] order.
    pub fn statements(&self) -> Vec<&StatementDocument> {
        StatementKind::ALL
            .iter()
            .filter_map(|kind| self.statement(*kind))
            .collect()
    }

    pub fn missing(&self) -> Vec<StatementKind> {
        StatementKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.statement(*kind).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.statements().is_empty()
    }

    pub fn current_quarter_estimates(&self) -> Result<CurrentQuarterOutcome> {
        extract_current_quarter(
            &self.ticker,
            &self.statements(),
            self.as_of,
            self.fiscal_year_end_month,
        )
    }
}

/// Loads and parses one statement kind. The error side carries the structured outcome.
pub fn load_statement(
    data_root: &Path,
    ticker: &str,
    kind: StatementKind,
    as_of: NaiveDate,
    config: &PipelineConfig,
) -> std::result::Result<(ParsedStatement, LoadOutcome), LoadOutcome> {
    let Some(path) = statement_path(data_root, ticker, kind) else {
        let dir = estimates_dir(data_root, ticker);
        return Err(LoadOutcome::NotFound {
            searched: kind
                .file_candidates()
                .iter()
                .map(|name| dir.join(name).display().to_string())
                .collect(),
        });
    };

    let display = path.display().to_string();
    match parse_statement_file(&path, ticker, kind, as_of, config) {
        Ok(parsed) => {
            let outcome = LoadOutcome::Loaded {
                path: display,
                metrics: parsed.document.metrics.len(),
                report: parsed.report.clone(),
            };
            Ok((parsed, outcome))
        }
        Err(StatementError::MalformedDocument { details, .. }) => {
            warn!("{} {}: malformed document {}: {}", ticker, kind, display, details);
            Err(LoadOutcome::Malformed {
                path: display,
                details,
            })
        }
        Err(e) => {
            warn!("{} {}: could not read {}: {}", ticker, kind, display, e);
            Err(LoadOutcome::Unreadable {
                path: display,
                details: e.to_string(),
            })
        }
    }
}

/// Builds the dataset for `ticker`. Only an invalid `config` is an error: per-statement
/// problems are recorded in `outcomes` and the statement is left absent.
pub fn load_dataset(
    data_root: &Path,
    ticker: &str,
    as_of: NaiveDate,
    config: &PipelineConfig,
) -> Result<FinancialDataset> {
    config.validate()?;

    info!(
        "Loading statements for {} from {} as of {}",
        ticker,
        data_root.display(),
        as_of
    );

    let mut statements = Vec::new();
    let mut outcomes = BTreeMap::new();

    for kind in StatementKind::ALL {
        match load_statement(data_root, ticker, kind, as_of, config) {
            Ok((parsed, outcome)) => {
                statements.push(parsed.document);
                outcomes.insert(kind, outcome);
            }
            Err(outcome) => {
                outcomes.insert(kind, outcome);
            }
        }
    }

    let mut dataset = FinancialDataset::from_statements(ticker, as_of, statements, config);
    dataset.outcomes = outcomes;

    info!(
        "{}: {} of {} statements loaded",
        ticker,
        dataset.statements().len(),
        StatementKind::ALL.len()
    );

    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_statement_path_prefers_first_candidate() {
        let root = tempfile::tempdir().unwrap();
        let dir = estimates_dir(root.path(), "AAPL");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("balance_sheet.svg"), "<svg/>").unwrap();
        fs::write(dir.join("Balance_Sheet.svg"), "<svg/>").unwrap();

        let path = statement_path(root.path(), "AAPL", StatementKind::BalanceSheet).unwrap();
        assert!(path.ends_with("balance_sheet.svg"));
        assert!(statement_path(root.path(), "AAPL", StatementKind::CashFlow).is_none());
    }

    #[test]
    fn test_missing_and_malformed_outcomes() {
        let root = tempfile::tempdir().unwrap();
        let dir = estimates_dir(root.path(), "MSFT");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("CashFlow.svg"), "<svg><text>").unwrap();

        let as_of = NaiveDate::from_ymd_opt(2025, 7, 30).unwrap();
        let dataset =
            load_dataset(root.path(), "MSFT", as_of, &PipelineConfig::default()).unwrap();

        assert!(dataset.is_empty());
        assert_eq!(dataset.missing().len(), 4);
        assert!(matches!(
            dataset.outcomes[&StatementKind::CashFlow],
            LoadOutcome::Malformed { .. }
        ));
        match &dataset.outcomes[&StatementKind::IncomeStatement] {
            LoadOutcome::NotFound { searched } => assert_eq!(searched.len(), 3),
            other => panic!("expected not found, got {:?}", other),
        }
        assert!(dataset.analytics.trends.is_empty());
    }

    #[test]
    fn test_invalid_config_fails_before_reading_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = estimates_dir(root.path(), "AAPL");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("IncomeStatement.svg"), "<svg/>").unwrap();

        let config = PipelineConfig {
            fiscal_year_end_month: 13,
            ..PipelineConfig::default()
        };
        let as_of = NaiveDate::from_ymd_opt(2025, 7, 30).unwrap();
        let result = load_dataset(root.path(), "AAPL", as_of, &config);
        assert!(matches!(
            result,
            Err(StatementError::InvalidFiscalYearEndMonth(13))
        ));
    }

    #[test]
    fn test_from_statements_places_each_kind() {
        let as_of = NaiveDate::from_ymd_opt(2025, 7, 30).unwrap();
        let statements = vec![
            StatementDocument::new("AAPL", StatementKind::MarginAnalysis, as_of),
            StatementDocument::new("AAPL", StatementKind::IncomeStatement, as_of),
        ];

        let dataset = FinancialDataset::from_statements(
            "AAPL",
            as_of,
            statements,
            &PipelineConfig::default(),
        );

        assert!(dataset.income_statement.is_some());
        assert!(dataset.margin_analysis.is_some());
        assert_eq!(
            dataset.missing(),
            vec![StatementKind::BalanceSheet, StatementKind::CashFlow]
        );
        let kinds: Vec<StatementKind> = dataset.statements().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![StatementKind::IncomeStatement, StatementKind::MarginAnalysis]
        );
    }
}
