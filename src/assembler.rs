use crate::classifier::{HeaderColumn, RawCell, RowClass, RowClassifier, SkipReason};
use crate::config::{ColumnAlignment, PeriodBlockPolicy, PipelineConfig};
use crate::layout::{reconstruct_rows, Row};
use crate::lexicon::Lexicon;
use crate::normalizer::normalize;
use crate::schema::{Metric, MetricValue, StatementDocument, StatementKind, TextRun};
use crate::temporal::is_estimate;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub index: usize,
    pub y: f64,
    pub text: String,
    pub reason: SkipReason,
}

/// What happened to every row of one parse, so "no data" and "unclassifiable data" differ.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    pub text_runs: usize,
    pub rows: usize,
    pub header_rows: usize,
    pub metric_rows: usize,
    pub skipped: Vec<SkippedRow>,
    /// Value cells with no period column to land in.
    pub dropped_cells: usize,
    pub unresolved_transforms: usize,
    pub missing_transforms: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub document: StatementDocument,
    pub report: ParseReport,
}

pub struct StatementAssembler<'a> {
    config: &'a PipelineConfig,
    lexicon: Lexicon,
}

impl<'a> StatementAssembler<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            lexicon: config.lexicon(),
        }
    }

    pub fn assemble_runs(
        &self,
        ticker: &str,
        kind: StatementKind,
        runs: &[TextRun],
        as_of: NaiveDate,
    ) -> ParsedStatement {
        let rows = reconstruct_rows(runs, self.config.row_tolerance);
        self.assemble(ticker, kind, &rows, as_of)
    }

    pub fn assemble(
        &self,
        ticker: &str,
        kind: StatementKind,
        rows: &[Row],
        as_of: NaiveDate,
    ) -> ParsedStatement {
        let classifier = RowClassifier::new(
            kind,
            &self.lexicon,
            self.config.strict_lexicon,
            self.config.fiscal_year_end_month,
        );

        let mut document = StatementDocument::new(ticker, kind, as_of);
        let mut report = ParseReport {
            text_runs: rows.iter().map(|r| r.runs.len()).sum(),
            rows: rows.len(),
            ..ParseReport::default()
        };
        let mut declared = BTreeSet::new();
        let mut active: Vec<HeaderColumn> = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            match classifier.classify(row) {
                RowClass::PeriodHeader { columns } => {
                    report.header_rows += 1;
                    declared.extend(columns.iter().map(|c| c.period.clone()));
                    self.apply_header(&mut active, columns);
                    debug!(
                        "{} {}: row {} sets {} active period columns",
                        ticker,
                        kind,
                        index,
                        active.len()
                    );
                }
                RowClass::Metric { name, cells } => {
                    if active.is_empty() {
                        report.skipped.push(SkippedRow {
                            index,
                            y: row.y,
                            text: row.text(),
                            reason: SkipReason::NoActivePeriods(name),
                        });
                        continue;
                    }

                    report.metric_rows += 1;
                    let placed = self.align_cells(&active, &cells);
                    let dropped = cells.len() - placed.len();
                    if dropped > 0 {
                        debug!(
                            "{} {}: '{}' has {} cells with no period column",
                            ticker, kind, name, dropped
                        );
                    }
                    report.dropped_cells += dropped;

                    if !document.metrics.contains_key(&name) {
                        document.metric_order.push(name.clone());
                    }
                    let metric = document
                        .metrics
                        .entry(name.clone())
                        .or_insert_with(|| Metric::new(name.clone()));

                    for (column, cell) in placed {
                        metric.insert(MetricValue {
                            raw: cell.raw.clone(),
                            value: normalize(&cell.raw),
                            period: column.period.clone(),
                            is_estimate: is_estimate(&column.period, as_of),
                        });
                    }
                }
                RowClass::Skipped { reason } => {
                    debug!("{} {}: skipping row {} ({:?})", ticker, kind, index, reason);
                    report.skipped.push(SkippedRow {
                        index,
                        y: row.y,
                        text: row.text(),
                        reason,
                    });
                }
            }
        }

        document.periods = declared.into_iter().collect();

        ParsedStatement { document, report }
    }

    fn apply_header(&self, active: &mut Vec<HeaderColumn>, columns: Vec<HeaderColumn>) {
        match self.config.period_blocks {
            PeriodBlockPolicy::Overwrite => *active = columns,
            PeriodBlockPolicy::Merge => {
                for column in columns {
                    if !active.iter().any(|c| c.period == column.period) {
                        active.push(column);
                    }
                }
            }
        }
    }

    fn align_cells<'c>(
        &self,
        columns: &'c [HeaderColumn],
        cells: &'c [RawCell],
    ) -> Vec<(&'c HeaderColumn, &'c RawCell)> {
        match self.config.column_alignment {
            ColumnAlignment::Positional => columns.iter().zip(cells.iter()).collect(),
            ColumnAlignment::NearestHeader => {
                let mut placed: Vec<(&HeaderColumn, &RawCell)> = Vec::new();
                for cell in cells {
                    let nearest = columns.iter().min_by(|a, b| {
                        (a.x - cell.x).abs().total_cmp(&(b.x - cell.x).abs())
                    });
                    if let Some(column) = nearest {
                        // A later cell in the same column replaces the earlier one.
                        placed.retain(|(c, _)| c.period != column.period);
                        placed.push((column, cell));
                    }
                }
                placed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 30).unwrap()
    }

    fn line(y: f64, cells: &[(&str, f64)]) -> Vec<TextRun> {
        cells.iter().map(|(t, x)| TextRun::new(*t, *x, y)).collect()
    }

    #[test]
    fn test_full_pipeline_scenario() {
        let config = PipelineConfig::default();
        let input = [
            line(600.0, &[("Mar-24", 100.0), ("Jun-24", 200.0), ("Sep-24E", 300.0)]),
            line(
                580.0,
                &[("Revenue", 0.0), ("$94.0B", 100.0), ("$81.8B", 200.0), ("$89.3B", 300.0)],
            ),
        ]
        .concat();

        let parsed = StatementAssembler::new(&config).assemble_runs(
            "AAPL",
            StatementKind::IncomeStatement,
            &input,
            as_of(),
        );

        let revenue = parsed.document.metric("Revenue").unwrap();
        assert_eq!(revenue.values.len(), 3);
        assert_eq!(revenue.values[0].value, Some(94.0));
        assert!(!revenue.values[0].is_estimate);
        assert!(!revenue.values[1].is_estimate);
        assert!(revenue.values[2].is_estimate);
        assert_eq!(revenue.values[2].period.label, "Sep-24E");
        assert_eq!(parsed.document.periods.len(), 3);
        assert_eq!(parsed.report.header_rows, 1);
        assert_eq!(parsed.report.metric_rows, 1);
        assert_eq!(parsed.report.text_runs, 7);
    }

    #[test]
    fn test_overwrite_policy_switches_blocks() {
        let config = PipelineConfig::default();
        let input = [
            line(600.0, &[("Mar-25", 100.0), ("Jun-25", 200.0)]),
            line(580.0, &[("Revenue", 0.0), ("95.4", 100.0), ("94.0", 200.0)]),
            line(560.0, &[("FY2024A", 100.0), ("FY2025E", 200.0)]),
            line(540.0, &[("Revenue", 0.0), ("391.0", 100.0), ("408.6", 200.0)]),
        ]
        .concat();

        let parsed = StatementAssembler::new(&config).assemble_runs(
            "AAPL",
            StatementKind::IncomeStatement,
            &input,
            as_of(),
        );

        let revenue = parsed.document.metric("Revenue").unwrap();
        assert_eq!(revenue.values.len(), 4);
        assert_eq!(revenue.get_by_label("FY2024A").unwrap().value, Some(391.0));
        assert_eq!(revenue.get_by_label("Jun-25").unwrap().value, Some(94.0));
        assert_eq!(parsed.document.metric_order, vec!["Revenue".to_string()]);
        assert_eq!(parsed.document.periods.len(), 4);
    }

    #[test]
    fn test_merge_policy_with_nearest_header() {
        let config = PipelineConfig {
            period_blocks: PeriodBlockPolicy::Merge,
            column_alignment: ColumnAlignment::NearestHeader,
            ..PipelineConfig::default()
        };
        let input = [
            line(600.0, &[("Mar-25", 100.0), ("Jun-25", 200.0)]),
            line(590.0, &[("FY2025E", 300.0)]),
            line(570.0, &[("Gross margin", 0.0), ("47.1%", 102.0), ("46.5%", 298.0)]),
        ]
        .concat();

        let parsed = StatementAssembler::new(&config).assemble_runs(
            "AAPL",
            StatementKind::IncomeStatement,
            &input,
            as_of(),
        );

        let margin = parsed.document.metric("Gross margin").unwrap();
        assert_eq!(margin.values.len(), 2);
        assert_eq!(margin.get_by_label("Mar-25").unwrap().value, Some(47.1));
        let fy = margin.get_by_label("FY2025E").unwrap();
        assert_eq!(fy.value, Some(46.5));
        assert!(fy.is_estimate);
        assert!(margin.get_by_label("Jun-25").is_none());
    }

    #[test]
    fn test_surplus_cells_and_orphan_rows_are_reported() {
        let config = PipelineConfig::default();
        let input = [
            line(620.0, &[("Revenue", 0.0), ("1", 100.0)]),
            line(600.0, &[("Mar-25", 100.0)]),
            line(580.0, &[("Revenue", 0.0), ("95.4", 100.0), ("99.9", 200.0)]),
            line(560.0, &[("12.0", 100.0)]),
        ]
        .concat();

        let parsed = StatementAssembler::new(&config).assemble_runs(
            "AAPL",
            StatementKind::IncomeStatement,
            &input,
            as_of(),
        );

        assert_eq!(parsed.report.dropped_cells, 1);
        assert_eq!(parsed.report.skipped.len(), 2);
        assert!(matches!(
            parsed.report.skipped[0].reason,
            SkipReason::NoActivePeriods(_)
        ));
        assert!(matches!(
            parsed.report.skipped[1].reason,
            SkipReason::NumericLabel(_)
        ));
        assert_eq!(parsed.document.metric("Revenue").unwrap().values.len(), 1);
    }

    #[test]
    fn test_keyword_only_row_keeps_active_columns() {
        let config = PipelineConfig::default();
        let input = [
            line(600.0, &[("Mar-25", 100.0), ("Jun-25", 200.0)]),
            line(590.0, &[("Fiscal", 0.0), ("Quarter", 150.0)]),
            line(580.0, &[("Revenue", 0.0), ("95.4", 100.0), ("94.0", 200.0)]),
        ]
        .concat();

        let parsed = StatementAssembler::new(&config).assemble_runs(
            "AAPL",
            StatementKind::IncomeStatement,
            &input,
            as_of(),
        );

        let revenue = parsed.document.metric("Revenue").unwrap();
        assert_eq!(revenue.get_by_label("Mar-25").unwrap().value, Some(95.4));
        assert_eq!(revenue.get_by_label("Jun-25").unwrap().value, Some(94.0));
        assert_eq!(parsed.report.header_rows, 1);
        assert_eq!(parsed.report.dropped_cells, 0);
        assert_eq!(parsed.report.skipped.len(), 1);
        assert_eq!(parsed.report.skipped[0].reason, SkipReason::HeaderWithoutPeriods);
    }

    #[test]
    fn test_placeholder_cells_keep_raw_text() {
        let config = PipelineConfig::default();
        let input = [
            line(600.0, &[("Mar-25", 100.0), ("Jun-25", 200.0)]),
            line(580.0, &[("Diluted EPS", 0.0), ("n/a", 100.0), ("$1.57", 200.0)]),
        ]
        .concat();

        let parsed = StatementAssembler::new(&config).assemble_runs(
            "AAPL",
            StatementKind::IncomeStatement,
            &input,
            as_of(),
        );

        let eps = parsed.document.metric("Diluted EPS").unwrap();
        let first = eps.get_by_label("Mar-25").unwrap();
        assert_eq!(first.value, None);
        assert_eq!(first.raw, "n/a");
        assert_eq!(eps.get_by_label("Jun-25").unwrap().value, Some(1.57));
    }
}
