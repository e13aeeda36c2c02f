//! Row classification: period-header rows, metric rows, and skipped rows with a reason.

use crate::layout::Row;
use crate::lexicon::Lexicon;
use crate::normalizer::{is_null_token, looks_numeric};
use crate::period::{contains_header_keyword, periods_in_text, Period};
use crate::schema::StatementKind;
use serde::{Deserialize, Serialize};

/// A value cell as it appeared in the exhibit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    pub raw: String,
    pub x: f64,
}

/// A period column declared by a header row, with the x-coordinate of its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderColumn {
    pub period: Period,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    Empty,
    /// Leftmost run contains a digit, currency or percent sign: an unlabeled continuation.
    NumericLabel(String),
    /// Leftmost run is a placeholder ("—", "n/a") where the label should be.
    PlaceholderLabel(String),
    /// Label not in the statement lexicon.
    UnknownMetric(String),
    /// Label with no value cells after it.
    NoValues(String),
    /// Header keywords ("Quarter", "Fiscal", "Calendar") without any period token.
    HeaderWithoutPeriods,
    /// Metric row seen before any period-header row.
    NoActivePeriods(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowClass {
    PeriodHeader { columns: Vec<HeaderColumn> },
    Metric { name: String, cells: Vec<RawCell> },
    Skipped { reason: SkipReason },
}

impl RowClass {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RowClass::Skipped { .. })
    }

    pub fn periods(&self) -> Vec<&Period> {
        match self {
            RowClass::PeriodHeader { columns } => columns.iter().map(|c| &c.period).collect(),
            _ => Vec::new(),
        }
    }
}

pub struct RowClassifier<'a> {
    kind: StatementKind,
    lexicon: &'a Lexicon,
    strict_lexicon: bool,
    fiscal_year_end_month: u32,
}

impl<'a> RowClassifier<'a> {
    pub fn new(
        kind: StatementKind,
        lexicon: &'a Lexicon,
        strict_lexicon: bool,
        fiscal_year_end_month: u32,
    ) -> Self {
        Self {
            kind,
            lexicon,
            strict_lexicon,
            fiscal_year_end_month,
        }
    }

    /// Header detection runs first, so a row matching both a period token and a lexicon term
    /// is a header.
    pub fn classify(&self, row: &Row) -> RowClass {
        if row.is_empty() {
            return RowClass::Skipped {
                reason: SkipReason::Empty,
            };
        }

        if let Some(class) = self.classify_header(row) {
            return class;
        }

        self.classify_metric(row)
    }

    fn classify_header(&self, row: &Row) -> Option<RowClass> {
        let mut columns: Vec<HeaderColumn> = Vec::new();
        let mut has_keyword = false;

        for run in &row.runs {
            for period in periods_in_text(&run.content, self.fiscal_year_end_month) {
                if !columns.iter().any(|c| c.period == period) {
                    columns.push(HeaderColumn { period, x: run.x });
                }
            }
            has_keyword |= contains_header_keyword(&run.content);
        }

        if !columns.is_empty() {
            Some(RowClass::PeriodHeader { columns })
        } else if has_keyword {
            Some(RowClass::Skipped {
                reason: SkipReason::HeaderWithoutPeriods,
            })
        } else {
            None
        }
    }

    fn classify_metric(&self, row: &Row) -> RowClass {
        let leftmost = &row.runs[0].content;
        if looks_numeric(leftmost) {
            return RowClass::Skipped {
                reason: SkipReason::NumericLabel(leftmost.clone()),
            };
        }

        if is_null_token(leftmost) {
            return RowClass::Skipped {
                reason: SkipReason::PlaceholderLabel(leftmost.clone()),
            };
        }

        let label_len = row
            .runs
            .iter()
            .take_while(|r| !looks_numeric(&r.content) && !is_null_token(&r.content))
            .count();
        let name = row.runs[..label_len]
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        if label_len == row.runs.len() {
            return RowClass::Skipped {
                reason: SkipReason::NoValues(name),
            };
        }

        if self.strict_lexicon && !self.lexicon.matches(self.kind, &name) {
            return RowClass::Skipped {
                reason: SkipReason::UnknownMetric(name),
            };
        }

        let cells = row.runs[label_len..]
            .iter()
            .map(|r| RawCell {
                raw: r.content.clone(),
                x: r.x,
            })
            .collect();

        RowClass::Metric { name, cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TextRun;

    fn row(cells: &[(&str, f64)]) -> Row {
        Row {
            y: 100.0,
            runs: cells
                .iter()
                .map(|(text, x)| TextRun::new(*text, *x, 100.0))
                .collect(),
        }
    }

    fn classify(kind: StatementKind, r: &Row) -> RowClass {
        let lexicon = Lexicon::builtin();
        RowClassifier::new(kind, &lexicon, true, 9).classify(r)
    }

    #[test]
    fn test_period_header() {
        let header = row(&[("Mar-24", 100.0), ("Jun-24", 200.0), ("Sep-24E", 300.0)]);
        match classify(StatementKind::IncomeStatement, &header) {
            RowClass::PeriodHeader { columns } => {
                let labels: Vec<&str> = columns.iter().map(|c| c.period.label.as_str()).collect();
                assert_eq!(labels, vec!["Mar-24", "Jun-24", "Sep-24E"]);
                assert_eq!(columns[2].x, 300.0);
            }
            other => panic!("expected header, got {:?}", other),
        }
    }

    #[test]
    fn test_header_takes_priority_over_lexicon() {
        let mixed = row(&[("Revenue", 0.0), ("FY2024A", 100.0), ("FY2025E", 200.0)]);
        let class = classify(StatementKind::IncomeStatement, &mixed);
        assert_eq!(class.periods().len(), 2);
    }

    #[test]
    fn test_metric_row_with_multi_run_label() {
        let metric = row(&[("Net", 0.0), ("income", 30.0), ("$23.6", 100.0), ("—", 200.0)]);
        match classify(StatementKind::IncomeStatement, &metric) {
            RowClass::Metric { name, cells } => {
                assert_eq!(name, "Net income");
                assert_eq!(cells.len(), 2);
                assert_eq!(cells[1].raw, "—");
            }
            other => panic!("expected metric, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_leftmost_is_skipped() {
        let continuation = row(&[("$12.1", 100.0), ("$13.0", 200.0)]);
        assert_eq!(
            classify(StatementKind::IncomeStatement, &continuation),
            RowClass::Skipped {
                reason: SkipReason::NumericLabel("$12.1".to_string())
            }
        );
    }

    #[test]
    fn test_lexicon_is_statement_specific() {
        let assets = row(&[("Total assets", 0.0), ("352,583", 100.0)]);
        assert!(matches!(
            classify(StatementKind::BalanceSheet, &assets),
            RowClass::Metric { .. }
        ));
        assert_eq!(
            classify(StatementKind::MarginAnalysis, &assets),
            RowClass::Skipped {
                reason: SkipReason::UnknownMetric("Total assets".to_string())
            }
        );

        let lexicon = Lexicon::builtin();
        let lenient = RowClassifier::new(StatementKind::MarginAnalysis, &lexicon, false, 9);
        assert!(matches!(lenient.classify(&assets), RowClass::Metric { .. }));
    }

    #[test]
    fn test_keyword_only_header_and_label_only_rows() {
        let keywords = row(&[("Fiscal", 0.0), ("Quarter", 50.0)]);
        assert_eq!(
            classify(StatementKind::IncomeStatement, &keywords),
            RowClass::Skipped {
                reason: SkipReason::HeaderWithoutPeriods
            }
        );

        let title = row(&[("Revenue", 0.0), ("Summary", 40.0)]);
        assert_eq!(
            classify(StatementKind::IncomeStatement, &title),
            RowClass::Skipped {
                reason: SkipReason::NoValues("Revenue Summary".to_string())
            }
        );
    }

    #[test]
    fn test_placeholder_in_label_position_is_skipped() {
        let lexicon = Lexicon::builtin();
        let orphan = row(&[("—", 0.0), ("5.0", 100.0)]);

        for strict in [true, false] {
            let classifier =
                RowClassifier::new(StatementKind::IncomeStatement, &lexicon, strict, 9);
            assert_eq!(
                classifier.classify(&orphan),
                RowClass::Skipped {
                    reason: SkipReason::PlaceholderLabel("—".to_string())
                }
            );
        }

        let lone = row(&[("n/a", 0.0)]);
        assert_eq!(
            classify(StatementKind::IncomeStatement, &lone),
            RowClass::Skipped {
                reason: SkipReason::PlaceholderLabel("n/a".to_string())
            }
        );
    }
}
