//! # Exhibit Model Builder
//!
//! A library for reconstructing tabular financial models from vector-graphics statement
//! exhibits. Statement tables rendered to SVG keep only positioned text; this crate recovers
//! rows, period columns, metric labels and values, separates actuals from estimates, and
//! derives cross-statement analytics.
//!
//! ## Pipeline
//!
//! - **Extraction**: every `<text>` node becomes a [`TextRun`] at the origin of its transform
//! - **Layout**: runs are grouped into [`Row`]s by vertical proximity, then ordered left to right
//! - **Classification**: each row is a period header, a metric row, or skipped with a reason
//! - **Assembly**: metric cells are aligned to the active period columns and normalized
//! - **Temporal**: each value is tagged actual or estimate against a caller-supplied as-of date
//! - **Analytics**: trends, segment rollups and period coverage across the four statements
//!
//! ## Example
//!
//! ```rust,ignore
//! use exhibit_model_builder::*;
//! use chrono::NaiveDate;
//! use std::path::Path;
//!
//! let config = PipelineConfig::default();
//! let as_of = NaiveDate::from_ymd_opt(2025, 7, 30).unwrap();
//!
//! let dataset = load_dataset(Path::new("./data"), "AAPL", as_of, &config)?;
//! if let Some(trend) = dataset.analytics.trend(StatementKind::IncomeStatement, "Revenue") {
//!     println!("Revenue is {:?}", trend.direction);
//! }
//!
//! if let CurrentQuarterOutcome::Extracted(extract) = dataset.current_quarter_estimates()? {
//!     println!("{}", extract.to_prompt_text());
//! }
//! ```

pub mod analytics;
pub mod assembler;
pub mod classifier;
pub mod config;
pub mod current_quarter;
pub mod dataset;
pub mod error;
pub mod extractor;
pub mod layout;
pub mod lexicon;
pub mod normalizer;
pub mod period;
pub mod schema;
pub mod temporal;
pub mod utils;

pub use analytics::{
    analyze_trend, estimate_mix, metric_trend, period_change, period_overview, segment_rollup,
    CrossStatementAnalytics, EstimateMix, PeriodChange, PeriodOverview, SegmentRollup,
    SegmentSeries, SeriesPoint, TrendDirection, TrendSummary,
};
pub use assembler::{ParseReport, ParsedStatement, SkippedRow, StatementAssembler};
pub use classifier::{HeaderColumn, RawCell, RowClass, RowClassifier, SkipReason};
pub use config::{ColumnAlignment, PeriodBlockPolicy, PipelineConfig};
pub use current_quarter::{
    extract_current_quarter, CurrentQuarterExtract, CurrentQuarterOutcome, CurrentQuarterValue,
};
pub use dataset::{load_dataset, load_statement, statement_path, FinancialDataset, LoadOutcome};
pub use error::{Result, StatementError};
pub use extractor::{
    extract_document, extract_from_path, extract_text_runs, extract_text_runs_from_path, Extraction,
};
pub use layout::{reconstruct_rows, Row, DEFAULT_ROW_TOLERANCE};
pub use lexicon::Lexicon;
pub use normalizer::normalize;
pub use period::{Period, PeriodKind, PeriodMarker};
pub use schema::*;
pub use temporal::{current_quarter, is_estimate};

use chrono::NaiveDate;
use log::{debug, info};
use std::path::Path;

pub struct StatementParser;

impl StatementParser {
    pub fn parse_svg(
        svg: &str,
        source: &str,
        ticker: &str,
        kind: StatementKind,
        as_of: NaiveDate,
        config: &PipelineConfig,
    ) -> Result<ParsedStatement> {
        config.validate()?;

        let extraction = extract_document(svg, source)?;
        Ok(Self::assemble_extraction(extraction, ticker, kind, as_of, config))
    }

    pub fn parse_file(
        path: &Path,
        ticker: &str,
        kind: StatementKind,
        as_of: NaiveDate,
        config: &PipelineConfig,
    ) -> Result<ParsedStatement> {
        config.validate()?;

        info!("Parsing {} for {} from {}", kind, ticker, path.display());
        let extraction = extract_from_path(path)?;
        Ok(Self::assemble_extraction(extraction, ticker, kind, as_of, config))
    }

    fn assemble_extraction(
        extraction: Extraction,
        ticker: &str,
        kind: StatementKind,
        as_of: NaiveDate,
        config: &PipelineConfig,
    ) -> ParsedStatement {
        let mut parsed =
            StatementAssembler::new(config).assemble_runs(ticker, kind, &extraction.runs, as_of);
        parsed.report.unresolved_transforms = extraction.unresolved_transforms;
        parsed.report.missing_transforms = extraction.missing_transforms;

        debug!(
            "{} {}: {} metrics over {} periods, {} rows skipped",
            ticker,
            kind,
            parsed.document.metrics.len(),
            parsed.document.periods.len(),
            parsed.report.skipped.len()
        );

        parsed
    }
}

pub fn parse_statement(
    svg: &str,
    ticker: &str,
    kind: StatementKind,
    as_of: NaiveDate,
    config: &PipelineConfig,
) -> Result<ParsedStatement> {
    StatementParser::parse_svg(svg, "<memory>", ticker, kind, as_of, config)
}

pub fn parse_statement_file(
    path: &Path,
    ticker: &str,
    kind: StatementKind,
    as_of: NaiveDate,
    config: &PipelineConfig,
) -> Result<ParsedStatement> {
    StatementParser::parse_file(path, ticker, kind, as_of, config)
}
