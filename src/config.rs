use crate::error::{Result, StatementError};
use crate::layout::DEFAULT_ROW_TOLERANCE;
use crate::lexicon::Lexicon;
use crate::schema::StatementKind;
use crate::utils::validate_fiscal_year_end_month;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PeriodBlockPolicy {
    #[default]
    #[schemars(
        description = "A new period-header row replaces the active column context (e.g. an annual block following a quarterly block)."
    )]
    Overwrite,

    #[schemars(
        description = "A new period-header row appends its columns to the active context, skipping labels already present."
    )]
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ColumnAlignment {
    #[default]
    #[schemars(description = "The i-th value cell belongs to the i-th header column.")]
    Positional,

    #[schemars(
        description = "Each value cell belongs to the header column whose x-coordinate is nearest."
    )]
    NearestHeader,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    #[schemars(
        description = "Vertical band, in layout units, within which text runs belong to the same row."
    )]
    pub row_tolerance: f64,

    #[schemars(
        description = "The month when the fiscal year ends (1 = January, 12 = December). Annual tokens resolve to this month and fiscal quarters are counted from the month after it."
    )]
    pub fiscal_year_end_month: u32,

    pub period_blocks: PeriodBlockPolicy,

    pub column_alignment: ColumnAlignment,

    #[schemars(
        description = "When true, a metric row's label must match the statement lexicon. When false, any non-numeric label is accepted."
    )]
    pub strict_lexicon: bool,

    #[schemars(
        description = "Business segments tracked across the income statement (revenue) and margin analysis (margin)."
    )]
    pub segments: Vec<String>,

    #[schemars(description = "Additional lexicon terms per statement kind.")]
    pub extra_terms: BTreeMap<StatementKind, Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            row_tolerance: DEFAULT_ROW_TOLERANCE,
            fiscal_year_end_month: 9,
            period_blocks: PeriodBlockPolicy::Overwrite,
            column_alignment: ColumnAlignment::Positional,
            strict_lexicon: true,
            segments: vec![
                "iPhone".to_string(),
                "Mac".to_string(),
                "iPad".to_string(),
                "Wearables, Home and Accessories".to_string(),
                "Services".to_string(),
            ],
            extra_terms: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.row_tolerance.is_finite() || self.row_tolerance < 0.0 {
            return Err(StatementError::InvalidTolerance(self.row_tolerance));
        }

        validate_fiscal_year_end_month(self.fiscal_year_end_month)?;

        if let Some(blank) = self.segments.iter().position(|s| s.trim().is_empty()) {
            return Err(StatementError::InvalidConfig(format!(
                "segment #{} has an empty name",
                blank
            )));
        }

        Ok(())
    }

    pub fn lexicon(&self) -> Lexicon {
        Lexicon::with_extensions(&self.segments, &self.extra_terms)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
