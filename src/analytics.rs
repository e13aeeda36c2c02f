//! Comparative analytics derived from assembled statements. Everything here is recomputed on
//! demand and holds no state of its own.

use crate::period::{Period, PeriodKind};
use crate::schema::{Metric, StatementDocument, StatementKind};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Number of trailing (recent) and leading (earlier) values averaged by trend analysis.
pub const TREND_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum TrendDirection {
    Improving,
    Declining,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    pub magnitude: f64,
    pub recent_average: f64,
    pub earlier_average: f64,
    pub latest_value: f64,
    pub sample_count: usize,
}

pub fn analyze_trend(values: &[f64]) -> TrendSummary {
    let latest_value = values.last().copied().unwrap_or(0.0);

    if values.len() < 2 {
        return TrendSummary {
            direction: TrendDirection::InsufficientData,
            magnitude: 0.0,
            recent_average: latest_value,
            earlier_average: latest_value,
            latest_value,
            sample_count: values.len(),
        };
    }

    // With fewer than six values the two windows overlap.
    let window = TREND_WINDOW.min(values.len());
    let recent_average = mean(&values[values.len() - window..]);
    let earlier_average = mean(&values[..window]);

    let direction = if recent_average > earlier_average {
        TrendDirection::Improving
    } else {
        TrendDirection::Declining
    };

    TrendSummary {
        direction,
        magnitude: (recent_average - earlier_average).abs(),
        recent_average,
        earlier_average,
        latest_value,
        sample_count: values.len(),
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeriesPoint {
    pub period: String,
    pub value: f64,
    pub is_estimate: bool,
}

/// Numeric points of one metric at a single cadence: quarterly when the metric has any
/// quarterly values, annual otherwise. Mixing the two would compare a quarter to a year.
pub fn trend_points(metric: &Metric) -> Vec<SeriesPoint> {
    let has_quarterly = metric
        .values
        .iter()
        .any(|v| v.value.is_some() && v.period.is_quarterly());
    let cadence = if has_quarterly {
        PeriodKind::Quarterly
    } else {
        PeriodKind::Annual
    };

    metric
        .values
        .iter()
        .filter(|v| v.period.kind == cadence)
        .filter_map(|v| {
            v.value.map(|value| SeriesPoint {
                period: v.period.label.clone(),
                value,
                is_estimate: v.is_estimate,
            })
        })
        .collect()
}

pub fn metric_trend(metric: &Metric) -> TrendSummary {
    let values: Vec<f64> = trend_points(metric).iter().map(|p| p.value).collect();
    analyze_trend(&values)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentSeries {
    pub metric: String,
    pub statement: StatementKind,
    pub points: Vec<SeriesPoint>,
    pub trend: TrendSummary,
}

impl SegmentSeries {
    fn from_metric(metric: &Metric, statement: StatementKind) -> Self {
        let points = trend_points(metric);
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        Self {
            metric: metric.name.clone(),
            statement,
            trend: analyze_trend(&values),
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentRollup {
    pub segment: String,
    pub revenue: Option<SegmentSeries>,
    pub margin: Option<SegmentSeries>,
}

pub fn segment_rollup(
    segment: &str,
    income: Option<&StatementDocument>,
    margins: Option<&StatementDocument>,
) -> SegmentRollup {
    let revenue = income
        .and_then(|doc| doc.find_metric(segment))
        .map(|m| SegmentSeries::from_metric(m, StatementKind::IncomeStatement));

    let margin = margins
        .and_then(|doc| {
            let needle = segment.to_lowercase();
            doc.ordered_metrics()
                .find(|m| {
                    let name = m.name.to_lowercase();
                    name.contains(&needle) && name.contains("margin")
                })
                .or_else(|| doc.find_metric(segment))
        })
        .map(|m| SegmentSeries::from_metric(m, StatementKind::MarginAnalysis));

    SegmentRollup {
        segment: segment.to_string(),
        revenue,
        margin,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodOverview {
    pub quarterly: Vec<Period>,
    pub annual: Vec<Period>,
    pub latest_quarter: Option<Period>,
    pub latest_annual: Option<Period>,
}

/// Union of the statements' periods. Labels naming the same interval (`Sep-25`, `Sep-25E`)
/// count once, keeping the first in period order.
pub fn period_overview(statements: &[&StatementDocument]) -> PeriodOverview {
    let all: BTreeSet<&Period> = statements.iter().flat_map(|s| s.periods.iter()).collect();

    let (mut quarterly, mut annual): (Vec<Period>, Vec<Period>) =
        all.into_iter().cloned().partition(Period::is_quarterly);
    quarterly.dedup_by(|later, kept| later.same_interval(kept));
    annual.dedup_by(|later, kept| later.same_interval(kept));

    PeriodOverview {
        latest_quarter: quarterly.last().cloned(),
        latest_annual: annual.last().cloned(),
        quarterly,
        annual,
    }
}

/// Latest value against the one before it, at the metric's trend cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PeriodChange {
    pub statement: StatementKind,
    pub metric: String,
    pub prior_period: String,
    pub prior_value: f64,
    pub latest_period: String,
    pub latest_value: f64,
    pub change: f64,
    /// Relative to the magnitude of the prior value; absent when the prior value is zero.
    pub change_pct: Option<f64>,
}

pub fn period_change(statement: StatementKind, metric: &Metric) -> Option<PeriodChange> {
    let points = trend_points(metric);
    let [.., prior, latest] = points.as_slice() else {
        return None;
    };

    let change = latest.value - prior.value;
    let change_pct = if prior.value == 0.0 {
        None
    } else {
        Some(change / prior.value.abs() * 100.0)
    };

    Some(PeriodChange {
        statement,
        metric: metric.name.clone(),
        prior_period: prior.period.clone(),
        prior_value: prior.value,
        latest_period: latest.period.clone(),
        latest_value: latest.value,
        change,
        change_pct,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EstimateMix {
    pub actual_cells: usize,
    pub estimate_cells: usize,
    pub null_cells: usize,
}

pub fn estimate_mix(statement: &StatementDocument) -> EstimateMix {
    let mut mix = EstimateMix::default();
    for value in statement.metrics.values().flat_map(|m| m.values.iter()) {
        if value.value.is_none() {
            mix.null_cells += 1;
        } else if value.is_estimate {
            mix.estimate_cells += 1;
        } else {
            mix.actual_cells += 1;
        }
    }
    mix
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrossStatementAnalytics {
    pub trends: BTreeMap<StatementKind, BTreeMap<String, TrendSummary>>,
    pub segments: Vec<SegmentRollup>,
    pub period_overview: PeriodOverview,
    pub changes: Vec<PeriodChange>,
    pub estimate_mix: BTreeMap<StatementKind, EstimateMix>,
}

impl CrossStatementAnalytics {
    /// Accepts zero to four statements; anything missing simply contributes nothing.
    pub fn compute(statements: &[&StatementDocument], segments: &[String]) -> Self {
        let mut analytics = CrossStatementAnalytics {
            period_overview: period_overview(statements),
            ..CrossStatementAnalytics::default()
        };

        for statement in statements {
            let trends = statement
                .ordered_metrics()
                .map(|m| (m.name.clone(), metric_trend(m)))
                .collect();
            analytics.trends.insert(statement.kind, trends);
            analytics
                .estimate_mix
                .insert(statement.kind, estimate_mix(statement));
            analytics.changes.extend(
                statement
                    .ordered_metrics()
                    .filter_map(|m| period_change(statement.kind, m)),
            );
        }

        let find = |kind: StatementKind| statements.iter().copied().find(|s| s.kind == kind);
        let income = find(StatementKind::IncomeStatement);
        let margins = find(StatementKind::MarginAnalysis);
        if income.is_some() || margins.is_some() {
            analytics.segments = segments
                .iter()
                .map(|segment| segment_rollup(segment, income, margins))
                .filter(|rollup| rollup.revenue.is_some() || rollup.margin.is_some())
                .collect();
        }

        analytics
    }

    pub fn trend(&self, kind: StatementKind, metric: &str) -> Option<&TrendSummary> {
        self.trends.get(&kind).and_then(|t| t.get(metric))
    }

    /// Compact plain-text rendering for prompt interpolation.
    pub fn to_summary_text(&self) -> String {
        let mut output = String::new();

        if let Some(latest) = &self.period_overview.latest_quarter {
            output.push_str(&format!("Latest quarter: {}\n", latest.label));
        }
        if let Some(latest) = &self.period_overview.latest_annual {
            output.push_str(&format!("Latest fiscal year: {}\n", latest.label));
        }

        for (kind, trends) in &self.trends {
            if trends.is_empty() {
                continue;
            }
            output.push_str(&format!("\n{} trends:\n", kind.display_name()));
            for (metric, trend) in trends {
                match trend.direction {
                    TrendDirection::InsufficientData => {
                        output.push_str(&format!("- {}: insufficient data\n", metric));
                    }
                    direction => output.push_str(&format!(
                        "- {}: {:?} by {:.2} (recent avg {:.2} vs earlier avg {:.2}, latest {:.2})\n",
                        metric,
                        direction,
                        trend.magnitude,
                        trend.recent_average,
                        trend.earlier_average,
                        trend.latest_value
                    )),
                }
            }
        }

        if !self.segments.is_empty() {
            output.push_str("\nSegments:\n");
            for rollup in &self.segments {
                let describe = |series: &Option<SegmentSeries>| match series {
                    Some(s) => format!("{:?} (latest {:.2})", s.trend.direction, s.trend.latest_value),
                    None => "n/a".to_string(),
                };
                output.push_str(&format!(
                    "- {}: revenue {}, margin {}\n",
                    rollup.segment,
                    describe(&rollup.revenue),
                    describe(&rollup.margin)
                ));
            }
        }

        output
    }
}
