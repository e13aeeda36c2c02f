//! Row reconstruction: recovers table rows from scattered text runs.
//!
//! Runs are swept top-to-bottom (descending y, the exhibit coordinate system is y-up) and
//! greedily attached to the last open row while they stay within `tolerance` of that row's
//! representative y. A run is never reassigned, so jitter straddling the tolerance boundary
//! splits a row.

use crate::schema::TextRun;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROW_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Representative y: the y of the first (topmost) run that opened the row.
    pub y: f64,
    /// Runs ordered left-to-right.
    pub runs: Vec<TextRun>,
}

impl Row {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.runs.iter().map(|r| r.content.as_str())
    }

    pub fn text(&self) -> String {
        self.texts().collect::<Vec<_>>().join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

pub fn reconstruct_rows(runs: &[TextRun], tolerance: f64) -> Vec<Row> {
    let tolerance = if tolerance.is_finite() {
        tolerance.max(0.0)
    } else {
        DEFAULT_ROW_TOLERANCE
    };

    let mut sorted: Vec<&TextRun> = runs.iter().collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut rows: Vec<Row> = Vec::new();
    for run in sorted {
        match rows.last_mut() {
            Some(row) if (run.y - row.y).abs() <= tolerance => row.runs.push(run.clone()),
            _ => rows.push(Row {
                y: run.y,
                runs: vec![run.clone()],
            }),
        }
    }

    for row in &mut rows {
        row.runs.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str, x: f64, y: f64) -> TextRun {
        TextRun::new(content, x, y)
    }

    #[test]
    fn test_groups_by_vertical_band() {
        let runs = vec![
            run("$81.8B", 200.0, 498.0),
            run("Revenue", 10.0, 500.0),
            run("Mar-24", 100.0, 520.0),
            run("$94.0B", 100.0, 501.5),
            run("Jun-24", 200.0, 520.0),
        ];

        let rows = reconstruct_rows(&runs, DEFAULT_ROW_TOLERANCE);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(), "Mar-24 Jun-24");
        assert_eq!(rows[1].text(), "Revenue $94.0B $81.8B");
        assert_eq!(rows[1].y, 501.5);
    }

    #[test]
    fn test_rows_partition_runs() {
        let runs: Vec<TextRun> = (0..40)
            .map(|i| run(&format!("r{}", i), (i * 37 % 11) as f64, (i * 13 % 17) as f64 * 3.3))
            .collect();

        let rows = reconstruct_rows(&runs, 2.0);
        let total: usize = rows.iter().map(|r| r.runs.len()).sum();
        assert_eq!(total, runs.len());

        let mut seen: Vec<&str> = rows.iter().flat_map(|r| r.texts()).collect();
        seen.sort();
        let mut expected: Vec<&str> = runs.iter().map(|r| r.content.as_str()).collect();
        expected.sort();
        assert_eq!(seen, expected);

        for pair in rows.windows(2) {
            assert!(pair[0].y > pair[1].y);
        }
        for row in &rows {
            for pair in row.runs.windows(2) {
                assert!(pair[0].x <= pair[1].x);
            }
        }
    }

    #[test]
    fn test_jitter_across_boundary_splits_row() {
        let runs = vec![run("a", 0.0, 100.0), run("b", 10.0, 96.0), run("c", 20.0, 94.0)];
        let rows = reconstruct_rows(&runs, 5.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(), "a b");
        assert_eq!(rows[1].text(), "c");
    }

    #[test]
    fn test_empty_input() {
        assert!(reconstruct_rows(&[], 5.0).is_empty());
    }
}
