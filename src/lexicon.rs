use crate::schema::StatementKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const INCOME_TERMS: &[&str] = &[
    "revenue",
    "revenues",
    "net sales",
    "sales",
    "products",
    "services",
    "cost of sales",
    "cost of revenue",
    "gross profit",
    "gross margin",
    "margin",
    "operating income",
    "operating expenses",
    "operating expense",
    "research and development",
    "r&d",
    "sg&a",
    "selling general and administrative",
    "income",
    "net income",
    "ebit",
    "ebitda",
    "eps",
    "earnings per share",
    "tax",
    "taxes",
    "tax rate",
    "shares",
    "diluted",
    "interest",
    "expense",
    "expenses",
];

const BALANCE_SHEET_TERMS: &[&str] = &[
    "assets",
    "asset",
    "liabilities",
    "liability",
    "equity",
    "cash",
    "cash equivalents",
    "marketable securities",
    "receivable",
    "receivables",
    "inventories",
    "inventory",
    "property plant and equipment",
    "pp&e",
    "goodwill",
    "debt",
    "commercial paper",
    "payable",
    "payables",
    "deferred revenue",
    "retained earnings",
    "accumulated",
    "shareholders",
    "stockholders",
    "capital",
    "lease",
    "leases",
];

const CASH_FLOW_TERMS: &[&str] = &[
    "operating activities",
    "investing activities",
    "financing activities",
    "operating",
    "investing",
    "financing",
    "cash",
    "cash flow",
    "free cash flow",
    "net income",
    "depreciation",
    "amortization",
    "share-based compensation",
    "stock-based compensation",
    "deferred income taxes",
    "capital expenditures",
    "capex",
    "dividends",
    "repurchases",
    "repurchase",
    "buyback",
    "proceeds",
    "payments",
    "purchases",
    "acquisitions",
    "working capital",
];

const MARGIN_TERMS: &[&str] = &[
    "margin",
    "margins",
    "gross margin",
    "operating margin",
    "net margin",
    "ebit margin",
    "products",
    "services",
    "mix",
    "rate",
];

/// Per-statement line-item vocabulary used to recognise metric rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lexicon {
    terms: BTreeMap<StatementKind, Vec<String>>,
}

impl Lexicon {
    pub fn builtin() -> Self {
        let mut terms = BTreeMap::new();
        for kind in StatementKind::ALL {
            let base = match kind {
                StatementKind::IncomeStatement => INCOME_TERMS,
                StatementKind::BalanceSheet => BALANCE_SHEET_TERMS,
                StatementKind::CashFlow => CASH_FLOW_TERMS,
                StatementKind::MarginAnalysis => MARGIN_TERMS,
            };
            terms.insert(kind, base.iter().map(|t| normalize_phrase(t)).collect());
        }
        Self { terms }
    }

    /// Built-in terms plus segment names (income and margin statements) and any extra terms.
    pub fn with_extensions(
        segments: &[String],
        extra_terms: &BTreeMap<StatementKind, Vec<String>>,
    ) -> Self {
        let mut lexicon = Self::builtin();
        for segment in segments {
            lexicon.add_term(StatementKind::IncomeStatement, segment);
            lexicon.add_term(StatementKind::MarginAnalysis, segment);
        }
        for (kind, extras) in extra_terms {
            for term in extras {
                lexicon.add_term(*kind, term);
            }
        }
        lexicon
    }

    pub fn add_term(&mut self, kind: StatementKind, term: &str) {
        let normalized = normalize_phrase(term);
        if normalized.is_empty() {
            return;
        }
        let entry = self.terms.entry(kind).or_default();
        if !entry.contains(&normalized) {
            entry.push(normalized);
        }
    }

    pub fn terms(&self, kind: StatementKind) -> &[String] {
        self.terms.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when any term of `kind` occurs in `label` as a whole word or phrase.
    pub fn matches(&self, kind: StatementKind, label: &str) -> bool {
        let padded = format!(" {} ", normalize_phrase(label));
        self.terms(kind)
            .iter()
            .any(|term| padded.contains(&format!(" {} ", term)))
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("# Metric Lexicon\n\n");
        for (kind, terms) in &self.terms {
            output.push_str(&format!("## {}\n\n", kind.display_name()));
            for term in terms {
                output.push_str(&format!("- {}\n", term));
            }
            output.push('\n');
        }
        output
    }

    pub fn total_terms(&self) -> usize {
        self.terms.values().map(Vec::len).sum()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lowercases and collapses punctuation (other than `&` and `-`) to single spaces.
fn normalize_phrase(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '&' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_matches_per_statement() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.matches(StatementKind::IncomeStatement, "Total Net Sales"));
        assert!(lexicon.matches(StatementKind::IncomeStatement, "Diluted EPS"));
        assert!(lexicon.matches(StatementKind::BalanceSheet, "Total Assets"));
        assert!(lexicon.matches(
            StatementKind::CashFlow,
            "Cash generated by operating activities"
        ));
        assert!(lexicon.matches(StatementKind::MarginAnalysis, "Services Gross Margin"));
        assert!(!lexicon.matches(StatementKind::BalanceSheet, "Diluted EPS"));
    }

    #[test]
    fn test_whole_word_matching() {
        let lexicon = Lexicon::builtin();
        // "eps" must not match inside "steps"
        assert!(!lexicon.matches(StatementKind::IncomeStatement, "Next steps"));
        assert!(lexicon.matches(StatementKind::IncomeStatement, "R&D"));
    }

    #[test]
    fn test_segments_extend_income_and_margin() {
        let segments = vec![
            "iPhone".to_string(),
            "Wearables, Home and Accessories".to_string(),
        ];
        let lexicon = Lexicon::with_extensions(&segments, &BTreeMap::new());
        assert!(lexicon.matches(StatementKind::IncomeStatement, "iPhone"));
        assert!(lexicon.matches(
            StatementKind::MarginAnalysis,
            "Wearables, Home and Accessories"
        ));
        assert!(!lexicon.matches(StatementKind::BalanceSheet, "iPhone"));
        assert_eq!(
            lexicon.total_terms(),
            Lexicon::builtin().total_terms() + 4
        );
    }

    #[test]
    fn test_markdown_lists_every_statement() {
        let markdown = Lexicon::builtin().to_markdown();
        assert!(markdown.contains("## Income Statement"));
        assert!(markdown.contains("## Margin Analysis"));
        assert!(markdown.contains("- operating activities"));
    }
}
