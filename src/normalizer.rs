//! Raw exhibit cell text to numeric values.
//!
//! Normalization never fails: anything that does not carry a number yields `None`, and
//! callers keep the raw text alongside the result.

use once_cell::sync::Lazy;
use regex::Regex;

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?")
        .expect("number pattern is valid")
});

/// Cell texts that stand for "no value".
pub const NULL_TOKENS: [&str; 8] = ["", "-", "—", "–", "--", "n/a", "N/A", "NA"];

const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

pub fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw.trim())
}

/// True for text that reads as a value rather than a label: digits, currency or percent.
pub fn looks_numeric(text: &str) -> bool {
    text.chars()
        .any(|c| c.is_ascii_digit() || c == '%' || CURRENCY_SYMBOLS.contains(&c))
}

pub fn normalize(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if is_null_token(trimmed) {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .map(|c| if c == '−' { '-' } else { c })
        .collect();

    // Unit and percent suffixes may sit outside the parentheses: "(3.5)%", "(2.1)B".
    let unsuffixed = strip_unit_suffix(&cleaned);

    let (negated, body) = match unsuffixed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (true, strip_unit_suffix(inner)),
        None => (false, unsuffixed),
    };

    let magnitude: f64 = FIRST_NUMBER.find(body)?.as_str().parse().ok()?;
    if !magnitude.is_finite() {
        return None;
    }

    Some(if negated { -magnitude } else { magnitude })
}

/// Drops trailing unit letters (`B`, `M`, `K`, `x`, ...) and `%`. Percentages stay in
/// percentage points.
fn strip_unit_suffix(text: &str) -> &str {
    text.trim_end_matches(|c: char| c == '%' || c.is_ascii_alphabetic())
}

/// Canonical text for a normalized value; `normalize(&canonical(v)) == Some(v)`.
pub fn canonical(value: f64) -> String {
    format!("{}", value)
}
