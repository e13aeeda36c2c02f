//! Text-run extraction from SVG exhibits.
//!
//! Each `<text>` element becomes one [`TextRun`]. Its position comes from the element's own
//! `transform` attribute evaluated at the origin; ancestor group transforms are not applied.

use crate::error::{Result, StatementError};
use crate::schema::TextRun;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static TRANSFORM_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z]+)\s*\(([^)]*)\)").expect("transform function pattern is valid")
});

/// A 2-D affine matrix `(a, b, c, d, e, f)` mapping `(x, y)` to
/// `(a·x + c·y + e, b·x + d·y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            ..Self::IDENTITY
        }
    }

    /// `self · other`: `other` is applied first.
    pub fn then_apply(&self, other: &Affine) -> Affine {
        Affine {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn origin(&self) -> (f64, f64) {
        self.apply(0.0, 0.0)
    }
}

/// Parses an SVG transform list. Returns `None` if any part of it is not understood.
pub fn parse_transform(attr: &str) -> Option<Affine> {
    let mut matrix = Affine::IDENTITY;
    let mut consumed = 0;
    let mut found = false;

    for caps in TRANSFORM_FUNCTION.captures_iter(attr) {
        let whole = caps.get(0)?;
        if !is_separator(&attr[consumed..whole.start()]) {
            return None;
        }
        consumed = whole.end();

        let args = parse_arguments(&caps[2])?;
        let step = match (caps[1].to_ascii_lowercase().as_str(), args.as_slice()) {
            ("matrix", [a, b, c, d, e, f]) => Affine {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            },
            ("translate", [tx]) => Affine::translate(*tx, 0.0),
            ("translate", [tx, ty]) => Affine::translate(*tx, *ty),
            ("scale", [s]) => Affine::scale(*s, *s),
            ("scale", [sx, sy]) => Affine::scale(*sx, *sy),
            ("rotate", [deg]) => Affine::rotate(*deg),
            ("rotate", [deg, cx, cy]) => Affine::translate(*cx, *cy)
                .then_apply(&Affine::rotate(*deg))
                .then_apply(&Affine::translate(-cx, -cy)),
            ("skewx", [deg]) => Affine {
                c: deg.to_radians().tan(),
                ..Affine::IDENTITY
            },
            ("skewy", [deg]) => Affine {
                b: deg.to_radians().tan(),
                ..Affine::IDENTITY
            },
            _ => return None,
        };

        matrix = matrix.then_apply(&step);
        found = true;
    }

    if !found || !is_separator(&attr[consumed..]) {
        return None;
    }

    Some(matrix)
}

fn is_separator(text: &str) -> bool {
    text.chars().all(|c| c.is_whitespace() || c == ',')
}

fn parse_arguments(args: &str) -> Option<Vec<f64>> {
    args.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub runs: Vec<TextRun>,
    /// Text nodes whose transform attribute could not be parsed; placed at the origin.
    pub unresolved_transforms: usize,
    /// Text nodes with no transform attribute; placed at the origin.
    pub missing_transforms: usize,
    pub empty_nodes: usize,
}

pub fn extract_text_runs(svg: &str) -> Result<Vec<TextRun>> {
    Ok(extract_document(svg, "<memory>")?.runs)
}

/// Reads the document once and extracts its runs. `source` only labels errors and logs.
pub fn extract_document(svg: &str, source: &str) -> Result<Extraction> {
    // Plotting libraries emit a DOCTYPE on their SVG output.
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let document = roxmltree::Document::parse_with_options(svg, options).map_err(|e| {
        StatementError::MalformedDocument {
            path: source.to_string(),
            details: e.to_string(),
        }
    })?;

    let root = document.root_element();
    if root.tag_name().name() != "svg" {
        return Err(StatementError::MalformedDocument {
            path: source.to_string(),
            details: format!("root element is <{}>, expected <svg>", root.tag_name().name()),
        });
    }

    let mut extraction = Extraction::default();

    for node in root
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "text")
    {
        let content = node_text(&node);
        if content.is_empty() {
            extraction.empty_nodes += 1;
            continue;
        }

        let (x, y) = match node.attribute("transform") {
            Some(attr) => match parse_transform(attr) {
                Some(matrix) => matrix.origin(),
                None => {
                    warn!(
                        "{}: unparsable transform '{}' on text '{}', placing at origin",
                        source, attr, content
                    );
                    extraction.unresolved_transforms += 1;
                    (0.0, 0.0)
                }
            },
            None => {
                extraction.missing_transforms += 1;
                (0.0, 0.0)
            }
        };

        extraction.runs.push(TextRun { content, x, y });
    }

    debug!(
        "{}: extracted {} text runs ({} unresolved transforms, {} without transform, {} empty)",
        source,
        extraction.runs.len(),
        extraction.unresolved_transforms,
        extraction.missing_transforms,
        extraction.empty_nodes
    );

    Ok(extraction)
}

pub fn extract_from_path(path: &Path) -> Result<Extraction> {
    let svg = std::fs::read_to_string(path)?;
    extract_document(&svg, &path.display().to_string())
}

pub fn extract_text_runs_from_path(path: &Path) -> Result<Vec<TextRun>> {
    Ok(extract_from_path(path)?.runs)
}

fn node_text(node: &roxmltree::Node) -> String {
    let joined: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
