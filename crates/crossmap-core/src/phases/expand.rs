//! Phase 2a: raw cell text → atomic control identifiers.

use log::debug;
use regex::Regex;

use crate::config::{CellFormat, ColumnSpec};
use crate::error::{CrossmapError, Result};
use crate::graph::identifier::{normalize_text, ControlId};

/// A range expands to at most this many identifiers; wider ones stay literal.
const MAX_RANGE_SPAN: u64 = 10_000;

/// Line terminators recognised inside a single spreadsheet cell.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0B}'
            | '\u{0C}'
            | '\u{1C}'
            | '\u{1D}'
            | '\u{1E}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Expand a raw cell into identifiers.
///
/// The cell is split on line breaks, each line is cleaned up, empty lines
/// are dropped, and each remaining line goes through [`expand_range`].
pub fn expand(raw_cell: &str) -> Vec<String> {
    raw_cell
        .split(is_line_break)
        .map(normalize_text)
        .filter(|line| !line.is_empty())
        .flat_map(|line| expand_range(&line))
        .collect()
}

/// Expand `<prefix><start>-<prefix><end>` into every identifier in between,
/// both ends included. Anything that is not a well-formed range comes back
/// as the trimmed input, alone.
pub fn expand_range(value: &str) -> Vec<String> {
    let value = value.trim();
    let Some((left, right)) = value.split_once('-') else {
        return vec![value.to_string()];
    };
    match range_bounds(left.trim(), right.trim()) {
        Some((prefix, start, end)) => (start..=end)
            .map(|n| {
                if prefix.is_empty() {
                    n.to_string()
                } else {
                    format!("{}.{}", prefix.join("."), n)
                }
            })
            .collect(),
        None => {
            debug!("'{value}' is not an expandable range, keeping it literal");
            vec![value.to_string()]
        }
    }
}

/// Shared prefix segments plus numeric bounds, or `None` if `left-right` is
/// not a range this expander accepts.
fn range_bounds<'a>(left: &'a str, right: &'a str) -> Option<(Vec<&'a str>, u64, u64)> {
    let left_parts: Vec<&str> = left.split('.').collect();
    let right_parts: Vec<&str> = right.split('.').collect();
    if left_parts.len() != right_parts.len() {
        return None;
    }
    let (left_last, left_prefix) = left_parts.split_last()?;
    let (right_last, right_prefix) = right_parts.split_last()?;
    if left_prefix != right_prefix {
        return None;
    }
    let start = parse_bound(left_last)?;
    let end = parse_bound(right_last)?;
    if start > end || end - start >= MAX_RANGE_SPAN {
        return None;
    }
    Some((left_prefix.to_vec(), start, end))
}

fn parse_bound(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// A column's cell format, ready to apply to many cells.
#[derive(Debug, Clone)]
pub enum CellExtractor {
    Ranges,
    Literal,
    Pattern(Regex),
}

impl CellExtractor {
    pub fn for_column(spec: &ColumnSpec) -> Result<Self> {
        Ok(match &spec.format {
            CellFormat::Ranges => Self::Ranges,
            CellFormat::Literal => Self::Literal,
            CellFormat::Pattern { regex } => {
                let re = Regex::new(regex).map_err(|source| CrossmapError::InvalidPattern {
                    column: spec.column.clone(),
                    source,
                })?;
                Self::Pattern(re)
            }
        })
    }

    /// Identifiers found in one cell, in order of appearance.
    pub fn extract(&self, raw_cell: &str) -> Vec<ControlId> {
        match self {
            Self::Ranges => expand(raw_cell)
                .iter()
                .filter_map(|s| ControlId::new(s))
                .collect(),
            Self::Literal => ControlId::new(raw_cell).into_iter().collect(),
            Self::Pattern(re) => raw_cell
                .split(is_line_break)
                .map(normalize_text)
                .flat_map(|line| {
                    re.find_iter(&line)
                        .filter_map(|m| ControlId::new(m.as_str()))
                        .collect::<Vec<_>>()
                })
                .collect(),
        }
    }
}
