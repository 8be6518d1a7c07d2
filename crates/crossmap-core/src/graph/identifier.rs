//! Control identifiers, text cleanup and natural dotted-numeric ordering.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Characters that render as nothing and must never distinguish two identifiers.
const INVISIBLE_CHARS: &[char] = &[
    '\u{00AD}', // soft hyphen
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{FEFF}', // byte order mark
];

/// Collapse every run of Unicode whitespace (NBSP included) into a single
/// ASCII space, drop invisible characters, and trim both ends.
pub fn normalize_text(raw: &str) -> String {
    let visible: String = raw.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect();
    let mut out = String::with_capacity(visible.len());
    for word in visible.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// An atomic control reference: trimmed, single-line, never empty.
///
/// Equality is exact string equality on the normalized text. Ordering is
/// natural dotted-numeric (see [`natural_cmp`]) with a lexical tie-break so
/// that `Ord` stays consistent with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(String);

impl ControlId {
    /// Normalize `raw` into an identifier; `None` when nothing visible remains.
    pub fn new(raw: &str) -> Option<Self> {
        let text = normalize_text(raw);
        if text.is_empty() {
            None
        } else {
            Some(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ControlId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Ord for ControlId {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for ControlId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One dot-separated segment, classified for comparison.
enum Segment<'a> {
    /// Digits with leading zeros stripped ("0" stays "0").
    Number(&'a str),
    Text(&'a str),
}

fn classify(segment: &str) -> Segment<'_> {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        let trimmed = segment.trim_start_matches('0');
        Segment::Number(if trimmed.is_empty() { "0" } else { trimmed })
    } else {
        Segment::Text(segment)
    }
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    match (classify(a), classify(b)) {
        // Digit strings without leading zeros compare as integers by length first,
        // which sidesteps overflow for arbitrarily long numbers.
        (Segment::Number(x), Segment::Number(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
        (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
        (Segment::Text(x), Segment::Text(y)) => x.cmp(y),
    }
}

/// Natural dotted-numeric comparison.
///
/// Segments are compared pairwise: numbers as integers, text lexically, and a
/// number always before text at the same depth. A strict prefix sorts first.
/// Strings that are still equal (e.g. `"01"` and `"1"`) fall back to a plain
/// lexical comparison.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_segments(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Sort strings in place using [`natural_cmp`].
pub fn natural_sort<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn normalize_collapses_nbsp_and_whitespace() {
        assert_eq!(normalize_text("\u{00A0} 5.31\u{00A0}\t"), "5.31");
        assert_eq!(normalize_text("Annex\u{00A0}A  5.1"), "Annex A 5.1");
        assert_eq!(normalize_text("GL\u{200B}-1"), "GL-1");
        assert_eq!(normalize_text(" \u{00A0}\u{FEFF} "), "");
    }

    #[test]
    fn control_id_rejects_blank() {
        assert!(ControlId::new("").is_none());
        assert!(ControlId::new("\u{00A0}").is_none());
        assert_eq!(ControlId::new(" 4.1 ").unwrap().as_str(), "4.1");
    }

    #[test]
    fn ids_differing_only_in_invisible_chars_are_equal() {
        assert_eq!(ControlId::new("4.1\u{00A0}"), ControlId::new("4.1"));
        assert_eq!(ControlId::new("\u{FEFF}4.1"), ControlId::new("4.1"));
    }

    #[test]
    fn numeric_segments_compare_as_integers() {
        let mut items = vec!["9.2", "9.10", "9.1"];
        natural_sort(&mut items);
        assert_eq!(items, vec!["9.1", "9.2", "9.10"]);
    }

    #[test]
    fn numbers_sort_before_text_at_same_depth() {
        assert_eq!(natural_cmp("7.4", "A.1"), Ordering::Less);
        assert_eq!(natural_cmp("A.7.4.6", "A.7.4.10"), Ordering::Less);
        assert_eq!(natural_cmp("GL-1", "GL-2"), Ordering::Less);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(natural_cmp("6.1", "6.1.2"), Ordering::Less);
        assert_eq!(natural_cmp("6.1.2", "6.1"), Ordering::Greater);
    }

    #[test]
    fn leading_zeros_tie_break_lexically() {
        assert_eq!(natural_cmp("01", "1"), Ordering::Less);
        assert_ne!(natural_cmp("1", "01"), Ordering::Equal);
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        assert_eq!(
            natural_cmp("1.99999999999999999999999", "1.100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn btreeset_iterates_in_natural_order() {
        let set: BTreeSet<ControlId> = ["10.1", "2.1", "A.5", "2.10", "2.9"]
            .iter()
            .filter_map(|s| ControlId::new(s))
            .collect();
        let ordered: Vec<&str> = set.iter().map(|c| c.as_str()).collect();
        assert_eq!(ordered, vec!["2.1", "2.9", "2.10", "10.1", "A.5"]);
    }
}
