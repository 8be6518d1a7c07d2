//! Phase 4: pairwise mappings → deterministic two-column tables.

use crate::error::{CrossmapError, Result};
use crate::phases::resolve::{PairKey, PairwiseMapping};

/// Header row followed by association rows, exactly as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub key: PairKey,
    pub header: [String; 2],
    pub rows: Vec<[String; 2]>,
    pub associations: usize,
}

impl ExportTable {
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.key.file_stem())
    }

    /// Header plus data rows.
    pub fn all_rows(&self) -> impl Iterator<Item = &[String; 2]> {
        std::iter::once(&self.header).chain(self.rows.iter())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in self.all_rows() {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| CrossmapError::Csv(csv::Error::from(e.into_error())))
    }
}

/// Rows for `mapping` under the given column names: the header first, then
/// one row per association, and a single `(item, "")` row for an item with
/// none. Items follow natural order, and so do their related items.
pub fn export_rows(mapping: &PairwiseMapping, a_name: &str, b_name: &str) -> Vec<[String; 2]> {
    let mut rows = vec![[a_name.to_string(), b_name.to_string()]];
    for (item, related) in mapping.entries() {
        if related.is_empty() {
            rows.push([item.to_string(), String::new()]);
        } else {
            rows.extend(related.iter().map(|r| [item.to_string(), r.to_string()]));
        }
    }
    rows
}

/// Table for `mapping`, headed by its own standard names.
///
/// The mapping must be in canonical orientation, so that the header matches
/// the file it is written to.
pub fn export(mapping: &PairwiseMapping) -> ExportTable {
    debug_assert!(mapping.is_canonical(), "{} exported back to front", mapping.key());
    let mut rows = export_rows(mapping, mapping.primary(), mapping.secondary());
    let header = rows.remove(0);
    ExportTable {
        key: mapping.key(),
        header,
        rows,
        associations: mapping.association_count(),
    }
}

/// Fixed-width text view: one line per primary item with its related items
/// comma-joined, or `-` when there are none.
pub fn render_table(mapping: &PairwiseMapping) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<20} | {}\n",
        mapping.primary(),
        mapping.secondary()
    ));
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for (item, related) in mapping.entries() {
        let joined = if related.is_empty() {
            "-".to_string()
        } else {
            related
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.push_str(&format!("{:<20} | {}\n", item.as_str(), joined));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::identifier::ControlId;
    use crate::graph::relationship_set::{DirectLink, RelationshipSet};
    use crate::phases::resolve::{PairwiseResolver, ResolutionIndex};
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ControlId {
        ControlId::new(s).unwrap()
    }

    fn mapping() -> PairwiseMapping {
        let mut set = RelationshipSet::new();
        for item in ["GL-2", "GL-10", "GL-1"] {
            set.insert_identifier("Master", id(item));
        }
        for item in ["4.10", "4.2", "4.1"] {
            set.insert_identifier("ISO42001", id(item));
        }
        set.insert_link(DirectLink::new("Master", id("GL-1"), "ISO42001", id("4.10")));
        set.insert_link(DirectLink::new("Master", id("GL-1"), "ISO42001", id("4.2")));
        set.insert_link(DirectLink::new("Master", id("GL-2"), "ISO42001", id("4.1")));
        let index = ResolutionIndex::hub(&set, "Master").unwrap();
        PairwiseResolver::new(&set, &index)
            .resolve_canonical("Master", "ISO42001")
            .unwrap()
    }

    #[test]
    fn rows_follow_natural_order_with_blank_for_unmapped() {
        let m = mapping();
        let rows = export_rows(&m, m.primary(), m.secondary());
        let expected: Vec<[String; 2]> = [
            ["ISO42001", "Master"],
            ["4.1", "GL-2"],
            ["4.2", "GL-1"],
            ["4.10", "GL-1"],
        ]
        .iter()
        .map(|[a, b]| [a.to_string(), b.to_string()])
        .collect();
        assert_eq!(rows, expected);
    }

    #[test]
    fn unmapped_item_emits_single_blank_row() {
        let mut set = RelationshipSet::new();
        set.insert_identifier("Master", id("GL-9"));
        set.insert_identifier("SOC2", id("CC1.1"));
        let index = ResolutionIndex::hub(&set, "Master").unwrap();
        let m = PairwiseResolver::new(&set, &index)
            .resolve("Master", "SOC2")
            .unwrap();
        let table = export(&m);
        assert_eq!(table.rows, vec![["GL-9".to_string(), String::new()]]);
        assert_eq!(table.associations, 0);
    }

    #[test]
    fn csv_bytes_are_stable() {
        let table = export(&mapping());
        let first = table.to_csv_bytes().unwrap();
        let second = export(&mapping()).to_csv_bytes().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            String::from_utf8(first).unwrap(),
            "ISO42001,Master\n4.1,GL-2\n4.2,GL-1\n4.10,GL-1\n"
        );
        assert_eq!(table.file_name(), "ISO42001_vs_Master.csv");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exported back to front")]
    fn reversed_mapping_is_not_exported() {
        let set = {
            let mut set = RelationshipSet::new();
            set.insert_identifier("Master", id("GL-1"));
            set.insert_identifier("SOC2", id("CC1.1"));
            set
        };
        let index = ResolutionIndex::direct(&set);
        let m = PairwiseResolver::new(&set, &index)
            .resolve("SOC2", "Master")
            .unwrap();
        export(&m);
    }

    #[test]
    fn text_table_uses_dash_for_unmapped() {
        let mut set = RelationshipSet::new();
        set.insert_identifier("Master", id("GL-1"));
        set.insert_identifier("Master", id("GL-2"));
        set.insert_identifier("SOC2", id("CC1.1"));
        set.insert_identifier("SOC2", id("CC1.2"));
        set.insert_link(DirectLink::new("Master", id("GL-1"), "SOC2", id("CC1.1")));
        set.insert_link(DirectLink::new("Master", id("GL-1"), "SOC2", id("CC1.2")));
        let index = ResolutionIndex::hub(&set, "Master").unwrap();
        let m = PairwiseResolver::new(&set, &index)
            .resolve("Master", "SOC2")
            .unwrap();
        let text = render_table(&m);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], format!("{:<20} | SOC2", "Master"));
        assert_eq!(lines[2], format!("{:<20} | CC1.1, CC1.2", "GL-1"));
        assert_eq!(lines[3], format!("{:<20} | -", "GL-2"));
    }
}
