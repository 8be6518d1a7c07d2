//! Per-standard identifier lists plus the deduplicated set of direct links.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::graph::identifier::ControlId;
use crate::output::ControlMapping;

/// One observed association between an item of `standard_a` and an item of
/// `standard_b`. Only the storage order is directional; the fact is symmetric.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectLink {
    pub standard_a: String,
    pub item_a: ControlId,
    pub standard_b: String,
    pub item_b: ControlId,
}

impl DirectLink {
    pub fn new(standard_a: &str, item_a: ControlId, standard_b: &str, item_b: ControlId) -> Self {
        Self {
            standard_a: standard_a.to_string(),
            item_a,
            standard_b: standard_b.to_string(),
            item_b,
        }
    }

    /// View the link from `standard`'s side: `(own_item, other_standard, other_item)`.
    ///
    /// Returns `None` when `standard` is on neither side, or on both.
    pub fn seen_from(&self, standard: &str) -> Option<(&ControlId, &str, &ControlId)> {
        if self.standard_a == self.standard_b {
            return None;
        }
        if self.standard_a == standard {
            Some((&self.item_a, &self.standard_b, &self.item_b))
        } else if self.standard_b == standard {
            Some((&self.item_b, &self.standard_a, &self.item_a))
        } else {
            None
        }
    }

    /// Whether the link joins `a` and `b`, in either storage order.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.standard_a == a && self.standard_b == b)
            || (self.standard_a == b && self.standard_b == a)
    }

    pub fn to_tuple(&self) -> [String; 4] {
        [
            self.standard_a.clone(),
            self.item_a.to_string(),
            self.standard_b.clone(),
            self.item_b.to_string(),
        ]
    }
}

/// Canonical output of relationship building.
///
/// Both collections are ordered sets, so inserting the same identifier or
/// link twice is a no-op and iteration order never depends on input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipSet {
    lists: BTreeMap<String, BTreeSet<ControlId>>,
    links: BTreeSet<DirectLink>,
}

impl RelationshipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a standard even if no identifier is ever observed for it.
    pub fn ensure_standard(&mut self, standard: &str) {
        if !self.lists.contains_key(standard) {
            self.lists.insert(standard.to_string(), BTreeSet::new());
        }
    }

    pub fn insert_identifier(&mut self, standard: &str, id: ControlId) -> bool {
        self.ensure_standard(standard);
        self.lists
            .get_mut(standard)
            .map(|ids| ids.insert(id))
            .unwrap_or(false)
    }

    /// Returns `true` if the link was not already present.
    pub fn insert_link(&mut self, link: DirectLink) -> bool {
        self.links.insert(link)
    }

    pub fn has_standard(&self, standard: &str) -> bool {
        self.lists.contains_key(standard)
    }

    /// Standard names in alphabetical order.
    pub fn standards(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(|s| s.as_str())
    }

    pub fn identifiers(&self, standard: &str) -> Option<&BTreeSet<ControlId>> {
        self.lists.get(standard)
    }

    pub fn lists(&self) -> &BTreeMap<String, BTreeSet<ControlId>> {
        &self.lists
    }

    pub fn links(&self) -> &BTreeSet<DirectLink> {
        &self.links
    }

    pub fn standard_count(&self) -> usize {
        self.lists.len()
    }

    pub fn identifier_count(&self) -> usize {
        self.lists.values().map(|ids| ids.len()).sum()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Union another set into this one.
    pub fn merge(&mut self, other: RelationshipSet) {
        for (standard, ids) in other.lists {
            self.lists.entry(standard).or_default().extend(ids);
        }
        self.links.extend(other.links);
    }

    /// Render the persisted `{"lists": .., "relationships": ..}` shape.
    pub fn to_document(&self) -> ControlMapping {
        let lists = self
            .lists
            .iter()
            .map(|(standard, ids)| {
                (
                    standard.clone(),
                    ids.iter().map(|id| id.to_string()).collect(),
                )
            })
            .collect();
        let relationships = self.links.iter().map(DirectLink::to_tuple).collect();
        ControlMapping {
            lists,
            relationships,
        }
    }

    /// Rebuild a set from the persisted shape.
    ///
    /// Every string is normalized on the way in, duplicate entries collapse,
    /// and relationships with a blank item are dropped with a warning. Link
    /// endpoints missing from `lists` are added to them, so every linked item
    /// is a key when its standard is primary.
    pub fn from_document(doc: &ControlMapping) -> Self {
        let mut set = Self::new();
        for (standard, ids) in &doc.lists {
            set.ensure_standard(standard);
            for id in ids.iter().filter_map(|raw| ControlId::new(raw)) {
                set.insert_identifier(standard, id);
            }
        }
        for (i, [standard_a, item_a, standard_b, item_b]) in doc.relationships.iter().enumerate() {
            match (ControlId::new(item_a), ControlId::new(item_b)) {
                (Some(a), Some(b)) => {
                    if set.insert_identifier(standard_a, a.clone())
                        | set.insert_identifier(standard_b, b.clone())
                    {
                        debug!("relationship {i} names an unlisted item, listing it");
                    }
                    set.insert_link(DirectLink::new(standard_a, a, standard_b, b));
                }
                _ => warn!("relationship {i} has a blank item, dropping it"),
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ControlId {
        ControlId::new(s).unwrap()
    }

    #[test]
    fn duplicate_links_collapse() {
        let mut set = RelationshipSet::new();
        assert!(set.insert_link(DirectLink::new("Master", id("GL-1"), "ISO42001", id("4.1"))));
        assert!(!set.insert_link(DirectLink::new("Master", id("GL-1"), "ISO42001", id("4.1"))));
        assert_eq!(set.link_count(), 1);
    }

    #[test]
    fn seen_from_orients_both_ways() {
        let link = DirectLink::new("Master", id("M1"), "SOC2", id("CC1.1"));
        assert_eq!(
            link.seen_from("SOC2"),
            Some((&id("CC1.1"), "Master", &id("M1")))
        );
        assert_eq!(
            link.seen_from("Master"),
            Some((&id("M1"), "SOC2", &id("CC1.1")))
        );
        assert_eq!(link.seen_from("ISO27001"), None);
    }

    #[test]
    fn self_link_is_seen_from_nowhere() {
        let link = DirectLink::new("Master", id("M1"), "Master", id("M2"));
        assert_eq!(link.seen_from("Master"), None);
    }

    #[test]
    fn merge_unions_lists_and_links() {
        let mut dora = RelationshipSet::new();
        dora.insert_identifier("ISO27001", id("5.1"));
        dora.insert_link(DirectLink::new("DORA", id("Governance"), "ISO27001", id("5.1")));

        let mut nis2 = RelationshipSet::new();
        nis2.insert_identifier("ISO27001", id("5.1"));
        nis2.insert_identifier("ISO27001", id("5.9"));
        nis2.insert_link(DirectLink::new("NIS2", id("HR security"), "ISO27001", id("5.9")));

        dora.merge(nis2);
        assert_eq!(dora.identifiers("ISO27001").unwrap().len(), 2);
        assert_eq!(dora.link_count(), 2);
    }

    #[test]
    fn document_roundtrip_is_lossless() {
        let mut set = RelationshipSet::new();
        set.ensure_standard("NIST RMF");
        set.insert_identifier("Master", id("GL-1"));
        set.insert_identifier("ISO42001", id("4.2"));
        set.insert_identifier("ISO42001", id("4.1"));
        set.insert_link(DirectLink::new("Master", id("GL-1"), "ISO42001", id("4.1")));

        let doc = set.to_document();
        assert_eq!(doc.lists["ISO42001"], vec!["4.1", "4.2"]);
        assert!(doc.lists["NIST RMF"].is_empty());
        assert_eq!(RelationshipSet::from_document(&doc), set);
    }

    #[test]
    fn from_document_normalizes_nbsp_items() {
        let doc = ControlMapping {
            lists: [("DORA".to_string(), vec!["Governance\u{00A0}".to_string()])]
                .into_iter()
                .collect(),
            relationships: vec![[
                "DORA".to_string(),
                "Governance\u{00A0}".to_string(),
                "ISO27002".to_string(),
                "5.1".to_string(),
            ]],
        };
        let set = RelationshipSet::from_document(&doc);
        let link = set.links().iter().next().unwrap();
        assert_eq!(link.item_a.as_str(), "Governance");
        assert!(set.identifiers("DORA").unwrap().contains(&id("Governance")));
    }

    #[test]
    fn from_document_lists_unlisted_link_endpoints() {
        let doc: ControlMapping = serde_json::from_value(serde_json::json!({
            "lists": {"Master": ["M1"], "S1": ["x"], "S2": []},
            "relationships": [
                ["Master", "M1", "S1", "x"],
                ["Master", "M1", "S2", "y"],
                ["Master", "M9", "S3", "z"]
            ]
        }))
        .unwrap();
        let set = RelationshipSet::from_document(&doc);
        assert!(set.identifiers("S2").unwrap().contains(&id("y")));
        assert!(set.identifiers("Master").unwrap().contains(&id("M9")));
        assert!(set.identifiers("S3").unwrap().contains(&id("z")));
        for link in set.links() {
            assert!(set.identifiers(&link.standard_a).unwrap().contains(&link.item_a));
            assert!(set.identifiers(&link.standard_b).unwrap().contains(&link.item_b));
        }
    }
}
