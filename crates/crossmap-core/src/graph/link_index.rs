//! Adjacency over every direct link, for runs without a hub.

use std::collections::{BTreeSet, HashMap};

use crate::graph::identifier::ControlId;
use crate::graph::relationship_set::DirectLink;

/// from_standard → to_standard → from_item → to items, filled in both directions.
#[derive(Debug, Clone, Default)]
pub struct DirectIndex {
    adjacency: HashMap<String, HashMap<String, HashMap<ControlId, BTreeSet<ControlId>>>>,
}

impl DirectIndex {
    pub fn build<'a, I>(links: I) -> Self
    where
        I: IntoIterator<Item = &'a DirectLink>,
    {
        let mut index = Self::default();
        for link in links {
            if link.standard_a == link.standard_b {
                continue;
            }
            index.insert(&link.standard_a, &link.item_a, &link.standard_b, &link.item_b);
            index.insert(&link.standard_b, &link.item_b, &link.standard_a, &link.item_a);
        }
        index
    }

    fn insert(&mut self, from: &str, from_item: &ControlId, to: &str, to_item: &ControlId) {
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .entry(to.to_string())
            .or_default()
            .entry(from_item.clone())
            .or_default()
            .insert(to_item.clone());
    }

    /// Items of `to` directly linked to `item` of `from`.
    pub fn related(&self, from: &str, item: &ControlId, to: &str) -> Option<&BTreeSet<ControlId>> {
        self.adjacency
            .get(from)
            .and_then(|targets| targets.get(to))
            .and_then(|by_item| by_item.get(item))
    }

    /// Whether any link joins the two standards.
    pub fn has_pair(&self, a: &str, b: &str) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|targets| targets.contains_key(b))
    }
}
