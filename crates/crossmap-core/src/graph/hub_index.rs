//! Hub-centred lookup tables used for direct and two-hop resolution.

use std::collections::{BTreeSet, HashMap};

use crate::graph::identifier::ControlId;
use crate::graph::relationship_set::DirectLink;

/// Two immutable tables derived once from the direct links touching the hub.
///
/// - `hub_to_peer`: hub_item → peer_standard → peer items
/// - `peer_to_hub`: peer_standard → peer_item → hub items
///
/// Links where neither side (or both sides) is the hub do not participate.
#[derive(Debug, Clone)]
pub struct HubIndex {
    hub: String,
    hub_to_peer: HashMap<ControlId, HashMap<String, BTreeSet<ControlId>>>,
    peer_to_hub: HashMap<String, HashMap<ControlId, BTreeSet<ControlId>>>,
}

impl HubIndex {
    pub fn build<'a, I>(hub: &str, links: I) -> Self
    where
        I: IntoIterator<Item = &'a DirectLink>,
    {
        let mut hub_to_peer: HashMap<ControlId, HashMap<String, BTreeSet<ControlId>>> =
            HashMap::new();
        let mut peer_to_hub: HashMap<String, HashMap<ControlId, BTreeSet<ControlId>>> =
            HashMap::new();

        for link in links {
            let Some((hub_item, peer_standard, peer_item)) = link.seen_from(hub) else {
                continue;
            };
            hub_to_peer
                .entry(hub_item.clone())
                .or_default()
                .entry(peer_standard.to_string())
                .or_default()
                .insert(peer_item.clone());
            peer_to_hub
                .entry(peer_standard.to_string())
                .or_default()
                .entry(peer_item.clone())
                .or_default()
                .insert(hub_item.clone());
        }

        Self {
            hub: hub.to_string(),
            hub_to_peer,
            peer_to_hub,
        }
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// Peer items of `peer_standard` linked to `hub_item`.
    pub fn peers_of(
        &self,
        hub_item: &ControlId,
        peer_standard: &str,
    ) -> Option<&BTreeSet<ControlId>> {
        self.hub_to_peer
            .get(hub_item)
            .and_then(|by_standard| by_standard.get(peer_standard))
    }

    /// Hub items linked to `peer_item` of `peer_standard`.
    pub fn hubs_of(
        &self,
        peer_standard: &str,
        peer_item: &ControlId,
    ) -> Option<&BTreeSet<ControlId>> {
        self.peer_to_hub
            .get(peer_standard)
            .and_then(|by_item| by_item.get(peer_item))
    }

    /// Two-hop composition: items of `to_standard` reachable from `item` of
    /// `from_standard` through any shared hub item. Empty when no hub path exists.
    pub fn composed(
        &self,
        from_standard: &str,
        item: &ControlId,
        to_standard: &str,
    ) -> BTreeSet<ControlId> {
        let mut related = BTreeSet::new();
        if let Some(hub_items) = self.hubs_of(from_standard, item) {
            for hub_item in hub_items {
                if let Some(peers) = self.peers_of(hub_item, to_standard) {
                    related.extend(peers.iter().cloned());
                }
            }
        }
        related
    }

    /// Number of hub items with at least one peer link.
    pub fn hub_item_count(&self) -> usize {
        self.hub_to_peer.len()
    }
}
