//! Phase 3: pairwise resolution between standards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::config::{MappingConfig, ResolutionMode};
use crate::error::{CrossmapError, Result};
use crate::graph::hub_index::HubIndex;
use crate::graph::identifier::ControlId;
use crate::graph::link_index::DirectIndex;
use crate::graph::relationship_set::RelationshipSet;

/// Order-independent name of a standard pair: alphabetically earlier first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub first: String,
    pub second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    /// `{first}_vs_{second}`, the stem of the exported file.
    pub fn file_stem(&self) -> String {
        format!("{}_vs_{}", self.first, self.second)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// Every item of `primary` mapped to its related items of `secondary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseMapping {
    primary: String,
    secondary: String,
    entries: BTreeMap<ControlId, BTreeSet<ControlId>>,
}

impl PairwiseMapping {
    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(&self.primary, &self.secondary)
    }

    /// Whether the primary standard is the alphabetically earlier one.
    pub(crate) fn is_canonical(&self) -> bool {
        self.primary <= self.secondary
    }

    pub fn entries(&self) -> &BTreeMap<ControlId, BTreeSet<ControlId>> {
        &self.entries
    }

    /// Related items for a primary item given as text; `None` if it is not a key.
    pub fn related(&self, item: &str) -> Option<&BTreeSet<ControlId>> {
        ControlId::new(item).and_then(|id| self.entries.get(&id))
    }

    /// Every `(primary_item, secondary_item)` association, in export order.
    pub fn associations(&self) -> impl Iterator<Item = (&ControlId, &ControlId)> {
        self.entries
            .iter()
            .flat_map(|(a, related)| related.iter().map(move |b| (a, b)))
    }

    pub fn association_count(&self) -> usize {
        self.entries.values().map(|r| r.len()).sum()
    }

    pub fn has_associations(&self) -> bool {
        self.entries.values().any(|r| !r.is_empty())
    }
}

/// Lookup tables built once per run and shared by every pair.
#[derive(Debug, Clone)]
pub enum ResolutionIndex {
    Hub(HubIndex),
    Direct(DirectIndex),
}

impl ResolutionIndex {
    /// Hub-mediated tables; the hub must be a known standard.
    pub fn hub(set: &RelationshipSet, hub: &str) -> Result<Self> {
        if !set.has_standard(hub) {
            return Err(CrossmapError::InvalidStandard(hub.to_string()));
        }
        Ok(Self::Hub(HubIndex::build(hub, set.links())))
    }

    pub fn direct(set: &RelationshipSet) -> Self {
        Self::Direct(DirectIndex::build(set.links()))
    }

    pub fn from_config(set: &RelationshipSet, config: &MappingConfig) -> Result<Self> {
        match config.mode {
            ResolutionMode::Hub => Self::hub(set, &config.hub),
            ResolutionMode::Direct => Ok(Self::direct(set)),
        }
    }

    pub fn mode(&self) -> ResolutionMode {
        match self {
            Self::Hub(_) => ResolutionMode::Hub,
            Self::Direct(_) => ResolutionMode::Direct,
        }
    }
}

/// Resolves standard pairs against a relationship set and its index.
///
/// Both are borrowed immutably for the resolver's whole lifetime, so neither
/// can change between two pairs of the same pass.
pub struct PairwiseResolver<'a> {
    set: &'a RelationshipSet,
    index: &'a ResolutionIndex,
}

impl<'a> PairwiseResolver<'a> {
    pub fn new(set: &'a RelationshipSet, index: &'a ResolutionIndex) -> Self {
        Self { set, index }
    }

    pub fn hub(&self) -> Option<&str> {
        match self.index {
            ResolutionIndex::Hub(hub) => Some(hub.hub()),
            ResolutionIndex::Direct(_) => None,
        }
    }

    fn check_pair(&self, a: &str, b: &str) -> Result<()> {
        for standard in [a, b] {
            if !self.set.has_standard(standard) {
                return Err(CrossmapError::InvalidStandard(standard.to_string()));
            }
        }
        if a == b {
            return Err(CrossmapError::InvalidPairing(a.to_string()));
        }
        Ok(())
    }

    /// Map every item of `primary` to its related items of `secondary`.
    pub fn resolve(&self, primary: &str, secondary: &str) -> Result<PairwiseMapping> {
        self.check_pair(primary, secondary)?;

        let items = self.set.identifiers(primary).into_iter().flatten();
        let entries = items
            .map(|item| (item.clone(), self.related(primary, item, secondary)))
            .collect();

        Ok(PairwiseMapping {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            entries,
        })
    }

    /// Resolve with the alphabetically earlier standard as primary.
    pub fn resolve_canonical(&self, a: &str, b: &str) -> Result<PairwiseMapping> {
        let key = PairKey::new(a, b);
        self.resolve(&key.first, &key.second)
    }

    /// Every unordered pair once, canonical orientation, in key order.
    pub fn resolve_all(&self) -> Result<Vec<PairwiseMapping>> {
        let standards: Vec<&str> = self.set.standards().collect();
        let mut out = Vec::new();
        for (i, a) in standards.iter().enumerate() {
            for b in &standards[i + 1..] {
                out.push(self.resolve(a, b)?);
            }
        }
        Ok(out)
    }

    fn related(&self, primary: &str, item: &ControlId, secondary: &str) -> BTreeSet<ControlId> {
        match self.index {
            ResolutionIndex::Hub(index) => {
                if primary == index.hub() {
                    index.peers_of(item, secondary).cloned().unwrap_or_default()
                } else if secondary == index.hub() {
                    index.hubs_of(primary, item).cloned().unwrap_or_default()
                } else {
                    index.composed(primary, item, secondary)
                }
            }
            ResolutionIndex::Direct(index) => index
                .related(primary, item, secondary)
                .cloned()
                .unwrap_or_default(),
        }
    }
}
