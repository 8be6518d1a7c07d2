//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crossmap_core::config::MappingConfig;
use crossmap_core::graph::identifier::ControlId;
use crossmap_core::graph::relationship_set::RelationshipSet;
use crossmap_core::ingest::read_rows;
use crossmap_core::phases::build::{build_relationships, BuildOutcome};
use crossmap_core::phases::resolve::PairwiseMapping;

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

/// Default hub configuration pointed at a fixture file.
pub fn fixture_config(name: &str) -> MappingConfig {
    MappingConfig {
        input_path: fixture_path(name).to_string_lossy().to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Phase runners
// ---------------------------------------------------------------------------

/// Ingest + build for the given configuration.
pub fn build_from_config(config: &MappingConfig) -> BuildOutcome {
    let batch = read_rows(&config.input_path).expect("Failed to read fixture");
    let peers = config.resolved_peers(&batch.headers);
    build_relationships(&batch.rows, &config.anchor, &peers).expect("Build failed")
}

/// Relationship set of a fixture under the default configuration.
pub fn fixture_set(name: &str) -> RelationshipSet {
    build_from_config(&fixture_config(name)).set
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

pub fn id(s: &str) -> ControlId {
    ControlId::new(s).expect("blank identifier")
}

/// Identifier strings of one standard, in list order.
pub fn list_of(set: &RelationshipSet, standard: &str) -> Vec<String> {
    set.identifiers(standard)
        .map(|ids| ids.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default()
}

/// Related items of one primary item as strings.
pub fn related_of(mapping: &PairwiseMapping, item: &str) -> Vec<String> {
    mapping
        .related(item)
        .map(|ids| ids.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default()
}

/// Every association as an owned `(primary_item, secondary_item)` pair.
pub fn association_pairs(mapping: &PairwiseMapping) -> BTreeSet<(String, String)> {
    mapping
        .associations()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}
