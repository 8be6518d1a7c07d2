//! Phase 2b: rows → identifier lists + direct links.

use log::{info, warn};

use crate::config::ColumnSpec;
use crate::error::{CrossmapError, Result};
use crate::graph::identifier::ControlId;
use crate::graph::relationship_set::{DirectLink, RelationshipSet};
use crate::ingest::RawRow;
use crate::phases::expand::CellExtractor;

/// Relationship set plus row accounting for the run report.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    pub set: RelationshipSet,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Build the relationship set for one dataset.
///
/// Every configured standard is registered up front, so a column that never
/// yields an identifier still has an (empty) list. For each row the anchor
/// identifiers are linked to every identifier of every peer column on that
/// row. A row missing any configured column is skipped with a warning.
pub fn build_relationships(
    rows: &[RawRow],
    anchor: &ColumnSpec,
    peers: &[ColumnSpec],
) -> Result<BuildOutcome> {
    if let Some(peer) = peers.iter().find(|p| p.standard == anchor.standard) {
        return Err(CrossmapError::InvalidPairing(peer.standard.clone()));
    }

    let anchor_extractor = CellExtractor::for_column(anchor)?;
    let peer_extractors = peers
        .iter()
        .map(|spec| CellExtractor::for_column(spec).map(|ex| (spec, ex)))
        .collect::<Result<Vec<_>>>()?;

    let mut outcome = BuildOutcome::default();
    outcome.set.ensure_standard(&anchor.standard);
    for peer in peers {
        outcome.set.ensure_standard(&peer.standard);
    }

    for row in rows {
        outcome.rows_read += 1;

        let missing = std::iter::once(anchor)
            .chain(peers.iter())
            .find(|spec| row.get(&spec.column).is_none());
        if let Some(spec) = missing {
            warn!(
                "row {}: column '{}' is missing, skipping row",
                row.line, spec.column
            );
            outcome.rows_skipped += 1;
            continue;
        }

        let anchor_ids = extract(&anchor_extractor, row, anchor);
        for id in &anchor_ids {
            outcome.set.insert_identifier(&anchor.standard, id.clone());
        }

        for (spec, extractor) in &peer_extractors {
            let peer_ids = extract(extractor, row, spec);
            for id in &peer_ids {
                outcome.set.insert_identifier(&spec.standard, id.clone());
            }
            for a in &anchor_ids {
                for p in &peer_ids {
                    outcome.set.insert_link(DirectLink::new(
                        &anchor.standard,
                        a.clone(),
                        &spec.standard,
                        p.clone(),
                    ));
                }
            }
        }
    }

    info!(
        "built {} standards, {} identifiers, {} links from {} rows ({} skipped)",
        outcome.set.standard_count(),
        outcome.set.identifier_count(),
        outcome.set.link_count(),
        outcome.rows_read,
        outcome.rows_skipped
    );
    Ok(outcome)
}

fn extract(extractor: &CellExtractor, row: &RawRow, spec: &ColumnSpec) -> Vec<ControlId> {
    row.get(&spec.column)
        .map(|cell| extractor.extract(cell))
        .unwrap_or_default()
}
