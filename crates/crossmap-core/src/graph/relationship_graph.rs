//! Undirected (standard, identifier) graph for edge-list exports.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::config::Palette;
use crate::error::{CrossmapError, Result};
use crate::graph::identifier::ControlId;
use crate::graph::relationship_set::RelationshipSet;

/// Node weight: one identifier of one standard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlNode {
    pub standard: String,
    pub item: ControlId,
}

impl ControlNode {
    /// Display id in the `"{standard}: {item}"` form.
    pub fn id(&self) -> String {
        format!("{}: {}", self.standard, self.item)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphNodeOutput {
    pub id: String,
    pub standard: String,
    pub item: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphEdgeOutput {
    pub source: String,
    pub target: String,
    pub color: String,
}

/// Serializable node/edge lists consumed by diagram renderers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphExport {
    pub standards: Vec<String>,
    pub nodes: Vec<GraphNodeOutput>,
    pub edges: Vec<GraphEdgeOutput>,
}

/// Wrapper around petgraph::UnGraph restricted to a selection of standards.
pub struct RelationshipGraph {
    graph: UnGraph<ControlNode, ()>,
    /// (standard, item) → node, for O(1) edge insertion.
    node_index: HashMap<(String, ControlId), NodeIndex>,
    selection: Vec<String>,
    hub: Option<String>,
}

impl RelationshipGraph {
    /// Build the graph over `selection` (all standards when empty).
    ///
    /// Nodes are inserted group by group in selection order, natural order
    /// within a group, so node indices are already the export order.
    pub fn build(set: &RelationshipSet, selection: &[String], hub: Option<&str>) -> Result<Self> {
        let selection: Vec<String> = if selection.is_empty() {
            set.standards().map(String::from).collect()
        } else {
            let mut seen = Vec::new();
            for standard in selection {
                if !set.has_standard(standard) {
                    return Err(CrossmapError::InvalidStandard(standard.clone()));
                }
                if !seen.contains(standard) {
                    seen.push(standard.clone());
                }
            }
            seen
        };

        let mut graph = UnGraph::new_undirected();
        let mut node_index = HashMap::new();
        for standard in &selection {
            for item in set.identifiers(standard).into_iter().flatten() {
                let idx = graph.add_node(ControlNode {
                    standard: standard.clone(),
                    item: item.clone(),
                });
                node_index.insert((standard.clone(), item.clone()), idx);
            }
        }

        for link in set.links() {
            let a = node_index.get(&(link.standard_a.clone(), link.item_a.clone()));
            let b = node_index.get(&(link.standard_b.clone(), link.item_b.clone()));
            if let (Some(&a), Some(&b)) = (a, b) {
                if a != b {
                    graph.update_edge(a, b, ());
                }
            }
        }

        Ok(Self {
            graph,
            node_index,
            selection,
            hub: hub.map(String::from),
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn has_node(&self, standard: &str, item: &ControlId) -> bool {
        self.node_index
            .contains_key(&(standard.to_string(), item.clone()))
    }

    /// Neighbours of one node as `(standard, item)` pairs, in export order.
    #[cfg(test)]
    fn neighbours(&self, standard: &str, item: &ControlId) -> Vec<(&str, &ControlId)> {
        let Some(&idx) = self.node_index.get(&(standard.to_string(), item.clone())) else {
            return Vec::new();
        };
        let mut out: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        out.sort();
        out.into_iter()
            .map(|n| {
                let node = &self.graph[n];
                (node.standard.as_str(), &node.item)
            })
            .collect()
    }

    fn position(&self, standard: &str) -> usize {
        self.selection
            .iter()
            .position(|s| s == standard)
            .unwrap_or(usize::MAX)
    }

    /// Colour of the non-hub endpoint when exactly one endpoint is the hub,
    /// otherwise of the endpoint whose standard comes later in the selection.
    fn edge_color<'p>(&self, a: &ControlNode, b: &ControlNode, palette: &'p Palette) -> &'p str {
        let is_hub = |node: &ControlNode| self.hub.as_deref() == Some(node.standard.as_str());
        match (is_hub(a), is_hub(b)) {
            (true, false) => palette.color(&b.standard),
            (false, true) => palette.color(&a.standard),
            _ => {
                if self.position(&a.standard) >= self.position(&b.standard) {
                    palette.color(&a.standard)
                } else {
                    palette.color(&b.standard)
                }
            }
        }
    }

    pub fn to_export(&self, palette: &Palette) -> GraphExport {
        let nodes = self
            .graph
            .node_indices()
            .map(|idx| {
                let node = &self.graph[idx];
                GraphNodeOutput {
                    id: node.id(),
                    standard: node.standard.clone(),
                    item: node.item.to_string(),
                    color: palette.color(&node.standard).to_string(),
                }
            })
            .collect();

        let mut edges: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_references()
            .map(|e| {
                let (s, t) = (e.source(), e.target());
                if s <= t {
                    (s, t)
                } else {
                    (t, s)
                }
            })
            .collect();
        edges.sort();

        let edges = edges
            .into_iter()
            .map(|(s, t)| {
                let (a, b) = (&self.graph[s], &self.graph[t]);
                GraphEdgeOutput {
                    source: a.id(),
                    target: b.id(),
                    color: self.edge_color(a, b, palette).to_string(),
                }
            })
            .collect();

        GraphExport {
            standards: self.selection.clone(),
            nodes,
            edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::relationship_set::DirectLink;

    fn id(s: &str) -> ControlId {
        ControlId::new(s).unwrap()
    }

    fn sample() -> RelationshipSet {
        let mut set = RelationshipSet::new();
        for (standard, item) in [
            ("Master", "GL-1"),
            ("Master", "GL-2"),
            ("ISO42001", "4.1"),
            ("ISO42001", "4.10"),
            ("ISO42001", "4.2"),
            ("SOC2", "CC1.1"),
        ] {
            set.insert_identifier(standard, id(item));
        }
        set.insert_link(DirectLink::new("Master", id("GL-1"), "ISO42001", id("4.1")));
        set.insert_link(DirectLink::new("ISO42001", id("4.1"), "Master", id("GL-1")));
        set.insert_link(DirectLink::new("Master", id("GL-2"), "SOC2", id("CC1.1")));
        set
    }

    #[test]
    fn reverse_duplicate_link_is_one_edge() {
        let graph = RelationshipGraph::build(&sample(), &[], Some("Master")).unwrap();
        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn selection_filters_edges() {
        let selection = vec!["Master".to_string(), "ISO42001".to_string()];
        let graph = RelationshipGraph::build(&sample(), &selection, Some("Master")).unwrap();
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.has_node("SOC2", &id("CC1.1")));
    }

    #[test]
    fn unknown_selection_is_rejected() {
        let err = RelationshipGraph::build(&sample(), &["SOC3".to_string()], None);
        assert!(matches!(err, Err(CrossmapError::InvalidStandard(s)) if s == "SOC3"));
    }

    #[test]
    fn export_orders_nodes_by_selection_then_natural_order() {
        let selection = vec!["ISO42001".to_string(), "Master".to_string()];
        let graph = RelationshipGraph::build(&sample(), &selection, Some("Master")).unwrap();
        let export = graph.to_export(&Palette::default());
        let ids: Vec<&str> = export.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["ISO42001: 4.1", "ISO42001: 4.2", "ISO42001: 4.10", "Master: GL-1", "Master: GL-2"]
        );
    }

    #[test]
    fn hub_edges_take_peer_color() {
        let palette = Palette::default()
            .with_color("Master", "grey")
            .with_color("ISO42001", "blue");
        let graph = RelationshipGraph::build(&sample(), &[], Some("Master")).unwrap();
        let export = graph.to_export(&palette);
        let edge = export
            .edges
            .iter()
            .find(|e| e.source.starts_with("ISO42001") || e.target.starts_with("ISO42001"))
            .unwrap();
        assert_eq!(edge.color, "blue");
        let soc = export
            .edges
            .iter()
            .find(|e| e.source.starts_with("SOC2") || e.target.starts_with("SOC2"))
            .unwrap();
        assert_eq!(soc.color, "gray");
    }

    #[test]
    fn neighbours_are_reported() {
        let graph = RelationshipGraph::build(&sample(), &[], Some("Master")).unwrap();
        let n = graph.neighbours("Master", &id("GL-1"));
        assert_eq!(n, vec![("ISO42001", &id("4.1"))]);
    }
}
