//! In-memory relationship structures: identifiers, the relationship set,
//! the lookup indices built from it, and the exportable graph view.

pub mod hub_index;
pub mod identifier;
pub mod link_index;
pub mod relationship_graph;
pub mod relationship_set;
