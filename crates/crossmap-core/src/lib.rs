//! Crossmap Core — cross-referencing engine for compliance control identifiers.
//!
//! This crate contains all mapping logic: cell expansion, relationship
//! building, hub-mediated pairwise resolution, canonical table export, graph
//! export and the in-memory mapping store.

pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod output;
pub mod phases;
pub mod pipeline;
pub mod sink;

pub use error::{CrossmapError, Result};
