//! The four stages of a run, leaf-first: expand, build, resolve, export.

pub mod build;
pub mod expand;
pub mod export;
pub mod resolve;
