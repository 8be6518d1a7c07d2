//! Persisted shapes: the intermediate JSON document, CSV tables, run report.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::{MappingConfig, ResolutionMode, RunReport, TableSummary};
use crate::error::{CrossmapError, Result};
use crate::graph::relationship_set::RelationshipSet;
use crate::phases::export::ExportTable;

/// `{"lists": {standard: [identifier, ..]}, "relationships": [[a, item_a, b, item_b], ..]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlMapping {
    #[serde(default)]
    pub lists: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub relationships: Vec<[String; 4]>,
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| CrossmapError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Write any serializable value as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(|e| CrossmapError::io(path, e))
}

pub fn read_document(path: impl AsRef<Path>) -> Result<ControlMapping> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| CrossmapError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Write one CSV per table into `dir`; returns the written paths in table order.
pub fn write_tables(dir: impl AsRef<Path>, tables: &[ExportTable]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| CrossmapError::io(dir, e))?;
    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let path = dir.join(table.file_name());
        let bytes = table.to_csv_bytes()?;
        std::fs::write(&path, bytes).map_err(|e| CrossmapError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}

/// Row accounting carried from the build phase into the report.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowCounts {
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// Build the RunReport for a finished run.
pub fn build_report(
    config: &MappingConfig,
    mode: ResolutionMode,
    set: &RelationshipSet,
    tables: &[ExportTable],
    counts: RowCounts,
    timings: &HashMap<String, f64>,
    total_ms: f64,
) -> RunReport {
    let mut metadata = HashMap::new();
    metadata.insert(
        "input_path".to_string(),
        serde_json::Value::String(config.input_path.clone()),
    );
    metadata.insert(
        "mode".to_string(),
        serde_json::Value::String(mode.to_string()),
    );
    metadata.insert(
        "hub".to_string(),
        match mode {
            ResolutionMode::Hub => serde_json::Value::String(config.hub.clone()),
            ResolutionMode::Direct => serde_json::Value::Null,
        },
    );
    metadata.insert(
        "generated_at".to_string(),
        serde_json::Value::String(Utc::now().to_rfc3339()),
    );
    metadata.insert(
        "crossmap_version".to_string(),
        serde_json::Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );
    metadata.insert(
        "duration_ms".to_string(),
        serde_json::json!(((total_ms * 10.0).round() / 10.0)),
    );
    metadata.insert(
        "phase_timings".to_string(),
        serde_json::to_value(timings).unwrap_or_default(),
    );

    let mut stats = HashMap::new();
    stats.insert("standards".to_string(), serde_json::json!(set.standard_count()));
    stats.insert(
        "identifiers".to_string(),
        serde_json::json!(set.identifier_count()),
    );
    stats.insert("links".to_string(), serde_json::json!(set.link_count()));
    stats.insert("tables".to_string(), serde_json::json!(tables.len()));
    stats.insert("rows_read".to_string(), serde_json::json!(counts.rows_read));
    stats.insert(
        "rows_skipped".to_string(),
        serde_json::json!(counts.rows_skipped),
    );

    let tables = tables
        .iter()
        .map(|t| TableSummary {
            file: t.file_name(),
            standard_a: t.header[0].clone(),
            standard_b: t.header[1].clone(),
            rows: t.rows.len(),
            associations: t.associations,
        })
        .collect();

    RunReport {
        version: "1.0".to_string(),
        metadata,
        stats,
        tables,
    }
}
