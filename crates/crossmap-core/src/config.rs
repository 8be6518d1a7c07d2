//! Run configuration and report types for Crossmap.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::{CrossmapError, Result};
use crate::graph::identifier::normalize_text;

/// How raw cell text in a column turns into identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CellFormat {
    /// Split on line breaks and expand `7.1-7.3` style ranges.
    #[default]
    Ranges,
    /// The whole cell is one identifier (free-text area columns).
    Literal,
    /// Every match of `regex` on each line is an identifier.
    Pattern { regex: String },
}

/// Binds an input column to the standard its identifiers belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column: String,
    pub standard: String,
    #[serde(default)]
    pub format: CellFormat,
}

impl ColumnSpec {
    pub fn new(column: &str, standard: &str) -> Self {
        Self {
            column: column.to_string(),
            standard: standard.to_string(),
            format: CellFormat::default(),
        }
    }

    pub fn with_format(mut self, format: CellFormat) -> Self {
        self.format = format;
        self
    }
}

/// How pairs of non-hub standards are related.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Direct links through the hub, two-hop composition between peers.
    #[default]
    Hub,
    /// Literal direct links only; no standard mediates.
    Direct,
}

impl ResolutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hub => "hub",
            Self::Direct => "direct",
        }
    }
}

impl std::fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a mapping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub input_path: String,
    pub output_dir: Option<String>,
    #[serde(default = "default_hub")]
    pub hub: String,
    #[serde(default)]
    pub mode: ResolutionMode,
    #[serde(default = "default_anchor")]
    pub anchor: ColumnSpec,
    /// Empty means every input column other than the anchor, named after its header.
    #[serde(default)]
    pub peers: Vec<ColumnSpec>,
    #[serde(default)]
    pub include_empty_tables: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_hub() -> String {
    "Master".to_string()
}

fn default_anchor() -> ColumnSpec {
    ColumnSpec::new("MASTER", "Master")
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            output_dir: None,
            hub: default_hub(),
            mode: ResolutionMode::default(),
            anchor: default_anchor(),
            peers: Vec::new(),
            include_empty_tables: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl MappingConfig {
    /// Load a configuration from a JSON file; absent fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CrossmapError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Peer columns for a batch with the given headers.
    ///
    /// Configured peers win. Otherwise every header that is not the anchor
    /// column becomes a peer whose standard is the cleaned-up header text.
    pub fn resolved_peers(&self, headers: &[String]) -> Vec<ColumnSpec> {
        if !self.peers.is_empty() {
            return self.peers.clone();
        }
        let anchor_key = column_key(&self.anchor.column);
        headers
            .iter()
            .map(|h| normalize_text(h))
            .filter(|h| !h.is_empty() && column_key(h) != anchor_key)
            .map(|h| ColumnSpec::new(&h, &h))
            .collect()
    }
}

/// Case-insensitive, whitespace-normalized column lookup key.
pub fn column_key(name: &str) -> String {
    normalize_text(name).to_uppercase()
}

/// Explicit standard → colour table for graph exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Palette {
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default = "default_fallback_color")]
    pub fallback: String,
}

fn default_fallback_color() -> String {
    "gray".to_string()
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: BTreeMap::new(),
            fallback: default_fallback_color(),
        }
    }
}

impl Palette {
    pub fn with_color(mut self, standard: &str, color: &str) -> Self {
        self.colors.insert(standard.to_string(), color.to_string());
        self
    }

    pub fn color(&self, standard: &str) -> &str {
        self.colors
            .get(standard)
            .map(|c| c.as_str())
            .unwrap_or(&self.fallback)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CrossmapError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Summary of one exported table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableSummary {
    pub file: String,
    pub standard_a: String,
    pub standard_b: String,
    pub rows: usize,
    pub associations: usize,
}

/// Result of a run, written alongside the tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub stats: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub tables: Vec<TableSummary>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            version: default_version(),
            metadata: HashMap::new(),
            stats: HashMap::new(),
            tables: Vec::new(),
        }
    }
}
