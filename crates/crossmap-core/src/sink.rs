//! In-memory mapping store honouring the downstream sink contract.
//!
//! Standards are unique by name, clauses by (standard, normalized text), and
//! mappings by (clause_a, clause_b). Re-importing an exported table is
//! therefore a no-op apart from a new import log entry.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{CrossmapError, Result};
use crate::graph::identifier::normalize_text;

/// Header suffixes that describe the column rather than name the standard.
const HEADER_SUFFIXES: &[&str] = &[" clauses", " requirements", " controls", " sections"];

/// Standard name from a table header, without a trailing descriptive suffix.
pub fn extract_standard_name(header: &str) -> String {
    let mut result = normalize_text(header);
    for suffix in HEADER_SUFFIXES {
        let lower = result.to_lowercase();
        if lower.ends_with(suffix) && lower.len() == result.len() {
            result.truncate(result.len() - suffix.len());
        }
    }
    result.trim().to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Clause {
    pub standard_id: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MappingRow {
    pub clause_a: usize,
    pub clause_b: usize,
    pub source_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub file_name: String,
    pub imported_at: DateTime<Utc>,
    pub row_count: usize,
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub rows: usize,
    pub mappings_created: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub standard_count: usize,
    pub clause_count: usize,
    pub mapping_count: usize,
    /// standard → clause count, alphabetical.
    pub standard_stats: Vec<(String, usize)>,
    /// (standard_a, standard_b) → mapping count, alphabetical.
    pub mapping_stats: Vec<(String, String, usize)>,
}

#[derive(Debug, Default)]
pub struct MappingStore {
    standards: Vec<String>,
    standard_ids: HashMap<String, usize>,
    clauses: Vec<Clause>,
    clause_ids: HashMap<(usize, String), usize>,
    mappings: Vec<MappingRow>,
    mapping_keys: HashSet<(usize, usize)>,
    import_log: Vec<ImportLogEntry>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the standard called `name`, creating it on first sight.
    pub fn upsert_standard(&mut self, name: &str) -> Option<usize> {
        let name = normalize_text(name);
        if name.is_empty() {
            return None;
        }
        if let Some(&id) = self.standard_ids.get(&name) {
            return Some(id);
        }
        let id = self.standards.len();
        self.standards.push(name.clone());
        self.standard_ids.insert(name, id);
        Some(id)
    }

    /// Id of the clause, creating it on first sight; `None` for blank text.
    pub fn upsert_clause(&mut self, standard_id: usize, text: &str) -> Option<usize> {
        let text = normalize_text(text);
        if text.is_empty() {
            return None;
        }
        let key = (standard_id, text);
        if let Some(&id) = self.clause_ids.get(&key) {
            return Some(id);
        }
        let id = self.clauses.len();
        self.clauses.push(Clause {
            standard_id,
            text: key.1.clone(),
        });
        self.clause_ids.insert(key, id);
        Some(id)
    }

    /// Record a mapping; duplicates are ignored and return `false`.
    pub fn insert_mapping(&mut self, clause_a: usize, clause_b: usize, source_file: &str) -> bool {
        if !self.mapping_keys.insert((clause_a, clause_b)) {
            return false;
        }
        self.mappings.push(MappingRow {
            clause_a,
            clause_b,
            source_file: source_file.to_string(),
        });
        true
    }

    fn log_import(&mut self, file_name: &str, row_count: usize, error: Option<String>) {
        self.import_log.push(ImportLogEntry {
            file_name: file_name.to_string(),
            imported_at: Utc::now(),
            row_count,
            success: error.is_none(),
            error_message: error,
        });
    }

    /// Import one two-column table whose header names the two standards.
    pub fn import_csv(&mut self, path: impl AsRef<Path>) -> Result<ImportOutcome> {
        let path = path.as_ref();
        let file_name = path.to_string_lossy().to_string();
        info!("Importing file: {file_name}");
        match self.import_records(path, &file_name) {
            Ok(outcome) => {
                self.log_import(&file_name, outcome.rows, None);
                info!(
                    "Imported {} rows, created {} mappings",
                    outcome.rows, outcome.mappings_created
                );
                Ok(outcome)
            }
            Err(e) => {
                self.log_import(&file_name, 0, Some(e.to_string()));
                Err(e)
            }
        }
    }

    fn import_records(&mut self, path: &Path, file_name: &str) -> Result<ImportOutcome> {
        let file = std::fs::File::open(path).map_err(|e| CrossmapError::io(path, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => record?,
            None => {
                return Err(CrossmapError::InvalidHeader {
                    path: path.to_path_buf(),
                    reason: "empty CSV file".to_string(),
                })
            }
        };
        if header.len() < 2 {
            return Err(CrossmapError::InvalidHeader {
                path: path.to_path_buf(),
                reason: format!("expected at least 2 columns, got {}", header.len()),
            });
        }

        let name_a = extract_standard_name(&header[0]);
        let name_b = extract_standard_name(&header[1]);
        let (Some(std_a), Some(std_b)) =
            (self.upsert_standard(&name_a), self.upsert_standard(&name_b))
        else {
            return Err(CrossmapError::InvalidHeader {
                path: path.to_path_buf(),
                reason: "standard name cannot be empty".to_string(),
            });
        };
        info!("Mapping standards: '{name_a}' to '{name_b}'");

        let mut outcome = ImportOutcome::default();
        for (i, record) in records.enumerate() {
            let record = record?;
            let row_num = i + 2;
            if record.len() < 2 {
                warn!("Skipping row {row_num} - insufficient columns");
                continue;
            }
            outcome.rows += 1;
            let clause_a = self.upsert_clause(std_a, &record[0]);
            let clause_b = self.upsert_clause(std_b, &record[1]);
            if let (Some(a), Some(b)) = (clause_a, clause_b) {
                if self.insert_mapping(a, b, file_name) {
                    outcome.mappings_created += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Import every `*.csv` directly inside `dir`, in file-name order.
    /// Returns `(succeeded, total)`; a failing file does not stop the rest.
    pub fn import_dir(&mut self, dir: impl AsRef<Path>) -> Result<(usize, usize)> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(CrossmapError::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
            ));
        }

        let mut files: Vec<_> = WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        if files.is_empty() {
            warn!("No CSV files found in {}", dir.display());
            return Ok((0, 0));
        }

        let total = files.len();
        let mut succeeded = 0;
        for file in &files {
            match self.import_csv(file) {
                Ok(_) => succeeded += 1,
                Err(e) => warn!("Error importing file {}: {e}", file.display()),
            }
        }
        info!("Imported {succeeded} of {total} CSV files successfully");
        Ok((succeeded, total))
    }

    pub fn standard_name(&self, id: usize) -> Option<&str> {
        self.standards.get(id).map(|s| s.as_str())
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn mappings(&self) -> &[MappingRow] {
        &self.mappings
    }

    pub fn import_log(&self) -> &[ImportLogEntry] {
        &self.import_log
    }

    pub fn stats(&self) -> StoreStats {
        let mut per_standard: BTreeMap<String, usize> =
            self.standards.iter().map(|s| (s.clone(), 0)).collect();
        for clause in &self.clauses {
            if let Some(count) = self
                .standard_name(clause.standard_id)
                .and_then(|name| per_standard.get_mut(name))
            {
                *count += 1;
            }
        }

        let mut per_pair: BTreeMap<(String, String), usize> = BTreeMap::new();
        for mapping in &self.mappings {
            let a = &self.clauses[mapping.clause_a];
            let b = &self.clauses[mapping.clause_b];
            let key = (
                self.standards[a.standard_id].clone(),
                self.standards[b.standard_id].clone(),
            );
            *per_pair.entry(key).or_insert(0) += 1;
        }

        StoreStats {
            standard_count: self.standards.len(),
            clause_count: self.clauses.len(),
            mapping_count: self.mappings.len(),
            standard_stats: per_standard.into_iter().collect(),
            mapping_stats: per_pair
                .into_iter()
                .map(|((a, b), n)| (a, b, n))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn header_suffixes_are_stripped() {
        assert_eq!(extract_standard_name("ISO 27001 Controls"), "ISO 27001");
        assert_eq!(extract_standard_name(" NIS2 requirements "), "NIS2");
        assert_eq!(extract_standard_name("Master"), "Master");
    }

    #[test]
    fn clause_upsert_is_idempotent_on_normalized_text() {
        let mut store = MappingStore::new();
        let std_id = store.upsert_standard("ISO27001").unwrap();
        let a = store.upsert_clause(std_id, "5.1");
        let b = store.upsert_clause(std_id, " 5.1\u{00A0}");
        assert_eq!(a, b);
        assert_eq!(store.upsert_clause(std_id, "  "), None);
        assert_eq!(store.clauses().len(), 1);
    }

    #[test]
    fn reimport_creates_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(
            dir.path(),
            "ISO42001_vs_Master.csv",
            "ISO42001,Master\n4.1,GL-1\n4.2,GL-1\n4.3,\n",
        );
        let mut store = MappingStore::new();
        let first = store.import_csv(&path).unwrap();
        assert_eq!(first, ImportOutcome { rows: 3, mappings_created: 2 });

        let second = store.import_csv(&path).unwrap();
        assert_eq!(second.mappings_created, 0);
        let stats = store.stats();
        assert_eq!(stats.standard_count, 2);
        assert_eq!(stats.clause_count, 4);
        assert_eq!(stats.mapping_count, 2);
        assert_eq!(store.import_log().len(), 2);
    }

    #[test]
    fn single_column_header_fails_and_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), "bad.csv", "OnlyOne\nx\n");
        let mut store = MappingStore::new();
        assert!(matches!(
            store.import_csv(&path),
            Err(CrossmapError::InvalidHeader { .. })
        ));
        let log = store.import_log();
        assert_eq!(log.len(), 1);
        assert!(!log[0].success);
    }

    #[test]
    fn short_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), "a.csv", "Master,SOC2\nGL-1\nGL-2,CC1.1\n");
        let mut store = MappingStore::new();
        let outcome = store.import_csv(&path).unwrap();
        assert_eq!(outcome.rows, 1);
        assert_eq!(outcome.mappings_created, 1);
    }

    #[test]
    fn import_dir_counts_successes() {
        let dir = tempfile::tempdir().unwrap();
        csv_file(dir.path(), "Master_vs_SOC2.csv", "Master,SOC2\nGL-1,CC1.1\n");
        csv_file(dir.path(), "empty.csv", "");
        csv_file(dir.path(), "notes.txt", "ignored");
        let mut store = MappingStore::new();
        assert_eq!(store.import_dir(dir.path()).unwrap(), (1, 2));
        let stats = store.stats();
        assert_eq!(
            stats.mapping_stats,
            vec![("Master".to_string(), "SOC2".to_string(), 1)]
        );
    }

    #[test]
    fn import_dir_missing_is_error() {
        let mut store = MappingStore::new();
        assert!(store.import_dir("/nonexistent/exports").is_err());
    }
}
