//! Sequential phase orchestrator with timing.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};

use crate::config::{MappingConfig, RunReport};
use crate::error::Result;
use crate::graph::relationship_set::RelationshipSet;
use crate::ingest::{read_rows, RowBatch};
use crate::output::{build_report, write_json, write_tables, ControlMapping, RowCounts};
use crate::phases;
use crate::phases::export::ExportTable;
use crate::phases::resolve::{PairwiseMapping, PairwiseResolver, ResolutionIndex};

/// Intermediate document written next to the tables.
pub const DOCUMENT_FILE: &str = "control_mapping.json";
/// Run report written next to the tables.
pub const REPORT_FILE: &str = "crossmap_report.json";

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("ingest", "Reading input rows"),
    ("build", "Building relationships"),
    ("index", "Indexing links"),
    ("resolve", "Resolving standard pairs"),
    ("export", "Exporting tables"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// Working state handed from phase to phase.
#[derive(Default)]
struct RunState {
    batch: RowBatch,
    set: RelationshipSet,
    counts: RowCounts,
    index: Option<ResolutionIndex>,
    mappings: Vec<PairwiseMapping>,
    tables: Vec<ExportTable>,
}

/// Type alias for phase function closures to keep signatures readable.
type PhaseFn = Box<dyn FnOnce(&MappingConfig, &mut RunState) -> Result<()>>;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub document: ControlMapping,
    pub tables: Vec<ExportTable>,
    pub report: RunReport,
}

/// Execute the full pipeline on `config.input_path`.
///
/// When `config.output_dir` is set the document, the tables and the report
/// are written there as well.
pub fn run_pipeline(
    config: &MappingConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<RunOutput> {
    let mut phase_fns: Vec<(&str, PhaseFn)> = vec![
        (
            "ingest",
            Box::new(|config, state| {
                state.batch = read_rows(&config.input_path)?;
                debug!(
                    "read {} rows with {} columns from {}",
                    state.batch.rows.len(),
                    state.batch.headers.len(),
                    config.input_path
                );
                Ok(())
            }),
        ),
        (
            "build",
            Box::new(|config, state| {
                let peers = config.resolved_peers(&state.batch.headers);
                let outcome =
                    phases::build::build_relationships(&state.batch.rows, &config.anchor, &peers)?;
                state.set = outcome.set;
                state.counts = RowCounts {
                    rows_read: outcome.rows_read,
                    rows_skipped: outcome.rows_skipped,
                };
                Ok(())
            }),
        ),
    ];
    phase_fns.extend(resolution_phases());

    execute(config, RunState::default(), phase_fns, progress_callback)
}

/// Run index → resolve → export on an already built document.
pub fn resolve_document(
    document: &ControlMapping,
    config: &MappingConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<RunOutput> {
    let state = RunState {
        set: RelationshipSet::from_document(document),
        ..Default::default()
    };
    execute(config, state, resolution_phases(), progress_callback)
}

fn resolution_phases() -> Vec<(&'static str, PhaseFn)> {
    vec![
        (
            "index",
            Box::new(|config, state| {
                let index = ResolutionIndex::from_config(&state.set, config)?;
                if let ResolutionIndex::Hub(hub) = &index {
                    debug!("{} items of {} carry peer links", hub.hub_item_count(), hub.hub());
                }
                state.index = Some(index);
                Ok(())
            }),
        ),
        (
            "resolve",
            Box::new(|config, state| {
                let index = match state.index.take() {
                    Some(index) => index,
                    None => ResolutionIndex::from_config(&state.set, config)?,
                };
                let mut mappings = PairwiseResolver::new(&state.set, &index).resolve_all()?;
                if let (ResolutionIndex::Direct(direct), false) =
                    (&index, config.include_empty_tables)
                {
                    let before = mappings.len();
                    mappings.retain(|m| direct.has_pair(m.primary(), m.secondary()));
                    debug!("skipped {} pairs with no direct links", before - mappings.len());
                }
                state.mappings = mappings;
                state.index = Some(index);
                Ok(())
            }),
        ),
        (
            "export",
            Box::new(|config, state| {
                state.tables = state.mappings.iter().map(phases::export::export).collect();
                let empty = state.mappings.iter().filter(|m| !m.has_associations()).count();
                if empty > 0 {
                    debug!("{empty} of {} tables carry no associations", state.tables.len());
                }
                if let Some(dir) = &config.output_dir {
                    write_json(&state.set.to_document(), Path::new(dir).join(DOCUMENT_FILE))?;
                    let written = write_tables(dir, &state.tables)?;
                    info!("wrote {} tables to {dir}", written.len());
                }
                Ok(())
            }),
        ),
    ]
}

fn execute(
    config: &MappingConfig,
    mut state: RunState,
    phase_fns: Vec<(&str, PhaseFn)>,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<RunOutput> {
    let mut timings: HashMap<String, f64> = HashMap::new();
    let total_start = Instant::now();

    for (name, phase_fn) in phase_fns {
        // Report progress
        if let Some(ref mut cb) = progress_callback {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }

        let start = Instant::now();
        phase_fn(config, &mut state)?;
        timings.insert(name.to_string(), start.elapsed().as_secs_f64());
    }

    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    let mode = state
        .index
        .as_ref()
        .map(ResolutionIndex::mode)
        .unwrap_or(config.mode);
    let report = build_report(
        config,
        mode,
        &state.set,
        &state.tables,
        state.counts,
        &timings,
        total_ms,
    );
    if let Some(dir) = &config.output_dir {
        write_json(&report, Path::new(dir).join(REPORT_FILE))?;
    }

    Ok(RunOutput {
        document: state.set.to_document(),
        tables: state.tables,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolutionMode;
    use crate::error::CrossmapError;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn document() -> ControlMapping {
        serde_json::from_value(serde_json::json!({
            "lists": {"Master": ["GL-1"], "SOC2": ["CC1.1"], "ISO27001": ["5.1"]},
            "relationships": [["Master", "GL-1", "SOC2", "CC1.1"]]
        }))
        .unwrap()
    }

    #[test]
    fn resolve_document_reports_resolution_phases() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let cb: ProgressCallback =
            Box::new(move |name, _label| sink.borrow_mut().push(name.to_string()));

        let output = resolve_document(&document(), &MappingConfig::default(), Some(cb)).unwrap();
        assert_eq!(*seen.borrow(), vec!["index", "resolve", "export"]);
        assert_eq!(output.tables.len(), 3);
        assert!(output.report.metadata.contains_key("phase_timings"));
    }

    #[test]
    fn direct_mode_skips_empty_tables() {
        let config = MappingConfig {
            mode: ResolutionMode::Direct,
            ..Default::default()
        };
        let output = resolve_document(&document(), &config, None).unwrap();
        let names: Vec<String> = output.tables.iter().map(|t| t.file_name()).collect();
        assert_eq!(names, vec!["Master_vs_SOC2.csv"]);
        assert_eq!(output.report.metadata["mode"], serde_json::json!("direct"));
        assert_eq!(output.report.metadata["hub"], serde_json::Value::Null);

        let config = MappingConfig {
            include_empty_tables: true,
            ..config
        };
        let output = resolve_document(&document(), &config, None).unwrap();
        assert_eq!(output.tables.len(), 3);
    }

    #[test]
    fn unknown_hub_fails_the_run() {
        let config = MappingConfig {
            hub: "Central".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            resolve_document(&document(), &config, None),
            Err(CrossmapError::InvalidStandard(_))
        ));
    }
}
