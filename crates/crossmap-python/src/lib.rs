//! PyO3 bindings for the Crossmap resolution engine.

use std::collections::BTreeMap;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crossmap_core::config::{ColumnSpec, MappingConfig, ResolutionMode};
use crossmap_core::graph::identifier::natural_sort as sort_naturally;
use crossmap_core::graph::relationship_set::RelationshipSet;
use crossmap_core::output::read_document;
use crossmap_core::phases::expand::expand as expand_cell;
use crossmap_core::phases::resolve::{PairwiseResolver, ResolutionIndex};
use crossmap_core::pipeline;
use crossmap_core::CrossmapError;

fn to_py_err(e: CrossmapError) -> PyErr {
    match e {
        CrossmapError::InvalidStandard(_) | CrossmapError::InvalidPairing(_) => {
            PyValueError::new_err(e.to_string())
        }
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

/// Serialize to JSON then parse into a Python dict.
fn to_py_dict<T: serde::Serialize>(py: Python<'_>, value: &T) -> PyResult<Py<PyDict>> {
    let json_str = serde_json::to_string(value)
        .map_err(|e: serde_json::Error| PyRuntimeError::new_err(e.to_string()))?;

    let json_module = py.import("json")?;
    let py_dict = json_module
        .call_method1("loads", (json_str,))?
        .extract::<Py<PyDict>>()?;

    Ok(py_dict)
}

/// Expand one raw cell into its identifiers.
#[pyfunction]
fn expand(cell: &str) -> Vec<String> {
    expand_cell(cell)
}

/// Sort identifiers in natural dotted-numeric order.
#[pyfunction]
fn natural_sort(mut items: Vec<String>) -> Vec<String> {
    sort_naturally(&mut items);
    items
}

/// Resolve one standard pair from a mapping document.
///
/// Returns `{primary_item: [secondary_item, ...]}` covering every primary item.
#[pyfunction]
#[pyo3(signature = (path, primary, secondary, hub = "Master", direct = false))]
fn resolve(
    py: Python<'_>,
    path: &str,
    primary: &str,
    secondary: &str,
    hub: &str,
    direct: bool,
) -> PyResult<Py<PyDict>> {
    let document = read_document(path).map_err(to_py_err)?;
    let set = RelationshipSet::from_document(&document);
    let index = if direct {
        ResolutionIndex::direct(&set)
    } else {
        ResolutionIndex::hub(&set, hub).map_err(to_py_err)?
    };
    let mapping = PairwiseResolver::new(&set, &index)
        .resolve(primary, secondary)
        .map_err(to_py_err)?;

    // Keys keep natural order through the list of pairs.
    let entries: Vec<(String, Vec<String>)> = mapping
        .entries()
        .iter()
        .map(|(item, related)| {
            (
                item.to_string(),
                related.iter().map(|r| r.to_string()).collect(),
            )
        })
        .collect();
    let dict = PyDict::new(py);
    for (item, related) in entries {
        dict.set_item(item, related)?;
    }
    Ok(dict.unbind())
}

/// Convert and export `input` into `output_dir`, returning the run report.
#[pyfunction]
#[pyo3(signature = (
    input,
    output_dir = None,
    hub_column = "MASTER",
    hub = "Master",
    peers = None,
    direct = false,
    include_empty_tables = false,
    progress = None,
))]
#[allow(clippy::too_many_arguments)]
fn run(
    py: Python<'_>,
    input: &str,
    output_dir: Option<String>,
    hub_column: &str,
    hub: &str,
    peers: Option<Vec<String>>,
    direct: bool,
    include_empty_tables: bool,
    progress: Option<PyObject>,
) -> PyResult<Py<PyDict>> {
    let config = MappingConfig {
        input_path: input.to_string(),
        output_dir,
        hub: hub.to_string(),
        mode: if direct {
            ResolutionMode::Direct
        } else {
            ResolutionMode::Hub
        },
        anchor: ColumnSpec::new(hub_column, hub),
        peers: peers
            .unwrap_or_default()
            .iter()
            .map(|p| ColumnSpec::new(p, p))
            .collect(),
        include_empty_tables,
        quiet: true,
        ..Default::default()
    };

    // Wrap the Python callable as a Rust ProgressCallback
    let progress_callback = progress.map(|py_cb| -> pipeline::ProgressCallback {
        Box::new(move |phase: &str, label: &str| {
            Python::with_gil(|py| {
                let _ = py_cb.call1(py, (phase, label));
            });
        })
    });

    let output = pipeline::run_pipeline(&config, progress_callback).map_err(to_py_err)?;
    to_py_dict(py, &output.report)
}

/// Return the Crossmap engine version.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Standard → identifiers of a mapping document, in natural order.
#[pyfunction]
fn lists(py: Python<'_>, path: &str) -> PyResult<Py<PyDict>> {
    let document = read_document(path).map_err(to_py_err)?;
    let set = RelationshipSet::from_document(&document);
    let lists: BTreeMap<&str, Vec<&str>> = set
        .lists()
        .iter()
        .map(|(standard, ids)| (standard.as_str(), ids.iter().map(|id| id.as_str()).collect()))
        .collect();
    to_py_dict(py, &lists)
}

/// Crossmap Rust resolution engine.
#[pymodule]
fn _crossmap_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(expand, m)?)?;
    m.add_function(wrap_pyfunction!(natural_sort, m)?)?;
    m.add_function(wrap_pyfunction!(resolve, m)?)?;
    m.add_function(wrap_pyfunction!(lists, m)?)?;
    m.add_function(wrap_pyfunction!(run, m)?)?;
    m.add_function(wrap_pyfunction!(version, m)?)?;
    Ok(())
}
