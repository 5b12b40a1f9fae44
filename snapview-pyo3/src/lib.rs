//! `snapview` -- Thin PyO3 wrappers around `snapview_core`.
//!
//! File I/O runs with the GIL released via `py.allow_threads()`; results
//! are converted to plain Python dicts, lists and tuples.  All business
//! logic lives in `snapview_core`.

use std::path::PathBuf;

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use snapview_core::errors::SnapViewError;
use snapview_core::loader::Snapshot;
use snapview_core::overlay::{locate_screenshot, Origin};
use snapview_core::properties::{PropertyMap, SortOrder};
use snapview_core::query::snapshot_stats;
use snapview_core::tree::node::RenderNode;
use snapview_core::tree::render_document;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn to_py_err(e: SnapViewError) -> PyErr {
    PyRuntimeError::new_err(e.to_string())
}

fn load(py: Python<'_>, path: PathBuf) -> PyResult<Snapshot> {
    py.allow_threads(move || snapview_core::loader::load_snapshot(&path))
        .map_err(to_py_err)
}

fn props_to_py<'py>(py: Python<'py>, props: &PropertyMap) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    for (key, value) in props {
        dict.set_item(key, value)?;
    }
    Ok(dict)
}

/// Read a Python `dict[str, str]` in iteration order.
fn props_from_py(props: &Bound<'_, PyDict>) -> PyResult<PropertyMap> {
    props
        .iter()
        .map(|(k, v)| Ok((k.extract::<String>()?, v.extract::<String>()?)))
        .collect()
}

/// Convert a [`RenderNode`] tree into nested Python dicts.
///
/// Iterative (stack-based) so deep snapshots cannot overflow the stack.
fn node_to_py_dict(py: Python<'_>, root: &RenderNode) -> PyResult<PyObject> {
    // Each stack frame: (node ref, parent PyList to append result to)
    let root_list = PyList::empty(py);
    let mut stack: Vec<(&RenderNode, Bound<'_, PyList>)> = vec![(root, root_list.clone())];

    while let Some((node, parent_list)) = stack.pop() {
        let dict = PyDict::new(py);
        dict.set_item("id", node.id)?;
        dict.set_item("label", &node.label)?;
        dict.set_item("properties", props_to_py(py, &node.properties)?)?;
        dict.set_item("raw_xml", &node.raw_xml)?;

        let children_list = PyList::empty(py);
        dict.set_item("children", &children_list)?;
        parent_list.append(dict)?;

        // Push children in reverse so they're processed left-to-right
        for child in node.children.iter().rev() {
            stack.push((child, children_list.clone()));
        }
    }

    // The root_list contains exactly one element (the root dict)
    root_list.get_item(0).map(|item| item.into())
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Load a snapshot file and return its rendered object tree and metadata.
#[pyfunction]
#[pyo3(signature = (path,))]
fn load_snapshot(py: Python<'_>, path: PathBuf) -> PyResult<PyObject> {
    let snapshot = load(py, path)?;
    let tree = render_document(&snapshot.root);
    let screenshot = locate_screenshot(&snapshot.root);

    let dict = PyDict::new(py);
    dict.set_item("path", snapshot.path.display().to_string())?;
    dict.set_item("file_name", snapshot.file_name())?;
    dict.set_item("found_element", tree.found_element)?;
    dict.set_item("root", node_to_py_dict(py, &tree.root)?)?;
    match screenshot {
        Some(shot) => {
            let s = PyDict::new(py);
            s.set_item("base64", shot.base64)?;
            s.set_item("width", shot.width)?;
            s.set_item("height", shot.height)?;
            dict.set_item("screenshot", s)?;
        }
        None => dict.set_item("screenshot", py.None())?,
    }
    Ok(dict.into())
}

/// Render the object tree of a snapshot file as nested dicts.
#[pyfunction]
#[pyo3(signature = (path,))]
fn render_tree(py: Python<'_>, path: PathBuf) -> PyResult<PyObject> {
    let snapshot = load(py, path)?;
    node_to_py_dict(py, &render_document(&snapshot.root).root)
}

/// Statistics for a snapshot file.
#[pyfunction]
#[pyo3(signature = (path,))]
fn snapshot_statistics(py: Python<'_>, path: PathBuf) -> PyResult<PyObject> {
    let snapshot = load(py, path)?;
    let stats = snapshot_stats(&snapshot.root, &render_document(&snapshot.root).root);

    let dict = PyDict::new(py);
    dict.set_item("element_count", stats.element_count)?;
    dict.set_item("attribute_count", stats.attribute_count)?;
    dict.set_item("node_count", stats.node_count)?;
    dict.set_item("max_depth", stats.max_depth)?;
    dict.set_item("has_screenshot", stats.has_screenshot)?;
    Ok(dict.into())
}

/// Write an HTML viewer for a snapshot and return the output path.
#[pyfunction]
#[pyo3(signature = (path, output=None, assets_dir=None))]
fn generate_viewer(
    py: Python<'_>,
    path: PathBuf,
    output: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
) -> PyResult<String> {
    py.allow_threads(move || {
        snapview_core::html::generate_viewer(&path, output.as_deref(), assets_dir.as_deref())
    })
    .map(|p| p.display().to_string())
    .map_err(to_py_err)
}

/// Highlight rectangle `(x, y, width, height)` for a property dict,
/// relative to an origin and optionally scaled from `natural` to
/// `displayed` image size.  `None` without complete integer geometry.
#[pyfunction]
#[pyo3(signature = (properties, origin=(0, 0), displayed=None, natural=None))]
fn overlay_rect(
    properties: &Bound<'_, PyDict>,
    origin: (i64, i64),
    displayed: Option<(f64, f64)>,
    natural: Option<(f64, f64)>,
) -> PyResult<Option<(f64, f64, f64, f64)>> {
    let props = props_from_py(properties)?;
    let origin = Origin { x: origin.0, y: origin.1 };
    let rect = snapview_core::overlay::overlay_rect(&props, origin);
    let rect = match (rect, displayed, natural) {
        (Some(r), Some(d), Some(n)) => r.scaled(d.0, d.1, n.0, n.1),
        (rect, _, _) => rect,
    };
    Ok(rect.map(|r| (r.x, r.y, r.width, r.height)))
}

/// Group a property dict for display: `{"standalone": [...], "groups": [...]}`.
#[pyfunction]
#[pyo3(signature = (properties, sort="desc", filter=""))]
fn group_properties(
    py: Python<'_>,
    properties: &Bound<'_, PyDict>,
    sort: &str,
    filter: &str,
) -> PyResult<PyObject> {
    let props = props_from_py(properties)?;
    let order: SortOrder = sort.parse().map_err(PyRuntimeError::new_err)?;
    let grouped = snapview_core::properties::group_properties(&props, order, filter);

    let groups = PyList::empty(py);
    for group in &grouped.groups {
        let g = PyDict::new(py);
        g.set_item("name", &group.name)?;
        g.set_item("members", group.members.clone())?;
        groups.append(g)?;
    }
    let dict = PyDict::new(py);
    dict.set_item("standalone", grouped.standalone.clone())?;
    dict.set_item("groups", groups)?;
    Ok(dict.into())
}

// ---------------------------------------------------------------------------
// Module registration
// ---------------------------------------------------------------------------

/// Register the `snapview` Python module.
#[pymodule]
fn snapview(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(load_snapshot, m)?)?;
    m.add_function(wrap_pyfunction!(render_tree, m)?)?;
    m.add_function(wrap_pyfunction!(snapshot_statistics, m)?)?;
    m.add_function(wrap_pyfunction!(generate_viewer, m)?)?;
    m.add_function(wrap_pyfunction!(overlay_rect, m)?)?;
    m.add_function(wrap_pyfunction!(group_properties, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add("__doc__", "Squish XML snapshot viewer core.")?;

    Ok(())
}
