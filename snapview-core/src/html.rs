//! Self-contained HTML viewer generation.
//!
//! A viewer page is the object tree as nested `<ul class='tree'>` markup,
//! the embedded screenshot as a `data:` URL, the raw snapshot text for the
//! "Copy XML" button, and the properties-panel script.  Every node span
//! carries its id, its property map as JSON (`data-props`) and its XML
//! fragment (`data-xml`), so the page needs no server.
//!
//! Page chrome comes from [`ViewerAssets`]: either the compiled-in files
//! or a directory holding `viewer_template.html`, `viewer_styles.css` and
//! `viewer_scripts.js`.  The template uses `{{NAME}}` placeholders.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use quick_xml::escape::escape;

use crate::errors::SnapViewError;
use crate::loader::{load_snapshot, Snapshot};
use crate::overlay::locate_screenshot;
use crate::tree::node::RenderNode;
use crate::tree::{render_document, RenderedTree};

pub const TEMPLATE_FILE: &str = "viewer_template.html";
pub const STYLES_FILE: &str = "viewer_styles.css";
pub const SCRIPTS_FILE: &str = "viewer_scripts.js";

/// Suffix appended to the input's file stem for the default output name.
pub const OUTPUT_SUFFIX: &str = "_viewer.html";

const NO_STRUCTURE: &str = "<p><i>No object structure found in XML.</i></p>";
const NO_SCREENSHOT: &str = "<p><i>No screenshot found.</i></p>";

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Template, stylesheet and script of the viewer page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerAssets {
    pub template: String,
    pub styles: String,
    pub scripts: String,
}

impl ViewerAssets {
    /// Assets compiled into the library.
    pub fn builtin() -> Self {
        Self {
            template: include_str!("../assets/viewer_template.html").to_owned(),
            styles: include_str!("../assets/viewer_styles.css").to_owned(),
            scripts: include_str!("../assets/viewer_scripts.js").to_owned(),
        }
    }

    /// Load the three asset files from `dir`.
    ///
    /// The first missing file is reported as [`SnapViewError::AssetNotFound`].
    pub fn from_dir(dir: &Path) -> Result<Self, SnapViewError> {
        let read = |name: &str| -> Result<String, SnapViewError> {
            let path = dir.join(name);
            if !path.is_file() {
                return Err(SnapViewError::AssetNotFound(path));
            }
            debug!("loading viewer asset {}", path.display());
            Ok(fs::read_to_string(&path)?)
        };
        Ok(Self {
            template: read(TEMPLATE_FILE)?,
            styles: read(STYLES_FILE)?,
            scripts: read(SCRIPTS_FILE)?,
        })
    }
}

impl Default for ViewerAssets {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Substitute `{{NAME}}` placeholders in one pass.
///
/// Inserted values are never rescanned, so snapshot text that happens to
/// contain `{{...}}` is left alone.  Unknown placeholders are kept.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Tree markup
// ---------------------------------------------------------------------------

fn write_node(node: &RenderNode, out: &mut String) -> Result<(), SnapViewError> {
    let props = serde_json::to_string(&node.properties)
        .map_err(|e| SnapViewError::RenderError(format!("node {} properties: {e}", node.id)))?;
    out.push_str(&format!(
        "<li><span class=\"node\" data-id=\"{}\" data-props=\"{}\" data-xml=\"{}\">{}</span>",
        node.id,
        escape(props.as_str()),
        escape(node.raw_xml.as_str()),
        escape(node.label.as_str()),
    ));
    if !node.children.is_empty() {
        out.push_str("<ul>");
        for child in &node.children {
            write_node(child, out)?;
        }
        out.push_str("</ul>");
    }
    out.push_str("</li>");
    Ok(())
}

/// Tree panel markup for a rendered tree.
///
/// A tree rendered from the document root (no `element` node found) is
/// preceded by a notice.
pub fn tree_html(tree: &RenderedTree) -> Result<String, SnapViewError> {
    let mut out = String::new();
    if !tree.found_element {
        out.push_str(NO_STRUCTURE);
    }
    out.push_str("<ul class='tree'>");
    write_node(&tree.root, &mut out)?;
    out.push_str("</ul>");
    Ok(out)
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// Complete viewer page for a loaded snapshot.
pub fn render_viewer(snapshot: &Snapshot, assets: &ViewerAssets) -> Result<String, SnapViewError> {
    let tree = render_document(&snapshot.root);
    let tree_markup = tree_html(&tree)?;

    let screenshot = match locate_screenshot(&snapshot.root) {
        Some(shot) => format!(
            "<img class='screenshot' id='screenshotImg' src='data:image/png;base64,{}' alt='Screenshot'>",
            shot.base64
        ),
        None => NO_SCREENSHOT.to_owned(),
    };

    let title = escape(snapshot.file_name()).into_owned();
    let raw_xml = escape(snapshot.raw_text.as_str()).into_owned();

    Ok(fill_template(
        &assets.template,
        &[
            ("TITLE", &title),
            ("STYLES", &assets.styles),
            ("TREE_HTML", &tree_markup),
            ("SCREENSHOT_IMG", &screenshot),
            ("SCREENSHOT_NAME", "Screenshot from XML"),
            ("RAW_XML", &raw_xml),
            ("SCRIPTS", &assets.scripts),
        ],
    ))
}

/// Minimal page reporting a generation failure.
pub fn error_page(title: &str, error: &SnapViewError) -> String {
    format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Error - {}</title></head>\
         <body><h1>Error</h1><p>{}</p></body></html>\n",
        escape(title),
        escape(error.to_string()),
    )
}

/// `<stem>_viewer.html` next to `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_owned());
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}"))
}

/// Load `xml`, render the viewer and write it to `output` (default:
/// [`default_output_path`]).  Returns the written path.
///
/// Assets are read from `assets_dir` when given.  If one is missing an
/// error page is written in place of the viewer and the
/// [`SnapViewError::AssetNotFound`] is still returned.
pub fn generate_viewer(
    xml: &Path,
    output: Option<&Path>,
    assets_dir: Option<&Path>,
) -> Result<PathBuf, SnapViewError> {
    let snapshot = load_snapshot(xml)?;
    let output = output.map_or_else(|| default_output_path(xml), Path::to_path_buf);

    let assets = match assets_dir.map(ViewerAssets::from_dir).transpose() {
        Ok(assets) => assets.unwrap_or_default(),
        Err(err) => {
            fs::write(&output, error_page(&snapshot.file_name(), &err))?;
            return Err(err);
        }
    };

    let page = render_viewer(&snapshot, &assets)?;
    fs::write(&output, page)?;
    info!("wrote viewer {}", output.display());
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
