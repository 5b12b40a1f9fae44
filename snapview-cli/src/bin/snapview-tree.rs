//! Standalone CLI tool for dumping a snapshot's object tree.
//!
//! Prints the rendered tree as JSON (or an indented outline), single
//! nodes, grouped properties, search results and statistics, and copies
//! property text to the clipboard.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use serde::Serialize;

use snapview_core::errors::SnapViewError;
use snapview_core::loader::load_snapshot;
use snapview_core::properties::{copy_text, group_properties, CopyTarget, SortOrder};
use snapview_core::query::{find_node, search_properties, search_tree, snapshot_stats};
use snapview_core::tree::node::RenderNode;
use snapview_core::tree::render_document;

#[derive(Parser)]
#[command(name = "snapview-tree", version, about = "Dump the object tree of a Squish XML snapshot")]
struct Args {
    /// Snapshot XML file
    input: PathBuf,

    /// Restrict output to the node with this id
    #[arg(long)]
    id: Option<u32>,

    /// Print the node's properties grouped for display (needs --id)
    #[arg(long, requires = "id")]
    groups: bool,

    /// Sort order for --groups: desc, asc or none
    #[arg(long, default_value = "desc")]
    sort: SortOrder,

    /// Case-insensitive property filter for --groups
    #[arg(long, default_value = "")]
    filter: String,

    /// Print ids of nodes whose label contains TERM, with their ancestors
    #[arg(long, value_name = "TERM")]
    find: Option<String>,

    /// Print property entries whose key or value contains TERM
    #[arg(long, value_name = "TERM")]
    search: Option<String>,

    /// Print document statistics
    #[arg(long)]
    stats: bool,

    /// Copy a property's name, value or name=value to the clipboard (needs --id and --key)
    #[arg(long, requires_all = ["id", "key"])]
    copy: Option<CopyTarget>,

    /// Property key for --copy
    #[arg(long)]
    key: Option<String>,

    /// Indented text outline instead of JSON
    #[arg(long)]
    text: bool,

    /// Deepest level shown by --text (the selected node is level 0)
    #[arg(long, requires = "text")]
    max_depth: Option<usize>,

    /// Compact JSON output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> Result<String, String> {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    json.map_err(|e| format!("JSON serialization failed: {e}"))
}

fn outline(node: &RenderNode, depth: usize, max_depth: Option<usize>, out: &mut String) {
    if max_depth.is_some_and(|max| depth > max) {
        return;
    }
    let _ = writeln!(out, "{:indent$}[{}] {}", "", node.id, node.label, indent = depth * 2);
    for child in &node.children {
        outline(child, depth + 1, max_depth, out);
    }
}

fn copy_to_clipboard(text: String) -> Result<(), String> {
    let mut clipboard = arboard::Clipboard::new().map_err(|e| format!("clipboard unavailable: {e}"))?;
    clipboard
        .set_text(text)
        .map_err(|e| format!("clipboard write failed: {e}"))
}

fn run(args: &Args) -> Result<String, (u8, String)> {
    let fail = |e: String| (3u8, e);
    let snapshot = load_snapshot(&args.input).map_err(|e| {
        let code = if matches!(e, SnapViewError::FileNotFound(_)) { 2 } else { 3 };
        (code, e.to_string())
    })?;
    let tree = render_document(&snapshot.root);

    if args.stats {
        return to_json(&snapshot_stats(&snapshot.root, &tree.root), args.compact).map_err(fail);
    }
    if let Some(term) = &args.find {
        return to_json(&search_tree(&tree.root, term), args.compact).map_err(fail);
    }
    if let Some(term) = &args.search {
        return to_json(&search_properties(&tree.root, term), args.compact).map_err(fail);
    }

    let node = match args.id {
        Some(id) => find_node(&tree.root, id).ok_or_else(|| (3, format!("no node with id {id}")))?,
        None => &tree.root,
    };

    if let (Some(target), Some(key)) = (args.copy, &args.key) {
        let text = copy_text(&node.properties, key, target)
            .ok_or_else(|| (3, format!("node {} has no property {key:?}", node.id)))?;
        copy_to_clipboard(text.clone()).map_err(fail)?;
        return Ok(format!("Copied {text:?} to clipboard."));
    }
    if args.groups {
        let grouped = group_properties(&node.properties, args.sort, &args.filter);
        return to_json(&grouped, args.compact).map_err(fail);
    }
    if args.text {
        let mut out = String::new();
        outline(node, 0, args.max_depth, &mut out);
        return Ok(out.trim_end().to_owned());
    }
    to_json(node, args.compact).map_err(fail)
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };
    init_logging(args.verbose);

    match run(&args) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err((code, message)) => {
            eprintln!("Error: {message}");
            ExitCode::from(code)
        }
    }
}
