//! JSON-RPC IPC worker for GUI shells.
//!
//! Reads line-delimited JSON requests from stdin, dispatches to
//! snapview_core, writes JSON responses to stdout.  The open snapshot and
//! its selection live in this process between requests.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use snapview_core::config::SessionConfig;
use snapview_core::properties::{group_properties, SortOrder};
use snapview_core::query::{search_properties, search_tree};
use snapview_core::session::ViewerSession;

#[derive(Parser)]
#[command(name = "snapview-worker", version, about = "Snapshot viewer IPC worker process")]
struct Args {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
struct Request {
    id: u64,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct Response {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Worker state carried across requests.
#[derive(Default)]
struct Worker {
    session: Option<ViewerSession>,
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Extract a node id from `params.id`.
fn node_id(params: &Value) -> Result<u32, String> {
    params
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| "missing or invalid node id".to_owned())
}

impl Worker {
    fn session(&self) -> Result<&ViewerSession, String> {
        self.session.as_ref().ok_or_else(|| "no snapshot open".to_owned())
    }

    fn session_mut(&mut self) -> Result<&mut ViewerSession, String> {
        self.session.as_mut().ok_or_else(|| "no snapshot open".to_owned())
    }

    fn open(&mut self, params: &Value) -> Result<Value, String> {
        let path = params
            .get("path")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .ok_or_else(|| "missing path".to_owned())?;
        let session = ViewerSession::open(&path).map_err(|e| e.to_string())?;

        let mut config = SessionConfig::load();
        config.record_open(&path);
        if let Err(e) = config.save() {
            warn!("session config not saved: {e}");
        }

        let tree = session.tree();
        let result = json!({
            "file": session.snapshot().file_name(),
            "node_count": tree.root.node_count(),
            "found_element": tree.found_element,
            "has_screenshot": session.screenshot().is_some(),
        });
        self.session = Some(session);
        Ok(result)
    }

    fn select(&mut self, params: &Value) -> Result<Value, String> {
        let id = node_id(params)?;
        let session = self.session_mut()?;
        if session.node(id).is_none() {
            return Err(format!("no node with id {id}"));
        }
        session.select(id);
        let overlay = session.overlay(id, None);
        let node = session.node(id).ok_or_else(|| format!("no node with id {id}"))?;
        Ok(json!({
            "id": node.id,
            "label": node.label,
            "properties": node.properties,
            "raw_xml": node.raw_xml,
            "overlay": overlay,
        }))
    }

    fn overlay(&self, params: &Value) -> Result<Value, String> {
        let id = node_id(params)?;
        let session = self.session()?;
        let displayed = match (
            params.get("displayed_width").and_then(Value::as_f64),
            params.get("displayed_height").and_then(Value::as_f64),
        ) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        };
        to_value(session.overlay(id, displayed))
    }

    fn groups(&self, params: &Value) -> Result<Value, String> {
        let id = node_id(params)?;
        let session = self.session()?;
        let node = session.node(id).ok_or_else(|| format!("no node with id {id}"))?;
        let sort = match params.get("sort").and_then(Value::as_str) {
            Some(s) => s.parse::<SortOrder>()?,
            None => SortOrder::default(),
        };
        let filter = params.get("filter").and_then(Value::as_str).unwrap_or("");
        to_value(group_properties(&node.properties, sort, filter))
    }

    fn search(&self, params: &Value) -> Result<Value, String> {
        let term = params.get("term").and_then(Value::as_str).unwrap_or("");
        let root = &self.session()?.tree().root;
        Ok(json!({
            "nodes": search_tree(root, term),
            "properties": search_properties(root, term),
        }))
    }

    fn dispatch(&mut self, method: &str, params: &Value) -> Result<Value, String> {
        match method {
            "ping" => Ok(Value::String("pong".to_owned())),
            "open" => self.open(params),
            "reload" => {
                let session = self.session_mut()?;
                session.reload().map_err(|e| e.to_string())?;
                to_value(session.tree().root.node_count())
            }
            "tree" => to_value(&self.session()?.tree().root),
            "select" => self.select(params),
            "overlay" => self.overlay(params),
            "groups" => self.groups(params),
            "search" => self.search(params),
            "screenshot" => to_value(self.session()?.screenshot()),
            "stats" => to_value(self.session()?.stats()),
            "session" => to_value(SessionConfig::load()),
            _ => Err(format!("unknown method: {method}")),
        }
    }
}

fn write_response(stdout: &mut impl Write, resp: &Response) {
    if let Ok(json) = serde_json::to_string(resp) {
        let _ = writeln!(stdout, "{json}");
    } else {
        // Serialization failed -- send minimal error response.
        let _ = writeln!(
            stdout,
            r#"{{"id":{},"error":"response serialization failed"}}"#,
            resp.id
        );
    }
    let _ = stdout.flush();
}

fn main() {
    let args = Args::parse();
    let default = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut worker = Worker::default();
    debug!("snapview-worker: ready");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                debug!("snapview-worker: stdin read error: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let req: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // Parse error -- use id=0 since we can't extract it.
                let resp = Response {
                    id: 0,
                    result: None,
                    error: Some(format!("invalid JSON: {e}")),
                };
                write_response(&mut stdout, &resp);
                continue;
            }
        };

        let resp = match worker.dispatch(&req.method, &req.params) {
            Ok(result) => Response {
                id: req.id,
                result: Some(result),
                error: None,
            },
            Err(error) => Response {
                id: req.id,
                result: None,
                error: Some(error),
            },
        };
        write_response(&mut stdout, &resp);
    }
}
