use assert_cmd::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const SNAPSHOT: &str = r#"capture log line
<ui>
  <element simplifiedType="Window" objectName="main">
    <abstractProperties><geometry><x>100</x><y>200</y><width>800</width><height>600</height></geometry></abstractProperties>
    <children>
      <element simplifiedType="Button" objectName="ok">
        <abstractProperties><geometry><x>110</x><y>210</y><width>50</width><height>20</height></geometry></abstractProperties>
        <realname>okButton</realname>
      </element>
    </children>
  </element>
</ui>"#;

fn command(bin: &str, config: &Path) -> Command {
    let exe = match bin {
        "snapview-html" => env!("CARGO_BIN_EXE_snapview-html"),
        "snapview-tree" => env!("CARGO_BIN_EXE_snapview-tree"),
        _ => env!("CARGO_BIN_EXE_snapview-worker"),
    };
    let mut cmd = Command::new(exe);
    cmd.env("SNAPVIEW_CONFIG", config);
    cmd
}

fn write_snapshot(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("dump.xml");
    fs::write(&path, SNAPSHOT).expect("write snapshot");
    path
}

#[test]
fn test_html_generates_viewer_beside_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    let config = tmp.path().join("session.json");

    command("snapview-html", &config).arg(&xml).assert().success();

    let page = fs::read_to_string(tmp.path().join("dump_viewer.html")).expect("viewer");
    assert!(page.contains("Window (main)"));
    assert!(page.contains("No screenshot found."));

    let saved = fs::read_to_string(&config).expect("session config");
    assert!(saved.contains("dump.xml"));
}

#[test]
fn test_html_missing_argument_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    command("snapview-html", &tmp.path().join("session.json"))
        .assert()
        .code(1);
}

#[test]
fn test_html_last_without_history_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    command("snapview-html", &tmp.path().join("session.json"))
        .arg("--last")
        .assert()
        .code(1);
}

#[test]
fn test_html_missing_file_exits_2() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let output = command("snapview-html", &tmp.path().join("session.json"))
        .arg(tmp.path().join("absent.xml"))
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("XML file not found"));
}

#[test]
fn test_html_parse_error_exits_3() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = tmp.path().join("bad.xml");
    fs::write(&xml, "<ui><element></ui>").expect("write");
    command("snapview-html", &tmp.path().join("session.json"))
        .arg(&xml)
        .assert()
        .code(3);
}

#[test]
fn test_html_missing_assets_exits_3_with_error_page() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    let assets = tmp.path().join("assets");
    fs::create_dir(&assets).expect("mkdir");

    command("snapview-html", &tmp.path().join("session.json"))
        .arg(&xml)
        .arg("--assets")
        .arg(&assets)
        .assert()
        .code(3);

    let page = fs::read_to_string(tmp.path().join("dump_viewer.html")).expect("error page");
    assert!(page.contains("Asset file not found:"));
}

#[test]
fn test_html_multiple_inputs_report_worst_code() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    command("snapview-html", &tmp.path().join("session.json"))
        .arg(&xml)
        .arg(tmp.path().join("absent.xml"))
        .assert()
        .code(2);
    assert!(tmp.path().join("dump_viewer.html").exists());
}

#[test]
fn test_html_last_reopens_previous_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    let config = tmp.path().join("session.json");

    command("snapview-html", &config).arg(&xml).assert().success();
    fs::remove_file(tmp.path().join("dump_viewer.html")).expect("remove");

    command("snapview-html", &config).arg("--last").assert().success();
    assert!(tmp.path().join("dump_viewer.html").exists());
}

#[test]
fn test_tree_text_outline() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    let output = command("snapview-tree", &tmp.path().join("session.json"))
        .arg(&xml)
        .arg("--text")
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end(), "[1] Window (main)\n  [2] Button (ok)");
}

#[test]
fn test_tree_text_outline_max_depth() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    let output = command("snapview-tree", &tmp.path().join("session.json"))
        .arg(&xml)
        .args(["--text", "--max-depth", "0"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), "[1] Window (main)");
}

#[test]
fn test_tree_missing_argument_exits_1() {
    let tmp = tempfile::tempdir().expect("tempdir");
    command("snapview-tree", &tmp.path().join("session.json"))
        .assert()
        .code(1);
}

#[test]
fn test_tree_missing_file_exits_2() {
    let tmp = tempfile::tempdir().expect("tempdir");
    command("snapview-tree", &tmp.path().join("session.json"))
        .arg(tmp.path().join("absent.xml"))
        .assert()
        .code(2);
}

#[test]
fn test_tree_node_json_and_groups() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    let config = tmp.path().join("session.json");

    let output = command("snapview-tree", &config)
        .args(["--id", "2", "--compact"])
        .arg(&xml)
        .output()
        .expect("run");
    let node: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(node["label"], "Button (ok)");
    assert_eq!(node["properties"]["realname"], "okButton");
    assert_eq!(node["properties"]["geometry_width"], "50");

    let output = command("snapview-tree", &config)
        .args(["--id", "2", "--groups", "--sort", "asc", "--compact"])
        .arg(&xml)
        .output()
        .expect("run");
    let grouped: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(grouped["groups"][0]["name"], "geometry");
    assert_eq!(grouped["groups"][0]["members"][0][0], "height");
}

#[test]
fn test_tree_unknown_id_exits_3() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    command("snapview-tree", &tmp.path().join("session.json"))
        .args(["--id", "99"])
        .arg(&xml)
        .assert()
        .code(3);
}

#[test]
fn test_tree_stats() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());
    let output = command("snapview-tree", &tmp.path().join("session.json"))
        .arg(&xml)
        .arg("--stats")
        .output()
        .expect("run");
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(stats["node_count"], 2);
    assert_eq!(stats["max_depth"], 1);
    assert_eq!(stats["has_screenshot"], false);
}

#[test]
fn test_worker_session_round_trip() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let xml = write_snapshot(tmp.path());

    let mut child = command("snapview-worker", &tmp.path().join("session.json"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    {
        let mut stdin = child.stdin.take().expect("stdin");
        let open = serde_json::json!({"id": 2, "method": "open", "params": {"path": xml}});
        writeln!(stdin, r#"{{"id":1,"method":"ping"}}"#).expect("write");
        writeln!(stdin, "{open}").expect("write");
        writeln!(stdin, r#"{{"id":3,"method":"select","params":{{"id":2}}}}"#).expect("write");
        writeln!(stdin, r#"{{"id":4,"method":"search","params":{{"term":"ok"}}}}"#).expect("write");
        writeln!(stdin, r#"{{"id":5,"method":"bogus"}}"#).expect("write");
        writeln!(stdin, "not json").expect("write");
    }
    let output = child.wait_with_output().expect("wait");
    let lines: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).expect("response json"))
        .collect();

    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0]["result"], "pong");
    assert_eq!(lines[1]["result"]["node_count"], 2);
    assert_eq!(lines[2]["result"]["label"], "Button (ok)");
    assert_eq!(lines[2]["result"]["overlay"]["x"], 10.0);
    assert_eq!(lines[3]["result"]["nodes"], serde_json::json!([1, 2]));
    assert!(lines[4]["error"].as_str().expect("error").contains("unknown method"));
    assert_eq!(lines[5]["id"], 0);
}
