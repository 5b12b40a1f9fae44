//! Snapshot file loading.
//!
//! Snapshot dumps are sometimes prefixed with log output from the capture
//! run.  [`strip_preamble`] drops everything before the first `<ui` tag
//! (or the first `<` when there is none) so that the remainder can be
//! handed to the XML parser unchanged.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::element::SourceElement;
use crate::errors::SnapViewError;

/// A parsed snapshot file.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Path the snapshot was loaded from.
    pub path: PathBuf,
    /// Whole file contents, lossily decoded, preamble included.
    pub raw_text: String,
    /// Root of the parsed document.
    pub root: SourceElement,
}

impl Snapshot {
    /// File name component of [`Snapshot::path`], for titles.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Return the slice of `content` starting at the XML document.
pub fn strip_preamble(content: &str) -> &str {
    let start = content
        .find("<ui")
        .or_else(|| content.find('<'))
        .unwrap_or(0);
    if start > 0 {
        debug!("skipping {start} bytes of preamble before XML document");
    }
    &content[start..]
}

/// Parse snapshot text that may carry a non-XML preamble.
pub fn parse_snapshot_text(content: &str) -> Result<SourceElement, SnapViewError> {
    SourceElement::parse(strip_preamble(content))
}

/// Read and parse a snapshot file.
///
/// Invalid UTF-8 is replaced rather than rejected.  A missing file is
/// [`SnapViewError::FileNotFound`]; malformed XML is
/// [`SnapViewError::ParseError`].
pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapViewError> {
    if !path.is_file() {
        return Err(SnapViewError::FileNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let raw_text = String::from_utf8_lossy(&bytes).into_owned();
    let root = parse_snapshot_text(&raw_text)?;
    debug!(
        "loaded {} ({} bytes, root <{}>)",
        path.display(),
        bytes.len(),
        root.tag
    );

    Ok(Snapshot {
        path: path.to_path_buf(),
        raw_text,
        root,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_strip_preamble_prefers_ui_tag() {
        let text = "INFO <started>\nmore log\n<ui><element/></ui>";
        assert_eq!(strip_preamble(text), "<ui><element/></ui>");
    }

    #[test]
    fn test_strip_preamble_falls_back_to_first_angle() {
        let text = "garbage line\n<root/>";
        assert_eq!(strip_preamble(text), "<root/>");
    }

    #[test]
    fn test_strip_preamble_no_markup() {
        assert_eq!(strip_preamble("plain"), "plain");
    }

    #[test]
    fn test_parse_snapshot_text_with_log_preamble() {
        let root = parse_snapshot_text("2024-01-01 capture done\n<ui><element class='A'/></ui>").unwrap();
        assert_eq!(root.tag, "ui");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_snapshot(Path::new("/definitely/not/here.xml")).unwrap_err();
        assert!(matches!(err, SnapViewError::FileNotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<ui><element></ui>").unwrap();
        let err = load_snapshot(file.path()).unwrap_err();
        assert!(matches!(err, SnapViewError::ParseError(_)));
    }

    #[test]
    fn test_load_replaces_invalid_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\xff\xfe log\n<ui><element objectName='caf\xe9'/></ui>").unwrap();
        let snapshot = load_snapshot(file.path()).unwrap();
        assert_eq!(snapshot.root.tag, "ui");
        assert!(snapshot.raw_text.contains('\u{FFFD}'));
        let element = &snapshot.root.children[0];
        assert_eq!(element.attr("objectName"), Some("caf\u{FFFD}"));
    }
}
