//! Error types for `snapview_core`.
//!
//! All Rust-side failures are funnelled through [`SnapViewError`], which
//! uses `thiserror` for `Display` and `Error` derives.  Adapter crates
//! (CLI, FFI, PyO3) convert it at their own boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the `snapview_core` library.
///
/// Each variant corresponds to a distinct subsystem.
#[derive(Debug, Error)]
pub enum SnapViewError {
    /// The snapshot file does not exist.
    #[error("XML file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Reading or writing a file failed.
    #[error("IoError: {0}")]
    Io(String),

    /// The snapshot could not be parsed as XML.  Carries the parser message.
    #[error("Failed to parse XML file: {0}")]
    ParseError(String),

    /// A viewer template, stylesheet or script could not be found.
    #[error("Asset file not found: {}", .0.display())]
    AssetNotFound(PathBuf),

    /// Session config could not be written.
    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// Viewer generation failed after a successful parse.
    #[error("RenderError: {0}")]
    RenderError(String),
}

impl From<std::io::Error> for SnapViewError {
    fn from(err: std::io::Error) -> Self {
        SnapViewError::Io(err.to_string())
    }
}

impl From<quick_xml::Error> for SnapViewError {
    fn from(err: quick_xml::Error) -> Self {
        SnapViewError::ParseError(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SnapViewError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        SnapViewError::ParseError(err.to_string())
    }
}
