//! `snapview_core` -- Pure Rust core library for the snapshot viewer.
//!
//! This crate contains the whole snapshot pipeline with **no PyO3 or UI
//! toolkit dependency**.  It can be consumed by:
//! - `snapview-pyo3` (PyO3 Python extension)
//! - `snapview-ffi` (C ABI library for ctypes / other languages)
//! - `snapview-cli` (HTML generator, tree dump and JSON-RPC worker)
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `SnapViewError` enum via `thiserror` |
//! | [`element`] | Owned XML element tree built with `quick-xml` |
//! | [`loader`] | Snapshot file reading and preamble stripping |
//! | [`properties`] | Flattened property maps and panel grouping |
//! | [`tree`] | Object-tree rendering with pre-order ids |
//! | [`overlay`] | Embedded screenshot and highlight rectangles |
//! | [`query`] | Node lookup, search and statistics |
//! | [`html`] | Self-contained HTML viewer generation |
//! | [`session`] | One open snapshot with selection state |
//! | [`config`] | Persisted recent-files session config |

pub mod config;
pub mod element;
pub mod errors;
pub mod html;
pub mod loader;
pub mod overlay;
pub mod properties;
pub mod query;
pub mod session;
pub mod tree;
