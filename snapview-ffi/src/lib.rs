//! C ABI library for snapview -- loadable by ctypes, C#, or any FFI consumer.
//!
//! All exported functions follow the convention:
//! - Return `i32` status code: `SNV_OK=0`, `SNV_ERROR=-1`
//! - String outputs allocated by Rust, freed via `snv_free_string()`
//! - Last error retrievable via `snv_last_error()`

use std::cell::RefCell;
use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;
use std::ptr;

use snapview_core::html::generate_viewer;
use snapview_core::loader::load_snapshot;
use snapview_core::query::snapshot_stats;
use snapview_core::session::ViewerSession;
use snapview_core::tree::render_document;

pub const SNV_OK: i32 = 0;
pub const SNV_ERROR: i32 = -1;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Retrieve the last error message (thread-local).
///
/// Returns a pointer valid until the next snv_* call on this thread.
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn snv_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .map(|s| s.as_ptr())
            .unwrap_or(ptr::null())
    })
}

/// Free a string previously allocated by a snv_* function.
///
/// # Safety
///
/// `ptr` must be a pointer returned by a snv_* function or null.
#[no_mangle]
pub unsafe extern "C" fn snv_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

// ---------------------------------------------------------------------------
// Argument and result helpers
// ---------------------------------------------------------------------------

/// Borrow a required UTF-8 path argument.
unsafe fn path_arg(ptr: *const c_char, name: &str) -> Result<PathBuf, String> {
    if ptr.is_null() {
        return Err(format!("{name} is null"));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(PathBuf::from)
        .map_err(|e| format!("{name}: invalid UTF-8: {e}"))
}

/// Borrow an optional UTF-8 path argument; null means absent.
unsafe fn optional_path_arg(ptr: *const c_char, name: &str) -> Result<Option<PathBuf>, String> {
    if ptr.is_null() {
        Ok(None)
    } else {
        unsafe { path_arg(ptr, name) }.map(Some)
    }
}

/// Hand `value` to the caller through `out`, or record the error.
unsafe fn finish(result: Result<String, String>, out: *mut *mut c_char) -> i32 {
    let value = match result {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return SNV_ERROR;
        }
    };
    match CString::new(value) {
        Ok(cstr) => {
            unsafe { *out = cstr.into_raw() };
            SNV_OK
        }
        Err(e) => {
            set_last_error(&format!("CString conversion failed: {e}"));
            SNV_ERROR
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

/// Load a snapshot and return its rendered object tree as JSON.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 C string.
/// `out_json` must be a valid pointer to a `*mut c_char`; on success it is
/// set to a heap-allocated string to be freed with `snv_free_string()`.
#[no_mangle]
pub unsafe extern "C" fn snv_render_tree_json(path: *const c_char, out_json: *mut *mut c_char) -> i32 {
    if out_json.is_null() {
        set_last_error("out_json is null");
        return SNV_ERROR;
    }
    let result = unsafe { path_arg(path, "path") }.and_then(|path| {
        let snapshot = load_snapshot(&path).map_err(|e| e.to_string())?;
        to_json(&render_document(&snapshot.root))
    });
    unsafe { finish(result, out_json) }
}

/// Load a snapshot and return its statistics as JSON.
///
/// # Safety
///
/// Same contract as [`snv_render_tree_json`].
#[no_mangle]
pub unsafe extern "C" fn snv_snapshot_stats_json(path: *const c_char, out_json: *mut *mut c_char) -> i32 {
    if out_json.is_null() {
        set_last_error("out_json is null");
        return SNV_ERROR;
    }
    let result = unsafe { path_arg(path, "path") }.and_then(|path| {
        let snapshot = load_snapshot(&path).map_err(|e| e.to_string())?;
        let tree = render_document(&snapshot.root);
        to_json(&snapshot_stats(&snapshot.root, &tree.root))
    });
    unsafe { finish(result, out_json) }
}

/// Overlay rectangle of node `id` as JSON (`null` when the node has no
/// usable geometry), scaled to `displayed_width` x `displayed_height`
/// when both are positive.
///
/// # Safety
///
/// Same contract as [`snv_render_tree_json`].
#[no_mangle]
pub unsafe extern "C" fn snv_overlay_json(
    path: *const c_char,
    id: u32,
    displayed_width: f64,
    displayed_height: f64,
    out_json: *mut *mut c_char,
) -> i32 {
    if out_json.is_null() {
        set_last_error("out_json is null");
        return SNV_ERROR;
    }
    let result = unsafe { path_arg(path, "path") }.and_then(|path| {
        let session = ViewerSession::open(&path).map_err(|e| e.to_string())?;
        if session.node(id).is_none() {
            return Err(format!("no node with id {id}"));
        }
        let displayed = (displayed_width > 0.0 && displayed_height > 0.0)
            .then_some((displayed_width, displayed_height));
        to_json(&session.overlay(id, displayed))
    });
    unsafe { finish(result, out_json) }
}

/// Generate an HTML viewer and return the written file's path.
///
/// `output` and `assets_dir` may be null for the defaults.
///
/// # Safety
///
/// `path` must be a valid null-terminated UTF-8 C string; `output` and
/// `assets_dir` must be null or valid C strings.  `out_path` follows the
/// `out_json` contract of [`snv_render_tree_json`].
#[no_mangle]
pub unsafe extern "C" fn snv_generate_viewer(
    path: *const c_char,
    output: *const c_char,
    assets_dir: *const c_char,
    out_path: *mut *mut c_char,
) -> i32 {
    if out_path.is_null() {
        set_last_error("out_path is null");
        return SNV_ERROR;
    }
    let result = (|| {
        let input = unsafe { path_arg(path, "path") }?;
        let output = unsafe { optional_path_arg(output, "output") }?;
        let assets = unsafe { optional_path_arg(assets_dir, "assets_dir") }?;
        generate_viewer(&input, output.as_deref(), assets.as_deref())
            .map(|p| p.display().to_string())
            .map_err(|e| e.to_string())
    })();
    unsafe { finish(result, out_path) }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
