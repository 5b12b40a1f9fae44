//! Embedded screenshot lookup and highlight-rectangle math.
//!
//! Snapshots may embed the captured window as base64 PNG text in an
//! `<image type="PNG">` element.  Widget geometry is recorded in screen
//! coordinates, so a selected node's rectangle is shifted by a reference
//! origin (the geometry of the first node that has one, usually the
//! captured top-level window) before it is drawn over the image.
//!
//! The rectangle is recomputed on every selection; only the origin is
//! resolved once per loaded snapshot (see [`OverlayMapper`]).

use std::cell::OnceCell;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngDecoder;
use image::ImageDecoder;
use log::warn;
use serde::Serialize;

use crate::element::SourceElement;
use crate::errors::SnapViewError;
use crate::properties::PropertyMap;
use crate::tree::node::RenderNode;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A decoded screenshot.
#[derive(Debug, Clone, Serialize)]
pub struct Screenshot {
    /// Base64 text with whitespace removed, ready for a `data:` URL.
    pub base64: String,
    #[serde(skip)]
    pub png: Vec<u8>,
    /// Natural width in pixels.
    pub width: u32,
    /// Natural height in pixels.
    pub height: u32,
}

/// Widget rectangle read from the `geometry_*` properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Screen position that maps to the screenshot's top-left pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub x: i64,
    pub y: i64,
}

/// Highlight rectangle in screenshot (or display) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl OverlayRect {
    /// Scale from natural image pixels to displayed pixels, per axis.
    ///
    /// Returns `None` if either natural dimension is zero.
    pub fn scaled(
        &self,
        displayed_width: f64,
        displayed_height: f64,
        natural_width: f64,
        natural_height: f64,
    ) -> Option<OverlayRect> {
        if natural_width <= 0.0 || natural_height <= 0.0 {
            return None;
        }
        let sx = displayed_width / natural_width;
        let sy = displayed_height / natural_height;
        Some(OverlayRect {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        })
    }
}

// ---------------------------------------------------------------------------
// Screenshot lookup
// ---------------------------------------------------------------------------

/// Base64 text of the first `<image type="PNG">` with non-empty content,
/// searched in document order.  Whitespace is stripped.
pub fn find_screenshot_base64(document: &SourceElement) -> Option<String> {
    document
        .descendants()
        .filter(|e| e.tag == "image" && e.attr("type") == Some("PNG"))
        .find_map(|e| e.trimmed_text())
        .map(|text| text.chars().filter(|c| !c.is_whitespace()).collect())
}

/// Decode base64 PNG text and read its natural size.
pub fn decode_screenshot(base64_text: &str) -> Result<Screenshot, SnapViewError> {
    let png = STANDARD
        .decode(base64_text)
        .map_err(|e| SnapViewError::RenderError(format!("screenshot base64: {e}")))?;
    let (width, height) = PngDecoder::new(Cursor::new(png.as_slice()))
        .map_err(|e| SnapViewError::RenderError(format!("screenshot PNG: {e}")))?
        .dimensions();
    Ok(Screenshot {
        base64: base64_text.to_owned(),
        png,
        width,
        height,
    })
}

/// Locate and decode the embedded screenshot.
///
/// Absent or undecodable screenshots both mean "no screenshot"; the
/// latter is logged.
pub fn locate_screenshot(document: &SourceElement) -> Option<Screenshot> {
    let text = find_screenshot_base64(document)?;
    match decode_screenshot(&text) {
        Ok(shot) => Some(shot),
        Err(e) => {
            warn!("ignoring embedded screenshot: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

fn parse_coord(props: &PropertyMap, key: &str) -> Option<i64> {
    props.get(key)?.trim().parse().ok()
}

/// Geometry of a node, if all four `geometry_*` values parse as integers.
pub fn node_geometry(props: &PropertyMap) -> Option<Geometry> {
    Some(Geometry {
        x: parse_coord(props, "geometry_x")?,
        y: parse_coord(props, "geometry_y")?,
        width: parse_coord(props, "geometry_width")?,
        height: parse_coord(props, "geometry_height")?,
    })
}

/// Origin of the first node in pre-order that exposes `geometry_x`.
///
/// Unparseable coordinates count as 0; no such node gives `(0, 0)`.
pub fn resolve_origin(root: &RenderNode) -> Origin {
    root.iter()
        .find(|n| n.properties.contains_key("geometry_x"))
        .map(|n| Origin {
            x: parse_coord(&n.properties, "geometry_x").unwrap_or(0),
            y: parse_coord(&n.properties, "geometry_y").unwrap_or(0),
        })
        .unwrap_or_default()
}

/// Raw overlay of `props` relative to `origin`, in natural image pixels.
///
/// `None` when the shift by `origin` does not fit in an `i64`.
pub fn overlay_rect(props: &PropertyMap, origin: Origin) -> Option<OverlayRect> {
    let g = node_geometry(props)?;
    Some(OverlayRect {
        x: g.x.checked_sub(origin.x)? as f64,
        y: g.y.checked_sub(origin.y)? as f64,
        width: g.width as f64,
        height: g.height as f64,
    })
}

// ---------------------------------------------------------------------------
// Per-snapshot mapper
// ---------------------------------------------------------------------------

/// Overlay calculator for one loaded snapshot.
///
/// The origin is resolved on first use and kept until the mapper is
/// dropped; create a new mapper whenever a file is (re)loaded.
#[derive(Debug, Default)]
pub struct OverlayMapper {
    origin: OnceCell<Origin>,
}

impl OverlayMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference origin for `root`, resolved lazily.
    pub fn origin(&self, root: &RenderNode) -> Origin {
        *self.origin.get_or_init(|| resolve_origin(root))
    }

    /// Overlay for `node` in natural image pixels.
    pub fn overlay(&self, root: &RenderNode, node: &RenderNode) -> Option<OverlayRect> {
        overlay_rect(&node.properties, self.origin(root))
    }

    /// Overlay for `node` scaled to an image displayed at
    /// `displayed` size whose natural size is `natural`.
    pub fn display_overlay(
        &self,
        root: &RenderNode,
        node: &RenderNode,
        displayed: (f64, f64),
        natural: (f64, f64),
    ) -> Option<OverlayRect> {
        self.overlay(root, node)?
            .scaled(displayed.0, displayed.1, natural.0, natural.1)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::render_document;

    /// 1x1 transparent PNG.
    const TINY_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_overlay_relative_to_origin() {
        let p = props(&[
            ("geometry_x", "110"),
            ("geometry_y", "210"),
            ("geometry_width", "50"),
            ("geometry_height", "20"),
        ]);
        let rect = overlay_rect(&p, Origin { x: 100, y: 200 }).unwrap();
        assert_eq!(rect, OverlayRect { x: 10.0, y: 10.0, width: 50.0, height: 20.0 });
        let drawn = rect.scaled(200.0, 200.0, 100.0, 100.0).unwrap();
        assert_eq!(drawn, OverlayRect { x: 20.0, y: 20.0, width: 100.0, height: 40.0 });
    }

    #[test]
    fn test_scaling_is_per_axis() {
        let rect = OverlayRect { x: 10.0, y: 10.0, width: 10.0, height: 10.0 };
        let drawn = rect.scaled(50.0, 200.0, 100.0, 100.0).unwrap();
        assert_eq!(drawn, OverlayRect { x: 5.0, y: 20.0, width: 5.0, height: 20.0 });
        assert!(rect.scaled(10.0, 10.0, 0.0, 10.0).is_none());
    }

    #[test]
    fn test_missing_geometry_means_no_overlay() {
        let p = props(&[("geometry_x", "1"), ("geometry_y", "2"), ("geometry_width", "3")]);
        assert!(overlay_rect(&p, Origin::default()).is_none());
    }

    #[test]
    fn test_non_integer_geometry_means_no_overlay() {
        let p = props(&[
            ("geometry_x", "abc"),
            ("geometry_y", "2"),
            ("geometry_width", "3"),
            ("geometry_height", "4"),
        ]);
        assert!(node_geometry(&p).is_none());
    }

    #[test]
    fn test_overflowing_shift_means_no_overlay() {
        let p = props(&[
            ("geometry_x", "9223372036854775807"),
            ("geometry_y", "0"),
            ("geometry_width", "1"),
            ("geometry_height", "1"),
        ]);
        assert!(node_geometry(&p).is_some());
        assert!(overlay_rect(&p, Origin { x: -1, y: 0 }).is_none());
        let p = props(&[
            ("geometry_x", "0"),
            ("geometry_y", "-9223372036854775808"),
            ("geometry_width", "1"),
            ("geometry_height", "1"),
        ]);
        assert!(overlay_rect(&p, Origin { x: 0, y: 1 }).is_none());
    }

    #[test]
    fn test_geometry_accepts_sign_and_whitespace() {
        let p = props(&[
            ("geometry_x", " -8 "),
            ("geometry_y", "+2"),
            ("geometry_width", "3"),
            ("geometry_height", "4"),
        ]);
        assert_eq!(
            node_geometry(&p),
            Some(Geometry { x: -8, y: 2, width: 3, height: 4 })
        );
    }

    const DOC: &str = r#"
<ui>
  <element class="Window">
    <children>
      <element class="Frame">
        <abstractProperties><geometry><x>100</x><y>200</y><width>800</width><height>600</height></geometry></abstractProperties>
        <children>
          <element class="Button">
            <abstractProperties><geometry><x>110</x><y>210</y><width>50</width><height>20</height></geometry></abstractProperties>
          </element>
        </children>
      </element>
    </children>
  </element>
</ui>"#;

    #[test]
    fn test_origin_is_first_node_with_geometry() {
        let doc = SourceElement::parse(DOC).unwrap();
        let tree = render_document(&doc);
        assert_eq!(resolve_origin(&tree.root), Origin { x: 100, y: 200 });
    }

    #[test]
    fn test_origin_defaults_to_zero() {
        let doc = SourceElement::parse("<ui><element/></ui>").unwrap();
        let tree = render_document(&doc);
        assert_eq!(resolve_origin(&tree.root), Origin::default());
    }

    #[test]
    fn test_mapper_overlay_for_selected_node() {
        let doc = SourceElement::parse(DOC).unwrap();
        let tree = render_document(&doc);
        let mapper = OverlayMapper::new();
        let button = tree.root.iter().find(|n| n.id == 3).unwrap();
        let rect = mapper.overlay(&tree.root, button).unwrap();
        assert_eq!(rect, OverlayRect { x: 10.0, y: 10.0, width: 50.0, height: 20.0 });
        let drawn = mapper
            .display_overlay(&tree.root, button, (1600.0, 1200.0), (800.0, 600.0))
            .unwrap();
        assert_eq!(drawn, OverlayRect { x: 20.0, y: 20.0, width: 100.0, height: 40.0 });
        assert!(mapper.overlay(&tree.root, &tree.root).is_none());
    }

    #[test]
    fn test_find_screenshot_skips_empty_and_non_png() {
        let xml = format!(
            r#"<ui><image type="JPEG">xxx</image><image type="PNG">  </image><element><image type="PNG">
            {}
            </image></element></ui>"#,
            TINY_PNG
        );
        let doc = SourceElement::parse(&xml).unwrap();
        assert_eq!(find_screenshot_base64(&doc).as_deref(), Some(TINY_PNG));
    }

    #[test]
    fn test_locate_screenshot_reads_dimensions() {
        let xml = format!(r#"<ui><image type="PNG">{TINY_PNG}</image></ui>"#);
        let doc = SourceElement::parse(&xml).unwrap();
        let shot = locate_screenshot(&doc).unwrap();
        assert_eq!((shot.width, shot.height), (1, 1));
        assert!(shot.png.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_no_screenshot() {
        let doc = SourceElement::parse("<ui><element/></ui>").unwrap();
        assert!(locate_screenshot(&doc).is_none());
    }

    #[test]
    fn test_undecodable_screenshot_is_absent() {
        let doc = SourceElement::parse(r#"<ui><image type="PNG">!!!notbase64</image></ui>"#).unwrap();
        assert!(find_screenshot_base64(&doc).is_some());
        assert!(locate_screenshot(&doc).is_none());
    }
}
