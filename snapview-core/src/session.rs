//! State of one open snapshot in an interactive viewer.
//!
//! A [`ViewerSession`] owns everything derived from a loaded file: the
//! parsed document, the rendered tree, the decoded screenshot, the overlay
//! origin and the current selection.  Loading a file builds a fresh session;
//! nothing carries over except through [`ViewerSession::reload`], which
//! replaces all of it at once or nothing on failure.

use std::path::Path;

use log::debug;

use crate::errors::SnapViewError;
use crate::loader::{load_snapshot, Snapshot};
use crate::overlay::{locate_screenshot, OverlayMapper, OverlayRect, Screenshot};
use crate::query::{find_node, snapshot_stats, SnapshotStats};
use crate::tree::node::RenderNode;
use crate::tree::{render_document, RenderedTree};

#[derive(Debug)]
pub struct ViewerSession {
    snapshot: Snapshot,
    tree: RenderedTree,
    screenshot: Option<Screenshot>,
    mapper: OverlayMapper,
    selected: Option<u32>,
}

impl ViewerSession {
    /// Load and render `path`.
    pub fn open(path: &Path) -> Result<Self, SnapViewError> {
        load_snapshot(path).map(Self::from_snapshot)
    }

    /// Render an already loaded snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let tree = render_document(&snapshot.root);
        let screenshot = locate_screenshot(&snapshot.root);
        Self {
            snapshot,
            tree,
            screenshot,
            mapper: OverlayMapper::new(),
            selected: None,
        }
    }

    /// Re-read the file from disk.  On failure the current state is kept.
    pub fn reload(&mut self) -> Result<(), SnapViewError> {
        let fresh = Self::open(&self.snapshot.path)?;
        debug!("reloaded {}", self.snapshot.path.display());
        *self = fresh;
        Ok(())
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn tree(&self) -> &RenderedTree {
        &self.tree
    }

    pub fn screenshot(&self) -> Option<&Screenshot> {
        self.screenshot.as_ref()
    }

    pub fn node(&self, id: u32) -> Option<&RenderNode> {
        find_node(&self.tree.root, id)
    }

    /// Make `id` the selection.  Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: u32) -> Option<&RenderNode> {
        if self.node(id).is_some() {
            self.selected = Some(id);
        }
        self.selected()
    }

    pub fn selected(&self) -> Option<&RenderNode> {
        self.selected.and_then(|id| self.node(id))
    }

    /// Overlay for node `id`.
    ///
    /// With `displayed` set the rectangle is scaled from the screenshot's
    /// natural size; that needs a screenshot.  Without it the rectangle is
    /// in natural pixels.
    pub fn overlay(&self, id: u32, displayed: Option<(f64, f64)>) -> Option<OverlayRect> {
        let node = self.node(id)?;
        match displayed {
            None => self.mapper.overlay(&self.tree.root, node),
            Some(size) => {
                let shot = self.screenshot.as_ref()?;
                let natural = (f64::from(shot.width), f64::from(shot.height));
                self.mapper.display_overlay(&self.tree.root, node, size, natural)
            }
        }
    }

    pub fn stats(&self) -> SnapshotStats {
        snapshot_stats(&self.snapshot.root, &self.tree.root)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
