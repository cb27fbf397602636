//! Surface tree and presentation-state snapshots
//!
//! The export pipeline operates on a styled tree of surfaces standing in
//! for the document tree. All capture-time mutation goes through
//! [`InlineStyle`], and every mutation site takes a [`StyleSnapshot`]
//! before touching a surface so the tree can be restored exactly,
//! success or failure.

use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Handle to one surface in a [`SurfaceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceId(pub usize);

/// Recognized marker classes on surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Marker {
    /// Explicit discrete page
    Page,
    /// Logical section, used as a page when no explicit pages exist
    Section,
    /// Logical break point inside flowed content
    Break,
    /// Elevated category block inside flowed content
    Category,
    /// Screen-only chrome, hidden for the duration of an export
    Chrome,
}

/// Background of a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Background {
    #[default]
    Transparent,
    Solid([u8; 4]),
}

/// Mutable inline presentation state of one surface.
///
/// This is the entirety of what captures are allowed to mutate, and the
/// entirety of what a snapshot preserves.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InlineStyle {
    /// Forced pixel width; `None` means natural width
    pub width_px: Option<u32>,
    /// Forced pixel height; `None` means natural height
    pub height_px: Option<u32>,
    pub margin_top_px: u32,
    pub margin_right_px: u32,
    pub margin_bottom_px: u32,
    pub margin_left_px: u32,
    pub padding_px: u32,
    pub border_top_px: u32,
    pub corner_radius_px: u32,
    pub background: Background,
    pub overflow_clipped: bool,
    pub shadow: bool,
    pub visible: bool,
}

impl Default for InlineStyle {
    fn default() -> Self {
        Self {
            width_px: None,
            height_px: None,
            margin_top_px: 0,
            margin_right_px: 0,
            margin_bottom_px: 0,
            margin_left_px: 0,
            padding_px: 0,
            border_top_px: 0,
            corner_radius_px: 0,
            background: Background::Transparent,
            overflow_clipped: false,
            shadow: false,
            visible: true,
        }
    }
}

impl InlineStyle {
    pub fn zero_margins(&mut self) {
        self.margin_top_px = 0;
        self.margin_right_px = 0;
        self.margin_bottom_px = 0;
        self.margin_left_px = 0;
    }
}

/// What a surface paints, beyond its background and children
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SurfaceContent {
    /// Background and children only
    #[default]
    None,
    /// Solid block of the surface's own box
    Fill([u8; 4]),
    /// Raster file painted to fit the surface width
    Image(PathBuf),
}

/// One node of the surface tree
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceNode {
    pub markers: Vec<Marker>,
    pub style: InlineStyle,
    pub content: SurfaceContent,
    children: Vec<SurfaceId>,
}

/// Pre-mutation presentation snapshot of one surface.
///
/// Consuming it via [`SurfaceTree::restore_style`] is the only way to
/// discharge it; a dropped snapshot is a restoration leak.
#[derive(Debug, Clone)]
#[must_use = "a style snapshot must be restored exactly once"]
pub struct StyleSnapshot {
    surface: SurfaceId,
    style: InlineStyle,
}

impl StyleSnapshot {
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }
}

/// Styled tree of surfaces with a designated optional cover and body
/// container, plus the process-wide corner-rounding suppression flag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurfaceTree {
    nodes: Vec<SurfaceNode>,
    root: SurfaceId,
    cover: Option<SurfaceId>,
    body: Option<SurfaceId>,
    #[cfg_attr(feature = "serde", serde(skip))]
    rounding_suppressed: bool,
}

impl Default for SurfaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceTree {
    /// Create a tree with a single root surface
    pub fn new() -> Self {
        Self {
            nodes: vec![SurfaceNode {
                markers: Vec::new(),
                style: InlineStyle::default(),
                content: SurfaceContent::None,
                children: Vec::new(),
            }],
            root: SurfaceId(0),
            cover: None,
            body: None,
            rounding_suppressed: false,
        }
    }

    fn push_node(&mut self, node: SurfaceNode) -> SurfaceId {
        let id = SurfaceId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a surface under `parent`, returning its handle
    pub fn add_surface(
        &mut self,
        parent: SurfaceId,
        style: InlineStyle,
        content: SurfaceContent,
    ) -> SurfaceId {
        let id = self.push_node(SurfaceNode {
            markers: Vec::new(),
            style,
            content,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_marker(&mut self, surface: SurfaceId, marker: Marker) {
        let markers = &mut self.nodes[surface.0].markers;
        if !markers.contains(&marker) {
            markers.push(marker);
        }
    }

    pub fn has_marker(&self, surface: SurfaceId, marker: Marker) -> bool {
        self.nodes[surface.0].markers.contains(&marker)
    }

    pub fn root(&self) -> SurfaceId {
        self.root
    }

    pub fn cover(&self) -> Option<SurfaceId> {
        self.cover
    }

    pub fn set_cover(&mut self, surface: SurfaceId) {
        self.cover = Some(surface);
    }

    pub fn body(&self) -> Option<SurfaceId> {
        self.body
    }

    pub fn set_body(&mut self, surface: SurfaceId) {
        self.body = Some(surface);
    }

    pub fn style(&self, surface: SurfaceId) -> &InlineStyle {
        &self.nodes[surface.0].style
    }

    pub fn style_mut(&mut self, surface: SurfaceId) -> &mut InlineStyle {
        &mut self.nodes[surface.0].style
    }

    pub fn content(&self, surface: SurfaceId) -> &SurfaceContent {
        &self.nodes[surface.0].content
    }

    pub fn children(&self, surface: SurfaceId) -> &[SurfaceId] {
        &self.nodes[surface.0].children
    }

    pub fn surface_count(&self) -> usize {
        self.nodes.len()
    }

    /// All surfaces in document order (DFS preorder)
    pub fn iter_surfaces(&self) -> Vec<SurfaceId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.collect_preorder(self.root(), &mut out);
        out
    }

    fn collect_preorder(&self, surface: SurfaceId, out: &mut Vec<SurfaceId>) {
        out.push(surface);
        for &child in self.children(surface) {
            self.collect_preorder(child, out);
        }
    }

    /// Descendants of `from` (excluding `from` itself) carrying `marker`,
    /// in document order
    pub fn descendants_with_marker(&self, from: SurfaceId, marker: Marker) -> Vec<SurfaceId> {
        let mut out = Vec::new();
        for &child in self.children(from) {
            self.collect_marked(child, marker, &mut out);
        }
        out
    }

    fn collect_marked(&self, surface: SurfaceId, marker: Marker, out: &mut Vec<SurfaceId>) {
        if self.has_marker(surface, marker) {
            out.push(surface);
        }
        for &child in self.children(surface) {
            self.collect_marked(child, marker, out);
        }
    }

    // =========================================================================
    // Style Snapshot Guard
    // =========================================================================

    /// Capture the surface's presentation state before mutating it.
    ///
    /// Safe to hold for multiple surfaces at once; snapshots of different
    /// surfaces are independent.
    pub fn snapshot_style(&self, surface: SurfaceId) -> StyleSnapshot {
        StyleSnapshot {
            surface,
            style: self.nodes[surface.0].style.clone(),
        }
    }

    /// Restore exactly the presentation captured by [`snapshot_style`].
    ///
    /// [`snapshot_style`]: SurfaceTree::snapshot_style
    pub fn restore_style(&mut self, snapshot: StyleSnapshot) {
        self.nodes[snapshot.surface.0].style = snapshot.style;
    }

    // =========================================================================
    // Corner-Rounding Suppression (process-wide capture override)
    // =========================================================================

    pub fn rounding_suppressed(&self) -> bool {
        self.rounding_suppressed
    }

    pub(crate) fn set_rounding_suppressed(&mut self, on: bool) {
        self.rounding_suppressed = on;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_restores_exactly() {
        let mut tree = SurfaceTree::new();
        let surface = tree.add_surface(tree.root(), InlineStyle::default(), SurfaceContent::None);

        let snapshot = tree.snapshot_style(surface);
        let before = tree.style(surface).clone();

        let style = tree.style_mut(surface);
        style.width_px = Some(800);
        style.overflow_clipped = true;
        style.background = Background::Solid([255, 255, 255, 255]);
        style.zero_margins();

        tree.restore_style(snapshot);
        assert_eq!(*tree.style(surface), before);
    }

    #[test]
    fn test_nested_snapshots_are_independent() {
        let mut tree = SurfaceTree::new();
        let a = tree.add_surface(tree.root(), InlineStyle::default(), SurfaceContent::None);
        let b = tree.add_surface(tree.root(), InlineStyle::default(), SurfaceContent::None);

        let snap_a = tree.snapshot_style(a);
        tree.style_mut(a).padding_px = 7;
        let snap_b = tree.snapshot_style(b);
        tree.style_mut(b).padding_px = 9;

        // Restore in either order; each surface gets its own state back
        tree.restore_style(snap_a);
        tree.restore_style(snap_b);
        assert_eq!(tree.style(a).padding_px, 0);
        assert_eq!(tree.style(b).padding_px, 0);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let mut tree = SurfaceTree::new();
        let body = tree.add_surface(tree.root(), InlineStyle::default(), SurfaceContent::None);
        let first = tree.add_surface(body, InlineStyle::default(), SurfaceContent::None);
        let nested_parent = tree.add_surface(body, InlineStyle::default(), SurfaceContent::None);
        let nested = tree.add_surface(nested_parent, InlineStyle::default(), SurfaceContent::None);
        let last = tree.add_surface(body, InlineStyle::default(), SurfaceContent::None);

        tree.add_marker(first, Marker::Page);
        tree.add_marker(nested, Marker::Page);
        tree.add_marker(last, Marker::Page);

        let pages = tree.descendants_with_marker(body, Marker::Page);
        assert_eq!(pages, vec![first, nested, last]);
    }
}
