//! Document model: vertices, shapes, groups, animation frames and the root aggregate.
//!
//! Shapes never own coordinates. Every shape refers to vertices by id, so two
//! shapes that share a corner share the vertex and move together. The
//! invariant maintained by [`crate::reduce`] is that every id referenced by a
//! shape exists in [`Document::vertices`].
//!
//! `vertices` and `shapes` sit behind `Arc` so that history snapshots are a
//! pointer copy; mutation goes through `Arc::make_mut`, which clones the map
//! only when a snapshot still holds the previous version.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Bounds, Point};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random id.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Unique identifier for a vertex.
    VertexId
);
string_id!(
    /// Unique identifier for a shape.
    ShapeId
);
string_id!(
    /// Unique identifier for a group.
    GroupId
);
string_id!(
    /// Unique identifier for an animation frame.
    FrameId
);

pub type VertexMap = HashMap<VertexId, Vertex>;
pub type ShapeMap = HashMap<ShapeId, Shape>;

// =============================================================
// Vertex
// =============================================================

/// Role of a vertex in shape topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VertexKind {
    /// User-placed point referenced directly by shapes.
    Anchor,
    /// Bézier handle owned by an anchor.
    Control,
}

/// A point in canvas space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub x: f64,
    pub y: f64,
    pub kind: VertexKind,
    /// Owning anchor for control vertices. Informational only.
    pub parent_id: Option<VertexId>,
}

impl Vertex {
    #[must_use]
    pub fn anchor(id: VertexId, at: Point) -> Self {
        Self { id, x: at.x, y: at.y, kind: VertexKind::Anchor, parent_id: None }
    }

    #[must_use]
    pub fn control(id: VertexId, at: Point, parent: VertexId) -> Self {
        Self { id, x: at.x, y: at.y, kind: VertexKind::Control, parent_id: Some(parent) }
    }

    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Sparse update for a vertex. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialVertex {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub kind: Option<VertexKind>,
    pub parent_id: Option<Option<VertexId>>,
}

impl PartialVertex {
    /// Update that moves a vertex to `p`.
    #[must_use]
    pub fn at(p: Point) -> Self {
        Self { x: Some(p.x), y: Some(p.y), ..Default::default() }
    }
}

// =============================================================
// Shape
// =============================================================

/// The closed set of shape kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Line,
    Rect,
    Circle,
    Bezier,
    Polygon,
}

impl ShapeKind {
    pub const ALL: [Self; 5] = [Self::Line, Self::Rect, Self::Circle, Self::Bezier, Self::Polygon];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Bezier => "bezier",
            Self::Polygon => "polygon",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw)
    }
}

/// One cubic span of a Bézier shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub p0: VertexId,
    pub p1: VertexId,
    pub p2: VertexId,
    pub p3: VertexId,
}

impl Segment {
    #[must_use]
    pub fn points(&self) -> [&VertexId; 4] {
        [&self.p0, &self.p1, &self.p2, &self.p3]
    }
}

/// Kind-specific vertex references and properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Line { vertices: [VertexId; 2] },
    Rect { vertices: [VertexId; 4] },
    Circle { center: VertexId, radius: f64 },
    Polygon { vertices: Vec<VertexId>, closed: bool },
    Bezier { segments: Vec<Segment>, closed: bool },
}

impl Geometry {
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Line { .. } => ShapeKind::Line,
            Self::Rect { .. } => ShapeKind::Rect,
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Polygon { .. } => ShapeKind::Polygon,
            Self::Bezier { .. } => ShapeKind::Bezier,
        }
    }

    /// Ordered, de-duplicated vertex references.
    ///
    /// For Bézier shapes this walks every segment's four points, so adjoining
    /// segments contribute their shared anchor once.
    #[must_use]
    pub fn vertex_refs(&self) -> Vec<&VertexId> {
        let refs: Vec<&VertexId> = match self {
            Self::Line { vertices } => vertices.iter().collect(),
            Self::Rect { vertices } => vertices.iter().collect(),
            Self::Circle { center, .. } => vec![center],
            Self::Polygon { vertices, .. } => vertices.iter().collect(),
            Self::Bezier { segments, .. } => segments.iter().flat_map(Segment::points).collect(),
        };
        let mut seen = HashSet::new();
        refs.into_iter().filter(|id| seen.insert(*id)).collect()
    }

    /// Vertex references in declaration order with repeats kept, so a shape
    /// collapsed by a merge still has its full arity. Bézier shapes fall back
    /// to [`Self::vertex_refs`]; their topology lives in the segments.
    #[must_use]
    pub fn ordered_refs(&self) -> Vec<&VertexId> {
        match self {
            Self::Line { vertices } => vertices.iter().collect(),
            Self::Rect { vertices } => vertices.iter().collect(),
            Self::Circle { center, .. } => vec![center],
            Self::Polygon { vertices, .. } => vertices.iter().collect(),
            Self::Bezier { .. } => self.vertex_refs(),
        }
    }

    #[must_use]
    pub fn references(&self, id: &VertexId) -> bool {
        match self {
            Self::Line { vertices } => vertices.contains(id),
            Self::Rect { vertices } => vertices.contains(id),
            Self::Circle { center, .. } => center == id,
            Self::Polygon { vertices, .. } => vertices.contains(id),
            Self::Bezier { segments, .. } => segments.iter().any(|s| s.points().contains(&id)),
        }
    }

    /// Rewrite every reference for which `map` returns a replacement.
    pub fn remap_refs<F>(&mut self, map: F)
    where
        F: Fn(&VertexId) -> Option<VertexId>,
    {
        let swap = |id: &mut VertexId| {
            if let Some(next) = map(id) {
                *id = next;
            }
        };
        match self {
            Self::Line { vertices } => vertices.iter_mut().for_each(swap),
            Self::Rect { vertices } => vertices.iter_mut().for_each(swap),
            Self::Circle { center, .. } => swap(center),
            Self::Polygon { vertices, .. } => vertices.iter_mut().for_each(swap),
            Self::Bezier { segments, .. } => {
                for seg in segments {
                    swap(&mut seg.p0);
                    swap(&mut seg.p1);
                    swap(&mut seg.p2);
                    swap(&mut seg.p3);
                }
            }
        }
    }

    #[must_use]
    pub fn radius(&self) -> Option<f64> {
        match self {
            Self::Circle { radius, .. } => Some(*radius),
            _ => None,
        }
    }

    #[must_use]
    pub fn closed(&self) -> Option<bool> {
        match self {
            Self::Polygon { closed, .. } | Self::Bezier { closed, .. } => Some(*closed),
            _ => None,
        }
    }
}

/// Stroke and fill settings, exported verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub stroke_color: String,
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    pub opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self { stroke_color: "#1F1A17".to_string(), stroke_width: 2.0, fill_color: None, opacity: 1.0 }
    }
}

/// Sparse style update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialStyle {
    pub stroke_color: Option<String>,
    pub stroke_width: Option<f64>,
    /// `Some(None)` clears the fill.
    pub fill_color: Option<Option<String>>,
    pub opacity: Option<f64>,
}

impl Style {
    pub fn apply(&mut self, partial: &PartialStyle) {
        if let Some(ref c) = partial.stroke_color {
            self.stroke_color.clone_from(c);
        }
        if let Some(w) = partial.stroke_width {
            self.stroke_width = w;
        }
        if let Some(ref f) = partial.fill_color {
            self.fill_color.clone_from(f);
        }
        if let Some(o) = partial.opacity {
            self.opacity = o.clamp(0.0, 1.0);
        }
    }
}

/// A drawable shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub geometry: Geometry,
    pub style: Style,
    pub visible: bool,
    pub locked: bool,
    /// Draw order; lower values are drawn beneath higher values.
    pub z_index: i64,
}

impl Shape {
    #[must_use]
    pub fn new(id: ShapeId, geometry: Geometry) -> Self {
        Self { id, geometry, style: Style::default(), visible: true, locked: false, z_index: 0 }
    }

    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }
}

/// Sparse update for a shape. Kind-specific fields are ignored on other kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialShape {
    pub style: Option<PartialStyle>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub z_index: Option<i64>,
    /// Circle only.
    pub radius: Option<f64>,
    /// Polygon and Bézier only.
    pub closed: Option<bool>,
}

impl Shape {
    pub fn apply(&mut self, partial: &PartialShape) {
        if let Some(ref style) = partial.style {
            self.style.apply(style);
        }
        if let Some(v) = partial.visible {
            self.visible = v;
        }
        if let Some(l) = partial.locked {
            self.locked = l;
        }
        if let Some(z) = partial.z_index {
            self.z_index = z;
        }
        match &mut self.geometry {
            Geometry::Circle { radius, .. } => {
                if let Some(r) = partial.radius {
                    *radius = r;
                }
            }
            Geometry::Polygon { closed, .. } | Geometry::Bezier { closed, .. } => {
                if let Some(c) = partial.closed {
                    *closed = c;
                }
            }
            Geometry::Line { .. } | Geometry::Rect { .. } => {}
        }
    }
}

// =============================================================
// Group / Frame
// =============================================================

/// Named, non-exclusive collection of shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub shape_ids: Vec<ShapeId>,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialGroup {
    pub name: Option<String>,
    pub shape_ids: Option<Vec<ShapeId>>,
    pub locked: Option<bool>,
}

/// Animatable per-shape properties captured by a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameShapeProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// A named snapshot of animatable state. Meaningless without the live topology.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub name: String,
    /// Unix milliseconds at capture time.
    pub timestamp: u64,
    pub vertex_positions: HashMap<VertexId, Point>,
    pub shape_properties: HashMap<ShapeId, FrameShapeProps>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialFrame {
    pub name: Option<String>,
    pub timestamp: Option<u64>,
}

// =============================================================
// Document
// =============================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub vertex_ids: HashSet<VertexId>,
    pub shape_ids: HashSet<ShapeId>,
}

impl Selection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertex_ids.is_empty() && self.shape_ids.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hover {
    pub vertex_id: Option<VertexId>,
    pub shape_id: Option<ShapeId>,
}

/// Root aggregate owned by the editing session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub vertices: Arc<VertexMap>,
    pub shapes: Arc<ShapeMap>,
    pub groups: HashMap<GroupId, Group>,
    pub frames: Vec<Frame>,
    pub current_frame_index: usize,
    pub selection: Selection,
    pub hover: Hover,
}

impl Document {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there is no topology to conflict with an import.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.shapes.is_empty()
    }

    #[must_use]
    pub fn vertex(&self, id: &VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    #[must_use]
    pub fn shape(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.get(id)
    }

    #[must_use]
    pub fn position(&self, id: &VertexId) -> Option<Point> {
        self.vertices.get(id).map(Vertex::position)
    }

    /// Shapes that reference `id`, in no particular order.
    #[must_use]
    pub fn shapes_referencing(&self, id: &VertexId) -> Vec<&ShapeId> {
        self.shapes
            .values()
            .filter(|s| s.geometry.references(id))
            .map(|s| &s.id)
            .collect()
    }

    /// Shapes sorted by `(z_index, id)` for draw order.
    #[must_use]
    pub fn sorted_shapes(&self) -> Vec<&Shape> {
        let mut shapes: Vec<&Shape> = self.shapes.values().collect();
        shapes.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        shapes
    }

    /// Z-index one above the current topmost shape.
    #[must_use]
    pub fn next_z_index(&self) -> i64 {
        self.shapes.values().map(|s| s.z_index).max().map_or(0, |z| z.saturating_add(1))
    }

    /// Vertices sorted by id, for stable iteration.
    #[must_use]
    pub fn sorted_vertices(&self) -> Vec<&Vertex> {
        let mut vertices: Vec<&Vertex> = self.vertices.values().collect();
        vertices.sort_by(|a, b| a.id.cmp(&b.id));
        vertices
    }

    #[must_use]
    pub fn selected_vertices(&self) -> Vec<&Vertex> {
        self.sorted_vertices()
            .into_iter()
            .filter(|v| self.selection.vertex_ids.contains(&v.id))
            .collect()
    }

    #[must_use]
    pub fn selected_shapes(&self) -> Vec<&Shape> {
        self.sorted_shapes()
            .into_iter()
            .filter(|s| self.selection.shape_ids.contains(&s.id))
            .collect()
    }

    /// Bounding box of every selected vertex and every vertex of every selected shape.
    #[must_use]
    pub fn selection_bounds(&self) -> Option<Bounds> {
        let from_vertices = self.selected_vertices().into_iter().map(Vertex::position);
        let from_shapes = self
            .selected_shapes()
            .into_iter()
            .flat_map(|s| s.geometry.vertex_refs())
            .filter_map(|id| self.position(id));
        Bounds::from_points(from_vertices.chain(from_shapes))
    }

    /// Bounding box of every live vertex.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.vertices.values().map(Vertex::position))
    }

    /// Whether any locked shape references the vertex.
    #[must_use]
    pub fn is_vertex_locked(&self, id: &VertexId) -> bool {
        self.shapes.values().any(|s| s.locked && s.geometry.references(id))
    }

    /// Whether every shape reference resolves to a live vertex.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.shapes
            .values()
            .all(|s| s.geometry.vertex_refs().into_iter().all(|id| self.vertices.contains_key(id)))
    }

    #[must_use]
    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.get(self.current_frame_index)
    }

    // --- Primitive mutations used by the reducer ---

    pub fn vertices_mut(&mut self) -> &mut VertexMap {
        Arc::make_mut(&mut self.vertices)
    }

    pub fn shapes_mut(&mut self) -> &mut ShapeMap {
        Arc::make_mut(&mut self.shapes)
    }

    /// Apply a partial update to an existing vertex. Returns false if the vertex doesn't exist.
    pub fn apply_vertex_partial(&mut self, id: &VertexId, partial: &PartialVertex) -> bool {
        if !self.vertices.contains_key(id) {
            return false;
        }
        let Some(v) = self.vertices_mut().get_mut(id) else {
            return false;
        };
        if let Some(x) = partial.x {
            v.x = x;
        }
        if let Some(y) = partial.y {
            v.y = y;
        }
        if let Some(kind) = partial.kind {
            v.kind = kind;
        }
        if let Some(ref parent) = partial.parent_id {
            v.parent_id.clone_from(parent);
        }
        true
    }

    /// Apply a partial update to an existing shape. Returns false if the shape doesn't exist.
    pub fn apply_shape_partial(&mut self, id: &ShapeId, partial: &PartialShape) -> bool {
        if !self.shapes.contains_key(id) {
            return false;
        }
        let Some(s) = self.shapes_mut().get_mut(id) else {
            return false;
        };
        s.apply(partial);
        true
    }

    /// Drop selection and hover entries that no longer resolve.
    pub fn prune_transient(&mut self) {
        let vertices = Arc::clone(&self.vertices);
        let shapes = Arc::clone(&self.shapes);
        self.selection.vertex_ids.retain(|id| vertices.contains_key(id));
        self.selection.shape_ids.retain(|id| shapes.contains_key(id));
        if self.hover.vertex_id.as_ref().is_some_and(|id| !vertices.contains_key(id)) {
            self.hover.vertex_id = None;
        }
        if self.hover.shape_id.as_ref().is_some_and(|id| !shapes.contains_key(id)) {
            self.hover.shape_id = None;
        }
    }
}
