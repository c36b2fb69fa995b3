//! The document action protocol.
//!
//! Every change to a [`Document`] is an [`Action`] applied by [`reduce`], a
//! total function from `(Document, Action)` to the next `Document`. Actions
//! addressing ids or frame indices that don't exist return the document
//! unchanged. Ids and timestamps are generated by the caller and carried in
//! the action, so the reducer is deterministic.
//!
//! History is not part of the document. `Undo`, `Redo` and `ClearAll` are
//! routed through [`crate::store::Store`], which owns the snapshot stacks;
//! here `Undo` and `Redo` leave the document untouched.

#[cfg(test)]
#[path = "reduce_test.rs"]
mod reduce_test;

use std::collections::{HashMap, HashSet};

use crate::doc::{
    Document, Frame, FrameId, FrameShapeProps, Geometry, Group, GroupId, Hover, PartialFrame, PartialGroup,
    PartialShape, PartialVertex, Selection, Shape, ShapeId, Vertex, VertexId, VertexKind,
};
use crate::geometry::{Point, lerp, lerp_point};

/// Topology and frames produced by an import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentData {
    pub vertices: Vec<Vertex>,
    pub shapes: Vec<Shape>,
    pub groups: Vec<Group>,
    pub frames: Option<Vec<Frame>>,
}

/// A document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddVertex(Vertex),
    UpdateVertex { id: VertexId, fields: PartialVertex },
    DeleteVertex(VertexId),
    AddShape(Shape),
    UpdateShape { id: ShapeId, fields: PartialShape },
    DeleteShape(ShapeId),
    SelectVertices { ids: Vec<VertexId>, additive: bool },
    SelectShapes { ids: Vec<ShapeId>, additive: bool },
    SetHover(Hover),
    /// Replace `ids` (at least two) with one new anchor at `target`.
    MergeVertices { ids: Vec<VertexId>, target: Point, new_id: VertexId },
    /// Wholesale replace of topology, groups and frames.
    ImportData(DocumentData),
    /// Union imported entities into the document, keyed by id.
    MergeData(DocumentData),
    CreateGroup(Group),
    UpdateGroup { id: GroupId, fields: PartialGroup },
    DeleteGroup(GroupId),
    RecordFrame { id: FrameId, name: Option<String>, timestamp: u64 },
    ApplyFrame(usize),
    DeleteFrame(usize),
    SetCurrentFrame(usize),
    UpdateFrame { index: usize, fields: PartialFrame },
    UpdateCurrentFrameData,
    InterpolateFrames { from: usize, to: usize, t: f64 },
    /// Several partial updates applied together, never snapshotted.
    BatchUpdate { vertices: Vec<(VertexId, PartialVertex)>, shapes: Vec<(ShapeId, PartialShape)> },
    Undo,
    Redo,
    ClearAll,
}

impl Action {
    /// Structural edits are snapshotted before they are applied; continuous
    /// edits (moves, style tweaks, frame playback) are not.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::AddVertex(_)
                | Self::DeleteVertex(_)
                | Self::AddShape(_)
                | Self::DeleteShape(_)
                | Self::MergeVertices { .. }
                | Self::ImportData(_)
                | Self::MergeData(_)
        )
    }
}

/// Apply `action` to `doc` and return the resulting document.
#[must_use]
pub fn reduce(mut doc: Document, action: Action) -> Document {
    match action {
        Action::AddVertex(v) => {
            doc.vertices_mut().insert(v.id.clone(), v);
        }
        Action::UpdateVertex { id, fields } => {
            doc.apply_vertex_partial(&id, &fields);
        }
        Action::DeleteVertex(id) => delete_vertex(&mut doc, &id),
        Action::AddShape(shape) => add_shape(&mut doc, shape),
        Action::UpdateShape { id, fields } => {
            doc.apply_shape_partial(&id, &fields);
        }
        Action::DeleteShape(id) => delete_shape(&mut doc, &id),
        Action::SelectVertices { ids, additive } => {
            let ids = ids.into_iter().filter(|id| doc.vertices.contains_key(id));
            if additive {
                doc.selection.vertex_ids.extend(ids);
            } else {
                doc.selection = Selection { vertex_ids: ids.collect(), shape_ids: HashSet::new() };
            }
        }
        Action::SelectShapes { ids, additive } => {
            let ids = ids.into_iter().filter(|id| doc.shapes.contains_key(id));
            if additive {
                doc.selection.shape_ids.extend(ids);
            } else {
                doc.selection = Selection { vertex_ids: HashSet::new(), shape_ids: ids.collect() };
            }
        }
        Action::SetHover(hover) => doc.hover = hover,
        Action::MergeVertices { ids, target, new_id } => merge_vertices(&mut doc, &ids, target, new_id),
        Action::ImportData(data) => import_data(&mut doc, data),
        Action::MergeData(data) => merge_data(&mut doc, data),
        Action::CreateGroup(group) => {
            doc.groups.insert(group.id.clone(), group);
        }
        Action::UpdateGroup { id, fields } => {
            if let Some(group) = doc.groups.get_mut(&id) {
                if let Some(name) = fields.name {
                    group.name = name;
                }
                if let Some(shape_ids) = fields.shape_ids {
                    group.shape_ids = shape_ids;
                }
                if let Some(locked) = fields.locked {
                    group.locked = locked;
                }
            }
        }
        Action::DeleteGroup(id) => {
            doc.groups.remove(&id);
        }
        Action::RecordFrame { id, name, timestamp } => {
            let name = name.unwrap_or_else(|| format!("Frame {}", doc.frames.len() + 1));
            let frame = capture_frame(&doc, id, name, timestamp);
            doc.frames.push(frame);
            doc.current_frame_index = doc.frames.len() - 1;
        }
        Action::ApplyFrame(index) => apply_frame(&mut doc, index),
        Action::DeleteFrame(index) => delete_frame(&mut doc, index),
        Action::SetCurrentFrame(index) => {
            if index < doc.frames.len() {
                doc.current_frame_index = index;
            }
        }
        Action::UpdateFrame { index, fields } => {
            if let Some(frame) = doc.frames.get_mut(index) {
                if let Some(name) = fields.name {
                    frame.name = name;
                }
                if let Some(ts) = fields.timestamp {
                    frame.timestamp = ts;
                }
            }
        }
        Action::UpdateCurrentFrameData => {
            let index = doc.current_frame_index;
            if let Some(frame) = doc.frames.get(index) {
                let refreshed = capture_frame(&doc, frame.id.clone(), frame.name.clone(), frame.timestamp);
                doc.frames[index] = refreshed;
            }
        }
        Action::InterpolateFrames { from, to, t } => interpolate_frames(&mut doc, from, to, t),
        Action::BatchUpdate { vertices, shapes } => {
            for (id, fields) in &vertices {
                doc.apply_vertex_partial(id, fields);
            }
            for (id, fields) in &shapes {
                doc.apply_shape_partial(id, fields);
            }
        }
        Action::Undo | Action::Redo => {}
        Action::ClearAll => return Document::default(),
    }
    doc
}

// =============================================================
// Topology
// =============================================================

fn add_shape(doc: &mut Document, shape: Shape) {
    let dangling = shape
        .geometry
        .vertex_refs()
        .into_iter()
        .any(|id| !doc.vertices.contains_key(id));
    if dangling {
        tracing::debug!(shape = %shape.id, "rejected shape with dangling vertex reference");
        return;
    }
    doc.shapes_mut().insert(shape.id.clone(), shape);
}

fn delete_vertex(doc: &mut Document, id: &VertexId) {
    if !doc.vertices.contains_key(id) {
        return;
    }
    let doomed: Vec<ShapeId> = doc.shapes_referencing(id).into_iter().cloned().collect();
    doc.vertices_mut().remove(id);
    doc.selection.vertex_ids.remove(id);
    if doc.hover.vertex_id.as_ref() == Some(id) {
        doc.hover.vertex_id = None;
    }
    for shape_id in doomed {
        delete_shape(doc, &shape_id);
    }
}

/// Remove a shape. Control vertices of a deleted Bézier that no surviving
/// shape references are removed with it.
fn delete_shape(doc: &mut Document, id: &ShapeId) {
    if !doc.shapes.contains_key(id) {
        return;
    }
    let Some(shape) = doc.shapes_mut().remove(id) else {
        return;
    };
    doc.selection.shape_ids.remove(id);
    if doc.hover.shape_id.as_ref() == Some(id) {
        doc.hover.shape_id = None;
    }
    for group in doc.groups.values_mut() {
        group.shape_ids.retain(|s| s != id);
    }

    if let Geometry::Bezier { .. } = shape.geometry {
        let orphans: Vec<VertexId> = shape
            .geometry
            .vertex_refs()
            .into_iter()
            .filter(|v| doc.vertex(v).is_some_and(|v| v.kind == VertexKind::Control))
            .filter(|v| doc.shapes_referencing(v).is_empty())
            .cloned()
            .collect();
        for v in orphans {
            doc.vertices_mut().remove(&v);
            doc.selection.vertex_ids.remove(&v);
        }
    }
}

fn merge_vertices(doc: &mut Document, ids: &[VertexId], target: Point, new_id: VertexId) {
    let merged: HashSet<&VertexId> = ids.iter().filter(|id| doc.vertices.contains_key(*id)).collect();
    if merged.len() < 2 {
        return;
    }
    let merged: HashSet<VertexId> = merged.into_iter().cloned().collect();

    let vertices = doc.vertices_mut();
    for id in &merged {
        vertices.remove(id);
    }
    vertices.insert(new_id.clone(), Vertex::anchor(new_id.clone(), target));

    for shape in doc.shapes_mut().values_mut() {
        shape
            .geometry
            .remap_refs(|id| merged.contains(id).then(|| new_id.clone()));
    }

    doc.selection = Selection { vertex_ids: HashSet::from([new_id]), shape_ids: HashSet::new() };
    doc.prune_transient();
}

fn import_data(doc: &mut Document, data: DocumentData) {
    let mut next = Document::default();
    {
        let vertices = next.vertices_mut();
        for v in data.vertices {
            vertices.insert(v.id.clone(), v);
        }
    }
    for shape in data.shapes {
        add_shape(&mut next, shape);
    }
    next.groups = data.groups.into_iter().map(|g| (g.id.clone(), g)).collect();
    next.frames = data.frames.unwrap_or_default();
    *doc = next;
}

fn merge_data(doc: &mut Document, data: DocumentData) {
    {
        let vertices = doc.vertices_mut();
        for v in data.vertices {
            vertices.insert(v.id.clone(), v);
        }
    }
    let base_z = doc.next_z_index();
    for mut shape in data.shapes {
        shape.z_index += base_z;
        add_shape(doc, shape);
    }
    for g in data.groups {
        doc.groups.insert(g.id.clone(), g);
    }
    if let Some(frames) = data.frames {
        doc.frames.extend(frames);
    }
    doc.prune_transient();
}

// =============================================================
// Frames
// =============================================================

fn capture_frame(doc: &Document, id: FrameId, name: String, timestamp: u64) -> Frame {
    let vertex_positions = doc
        .vertices
        .values()
        .map(|v| (v.id.clone(), v.position()))
        .collect();
    let shape_properties = doc
        .shapes
        .values()
        .filter_map(|s| s.geometry.radius().map(|r| (s.id.clone(), FrameShapeProps { radius: Some(r) })))
        .collect();
    Frame { id, name, timestamp, vertex_positions, shape_properties }
}

fn apply_frame(doc: &mut Document, index: usize) {
    let Some(frame) = doc.frames.get(index).cloned() else {
        return;
    };
    for (id, p) in &frame.vertex_positions {
        doc.apply_vertex_partial(id, &PartialVertex::at(*p));
    }
    for (id, props) in &frame.shape_properties {
        if let Some(r) = props.radius {
            set_circle_radius(doc, id, r);
        }
    }
    doc.current_frame_index = index;
}

fn delete_frame(doc: &mut Document, index: usize) {
    if index >= doc.frames.len() {
        return;
    }
    doc.frames.remove(index);
    if index < doc.current_frame_index {
        doc.current_frame_index -= 1;
    }
    doc.current_frame_index = doc.current_frame_index.min(doc.frames.len().saturating_sub(1));
}

fn interpolate_frames(doc: &mut Document, from: usize, to: usize, t: f64) {
    let (Some(a), Some(b)) = (doc.frames.get(from), doc.frames.get(to)) else {
        return;
    };
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

    let positions: Vec<(VertexId, Point)> = a
        .vertex_positions
        .iter()
        .filter_map(|(id, pa)| b.vertex_positions.get(id).map(|pb| (id.clone(), lerp_point(*pa, *pb, t))))
        .collect();
    let radii: HashMap<ShapeId, f64> = a
        .shape_properties
        .iter()
        .filter_map(|(id, pa)| {
            let ra = pa.radius?;
            let rb = b.shape_properties.get(id)?.radius?;
            Some((id.clone(), lerp(ra, rb, t)))
        })
        .collect();

    for (id, p) in &positions {
        doc.apply_vertex_partial(id, &PartialVertex::at(*p));
    }
    for (id, r) in radii {
        set_circle_radius(doc, &id, r);
    }
}

fn set_circle_radius(doc: &mut Document, id: &ShapeId, radius: f64) {
    if matches!(doc.shape(id).map(|s| &s.geometry), Some(Geometry::Circle { .. })) {
        doc.apply_shape_partial(id, &PartialShape { radius: Some(radius), ..Default::default() });
    }
}
