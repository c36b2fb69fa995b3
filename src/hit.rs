//! Hit testing in canvas space.
//!
//! All radii passed here are canvas-space distances; callers convert the
//! screen-space slop with [`crate::viewport::Viewport::screen_dist_to_canvas`].

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::doc::{Document, Geometry, Shape, ShapeId, Vertex, VertexId, VertexKind};
use crate::geometry::{Bounds, Point, cubic_bezier, distance, distance_to_segment};

/// Samples per Bézier segment when testing outline proximity.
const BEZIER_HIT_SAMPLES: u32 = 16;

/// What lies under the pointer, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    /// Radius handle of a selected circle.
    RadiusHandle(ShapeId),
    Vertex(VertexId),
    /// Outline of a visible shape.
    Shape(ShapeId),
}

/// Test what is under `pt`: selected circle handles first, then vertices,
/// then shape outlines from the top of the draw order down.
#[must_use]
pub fn hit_test(doc: &Document, pt: Point, radius: f64) -> Option<Hit> {
    if let Some(id) = hit_radius_handle(doc, pt, radius) {
        return Some(Hit::RadiusHandle(id));
    }
    if let Some(id) = hit_vertex(doc, pt, radius) {
        return Some(Hit::Vertex(id.clone()));
    }
    hit_shape(doc, pt, radius).map(|id| Hit::Shape(id.clone()))
}

/// Nearest vertex within `radius` of `pt`.
#[must_use]
pub fn hit_vertex<'a>(doc: &'a Document, pt: Point, radius: f64) -> Option<&'a VertexId> {
    nearest(doc.vertices.values(), pt, radius).map(|v| &v.id)
}

/// Nearest Anchor within `radius` that is not selected; placements reuse it.
#[must_use]
pub fn snap_candidate<'a>(doc: &'a Document, pt: Point, radius: f64) -> Option<&'a Vertex> {
    let candidates = doc
        .vertices
        .values()
        .filter(|v| v.kind == VertexKind::Anchor && !doc.selection.vertex_ids.contains(&v.id));
    nearest(candidates, pt, radius)
}

fn nearest<'a, I>(vertices: I, pt: Point, radius: f64) -> Option<&'a Vertex>
where
    I: IntoIterator<Item = &'a Vertex>,
{
    vertices
        .into_iter()
        .map(|v| (distance(v.position(), pt), v))
        .filter(|(d, _)| *d <= radius)
        .min_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)))
        .map(|(_, v)| v)
}

/// Canvas position of a circle's radius handle: due east of the center.
#[must_use]
pub fn radius_handle(doc: &Document, shape: &Shape) -> Option<Point> {
    match &shape.geometry {
        Geometry::Circle { center, radius } => doc.position(center).map(|c| Point::new(c.x + radius, c.y)),
        _ => None,
    }
}

fn hit_radius_handle(doc: &Document, pt: Point, radius: f64) -> Option<ShapeId> {
    doc.selected_shapes()
        .into_iter()
        .filter(|s| !s.locked)
        .find(|s| radius_handle(doc, s).is_some_and(|h| distance(h, pt) <= radius))
        .map(|s| s.id.clone())
}

/// Topmost visible shape whose outline passes within `radius` of `pt`.
#[must_use]
pub fn hit_shape<'a>(doc: &'a Document, pt: Point, radius: f64) -> Option<&'a ShapeId> {
    doc.sorted_shapes()
        .into_iter()
        .rev()
        .filter(|s| s.visible)
        .find(|s| outline_distance(doc, s, pt).is_some_and(|d| d <= radius))
        .map(|s| &s.id)
}

/// Distance from `pt` to the shape's outline, or `None` if a reference is dangling.
#[must_use]
pub fn outline_distance(doc: &Document, shape: &Shape, pt: Point) -> Option<f64> {
    if let Geometry::Circle { center, radius } = &shape.geometry {
        let c = doc.position(center)?;
        return Some((distance(c, pt) - radius).abs());
    }
    outline_edges(doc, shape)?
        .into_iter()
        .map(|(a, b)| distance_to_segment(pt, a, b))
        .min_by(f64::total_cmp)
}

/// Straight edges approximating the outline. Circles yield no edges.
#[must_use]
pub fn outline_edges(doc: &Document, shape: &Shape) -> Option<Vec<(Point, Point)>> {
    let (points, closed) = match &shape.geometry {
        Geometry::Line { vertices } => (resolve(doc, vertices)?, false),
        Geometry::Rect { vertices } => (resolve(doc, vertices)?, true),
        Geometry::Polygon { vertices, closed } => (resolve(doc, vertices)?, *closed),
        Geometry::Circle { .. } => return Some(Vec::new()),
        Geometry::Bezier { segments, closed } => {
            let mut points = Vec::new();
            for seg in segments {
                let [p0, p1, p2, p3] = seg.points().map(|id| doc.position(id));
                let (p0, p1, p2, p3) = (p0?, p1?, p2?, p3?);
                let start = u32::from(!points.is_empty());
                for i in start..=BEZIER_HIT_SAMPLES {
                    points.push(cubic_bezier(p0, p1, p2, p3, f64::from(i) / f64::from(BEZIER_HIT_SAMPLES)));
                }
            }
            (points, *closed)
        }
    };
    let mut edges: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
    if closed && points.len() > 2 {
        if let (Some(&last), Some(&first)) = (points.last(), points.first()) {
            edges.push((last, first));
        }
    }
    Some(edges)
}

fn resolve(doc: &Document, ids: &[VertexId]) -> Option<Vec<Point>> {
    ids.iter().map(|id| doc.position(id)).collect()
}

/// Every vertex whose position lies within `bounds` (inclusive).
#[must_use]
pub fn vertices_in_box(doc: &Document, bounds: &Bounds) -> Vec<VertexId> {
    doc.sorted_vertices()
        .into_iter()
        .filter(|v| bounds.contains(v.position()))
        .map(|v| v.id.clone())
        .collect()
}
