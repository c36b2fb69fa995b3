//! Rendering: projects the editor scene onto an abstract 2D surface.
//!
//! This module receives a read-only [`Scene`] and issues draw calls in screen
//! space through the [`Surface`] trait. It does not mutate application state
//! and does not own the surface; the host implements `Surface` over whatever
//! canvas it has.
//!
//! Layers are drawn in a fixed order: grid, shapes, tool preview, vertices,
//! selection box, pending construction, export bounds, then the text overlay.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::config::EditorConfig;
use crate::consts::{
    ANCHOR_COLOR, CONTROL_COLOR, EXPORT_BOUNDS_COLOR, GRID_COLOR, HIGHLIGHT_COLOR, HIGHLIGHT_WIDTH_FACTOR,
    HOVER_COLOR, PREVIEW_COLOR, SNAP_RING_PX, VERTEX_MARKER_PX,
};
use crate::doc::{Document, Geometry, Shape, Vertex, VertexId, VertexKind};
use crate::geometry::{Bounds, Point};
use crate::hit;
use crate::input::PendingPoint;
use crate::serialize;
use crate::viewport::Viewport;

/// Grid lines closer together than this many screen pixels are not drawn.
const MIN_GRID_SPACING_PX: f64 = 4.0;

/// Upper bound on grid lines per axis in one pass.
const MAX_GRID_LINES: u32 = 2048;

/// Fill alpha of the rubber-band selection box.
const SELECTION_BOX_OPACITY: f64 = 0.15;

/// Stroke and fill settings for one draw call. Widths are in screen pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub stroke: Option<String>,
    pub stroke_width: f64,
    pub fill: Option<String>,
    pub opacity: f64,
    pub dashed: bool,
}

impl Paint {
    #[must_use]
    pub fn stroke(color: &str, width: f64) -> Self {
        Self { stroke: Some(color.to_string()), stroke_width: width, fill: None, opacity: 1.0, dashed: false }
    }

    #[must_use]
    pub fn fill(color: &str) -> Self {
        Self { stroke: None, stroke_width: 0.0, fill: Some(color.to_string()), opacity: 1.0, dashed: false }
    }

    #[must_use]
    pub fn dashed(mut self) -> Self {
        self.dashed = true;
        self
    }
}

/// Drawing primitives the host provides. All coordinates are screen pixels.
pub trait Surface {
    /// Surface size in pixels.
    fn size(&self) -> (f64, f64);
    fn line(&mut self, a: Point, b: Point, paint: &Paint);
    fn polyline(&mut self, points: &[Point], closed: bool, paint: &Paint);
    fn cubic(&mut self, p0: Point, p1: Point, p2: Point, p3: Point, paint: &Paint);
    fn circle(&mut self, center: Point, radius: f64, paint: &Paint);
    fn rect(&mut self, min: Point, max: Point, paint: &Paint);
    fn text(&mut self, at: Point, text: &str, color: &str);
}

/// In-progress tool feedback while dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Preview {
    Rect { a: Point, b: Point },
    Circle { center: Point, radius: f64 },
}

/// Read-only view of everything that is drawn.
#[derive(Debug, Clone)]
pub struct Scene<'a> {
    pub doc: &'a Document,
    pub viewport: &'a Viewport,
    pub config: &'a EditorConfig,
    pub preview: Option<Preview>,
    pub selection_box: Option<Bounds>,
    pub pending: &'a [PendingPoint],
    /// Last pointer position in canvas space; pending construction rubber-bands to it.
    pub cursor: Option<Point>,
    /// Anchor a placement at the cursor would reuse.
    pub snap_target: Option<&'a VertexId>,
}

/// Draw the full scene.
pub fn draw<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    if scene.config.show_grid {
        draw_grid(surface, scene);
    }

    for shape in scene.doc.sorted_shapes() {
        if shape.visible {
            draw_shape(surface, scene, shape);
        }
    }

    if let Some(preview) = scene.preview {
        draw_preview(surface, scene.viewport, preview);
    }

    if scene.config.show_vertices {
        draw_vertices(surface, scene);
    }
    draw_radius_handles(surface, scene);

    if let Some(b) = scene.selection_box {
        let vp = scene.viewport;
        let mut paint = Paint::stroke(HIGHLIGHT_COLOR, 1.0).dashed();
        paint.fill = Some(HIGHLIGHT_COLOR.to_string());
        paint.opacity = SELECTION_BOX_OPACITY;
        surface.rect(
            vp.canvas_to_screen(Point::new(b.min_x, b.min_y)),
            vp.canvas_to_screen(Point::new(b.max_x, b.max_y)),
            &paint,
        );
    }

    draw_pending(surface, scene);

    if scene.config.show_export_bounds {
        if let Some(b) = serialize::export_bounds(scene.doc) {
            let vp = scene.viewport;
            surface.rect(
                vp.canvas_to_screen(Point::new(b.min_x, b.min_y)),
                vp.canvas_to_screen(Point::new(b.max_x, b.max_y)),
                &Paint::stroke(EXPORT_BOUNDS_COLOR, 1.0).dashed(),
            );
        }
    }

    draw_overlay(surface, scene);
}

// =============================================================
// Grid
// =============================================================

fn draw_grid<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    let vp = scene.viewport;
    let grid = scene.config.grid_size;
    if grid <= 0.0 || grid * vp.zoom < MIN_GRID_SPACING_PX {
        return;
    }
    let (w, h) = surface.size();
    let (min, max) = vp.visible_canvas(w, h);
    let paint = Paint::stroke(GRID_COLOR, 1.0);

    for x in grid_lines(min.x, max.x, grid) {
        let sx = vp.canvas_to_screen(Point::new(x, 0.0)).x;
        surface.line(Point::new(sx, 0.0), Point::new(sx, h), &paint);
    }
    for y in grid_lines(min.y, max.y, grid) {
        let sy = vp.canvas_to_screen(Point::new(0.0, y)).y;
        surface.line(Point::new(0.0, sy), Point::new(w, sy), &paint);
    }
}

/// Grid coordinates in `[lo, hi]`, stepped by line index so huge coordinates
/// where `x + grid == x` still terminate.
fn grid_lines(lo: f64, hi: f64, grid: f64) -> impl Iterator<Item = f64> {
    let first = (lo / grid).floor();
    (0..MAX_GRID_LINES).map(move |i| (first + f64::from(i)) * grid).take_while(move |x| *x <= hi)
}

// =============================================================
// Shapes
// =============================================================

fn shape_paint(scene: &Scene<'_>, shape: &Shape) -> Paint {
    let doc = scene.doc;
    let selected = doc.selection.shape_ids.contains(&shape.id);
    let hovered = doc.hover.shape_id.as_ref() == Some(&shape.id);
    let width = shape.style.stroke_width * scene.viewport.zoom;
    let (stroke, width) = if selected {
        (HIGHLIGHT_COLOR.to_string(), width * HIGHLIGHT_WIDTH_FACTOR)
    } else if hovered {
        (HOVER_COLOR.to_string(), width * HIGHLIGHT_WIDTH_FACTOR)
    } else {
        (shape.style.stroke_color.clone(), width)
    };
    Paint {
        stroke: Some(stroke),
        stroke_width: width,
        fill: shape.style.fill_color.clone(),
        opacity: shape.style.opacity,
        dashed: false,
    }
}

fn draw_shape<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>, shape: &Shape) {
    let vp = scene.viewport;
    let doc = scene.doc;
    let project = |id: &VertexId| doc.position(id).map(|p| vp.canvas_to_screen(p));
    let paint = shape_paint(scene, shape);

    match &shape.geometry {
        Geometry::Line { vertices } => {
            if let (Some(a), Some(b)) = (project(&vertices[0]), project(&vertices[1])) {
                let mut paint = paint;
                paint.fill = None;
                surface.line(a, b, &paint);
            }
        }
        Geometry::Rect { vertices } => {
            if let Some(points) = vertices.iter().map(project).collect::<Option<Vec<_>>>() {
                surface.polyline(&points, true, &paint);
            }
        }
        Geometry::Polygon { vertices, closed } => {
            if let Some(points) = vertices.iter().map(project).collect::<Option<Vec<_>>>() {
                surface.polyline(&points, *closed, &paint);
            }
        }
        Geometry::Circle { center, radius } => {
            if let Some(c) = project(center) {
                surface.circle(c, radius * vp.zoom, &paint);
            }
        }
        Geometry::Bezier { segments, closed } => {
            let mut paint = paint;
            paint.fill = None;
            for seg in segments {
                let [p0, p1, p2, p3] = seg.points().map(project);
                if let (Some(p0), Some(p1), Some(p2), Some(p3)) = (p0, p1, p2, p3) {
                    surface.cubic(p0, p1, p2, p3, &paint);
                }
            }
            if *closed {
                let first = segments.first().and_then(|s| project(&s.p0));
                let last = segments.last().and_then(|s| project(&s.p3));
                if let (Some(last), Some(first)) = (last, first) {
                    if last != first {
                        surface.line(last, first, &paint);
                    }
                }
            }
        }
    }
}

fn draw_preview<S: Surface + ?Sized>(surface: &mut S, vp: &Viewport, preview: Preview) {
    let paint = Paint::stroke(PREVIEW_COLOR, 1.0).dashed();
    match preview {
        Preview::Rect { a, b } => {
            let bounds = Bounds::from_corners(a, b);
            surface.rect(
                vp.canvas_to_screen(Point::new(bounds.min_x, bounds.min_y)),
                vp.canvas_to_screen(Point::new(bounds.max_x, bounds.max_y)),
                &paint,
            );
        }
        Preview::Circle { center, radius } => {
            surface.circle(vp.canvas_to_screen(center), radius * vp.zoom, &paint);
        }
    }
}

// =============================================================
// Vertices
// =============================================================

fn draw_vertices<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    let doc = scene.doc;
    let vp = scene.viewport;
    for v in doc.sorted_vertices() {
        let at = vp.canvas_to_screen(v.position());
        let selected = doc.selection.vertex_ids.contains(&v.id);
        let hovered = doc.hover.vertex_id.as_ref() == Some(&v.id);
        draw_vertex_marker(surface, v, at, selected, hovered);
        if scene.snap_target == Some(&v.id) {
            surface.circle(at, SNAP_RING_PX, &Paint::stroke(HIGHLIGHT_COLOR, 1.5));
        }
    }
}

fn draw_vertex_marker<S: Surface + ?Sized>(surface: &mut S, v: &Vertex, at: Point, selected: bool, hovered: bool) {
    let base = match v.kind {
        VertexKind::Anchor => ANCHOR_COLOR,
        VertexKind::Control => CONTROL_COLOR,
    };
    let color = if selected {
        HIGHLIGHT_COLOR
    } else if hovered {
        HOVER_COLOR
    } else {
        base
    };
    let paint = Paint::fill(color);
    match v.kind {
        VertexKind::Anchor => surface.circle(at, VERTEX_MARKER_PX, &paint),
        VertexKind::Control => {
            let r = VERTEX_MARKER_PX;
            let diamond = [
                Point::new(at.x, at.y - r),
                Point::new(at.x + r, at.y),
                Point::new(at.x, at.y + r),
                Point::new(at.x - r, at.y),
            ];
            surface.polyline(&diamond, true, &paint);
        }
    }
}

fn draw_radius_handles<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    let vp = scene.viewport;
    for shape in scene.doc.selected_shapes() {
        if let Some(h) = hit::radius_handle(scene.doc, shape) {
            let at = vp.canvas_to_screen(h);
            let r = VERTEX_MARKER_PX;
            surface.rect(
                Point::new(at.x - r, at.y - r),
                Point::new(at.x + r, at.y + r),
                &Paint::fill(HIGHLIGHT_COLOR),
            );
        }
    }
}

// =============================================================
// Pending construction / overlay
// =============================================================

fn draw_pending<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    if scene.pending.is_empty() {
        return;
    }
    let vp = scene.viewport;
    let mut points: Vec<Point> = scene.pending.iter().map(|p| vp.canvas_to_screen(p.at)).collect();
    let markers = points.clone();
    if let Some(cursor) = scene.cursor {
        points.push(vp.canvas_to_screen(cursor));
    }
    if points.len() > 1 {
        surface.polyline(&points, false, &Paint::stroke(PREVIEW_COLOR, 1.0).dashed());
    }
    let paint = Paint::fill(PREVIEW_COLOR);
    for at in markers {
        surface.circle(at, VERTEX_MARKER_PX, &paint);
    }
}

fn draw_overlay<S: Surface + ?Sized>(surface: &mut S, scene: &Scene<'_>) {
    let (_, h) = surface.size();
    let doc = scene.doc;
    if !doc.frames.is_empty() {
        let label = format!("Frame {}/{}", doc.current_frame_index + 1, doc.frames.len());
        surface.text(Point::new(12.0, 20.0), &label, ANCHOR_COLOR);
    }
    let zoom = format!("{:.0}%", scene.viewport.zoom * 100.0);
    surface.text(Point::new(12.0, h - 12.0), &zoom, ANCHOR_COLOR);
}
