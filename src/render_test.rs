#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{Hover, Segment, ShapeId};
use crate::reduce::{Action, reduce};

// =============================================================
// Recording surface
// =============================================================

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Line(Point, Point, Paint),
    Polyline(Vec<Point>, bool, Paint),
    Cubic([Point; 4], Paint),
    Circle(Point, f64, Paint),
    Rect(Point, Point, Paint),
    Text(Point, String),
}

struct Recorder {
    calls: Vec<Call>,
}

impl Recorder {
    fn new() -> Self {
        Self { calls: Vec::new() }
    }

    fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Text(_, t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }
}

impl Surface for Recorder {
    fn size(&self) -> (f64, f64) {
        (200.0, 100.0)
    }
    fn line(&mut self, a: Point, b: Point, paint: &Paint) {
        self.calls.push(Call::Line(a, b, paint.clone()));
    }
    fn polyline(&mut self, points: &[Point], closed: bool, paint: &Paint) {
        self.calls.push(Call::Polyline(points.to_vec(), closed, paint.clone()));
    }
    fn cubic(&mut self, p0: Point, p1: Point, p2: Point, p3: Point, paint: &Paint) {
        self.calls.push(Call::Cubic([p0, p1, p2, p3], paint.clone()));
    }
    fn circle(&mut self, center: Point, radius: f64, paint: &Paint) {
        self.calls.push(Call::Circle(center, radius, paint.clone()));
    }
    fn rect(&mut self, min: Point, max: Point, paint: &Paint) {
        self.calls.push(Call::Rect(min, max, paint.clone()));
    }
    fn text(&mut self, at: Point, text: &str, _color: &str) {
        self.calls.push(Call::Text(at, text.to_string()));
    }
}

// =============================================================
// Fixtures
// =============================================================

fn vid(s: &str) -> VertexId {
    VertexId::from(s)
}

fn quiet_config() -> EditorConfig {
    EditorConfig { show_grid: false, show_vertices: false, ..EditorConfig::default() }
}

fn line_doc() -> Document {
    let doc = reduce(Document::new(), Action::AddVertex(Vertex::anchor(vid("a"), Point::new(0.0, 0.0))));
    let doc = reduce(doc, Action::AddVertex(Vertex::anchor(vid("b"), Point::new(100.0, 0.0))));
    reduce(
        doc,
        Action::AddShape(Shape::new(ShapeId::from("l"), Geometry::Line { vertices: [vid("a"), vid("b")] })),
    )
}

fn scene<'a>(doc: &'a Document, vp: &'a Viewport, config: &'a EditorConfig) -> Scene<'a> {
    Scene {
        doc,
        viewport: vp,
        config,
        preview: None,
        selection_box: None,
        pending: &[],
        cursor: None,
        snap_target: None,
    }
}

fn render(scene: &Scene<'_>) -> Recorder {
    let mut r = Recorder::new();
    draw(&mut r, scene);
    r
}

// =============================================================
// Shapes
// =============================================================

#[test]
fn line_is_projected_through_viewport() {
    let doc = line_doc();
    let vp = Viewport { zoom: 2.0, offset_x: 10.0, offset_y: 5.0 };
    let config = quiet_config();
    let r = render(&scene(&doc, &vp, &config));
    let Some(Call::Line(a, b, paint)) = r.calls.first() else {
        panic!("expected a line first, got {:?}", r.calls);
    };
    assert_eq!(*a, Point::new(10.0, 5.0));
    assert_eq!(*b, Point::new(210.0, 5.0));
    assert_eq!(paint.stroke_width, 4.0);
}

#[test]
fn selected_shape_is_highlighted_and_wider() {
    let doc = reduce(line_doc(), Action::SelectShapes { ids: vec![ShapeId::from("l")], additive: false });
    let vp = Viewport::default();
    let config = quiet_config();
    let r = render(&scene(&doc, &vp, &config));
    let Some(Call::Line(_, _, paint)) = r.calls.first() else {
        panic!("expected a line");
    };
    assert_eq!(paint.stroke.as_deref(), Some(HIGHLIGHT_COLOR));
    assert_eq!(paint.stroke_width, 3.0);
}

#[test]
fn hovered_shape_uses_hover_color() {
    let doc = reduce(line_doc(), Action::SetHover(Hover { vertex_id: None, shape_id: Some(ShapeId::from("l")) }));
    let vp = Viewport::default();
    let config = quiet_config();
    let r = render(&scene(&doc, &vp, &config));
    let Some(Call::Line(_, _, paint)) = r.calls.first() else {
        panic!("expected a line");
    };
    assert_eq!(paint.stroke.as_deref(), Some(HOVER_COLOR));
}

#[test]
fn hidden_shapes_are_skipped() {
    let doc = reduce(
        line_doc(),
        Action::UpdateShape {
            id: ShapeId::from("l"),
            fields: crate::doc::PartialShape { visible: Some(false), ..Default::default() },
        },
    );
    let vp = Viewport::default();
    let config = quiet_config();
    let r = render(&scene(&doc, &vp, &config));
    assert!(!r.calls.iter().any(|c| matches!(c, Call::Line(..))));
}

#[test]
fn bezier_draws_one_cubic_per_segment() {
    let mut doc = Document::new();
    for (id, x) in [("a", 0.0), ("c1", 10.0), ("c2", 20.0), ("b", 30.0), ("c3", 40.0), ("c4", 50.0), ("d", 60.0)] {
        doc = reduce(doc, Action::AddVertex(Vertex::anchor(vid(id), Point::new(x, 0.0))));
    }
    let segments = vec![
        Segment { p0: vid("a"), p1: vid("c1"), p2: vid("c2"), p3: vid("b") },
        Segment { p0: vid("b"), p1: vid("c3"), p2: vid("c4"), p3: vid("d") },
    ];
    doc = reduce(doc, Action::AddShape(Shape::new(ShapeId::from("z"), Geometry::Bezier { segments, closed: false })));
    let vp = Viewport::default();
    let config = quiet_config();
    let r = render(&scene(&doc, &vp, &config));
    assert_eq!(r.calls.iter().filter(|c| matches!(c, Call::Cubic(..))).count(), 2);
}

#[test]
fn circle_radius_scales_with_zoom() {
    let doc = reduce(Document::new(), Action::AddVertex(Vertex::anchor(vid("c"), Point::new(0.0, 0.0))));
    let doc = reduce(
        doc,
        Action::AddShape(Shape::new(ShapeId::from("o"), Geometry::Circle { center: vid("c"), radius: 10.0 })),
    );
    let vp = Viewport { zoom: 3.0, ..Viewport::default() };
    let config = quiet_config();
    let r = render(&scene(&doc, &vp, &config));
    assert!(r.calls.iter().any(|c| matches!(c, Call::Circle(_, radius, _) if *radius == 30.0)));
}

// =============================================================
// Layers
// =============================================================

#[test]
fn grid_is_drawn_before_shapes() {
    let doc = line_doc();
    let vp = Viewport::default();
    let config = EditorConfig { show_vertices: false, ..EditorConfig::default() };
    let r = render(&scene(&doc, &vp, &config));
    let grid = r.position(|c| matches!(c, Call::Line(_, _, p) if p.stroke.as_deref() == Some(GRID_COLOR)));
    let shape = r.position(|c| matches!(c, Call::Line(_, _, p) if p.stroke.as_deref() != Some(GRID_COLOR)));
    assert!(grid.is_some());
    assert!(grid < shape);
}

#[test]
fn grid_lines_cover_visible_area() {
    let doc = Document::new();
    let vp = Viewport::default();
    let config = EditorConfig { show_vertices: false, ..EditorConfig::default() };
    let r = render(&scene(&doc, &vp, &config));
    // 200x100 surface with 20px grid: x = 0..=200 (11 lines), y = 0..=100 (6 lines).
    let lines = r.calls.iter().filter(|c| matches!(c, Call::Line(..))).count();
    assert_eq!(lines, 17);
}

#[test]
fn grid_at_huge_offset_stays_bounded() {
    let doc = Document::new();
    let vp = Viewport { zoom: 1.0, offset_x: -1e20, offset_y: 0.0 };
    let config = EditorConfig { show_vertices: false, ..EditorConfig::default() };
    let r = render(&scene(&doc, &vp, &config));
    let lines = r.calls.iter().filter(|c| matches!(c, Call::Line(..))).count();
    // Adding one grid step no longer moves x at 1e20.
    assert!(lines > 0);
    assert!(lines <= MAX_GRID_LINES as usize + 6, "drew {lines} grid lines");
}

#[test]
fn vertices_drawn_after_shapes_with_kind_markers() {
    let doc = reduce(
        line_doc(),
        Action::AddVertex(Vertex::control(vid("k"), Point::new(50.0, 50.0), vid("a"))),
    );
    let vp = Viewport::default();
    let config = EditorConfig { show_grid: false, ..EditorConfig::default() };
    let r = render(&scene(&doc, &vp, &config));
    let shape = r.position(|c| matches!(c, Call::Line(..)));
    let first_marker = r.position(|c| matches!(c, Call::Circle(..)));
    assert!(shape < first_marker);
    let anchors = r.calls.iter().filter(|c| matches!(c, Call::Circle(_, rad, _) if *rad == VERTEX_MARKER_PX)).count();
    assert_eq!(anchors, 2);
    assert!(r.calls.iter().any(|c| matches!(c, Call::Polyline(points, true, _) if points.len() == 4)));
}

#[test]
fn snap_target_gets_ring() {
    let doc = line_doc();
    let vp = Viewport::default();
    let config = EditorConfig { show_grid: false, ..EditorConfig::default() };
    let target = vid("a");
    let mut s = scene(&doc, &vp, &config);
    s.snap_target = Some(&target);
    let r = render(&s);
    assert!(r.calls.iter().any(|c| matches!(c, Call::Circle(_, rad, _) if *rad == SNAP_RING_PX)));
}

#[test]
fn preview_box_and_pending_follow_fixed_order() {
    let doc = line_doc();
    let vp = Viewport::default();
    let config = EditorConfig { show_grid: false, show_export_bounds: true, ..EditorConfig::default() };
    let pending = [PendingPoint::new(Point::new(5.0, 5.0)), PendingPoint::new(Point::new(15.0, 5.0))];
    let mut s = scene(&doc, &vp, &config);
    s.preview = Some(Preview::Circle { center: Point::new(0.0, 0.0), radius: 7.0 });
    s.selection_box = Some(Bounds::from_corners(Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
    s.pending = &pending;
    s.cursor = Some(Point::new(25.0, 5.0));
    let r = render(&s);

    let preview = r.position(|c| matches!(c, Call::Circle(_, rad, p) if *rad == 7.0 && p.dashed));
    let vertex = r.position(|c| matches!(c, Call::Circle(_, _, p) if p.fill.as_deref() == Some(ANCHOR_COLOR)));
    let sel_box = r.position(|c| matches!(c, Call::Rect(_, _, p) if p.stroke.as_deref() == Some(HIGHLIGHT_COLOR)));
    let pending_line = r.position(|c| matches!(c, Call::Polyline(points, false, _) if points.len() == 3));
    let export = r.position(|c| matches!(c, Call::Rect(_, _, p) if p.stroke.as_deref() == Some(EXPORT_BOUNDS_COLOR)));
    let text = r.position(|c| matches!(c, Call::Text(..)));

    assert!(preview.is_some() && vertex.is_some() && sel_box.is_some());
    assert!(pending_line.is_some() && export.is_some() && text.is_some());
    assert!(preview < vertex);
    assert!(vertex < sel_box);
    assert!(sel_box < pending_line);
    assert!(pending_line < export);
    assert!(export < text);
}

#[test]
fn overlay_shows_frame_counter_and_zoom() {
    let doc = reduce(line_doc(), Action::RecordFrame { id: crate::doc::FrameId::from("f"), name: None, timestamp: 0 });
    let vp = Viewport { zoom: 1.5, ..Viewport::default() };
    let config = quiet_config();
    let r = render(&scene(&doc, &vp, &config));
    assert_eq!(r.texts(), vec!["Frame 1/1", "150%"]);
}

#[test]
fn overlay_omits_frame_counter_without_frames() {
    let doc = Document::new();
    let vp = Viewport::default();
    let config = quiet_config();
    let r = render(&scene(&doc, &vp, &config));
    assert_eq!(r.texts(), vec!["100%"]);
}
