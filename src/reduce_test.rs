#![allow(clippy::float_cmp)]

use super::*;
use crate::doc::{PartialStyle, Segment, ShapeKind, Style};

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn vid(s: &str) -> VertexId {
    VertexId::from(s)
}

fn sid(s: &str) -> ShapeId {
    ShapeId::from(s)
}

fn anchor(id: &str, x: f64, y: f64) -> Action {
    Action::AddVertex(Vertex::anchor(vid(id), pt(x, y)))
}

fn line(id: &str, a: &str, b: &str) -> Shape {
    Shape::new(sid(id), Geometry::Line { vertices: [vid(a), vid(b)] })
}

fn circle(id: &str, center: &str, radius: f64) -> Shape {
    Shape::new(sid(id), Geometry::Circle { center: vid(center), radius })
}

fn run(actions: Vec<Action>) -> Document {
    actions.into_iter().fold(Document::new(), reduce)
}

fn record(doc: Document, name: &str) -> Document {
    reduce(doc, Action::RecordFrame { id: FrameId::from(name), name: Some(name.into()), timestamp: 0 })
}

/// Two anchors `a`, `b`, two controls and a one-segment bezier `bz`.
fn bezier_doc() -> Document {
    run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 30.0, 0.0),
        Action::AddVertex(Vertex::control(vid("c1"), pt(10.0, 0.0), vid("a"))),
        Action::AddVertex(Vertex::control(vid("c2"), pt(20.0, 0.0), vid("b"))),
        Action::AddShape(Shape::new(
            sid("bz"),
            Geometry::Bezier {
                segments: vec![Segment { p0: vid("a"), p1: vid("c1"), p2: vid("c2"), p3: vid("b") }],
                closed: false,
            },
        )),
    ])
}

// =============================================================
// Vertices
// =============================================================

#[test]
fn add_vertex_inserts() {
    let doc = run(vec![anchor("a", 1.0, 2.0)]);
    assert_eq!(doc.position(&vid("a")), Some(pt(1.0, 2.0)));
}

#[test]
fn update_missing_vertex_is_noop() {
    let doc = run(vec![anchor("a", 1.0, 2.0)]);
    let next = reduce(
        doc.clone(),
        Action::UpdateVertex { id: vid("ghost"), fields: PartialVertex::at(pt(9.0, 9.0)) },
    );
    assert_eq!(next, doc);
}

#[test]
fn delete_vertex_cascades_to_every_referencing_shape() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 10.0, 0.0),
        anchor("c", 20.0, 0.0),
        Action::AddShape(line("ab", "a", "b")),
        Action::AddShape(line("bc", "b", "c")),
        Action::AddShape(line("ac", "a", "c")),
    ]);
    let doc = reduce(doc, Action::DeleteVertex(vid("b")));
    assert!(doc.vertex(&vid("b")).is_none());
    assert!(doc.shape(&sid("ab")).is_none());
    assert!(doc.shape(&sid("bc")).is_none());
    assert!(doc.shape(&sid("ac")).is_some());
    assert!(doc.is_consistent());
}

#[test]
fn delete_vertex_drops_it_from_selection() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 1.0, 0.0),
        Action::SelectVertices { ids: vec![vid("a"), vid("b")], additive: false },
        Action::DeleteVertex(vid("a")),
    ]);
    assert_eq!(doc.selection.vertex_ids, HashSet::from([vid("b")]));
}

// =============================================================
// Shapes
// =============================================================

#[test]
fn add_shape_with_dangling_reference_is_rejected() {
    let doc = run(vec![anchor("a", 0.0, 0.0), Action::AddShape(line("l", "a", "missing"))]);
    assert!(doc.shapes.is_empty());
}

#[test]
fn update_shape_applies_style() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 1.0, 0.0),
        Action::AddShape(line("l", "a", "b")),
        Action::UpdateShape {
            id: sid("l"),
            fields: PartialShape {
                style: Some(PartialStyle { stroke_width: Some(6.0), ..Default::default() }),
                ..Default::default()
            },
        },
    ]);
    assert_eq!(doc.shape(&sid("l")).map(|s| s.style.stroke_width), Some(6.0));
}

#[test]
fn delete_line_keeps_its_vertices() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 1.0, 0.0),
        Action::AddShape(line("l", "a", "b")),
        Action::DeleteShape(sid("l")),
    ]);
    assert_eq!(doc.vertices.len(), 2);
}

#[test]
fn delete_bezier_removes_orphaned_controls_only() {
    let doc = reduce(bezier_doc(), Action::DeleteShape(sid("bz")));
    assert!(doc.vertex(&vid("c1")).is_none());
    assert!(doc.vertex(&vid("c2")).is_none());
    assert!(doc.vertex(&vid("a")).is_some());
    assert!(doc.vertex(&vid("b")).is_some());
}

#[test]
fn delete_bezier_keeps_control_still_referenced_elsewhere() {
    let doc = reduce(bezier_doc(), Action::AddShape(line("keep", "a", "c1")));
    let doc = reduce(doc, Action::DeleteShape(sid("bz")));
    assert!(doc.vertex(&vid("c1")).is_some());
    assert!(doc.vertex(&vid("c2")).is_none());
}

#[test]
fn delete_shape_removes_it_from_groups() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 1.0, 0.0),
        Action::AddShape(line("l", "a", "b")),
        Action::CreateGroup(Group { id: GroupId::from("g"), name: "G".into(), shape_ids: vec![sid("l")], locked: false }),
        Action::DeleteShape(sid("l")),
    ]);
    assert!(doc.groups[&GroupId::from("g")].shape_ids.is_empty());
}

// =============================================================
// Selection
// =============================================================

#[test]
fn additive_selection_unions() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 1.0, 0.0),
        Action::SelectVertices { ids: vec![vid("a")], additive: false },
        Action::SelectVertices { ids: vec![vid("b")], additive: true },
    ]);
    assert_eq!(doc.selection.vertex_ids.len(), 2);
}

#[test]
fn non_additive_selection_replaces() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 1.0, 0.0),
        Action::SelectVertices { ids: vec![vid("a")], additive: false },
        Action::SelectVertices { ids: vec![vid("b")], additive: false },
    ]);
    assert_eq!(doc.selection.vertex_ids, HashSet::from([vid("b")]));
}

#[test]
fn selecting_unknown_ids_is_ignored() {
    let doc = run(vec![Action::SelectShapes { ids: vec![sid("nope")], additive: false }]);
    assert!(doc.selection.is_empty());
}

// =============================================================
// MergeVertices
// =============================================================

#[test]
fn merge_two_line_endpoints_makes_degenerate_line() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 10.0, 0.0),
        Action::AddShape(line("l", "a", "b")),
        Action::MergeVertices { ids: vec![vid("a"), vid("b")], target: pt(4.0, 4.0), new_id: vid("m") },
    ]);
    assert!(doc.vertex(&vid("a")).is_none());
    assert!(doc.vertex(&vid("b")).is_none());
    assert_eq!(doc.position(&vid("m")), Some(pt(4.0, 4.0)));
    assert_eq!(doc.vertex(&vid("m")).map(|v| v.kind), Some(VertexKind::Anchor));
    let Some(Geometry::Line { vertices }) = doc.shape(&sid("l")).map(|s| &s.geometry) else {
        panic!("line missing");
    };
    assert_eq!(vertices[0], vertices[1]);
    assert_eq!(vertices[0], vid("m"));
    assert_eq!(doc.selection.vertex_ids, HashSet::from([vid("m")]));
}

#[test]
fn merge_rewrites_bezier_segments() {
    let doc = reduce(
        bezier_doc(),
        Action::MergeVertices { ids: vec![vid("c1"), vid("c2")], target: pt(15.0, 5.0), new_id: vid("h") },
    );
    let Some(Geometry::Bezier { segments, .. }) = doc.shape(&sid("bz")).map(|s| &s.geometry) else {
        panic!("bezier missing");
    };
    assert_eq!(segments[0].p1, vid("h"));
    assert_eq!(segments[0].p2, vid("h"));
    assert!(doc.is_consistent());
}

#[test]
fn merge_with_fewer_than_two_is_noop() {
    let doc = run(vec![anchor("a", 0.0, 0.0)]);
    let next = reduce(
        doc.clone(),
        Action::MergeVertices { ids: vec![vid("a")], target: pt(1.0, 1.0), new_id: vid("m") },
    );
    assert_eq!(next, doc);
}

#[test]
fn merge_ignores_unknown_ids_when_counting() {
    let doc = run(vec![anchor("a", 0.0, 0.0)]);
    let next = reduce(
        doc.clone(),
        Action::MergeVertices { ids: vec![vid("a"), vid("ghost")], target: pt(1.0, 1.0), new_id: vid("m") },
    );
    assert_eq!(next, doc);
}

// =============================================================
// Import / merge data
// =============================================================

#[test]
fn import_data_replaces_everything_and_resets_transient_state() {
    let doc = run(vec![
        anchor("old", 0.0, 0.0),
        Action::SelectVertices { ids: vec![vid("old")], additive: false },
    ]);
    let doc = record(doc, "f");
    let data = DocumentData {
        vertices: vec![Vertex::anchor(vid("n"), pt(3.0, 3.0))],
        shapes: vec![circle("c", "n", 4.0)],
        groups: vec![],
        frames: None,
    };
    let doc = reduce(doc, Action::ImportData(data));
    assert!(doc.vertex(&vid("old")).is_none());
    assert!(doc.shape(&sid("c")).is_some());
    assert!(doc.selection.is_empty());
    assert!(doc.frames.is_empty());
    assert_eq!(doc.current_frame_index, 0);
}

#[test]
fn merge_data_unions_and_overwrites_collisions() {
    let doc = run(vec![
        anchor("a", 0.0, 0.0),
        anchor("b", 1.0, 1.0),
        Action::AddShape(line("l", "a", "b")),
    ]);
    let doc = record(doc, "existing");
    let data = DocumentData {
        vertices: vec![Vertex::anchor(vid("b"), pt(50.0, 50.0)), Vertex::anchor(vid("c"), pt(2.0, 2.0))],
        shapes: vec![circle("circ", "c", 3.0)],
        groups: vec![],
        frames: Some(vec![Frame {
            id: FrameId::from("imported"),
            name: "imported".into(),
            timestamp: 1,
            vertex_positions: HashMap::new(),
            shape_properties: HashMap::new(),
        }]),
    };
    let doc = reduce(doc, Action::MergeData(data));
    assert_eq!(doc.vertices.len(), 3);
    assert_eq!(doc.position(&vid("b")), Some(pt(50.0, 50.0)));
    assert_eq!(doc.shapes.len(), 2);
    assert_eq!(doc.frames.len(), 2);
    let line_z = doc.shape(&sid("l")).map(|s| s.z_index);
    let circ_z = doc.shape(&sid("circ")).map(|s| s.z_index);
    assert!(circ_z > line_z);
}

// =============================================================
// Frames
// =============================================================

#[test]
fn record_frame_captures_positions_and_radii() {
    let doc = run(vec![anchor("o", 0.0, 0.0), Action::AddShape(circle("c", "o", 10.0))]);
    let doc = reduce(doc, Action::RecordFrame { id: FrameId::from("f"), name: None, timestamp: 7 });
    assert_eq!(doc.frames.len(), 1);
    assert_eq!(doc.frames[0].name, "Frame 1");
    assert_eq!(doc.frames[0].vertex_positions[&vid("o")], pt(0.0, 0.0));
    assert_eq!(doc.frames[0].shape_properties[&sid("c")].radius, Some(10.0));
    assert_eq!(doc.current_frame_index, 0);
}

#[test]
fn record_frame_advances_current_index() {
    let doc = record(record(run(vec![anchor("a", 0.0, 0.0)]), "one"), "two");
    assert_eq!(doc.current_frame_index, 1);
}

#[test]
fn circle_interpolation_scenario() {
    let doc = run(vec![anchor("o", 0.0, 0.0), Action::AddShape(circle("c", "o", 10.0))]);
    let doc = record(doc, "start");
    let doc = reduce(doc, Action::UpdateVertex { id: vid("o"), fields: PartialVertex::at(pt(50.0, 50.0)) });
    let doc = reduce(
        doc,
        Action::UpdateShape { id: sid("c"), fields: PartialShape { radius: Some(20.0), ..Default::default() } },
    );
    let doc = record(doc, "end");
    let doc = reduce(doc, Action::InterpolateFrames { from: 0, to: 1, t: 0.5 });
    assert_eq!(doc.position(&vid("o")), Some(pt(25.0, 25.0)));
    assert!(approx_eq(doc.shape(&sid("c")).and_then(|s| s.geometry.radius()).unwrap_or(0.0), 15.0));
}

#[test]
fn interpolation_boundaries_reproduce_frames() {
    let doc = record(run(vec![anchor("a", 0.0, 0.0), anchor("b", 5.0, 5.0)]), "f0");
    let doc = reduce(doc, Action::UpdateVertex { id: vid("a"), fields: PartialVertex::at(pt(100.0, -40.0)) });
    let doc = record(doc, "f1");

    let at0 = reduce(doc.clone(), Action::InterpolateFrames { from: 0, to: 1, t: 0.0 });
    assert_eq!(at0.position(&vid("a")), Some(pt(0.0, 0.0)));
    let at1 = reduce(doc, Action::InterpolateFrames { from: 0, to: 1, t: 1.0 });
    assert_eq!(at1.position(&vid("a")), Some(pt(100.0, -40.0)));
}

#[test]
fn interpolation_clamps_t() {
    let doc = record(run(vec![anchor("a", 0.0, 0.0)]), "f0");
    let doc = reduce(doc, Action::UpdateVertex { id: vid("a"), fields: PartialVertex::at(pt(10.0, 0.0)) });
    let doc = record(doc, "f1");
    let doc = reduce(doc, Action::InterpolateFrames { from: 0, to: 1, t: 3.0 });
    assert_eq!(doc.position(&vid("a")), Some(pt(10.0, 0.0)));
}

#[test]
fn interpolation_leaves_vertices_missing_from_a_frame() {
    let doc = record(run(vec![anchor("a", 0.0, 0.0)]), "f0");
    let doc = reduce(doc, anchor("late", 7.0, 7.0));
    let doc = record(doc, "f1");
    let doc = reduce(doc, Action::UpdateVertex { id: vid("late"), fields: PartialVertex::at(pt(9.0, 9.0)) });
    let doc = reduce(doc, Action::InterpolateFrames { from: 0, to: 1, t: 0.5 });
    assert_eq!(doc.position(&vid("late")), Some(pt(9.0, 9.0)));
}

#[test]
fn apply_frame_twice_is_idempotent() {
    let doc = record(run(vec![anchor("a", 0.0, 0.0), anchor("o", 1.0, 1.0), Action::AddShape(circle("c", "o", 3.0))]), "f0");
    let doc = reduce(doc, Action::UpdateVertex { id: vid("a"), fields: PartialVertex::at(pt(40.0, 40.0)) });
    let once = reduce(doc, Action::ApplyFrame(0));
    let twice = reduce(once.clone(), Action::ApplyFrame(0));
    assert_eq!(once, twice);
    assert_eq!(once.position(&vid("a")), Some(pt(0.0, 0.0)));
}

#[test]
fn out_of_range_frame_indices_are_noops() {
    let doc = record(run(vec![anchor("a", 0.0, 0.0)]), "f0");
    for action in [
        Action::ApplyFrame(3),
        Action::DeleteFrame(3),
        Action::SetCurrentFrame(3),
        Action::InterpolateFrames { from: 0, to: 9, t: 0.5 },
        Action::UpdateFrame { index: 4, fields: PartialFrame { name: Some("x".into()), timestamp: None } },
    ] {
        assert_eq!(reduce(doc.clone(), action), doc);
    }
}

#[test]
fn delete_frame_keeps_current_index_in_range() {
    let doc = record(record(record(run(vec![anchor("a", 0.0, 0.0)]), "f0"), "f1"), "f2");
    let doc = reduce(doc, Action::DeleteFrame(2));
    assert_eq!(doc.current_frame_index, 1);
    let doc = reduce(doc, Action::DeleteFrame(0));
    assert_eq!(doc.current_frame_index, 0);
    assert_eq!(doc.frames[0].name, "f1");
}

#[test]
fn update_current_frame_data_overwrites_positions() {
    let doc = record(run(vec![anchor("a", 0.0, 0.0)]), "f0");
    let doc = reduce(doc, Action::UpdateVertex { id: vid("a"), fields: PartialVertex::at(pt(3.0, 4.0)) });
    let doc = reduce(doc, Action::UpdateCurrentFrameData);
    assert_eq!(doc.frames[0].vertex_positions[&vid("a")], pt(3.0, 4.0));
    assert_eq!(doc.frames[0].name, "f0");
}

#[test]
fn update_frame_renames() {
    let doc = record(run(vec![]), "f0");
    let doc = reduce(
        doc,
        Action::UpdateFrame { index: 0, fields: PartialFrame { name: Some("pose".into()), timestamp: Some(99) } },
    );
    assert_eq!(doc.frames[0].name, "pose");
    assert_eq!(doc.frames[0].timestamp, 99);
}

// =============================================================
// Batch / misc
// =============================================================

#[test]
fn batch_update_moves_several_vertices() {
    let doc = run(vec![anchor("a", 0.0, 0.0), anchor("b", 1.0, 1.0)]);
    let doc = reduce(
        doc,
        Action::BatchUpdate {
            vertices: vec![(vid("a"), PartialVertex::at(pt(5.0, 5.0))), (vid("b"), PartialVertex::at(pt(6.0, 6.0)))],
            shapes: vec![],
        },
    );
    assert_eq!(doc.position(&vid("a")), Some(pt(5.0, 5.0)));
    assert_eq!(doc.position(&vid("b")), Some(pt(6.0, 6.0)));
}

#[test]
fn clear_all_resets() {
    let doc = run(vec![anchor("a", 0.0, 0.0), Action::ClearAll]);
    assert_eq!(doc, Document::default());
}

#[test]
fn undo_redo_leave_document_untouched() {
    let doc = run(vec![anchor("a", 0.0, 0.0)]);
    assert_eq!(reduce(doc.clone(), Action::Undo), doc);
    assert_eq!(reduce(doc.clone(), Action::Redo), doc);
}

#[test]
fn structural_classification() {
    assert!(anchor("a", 0.0, 0.0).is_structural());
    assert!(Action::DeleteShape(sid("s")).is_structural());
    assert!(!Action::UpdateVertex { id: vid("a"), fields: PartialVertex::default() }.is_structural());
    assert!(!Action::BatchUpdate { vertices: vec![], shapes: vec![] }.is_structural());
    assert!(!Action::InterpolateFrames { from: 0, to: 1, t: 0.2 }.is_structural());
}

#[test]
fn default_style_and_kind_survive_add() {
    let doc = run(vec![anchor("o", 0.0, 0.0), Action::AddShape(circle("c", "o", 2.0))]);
    let shape = doc.shape(&sid("c")).unwrap();
    assert_eq!(shape.kind(), ShapeKind::Circle);
    assert_eq!(shape.style, Style::default());
}
