use super::*;
use crate::consts::HISTORY_CAPACITY;
use crate::doc::{Geometry, PartialVertex, Shape, ShapeId, Vertex, VertexId};
use crate::geometry::Point;

fn vid(s: &str) -> VertexId {
    VertexId::from(s)
}

fn add(id: &str, x: f64) -> Action {
    Action::AddVertex(Vertex::anchor(vid(id), Point::new(x, 0.0)))
}

#[test]
fn structural_dispatch_records_history() {
    let mut store = Store::default();
    store.dispatch(add("a", 0.0));
    assert_eq!(store.history().past_len(), 1);
}

#[test]
fn continuous_dispatch_does_not_record() {
    let mut store = Store::default();
    store.dispatch(add("a", 0.0));
    for i in 0..10 {
        store.dispatch(Action::UpdateVertex { id: vid("a"), fields: PartialVertex::at(Point::new(f64::from(i), 0.0)) });
    }
    assert_eq!(store.history().past_len(), 1);
}

#[test]
fn rejected_structural_action_leaves_no_undo_step() {
    let mut store = Store::default();
    store.dispatch(Action::DeleteVertex(vid("ghost")));
    store.dispatch(Action::AddShape(Shape::new(
        ShapeId::from("l"),
        Geometry::Line { vertices: [vid("x"), vid("y")] },
    )));
    assert_eq!(store.history().past_len(), 0);
}

#[test]
fn sixty_edits_keep_fifty_and_undo_stops_after_tenth() {
    let mut store = Store::new(HISTORY_CAPACITY);
    for i in 0..60 {
        store.dispatch(add(&format!("v{i}"), f64::from(i)));
    }
    assert_eq!(store.history().past_len(), 50);
    for _ in 0..50 {
        store.dispatch(Action::Undo);
    }
    assert_eq!(store.doc().vertices.len(), 10);
    assert!(!store.undo());
    assert_eq!(store.doc().vertices.len(), 10);
}

#[test]
fn undo_with_empty_history_is_noop() {
    let mut store = Store::default();
    store.dispatch(Action::Undo);
    assert!(store.doc().is_empty());
}

#[test]
fn structural_edit_after_undo_clears_redo() {
    let mut store = Store::default();
    store.dispatch(add("a", 0.0));
    store.dispatch(add("b", 1.0));
    store.dispatch(Action::Undo);
    assert!(store.history().can_redo());
    store.dispatch(add("c", 2.0));
    assert!(!store.history().can_redo());
    store.dispatch(Action::Redo);
    assert!(store.doc().vertex(&vid("c")).is_some());
    assert!(store.doc().vertex(&vid("b")).is_none());
}

#[test]
fn batch_is_one_undo_step() {
    let mut store = Store::default();
    store.dispatch_batch(vec![
        add("a", 0.0),
        add("b", 10.0),
        Action::AddShape(Shape::new(ShapeId::from("l"), Geometry::Line { vertices: [vid("a"), vid("b")] })),
    ]);
    assert_eq!(store.history().past_len(), 1);
    store.undo();
    assert!(store.doc().is_empty());
}

#[test]
fn checkpoint_brackets_a_drag() {
    let mut store = Store::default();
    store.dispatch(add("a", 0.0));
    store.checkpoint();
    for i in 1..=10 {
        store.dispatch(Action::UpdateVertex { id: vid("a"), fields: PartialVertex::at(Point::new(f64::from(i), 0.0)) });
    }
    assert_eq!(store.history().past_len(), 2);
    store.undo();
    assert_eq!(store.doc().position(&vid("a")), Some(Point::new(0.0, 0.0)));
}

#[test]
fn clear_all_drops_history() {
    let mut store = Store::default();
    store.dispatch(add("a", 0.0));
    store.dispatch(Action::ClearAll);
    assert!(store.doc().is_empty());
    assert!(!store.history().can_undo());
}
