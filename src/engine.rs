//! Edit engine: the tool state machine driving the document.
//!
//! DESIGN
//! ======
//! `EditEngine` owns the [`Store`], the viewport, the session settings and
//! all transient interaction state (active tool, gesture in progress, pending
//! construction points, playback timer, an import awaiting a merge/replace
//! decision). Hosts feed it pointer, wheel and key events in screen space and
//! act on the returned [`Effect`]s; the engine never touches a real canvas.
//!
//! Construction tools keep their clicks as [`PendingPoint`]s and create
//! vertices only when the shape is committed, so one shape is one undo step
//! and cancelling with Escape leaves nothing behind. Drags snapshot lazily on
//! their first movement.
//!
//! While playback runs, editing is disabled; panning, zooming and stopping
//! playback still work.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use crate::animation::Playback;
use crate::config::{ConfigError, EditorConfig};
use crate::consts::{BEZIER_HANDLE_T1, BEZIER_HANDLE_T2, HIT_RADIUS_PX, MIN_CIRCLE_RADIUS};
use crate::doc::{
    Document, FrameId, Geometry, Group, GroupId, Hover, PartialFrame, PartialGroup, PartialShape, PartialStyle,
    PartialVertex, Segment, Shape, ShapeId, Vertex, VertexId,
};
use crate::geometry::{Bounds, Point, centroid, distance, lerp_point, snap_point_to_grid};
use crate::hit::{self, Hit};
use crate::history::History;
use crate::input::{Button, InputState, Key, Modifiers, PendingPoint, Tool, WheelDelta};
use crate::reduce::{Action, DocumentData};
use crate::render::{Preview, Scene};
use crate::serialize::{self, ImportMode};
use crate::store::Store;
use crate::viewport::Viewport;

/// Instructions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RenderNeeded,
    SetCursor(&'static str),
    /// User-facing message for a rejected command or failed import.
    Warning(String),
    /// The document already has content; call [`EditEngine::resolve_import`].
    ImportDecisionRequired { vertices: usize, shapes: usize },
    Imported { mode: ImportMode },
    /// Serialized document ready to be saved under `filename`.
    ExportReady { filename: String, json: String },
}

pub struct EditEngine {
    store: Store,
    pub viewport: Viewport,
    config: EditorConfig,
    tool: Tool,
    input: InputState,
    pending: Vec<PendingPoint>,
    playback: Playback,
    pending_import: Option<DocumentData>,
    /// Last pointer position in canvas space.
    cursor: Option<Point>,
    snap_target: Option<VertexId>,
}

impl Default for EditEngine {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditEngine {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        Self {
            store: Store::new(config.history_capacity),
            viewport: Viewport::default(),
            playback: Playback::new(config.playback_speed),
            config,
            tool: Tool::default(),
            input: InputState::default(),
            pending: Vec::new(),
            pending_import: None,
            cursor: None,
            snap_target: None,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn doc(&self) -> &Document {
        self.store.doc()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        self.store.history()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    #[must_use]
    pub fn pending(&self) -> &[PendingPoint] {
        &self.pending
    }

    #[must_use]
    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[must_use]
    pub fn has_pending_import(&self) -> bool {
        self.pending_import.is_some()
    }

    /// Read-only view for [`crate::render::draw`].
    #[must_use]
    pub fn scene(&self) -> Scene<'_> {
        let preview = match &self.input {
            InputState::DrawingRect { start, current } => Some(Preview::Rect { a: start.at, b: *current }),
            InputState::DrawingCircle { center, current } => Some(Preview::Circle {
                center: center.at,
                radius: distance(center.at, *current).max(MIN_CIRCLE_RADIUS),
            }),
            _ => None,
        };
        Scene {
            doc: self.store.doc(),
            viewport: &self.viewport,
            config: &self.config,
            preview,
            selection_box: self.input.selection_box(),
            pending: &self.pending,
            cursor: if self.pending.is_empty() { None } else { self.cursor },
            snap_target: self.snap_target.as_ref(),
        }
    }

    // --- Settings ---

    /// Replace the session settings. The history capacity applies from the next `clear_all`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] and keeps the current settings if validation fails.
    pub fn set_config(&mut self, config: EditorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.playback.set_speed(config.playback_speed);
        self.config = config;
        Ok(())
    }

    pub fn toggle_grid_snap(&mut self) -> Vec<Effect> {
        self.config.snap_to_grid = !self.config.snap_to_grid;
        tracing::debug!(enabled = self.config.snap_to_grid, "grid snap toggled");
        vec![Effect::RenderNeeded]
    }

    pub fn set_playback_speed(&mut self, speed: f64) {
        self.playback.set_speed(speed);
        self.config.playback_speed = self.playback.speed();
    }

    /// Switch tools, discarding any construction in progress.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Effect> {
        tracing::debug!(?tool, "tool selected");
        self.tool = tool;
        self.pending.clear();
        self.input = InputState::Idle;
        self.snap_target = None;
        vec![Effect::SetCursor(tool.cursor()), Effect::RenderNeeded]
    }

    // --- Pointer input ---

    pub fn pointer_down(&mut self, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Effect> {
        let pt = self.viewport.screen_to_canvas(screen);
        self.cursor = Some(pt);

        if button == Button::Middle || (button == Button::Primary && modifiers.command()) {
            self.input = InputState::Panning { last_screen: screen };
            return vec![Effect::SetCursor("grabbing")];
        }
        if self.playback.is_playing() {
            return Vec::new();
        }

        match button {
            Button::Secondary => self.finish_construction(),
            Button::Middle => Vec::new(),
            Button::Primary => match self.tool {
                Tool::Select => self.select_down(pt, modifiers),
                Tool::PlaceVertex => self.place_vertex(pt),
                Tool::Line => self.line_click(pt),
                Tool::Rect => {
                    self.input = InputState::DrawingRect { start: self.resolve_point(pt), current: pt };
                    vec![Effect::RenderNeeded]
                }
                Tool::Circle => {
                    self.input = InputState::DrawingCircle { center: self.resolve_point(pt), current: pt };
                    vec![Effect::RenderNeeded]
                }
                Tool::Bezier | Tool::Polygon => {
                    let point = self.resolve_point(pt);
                    self.pending.push(point);
                    vec![Effect::RenderNeeded]
                }
            },
        }
    }

    pub fn pointer_move(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Effect> {
        let pt = self.viewport.screen_to_canvas(screen);
        self.cursor = Some(pt);
        if self.input.is_idle() {
            return self.update_hover(pt);
        }

        match &mut self.input {
            InputState::Panning { last_screen } => {
                self.viewport.pan_by(screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
            }
            InputState::DraggingVertices { start, origins, checkpointed } => {
                if !*checkpointed {
                    self.store.checkpoint();
                    *checkpointed = true;
                }
                let (dx, dy) = (pt.x - start.x, pt.y - start.y);
                let vertices = origins
                    .iter()
                    .map(|(id, o)| (id.clone(), PartialVertex::at(Point::new(o.x + dx, o.y + dy))))
                    .collect();
                self.store.dispatch(Action::BatchUpdate { vertices, shapes: Vec::new() });
            }
            InputState::DraggingRadius { id, checkpointed } => {
                let center = match self.store.doc().shape(id).map(|s| &s.geometry) {
                    Some(Geometry::Circle { center, .. }) => self.store.doc().position(center),
                    _ => None,
                };
                if let Some(center) = center {
                    if !*checkpointed {
                        self.store.checkpoint();
                        *checkpointed = true;
                    }
                    let radius = distance(center, pt).max(MIN_CIRCLE_RADIUS);
                    self.store.dispatch(Action::UpdateShape {
                        id: id.clone(),
                        fields: PartialShape { radius: Some(radius), ..Default::default() },
                    });
                }
            }
            InputState::BoxSelecting { current, .. }
            | InputState::DrawingRect { current, .. }
            | InputState::DrawingCircle { current, .. } => *current = pt,
            InputState::Idle => {}
        }
        vec![Effect::RenderNeeded]
    }

    pub fn pointer_up(&mut self, screen: Point, _button: Button, _modifiers: Modifiers) -> Vec<Effect> {
        let pt = self.viewport.screen_to_canvas(screen);
        self.cursor = Some(pt);

        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Panning { .. } => vec![Effect::SetCursor(self.tool.cursor())],
            InputState::DraggingVertices { start, origins, checkpointed } => {
                if checkpointed && self.config.snap_to_grid {
                    let (dx, dy) = (pt.x - start.x, pt.y - start.y);
                    let grid = self.config.grid_size;
                    let vertices = origins
                        .into_iter()
                        .map(|(id, o)| (id, PartialVertex::at(snap_point_to_grid(Point::new(o.x + dx, o.y + dy), grid))))
                        .collect();
                    self.store.dispatch(Action::BatchUpdate { vertices, shapes: Vec::new() });
                }
                vec![Effect::RenderNeeded]
            }
            InputState::DraggingRadius { .. } => vec![Effect::RenderNeeded],
            InputState::BoxSelecting { start, additive, .. } => {
                let ids = hit::vertices_in_box(self.store.doc(), &Bounds::from_corners(start, pt));
                self.store.dispatch(Action::SelectVertices { ids, additive });
                vec![Effect::RenderNeeded]
            }
            InputState::DrawingRect { start, .. } => {
                let end = self.resolve_point(pt);
                self.commit_rect(&start, &end)
            }
            InputState::DrawingCircle { center, .. } => {
                let radius = distance(center.at, self.grid_snap(pt)).max(MIN_CIRCLE_RADIUS);
                let mut actions = Vec::new();
                let ids = materialize(self.store.doc(), std::slice::from_ref(&center), &mut actions);
                match ids.into_iter().next() {
                    Some(center) => self.commit_shape(actions, Geometry::Circle { center, radius }),
                    None => Vec::new(),
                }
            }
        }
    }

    pub fn wheel(&mut self, screen: Point, delta: WheelDelta) -> Vec<Effect> {
        self.viewport.wheel(screen, delta.dy);
        vec![Effect::RenderNeeded]
    }

    // --- Keyboard ---

    pub fn key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Effect> {
        let key = key.normalized();

        if self.playback.is_playing() {
            return match key.as_str() {
                " " => self.toggle_playback(),
                "0" => self.reset_view(),
                _ => Vec::new(),
            };
        }

        if modifiers.command() {
            return match key.as_str() {
                "z" if modifiers.shift => self.redo(),
                "z" => self.undo(),
                "y" => self.redo(),
                "a" => self.select_all(),
                _ => Vec::new(),
            };
        }

        match key.as_str() {
            "Delete" | "Backspace" => self.delete_selected(),
            "Escape" => self.cancel(),
            "g" => self.toggle_grid_snap(),
            " " => self.toggle_playback(),
            "0" => self.reset_view(),
            "m" => self.merge_selected(),
            "+" | "=" => {
                self.viewport.zoom_in();
                vec![Effect::RenderNeeded]
            }
            "-" => {
                self.viewport.zoom_out();
                vec![Effect::RenderNeeded]
            }
            other => Tool::from_hotkey(other).map_or_else(Vec::new, |tool| self.set_tool(tool)),
        }
    }

    // --- Commands ---

    pub fn undo(&mut self) -> Vec<Effect> {
        if self.store.undo() { vec![Effect::RenderNeeded] } else { Vec::new() }
    }

    pub fn redo(&mut self) -> Vec<Effect> {
        if self.store.redo() { vec![Effect::RenderNeeded] } else { Vec::new() }
    }

    pub fn select_all(&mut self) -> Vec<Effect> {
        let ids = self.store.doc().sorted_vertices().into_iter().map(|v| v.id.clone()).collect();
        self.store.dispatch(Action::SelectVertices { ids, additive: false });
        vec![Effect::RenderNeeded]
    }

    /// Drop construction state and selection, and return to the Select tool.
    pub fn cancel(&mut self) -> Vec<Effect> {
        self.pending.clear();
        self.input = InputState::Idle;
        self.snap_target = None;
        self.tool = Tool::Select;
        self.store.dispatch(Action::SelectVertices { ids: Vec::new(), additive: false });
        vec![Effect::SetCursor(Tool::Select.cursor()), Effect::RenderNeeded]
    }

    pub fn reset_view(&mut self) -> Vec<Effect> {
        self.viewport.reset();
        vec![Effect::RenderNeeded]
    }

    /// Delete every selected shape and vertex that is not locked, as one undo step.
    pub fn delete_selected(&mut self) -> Vec<Effect> {
        let doc = self.store.doc();
        let mut actions: Vec<Action> = doc
            .selected_shapes()
            .into_iter()
            .filter(|s| !s.locked)
            .map(|s| Action::DeleteShape(s.id.clone()))
            .collect();
        actions.extend(
            doc.selected_vertices()
                .into_iter()
                .filter(|v| !doc.is_vertex_locked(&v.id))
                .map(|v| Action::DeleteVertex(v.id.clone())),
        );
        if actions.is_empty() {
            return Vec::new();
        }
        self.store.dispatch_batch(actions);
        vec![Effect::RenderNeeded]
    }

    /// Collapse the selected vertices into one anchor at their mean position.
    pub fn merge_selected(&mut self) -> Vec<Effect> {
        let doc = self.store.doc();
        let selected: Vec<&Vertex> =
            doc.selected_vertices().into_iter().filter(|v| !doc.is_vertex_locked(&v.id)).collect();
        let positions: Vec<Point> = selected.iter().map(|v| v.position()).collect();
        let target = match centroid(&positions) {
            Some(target) if selected.len() >= 2 => target,
            _ => {
                tracing::warn!(selected = selected.len(), "merge needs at least two vertices");
                return vec![Effect::Warning("Select at least 2 vertices to merge.".to_string())];
            }
        };
        let ids = selected.into_iter().map(|v| v.id.clone()).collect();
        self.store.dispatch(Action::MergeVertices { ids, target, new_id: VertexId::new() });
        vec![Effect::RenderNeeded]
    }

    /// Apply a style change to every selected, unlocked shape as one undo step.
    pub fn set_selected_style(&mut self, style: &PartialStyle) -> Vec<Effect> {
        let shapes: Vec<(ShapeId, PartialShape)> = self
            .store
            .doc()
            .selected_shapes()
            .into_iter()
            .filter(|s| !s.locked)
            .map(|s| (s.id.clone(), PartialShape { style: Some(style.clone()), ..Default::default() }))
            .collect();
        if shapes.is_empty() {
            return Vec::new();
        }
        self.store.checkpoint();
        self.store.dispatch(Action::BatchUpdate { vertices: Vec::new(), shapes });
        vec![Effect::RenderNeeded]
    }

    pub fn set_shape_locked(&mut self, id: &ShapeId, locked: bool) -> Vec<Effect> {
        self.update_shape(id, PartialShape { locked: Some(locked), ..Default::default() })
    }

    pub fn set_shape_visible(&mut self, id: &ShapeId, visible: bool) -> Vec<Effect> {
        self.update_shape(id, PartialShape { visible: Some(visible), ..Default::default() })
    }

    fn update_shape(&mut self, id: &ShapeId, fields: PartialShape) -> Vec<Effect> {
        if self.store.doc().shape(id).is_none() {
            return Vec::new();
        }
        self.store.dispatch(Action::UpdateShape { id: id.clone(), fields });
        vec![Effect::RenderNeeded]
    }

    /// Reset to an empty document with fresh history.
    pub fn clear_all(&mut self) -> Vec<Effect> {
        self.playback.stop();
        self.pending.clear();
        self.pending_import = None;
        self.input = InputState::Idle;
        self.snap_target = None;
        self.store = Store::new(self.config.history_capacity);
        vec![Effect::RenderNeeded]
    }

    // --- Groups ---

    /// Group the selected shapes. Returns the new group's id alongside the effects.
    pub fn group_selected(&mut self, name: &str) -> (Option<GroupId>, Vec<Effect>) {
        let shape_ids: Vec<ShapeId> = self.store.doc().selected_shapes().into_iter().map(|s| s.id.clone()).collect();
        if shape_ids.is_empty() {
            return (None, vec![Effect::Warning("Select at least one shape to group.".to_string())]);
        }
        let id = GroupId::new();
        self.store.dispatch(Action::CreateGroup(Group {
            id: id.clone(),
            name: name.to_string(),
            shape_ids,
            locked: false,
        }));
        (Some(id), vec![Effect::RenderNeeded])
    }

    pub fn rename_group(&mut self, id: &GroupId, name: &str) {
        self.store.dispatch(Action::UpdateGroup {
            id: id.clone(),
            fields: PartialGroup { name: Some(name.to_string()), ..Default::default() },
        });
    }

    /// Lock or unlock a group and every shape in it.
    pub fn set_group_locked(&mut self, id: &GroupId, locked: bool) -> Vec<Effect> {
        let Some(group) = self.store.doc().groups.get(id) else {
            return Vec::new();
        };
        let shapes = group
            .shape_ids
            .iter()
            .map(|s| (s.clone(), PartialShape { locked: Some(locked), ..Default::default() }))
            .collect();
        self.store.dispatch(Action::UpdateGroup {
            id: id.clone(),
            fields: PartialGroup { locked: Some(locked), ..Default::default() },
        });
        self.store.dispatch(Action::BatchUpdate { vertices: Vec::new(), shapes });
        vec![Effect::RenderNeeded]
    }

    pub fn select_group(&mut self, id: &GroupId) -> Vec<Effect> {
        let Some(group) = self.store.doc().groups.get(id) else {
            return Vec::new();
        };
        let ids = group.shape_ids.clone();
        self.store.dispatch(Action::SelectShapes { ids, additive: false });
        vec![Effect::RenderNeeded]
    }

    pub fn ungroup(&mut self, id: &GroupId) -> Vec<Effect> {
        self.store.dispatch(Action::DeleteGroup(id.clone()));
        vec![Effect::RenderNeeded]
    }

    // --- Frames / playback ---

    /// Capture the live positions and radii as a new frame.
    pub fn record_frame(&mut self, name: Option<String>, now_ms: u64) -> Vec<Effect> {
        self.store.dispatch(Action::RecordFrame { id: FrameId::new(), name, timestamp: now_ms });
        vec![Effect::RenderNeeded]
    }

    pub fn apply_frame(&mut self, index: usize) -> Vec<Effect> {
        if self.playback.is_playing() || index >= self.store.doc().frames.len() {
            return Vec::new();
        }
        self.store.dispatch(Action::ApplyFrame(index));
        vec![Effect::RenderNeeded]
    }

    pub fn delete_frame(&mut self, index: usize) -> Vec<Effect> {
        if self.playback.is_playing() || index >= self.store.doc().frames.len() {
            return Vec::new();
        }
        self.store.dispatch(Action::DeleteFrame(index));
        vec![Effect::RenderNeeded]
    }

    pub fn set_current_frame(&mut self, index: usize) -> Vec<Effect> {
        if self.playback.is_playing() || index >= self.store.doc().frames.len() {
            return Vec::new();
        }
        self.store.dispatch(Action::SetCurrentFrame(index));
        vec![Effect::RenderNeeded]
    }

    pub fn rename_frame(&mut self, index: usize, name: &str) {
        self.store.dispatch(Action::UpdateFrame {
            index,
            fields: PartialFrame { name: Some(name.to_string()), ..Default::default() },
        });
    }

    /// Overwrite the current frame with the live state.
    pub fn update_current_frame(&mut self) -> Vec<Effect> {
        if self.store.doc().frames.is_empty() {
            return Vec::new();
        }
        self.store.dispatch(Action::UpdateCurrentFrameData);
        vec![Effect::RenderNeeded]
    }

    pub fn toggle_playback(&mut self) -> Vec<Effect> {
        if self.playback.is_playing() {
            self.playback.stop();
            return vec![Effect::RenderNeeded];
        }
        let doc = self.store.doc();
        if !self.playback.start(doc.frames.len(), doc.current_frame_index) {
            tracing::warn!(frames = doc.frames.len(), "playback needs at least two frames");
            return vec![Effect::Warning("Record at least 2 frames to play the animation.".to_string())];
        }
        self.pending.clear();
        self.input = InputState::Idle;
        vec![Effect::RenderNeeded]
    }

    /// Advance playback by `dt_ms`. Call once per display refresh.
    pub fn tick(&mut self, dt_ms: f64) -> Vec<Effect> {
        let step = self.playback.tick(dt_ms, self.store.doc().frames.len());
        let actions = step.actions();
        if actions.is_empty() {
            return Vec::new();
        }
        for action in actions {
            self.store.dispatch(action);
        }
        vec![Effect::RenderNeeded]
    }

    // --- Import / export ---

    /// Parse an import. An empty document is replaced at once; otherwise the
    /// data is held until [`Self::resolve_import`] picks merge or replace.
    pub fn begin_import(&mut self, text: &str) -> Vec<Effect> {
        match serialize::parse_import(text, self.config.grid_size) {
            Ok(data) => self.offer_import(data),
            Err(e) => {
                tracing::warn!(error = %e, "import rejected");
                vec![Effect::Warning(format!("Import failed: {e}"))]
            }
        }
    }

    /// Treat clipboard text like an import, ignoring anything that doesn't parse.
    pub fn paste(&mut self, text: &str) -> Vec<Effect> {
        match serialize::parse_import(text, self.config.grid_size) {
            Ok(data) => self.offer_import(data),
            Err(e) => {
                tracing::debug!(error = %e, "ignored clipboard content");
                Vec::new()
            }
        }
    }

    /// Complete a held import. `None` discards it.
    pub fn resolve_import(&mut self, mode: Option<ImportMode>) -> Vec<Effect> {
        let Some(data) = self.pending_import.take() else {
            tracing::debug!("no import awaiting a decision");
            return Vec::new();
        };
        match mode {
            Some(mode) => self.finish_import(data, mode),
            None => {
                tracing::info!("import cancelled");
                Vec::new()
            }
        }
    }

    fn offer_import(&mut self, data: DocumentData) -> Vec<Effect> {
        if self.store.doc().is_empty() {
            return self.finish_import(data, ImportMode::Replace);
        }
        let effect = Effect::ImportDecisionRequired { vertices: data.vertices.len(), shapes: data.shapes.len() };
        self.pending_import = Some(data);
        vec![effect]
    }

    fn finish_import(&mut self, data: DocumentData, mode: ImportMode) -> Vec<Effect> {
        tracing::info!(?mode, vertices = data.vertices.len(), shapes = data.shapes.len(), "importing document");
        self.playback.stop();
        self.pending.clear();
        self.input = InputState::Idle;
        self.store.dispatch(mode.action(data));
        vec![Effect::Imported { mode }, Effect::RenderNeeded]
    }

    /// Serialize the document for download.
    pub fn export(&self, now_ms: u64) -> Vec<Effect> {
        match self.copy_json(now_ms) {
            Ok(json) => vec![Effect::ExportReady { filename: serialize::suggested_filename(now_ms), json }],
            Err(e) => {
                tracing::warn!(error = %e, "export failed");
                vec![Effect::Warning(format!("Export failed: {e}"))]
            }
        }
    }

    /// Serialize the document for the clipboard.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error.
    pub fn copy_json(&self, now_ms: u64) -> Result<String, serde_json::Error> {
        serialize::export_json(self.store.doc(), self.config.grid_size, now_ms)
    }

    // --- Internals ---

    fn hit_radius(&self) -> f64 {
        self.viewport.screen_dist_to_canvas(HIT_RADIUS_PX)
    }

    fn grid_snap(&self, pt: Point) -> Point {
        if self.config.snap_to_grid { snap_point_to_grid(pt, self.config.grid_size) } else { pt }
    }

    /// Where a placement at `pt` lands: onto a nearby anchor, else on the (optionally snapped) point.
    fn resolve_point(&self, pt: Point) -> PendingPoint {
        if self.config.snap_to_vertices {
            if let Some(v) = hit::snap_candidate(self.store.doc(), pt, self.config.snap_radius) {
                return PendingPoint::snapped(v.id.clone(), v.position());
            }
        }
        PendingPoint::new(self.grid_snap(pt))
    }

    fn update_hover(&mut self, pt: Point) -> Vec<Effect> {
        if self.playback.is_playing() {
            return Vec::new();
        }
        let doc = self.store.doc();
        let radius = self.hit_radius();

        let snap_target = if self.tool.places_vertices() && self.config.snap_to_vertices {
            hit::snap_candidate(doc, pt, self.config.snap_radius).map(|v| v.id.clone())
        } else {
            None
        };
        let vertex_id = hit::hit_vertex(doc, pt, radius).cloned();
        let shape_id = if vertex_id.is_none() { hit::hit_shape(doc, pt, radius).cloned() } else { None };
        let hover = Hover { vertex_id, shape_id };

        let mut effects = Vec::new();
        if snap_target != self.snap_target {
            self.snap_target = snap_target;
            effects.push(Effect::RenderNeeded);
        }
        if !self.pending.is_empty() {
            effects.push(Effect::RenderNeeded);
        }
        if hover != doc.hover {
            let cursor = match (self.tool, &hover) {
                (Tool::Select, Hover { vertex_id: Some(_), .. }) => "move",
                (Tool::Select, Hover { shape_id: Some(_), .. }) => "pointer",
                (tool, _) => tool.cursor(),
            };
            self.store.dispatch(Action::SetHover(hover));
            effects.push(Effect::SetCursor(cursor));
            effects.push(Effect::RenderNeeded);
        }
        effects.dedup();
        effects
    }

    fn select_down(&mut self, pt: Point, modifiers: Modifiers) -> Vec<Effect> {
        match hit::hit_test(self.store.doc(), pt, self.hit_radius()) {
            Some(Hit::RadiusHandle(id)) => {
                self.input = InputState::DraggingRadius { id, checkpointed: false };
            }
            Some(Hit::Vertex(id)) => {
                if modifiers.shift {
                    self.store.dispatch(Action::SelectVertices { ids: vec![id], additive: true });
                    return vec![Effect::RenderNeeded];
                }
                if !self.store.doc().selection.vertex_ids.contains(&id) {
                    self.store.dispatch(Action::SelectVertices { ids: vec![id], additive: false });
                }
                let doc = self.store.doc();
                let origins: Vec<(VertexId, Point)> = doc
                    .selected_vertices()
                    .into_iter()
                    .filter(|v| !doc.is_vertex_locked(&v.id))
                    .map(|v| (v.id.clone(), v.position()))
                    .collect();
                if !origins.is_empty() {
                    self.input = InputState::DraggingVertices { start: pt, origins, checkpointed: false };
                }
            }
            Some(Hit::Shape(id)) => {
                self.store.dispatch(Action::SelectShapes { ids: vec![id], additive: modifiers.shift });
            }
            None => {
                self.input = InputState::BoxSelecting { start: pt, current: pt, additive: modifiers.shift };
            }
        }
        vec![Effect::RenderNeeded]
    }

    fn place_vertex(&mut self, pt: Point) -> Vec<Effect> {
        let point = self.resolve_point(pt);
        if let Some(ref id) = point.existing {
            tracing::debug!(vertex = %id, "placement snapped onto existing anchor");
            return Vec::new();
        }
        self.store.dispatch(Action::AddVertex(Vertex::anchor(VertexId::new(), point.at)));
        vec![Effect::RenderNeeded]
    }

    fn line_click(&mut self, pt: Point) -> Vec<Effect> {
        let point = self.resolve_point(pt);
        let Some(start) = self.pending.first().cloned() else {
            self.pending.push(point);
            return vec![Effect::RenderNeeded];
        };
        if start.existing.is_some() && start.existing == point.existing {
            return Vec::new();
        }
        self.pending.clear();
        let mut actions = Vec::new();
        let ids = materialize(self.store.doc(), &[start, point], &mut actions);
        match <[VertexId; 2]>::try_from(ids) {
            Ok(vertices) => self.commit_shape(actions, Geometry::Line { vertices }),
            Err(_) => Vec::new(),
        }
    }

    fn commit_rect(&mut self, start: &PendingPoint, end: &PendingPoint) -> Vec<Effect> {
        let (a, b) = (start.at, end.at);
        if (a.x - b.x).abs() < f64::EPSILON || (a.y - b.y).abs() < f64::EPSILON {
            tracing::debug!("discarded zero-area rectangle");
            return vec![Effect::RenderNeeded];
        }
        let corners = [
            start.clone(),
            PendingPoint::new(Point::new(b.x, a.y)),
            end.clone(),
            PendingPoint::new(Point::new(a.x, b.y)),
        ];
        let mut actions = Vec::new();
        let ids = materialize(self.store.doc(), &corners, &mut actions);
        match <[VertexId; 4]>::try_from(ids) {
            Ok(vertices) => self.commit_shape(actions, Geometry::Rect { vertices }),
            Err(_) => Vec::new(),
        }
    }

    /// Right-click: close a polygon or finish a Bézier.
    fn finish_construction(&mut self) -> Vec<Effect> {
        match self.tool {
            Tool::Polygon => {
                if self.pending.len() < 3 {
                    tracing::warn!(points = self.pending.len(), "polygon needs at least three vertices");
                    return vec![Effect::Warning("A polygon needs at least 3 vertices.".to_string())];
                }
                let points = std::mem::take(&mut self.pending);
                let mut actions = Vec::new();
                let vertices = materialize(self.store.doc(), &points, &mut actions);
                self.commit_shape(actions, Geometry::Polygon { vertices, closed: true })
            }
            Tool::Bezier => {
                if self.pending.len() < 2 {
                    tracing::warn!(points = self.pending.len(), "bezier needs at least two anchors");
                    return vec![Effect::Warning("A curve needs at least 2 anchors.".to_string())];
                }
                let points = std::mem::take(&mut self.pending);
                let mut actions = Vec::new();
                let anchors = materialize(self.store.doc(), &points, &mut actions);
                let segments = anchors
                    .windows(2)
                    .zip(points.windows(2))
                    .map(|(ids, pts)| {
                        let c1 = VertexId::new();
                        let c2 = VertexId::new();
                        let h1 = lerp_point(pts[0].at, pts[1].at, BEZIER_HANDLE_T1);
                        let h2 = lerp_point(pts[0].at, pts[1].at, BEZIER_HANDLE_T2);
                        actions.push(Action::AddVertex(Vertex::control(c1.clone(), h1, ids[0].clone())));
                        actions.push(Action::AddVertex(Vertex::control(c2.clone(), h2, ids[1].clone())));
                        Segment { p0: ids[0].clone(), p1: c1, p2: c2, p3: ids[1].clone() }
                    })
                    .collect();
                self.commit_shape(actions, Geometry::Bezier { segments, closed: false })
            }
            Tool::Line => {
                self.pending.clear();
                vec![Effect::RenderNeeded]
            }
            Tool::Select | Tool::PlaceVertex | Tool::Rect | Tool::Circle => Vec::new(),
        }
    }

    /// Add the new vertices and the shape as one undo step.
    fn commit_shape(&mut self, mut actions: Vec<Action>, geometry: Geometry) -> Vec<Effect> {
        let mut shape = Shape::new(ShapeId::new(), geometry);
        shape.z_index = self.store.doc().next_z_index();
        tracing::debug!(shape = %shape.id, kind = shape.kind().as_str(), "shape created");
        actions.push(Action::AddShape(shape));
        self.store.dispatch_batch(actions);
        vec![Effect::RenderNeeded]
    }
}

/// Resolve pending points to vertex ids, queueing `AddVertex` for every point
/// that doesn't reuse a live anchor.
fn materialize(doc: &Document, points: &[PendingPoint], actions: &mut Vec<Action>) -> Vec<VertexId> {
    points
        .iter()
        .map(|p| match &p.existing {
            Some(id) if doc.vertex(id).is_some() => id.clone(),
            _ => {
                let id = VertexId::new();
                actions.push(Action::AddVertex(Vertex::anchor(id.clone(), p.at)));
                id
            }
        })
        .collect()
}
