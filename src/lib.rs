//! Editing core for a 2D vector mesh editor.
//!
//! Shapes reference shared vertices by id, so moving one vertex deforms every
//! shape built on it. The crate owns the document model, the action reducer
//! and bounded undo history, the tool state machine that turns pointer and
//! key input into actions, keyframe playback, JSON import/export in grid
//! units, and a backend-agnostic render projection. The host supplies input
//! events, a [`render::Surface`] to draw on, and wall-clock time.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Tool state machine and the host-facing [`engine::EditEngine`] |
//! | [`doc`] | Vertices, shapes, groups, frames and the [`doc::Document`] aggregate |
//! | [`reduce`] | The pure [`reduce::reduce`] function over [`reduce::Action`]s |
//! | [`history`] | Bounded undo/redo snapshots |
//! | [`store`] | Document plus history; the single dispatch point |
//! | [`animation`] | Keyframe playback timer |
//! | [`serialize`] | Grid-unit JSON export and validating import |
//! | [`render`] | Layered draw-call projection onto a [`render::Surface`] |
//! | [`viewport`] | Pan/zoom and screen/canvas conversions |
//! | [`hit`] | Hit testing against vertices, shapes and handles |
//! | [`input`] | Tools, modifiers, and the gesture state machine |
//! | [`geometry`] | Points, bounds and curve math |
//! | [`config`] | Session settings |
//! | [`consts`] | Shared numeric constants and palette |

pub mod animation;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod geometry;
pub mod history;
pub mod hit;
pub mod input;
pub mod reduce;
pub mod render;
pub mod serialize;
pub mod store;
pub mod viewport;
