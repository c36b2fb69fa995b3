//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the active gesture being tracked between
//! pointer-down and pointer-up, carrying the context needed to compute
//! incremental updates and emit the final document actions on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::doc::{ShapeId, VertexId};
use crate::geometry::{Bounds, Point};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Drop a single anchor per click.
    PlaceVertex,
    /// Two clicks make a line.
    Line,
    /// Drag a diagonal to make an axis-aligned rectangle.
    Rect,
    /// Drag from the center to set the radius.
    Circle,
    /// Click anchors, right-click to finish.
    Bezier,
    /// Click vertices, right-click to close.
    Polygon,
}

impl Tool {
    /// Tool bound to a single-letter hotkey.
    #[must_use]
    pub fn from_hotkey(key: &str) -> Option<Self> {
        match key {
            "v" => Some(Self::Select),
            "p" => Some(Self::PlaceVertex),
            "l" => Some(Self::Line),
            "r" => Some(Self::Rect),
            "c" => Some(Self::Circle),
            "b" => Some(Self::Bezier),
            "o" => Some(Self::Polygon),
            _ => None,
        }
    }

    /// Whether clicks with this tool place anchors (and so may snap onto existing ones).
    #[must_use]
    pub fn places_vertices(self) -> bool {
        !matches!(self, Self::Select)
    }

    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Select => "default",
            _ => "crosshair",
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key as reported by the host (e.g. `"Delete"`, `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    /// Single-character keys are compared case-insensitively.
    #[must_use]
    pub fn normalized(&self) -> String {
        if self.0.chars().count() == 1 { self.0.to_lowercase() } else { self.0.clone() }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// A construction point not yet committed to the document.
///
/// `existing` is set when the click snapped onto an anchor; that vertex is
/// reused at commit time instead of creating a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPoint {
    pub existing: Option<VertexId>,
    pub at: Point,
}

impl PendingPoint {
    #[must_use]
    pub fn new(at: Point) -> Self {
        Self { existing: None, at }
    }

    #[must_use]
    pub fn snapped(id: VertexId, at: Point) -> Self {
        Self { existing: Some(id), at }
    }
}

/// Internal state for the input state machine.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the canvas with the middle button or Ctrl+left.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving one vertex or the whole vertex selection.
    DraggingVertices {
        /// Canvas position of the pointer at pointer-down.
        start: Point,
        /// Every moving vertex with its position at pointer-down.
        origins: Vec<(VertexId, Point)>,
        /// Whether a history snapshot was taken for this gesture.
        checkpointed: bool,
    },
    /// Dragging a selected circle's radius handle.
    DraggingRadius { id: ShapeId, checkpointed: bool },
    /// Rubber-band box selection.
    BoxSelecting { start: Point, current: Point, additive: bool },
    /// Rect tool drag in progress.
    DrawingRect { start: PendingPoint, current: Point },
    /// Circle tool drag in progress.
    DrawingCircle { center: PendingPoint, current: Point },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The rubber-band rectangle, while box selecting.
    #[must_use]
    pub fn selection_box(&self) -> Option<Bounds> {
        match self {
            Self::BoxSelecting { start, current, .. } => Some(Bounds::from_corners(*start, *current)),
            _ => None,
        }
    }
}
