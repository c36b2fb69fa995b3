//! Shared numeric constants for the mesh editor.

// ── History ─────────────────────────────────────────────────────

/// Number of undo snapshots retained before the oldest is dropped.
pub const HISTORY_CAPACITY: usize = 50;

// ── Editing ─────────────────────────────────────────────────────

/// Default radius, in canvas units, within which a placement reuses an existing anchor.
pub const SNAP_RADIUS: f64 = 15.0;

/// Default grid spacing in canvas units.
pub const GRID_SIZE: f64 = 20.0;

/// Smallest radius a circle can be dragged down to.
pub const MIN_CIRCLE_RADIUS: f64 = 5.0;

/// Screen-space hit slop in pixels for vertices, handles and thin outlines.
pub const HIT_RADIUS_PX: f64 = 8.0;

/// Fractions of a straight span where default bezier handles are synthesized.
pub const BEZIER_HANDLE_T1: f64 = 1.0 / 3.0;
pub const BEZIER_HANDLE_T2: f64 = 2.0 / 3.0;

// ── Viewport ────────────────────────────────────────────────────

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;

/// Multiplier applied by the zoom-in / zoom-out commands.
pub const ZOOM_STEP: f64 = 1.2;

/// Multiplier applied per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

// ── Animation ───────────────────────────────────────────────────

/// Time to interpolate between two adjacent frames at 1x speed.
pub const CYCLE_DURATION_MS: f64 = 2000.0;

pub const MIN_PLAYBACK_SPEED: f64 = 0.1;
pub const MAX_PLAYBACK_SPEED: f64 = 5.0;

// ── Serialization ───────────────────────────────────────────────

/// Version string written into every export.
pub const FORMAT_VERSION: &str = "2.1.0";

/// Major version prefix an import is expected to carry.
pub const FORMAT_VERSION_PREFIX: &str = "2.";

/// Tessellation hints written into export metadata.
pub const RECOMMENDED_CIRCLE_SEGMENTS: u32 = 64;
pub const RECOMMENDED_BEZIER_SEGMENTS: u32 = 32;

// ── Rendering ───────────────────────────────────────────────────

pub const HIGHLIGHT_COLOR: &str = "#2F80ED";
pub const HOVER_COLOR: &str = "#56CCF2";
pub const GRID_COLOR: &str = "#E6E6E6";
pub const ANCHOR_COLOR: &str = "#1F1A17";
pub const CONTROL_COLOR: &str = "#EB5757";
pub const PREVIEW_COLOR: &str = "#9B9B9B";
pub const EXPORT_BOUNDS_COLOR: &str = "#27AE60";

/// Selected and hovered shapes are stroked this much wider.
pub const HIGHLIGHT_WIDTH_FACTOR: f64 = 1.5;

/// Vertex marker radius in screen pixels.
pub const VERTEX_MARKER_PX: f64 = 4.0;

/// Ring drawn around a vertex the cursor would snap onto.
pub const SNAP_RING_PX: f64 = 9.0;
