//! Versioned JSON import/export.
//!
//! DESIGN
//! ======
//! Exported positions are expressed in grid units relative to the document's
//! logical origin: the minimum corner of the union bounding box of every live
//! vertex and every frame-recorded position. A position `p` is written as
//! `round2((p - origin) / gridSize)`. Radii are scaled the same way without
//! the translation. The origin and grid size are declared under
//! `metadata.coordinateSystem` so that import can undo both.
//!
//! Import walks the raw `serde_json::Value` so that every missing or
//! malformed required field produces a specific [`ImportError`]. Nothing is
//! applied to a document here; callers turn the returned [`DocumentData`]
//! into an `ImportData` or `MergeData` action.

#[cfg(test)]
#[path = "serialize_test.rs"]
mod serialize_test;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::{
    CYCLE_DURATION_MS, FORMAT_VERSION, FORMAT_VERSION_PREFIX, MIN_CIRCLE_RADIUS, RECOMMENDED_BEZIER_SEGMENTS,
    RECOMMENDED_CIRCLE_SEGMENTS,
};
use crate::doc::{
    Document, Frame, FrameId, FrameShapeProps, Geometry, Group, Segment, Shape, ShapeId, ShapeKind, Style, Vertex,
    VertexId, VertexKind,
};
use crate::geometry::{Bounds, Point, round2};
use crate::reduce::{Action, DocumentData};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{entity} is missing required field `{field}`")]
    MissingField { entity: String, field: &'static str },
    #[error("malformed {entity} {id}: {reason}")]
    Malformed { entity: &'static str, id: String, reason: String },
    #[error("shape {shape} references unknown vertex {vertex}")]
    DanglingReference { shape: String, vertex: String },
}

/// How imported content combines with a non-empty document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Union by id; collisions overwrite, frames are appended.
    Merge,
    /// Wholesale replacement.
    Replace,
}

impl ImportMode {
    #[must_use]
    pub fn action(self, data: DocumentData) -> Action {
        match self {
            Self::Merge => Action::MergeData(data),
            Self::Replace => Action::ImportData(data),
        }
    }
}

/// Root of the export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub version: String,
    pub metadata: Metadata,
    pub vertices: Vec<VertexRecord>,
    pub shapes: Vec<ShapeRecord>,
    pub groups: Vec<Group>,
    pub frames: Vec<FrameRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub version: String,
    pub exported_at: u64,
    pub coordinate_system: CoordinateSystem,
    pub bounds: BoundsRecord,
    pub statistics: Statistics,
    pub rendering_hints: RenderingHints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateSystem {
    pub unit: String,
    pub grid_size: f64,
    /// Canvas-unit position of the grid origin.
    pub origin: [f64; 2],
}

/// Extent of the export in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsRecord {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub vertex_count: usize,
    pub anchor_count: usize,
    pub control_count: usize,
    pub shape_count: usize,
    pub shapes_by_type: BTreeMap<String, usize>,
    pub group_count: usize,
    pub frame_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderingHints {
    pub recommended_segments: TessellationHints,
    pub default_animation_duration: f64,
    pub colors_used: Vec<String>,
    pub has_transparency: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TessellationHints {
    pub circle: u32,
    pub bezier: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexRecord {
    pub id: VertexId,
    pub position: [f64; 2],
    #[serde(rename = "type")]
    pub kind: VertexKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<VertexId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRecord {
    pub id: ShapeId,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub vertex_refs: Vec<VertexId>,
    pub style: Style,
    pub visible: bool,
    pub locked: bool,
    pub properties: ShapeProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShapeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    pub id: FrameId,
    pub name: String,
    pub timestamp: u64,
    pub vertex_positions: BTreeMap<VertexId, [f64; 2]>,
    pub shape_properties: BTreeMap<ShapeId, FrameShapeProps>,
}

/// File name offered to the host for a download.
#[must_use]
pub fn suggested_filename(unix_millis: u64) -> String {
    format!("mesh_export_{unix_millis}.json")
}

// =============================================================================
// EXPORT
// =============================================================================

/// Maps canvas units to grid units around an origin.
#[derive(Debug, Clone, Copy)]
struct GridTransform {
    origin: Point,
    grid: f64,
}

impl GridTransform {
    fn to_grid(self, p: Point) -> [f64; 2] {
        [round2((p.x - self.origin.x) / self.grid), round2((p.y - self.origin.y) / self.grid)]
    }

    fn length_to_grid(self, len: f64) -> f64 {
        round2(len / self.grid)
    }

    fn to_canvas(self, p: [f64; 2]) -> Point {
        Point::new(self.origin.x + p[0] * self.grid, self.origin.y + p[1] * self.grid)
    }

    fn length_to_canvas(self, len: f64) -> f64 {
        len * self.grid
    }
}

/// Union of live vertex positions and every frame-recorded position.
#[must_use]
pub fn export_bounds(doc: &Document) -> Option<Bounds> {
    let live = doc.vertices.values().map(Vertex::position);
    let recorded = doc.frames.iter().flat_map(|f| f.vertex_positions.values().copied());
    Bounds::from_points(live.chain(recorded))
}

/// Build the export document. `grid_size` must be positive.
#[must_use]
pub fn export_document(doc: &Document, grid_size: f64, exported_at: u64) -> ExportDocument {
    let bounds = export_bounds(doc);
    let origin = bounds.map_or(Point::default(), |b| b.min());
    let tx = GridTransform { origin, grid: grid_size };

    let vertices = doc
        .sorted_vertices()
        .into_iter()
        .map(|v| VertexRecord {
            id: v.id.clone(),
            position: tx.to_grid(v.position()),
            kind: v.kind,
            parent_id: v.parent_id.clone(),
        })
        .collect::<Vec<_>>();

    let shapes = doc.sorted_shapes().into_iter().map(|s| shape_record(s, tx)).collect::<Vec<_>>();

    let mut groups: Vec<Group> = doc.groups.values().cloned().collect();
    groups.sort_by(|a, b| a.id.cmp(&b.id));

    let frames = doc
        .frames
        .iter()
        .map(|f| FrameRecord {
            id: f.id.clone(),
            name: f.name.clone(),
            timestamp: f.timestamp,
            vertex_positions: f.vertex_positions.iter().map(|(id, p)| (id.clone(), tx.to_grid(*p))).collect(),
            shape_properties: f
                .shape_properties
                .iter()
                .map(|(id, props)| {
                    (id.clone(), FrameShapeProps { radius: props.radius.map(|r| tx.length_to_grid(r)) })
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    let bounds = bounds.map_or(
        BoundsRecord { min_x: 0.0, min_y: 0.0, max_x: 0.0, max_y: 0.0, width: 0.0, height: 0.0 },
        |b| {
            let width = tx.length_to_grid(b.width());
            let height = tx.length_to_grid(b.height());
            BoundsRecord { min_x: 0.0, min_y: 0.0, max_x: width, max_y: height, width, height }
        },
    );

    let metadata = Metadata {
        version: FORMAT_VERSION.to_string(),
        exported_at,
        coordinate_system: CoordinateSystem {
            unit: "grid".to_string(),
            grid_size,
            origin: [origin.x, origin.y],
        },
        bounds,
        statistics: statistics(doc),
        rendering_hints: rendering_hints(doc),
    };

    ExportDocument { version: FORMAT_VERSION.to_string(), metadata, vertices, shapes, groups, frames }
}

/// Serialize the export as pretty-printed JSON.
///
/// # Errors
///
/// Returns the serializer's error, which only occurs for non-finite numbers.
pub fn export_json(doc: &Document, grid_size: f64, exported_at: u64) -> Result<String, serde_json::Error> {
    let export = export_document(doc, grid_size, exported_at);
    tracing::info!(
        vertices = export.vertices.len(),
        shapes = export.shapes.len(),
        frames = export.frames.len(),
        grid_size,
        "exported document"
    );
    serde_json::to_string_pretty(&export)
}

fn shape_record(shape: &Shape, tx: GridTransform) -> ShapeRecord {
    let properties = match &shape.geometry {
        Geometry::Circle { radius, .. } => {
            ShapeProperties { radius: Some(tx.length_to_grid(*radius)), ..Default::default() }
        }
        Geometry::Polygon { closed, .. } => ShapeProperties { closed: Some(*closed), ..Default::default() },
        Geometry::Bezier { segments, closed } => {
            ShapeProperties { segments: Some(segments.clone()), closed: Some(*closed), ..Default::default() }
        }
        Geometry::Line { .. } | Geometry::Rect { .. } => ShapeProperties::default(),
    };
    ShapeRecord {
        id: shape.id.clone(),
        kind: shape.kind(),
        vertex_refs: shape.geometry.ordered_refs().into_iter().cloned().collect(),
        style: shape.style.clone(),
        visible: shape.visible,
        locked: shape.locked,
        properties,
    }
}

fn statistics(doc: &Document) -> Statistics {
    let anchor_count = doc.vertices.values().filter(|v| v.kind == VertexKind::Anchor).count();
    let mut shapes_by_type: BTreeMap<String, usize> =
        ShapeKind::ALL.iter().map(|k| (k.as_str().to_string(), 0)).collect();
    for shape in doc.shapes.values() {
        *shapes_by_type.entry(shape.kind().as_str().to_string()).or_default() += 1;
    }
    Statistics {
        vertex_count: doc.vertices.len(),
        anchor_count,
        control_count: doc.vertices.len() - anchor_count,
        shape_count: doc.shapes.len(),
        shapes_by_type,
        group_count: doc.groups.len(),
        frame_count: doc.frames.len(),
    }
}

fn rendering_hints(doc: &Document) -> RenderingHints {
    let mut colors = BTreeSet::new();
    for shape in doc.shapes.values() {
        colors.insert(shape.style.stroke_color.clone());
        if let Some(ref fill) = shape.style.fill_color {
            colors.insert(fill.clone());
        }
    }
    RenderingHints {
        recommended_segments: TessellationHints {
            circle: RECOMMENDED_CIRCLE_SEGMENTS,
            bezier: RECOMMENDED_BEZIER_SEGMENTS,
        },
        default_animation_duration: CYCLE_DURATION_MS,
        colors_used: colors.into_iter().collect(),
        has_transparency: doc.shapes.values().any(|s| s.style.opacity < 1.0),
    }
}

// =============================================================================
// IMPORT
// =============================================================================

/// Parse and validate an export file.
///
/// Positions are converted with the document's declared
/// `metadata.coordinateSystem.gridSize` when present, otherwise with
/// `session_grid`. A declared origin is added back.
///
/// # Errors
///
/// Returns an [`ImportError`] for invalid JSON, a missing or malformed required
/// field, or a shape referencing a vertex that the file does not define.
pub fn parse_import(text: &str, session_grid: f64) -> Result<DocumentData, ImportError> {
    let root: Value = serde_json::from_str(text)?;
    let Some(root) = root.as_object() else {
        return Err(malformed("document", "", "top level is not an object"));
    };

    check_version(root);
    let tx = declared_transform(root, session_grid);

    let vertices = required_array(root, "vertices")?
        .iter()
        .enumerate()
        .map(|(i, v)| parse_vertex(i, v, tx))
        .collect::<Result<Vec<_>, _>>()?;
    let known: HashSet<&VertexId> = vertices.iter().map(|v| &v.id).collect();

    let mut shapes = Vec::new();
    for (i, raw) in required_array(root, "shapes")?.iter().enumerate() {
        let shape = parse_shape(i, raw, tx)?;
        if let Some(missing) = shape.geometry.vertex_refs().into_iter().find(|id| !known.contains(id)) {
            return Err(ImportError::DanglingReference {
                shape: shape.id.to_string(),
                vertex: missing.to_string(),
            });
        }
        shapes.push(shape);
    }
    let shape_ids: HashSet<&ShapeId> = shapes.iter().map(|s| &s.id).collect();

    let mut groups = Vec::new();
    for raw in required_array(root, "groups")? {
        let mut group: Group = serde_json::from_value(raw.clone())
            .map_err(|e| malformed("group", id_hint(raw), &e.to_string()))?;
        group.shape_ids.retain(|id| shape_ids.contains(id));
        groups.push(group);
    }

    let frames = match root.get("frames") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, f)| parse_frame(i, f, tx))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Some(_) => return Err(malformed("document", "", "`frames` is not an array")),
    };

    Ok(DocumentData { vertices, shapes, groups, frames })
}

fn check_version(root: &Map<String, Value>) {
    let version = root
        .get("version")
        .and_then(Value::as_str)
        .or_else(|| root.get("metadata").and_then(|m| m.get("version")).and_then(Value::as_str));
    match version {
        Some(v) if v.starts_with(FORMAT_VERSION_PREFIX) => {}
        Some(v) => tracing::warn!(version = v, expected = FORMAT_VERSION, "importing unexpected format version"),
        None => tracing::warn!(expected = FORMAT_VERSION, "import carries no format version"),
    }
}

fn declared_transform(root: &Map<String, Value>, session_grid: f64) -> GridTransform {
    let coords = root.get("metadata").and_then(|m| m.get("coordinateSystem"));
    let grid = coords
        .and_then(|c| c.get("gridSize"))
        .and_then(Value::as_f64)
        .filter(|g| g.is_finite() && *g > 0.0)
        .unwrap_or(session_grid);
    let origin = coords
        .and_then(|c| c.get("origin"))
        .and_then(as_pair)
        .map_or(Point::default(), |[x, y]| Point::new(x, y));
    GridTransform { origin, grid }
}

fn required_array<'a>(root: &'a Map<String, Value>, field: &'static str) -> Result<&'a Vec<Value>, ImportError> {
    match root.get(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(malformed("document", "", &format!("`{field}` is not an array"))),
        None => Err(ImportError::MissingField { entity: "document".to_string(), field }),
    }
}

fn parse_vertex(index: usize, raw: &Value, tx: GridTransform) -> Result<Vertex, ImportError> {
    let entity = format!("vertex #{index}");
    let id = required_str(raw, "id", &entity)?;
    let position = raw
        .get("position")
        .ok_or_else(|| ImportError::MissingField { entity: entity.clone(), field: "position" })?;
    let Some(position) = as_pair(position) else {
        return Err(malformed("vertex", id, "`position` must be a 2-element number array"));
    };
    let kind = match required_str(raw, "type", &entity)? {
        "anchor" => VertexKind::Anchor,
        "control" => VertexKind::Control,
        other => return Err(malformed("vertex", id, &format!("unknown type `{other}`"))),
    };
    let parent_id = raw.get("parentId").and_then(Value::as_str).map(VertexId::from);
    let p = tx.to_canvas(position);
    Ok(Vertex { id: VertexId::from(id), x: p.x, y: p.y, kind, parent_id })
}

fn parse_shape(index: usize, raw: &Value, tx: GridTransform) -> Result<Shape, ImportError> {
    let entity = format!("shape #{index}");
    let id = required_str(raw, "id", &entity)?;
    let kind_raw = required_str(raw, "type", &entity)?;
    let Some(kind) = ShapeKind::parse(kind_raw) else {
        return Err(malformed("shape", id, &format!("unknown type `{kind_raw}`")));
    };
    let refs = raw
        .get("vertexRefs")
        .ok_or_else(|| ImportError::MissingField { entity: entity.clone(), field: "vertexRefs" })?;
    let Some(refs) = refs
        .as_array()
        .and_then(|items| items.iter().map(|r| r.as_str().map(VertexId::from)).collect::<Option<Vec<_>>>())
    else {
        return Err(malformed("shape", id, "`vertexRefs` must be an array of strings"));
    };

    let empty = Map::new();
    let props = raw.get("properties").and_then(Value::as_object).unwrap_or(&empty);
    let geometry = build_geometry(kind, refs, props, tx).map_err(|reason| malformed("shape", id, &reason))?;

    let style = match raw.get("style") {
        None | Some(Value::Null) => Style::default(),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| malformed("shape", id, &format!("style: {e}")))?,
    };

    let z_index = i64::try_from(index).unwrap_or(i64::MAX);
    Ok(Shape {
        id: ShapeId::from(id),
        geometry,
        style,
        visible: raw.get("visible").and_then(Value::as_bool).unwrap_or(true),
        locked: raw.get("locked").and_then(Value::as_bool).unwrap_or(false),
        z_index,
    })
}

fn build_geometry(
    kind: ShapeKind,
    refs: Vec<VertexId>,
    props: &Map<String, Value>,
    tx: GridTransform,
) -> Result<Geometry, String> {
    let closed = props.get("closed").and_then(Value::as_bool);
    match kind {
        ShapeKind::Line => {
            let vertices: [VertexId; 2] =
                refs.try_into().map_err(|r: Vec<VertexId>| format!("line needs 2 vertexRefs, got {}", r.len()))?;
            Ok(Geometry::Line { vertices })
        }
        ShapeKind::Rect => {
            let vertices: [VertexId; 4] =
                refs.try_into().map_err(|r: Vec<VertexId>| format!("rect needs 4 vertexRefs, got {}", r.len()))?;
            Ok(Geometry::Rect { vertices })
        }
        ShapeKind::Circle => {
            let [center]: [VertexId; 1] =
                refs.try_into().map_err(|r: Vec<VertexId>| format!("circle needs 1 vertexRef, got {}", r.len()))?;
            let radius = match props.get("radius").and_then(Value::as_f64).filter(|r| r.is_finite()) {
                Some(radius) => tx.length_to_canvas(radius),
                None => {
                    tracing::warn!(center = %center, "circle without radius; using minimum");
                    MIN_CIRCLE_RADIUS
                }
            };
            Ok(Geometry::Circle { center, radius })
        }
        ShapeKind::Polygon => {
            if refs.len() < 3 {
                return Err(format!("polygon needs at least 3 vertexRefs, got {}", refs.len()));
            }
            Ok(Geometry::Polygon { vertices: refs, closed: closed.unwrap_or(true) })
        }
        ShapeKind::Bezier => {
            let segments = match props.get("segments") {
                Some(raw) => serde_json::from_value::<Vec<Segment>>(raw.clone()).map_err(|e| format!("segments: {e}"))?,
                None => segments_from_refs(&refs)?,
            };
            if segments.is_empty() {
                return Err("bezier needs at least one segment".to_string());
            }
            Ok(Geometry::Bezier { segments, closed: closed.unwrap_or(false) })
        }
    }
}

/// Rebuild segments from a flat `a c c a c c a ...` reference list.
fn segments_from_refs(refs: &[VertexId]) -> Result<Vec<Segment>, String> {
    if refs.len() < 4 || (refs.len() - 1) % 3 != 0 {
        return Err(format!("bezier vertexRefs must have 3n+1 entries, got {}", refs.len()));
    }
    Ok(refs
        .windows(4)
        .step_by(3)
        .map(|w| Segment { p0: w[0].clone(), p1: w[1].clone(), p2: w[2].clone(), p3: w[3].clone() })
        .collect())
}

fn parse_frame(index: usize, raw: &Value, tx: GridTransform) -> Result<Frame, ImportError> {
    let entity = format!("frame #{index}");
    let id = required_str(raw, "id", &entity)?;
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .map_or_else(|| format!("Frame {}", index + 1), str::to_string);
    let timestamp = raw.get("timestamp").and_then(Value::as_u64).unwrap_or(0);

    let mut vertex_positions = HashMap::new();
    if let Some(positions) = raw.get("vertexPositions").and_then(Value::as_object) {
        for (vertex, p) in positions {
            let Some(p) = as_pair(p) else {
                return Err(malformed("frame", id, &format!("position of {vertex} is not a 2-element array")));
            };
            vertex_positions.insert(VertexId::from(vertex.as_str()), tx.to_canvas(p));
        }
    }

    let mut shape_properties = HashMap::new();
    if let Some(props) = raw.get("shapeProperties").and_then(Value::as_object) {
        for (shape, p) in props {
            let radius = p.get("radius").and_then(Value::as_f64).map(|r| tx.length_to_canvas(r));
            shape_properties.insert(ShapeId::from(shape.as_str()), FrameShapeProps { radius });
        }
    }

    Ok(Frame { id: FrameId::from(id), name, timestamp, vertex_positions, shape_properties })
}

// --- Value helpers ---

fn required_str<'a>(raw: &'a Value, field: &'static str, entity: &str) -> Result<&'a str, ImportError> {
    raw.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ImportError::MissingField { entity: entity.to_string(), field })
}

fn as_pair(raw: &Value) -> Option<[f64; 2]> {
    match raw.as_array()?.as_slice() {
        [x, y] => Some([x.as_f64()?, y.as_f64()?]),
        _ => None,
    }
}

fn id_hint(raw: &Value) -> &str {
    raw.get("id").and_then(Value::as_str).unwrap_or("")
}

fn malformed(entity: &'static str, id: &str, reason: &str) -> ImportError {
    ImportError::Malformed { entity, id: id.to_string(), reason: reason.to_string() }
}
