//! Core type definitions for the graph document
//!
//! This module contains the fundamental types used throughout flowgraph:
//! shape kinds, geometry, ports, endpoints, nodes and edges.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::error::GraphError;

/// Attribute bag carried by nodes and edges (display text, style)
///
/// Nested the way the renderer expects it, e.g. `{"text": {"text": "Start"}}`.
pub type Attrs = Map<String, Value>;

/// Closed set of shape kinds the canvas knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Plain rectangle used for start, process, decision and link nodes
    #[serde(rename = "flow-chart-rect")]
    Rect,
    /// Rectangle with an image on the left and text on the right
    #[serde(rename = "flow-chart-image-rect")]
    ImageRect,
    /// Rectangle with a title bar above the body text
    #[serde(rename = "flow-chart-title-rect")]
    TitleRect,
    /// Text block rendered with an animated stroke
    #[serde(rename = "flow-chart-animate-text")]
    AnimateText,
    /// Collapsible container for other nodes
    #[serde(rename = "group-node")]
    Group,
}

impl ShapeKind {
    /// All shape kinds, in palette order
    pub fn all() -> &'static [ShapeKind] {
        &[
            ShapeKind::Rect,
            ShapeKind::ImageRect,
            ShapeKind::TitleRect,
            ShapeKind::AnimateText,
            ShapeKind::Group,
        ]
    }

    /// The wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Rect => "flow-chart-rect",
            ShapeKind::ImageRect => "flow-chart-image-rect",
            ShapeKind::TitleRect => "flow-chart-title-rect",
            ShapeKind::AnimateText => "flow-chart-animate-text",
            ShapeKind::Group => "group-node",
        }
    }

    /// Returns true if nodes of this kind are containers
    pub fn is_container(&self) -> bool {
        matches!(self, ShapeKind::Group)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShapeKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GraphError::invalid_spec(format!("unknown shape kind '{}'", s)))
    }
}

/// A point on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Return this point shifted by the given offset
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Width and height of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Position, size and rotation of a node, captured together for history
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub position: Point,
    pub size: Size,
    pub angle: f64,
}

impl Geometry {
    /// Check that every component is finite and the size is non-negative
    pub fn validate(&self) -> Result<(), GraphError> {
        let values = [
            self.position.x,
            self.position.y,
            self.size.width,
            self.size.height,
            self.angle,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GraphError::invalid_spec("geometry must be finite"));
        }
        if self.size.width < 0.0 || self.size.height < 0.0 {
            return Err(GraphError::invalid_spec(format!(
                "size must be non-negative, got {}x{}",
                self.size.width, self.size.height
            )));
        }
        Ok(())
    }
}

/// Side of a node a port is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSide {
    #[default]
    Top,
    Right,
    Bottom,
    Left,
}

impl fmt::Display for PortSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSide::Top => write!(f, "top"),
            PortSide::Right => write!(f, "right"),
            PortSide::Bottom => write!(f, "bottom"),
            PortSide::Left => write!(f, "left"),
        }
    }
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

/// A named connection anchor on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    /// Side the port group sits on
    pub group: PortSide,
    /// Horizontal offset from the side's default anchor
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dx: f64,
    /// Vertical offset from the side's default anchor
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dy: f64,
}

impl Port {
    /// Create a port centered on the given side
    pub fn new(id: impl Into<String>, group: PortSide) -> Self {
        Self {
            id: id.into(),
            group,
            dx: 0.0,
            dy: 0.0,
        }
    }

    /// Create a port shifted along its side
    pub fn with_offset(id: impl Into<String>, group: PortSide, dx: f64, dy: f64) -> Self {
        Self {
            id: id.into(),
            group,
            dx,
            dy,
        }
    }

    /// One centered port per side, named after the side
    pub fn four_sides() -> Vec<Port> {
        [PortSide::Top, PortSide::Right, PortSide::Bottom, PortSide::Left]
            .into_iter()
            .map(|side| Port::new(side.to_string(), side))
            .collect()
    }
}

/// One end of an edge: a node and, optionally, one of its ports (the "magnet")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub cell: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl Endpoint {
    /// Endpoint attached to the node body
    pub fn node(cell: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            port: None,
        }
    }

    /// Endpoint attached to a specific port
    pub fn port(cell: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            cell: cell.into(),
            port: Some(port.into()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => write!(f, "{}:{}", self.cell, port),
            None => write!(f, "{}", self.cell),
        }
    }
}

impl FromStr for Endpoint {
    type Err = GraphError;

    /// Parse `node` or `node:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (cell, port) = match s.split_once(':') {
            Some((cell, port)) => (cell, Some(port)),
            None => (s, None),
        };
        if cell.is_empty() || port.is_some_and(str::is_empty) {
            return Err(GraphError::invalid_spec(format!("malformed endpoint '{}'", s)));
        }
        Ok(Self {
            cell: cell.to_string(),
            port: port.map(str::to_string),
        })
    }
}

/// A node on the canvas with all its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub shape: ShapeKind,
    #[serde(default)]
    pub position: Point,
    #[serde(default)]
    pub size: Size,
    /// Rotation in degrees
    #[serde(default, skip_serializing_if = "is_zero")]
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub collapsed: bool,
    /// Container flag; children point at this node through `parent`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub group: bool,
}

impl Node {
    /// Create a bare node of the given shape at the origin
    pub fn new(id: impl Into<String>, shape: ShapeKind) -> Self {
        Self {
            id: id.into(),
            shape,
            position: Point::default(),
            size: Size::default(),
            angle: 0.0,
            attrs: Attrs::new(),
            parent: None,
            ports: Vec::new(),
            collapsed: false,
            group: shape.is_container(),
        }
    }

    /// Look up a port by id
    pub fn port(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// Returns true if the node has a port with this id
    pub fn has_port(&self, id: &str) -> bool {
        self.port(id).is_some()
    }

    /// Display text stored at `attrs.text.text`
    pub fn text(&self) -> Option<&str> {
        text_of(&self.attrs)
    }

    pub fn geometry(&self) -> Geometry {
        Geometry {
            position: self.position,
            size: self.size,
            angle: self.angle,
        }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.position = geometry.position;
        self.size = geometry.size;
        self.angle = geometry.angle;
    }
}

/// An edge connecting two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: Endpoint,
    pub target: Endpoint,
    /// Routing algorithm name understood by the renderer (e.g. "manhattan")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Attrs,
}

impl Edge {
    /// Create an edge with no routing or style attributes
    pub fn new(id: impl Into<String>, source: Endpoint, target: Endpoint) -> Self {
        Self {
            id: id.into(),
            source,
            target,
            router: None,
            attrs: Attrs::new(),
        }
    }

    /// Returns true if either end is attached to the node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source.cell == node_id || self.target.cell == node_id
    }
}

/// Request to create a node programmatically
///
/// Fields left as `None` fall back to the shape catalog defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub shape: Option<ShapeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<Port>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<bool>,
}

impl NodeSpec {
    /// Start a spec for the given shape kind
    pub fn new(shape: ShapeKind) -> Self {
        Self {
            shape: Some(shape),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Point::new(x, y));
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Some(Size::new(width, height));
        self
    }

    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    /// Set the display text (`attrs.text.text`)
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        set_text(&mut self.attrs, text);
        self
    }

    /// Deep-merge extra attributes into the spec
    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        merge_attrs(&mut self.attrs, &attrs);
        self
    }

    pub fn with_ports(mut self, ports: Vec<Port>) -> Self {
        self.ports = Some(ports);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Overlay another spec: every field set in `overrides` wins, attrs deep-merge
    pub fn merged_with(&self, overrides: &NodeSpec) -> NodeSpec {
        let mut merged = self.clone();
        if overrides.id.is_some() {
            merged.id = overrides.id.clone();
        }
        if overrides.shape.is_some() {
            merged.shape = overrides.shape;
        }
        if overrides.position.is_some() {
            merged.position = overrides.position;
        }
        if overrides.size.is_some() {
            merged.size = overrides.size;
        }
        if overrides.angle.is_some() {
            merged.angle = overrides.angle;
        }
        if overrides.ports.is_some() {
            merged.ports = overrides.ports.clone();
        }
        if overrides.parent.is_some() {
            merged.parent = overrides.parent.clone();
        }
        if overrides.group.is_some() {
            merged.group = overrides.group;
        }
        merge_attrs(&mut merged.attrs, &overrides.attrs);
        merged
    }
}

/// Recursively merge `patch` into `target`
///
/// Objects merge key by key; any other value in `patch` replaces the target's.
pub fn merge_attrs(target: &mut Attrs, patch: &Attrs) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_attrs(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Read `attrs.text.text`
pub fn text_of(attrs: &Attrs) -> Option<&str> {
    attrs.get("text")?.get("text")?.as_str()
}

/// Write `attrs.text.text`, keeping any sibling text style keys
pub fn set_text(attrs: &mut Attrs, text: impl Into<String>) {
    let mut patch = Attrs::new();
    let mut inner = Attrs::new();
    inner.insert("text".to_string(), Value::String(text.into()));
    patch.insert("text".to_string(), Value::Object(inner));
    merge_attrs(attrs, &patch);
}
