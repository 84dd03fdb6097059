//! Shape catalog
//!
//! Maps each [`ShapeKind`] to the defaults a freshly created node starts with.
//! Drawing stays with the renderer; the catalog only knows data.

use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use super::error::{GraphError, GraphResult};
use super::types::{merge_attrs, Attrs, Node, NodeSpec, Port, ShapeKind, Size};

/// Accent color shared by the default node and edge styles
pub const ACCENT_COLOR: &str = "#5F95FF";

/// Defaults applied when a node of some kind is created
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDefaults {
    pub size: Size,
    pub attrs: Attrs,
    pub ports: Vec<Port>,
}

impl ShapeDefaults {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Size::new(width, height),
            attrs: Attrs::new(),
            ports: Vec::new(),
        }
    }

    pub fn with_attrs(mut self, attrs: Value) -> Self {
        if let Value::Object(map) = attrs {
            merge_attrs(&mut self.attrs, &map);
        }
        self
    }

    pub fn with_ports(mut self, ports: Vec<Port>) -> Self {
        self.ports = ports;
        self
    }
}

/// Registry of shape kinds the session may create
#[derive(Debug, Clone, Default)]
pub struct ShapeCatalog {
    shapes: BTreeMap<ShapeKind, ShapeDefaults>,
}

impl ShapeCatalog {
    /// Create an empty catalog; no kind can be created until registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in flow-chart shapes
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        let body = json!({
            "body": {"stroke": ACCENT_COLOR, "strokeWidth": 1, "fill": "rgba(95,149,255,0.05)"},
            "text": {"fontSize": 12, "fill": "#262626"}
        });

        catalog.register(
            ShapeKind::Rect,
            ShapeDefaults::new(80.0, 42.0)
                .with_attrs(body.clone())
                .with_ports(Port::four_sides()),
        );
        catalog.register(
            ShapeKind::ImageRect,
            ShapeDefaults::new(200.0, 60.0)
                .with_attrs(body.clone())
                .with_attrs(json!({
                    "image": {"width": 16, "height": 16, "x": 12, "y": 12},
                    "title": {"text": "Node", "fontSize": 12},
                    "text": {"text": "this is content text"}
                }))
                .with_ports(Port::four_sides()),
        );
        catalog.register(
            ShapeKind::TitleRect,
            ShapeDefaults::new(160.0, 60.0)
                .with_attrs(body)
                .with_attrs(json!({
                    "head": {"height": 20, "fill": ACCENT_COLOR},
                    "title": {"text": "Title", "fill": "#ffffff", "fontSize": 12},
                    "text": {"text": "Content"}
                }))
                .with_ports(Port::four_sides()),
        );
        catalog.register(
            ShapeKind::AnimateText,
            ShapeDefaults::new(60.0, 30.0)
                .with_attrs(json!({
                    "text": {"text": "Animation", "fontSize": 14, "stroke": ACCENT_COLOR,
                             "strokeDasharray": 100, "class": "animate-text"}
                }))
                .with_ports(Port::four_sides()),
        );
        catalog.register(
            ShapeKind::Group,
            ShapeDefaults::new(200.0, 160.0).with_attrs(json!({
                "body": {"fill": "#fffbe6", "stroke": "#ffe7ba"},
                "text": {"text": "Group Name", "fontSize": 12}
            })),
        );
        catalog
    }

    /// Register or replace the defaults for a kind
    pub fn register(&mut self, kind: ShapeKind, defaults: ShapeDefaults) {
        self.shapes.insert(kind, defaults);
    }

    pub fn get(&self, kind: ShapeKind) -> Option<&ShapeDefaults> {
        self.shapes.get(&kind)
    }

    pub fn contains(&self, kind: ShapeKind) -> bool {
        self.shapes.contains_key(&kind)
    }

    /// Registered kinds, in palette order
    pub fn kinds(&self) -> impl Iterator<Item = ShapeKind> + '_ {
        self.shapes.keys().copied()
    }

    /// Build a node from a spec, filling gaps from the kind's defaults
    pub fn build_node(&self, id: String, spec: &NodeSpec) -> GraphResult<Node> {
        let kind = spec
            .shape
            .ok_or_else(|| GraphError::invalid_spec(format!("node '{}' has no shape", id)))?;
        let defaults = self.get(kind).ok_or_else(|| {
            warn!(shape = %kind, "Shape kind is not registered");
            GraphError::invalid_spec(format!("shape kind '{}' is not registered", kind))
        })?;

        let mut attrs = defaults.attrs.clone();
        merge_attrs(&mut attrs, &spec.attrs);

        let node = Node {
            id,
            shape: kind,
            position: spec.position.unwrap_or_default(),
            size: spec.size.unwrap_or(defaults.size),
            angle: spec.angle.unwrap_or(0.0),
            attrs,
            parent: spec.parent.clone(),
            ports: spec.ports.clone().unwrap_or_else(|| defaults.ports.clone()),
            collapsed: false,
            group: spec.group.unwrap_or(kind.is_container()),
        };

        node.geometry().validate()?;
        let mut seen = HashSet::new();
        if let Some(port) = node.ports.iter().find(|p| !seen.insert(p.id.as_str())) {
            return Err(GraphError::invalid_spec(format!(
                "node '{}' has duplicate port '{}'",
                node.id, port.id
            )));
        }
        Ok(node)
    }
}

/// Routing and style for edges drawn by the connect gesture
pub fn default_edge_style() -> (Option<String>, Attrs) {
    let attrs = match json!({
        "line": {
            "stroke": ACCENT_COLOR,
            "strokeWidth": 1,
            "targetMarker": {"name": "classic", "size": 8}
        }
    }) {
        Value::Object(map) => map,
        _ => Attrs::new(),
    };
    (Some("manhattan".to_string()), attrs)
}
