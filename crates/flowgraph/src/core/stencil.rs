//! Stencil template registry
//!
//! Templates are named node prototypes shown in the palette. Once registered
//! a template never changes; instantiating one produces a fresh [`NodeSpec`]
//! with the caller's overrides merged on top.

use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

use super::error::{GraphError, GraphResult};
use super::types::{Attrs, NodeSpec, Port, PortSide, ShapeKind};

/// A named prototype for new nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StencilTemplate {
    pub name: String,
    /// Human readable palette label
    pub title: String,
    pub spec: NodeSpec,
}

/// A palette section listing templates in display order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StencilGroup {
    pub name: String,
    pub title: String,
    pub templates: Vec<String>,
}

/// Registry of stencil templates and palette groups
#[derive(Debug, Clone, Default)]
pub struct StencilRegistry {
    templates: HashMap<String, StencilTemplate>,
    /// Template names in registration order
    order: Vec<String>,
    groups: Vec<StencilGroup>,
}

impl StencilRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under a unique name
    pub fn register(&mut self, name: impl Into<String>, spec: NodeSpec) -> GraphResult<()> {
        let name = name.into();
        let title = name.clone();
        self.insert(StencilTemplate { name, title, spec })
    }

    /// Register a template with a palette title
    pub fn register_titled(
        &mut self,
        name: impl Into<String>,
        title: impl Into<String>,
        spec: NodeSpec,
    ) -> GraphResult<()> {
        self.insert(StencilTemplate {
            name: name.into(),
            title: title.into(),
            spec,
        })
    }

    fn insert(&mut self, mut template: StencilTemplate) -> GraphResult<()> {
        if template.name.trim().is_empty() {
            return Err(GraphError::invalid_spec("template name must not be empty"));
        }
        if self.templates.contains_key(&template.name) {
            return Err(GraphError::invalid_spec(format!(
                "template '{}' is already registered",
                template.name
            )));
        }
        if template.spec.shape.is_none() {
            return Err(GraphError::invalid_spec(format!(
                "template '{}' has no shape",
                template.name
            )));
        }
        // Instances always get their own ids.
        template.spec.id = None;
        trace!(template = %template.name, "Registering template");
        self.order.push(template.name.clone());
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    /// Add a palette group; template names may be appended with `load`
    pub fn add_group(&mut self, name: impl Into<String>, title: impl Into<String>) {
        let name = name.into();
        if self.groups.iter().any(|g| g.name == name) {
            return;
        }
        self.groups.push(StencilGroup {
            name,
            title: title.into(),
            templates: Vec::new(),
        });
    }

    /// Place registered templates into a palette group
    pub fn load(&mut self, group: &str, names: &[&str]) -> GraphResult<()> {
        if let Some(missing) = names.iter().find(|n| !self.templates.contains_key(**n)) {
            return Err(GraphError::unknown_template(*missing));
        }
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .ok_or_else(|| GraphError::invalid_spec(format!("unknown stencil group '{}'", group)))?;
        for name in names {
            if !group.templates.iter().any(|t| t == name) {
                group.templates.push(name.to_string());
            }
        }
        Ok(())
    }

    /// Produce a node spec from a template with overrides applied
    pub fn instantiate(&self, name: &str, overrides: &NodeSpec) -> GraphResult<NodeSpec> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| GraphError::unknown_template(name))?;
        debug!(template = %name, "Instantiating template");
        Ok(template.spec.merged_with(overrides))
    }

    pub fn get(&self, name: &str) -> Option<&StencilTemplate> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Templates in registration order
    pub fn templates(&self) -> impl Iterator<Item = &StencilTemplate> {
        self.order.iter().filter_map(|name| self.templates.get(name))
    }

    pub fn groups(&self) -> &[StencilGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Case-insensitive substring search over names and titles
    pub fn search(&self, query: &str) -> Vec<&StencilTemplate> {
        let query = query.to_lowercase();
        self.templates()
            .filter(|t| {
                t.name.to_lowercase().contains(&query) || t.title.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Registry holding the default flow-chart palette
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (name, title, spec) in default_templates() {
            if let Err(err) = registry.register_titled(name, title, spec) {
                warn!(template = name, error = %err, "Default template not registered");
            }
        }
        for (group, title, names) in DEFAULT_GROUPS {
            registry.add_group(*group, *title);
            if let Err(err) = registry.load(group, names) {
                warn!(group = *group, error = %err, "Default palette group incomplete");
            }
        }
        registry
    }
}

/// Palette groups of the default registry: name, title, templates
const DEFAULT_GROUPS: &[(&str, &str, &[&str])] = &[
    ("basic", "Basic nodes", &["start", "process", "decision", "link"]),
    (
        "combination",
        "Combination nodes",
        &["image-card", "title-card", "animated-text"],
    ),
    ("group", "Node groups", &["group"]),
];

fn attrs(value: serde_json::Value) -> Attrs {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Attrs::new(),
    }
}

fn default_templates() -> Vec<(&'static str, &'static str, NodeSpec)> {
    vec![
        (
            "start",
            "Start node",
            NodeSpec::new(ShapeKind::Rect)
                .with_attrs(attrs(json!({"body": {"rx": 24, "ry": 24}})))
                .with_text("Start"),
        ),
        (
            "process",
            "Process node",
            NodeSpec::new(ShapeKind::Rect).with_text("Process"),
        ),
        (
            "decision",
            "Decision node",
            NodeSpec::new(ShapeKind::Rect)
                .with_size(52.0, 52.0)
                .with_angle(45.0)
                .with_attrs(attrs(json!({
                    "edit-text": {"style": {"transform": "rotate(-45deg)"}},
                    "text": {"transform": "rotate(-45deg)"}
                })))
                .with_text("Decision")
                .with_ports(vec![
                    Port::with_offset("top", PortSide::Top, -26.0, 0.0),
                    Port::with_offset("right", PortSide::Right, 0.0, -26.0),
                    Port::with_offset("bottom", PortSide::Bottom, 26.0, 0.0),
                    Port::with_offset("left", PortSide::Left, 0.0, 26.0),
                ]),
        ),
        (
            "link",
            "Link node",
            NodeSpec::new(ShapeKind::Rect)
                .with_size(70.0, 70.0)
                .with_attrs(attrs(json!({"body": {"rx": 35, "ry": 35}})))
                .with_text("Link"),
        ),
        (
            "image-card",
            "Image card",
            NodeSpec::new(ShapeKind::ImageRect),
        ),
        (
            "title-card",
            "Title card",
            NodeSpec::new(ShapeKind::TitleRect),
        ),
        (
            "animated-text",
            "Animated text",
            NodeSpec::new(ShapeKind::AnimateText),
        ),
        (
            "group",
            "Group",
            NodeSpec::new(ShapeKind::Group).with_text("Group Name"),
        ),
    ]
}
