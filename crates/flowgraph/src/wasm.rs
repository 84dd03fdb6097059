//! WebAssembly bindings for Flowgraph
//!
//! Exposes an [`EditorSession`] to JavaScript. Structured values cross the
//! boundary as JSON strings; errors are thrown as JavaScript exceptions.

use wasm_bindgen::prelude::*;

use crate::core::{EditorConfig, EditorSession, Endpoint, NodeSpec, Point, SelectMode, Size};

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_endpoint(text: &str) -> Result<Endpoint, JsValue> {
    text.parse().map_err(js_error)
}

fn parse_ids(json: &str) -> Result<Vec<String>, JsValue> {
    serde_json::from_str(json).map_err(js_error)
}

/// Set up the panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use crate::core::logging::init_logging;
    let _ = init_logging(Some("info"), None);
}

/// Editor session handle for JavaScript hosts
#[wasm_bindgen]
pub struct WasmEditor {
    session: EditorSession,
}

#[wasm_bindgen]
impl WasmEditor {
    /// Create a session; `config` is optional JSON for [`EditorConfig`]
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<WasmEditor, JsValue> {
        let config = match config {
            Some(text) => EditorConfig::from_json_str(&text).map_err(js_error)?,
            None => EditorConfig::default(),
        };
        Ok(WasmEditor {
            session: EditorSession::with_config(config),
        })
    }

    /// Load a document, replacing the current one
    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.session.from_json_str(json).map_err(js_error)
    }

    #[wasm_bindgen(js_name = toJson)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        self.session.to_json_string().map_err(js_error)
    }

    /// Create a node from a JSON node spec; returns the node as JSON
    #[wasm_bindgen(js_name = createNode)]
    pub fn create_node(&mut self, spec: &str) -> Result<String, JsValue> {
        let spec: NodeSpec = serde_json::from_str(spec).map_err(js_error)?;
        let node = self.session.create_node(spec).map_err(js_error)?;
        serde_json::to_string(&node).map_err(js_error)
    }

    /// Instantiate a palette template; `overrides` is a JSON node spec
    #[wasm_bindgen(js_name = createFromTemplate)]
    pub fn create_from_template(&mut self, name: &str, overrides: &str) -> Result<String, JsValue> {
        let overrides: NodeSpec = serde_json::from_str(overrides).map_err(js_error)?;
        let node = self
            .session
            .create_node_from_template(name, &overrides)
            .map_err(js_error)?;
        serde_json::to_string(&node).map_err(js_error)
    }

    /// Connect two endpoints written as `node` or `node:port`
    #[wasm_bindgen(js_name = createEdge)]
    pub fn create_edge(&mut self, source: &str, target: &str) -> Result<String, JsValue> {
        let edge = self
            .session
            .create_edge(parse_endpoint(source)?, parse_endpoint(target)?)
            .map_err(js_error)?;
        serde_json::to_string(&edge).map_err(js_error)
    }

    #[wasm_bindgen(js_name = validateConnection)]
    pub fn validate_connection(&self, source: &str, target: &str) -> bool {
        match (source.parse::<Endpoint>(), target.parse::<Endpoint>()) {
            (Ok(source), Ok(target)) => self.session.validate_connection(&source, &target),
            _ => false,
        }
    }

    /// Remove cells given as a JSON array of ids; returns removed ids as JSON
    #[wasm_bindgen(js_name = removeCells)]
    pub fn remove_cells(&mut self, ids: &str, cascade: bool) -> Result<String, JsValue> {
        let ids = parse_ids(ids)?;
        let removed = self.session.remove_cells(&ids, cascade).map_err(js_error)?;
        serde_json::to_string(&removed).map_err(js_error)
    }

    #[wasm_bindgen(js_name = moveCells)]
    pub fn move_cells(&mut self, ids: &str, dx: f64, dy: f64) -> Result<(), JsValue> {
        let ids = parse_ids(ids)?;
        self.session.move_cells(&ids, dx, dy).map_err(js_error)
    }

    #[wasm_bindgen(js_name = setPosition)]
    pub fn set_position(&mut self, id: &str, x: f64, y: f64) -> Result<(), JsValue> {
        self.session.set_position(id, Point::new(x, y)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = resizeNode)]
    pub fn resize_node(&mut self, id: &str, width: f64, height: f64) -> Result<(), JsValue> {
        self.session.resize_node(id, Size::new(width, height)).map_err(js_error)
    }

    #[wasm_bindgen(js_name = setText)]
    pub fn set_text(&mut self, id: &str, text: &str) -> Result<(), JsValue> {
        self.session.set_text(id, text).map_err(js_error)
    }

    #[wasm_bindgen(js_name = setParent)]
    pub fn set_parent(&mut self, child: &str, parent: Option<String>) -> Result<(), JsValue> {
        self.session.set_parent(child, parent.as_deref()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = toggleCollapse)]
    pub fn toggle_collapse(&mut self, group: &str) -> Result<bool, JsValue> {
        self.session.toggle_collapse(group).map_err(js_error)
    }

    #[wasm_bindgen(js_name = isVisible)]
    pub fn is_visible(&self, id: &str) -> bool {
        self.session.is_visible(id)
    }

    /// Select ids from a JSON array; mode is exclusive, additive or toggle
    pub fn select(&mut self, ids: &str, mode: &str) -> Result<(), JsValue> {
        let ids = parse_ids(ids)?;
        let mode: SelectMode = mode.parse().map_err(js_error)?;
        self.session.select(&ids, mode);
        Ok(())
    }

    pub fn selected(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.selected()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = deleteSelected)]
    pub fn delete_selected(&mut self, cascade: bool) -> Result<String, JsValue> {
        let removed = self.session.delete_selected(cascade).map_err(js_error)?;
        serde_json::to_string(&removed).map_err(js_error)
    }

    pub fn copy(&mut self) -> usize {
        self.session.copy_selection()
    }

    pub fn paste(&mut self) -> Result<String, JsValue> {
        let pasted = self.session.paste().map_err(js_error)?;
        serde_json::to_string(&pasted).map_err(js_error)
    }

    pub fn undo(&mut self) -> Result<bool, JsValue> {
        self.session.undo().map_err(js_error)
    }

    pub fn redo(&mut self) -> Result<bool, JsValue> {
        self.session.redo().map_err(js_error)
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    #[wasm_bindgen(js_name = beginGesture)]
    pub fn begin_gesture(&mut self) {
        self.session.begin_gesture();
    }

    #[wasm_bindgen(js_name = commitGesture)]
    pub fn commit_gesture(&mut self) -> bool {
        self.session.commit_gesture()
    }

    #[wasm_bindgen(js_name = cancelGesture)]
    pub fn cancel_gesture(&mut self) -> Result<(), JsValue> {
        self.session.cancel_gesture().map_err(js_error)
    }

    /// Palette groups and templates as JSON
    pub fn stencils(&self) -> Result<String, JsValue> {
        let templates: Vec<_> = self.session.stencils().templates().collect();
        serde_json::to_string(&serde_json::json!({
            "groups": self.session.stencils().groups(),
            "templates": templates,
        }))
        .map_err(js_error)
    }

    /// Drain pending change events as a JSON array
    #[wasm_bindgen(js_name = takeChanges)]
    pub fn take_changes(&mut self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.take_changes()).map_err(js_error)
    }
}
