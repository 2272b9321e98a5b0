//! Browser bindings: a [`Session`] on an HTML canvas.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::ViewerError;
use crate::gpu::RenderContext;
use crate::options::ViewerOptions;
use crate::session::Session;

fn js_error(e: &ViewerError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn find_canvas(id: &str) -> Result<web_sys::HtmlCanvasElement, JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document available"))?;
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id '{id}'")))?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| JsValue::from_str(&format!("element '{id}' is not a canvas")))
}

/// A molecule display bound to one canvas.
#[wasm_bindgen]
pub struct MolscopeDisplay {
    session: Session<RenderContext>,
}

#[wasm_bindgen]
impl MolscopeDisplay {
    /// Bind to the canvas with element id `surface_id`.
    ///
    /// # Errors
    ///
    /// Rejects when the canvas is missing or no GPU context can be created.
    pub async fn create(
        surface_id: String,
        width: u32,
        height: u32,
    ) -> Result<MolscopeDisplay, JsValue> {
        crate::init();
        let canvas = find_canvas(&surface_id)?;
        canvas.set_width(width);
        canvas.set_height(height);
        let context = RenderContext::from_canvas(canvas, width, height)
            .await
            .map_err(|e| js_error(&ViewerError::Context(e)))?;
        let session = Session::new(surface_id, context, ViewerOptions::default())
            .map_err(|e| js_error(&e))?;
        Ok(Self { session })
    }

    /// Load a molecule from file bytes and a format tag.
    pub fn add_molecule(&mut self, contents: &[u8], format: &str) -> Result<(), JsValue> {
        self.session
            .add_molecule(contents, format)
            .map_err(|e| js_error(&e))
    }

    /// Advance simulated time by `dt` seconds.
    pub fn update_time(&mut self, dt: f64) -> Result<(), JsValue> {
        self.session.update_time(dt).map_err(|e| js_error(&e))
    }

    /// Draw one frame. Call once per `requestAnimationFrame`.
    pub fn render(&mut self) -> Result<(), JsValue> {
        self.session.render().map_err(|e| js_error(&e))
    }

    /// Resize the drawable.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), JsValue> {
        self.session.resize(width, height).map_err(|e| js_error(&e))
    }

    /// Orbit by a pointer delta in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) -> Result<(), JsValue> {
        self.session.orbit(dx, dy).map_err(|e| js_error(&e))
    }

    /// Pan by a pointer delta in pixels.
    pub fn pan(&mut self, dx: f32, dy: f32) -> Result<(), JsValue> {
        self.session.pan(dx, dy).map_err(|e| js_error(&e))
    }

    /// Zoom by a wheel delta; positive moves closer.
    pub fn zoom(&mut self, delta: f32) -> Result<(), JsValue> {
        self.session.zoom(delta).map_err(|e| js_error(&e))
    }

    /// Roll by `delta` radians.
    pub fn roll(&mut self, delta: f32) -> Result<(), JsValue> {
        self.session.roll(delta).map_err(|e| js_error(&e))
    }

    /// Return to the fitted view.
    pub fn reset_camera(&mut self) -> Result<(), JsValue> {
        self.session.reset_camera().map_err(|e| js_error(&e))
    }

    /// Replace the options from a JSON document.
    pub fn set_options_json(&mut self, json: &str) -> Result<(), JsValue> {
        let options = ViewerOptions::from_json(json).map_err(|e| js_error(&e))?;
        self.session.set_options(options).map_err(|e| js_error(&e))
    }

    /// Current options as JSON.
    pub fn options_json(&self) -> Result<String, JsValue> {
        self.session.options().to_json().map_err(|e| js_error(&e))
    }

    /// JSON schema of the options, for building settings panels.
    pub fn options_schema() -> Result<String, JsValue> {
        serde_json::to_string(&ViewerOptions::json_schema())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Whether the last frame failed.
    pub fn is_degraded(&self) -> bool {
        self.session.is_degraded()
    }

    /// Release all GPU resources. Later calls throw.
    pub fn dispose(&mut self) {
        self.session.dispose();
    }
}

/// Module start hook.
#[wasm_bindgen(start)]
pub fn start() {
    crate::init();
}
