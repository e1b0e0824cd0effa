//! WebAssembly bindings for flow-core.
//!
//! This module provides JavaScript-callable functions when compiled to WASM.
//! Every structured value crosses the boundary as JSON.

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::{
    FieldValue, FlowAction, FlowConfig, FlowController, MemoryTelemetry, TransitionTicket,
    Viewport,
};

/// Initialize the flow WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

/// Flow instance for WASM.
#[wasm_bindgen]
pub struct WasmFlow {
    controller: FlowController,
    telemetry: Arc<MemoryTelemetry>,
}

#[wasm_bindgen]
impl WasmFlow {
    /// Create a flow from its JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration cannot be parsed.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, width: f32, height: f32) -> Result<WasmFlow, String> {
        let config = FlowConfig::from_json(config_json).map_err(|e| e.to_string())?;
        let telemetry = Arc::new(MemoryTelemetry::new());
        let mut controller =
            FlowController::new(config, Viewport::new(width, height), telemetry.clone());
        controller.mount();
        Ok(Self {
            controller,
            telemetry,
        })
    }

    /// Dispatch an action given as JSON, e.g. `{"type":"next"}`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the action cannot be parsed.
    #[wasm_bindgen(js_name = handleAction)]
    pub fn handle_action(&mut self, action_json: &str) -> Result<String, String> {
        let action: FlowAction = serde_json::from_str(action_json).map_err(|e| e.to_string())?;
        let outcome = self.controller.handle_action(&action);
        Ok(format!("{outcome:?}"))
    }

    /// Handle a tap on a button block.
    #[wasm_bindgen(js_name = tapButton)]
    pub fn tap_button(&mut self, block_id: &str) -> String {
        format!("{:?}", self.controller.handle_button_tap(block_id))
    }

    /// Record a field value given as JSON (string, array of strings or number).
    ///
    /// # Errors
    ///
    /// Returns an error string if the value cannot be parsed.
    #[wasm_bindgen(js_name = setField)]
    pub fn set_field(&mut self, field_name: &str, value_json: &str) -> Result<(), String> {
        let value: FieldValue = serde_json::from_str(value_json).map_err(|e| e.to_string())?;
        self.controller.on_data_change(field_name, value);
        Ok(())
    }

    /// Report that the host finished animating a transition.
    ///
    /// # Errors
    ///
    /// Returns an error string if the ticket cannot be parsed.
    #[wasm_bindgen(js_name = finishTransition)]
    pub fn finish_transition(&mut self, ticket_json: &str) -> Result<bool, String> {
        let ticket: TransitionTicket =
            serde_json::from_str(ticket_json).map_err(|e| e.to_string())?;
        Ok(self.controller.finish_transition(ticket))
    }

    /// Update the viewport after rotation or resizing.
    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.controller.set_viewport(Viewport::new(width, height));
    }

    /// Get the controller snapshot as JSON.
    #[wasm_bindgen(js_name = getSnapshotJson)]
    #[must_use]
    pub fn get_snapshot_json(&self) -> String {
        serde_json::to_string(&self.controller.snapshot()).unwrap_or_default()
    }

    /// Get the controller snapshot as a JavaScript object.
    ///
    /// # Errors
    ///
    /// Returns the JavaScript parse error if the snapshot is not valid JSON.
    #[wasm_bindgen(js_name = getSnapshot)]
    pub fn get_snapshot(&self) -> Result<JsValue, JsValue> {
        js_sys::JSON::parse(&self.get_snapshot_json())
    }

    /// Get the placements of the current screen as JSON (`null` for an empty flow).
    #[wasm_bindgen(js_name = getLayoutJson)]
    #[must_use]
    pub fn get_layout_json(&self) -> String {
        serde_json::to_string(&self.controller.current_layout()).unwrap_or_default()
    }

    /// Remove and return recorded telemetry events as JSON.
    #[wasm_bindgen(js_name = drainEventsJson)]
    #[must_use]
    pub fn drain_events_json(&self) -> String {
        serde_json::to_string(&self.telemetry.drain()).unwrap_or_default()
    }

    /// Whether the flow has completed.
    #[wasm_bindgen(js_name = isCompleted)]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.controller.is_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "version": "3",
        "screens": [
            {"id": "welcome", "type": "welcome", "content": {"useBlocks": true, "blocks": [
                {"id": "cta", "type": "button", "content": {"text": "Go"}}
            ]}},
            {"id": "done", "type": "celebration", "content": {"useBlocks": true, "blocks": []}}
        ]
    }"#;

    #[test]
    fn test_new_rejects_invalid_json() {
        assert!(WasmFlow::new("{ not valid json }", 393.0, 852.0).is_err());
    }

    #[test]
    fn test_button_tap_advances() {
        let mut flow = WasmFlow::new(CONFIG, 393.0, 852.0).expect("should parse");
        let outcome = flow.tap_button("cta");
        assert!(outcome.starts_with("Navigated"));

        let snapshot: serde_json::Value =
            serde_json::from_str(&flow.get_snapshot_json()).expect("valid json");
        assert_eq!(snapshot["screenId"], "done");
    }

    #[test]
    fn test_events_are_drained() {
        let flow = WasmFlow::new(CONFIG, 393.0, 852.0).expect("should parse");
        let events: Vec<serde_json::Value> =
            serde_json::from_str(&flow.drain_events_json()).expect("valid json");
        assert_eq!(events[0]["eventType"], "onboarding_started");
        assert_eq!(flow.drain_events_json(), "[]");
    }

    #[test]
    fn test_set_field_and_layout() {
        let mut flow = WasmFlow::new(CONFIG, 786.0, 1704.0).expect("should parse");
        flow.set_field("name", "\"Ada\"").expect("should parse");
        assert!(flow.set_field("name", "{").is_err());

        let layout: serde_json::Value =
            serde_json::from_str(&flow.get_layout_json()).expect("valid json");
        assert_eq!(layout["scaleFactor"], 2.0);
    }

    #[test]
    fn test_complete_action() {
        let mut flow = WasmFlow::new(CONFIG, 393.0, 852.0).expect("should parse");
        flow.handle_action(r#"{"type":"complete"}"#)
            .expect("should parse");
        assert!(flow.is_completed());
        assert!(flow.handle_action(r#"{"type":"jump"}"#).is_err());
    }
}
