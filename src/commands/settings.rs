//! Settings commands. Everything here mutates in-memory configuration only.

use serde_json::{json, Value};

use crate::commands::{payload_arg0_as_bool, payload_arg0_as_string};
use crate::config::ConfigState;

fn parse_backend_url(arg0: Option<Value>) -> Result<String, String> {
    payload_arg0_as_string(arg0, &["url", "backendUrl", "backend_url", "value"])
        .ok_or("Missing backend URL".to_string())
}

fn parse_demo_mode(arg0: Option<Value>) -> Result<bool, String> {
    payload_arg0_as_bool(arg0, &["enabled", "demoMode", "demo_mode", "value"])
        .ok_or("Missing demo mode flag".to_string())
}

#[tauri::command]
pub fn settings_get(config: tauri::State<'_, ConfigState>) -> Result<Value, String> {
    serde_json::to_value(config.snapshot()).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn settings_set_backend_url(
    arg0: Option<Value>,
    config: tauri::State<'_, ConfigState>,
) -> Result<Value, String> {
    let url = parse_backend_url(arg0)?;
    let stored = config.set_backend_url(&url)?;
    Ok(json!({ "backendUrl": stored }))
}

#[tauri::command]
pub fn settings_set_demo_mode(
    arg0: Option<Value>,
    config: tauri::State<'_, ConfigState>,
) -> Result<Value, String> {
    let enabled = parse_demo_mode(arg0)?;
    config.set_demo_mode(enabled);
    Ok(json!({ "demoMode": enabled }))
}
