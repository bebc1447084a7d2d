//! IPC command surface.
//!
//! Thin `#[tauri::command]` wrappers, one file per domain. Payloads arrive as
//! a single loosely-typed `arg0` document; each file parses its own payloads
//! with small helpers so the frontend can send camelCase or snake_case keys.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod runtime;
pub mod session;
pub mod settings;

use serde_json::Value;

/// Pull a string out of `arg0`: either a bare string or the first of `keys`
/// present on an object. Numbers are accepted and stringified.
pub(crate) fn payload_arg0_as_string(arg0: Option<Value>, keys: &[&str]) -> Option<String> {
    fn non_empty(s: &str) -> Option<String> {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    }
    match arg0 {
        Some(Value::String(s)) => non_empty(&s),
        Some(Value::Object(obj)) => keys.iter().find_map(|k| match obj.get(*k) {
            Some(Value::String(s)) => non_empty(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }),
        _ => None,
    }
}

/// Pull an integer out of `arg0`: a bare number/numeric string or the first
/// of `keys` present on an object.
pub(crate) fn payload_arg0_as_i64(arg0: Option<Value>, keys: &[&str]) -> Option<i64> {
    fn as_i64(v: &Value) -> Option<i64> {
        match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
    match &arg0 {
        Some(Value::Object(obj)) => keys.iter().find_map(|k| obj.get(*k).and_then(as_i64)),
        Some(other) => as_i64(other),
        None => None,
    }
}

/// Pull a boolean out of `arg0`: a bare bool/flag string or the first of
/// `keys` present on an object.
pub(crate) fn payload_arg0_as_bool(arg0: Option<Value>, keys: &[&str]) -> Option<bool> {
    fn as_bool(v: &Value) -> Option<bool> {
        match v {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
    match &arg0 {
        Some(Value::Object(obj)) => keys.iter().find_map(|k| obj.get(*k).and_then(as_bool)),
        Some(other) => as_bool(other),
        None => None,
    }
}
