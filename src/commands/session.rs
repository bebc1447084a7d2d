//! Session commands.

use serde_json::{json, Value};

use crate::session::{SessionState, User};

/// `null` (or a missing payload) logs out; an object logs a user in. The
/// object tolerates the backend's snake_case field names.
fn parse_user_payload(arg0: Option<Value>) -> Result<Option<User>, String> {
    let value = match arg0 {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    // Login pages sometimes hand over the whole response `{ user: {...} }`.
    let user_value = match value.get("user") {
        Some(inner) if !inner.is_null() => inner.clone(),
        Some(_) => return Ok(None),
        None => value,
    };
    serde_json::from_value::<User>(user_value)
        .map(Some)
        .map_err(|e| format!("Invalid user payload: {e}"))
}

#[tauri::command]
pub fn session_set_user(
    arg0: Option<Value>,
    session: tauri::State<'_, SessionState>,
) -> Result<Value, String> {
    let user = parse_user_payload(arg0)?;
    session.set_user(user.clone());
    Ok(json!({ "user": user }))
}

#[tauri::command]
pub fn session_get_user(session: tauri::State<'_, SessionState>) -> Result<Value, String> {
    Ok(json!({ "user": session.current_user() }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn user_payload_parses_a_plain_user_object() {
        let user = parse_user_payload(Some(json!({
            "id": 7,
            "name": "Ayu",
            "email": "ayu@cafferine.app"
        })))
        .expect("payload should parse")
        .expect("user should be present");
        assert_eq!(user.id, 7);
        assert_eq!(user.name, "Ayu");
    }

    #[test]
    fn user_payload_unwraps_a_login_response_envelope() {
        let user = parse_user_payload(Some(json!({
            "user": { "id": 7, "name": "Ayu", "email": "ayu@cafferine.app" }
        })))
        .expect("payload should parse")
        .expect("user should be present");
        assert_eq!(user.email, "ayu@cafferine.app");
    }

    #[test]
    fn null_payload_means_logout() {
        assert_eq!(parse_user_payload(None).expect("ok"), None);
        assert_eq!(parse_user_payload(Some(Value::Null)).expect("ok"), None);
        assert_eq!(
            parse_user_payload(Some(json!({ "user": null }))).expect("ok"),
            None
        );
    }

    #[test]
    fn malformed_user_objects_are_rejected() {
        let err = parse_user_payload(Some(json!({ "id": "not-a-number", "name": 3 })))
            .expect_err("bad payload should fail");
        assert!(err.contains("Invalid user payload"));
    }
}
