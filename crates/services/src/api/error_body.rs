//! Human-readable messages from backend error bodies.

use serde_json::Value;

use crate::error::GENERIC_ERROR_MESSAGE;

/// Pull the most specific message out of an error response body.
///
/// Accepted shapes, in priority order: `{message}`, `{error}`,
/// `{errors: [..]}` (joined with ", "), `{errors: {field: msg | [msg, ..]}}`
/// (first field in response order wins) and a bare JSON string.
#[must_use]
pub fn error_message(body: &Value) -> String {
    extract(body)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_owned())
}

fn extract(body: &Value) -> Option<String> {
    match body {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => {
            if let Some(message) = map.get("message").and_then(text) {
                return Some(message);
            }
            if let Some(error) = map.get("error").and_then(text) {
                return Some(error);
            }
            match map.get("errors")? {
                Value::Array(items) => {
                    let parts: Vec<String> = items.iter().filter_map(text).collect();
                    (!parts.is_empty()).then(|| parts.join(", "))
                }
                Value::Object(fields) => fields.values().next().and_then(|first| match first {
                    Value::Array(items) => items.first().and_then(text),
                    other => text(other),
                }),
                other => text(other),
            }
        }
        _ => None,
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        Value::Object(map) => map.get("message").and_then(text),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn message_and_error_fields() {
        assert_eq!(error_message(&json!({"message": "User already exists"})), "User already exists");
        assert_eq!(error_message(&json!({"error": "Token expired"})), "Token expired");
        assert_eq!(
            error_message(&json!({"message": "first", "error": "second"})),
            "first"
        );
    }

    #[test]
    fn errors_array_is_joined() {
        let body = json!({"errors": ["Email wajib diisi", "Password wajib diisi"]});
        assert_eq!(error_message(&body), "Email wajib diisi, Password wajib diisi");
    }

    #[test]
    fn errors_object_takes_first_field() {
        let body = json!({"errors": {"username": ["Username is taken", "too short"]}});
        assert_eq!(error_message(&body), "Username is taken");

        let body = json!({"errors": {"email": "Invalid email"}});
        assert_eq!(error_message(&body), "Invalid email");
    }

    #[test]
    fn errors_object_keeps_response_order() {
        let body: Value = serde_json::from_str(
            r#"{"errors":{"username":"Username is taken","email":"Invalid email"}}"#,
        )
        .unwrap();
        assert_eq!(error_message(&body), "Username is taken");
    }

    #[test]
    fn bare_string_and_fallback() {
        assert_eq!(error_message(&json!("Service unavailable")), "Service unavailable");
        assert_eq!(error_message(&json!({})), "Something went wrong");
        assert_eq!(error_message(&Value::Null), "Something went wrong");
        assert_eq!(error_message(&json!({"message": ""})), "Something went wrong");
    }
}
