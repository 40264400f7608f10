//! Error normalization for API responses
//!
//! Every non-success response is reduced to a [`MeetspaceError::Api`] with a
//! human-readable message. The message is the payload's `detail` string when
//! present, else the first string found among the payload's values (looking
//! one level into arrays, which is how field validation errors are shaped),
//! else the transport-level message.

use serde_json::Value;

use crate::error::MeetspaceError;

/// Extracts the first human-readable message from a structured error payload.
///
/// # Examples
///
/// ```
/// use meetspace::api::normalize::first_message;
/// use serde_json::json;
///
/// assert_eq!(
///     first_message(&json!({"detail": "Not found."})).as_deref(),
///     Some("Not found.")
/// );
/// assert_eq!(
///     first_message(&json!({"email": ["This field is required."]})).as_deref(),
///     Some("This field is required.")
/// );
/// assert!(first_message(&json!("<html>")).is_none());
/// ```
pub fn first_message(payload: &Value) -> Option<String> {
    if let Some(Value::String(detail)) = payload.get("detail") {
        return Some(detail.clone());
    }

    let values: Box<dyn Iterator<Item = &Value>> = match payload {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return None,
    };

    values
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .find_map(|value| value.as_str().map(str::to_string))
}

/// Builds a normalized API error.
pub fn normalize(
    status: Option<u16>,
    payload: Option<Value>,
    fallback: impl Into<String>,
) -> MeetspaceError {
    let message = payload
        .as_ref()
        .and_then(first_message)
        .unwrap_or_else(|| fallback.into());
    MeetspaceError::Api {
        message,
        status,
        payload,
    }
}

/// Fallback message for a failed HTTP status.
pub fn status_message(status: u16) -> String {
    format!("Request failed with status code {}", status)
}

/// Reads an unsuccessful response and normalizes it.
///
/// Bodies that are not JSON are kept verbatim as a string payload but never
/// used as the message.
pub(crate) async fn from_response(response: reqwest::Response) -> MeetspaceError {
    let status = response.status().as_u16();
    let payload = read_payload(response).await;
    normalize(Some(status), payload, status_message(status))
}

/// Reads a response body as JSON, falling back to a raw string payload.
pub(crate) async fn read_payload(response: reqwest::Response) -> Option<Value> {
    let text = response.text().await.ok()?;
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Normalizes a transport failure (connect error, timeout, ...).
pub(crate) fn from_transport(err: reqwest::Error) -> MeetspaceError {
    let message = if err.is_timeout() {
        format!("Request timed out: {}", err)
    } else {
        err.to_string()
    };
    MeetspaceError::Api {
        message,
        status: err.status().map(|s| s.as_u16()),
        payload: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detail_wins() {
        let payload = json!({"email": ["taken"], "detail": "Authentication credentials were not provided."});
        assert_eq!(
            first_message(&payload).as_deref(),
            Some("Authentication credentials were not provided.")
        );
    }

    #[test]
    fn test_non_string_detail_is_skipped() {
        let payload = json!({"detail": {"code": 1}, "end_at": "end_at must be after start_at"});
        assert_eq!(
            first_message(&payload).as_deref(),
            Some("end_at must be after start_at")
        );
    }

    #[test]
    fn test_first_string_inside_field_list() {
        let payload = json!({"non_field_errors": ["Invalid email or password."]});
        assert_eq!(
            first_message(&payload).as_deref(),
            Some("Invalid email or password.")
        );
    }

    #[test]
    fn test_top_level_list() {
        let payload = json!(["Room is already booked."]);
        assert_eq!(
            first_message(&payload).as_deref(),
            Some("Room is already booked.")
        );
    }

    #[test]
    fn test_no_string_found() {
        assert!(first_message(&json!({"count": 3, "ok": false})).is_none());
        assert!(first_message(&json!(null)).is_none());
    }

    #[test]
    fn test_normalize_falls_back_to_transport_message() {
        let err = normalize(Some(502), Some(json!("<html>bad gateway</html>")), status_message(502));
        match err {
            MeetspaceError::Api {
                message,
                status,
                payload,
            } => {
                assert_eq!(message, "Request failed with status code 502");
                assert_eq!(status, Some(502));
                assert_eq!(payload, Some(json!("<html>bad gateway</html>")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_normalize_uses_payload_message() {
        let err = normalize(Some(409), Some(json!({"detail": "Slot taken"})), "fallback");
        assert_eq!(err.to_string(), "API error (409): Slot taken");
    }
}
