//! Backend response envelope.
//!
//! The backend wraps bodies as `{data?, message?, detail?, correlationId?}`.
//! Success unwraps `data` when present, otherwise the raw body. Failure
//! (non-2xx) becomes an [`ApiError`].

use folio_core::ApiError;
use serde_json::Value;

/// Interpreted response.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success {
        payload: Value,
        correlation_id: String,
    },
    Failure(ApiError),
}

/// Parse a response body. Anything that is not JSON is an empty body.
pub fn parse_body(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    serde_json::from_slice(bytes).ok()
}

/// Classify a response. `fallback_correlation_id` is the response header
/// value, or the request's own ID when the server echoed none.
pub fn interpret(status: u16, body: Option<Value>, fallback_correlation_id: &str) -> Envelope {
    let correlation_id = body
        .as_ref()
        .and_then(|b| b.get("correlationId"))
        .and_then(Value::as_str)
        .unwrap_or(fallback_correlation_id)
        .to_string();

    if !(200..300).contains(&status) {
        let message = body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status));

        let mut err = ApiError::new(status, message).with_correlation_id(correlation_id);
        if let Some(detail) = body.as_ref().and_then(|b| b.get("detail")) {
            if !detail.is_null() {
                err = err.with_detail(detail.clone());
            }
        }
        return Envelope::Failure(err);
    }

    let payload = match body {
        Some(Value::Object(mut map)) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        Some(other) => other,
        None => Value::Null,
    };

    Envelope::Success {
        payload,
        correlation_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_unwraps_data() {
        let body = json!({"data": {"collections": []}, "correlationId": "srv-1"});
        match interpret(200, Some(body), "local") {
            Envelope::Success {
                payload,
                correlation_id,
            } => {
                assert_eq!(payload, json!({"collections": []}));
                assert_eq!(correlation_id, "srv-1");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_success_without_data_returns_raw_body() {
        let body = json!({"items": [], "total": 0});
        match interpret(200, Some(body.clone()), "local") {
            Envelope::Success {
                payload,
                correlation_id,
            } => {
                assert_eq!(payload, body);
                assert_eq!(correlation_id, "local");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_carries_message_and_detail() {
        let body = json!({"message": "Collection name taken", "detail": {"field": "name"}});
        match interpret(409, Some(body), "rid-9") {
            Envelope::Failure(err) => {
                assert_eq!(err.status, 409);
                assert_eq!(err.message, "Collection name taken");
                assert_eq!(err.correlation_id.as_deref(), Some("rid-9"));
                assert_eq!(err.detail, Some(json!({"field": "name"})));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_without_body_uses_status_message() {
        match interpret(502, parse_body(b"<html>bad gateway</html>"), "rid") {
            Envelope::Failure(err) => {
                assert_eq!(err.message, "HTTP 502");
                assert_eq!(err.detail, None);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_success_body_is_null_payload() {
        match interpret(204, parse_body(b""), "rid") {
            Envelope::Success { payload, .. } => assert!(payload.is_null()),
            other => panic!("expected success, got {:?}", other),
        }
    }
}
