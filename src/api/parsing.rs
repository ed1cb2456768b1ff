use base64::{Engine as _, engine::general_purpose};
use serde_json::Value;

use crate::core::models::AnalyzeRequest;
use crate::errors::AnalyzeError;

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

pub fn get_header_value<'a>(headers: &'a Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(|s| s.as_str()) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}

/// HTTP method from either the v1 (`httpMethod`) or v2 (`requestContext.http.method`) event shape.
#[must_use]
pub fn http_method(payload: &Value) -> &str {
    v_str(payload, &["httpMethod"])
        .or_else(|| v_str(payload, &["requestContext", "http", "method"]))
        .unwrap_or("")
}

/// Raw body bytes, base64-decoded when the event says so or `always_base64` is set.
///
/// # Errors
///
/// Returns `MalformedRequest` when the body is flagged as base64 but does not decode.
pub fn decode_body(payload: &Value, always_base64: bool) -> Result<Vec<u8>, AnalyzeError> {
    let Some(body) = v_str(payload, &["body"]) else {
        return Ok(Vec::new());
    };

    let is_base64 = always_base64
        || payload
            .get("isBase64Encoded")
            .and_then(Value::as_bool)
            .unwrap_or(false);

    if !is_base64 {
        return Ok(body.as_bytes().to_vec());
    }

    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| AnalyzeError::MalformedRequest(format!("body is not valid base64: {e}")))
}

/// Turns a function event into a pipeline request.
///
/// The body is only decoded for `POST`; other methods are rejected by the
/// pipeline before the body matters.
///
/// # Errors
///
/// Returns `MalformedRequest` when a `POST` body cannot be decoded.
pub fn parse_event(
    payload: &Value,
    request_id: String,
    always_base64: bool,
) -> Result<AnalyzeRequest, AnalyzeError> {
    let method = http_method(payload).to_string();
    let content_type = payload
        .get("headers")
        .and_then(|headers| get_header_value(headers, "Content-Type"))
        .map(ToString::to_string);

    let body = if method.eq_ignore_ascii_case("POST") {
        decode_body(payload, always_base64)?
    } else {
        Vec::new()
    };

    Ok(AnalyzeRequest {
        request_id,
        method,
        content_type,
        body,
    })
}
