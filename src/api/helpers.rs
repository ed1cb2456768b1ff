//! Response builders for the function envelope.

use serde_json::{Value, json};

use crate::core::models::{ApiResponse, ErrorResponse, ResponseBody};

/// Wraps a pipeline response in the `{statusCode, headers, body}` envelope.
#[must_use]
pub fn to_lambda_response(response: &ApiResponse, request_id: &str) -> Value {
    let body = serde_json::to_string(&response.body).unwrap_or_else(|e| {
        json!({ "error": "serialization_error", "details": e.to_string() }).to_string()
    });

    let mut headers = json!({
        "Content-Type": "application/json",
        "X-Request-Id": request_id,
    });
    if let Some(secs) = response.retry_after_secs {
        headers["Retry-After"] = Value::String(secs.to_string());
    }

    json!({
        "statusCode": response.status_code,
        "headers": headers,
        "body": body,
    })
}

/// Returns an error response with the given status code, code and detail.
#[must_use]
pub fn err_response(status_code: u16, error: &str, details: &str, request_id: &str) -> Value {
    to_lambda_response(
        &ApiResponse {
            status_code,
            retry_after_secs: None,
            body: ResponseBody::Error(ErrorResponse {
                error: error.to_string(),
                details: details.to_string(),
            }),
        },
        request_id,
    )
}
