//! Function handler - adapts the inbound HTTP event to the analysis pipeline.

use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use super::{helpers, parsing};
use crate::core::config::AppConfig;
use crate::pipeline::RequestPipeline;

pub use self::function_handler as handler;

/// Handler for the analyze entrypoint.
///
/// # Errors
///
/// Never returns an error in practice: every failure is reported to the caller
/// as a JSON error envelope with the matching status code.
#[tracing::instrument(level = "info", skip_all)]
pub async fn function_handler(
    pipeline: &RequestPipeline,
    config: &AppConfig,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let request_id = Uuid::new_v4().to_string();
    let payload = &event.payload;
    let body_len = payload.get("body").and_then(Value::as_str).map_or(0, str::len);

    info!(
        request_id = %request_id,
        aws_request_id = %event.context.request_id,
        method = parsing::http_method(payload),
        body_len,
        "Analyze function invoked"
    );

    let request = match parsing::parse_event(payload, request_id.clone(), config.body_always_base64)
    {
        Ok(request) => request,
        Err(e) => {
            error!(request_id = %request_id, "Failed to read request: {}", e);
            return Ok(helpers::err_response(
                e.status_code(),
                e.code(),
                &e.to_string(),
                &request_id,
            ));
        }
    };

    let response = pipeline.handle(request).await;
    info!(
        request_id = %request_id,
        status_code = response.status_code,
        "Analyze function finished"
    );

    Ok(helpers::to_lambda_response(&response, &request_id))
}
