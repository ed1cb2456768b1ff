//! Labsum - turns an uploaded PDF laboratory report into a plain-language clinical summary.
//!
//! The crate is deployed as a single serverless HTTP function. Each invocation runs the
//! same pipeline:
//! 1. Reject anything that is not a `POST`
//! 2. Enforce the upload ceiling and the process-wide rate limit
//! 3. Decode the `multipart/form-data` body and keep the first part
//! 4. Extract the PDF text and page count
//! 5. Send a bounded excerpt to the chat-completion provider
//! 6. Answer with a JSON analysis or a JSON error envelope
//!
//! # Architecture
//!
//! The system uses:
//! - `lambda_runtime` for serverless execution
//! - `multer` for multipart decoding and `lopdf` for PDF parsing
//! - `reqwest` plus `openai-api-rs` message types for the provider call
//! - Tokio for the async runtime
//!
//! # Example
//!
//! ```no_run
//! use labsum::core::config::AppConfig;
//! use labsum::core::models::AnalyzeRequest;
//! use labsum::pipeline::RequestPipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     labsum::setup_logging();
//!
//!     let config = AppConfig::with_api_key("sk-dummy");
//!     let pipeline = RequestPipeline::from_config(&config)?;
//!
//!     let response = pipeline
//!         .handle(AnalyzeRequest {
//!             request_id: "demo".into(),
//!             method: "POST".into(),
//!             content_type: Some("multipart/form-data; boundary=X".into()),
//!             body: std::fs::read("request-body.bin")?,
//!         })
//!         .await;
//!
//!     println!("{} {:?}", response.status_code, response.body);
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod api;
pub mod core;
pub mod errors;
pub mod extract;
pub mod pipeline;
pub mod rate_limit;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// This function sets up tracing-subscriber with a JSON formatter suitable for
/// `CloudWatch` Logs integration and honours `RUST_LOG` (default `info`). Calling it
/// more than once is harmless; only the first call installs the subscriber.
///
/// # Example
///
/// ```
/// labsum::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
