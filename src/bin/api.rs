use std::sync::Arc;

use anyhow::Context as _;
use labsum::api::handler;
use labsum::core::config::AppConfig;
use labsum::pipeline::RequestPipeline;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use tracing::info;

fn build() -> anyhow::Result<(AppConfig, RequestPipeline)> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    let pipeline =
        RequestPipeline::from_config(&config).context("failed to build the analysis pipeline")?;
    Ok((config, pipeline))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    labsum::setup_logging();

    let (config, pipeline) = build().map_err(|e| {
        tracing::error!("Startup error: {:#}", e);
        Error::from(format!("{e:#}"))
    })?;
    info!(
        model = %config.openai_model,
        rate_limit_max_requests = config.rate_limit_max_requests,
        rate_limit_window_secs = config.rate_limit_window.as_secs(),
        char_budget = config.summary_char_budget,
        "Analyze function ready"
    );

    // One pipeline per process, so the rate limiter is shared by every invocation.
    let config = Arc::new(config);
    let pipeline = Arc::new(pipeline);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let config = Arc::clone(&config);
        let pipeline = Arc::clone(&pipeline);
        async move { handler(&pipeline, &config, event).await }
    }))
    .await
}
