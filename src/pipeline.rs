//! Request pipeline: method check → upload ceiling → rate limit → multipart
//! decode → PDF extraction → truncation → summarization → response.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::ai::{LlmClient, Summarizer, truncate_to_budget};
use crate::api::multipart;
use crate::core::config::AppConfig;
use crate::core::models::{AnalysisResponse, AnalyzeRequest, ApiResponse, ResponseBody};
use crate::errors::AnalyzeError;
use crate::extract;
use crate::rate_limit::{GLOBAL_KEY, RateLimiter};

pub const SUCCESS_MESSAGE: &str = "Analysis completed";

/// Tunables the pipeline reads on every request.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub char_budget: usize,
    pub max_upload_bytes: usize,
    pub provider_timeout: Duration,
    pub rate_limit_key: String,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            char_budget: config.summary_char_budget,
            max_upload_bytes: config.max_upload_bytes,
            provider_timeout: config.provider_timeout,
            rate_limit_key: GLOBAL_KEY.to_string(),
        }
    }
}

pub struct RequestPipeline {
    limiter: Arc<RateLimiter>,
    summarizer: Arc<dyn Summarizer>,
    settings: PipelineSettings,
}

impl RequestPipeline {
    #[must_use]
    pub fn new(
        settings: PipelineSettings,
        limiter: Arc<RateLimiter>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            limiter,
            summarizer,
            settings,
        }
    }

    /// Wires the production limiter and `OpenAI` client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalyzeError> {
        Ok(Self::new(
            PipelineSettings::from_config(config),
            Arc::new(RateLimiter::from_config(config)),
            Arc::new(LlmClient::new(config)?),
        ))
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Runs one request to completion. Never fails: every error becomes an
    /// error envelope with its own status code.
    #[tracing::instrument(level = "info", skip(self, request), fields(request_id = %request.request_id))]
    pub async fn handle(&self, request: AnalyzeRequest) -> ApiResponse {
        match self.run(request).await {
            Ok(analysis) => {
                info!(filename = %analysis.filename, "Analysis finished successfully");
                ApiResponse {
                    status_code: 200,
                    retry_after_secs: None,
                    body: ResponseBody::Analysis(analysis),
                }
            }
            Err(e) => {
                let status_code = e.status_code();
                if status_code >= 500 {
                    error!(code = e.code(), status_code, "Analysis failed: {}", e);
                } else {
                    warn!(code = e.code(), status_code, "Analysis rejected: {}", e);
                }
                ApiResponse {
                    status_code,
                    retry_after_secs: e.retry_after().map(|d| d.as_secs().max(1)),
                    body: ResponseBody::Error(e.to_response()),
                }
            }
        }
    }

    async fn run(&self, request: AnalyzeRequest) -> Result<AnalysisResponse, AnalyzeError> {
        if !request.method.eq_ignore_ascii_case("POST") {
            return Err(AnalyzeError::MethodNotAllowed(request.method));
        }

        if request.body.len() > self.settings.max_upload_bytes {
            return Err(AnalyzeError::PayloadTooLarge {
                size: request.body.len(),
                limit: self.settings.max_upload_bytes,
            });
        }

        self.limiter.check(&self.settings.rate_limit_key, 1)?;

        let boundary = multipart::boundary_from_content_type(request.content_type.as_deref())?;
        let part = multipart::decode(request.body, &boundary)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AnalyzeError::MalformedRequest("no file was received".to_string()))?;
        info!(filename = %part.filename, bytes = part.payload.len(), "File received");

        let filename = part.filename;
        let payload = part.payload;
        let document = tokio::task::spawn_blocking(move || extract::extract(&payload))
            .await
            .map_err(|e| {
                AnalyzeError::UnreadableDocument(format!("PDF extraction aborted: {e}"))
            })??;

        if document.text.trim().is_empty() {
            return Err(AnalyzeError::UnreadableDocument(format!(
                "no extractable text in {} page(s); the report may be a scanned image",
                document.page_count
            )));
        }

        let excerpt = truncate_to_budget(&document.text, self.settings.char_budget);
        info!(
            text_chars = document.text.chars().count(),
            excerpt_chars = excerpt.chars().count(),
            "Starting summarization"
        );

        let timeout = self.settings.provider_timeout;
        let summary = tokio::time::timeout(timeout, self.summarizer.summarize(excerpt))
            .await
            .map_err(|_| AnalyzeError::ProviderTimeout(timeout))??;

        Ok(AnalysisResponse {
            message: SUCCESS_MESSAGE.to_string(),
            filename,
            num_pages: Some(document.page_count),
            analysis: summary.content,
        })
    }
}
