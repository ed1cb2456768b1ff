use serde::{Deserialize, Serialize};

/// One file extracted from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub field_name: Option<String>,
    pub filename: String,
    pub content_type: Option<String>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub page_count: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub content: String,
}

/// Inbound HTTP request as seen by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub request_id: String,
    pub method: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub message: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<usize>,
    pub analysis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Analysis(AnalysisResponse),
    Error(ErrorResponse),
}

/// Pipeline result together with the HTTP status it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub retry_after_secs: Option<u64>,
    pub body: ResponseBody,
}

impl ApiResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.body, ResponseBody::Analysis(_))
    }
}
