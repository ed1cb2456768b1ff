//! `multipart/form-data` decoding for uploaded reports.

use std::convert::Infallible;

use bytes::Bytes;
use multer::Multipart;
use tracing::debug;

use crate::core::models::UploadedPart;
use crate::errors::AnalyzeError;

/// Filename used when a part does not declare one.
pub const FALLBACK_FILENAME: &str = "upload.pdf";

/// Pulls the boundary token out of a `Content-Type` header.
///
/// # Errors
///
/// Returns `MalformedRequest` when the header is absent, is not
/// `multipart/form-data`, or carries no usable boundary.
pub fn boundary_from_content_type(content_type: Option<&str>) -> Result<String, AnalyzeError> {
    let Some(content_type) = content_type.filter(|ct| !ct.trim().is_empty()) else {
        return Err(AnalyzeError::MalformedRequest(
            "missing Content-Type header".to_string(),
        ));
    };

    let boundary = multer::parse_boundary(content_type).map_err(|e| {
        AnalyzeError::MalformedRequest(format!("no multipart boundary in Content-Type: {e}"))
    })?;

    if boundary.is_empty() {
        return Err(AnalyzeError::MalformedRequest(
            "empty multipart boundary".to_string(),
        ));
    }
    Ok(boundary)
}

/// Splits a complete request body into its parts, in body order.
///
/// Parts with an empty payload are kept; deciding whether they are usable is
/// left to the next stage.
///
/// # Errors
///
/// Returns `MalformedRequest` when the boundary is empty, the body cannot be
/// parsed, or it contains no parts at all.
pub async fn decode(raw_body: Vec<u8>, boundary: &str) -> Result<Vec<UploadedPart>, AnalyzeError> {
    if boundary.is_empty() {
        return Err(AnalyzeError::MalformedRequest(
            "empty multipart boundary".to_string(),
        ));
    }

    let body = Bytes::from(raw_body);
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = Multipart::new(stream, boundary);

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().map(ToString::to_string);
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILENAME)
            .to_string();
        let content_type = field.content_type().map(ToString::to_string);
        let payload = field.bytes().await?.to_vec();

        debug!(
            field = field_name.as_deref().unwrap_or(""),
            filename = %filename,
            bytes = payload.len(),
            "Decoded multipart part"
        );

        parts.push(UploadedPart {
            field_name,
            filename,
            content_type,
            payload,
        });
    }

    if parts.is_empty() {
        return Err(AnalyzeError::MalformedRequest(
            "no file was received".to_string(),
        ));
    }

    Ok(parts)
}
