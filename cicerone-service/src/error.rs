use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Gemini(#[from] GeminiError),

    #[error("Document processing failed")]
    Processing(#[from] ProcessingError),

    #[error("Embedding error")]
    Embedding(#[from] EmbeddingError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Gemini API client errors
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Connection failed to Gemini API at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("No Gemini API key configured")]
    MissingApiKey,

    #[error("Generation failed (status {status}): {message}")]
    Generation { status: u16, message: String },

    #[error("Prompt blocked by the model provider: {reason}")]
    Blocked { reason: String },

    #[error("Invalid response from Gemini API")]
    InvalidResponse {
        #[source]
        source: serde_json::Error,
    },
}

/// Document processing errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to extract text from page {page}")]
    TextExtraction {
        page: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unsupported file format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Document not found: {path}")]
    NotFound { path: String },

    #[error("No text could be extracted from {path}")]
    EmptyDocument { path: String },

    #[error("IO error")]
    Io(#[source] std::io::Error),
}

/// Embedding and index errors
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding generation failed: {message}")]
    Generation { message: String },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors from the web search and encyclopedia lookups
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse response from {url}: {message}")]
    Parse { url: String, message: String },
}

/// API error response (matches Axum's built-in JsonRejection format)
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Processing(ProcessingError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Processing(ProcessingError::UnsupportedFormat { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Gemini(GeminiError::Connection { .. }) => "gemini_connection",
            ServiceError::Gemini(GeminiError::MissingApiKey) => "gemini_missing_api_key",
            ServiceError::Gemini(GeminiError::Generation { .. }) => "gemini_generation",
            ServiceError::Gemini(GeminiError::Blocked { .. }) => "gemini_blocked",
            ServiceError::Gemini(GeminiError::InvalidResponse { .. }) => "gemini_invalid_response",
            ServiceError::Processing(ProcessingError::TextExtraction { .. }) => {
                "text_extraction_error"
            }
            ServiceError::Processing(ProcessingError::UnsupportedFormat { .. }) => {
                "unsupported_format"
            }
            ServiceError::Processing(ProcessingError::NotFound { .. }) => "document_not_found",
            ServiceError::Processing(ProcessingError::EmptyDocument { .. }) => "empty_document",
            ServiceError::Processing(ProcessingError::Io(_)) => "io_error",
            ServiceError::Embedding(_) => "embedding_error",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
            ServiceError::Internal { .. } => "internal_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error with its full `source()` chain, outermost first.
pub fn format_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        message.push_str(": ");
        message.push_str(&source.to_string());
        current = source.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = ServiceError::InvalidRequest {
            message: "empty transcript".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "invalid_request");

        let err = ServiceError::Processing(ProcessingError::UnsupportedFormat {
            format: "docx".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let err = ServiceError::Gemini(GeminiError::Generation {
            status: 429,
            message: "quota".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "gemini_generation");
    }

    #[test]
    fn test_format_error_chain() {
        let err = ServiceError::Processing(ProcessingError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        )));
        assert_eq!(
            format_error_chain(&err),
            "Document processing failed: IO error: access denied"
        );
    }

    #[test]
    fn test_gemini_errors_are_not_repeated_in_chain() {
        let err = ServiceError::Gemini(GeminiError::Generation {
            status: 429,
            message: "quota exceeded".to_string(),
        });
        assert_eq!(
            format_error_chain(&err),
            "Generation failed (status 429): quota exceeded"
        );
    }
}
