//! Error types for Lectern.
//!
//! Every fallible operation in the crate returns [`LecternError`]. Adapters and
//! the image preprocessor translate their own failures into one of these
//! variants at their boundary; the orchestrator turns whatever reaches it into
//! a `failed` [`ExtractionResult`](crate::types::ExtractionResult) instead of
//! propagating it.
//!
//! **System errors bubble up unchanged:**
//! - `LecternError::Io` (from `std::io::Error`) - reading input files, binding sockets
//!
//! **Application errors carry context:**
//! - `Parsing` - the adapter could not produce text from the bytes
//! - `ImageProcessing` - image decode/encode problems
//! - `Gateway` - transport, status or service errors from an OCR endpoint
//! - `Validation` - invalid configuration or arguments
//!
//! # Example
//!
//! ```rust
//! use lectern::{LecternError, Result};
//!
//! fn require_endpoint(endpoint: &str) -> Result<&str> {
//!     if endpoint.is_empty() {
//!         return Err(LecternError::validation("gateway endpoint is empty"));
//!     }
//!     Ok(endpoint)
//! }
//! ```
use thiserror::Error;

/// Result type alias using `LecternError`.
pub type Result<T> = std::result::Result<T, LecternError>;

/// Main error type for all Lectern operations.
#[derive(Debug, Error)]
pub enum LecternError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Image processing error: {message}")]
    ImageProcessing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR gateway error: {message}")]
    Gateway {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Extraction cancelled: {0}")]
    Cancelled(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for LecternError {
    fn from(err: serde_json::Error) -> Self {
        LecternError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for LecternError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else if err.is_connect() {
            format!("could not connect: {}", err)
        } else {
            err.to_string()
        };
        LecternError::Gateway {
            message,
            source: Some(Box::new(err)),
        }
    }
}

impl From<tokio::task::JoinError> for LecternError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            LecternError::Other(format!("extraction task panicked: {}", err))
        } else {
            LecternError::Other(format!("extraction task failed: {}", err))
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $with_source:ident, $variant:ident) => {
        #[doc = concat!("Create a `", stringify!($variant), "` error")]
        pub fn $name<S: Into<String>>(message: S) -> Self {
            Self::$variant {
                message: message.into(),
                source: None,
            }
        }

        #[doc = concat!("Create a `", stringify!($variant), "` error with source")]
        pub fn $with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
            message: S,
            source: E,
        ) -> Self {
            Self::$variant {
                message: message.into(),
                source: Some(Box::new(source)),
            }
        }
    };
}

impl LecternError {
    error_constructor!(parsing, parsing_with_source, Parsing);
    error_constructor!(image_processing, image_processing_with_source, ImageProcessing);
    error_constructor!(gateway, gateway_with_source, Gateway);
    error_constructor!(validation, validation_with_source, Validation);
    error_constructor!(serialization, serialization_with_source, Serialization);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LecternError = io_err.into();
        assert!(matches!(err, LecternError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_parsing_error() {
        let err = LecternError::parsing("invalid format");
        assert_eq!(err.to_string(), "Parsing error: invalid format");
    }

    #[test]
    fn test_parsing_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad data");
        let err = LecternError::parsing_with_source("invalid format", source);
        assert_eq!(err.to_string(), "Parsing error: invalid format");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_gateway_error() {
        let err = LecternError::gateway("service unavailable");
        assert_eq!(err.to_string(), "OCR gateway error: service unavailable");
    }

    #[test]
    fn test_image_processing_error_with_source() {
        let source = std::io::Error::other("decode failed");
        let err = LecternError::image_processing_with_source("resize failed", source);
        assert_eq!(err.to_string(), "Image processing error: resize failed");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_validation_error() {
        let err = LecternError::validation("quality must be in (0, 1]");
        assert_eq!(err.to_string(), "Validation error: quality must be in (0, 1]");
    }

    #[test]
    fn test_missing_dependency_error() {
        let err = LecternError::MissingDependency("OCR_API_KEY is not set".to_string());
        assert_eq!(err.to_string(), "Missing dependency: OCR_API_KEY is not set");
    }

    #[test]
    fn test_cancelled_error() {
        let err = LecternError::Cancelled("superseded by submission 4".to_string());
        assert_eq!(err.to_string(), "Extraction cancelled: superseded by submission 4");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: LecternError = json_err.into();
        assert!(matches!(err, LecternError::Serialization { .. }));
    }

    #[tokio::test]
    async fn test_join_error_panic_conversion() {
        let handle = tokio::task::spawn_blocking(|| panic!("boom"));
        let join_err = handle.await.unwrap_err();
        let err: LecternError = join_err.into();
        assert!(matches!(err, LecternError::Other(_)));
        assert!(err.to_string().contains("panicked"));
    }

    #[test]
    fn test_io_error_bubbles_unchanged() {
        fn read_file() -> Result<Vec<u8>> {
            Ok(std::fs::read("/nonexistent/lectern/input.txt")?)
        }

        assert!(matches!(read_file().unwrap_err(), LecternError::Io(_)));
    }
}
