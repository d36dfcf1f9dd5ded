//! Error types for the branding pipeline.

use std::path::PathBuf;
use std::time::Duration;

/// Maximum length of an upstream error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors raised by a base image provider.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Rate limit or quota exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-suggested wait, when given.
        retry_after: Option<Duration>,
    },

    /// Provider did not answer within the configured bound.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Response was well-formed HTTP but carried no usable image.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode the returned image payload.
    #[error("failed to decode: {0}")]
    Decode(String),
}

/// Errors that can occur while loading configuration or running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid configuration. Fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Base image provider failure. Skips the current prompt.
    #[error("image generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Logo could not be loaded or composited. Recovered by the compositor.
    #[error("branding failed: {0}")]
    Branding(String),

    /// Writing a variant (or its directory) failed. Skips the current prompt.
    #[error("failed to export {}: {source}", .path.display())]
    Export {
        /// File or directory being written.
        path: PathBuf,
        /// Underlying encoder or filesystem error.
        #[source]
        source: image::ImageError,
    },

    /// Delivering results to the notifier failed. Logged only.
    #[error("notification failed: {0}")]
    Notification(String),
}

impl Error {
    /// Wraps a filesystem error raised while exporting to `path`.
    pub(crate) fn export_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Export {
            path: path.into(),
            source: image::ImageError::IoError(err),
        }
    }

    /// Returns true if this error aborts the whole run rather than one prompt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Trims an upstream error body to something fit for a log line.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    out.push_str("...");
    out
}

/// Reads a `Retry-After` header expressed in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_config_is_fatal() {
        assert!(Error::Config("no colors".into()).is_fatal());
        assert!(!Error::Branding("bad logo".into()).is_fatal());
        assert!(!Error::Notification("503".into()).is_fatal());
        assert!(!Error::from(GenerationError::Timeout(Duration::from_secs(5))).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = GenerationError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = Error::from(GenerationError::ContentBlocked("Safety filter".into()));
        assert_eq!(
            err.to_string(),
            "image generation failed: content blocked: Safety filter"
        );

        let err = Error::export_io(
            "out/thumb/a.jpg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().starts_with("failed to export out/thumb/a.jpg"));
    }

    #[test]
    fn test_sanitize_error_message_truncates() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_LEN + 50);
        let out = sanitize_error_message(&long);
        assert_eq!(out.len(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(out.ends_with("..."));

        assert_eq!(sanitize_error_message("  short  "), "short");
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));

        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
