//! Error types for try-on generation.

use std::fmt;
use std::time::Duration;

/// Longest upstream error body carried into an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Coarse error categories surfaced to the user interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential missing or left at its placeholder value.
    Configuration,
    /// No person image was supplied.
    MissingPerson,
    /// No garment image was supplied.
    MissingGarment,
    /// An uploaded file is not a decodable PNG/JPEG raster.
    InvalidFormat,
    /// The call to the generation service failed.
    Request,
    /// The service answered but returned no image part.
    NoImageReturned,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration_error",
            Self::MissingPerson => "missing_person",
            Self::MissingGarment => "missing_garment",
            Self::InvalidFormat => "invalid_format",
            Self::Request => "request_error",
            Self::NoImageReturned => "no_image_returned",
        };
        f.write_str(name)
    }
}

/// Which of the two uploads an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    /// The photo of the person.
    Person,
    /// The photo of the clothing item.
    Garment,
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person => f.write_str("person"),
            Self::Garment => f.write_str("garment"),
        }
    }
}

/// Errors that can occur while preparing or running a try-on generation.
#[derive(Debug, thiserror::Error)]
pub enum TryOnError {
    /// API key missing or still set to the placeholder.
    #[error("{0}")]
    Configuration(String),

    /// Person image absent.
    #[error("Please upload a person image")]
    MissingPerson,

    /// Garment image absent.
    #[error("Please upload a garment image")]
    MissingGarment,

    /// An image failed structural verification.
    #[error("Invalid {role} image format")]
    InvalidFormat {
        /// Which upload failed.
        role: ImageRole,
        /// Decoder message, kept for logs.
        reason: String,
    },

    /// Uploaded bytes are not a PNG or JPEG image.
    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    /// Transport-level failure reported by a content service.
    #[error("{0}")]
    Request(String),

    /// API key rejected by the service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized error text from the response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay from the `Retry-After` header, if sent.
        retry_after: Option<Duration>,
    },

    /// Invalid request parameters (e.g. unknown model).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 or image data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Failed to encode an image for upload.
    #[error("failed to encode: {0}")]
    Encode(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The service answered without any inline image.
    #[error("No image generated from Gemini API")]
    NoImageReturned,
}

impl TryOnError {
    /// Returns the user-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::MissingPerson => ErrorKind::MissingPerson,
            Self::MissingGarment => ErrorKind::MissingGarment,
            Self::InvalidFormat { .. } | Self::UnsupportedImage(_) => ErrorKind::InvalidFormat,
            Self::NoImageReturned => ErrorKind::NoImageReturned,
            Self::Request(_)
            | Self::Auth(_)
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::InvalidRequest(_)
            | Self::Network(_)
            | Self::Decode(_)
            | Self::Encode(_)
            | Self::Json(_)
            | Self::Io(_) => ErrorKind::Request,
        }
    }

    /// Returns true if the user can fix this by uploading different images.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingPerson | ErrorKind::MissingGarment | ErrorKind::InvalidFormat
        )
    }
}

/// Result type alias for try-on operations.
pub type Result<T> = std::result::Result<T, TryOnError>;

/// Reduces an upstream error body to a readable message.
///
/// Google APIs answer with `{"error": {"message": ...}}`; that message is
/// preferred over the raw body. Anything else is trimmed and truncated.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return trimmed.to_string();
    }
    let mut truncated: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

/// Parses a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
