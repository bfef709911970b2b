//! Credential resolution.

use crate::error::{Result, TryOnError};
use std::fmt;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Value shipped in `.env.example`; treated the same as an unset key.
pub const PLACEHOLDER_API_KEY: &str = "your_api_key_here";

/// A validated, non-placeholder API key.
///
/// The key is never printed; `Debug` shows a redacted form.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validates a raw key.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let key = raw.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            return Err(missing_key_error());
        }
        Ok(Self(key.to_string()))
    }

    /// Picks the explicit key if given, otherwise `GEMINI_API_KEY`.
    pub fn resolve(explicit: Option<String>) -> Result<Self> {
        Self::resolve_with(explicit, std::env::var(API_KEY_ENV).ok())
    }

    /// Same as [`ApiKey::resolve`] with the environment value passed in.
    pub fn resolve_with(explicit: Option<String>, env_value: Option<String>) -> Result<Self> {
        explicit
            .or(env_value)
            .ok_or_else(missing_key_error)
            .and_then(Self::new)
    }

    /// Returns the key for use in request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"<redacted>").finish()
    }
}

fn missing_key_error() -> TryOnError {
    TryOnError::Configuration(format!(
        "{API_KEY_ENV} not found or not set. Please set your API key in the .env file"
    ))
}

/// Loads a `.env` file from the working directory if one exists.
///
/// Returns the path that was loaded. A missing file is not an error; a
/// malformed one is logged and ignored.
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded environment file");
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!("failed to load .env file: {e}");
            None
        }
    }
}
