//! Session state and the user-facing flow around one generation.
//!
//! A front end owns one [`SessionState`] per user, feeds uploads into it and
//! calls [`trigger_generation`] when the user asks for a result. The returned
//! [`Notice`]s are what it should show.

use crate::error::{ErrorKind, Result};
use crate::tryon::{
    ContentGenerator, GeneratedImage, GenerationOutcome, TryOnGenerator, UploadedImage,
};
use std::fmt;

/// Shown when generation is triggered without a person image.
pub const PERSON_REQUIRED: &str = "Please upload a person image first";

/// Shown when generation is triggered without a garment image.
pub const GARMENT_REQUIRED: &str = "Please upload a garment image first";

/// Shown after a successful generation.
pub const GENERATED: &str = "Virtual try-on generated successfully!";

/// Hint shown alongside any generation failure.
pub const API_KEY_HINT: &str = "Make sure your GEMINI_API_KEY is set correctly in the .env file";

/// Shown when the generator cannot be configured.
pub const SETUP_INSTRUCTIONS: &str = "Setup Instructions:
1. Copy `.env.example` to `.env`
2. Get your API key from Google AI Studio: https://aistudio.google.com/apikey
3. Add your API key to the `.env` file
4. Restart the application";

/// One message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Something went wrong.
    Error(String),
    /// Additional guidance.
    Info(String),
    /// The operation worked.
    Success(String),
}

impl Notice {
    /// Returns true for [`Notice::Error`].
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The message text.
    pub fn text(&self) -> &str {
        match self {
            Self::Error(text) | Self::Info(text) | Self::Success(text) => text,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error(text) => write!(f, "error: {text}"),
            Self::Info(text) => write!(f, "info: {text}"),
            Self::Success(text) => write!(f, "{text}"),
        }
    }
}

/// Everything remembered between interactions of one user.
#[derive(Debug, Default)]
pub struct SessionState {
    person: Option<UploadedImage>,
    garment: Option<UploadedImage>,
    last_outcome: Option<GenerationOutcome>,
}

impl SessionState {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens and stores a person image.
    ///
    /// On error the previously uploaded image is kept.
    pub fn upload_person(&mut self, data: Vec<u8>) -> Result<&UploadedImage> {
        let image = UploadedImage::open(data)?;
        Ok(self.person.insert(image))
    }

    /// Opens and stores a garment image.
    ///
    /// On error the previously uploaded image is kept.
    pub fn upload_garment(&mut self, data: Vec<u8>) -> Result<&UploadedImage> {
        let image = UploadedImage::open(data)?;
        Ok(self.garment.insert(image))
    }

    /// Replaces the person image.
    pub fn set_person(&mut self, image: UploadedImage) {
        self.person = Some(image);
    }

    /// Replaces the garment image.
    pub fn set_garment(&mut self, image: UploadedImage) {
        self.garment = Some(image);
    }

    /// Last uploaded person image.
    pub fn person(&self) -> Option<&UploadedImage> {
        self.person.as_ref()
    }

    /// Last uploaded garment image.
    pub fn garment(&self) -> Option<&UploadedImage> {
        self.garment.as_ref()
    }

    /// Outcome of the most recent generation.
    pub fn last_outcome(&self) -> Option<&GenerationOutcome> {
        self.last_outcome.as_ref()
    }

    /// Image from the most recent generation, if it succeeded.
    pub fn last_result(&self) -> Option<&GeneratedImage> {
        self.last_outcome.as_ref().and_then(GenerationOutcome::image)
    }

    /// Stores an outcome, dropping the previous one.
    pub fn record(&mut self, outcome: GenerationOutcome) -> &GenerationOutcome {
        self.last_outcome.insert(outcome)
    }

    /// Forgets uploads and results.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Runs one generation for the session.
///
/// Missing uploads are reported without calling `connect`. A generator that
/// fails to build leaves the session untouched. Otherwise the outcome
/// replaces the session's last outcome.
pub async fn trigger_generation<S, F>(session: &mut SessionState, connect: F) -> Vec<Notice>
where
    S: ContentGenerator,
    F: FnOnce() -> Result<TryOnGenerator<S>>,
{
    if session.person.is_none() {
        return vec![Notice::Error(PERSON_REQUIRED.into())];
    }
    if session.garment.is_none() {
        return vec![Notice::Error(GARMENT_REQUIRED.into())];
    }

    let generator = match connect() {
        Ok(generator) => generator,
        Err(e) if e.kind() == ErrorKind::Configuration => {
            tracing::warn!("generator not configured: {e}");
            return vec![
                Notice::Error(format!("Configuration Error: {e}")),
                Notice::Info(SETUP_INSTRUCTIONS.into()),
            ];
        }
        Err(e) => {
            tracing::error!("failed to create generator: {e}");
            return vec![Notice::Error(format!("Unexpected error: {e}"))];
        }
    };

    let outcome = generator
        .generate(session.person.as_ref(), session.garment.as_ref())
        .await;

    let notices = match &outcome {
        GenerationOutcome::Success(_) => vec![Notice::Success(GENERATED.into())],
        GenerationOutcome::Failure { message, .. } => vec![
            Notice::Error(format!("Error: {message}")),
            Notice::Info(API_KEY_HINT.into()),
        ],
    };
    session.record(outcome);
    notices
}
