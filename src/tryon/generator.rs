//! Virtual try-on orchestration.

use crate::config::ApiKey;
use crate::error::{ErrorKind, ImageRole, Result, TryOnError};
use crate::tryon::content::{ContentRequest, Part};
use crate::tryon::provider::ContentGenerator;
use crate::tryon::providers::{GeminiClient, GeminiClientBuilder, GeminiModel};
use crate::tryon::types::{
    GeneratedImage, GenerationMetadata, GenerationOutcome, UploadedImage,
};
use std::time::{Duration, Instant};

/// Instruction sent with every try-on request.
pub const TRY_ON_PROMPT: &str = "Create a realistic virtual try-on image where the model is wearing the garment. \n\
Preserve the original color, texture, and features of both the model and the garment. \n\
Ensure the garment fits naturally on the model's body with proper proportions and lighting. \n\
The result should look photorealistic and professionally edited.";

/// MIME type both uploads are sent as.
const UPLOAD_MIME_TYPE: &str = "image/png";

/// Checks that both images are present and decode.
///
/// Person is checked before garment, presence before format.
pub fn validate(person: Option<&UploadedImage>, garment: Option<&UploadedImage>) -> Result<()> {
    require(person, garment).map(|_| ())
}

fn require<'a>(
    person: Option<&'a UploadedImage>,
    garment: Option<&'a UploadedImage>,
) -> Result<(&'a UploadedImage, &'a UploadedImage)> {
    let person = person.ok_or(TryOnError::MissingPerson)?;
    let garment = garment.ok_or(TryOnError::MissingGarment)?;
    verify(person, ImageRole::Person)?;
    verify(garment, ImageRole::Garment)?;
    Ok((person, garment))
}

/// Same checks as [`validate`], reported as a single user-facing message.
pub fn validate_images(
    person: Option<&UploadedImage>,
    garment: Option<&UploadedImage>,
) -> std::result::Result<(), String> {
    validate(person, garment).map_err(|e| e.to_string())
}

fn verify(image: &UploadedImage, role: ImageRole) -> Result<()> {
    image.verify().map_err(|e| TryOnError::InvalidFormat {
        role,
        reason: e.to_string(),
    })
}

/// Builds the ordered request: person, garment, prompt.
fn build_request(person: &UploadedImage, garment: &UploadedImage) -> Result<ContentRequest> {
    Ok(ContentRequest::new()
        .with_part(Part::inline(UPLOAD_MIME_TYPE, person.to_png()?))
        .with_part(Part::inline(UPLOAD_MIME_TYPE, garment.to_png()?))
        .with_part(Part::text(TRY_ON_PROMPT)))
}

/// Builder for [`TryOnGenerator`].
#[derive(Debug, Clone, Default)]
pub struct TryOnGeneratorBuilder {
    api_key: Option<String>,
    client: GeminiClientBuilder,
}

impl TryOnGeneratorBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GEMINI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.client = self.client.model(model);
        self
    }

    /// Overrides the Gemini API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.client = self.client.base_url(url);
        self
    }

    /// Sets a whole-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.timeout(timeout);
        self
    }

    /// Builds a generator backed by the Gemini API.
    ///
    /// Fails with a configuration error if no usable key is found.
    pub fn build(self) -> Result<TryOnGenerator<GeminiClient>> {
        let api_key = ApiKey::resolve(self.api_key)?;
        let client = self.client.build_with_key(api_key)?;
        tracing::debug!(model = client.model_id(), "try-on generator ready");
        Ok(TryOnGenerator { service: client })
    }

    /// Builds a generator around another service.
    ///
    /// The credential is still checked first, so a missing key fails here
    /// without the service ever being called.
    pub fn build_with<S: ContentGenerator>(self, service: S) -> Result<TryOnGenerator<S>> {
        ApiKey::resolve(self.api_key)?;
        Ok(TryOnGenerator { service })
    }
}

/// Turns a person image and a garment image into a try-on composite.
///
/// Stateless between calls. Every call sends at most one request.
#[derive(Debug)]
pub struct TryOnGenerator<S = GeminiClient> {
    service: S,
}

impl TryOnGenerator<GeminiClient> {
    /// Creates a new `TryOnGeneratorBuilder`.
    pub fn builder() -> TryOnGeneratorBuilder {
        TryOnGeneratorBuilder::new()
    }
}

impl<S: ContentGenerator> TryOnGenerator<S> {
    /// The underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Model identifier requests go to.
    pub fn model_id(&self) -> &str {
        self.service.model_id()
    }

    /// Checks that the service is reachable with the configured key.
    pub async fn health_check(&self) -> Result<()> {
        self.service.health_check().await
    }

    /// Generates a try-on image.
    ///
    /// Never returns an error: every failure, including transport faults,
    /// is folded into [`GenerationOutcome::Failure`].
    pub async fn generate(
        &self,
        person: Option<&UploadedImage>,
        garment: Option<&UploadedImage>,
    ) -> GenerationOutcome {
        let (person, garment) = match require(person, garment) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::debug!(kind = %e.kind(), "try-on input rejected: {e}");
                return GenerationOutcome::failure(&e);
            }
        };

        match self.dispatch(person, garment).await {
            Ok(image) => GenerationOutcome::Success(image),
            Err(TryOnError::NoImageReturned) => {
                tracing::warn!(model = self.model_id(), "response contained no image");
                GenerationOutcome::failure(&TryOnError::NoImageReturned)
            }
            Err(e) => {
                let message = format!("Error generating try-on: {e}");
                tracing::error!(kind = %e.kind(), "{message}");
                GenerationOutcome::Failure {
                    kind: ErrorKind::Request,
                    message,
                }
            }
        }
    }

    async fn dispatch(
        &self,
        person: &UploadedImage,
        garment: &UploadedImage,
    ) -> Result<GeneratedImage> {
        let start = Instant::now();
        let request = build_request(person, garment)?;
        let response = self.service.generate_content(&request).await?;

        let blob = response
            .into_first_inline_data()
            .ok_or(TryOnError::NoImageReturned)?;

        let image = GeneratedImage::decode(
            blob.data,
            blob.mime_type,
            GenerationMetadata {
                model: Some(self.model_id().to_string()),
                duration_ms: Some(start.elapsed().as_millis() as u64),
            },
        )?;

        tracing::debug!(
            width = image.width(),
            height = image.height(),
            bytes = image.size(),
            "try-on image generated"
        );
        Ok(image)
    }
}
