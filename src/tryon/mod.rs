//! Virtual try-on generation module.

mod content;
mod generator;
mod provider;
pub mod providers;
mod types;

pub use content::{Blob, Candidate, ContentRequest, ContentResponse, Part};
pub use generator::{
    validate, validate_images, TryOnGenerator, TryOnGeneratorBuilder, TRY_ON_PROMPT,
};
pub use provider::ContentGenerator;
pub use types::{GeneratedImage, GenerationMetadata, GenerationOutcome, ImageFormat, UploadedImage};

#[cfg(test)]
pub(crate) use generator::testing;
#[cfg(test)]
pub(crate) use types::fixtures;
