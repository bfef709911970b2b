#![warn(missing_docs)]
//! FashionForge - AI virtual try-on.
//!
//! Takes a photo of a person and a photo of a garment, asks Google Gemini to
//! dress the person in the garment, and hands back the generated image.
//!
//! # Quick Start
//!
//! ```no_run
//! use fashionforge::{GenerationOutcome, TryOnGenerator, UploadedImage};
//!
//! #[tokio::main]
//! async fn main() -> fashionforge::Result<()> {
//!     let generator = TryOnGenerator::builder().build()?;
//!     let person = UploadedImage::from_path("person.jpg")?;
//!     let garment = UploadedImage::from_path("dress.png")?;
//!
//!     match generator.generate(Some(&person), Some(&garment)).await {
//!         GenerationOutcome::Success(image) => image.save("try-on.png")?,
//!         GenerationOutcome::Failure { message, .. } => eprintln!("{message}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The API key is read from `GEMINI_API_KEY` unless passed to the builder.
//! An empty key or the placeholder `your_api_key_here` counts as unset and
//! fails construction with a configuration error.
//!
//! # Features
//!
//! - `cli`: the `fashionforge` command-line front end

pub mod config;
mod error;
pub mod session;
pub mod tryon;

// Re-export error types at crate root
pub use error::{ErrorKind, ImageRole, Result, TryOnError};

pub use config::{ApiKey, API_KEY_ENV, PLACEHOLDER_API_KEY};
pub use session::{trigger_generation, Notice, SessionState};
pub use tryon::providers::{GeminiClient, GeminiClientBuilder, GeminiModel};
pub use tryon::{
    validate, validate_images, ContentGenerator, GeneratedImage, GenerationMetadata,
    GenerationOutcome, ImageFormat, TryOnGenerator, TryOnGeneratorBuilder, UploadedImage,
    TRY_ON_PROMPT,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorKind, Result, TryOnError};
    pub use crate::session::{trigger_generation, Notice, SessionState};
    pub use crate::tryon::providers::GeminiClient;
    pub use crate::tryon::{
        ContentGenerator, GeneratedImage, GenerationOutcome, TryOnGenerator, UploadedImage,
    };
}
