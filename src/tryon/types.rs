//! Core types for try-on generation.

use crate::error::{ErrorKind, Result, TryOnError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format. Only ever produced by the service, never accepted as upload.
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Maps a MIME type such as `image/png` to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }

    /// Returns true if uploads in this format are accepted.
    pub fn is_uploadable(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }

    fn from_codec(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }

    fn codec(&self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::WebP => image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An image file uploaded by the user.
///
/// [`UploadedImage::open`] only reads the header, so a file with a valid
/// header and a corrupt body is accepted until [`UploadedImage::verify`]
/// runs the full decode.
#[derive(Clone)]
pub struct UploadedImage {
    data: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl UploadedImage {
    /// Parses the header of a PNG or JPEG file.
    pub fn open(data: Vec<u8>) -> Result<Self> {
        let reader = image::ImageReader::new(Cursor::new(data.as_slice()))
            .with_guessed_format()
            .map_err(|e| TryOnError::UnsupportedImage(e.to_string()))?;

        let format = match reader.format() {
            Some(codec) => ImageFormat::from_codec(codec)
                .filter(ImageFormat::is_uploadable)
                .ok_or_else(|| {
                    TryOnError::UnsupportedImage(format!(
                        "{codec:?} images are not supported, upload a PNG or JPEG file"
                    ))
                })?,
            None => {
                return Err(TryOnError::UnsupportedImage(
                    "unrecognized image data".into(),
                ))
            }
        };

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| TryOnError::UnsupportedImage(e.to_string()))?;

        Ok(Self {
            data,
            format,
            width,
            height,
        })
    }

    /// Reads and opens an image file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(std::fs::read(path)?)
    }

    /// Wraps an already decoded raster, storing it as PNG.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        Self::open(encode_png(image)?)
    }

    /// Fully decodes the image.
    pub fn decode(&self) -> Result<DynamicImage> {
        image::load_from_memory_with_format(&self.data, self.format.codec())
            .map_err(|e| TryOnError::Decode(e.to_string()))
    }

    /// Checks that the whole file decodes, discarding the pixels.
    pub fn verify(&self) -> Result<()> {
        self.decode().map(|_| ())
    }

    /// Re-encodes the image as PNG for upload.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.decode()?)
    }

    /// Format detected from the file header.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Width in pixels, from the header.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels, from the header.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The file as uploaded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| TryOnError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A generated image with its data and metadata.
#[derive(Clone)]
#[must_use = "generated image should be saved or processed"]
pub struct GeneratedImage {
    /// Raw image bytes as returned by the service.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// MIME type reported by the service.
    pub mime_type: String,
    /// Decoded pixels.
    pub image: DynamicImage,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Decodes service output into an image.
    ///
    /// The format is taken from the magic bytes, falling back to the
    /// reported MIME type.
    pub fn decode(
        data: Vec<u8>,
        mime_type: impl Into<String>,
        metadata: GenerationMetadata,
    ) -> Result<Self> {
        let mime_type = mime_type.into();
        let format = ImageFormat::from_magic_bytes(&data)
            .or_else(|| ImageFormat::from_mime_type(&mime_type))
            .ok_or_else(|| TryOnError::Decode(format!("Unknown image format ({mime_type})")))?;
        let image = image::load_from_memory_with_format(&data, format.codec())
            .map_err(|e| TryOnError::Decode(e.to_string()))?;

        Ok(Self {
            data,
            format,
            mime_type,
            image,
            metadata,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Returns the size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Saves the image to the specified path.
    ///
    /// The bytes are written as received when the extension matches the
    /// format, otherwise the pixels are re-encoded for the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let target = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension);

        match target {
            Some(format) if format != self.format => self
                .image
                .save_with_format(path, format.codec())
                .map_err(|e| TryOnError::Encode(e.to_string())),
            _ => {
                std::fs::write(path, &self.data)?;
                Ok(())
            }
        }
    }

    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }
}

impl fmt::Debug for GeneratedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedImage")
            .field("format", &self.format)
            .field("mime_type", &self.mime_type)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("bytes", &self.data.len())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Result of one try-on generation.
#[derive(Debug, Clone)]
#[must_use = "the outcome holds either the image or the reason it is missing"]
pub enum GenerationOutcome {
    /// The service returned an image.
    Success(GeneratedImage),
    /// Generation did not produce an image.
    Failure {
        /// Error category.
        kind: ErrorKind,
        /// User-facing message.
        message: String,
    },
}

impl GenerationOutcome {
    /// Builds a failure carrying the error's category and display text.
    pub fn failure(error: &TryOnError) -> Self {
        Self::Failure {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Returns true for [`GenerationOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The generated image, if any.
    pub fn image(&self) -> Option<&GeneratedImage> {
        match self {
            Self::Success(image) => Some(image),
            Self::Failure { .. } => None,
        }
    }

    /// Consumes the outcome, returning the image if any.
    pub fn into_image(self) -> Option<GeneratedImage> {
        match self {
            Self::Success(image) => Some(image),
            Self::Failure { .. } => None,
        }
    }

    /// The error category, if generation failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// The error message, if generation failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { message, .. } => Some(message),
        }
    }
}
