//! Provider-neutral request and response parts.

/// Binary payload tagged with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct Blob {
    /// MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Raw (already base64-decoded) bytes.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// One fragment of a request or a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Plain text.
    Text(String),
    /// Binary data embedded in the message.
    InlineData(Blob),
}

impl Part {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates an inline data part.
    pub fn inline(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::InlineData(Blob {
            mime_type: mime_type.into(),
            data,
        })
    }

    /// Returns the inline payload, if this part carries one.
    pub fn as_inline_data(&self) -> Option<&Blob> {
        match self {
            Self::InlineData(blob) => Some(blob),
            Self::Text(_) => None,
        }
    }

    /// Returns the text, if this is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::InlineData(_) => None,
        }
    }
}

/// A single request to a content generation service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRequest {
    /// Ordered parts sent as one user turn.
    pub parts: Vec<Part>,
}

impl ContentRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a part.
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Iterates over the inline payloads in order.
    pub fn inline_parts(&self) -> impl Iterator<Item = &Blob> {
        self.parts.iter().filter_map(Part::as_inline_data)
    }

    /// Iterates over the text parts in order.
    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(Part::as_text)
    }
}

/// One alternative answer returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    /// Ordered response parts.
    pub parts: Vec<Part>,
    /// Why the service stopped generating (e.g. `STOP`, `IMAGE_SAFETY`).
    pub finish_reason: Option<String>,
}

/// A full service response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentResponse {
    /// Candidates in the order the service listed them.
    pub candidates: Vec<Candidate>,
    /// Set when the prompt itself was blocked.
    pub block_reason: Option<String>,
}

impl ContentResponse {
    /// Takes the first inline payload, scanning candidates in order and
    /// parts in order within each candidate.
    pub fn into_first_inline_data(self) -> Option<Blob> {
        self.candidates
            .into_iter()
            .flat_map(|c| c.parts)
            .find_map(|part| match part {
                Part::InlineData(blob) => Some(blob),
                Part::Text(_) => None,
            })
    }

    /// Concatenated text of all parts, useful when no image came back.
    pub fn text(&self) -> String {
        self.candidates
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
