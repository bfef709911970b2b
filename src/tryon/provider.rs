//! Content generation service trait.

use crate::error::Result;
use crate::tryon::content::{ContentRequest, ContentResponse};
use async_trait::async_trait;

/// A hosted multimodal model that turns parts into candidate answers.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Sends one request and returns the parsed response.
    ///
    /// Implementations must not retry.
    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse>;

    /// Returns the model identifier requests are sent to.
    fn model_id(&self) -> &str;

    /// Checks if the service is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}

#[async_trait]
impl<T: ContentGenerator + ?Sized> ContentGenerator for std::sync::Arc<T> {
    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse> {
        (**self).generate_content(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    async fn health_check(&self) -> Result<()> {
        (**self).health_check().await
    }
}
