use async_trait::async_trait;
use thiserror::Error;

use crate::browser::BrowserError;
use crate::media::{MediaDraft, Method};

/// Failure of a single extraction strategy. Never shown to end users.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no structured data available")]
    NoStructuredData,
    #[error("no video URL in structured data")]
    NoVideoInPayload,
    #[error("navigation timeout")]
    NavigationTimeout,
    #[error("no media element")]
    NoMediaElement,
    #[error("no video URL found")]
    NoVideoFound,
    #[error("browser session failed: {0}")]
    Browser(#[from] BrowserError),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// One way of turning a page link into media metadata.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Strategy tag attached to successful results.
    fn method(&self) -> Method;

    async fn extract(&self, page_url: &str) -> ExtractionResult<MediaDraft>;
}
