//! Structured-data extraction: asks a structured source for the post
//! metadata, walking the configured version hints until one answers.

mod http;
mod payload;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extractor::{ExtractionError, ExtractionResult, Extractor};
use crate::media::{MediaDraft, Method, Normalizer};

pub use http::HttpStructuredSource;
pub use payload::{
    RawAuthor, RawMusicInfo, RawPost, RawVideo, StructuredResponse, UrlField, VideoVariants,
};

/// Failure of one version hint.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no endpoint configured for version {0}")]
    UnknownVersion(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("source answered with HTTP {0}")]
    Status(u16),
    #[error("invalid endpoint url: {0}")]
    Endpoint(String),
}

/// Structured-extraction capability: `(url, version hint) -> envelope`.
#[async_trait]
pub trait StructuredSource: Send + Sync {
    async fn fetch(&self, page_url: &str, version: &str)
        -> Result<StructuredResponse, SourceError>;
}

pub struct PrimaryExtractor {
    source: Arc<dyn StructuredSource>,
    versions: Vec<String>,
    normalizer: Normalizer,
}

impl PrimaryExtractor {
    pub fn new(
        source: Arc<dyn StructuredSource>,
        versions: Vec<String>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            source,
            versions,
            normalizer,
        }
    }

    async fn first_successful_post(&self, page_url: &str) -> Option<(String, RawPost)> {
        for version in &self.versions {
            debug!(url = %page_url, version = %version, "querying structured source");
            match self.source.fetch(page_url, version).await {
                Ok(response) if response.is_success() => match response.result {
                    Some(post) => return Some((version.clone(), post)),
                    None => {
                        warn!(version = %version, "structured source reported success without payload");
                    }
                },
                Ok(response) => {
                    warn!(
                        version = %version,
                        status = %response.status,
                        message = response.message.as_deref().unwrap_or(""),
                        "structured source declined"
                    );
                }
                Err(err) => {
                    warn!(version = %version, error = %err, "structured source failed");
                }
            }
        }
        None
    }
}

#[async_trait]
impl Extractor for PrimaryExtractor {
    fn method(&self) -> Method {
        Method::Primary
    }

    async fn extract(&self, page_url: &str) -> ExtractionResult<MediaDraft> {
        let (version, post) = self
            .first_successful_post(page_url)
            .await
            .ok_or(ExtractionError::NoStructuredData)?;
        let draft = self.normalizer.from_post(page_url, post)?;
        info!(url = %page_url, version = %version, video_id = %draft.video_id, "structured data extracted");
        Ok(draft)
    }
}
