//! Runs the extraction strategies in priority order for one page link and
//! keeps the outcome counters.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::browser::{BrowserError, ChromiumLauncher};
use crate::config::{MessagesSection, TokfetchConfig};
use crate::extractor::Extractor;
use crate::fallback::FallbackExtractor;
use crate::media::{MediaResult, Normalizer};
use crate::primary::{HttpStructuredSource, PrimaryExtractor, SourceError};
use crate::stats::StatsRegistry;

/// Caller mistakes. Never counted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    MissingUrl(String),
    #[error("{0}")]
    UnsupportedUrl(String),
}

/// Every strategy failed; `message` is the user-facing text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DownloadError {
    pub message: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Download(#[from] DownloadError),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("primary extractor setup failed: {0}")]
    Primary(#[from] SourceError),
    #[error("fallback extractor setup failed: {0}")]
    Fallback(#[from] BrowserError),
}

pub struct Orchestrator {
    strategies: Vec<Arc<dyn Extractor>>,
    stats: Arc<StatsRegistry>,
    domain_markers: Vec<String>,
    messages: MessagesSection,
}

impl Orchestrator {
    pub fn new(
        strategies: Vec<Arc<dyn Extractor>>,
        stats: Arc<StatsRegistry>,
        domain_markers: Vec<String>,
        messages: MessagesSection,
    ) -> Self {
        Self {
            strategies,
            stats,
            domain_markers,
            messages,
        }
    }

    /// Wires the HTTP structured source first and the Chromium fallback second.
    pub fn from_config(
        config: &TokfetchConfig,
        stats: Arc<StatsRegistry>,
    ) -> Result<Self, BuildError> {
        let normalizer = Normalizer::new(config.messages.clone());
        let source = HttpStructuredSource::new(&config.primary)?;
        let primary = PrimaryExtractor::new(
            Arc::new(source),
            config.primary.versions.clone(),
            normalizer.clone(),
        );
        let launcher = ChromiumLauncher::new(config.browser.clone());
        let fallback = FallbackExtractor::new(
            Arc::new(launcher),
            config.browser.clone(),
            &config.selectors,
            normalizer,
        )?;
        Ok(Self::new(
            vec![Arc::new(primary), Arc::new(fallback)],
            stats,
            config.validation.domain_markers.clone(),
            config.messages.clone(),
        ))
    }

    pub fn stats(&self) -> &Arc<StatsRegistry> {
        &self.stats
    }

    pub fn validate(&self, page_url: &str) -> Result<String, ValidationError> {
        let page_url = page_url.trim();
        if page_url.is_empty() {
            return Err(ValidationError::MissingUrl(self.messages.missing_url.clone()));
        }
        let lowered = page_url.to_ascii_lowercase();
        if !self
            .domain_markers
            .iter()
            .any(|marker| lowered.contains(&marker.to_ascii_lowercase()))
        {
            return Err(ValidationError::UnsupportedUrl(
                self.messages.invalid_url.clone(),
            ));
        }
        Ok(page_url.to_string())
    }

    pub async fn download(&self, page_url: &str) -> Result<MediaResult, OrchestratorError> {
        let page_url = self.validate(page_url)?;

        for strategy in &self.strategies {
            let method = strategy.method();
            match strategy.extract(&page_url).await {
                Ok(draft) => match draft.into_result(method) {
                    Some(result) => {
                        self.stats.record_success(method);
                        info!(url = %page_url, method = %method, video_id = %result.media.video_id, "download resolved");
                        return Ok(result);
                    }
                    None => {
                        warn!(url = %page_url, method = %method, "strategy returned no video url");
                    }
                },
                Err(err) => {
                    warn!(url = %page_url, method = %method, error = %err, "strategy failed");
                }
            }
        }

        self.stats.record_failure();
        warn!(url = %page_url, strategies = self.strategies.len(), "all strategies failed");
        Err(DownloadError {
            message: self.messages.all_methods_failed.clone(),
        }
        .into())
    }
}
