//! Browser-driven extraction: load the page in an isolated Chromium session,
//! record media responses, scrape the visible fields, then reconcile.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use tokio::runtime::Handle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::browser::{
    BrowserError, BrowserSession, BrowserSessionFactory, MediaCandidates, PageScraper,
    ScrapedPage, ViewportSpec,
};
use crate::config::{BrowserConfig, SelectorSection, DEFAULT_USER_AGENT};
use crate::extractor::{ExtractionError, ExtractionResult, Extractor};
use crate::media::{MediaDraft, Method, Normalizer};

/// Scraped fields plus the reconciled media URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Harvest {
    pub title: String,
    pub author: String,
    pub thumbnail: String,
    pub video_url: Option<String>,
    pub audio_url: Option<String>,
}

impl Harvest {
    /// The media element's own source wins; network candidates fill in.
    /// `blob:` sources point at in-page buffers and are skipped.
    pub fn reconcile(page: ScrapedPage, candidates: &MediaCandidates) -> Self {
        let video_url = page
            .media_src
            .filter(|src| !src.starts_with("blob:"))
            .or_else(|| candidates.best_video().map(str::to_string));
        Self {
            title: page.title,
            author: page.author,
            thumbnail: page.thumbnail,
            video_url,
            audio_url: candidates.first_audio().map(str::to_string),
        }
    }
}

pub struct FallbackExtractor {
    sessions: Arc<dyn BrowserSessionFactory>,
    config: Arc<BrowserConfig>,
    scraper: PageScraper,
    normalizer: Normalizer,
}

impl FallbackExtractor {
    pub fn new(
        sessions: Arc<dyn BrowserSessionFactory>,
        config: BrowserConfig,
        selectors: &SelectorSection,
        normalizer: Normalizer,
    ) -> Result<Self, BrowserError> {
        let scraper = PageScraper::new(selectors, &config.media_selector)?;
        Ok(Self {
            sessions,
            config: Arc::new(config),
            scraper,
            normalizer,
        })
    }

    fn select_user_agent(&self) -> String {
        let mut rng = rand::thread_rng();
        self.config
            .user_agents
            .pool
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        page_url: &str,
    ) -> ExtractionResult<Harvest> {
        let timeouts = &self.config.timeouts;
        let user_agent = self.select_user_agent();
        session
            .configure(&user_agent, &ViewportSpec::from(&self.config.viewport))
            .await?;
        session.enable_response_capture().await?;

        timeout(
            timeouts.navigation(),
            session.navigate(page_url, timeouts.network_idle()),
        )
        .await
        .map_err(|_| ExtractionError::NavigationTimeout)??;

        timeout(
            timeouts.media_wait(),
            session.wait_for_selector(&self.config.media_selector, timeouts.poll_interval()),
        )
        .await
        .map_err(|_| ExtractionError::NoMediaElement)??;

        let raw = session.evaluate(self.scraper.script()).await?;
        let page = self.scraper.interpret(raw)?;

        let mut candidates = MediaCandidates::default();
        candidates.extend(session.drain_responses());
        debug!(
            session = %session.id(),
            responses = candidates.responses_observed(),
            video = candidates.video().len(),
            audio = candidates.audio().len(),
            "network capture finished"
        );
        Ok(Harvest::reconcile(page, &candidates))
    }
}

/// Owns an open session until it is released. Dropping an unreleased guard,
/// e.g. when the caller abandons the extraction, closes the session on the
/// current runtime.
struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session(&mut self) -> Option<&mut dyn BrowserSession> {
        match self.session.as_mut() {
            Some(session) => Some(session.as_mut()),
            None => None,
        }
    }

    async fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            close_quietly(session.as_mut()).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                debug!(session = %session.id(), "extraction abandoned, releasing session in background");
                handle.spawn(async move {
                    close_quietly(session.as_mut()).await;
                });
            }
            Err(_) => {
                warn!(session = %session.id(), "no runtime to release abandoned browser session");
            }
        }
    }
}

async fn close_quietly(session: &mut dyn BrowserSession) {
    if let Err(err) = session.close().await {
        warn!(session = %session.id(), error = %err, "failed to release browser session");
    }
}

#[async_trait]
impl Extractor for FallbackExtractor {
    fn method(&self) -> Method {
        Method::Fallback
    }

    async fn extract(&self, page_url: &str) -> ExtractionResult<MediaDraft> {
        let mut guard = SessionGuard::new(self.sessions.open().await?);
        let outcome = match guard.session() {
            Some(session) => self.drive(session, page_url).await,
            None => Err(BrowserError::Closed.into()),
        };
        guard.release().await;
        let harvest = outcome?;
        let draft = self.normalizer.from_harvest(page_url, harvest)?;
        info!(url = %page_url, video_id = %draft.video_id, "page scraped");
        Ok(draft)
    }
}
