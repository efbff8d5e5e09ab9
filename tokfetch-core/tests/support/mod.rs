#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokfetch_core::browser::{
    BrowserError, BrowserResult, BrowserSession, BrowserSessionFactory, ObservedResponse,
    ViewportSpec,
};
use tokfetch_core::primary::{RawPost, RawVideo, StructuredResponse};
use tokfetch_core::{
    ExtractionError, ExtractionResult, Extractor, MediaDraft, MessagesSection, Method,
    SourceError, StructuredSource,
};

pub const PAGE_URL: &str = "https://www.tiktok.com/@dancer/video/7123456789";

/// Extractor returning a fixed draft, or failing when none is set.
pub struct StubExtractor {
    method: Method,
    draft: Option<MediaDraft>,
    calls: AtomicUsize,
}

impl StubExtractor {
    pub fn succeeding(method: Method, video_url: &str) -> Arc<Self> {
        Arc::new(Self {
            method,
            draft: Some(MediaDraft::new(
                "7123456789",
                video_url,
                &MessagesSection::default(),
            )),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(method: Method) -> Arc<Self> {
        Arc::new(Self {
            method,
            draft: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for StubExtractor {
    fn method(&self) -> Method {
        self.method
    }

    async fn extract(&self, _page_url: &str) -> ExtractionResult<MediaDraft> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.draft {
            Some(draft) => Ok(draft.clone()),
            None => Err(match self.method {
                Method::Primary => ExtractionError::NoStructuredData,
                Method::Fallback => ExtractionError::NoVideoFound,
            }),
        }
    }
}

pub enum SourceReply {
    Success(RawPost),
    Declined(&'static str),
    Unreachable,
}

/// Structured source answering per version hint; unknown hints fail.
#[derive(Default)]
pub struct ScriptedSource {
    replies: HashMap<String, SourceReply>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn with(mut self, version: &str, reply: SourceReply) -> Self {
        self.replies.insert(version.to_string(), reply);
        self
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredSource for ScriptedSource {
    async fn fetch(
        &self,
        _page_url: &str,
        version: &str,
    ) -> Result<StructuredResponse, SourceError> {
        self.asked.lock().unwrap().push(version.to_string());
        match self.replies.get(version) {
            Some(SourceReply::Success(post)) => Ok(StructuredResponse::success(post.clone())),
            Some(SourceReply::Declined(message)) => Ok(StructuredResponse::error(*message)),
            Some(SourceReply::Unreachable) => Err(SourceError::Status(503)),
            None => Err(SourceError::UnknownVersion(version.to_string())),
        }
    }
}

pub fn post_with_video(video: RawVideo) -> RawPost {
    RawPost {
        video: Some(video),
        ..RawPost::default()
    }
}

/// What a scripted page does at each protocol step.
#[derive(Clone, Default)]
pub struct PageScript {
    pub navigation_hangs: bool,
    pub media_never_appears: bool,
    pub scrape: Value,
    pub responses: Vec<ObservedResponse>,
    pub close_fails: bool,
}

#[derive(Default)]
pub struct SessionLog {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub user_agents: Mutex<Vec<String>>,
}

pub struct ScriptedFactory {
    script: PageScript,
    pub log: Arc<SessionLog>,
}

impl ScriptedFactory {
    pub fn new(script: PageScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            log: Arc::new(SessionLog::default()),
        })
    }

    pub fn opened(&self) -> usize {
        self.log.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.log.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserSessionFactory for ScriptedFactory {
    async fn open(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let n = self.log.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            id: format!("scripted-{n}"),
            script: self.script.clone(),
            log: Arc::clone(&self.log),
            capturing: false,
        }))
    }
}

struct ScriptedSession {
    id: String,
    script: PageScript,
    log: Arc<SessionLog>,
    capturing: bool,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn configure(&mut self, user_agent: &str, _viewport: &ViewportSpec) -> BrowserResult<()> {
        self.log
            .user_agents
            .lock()
            .unwrap()
            .push(user_agent.to_string());
        Ok(())
    }

    async fn enable_response_capture(&mut self) -> BrowserResult<()> {
        self.capturing = true;
        Ok(())
    }

    async fn navigate(&mut self, _url: &str, idle: Duration) -> BrowserResult<()> {
        if self.script.navigation_hangs {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(idle).await;
        Ok(())
    }

    async fn wait_for_selector(&mut self, _selector: &str, poll: Duration) -> BrowserResult<()> {
        loop {
            if !self.script.media_never_appears {
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn evaluate(&mut self, _script: &str) -> BrowserResult<Value> {
        Ok(self.script.scrape.clone())
    }

    fn drain_responses(&mut self) -> Vec<ObservedResponse> {
        if self.capturing {
            std::mem::take(&mut self.script.responses)
        } else {
            Vec::new()
        }
    }

    async fn close(&mut self) -> BrowserResult<()> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        if self.script.close_fails {
            Err(BrowserError::Unexpected("browser already gone".into()))
        } else {
            Ok(())
        }
    }
}
