use std::time::Duration;

use async_trait::async_trait;

use crate::config::ViewportSection;

use super::error::BrowserResult;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportSpec {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl From<&ViewportSection> for ViewportSpec {
    fn from(section: &ViewportSection) -> Self {
        Self {
            width: section.width,
            height: section.height,
            device_scale_factor: section.device_scale_factor,
        }
    }
}

/// A network response seen by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResponse {
    pub url: String,
    pub content_type: String,
}

impl ObservedResponse {
    pub fn new(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.into(),
        }
    }
}

/// One isolated browser session. Callers must `close` it on every path.
#[async_trait]
pub trait BrowserSession: Send {
    fn id(&self) -> &str;

    async fn configure(&mut self, user_agent: &str, viewport: &ViewportSpec) -> BrowserResult<()>;

    /// Starts recording every response the page receives.
    async fn enable_response_capture(&mut self) -> BrowserResult<()>;

    /// Loads `url` and returns once no response arrived for `idle`.
    /// Unbounded; callers apply their own timeout.
    async fn navigate(&mut self, url: &str, idle: Duration) -> BrowserResult<()>;

    /// Polls until `selector` matches. Unbounded like `navigate`.
    async fn wait_for_selector(&mut self, selector: &str, poll: Duration) -> BrowserResult<()>;

    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Responses recorded since the previous call.
    fn drain_responses(&mut self) -> Vec<ObservedResponse>;

    async fn close(&mut self) -> BrowserResult<()>;
}

#[async_trait]
pub trait BrowserSessionFactory: Send + Sync {
    async fn open(&self) -> BrowserResult<Box<dyn BrowserSession>>;
}
