use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, EventResponseReceived,
    Headers, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::handler::viewport::Viewport as ChromiumViewport;
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BrowserConfig;

use super::error::{BrowserError, BrowserResult};
use super::session::{BrowserSession, BrowserSessionFactory, ObservedResponse, ViewportSpec};

const HANDLER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
/// Requests allowed to stay open while the network counts as settled.
const IDLE_CONNECTION_ALLOWANCE: usize = 2;
const MIN_SETTLE_POLL: Duration = Duration::from_millis(10);

/// Launches one Chromium process per session, each with a throwaway profile.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: Arc<BrowserConfig>,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    fn build_chromium_config(&self, profile: &TempDir) -> BrowserResult<ChromiumConfig> {
        let viewport = ViewportSpec::from(&self.config.viewport);
        let mut builder = ChromiumConfig::builder()
            .user_data_dir(profile.path())
            .viewport(ChromiumViewport {
                width: viewport.width,
                height: viewport.height,
                device_scale_factor: Some(viewport.device_scale_factor),
                emulating_mobile: false,
                is_landscape: viewport.width >= viewport.height,
                has_touch: false,
            });

        if let Some(path) = &self.config.chromium.executable_path {
            builder = builder.chrome_executable(path);
        }
        if !self.config.chromium.headless {
            builder = builder.with_head();
        }
        if !self.config.chromium.sandbox {
            builder = builder.no_sandbox();
        }

        let mut args = vec![format!("--window-size={},{}", viewport.width, viewport.height)];
        if self.config.chromium.disable_gpu {
            args.push("--disable-gpu".into());
        }
        args.extend(self.config.chromium.extra_args.iter().cloned());
        builder = builder.args(args);

        builder.build().map_err(BrowserError::Configuration)
    }
}

#[async_trait]
impl BrowserSessionFactory for ChromiumLauncher {
    async fn open(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let profile = tempfile::Builder::new().prefix("tokfetch-profile-").tempdir()?;
        let chromium_config = self.build_chromium_config(&profile)?;
        let id = Uuid::new_v4().to_string();
        info!(session = %id, profile = %profile.path().display(), "Launching Chromium instance");

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Chromium handler reported error");
                }
            }
        });

        let mut session = ChromiumSession {
            id,
            browser,
            page: None,
            handler_task: Some(handler_task),
            listener_tasks: Vec::new(),
            capture: Arc::new(Mutex::new(CaptureBuffer::new())),
            profile: Some(profile),
        };
        match session.browser.new_page(CreateTargetParams::new("about:blank")).await {
            Ok(page) => {
                session.page = Some(page);
                Ok(Box::new(session))
            }
            Err(err) => {
                if let Err(close_err) = session.close().await {
                    warn!(session = %session.id, error = %close_err, "failed to tear down half-open session");
                }
                Err(err.into())
            }
        }
    }
}

#[derive(Debug)]
struct CaptureBuffer {
    responses: Vec<ObservedResponse>,
    in_flight: HashSet<String>,
    settled_since: Option<Instant>,
}

impl CaptureBuffer {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            in_flight: HashSet::new(),
            settled_since: Some(Instant::now()),
        }
    }

    fn reset_activity(&mut self) {
        self.in_flight.clear();
        self.settled_since = Some(Instant::now());
    }

    fn request_started(&mut self, request_id: String) {
        self.in_flight.insert(request_id);
        self.refresh();
    }

    fn request_done(&mut self, request_id: &str) {
        self.in_flight.remove(request_id);
        self.refresh();
    }

    fn refresh(&mut self) {
        if self.in_flight.len() > IDLE_CONNECTION_ALLOWANCE {
            self.settled_since = None;
        } else if self.settled_since.is_none() {
            self.settled_since = Some(Instant::now());
        }
    }

    /// How long at most [`IDLE_CONNECTION_ALLOWANCE`] requests have been open.
    fn quiet_for(&self) -> Option<Duration> {
        self.settled_since.map(|since| since.elapsed())
    }
}

#[derive(Debug)]
pub struct ChromiumSession {
    id: String,
    browser: Browser,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    listener_tasks: Vec<JoinHandle<()>>,
    capture: Arc<Mutex<CaptureBuffer>>,
    profile: Option<TempDir>,
}

impl ChromiumSession {
    fn page(&self) -> BrowserResult<&Page> {
        self.page.as_ref().ok_or(BrowserError::Closed)
    }

    fn with_capture<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CaptureBuffer) -> R,
    {
        let mut guard = self
            .capture
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn configure(&mut self, user_agent: &str, viewport: &ViewportSpec) -> BrowserResult<()> {
        let page = self.page()?;
        let params = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent.to_string())
            .build()
            .map_err(BrowserError::Configuration)?;
        page.set_user_agent(params).await?;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            viewport.device_scale_factor,
            false,
        ))
        .await?;
        debug!(session = %self.id, ua = %user_agent, width = viewport.width, height = viewport.height, "page configured");
        Ok(())
    }

    async fn enable_response_capture(&mut self) -> BrowserResult<()> {
        if !self.listener_tasks.is_empty() {
            return Ok(());
        }
        let page = self.page()?;
        let requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let responses = page.event_listener::<EventResponseReceived>().await?;
        let finished = page.event_listener::<EventLoadingFinished>().await?;
        let failed = page.event_listener::<EventLoadingFailed>().await?;

        self.listener_tasks = vec![
            spawn_listener(requests, &self.capture, |buffer, event: &EventRequestWillBeSent| {
                buffer.request_started(event.request_id.inner().clone());
            }),
            spawn_listener(responses, &self.capture, |buffer, event: &EventResponseReceived| {
                let response = &event.response;
                let content_type = header_content_type(&response.headers)
                    .unwrap_or_else(|| response.mime_type.clone());
                buffer
                    .responses
                    .push(ObservedResponse::new(response.url.clone(), content_type));
            }),
            spawn_listener(finished, &self.capture, |buffer, event: &EventLoadingFinished| {
                buffer.request_done(event.request_id.inner());
            }),
            spawn_listener(failed, &self.capture, |buffer, event: &EventLoadingFailed| {
                buffer.request_done(event.request_id.inner());
            }),
        ];
        Ok(())
    }

    async fn navigate(&mut self, url: &str, idle: Duration) -> BrowserResult<()> {
        self.with_capture(CaptureBuffer::reset_activity);
        let page = self.page()?;
        page.goto(url).await?;
        page.wait_for_navigation().await?;
        loop {
            match self.with_capture(|buffer| buffer.quiet_for()) {
                Some(quiet) if quiet >= idle => return Ok(()),
                Some(quiet) => sleep(idle - quiet).await,
                None => sleep(idle.max(MIN_SETTLE_POLL)).await,
            }
        }
    }

    async fn wait_for_selector(&mut self, selector: &str, poll: Duration) -> BrowserResult<()> {
        let page = self.page()?;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            sleep(poll).await;
        }
    }

    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value> {
        self.page()?
            .evaluate(script)
            .await
            .map_err(|err| BrowserError::Script(format!("failed to evaluate script: {err}")))?
            .into_value::<serde_json::Value>()
            .map_err(|err| BrowserError::Script(format!("failed to decode script result: {err}")))
    }

    fn drain_responses(&mut self) -> Vec<ObservedResponse> {
        self.with_capture(|buffer| std::mem::take(&mut buffer.responses))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        for listener in self.listener_tasks.drain(..) {
            listener.abort();
        }
        self.page = None;
        let closed = self.browser.close().await;
        if let Some(handle) = self.handler_task.take() {
            match timeout(HANDLER_SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(session = %self.id, error = %err, "Browser handler join error");
                }
                Err(_) => {
                    warn!(session = %self.id, "Browser handler did not stop in time");
                }
            }
        }
        if let Some(profile) = self.profile.take() {
            if let Err(err) = profile.close() {
                warn!(session = %self.id, error = %err, "failed to remove profile directory");
            }
        }
        info!(session = %self.id, "Chromium instance shut down");
        closed.map(|_| ()).map_err(BrowserError::from)
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        for listener in self.listener_tasks.drain(..) {
            listener.abort();
        }
        // The Chromium child is killed when `browser` drops; the profile
        // directory goes with `profile`.
        if let Some(handle) = self.handler_task.take() {
            warn!(session = %self.id, "ChromiumSession dropped without explicit close, tearing down");
            handle.abort();
        }
    }
}

fn spawn_listener<S, E, F>(
    mut events: S,
    capture: &Arc<Mutex<CaptureBuffer>>,
    mut apply: F,
) -> JoinHandle<()>
where
    S: Stream<Item = Arc<E>> + Unpin + Send + 'static,
    E: Send + Sync + 'static,
    F: FnMut(&mut CaptureBuffer, &E) + Send + 'static,
{
    let capture = Arc::clone(capture);
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let mut guard = capture
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            apply(&mut guard, &event);
        }
    })
}

fn header_content_type(headers: &Headers) -> Option<String> {
    let value = serde_json::to_value(headers).ok()?;
    value.as_object()?.iter().find_map(|(name, value)| {
        if name.eq_ignore_ascii_case("content-type") {
            value.as_str().map(str::to_string)
        } else {
            None
        }
    })
}
