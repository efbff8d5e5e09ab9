use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct TokfetchConfig {
    pub server: ServerSection,
    pub primary: PrimarySection,
    pub browser: BrowserConfig,
    pub selectors: SelectorSection,
    pub validation: ValidationSection,
    pub messages: MessagesSection,
}

impl TokfetchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.primary.versions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "primary.versions",
                reason: "at least one version hint is required".into(),
            });
        }
        if let Some(missing) = self
            .primary
            .versions
            .iter()
            .find(|version| !self.primary.endpoints.contains_key(*version))
        {
            return Err(ConfigError::Invalid {
                field: "primary.endpoints",
                reason: format!("no endpoint for version hint `{missing}`"),
            });
        }
        if self.validation.domain_markers.is_empty() {
            return Err(ConfigError::Invalid {
                field: "validation.domain_markers",
                reason: "at least one domain marker is required".into(),
            });
        }
        if self.browser.viewport.width == 0 || self.browser.viewport.height == 0 {
            return Err(ConfigError::Invalid {
                field: "browser.viewport",
                reason: format!(
                    "{}x{} is not a usable viewport",
                    self.browser.viewport.width, self.browser.viewport.height
                ),
            });
        }
        if self.browser.timeouts.navigation_seconds == 0
            || self.browser.timeouts.media_wait_seconds == 0
        {
            return Err(ConfigError::Invalid {
                field: "browser.timeouts",
                reason: "timeouts must be greater than zero".into(),
            });
        }
        if self.browser.media_selector.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "browser.media_selector",
                reason: "selector must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrimarySection {
    /// Version hints handed to the structured source, tried in order.
    pub versions: Vec<String>,
    /// Endpoint template per version hint; `{url}` is replaced by the
    /// percent-encoded page URL.
    pub endpoints: BTreeMap<String, String>,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

impl PrimarySection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

impl Default for PrimarySection {
    fn default() -> Self {
        let versions: Vec<String> = vec!["v1".into(), "v2".into(), "v3".into()];
        let endpoints = versions
            .iter()
            .map(|version| {
                let template = format!("http://127.0.0.1:3100/tiktok/{version}?url={{url}}");
                (version.clone(), template)
            })
            .collect();
        Self {
            versions,
            endpoints,
            request_timeout_seconds: 20,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chromium: ChromiumSection,
    pub user_agents: UserAgentSection,
    pub viewport: ViewportSection,
    pub timeouts: TimeoutSection,
    pub media_selector: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chromium: ChromiumSection::default(),
            user_agents: UserAgentSection::default(),
            viewport: ViewportSection::default(),
            timeouts: TimeoutSection::default(),
            media_selector: "video".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChromiumSection {
    /// Falls back to chromiumoxide's executable detection when unset.
    pub executable_path: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub disable_gpu: bool,
    pub extra_args: Vec<String>,
}

impl Default for ChromiumSection {
    fn default() -> Self {
        Self {
            executable_path: None,
            headless: true,
            sandbox: false,
            disable_gpu: true,
            extra_args: vec![
                "--disable-setuid-sandbox".into(),
                "--disable-dev-shm-usage".into(),
                "--disable-accelerated-2d-canvas".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentSection {
    pub pool: Vec<String>,
}

impl Default for UserAgentSection {
    fn default() -> Self {
        Self {
            pool: vec![DEFAULT_USER_AGENT.into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewportSection {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Default for ViewportSection {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            device_scale_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    pub navigation_seconds: u64,
    pub media_wait_seconds: u64,
    /// Navigation counts as settled once no more than two requests have been
    /// in flight for this long. Long-lived media streams may stay open.
    pub network_idle_ms: u64,
    pub poll_interval_ms: u64,
}

impl TimeoutSection {
    pub fn navigation(&self) -> Duration {
        Duration::from_secs(self.navigation_seconds)
    }

    pub fn media_wait(&self) -> Duration {
        Duration::from_secs(self.media_wait_seconds)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            navigation_seconds: 30,
            media_wait_seconds: 10,
            network_idle_ms: 500,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorSection {
    pub title: Vec<String>,
    pub author: Vec<String>,
    pub thumbnail: Vec<String>,
}

impl Default for SelectorSection {
    fn default() -> Self {
        Self {
            title: vec![
                "[data-e2e=\"browse-video-desc\"]".into(),
                ".tiktok-j2a19r-SpanText".into(),
                "h1".into(),
                ".video-meta-title".into(),
            ],
            author: vec![
                "[data-e2e=\"browse-username\"]".into(),
                ".author-uniqueId".into(),
                ".tiktok-author".into(),
            ],
            thumbnail: vec![
                "img[alt*=\"video\"]".into(),
                ".tiktok-video-thumbnail img".into(),
                "video + img".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationSection {
    pub domain_markers: Vec<String>,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            domain_markers: vec!["tiktok.com".into()],
        }
    }
}

/// User-facing strings and placeholders.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagesSection {
    pub default_title: String,
    pub unknown_author: String,
    pub fallback_author: String,
    pub unknown_duration: String,
    pub original_sound: String,
    pub missing_url: String,
    pub invalid_url: String,
    pub processing_failed: String,
    pub all_methods_failed: String,
}

impl Default for MessagesSection {
    fn default() -> Self {
        Self {
            default_title: "TikTok video".into(),
            unknown_author: "Unknown".into(),
            fallback_author: "User".into(),
            unknown_duration: "unknown".into(),
            original_sound: "original sound".into(),
            missing_url: "URL is required".into(),
            invalid_url: "Invalid TikTok URL".into(),
            processing_failed: "Failed to process the video".into(),
            all_methods_failed: "All methods failed. Please try again later.".into(),
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TokfetchConfig> {
    let config: TokfetchConfig = load_toml(path)?;
    config.validate()?;
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fixture_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../configs/tokfetch.toml");
        let config = load_config(path).expect("config should parse");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.primary.versions, vec!["v1", "v2", "v3"]);
        assert_eq!(config.browser.timeouts.navigation_seconds, 30);
        assert_eq!(config.browser.timeouts.media_wait_seconds, 10);
        assert!(config.browser.user_agents.pool.len() >= 2);
        assert_eq!(config.selectors.title[0], "[data-e2e=\"browse-video-desc\"]");
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: TokfetchConfig = toml::from_str(
            r#"
[server]
port = 8080

[messages]
default_title = "فيديو TikTok"
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.messages.default_title, "فيديو TikTok");
        assert_eq!(config.messages.original_sound, "original sound");
        assert_eq!(config.browser.viewport.width, 1920);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_version_list_is_rejected() {
        let config: TokfetchConfig = toml::from_str("[primary]\nversions = []\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "primary.versions",
                ..
            })
        ));
    }

    #[test]
    fn version_without_endpoint_is_rejected() {
        let config: TokfetchConfig =
            toml::from_str("[primary]\nversions = [\"v1\", \"v4\"]\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "primary.endpoints",
                ..
            })
        ));

        let config: TokfetchConfig = toml::from_str(
            r#"
[primary.endpoints]
v1 = "http://bridge/v1?url={url}"
"#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("v2"));
    }

    #[test]
    fn default_versions_have_endpoints() {
        let primary = PrimarySection::default();
        assert_eq!(
            primary.endpoints.get("v2").map(String::as_str),
            Some("http://127.0.0.1:3100/tiktok/v2?url={url}")
        );
        assert!(TokfetchConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config("/nonexistent/tokfetch.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tokfetch.toml"));
    }
}
