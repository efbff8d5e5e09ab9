use serde::{Deserialize, Serialize};

use crate::config::SelectorSection;

use super::error::{BrowserError, BrowserResult};

/// Page fields read from the DOM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedPage {
    pub title: String,
    pub author: String,
    pub thumbnail: String,
    pub media_src: Option<String>,
}

/// Builds the in-page script for a selector set and interprets its output.
#[derive(Debug, Clone)]
pub struct PageScraper {
    script: String,
}

/// One value per configured selector, in configuration order.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawScrapePayload {
    title: Vec<String>,
    author: Vec<String>,
    thumbnail: Vec<String>,
    media_src: Option<String>,
}

impl PageScraper {
    pub fn new(selectors: &SelectorSection, media_selector: &str) -> BrowserResult<Self> {
        let script = build_script(selectors, media_selector)?;
        Ok(Self { script })
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn interpret(&self, value: serde_json::Value) -> BrowserResult<ScrapedPage> {
        let payload: RawScrapePayload = serde_json::from_value(value)
            .map_err(|err| BrowserError::Script(format!("failed to parse scrape payload: {err}")))?;
        let author = first_non_empty(&payload.author);
        Ok(ScrapedPage {
            title: first_non_empty(&payload.title),
            author: author.trim_start_matches('@').trim().to_string(),
            thumbnail: first_non_empty(&payload.thumbnail),
            media_src: payload
                .media_src
                .map(|src| src.trim().to_string())
                .filter(|src| !src.is_empty()),
        })
    }
}

fn first_non_empty(values: &[String]) -> String {
    values
        .iter()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn build_script(selectors: &SelectorSection, media_selector: &str) -> BrowserResult<String> {
    let title = to_js(&selectors.title)?;
    let author = to_js(&selectors.author)?;
    let thumbnail = to_js(&selectors.thumbnail)?;
    let media = to_js(media_selector)?;
    Ok(format!(
        r#"
(() => {{
    const pick = (sel) => {{
        try {{
            return document.querySelector(sel);
        }} catch (_) {{
            return null;
        }}
    }};
    const text = (sel) => {{
        const el = pick(sel);
        return el && el.textContent ? el.textContent.trim() : '';
    }};
    const src = (sel) => {{
        const el = pick(sel);
        return el && el.src ? String(el.src) : '';
    }};
    const media = pick({media});
    return {{
        title: {title}.map((sel) => text(sel)),
        author: {author}.map((sel) => text(sel)),
        thumbnail: {thumbnail}.map((sel) => src(sel)),
        media_src: media && media.src ? String(media.src) : null
    }};
}})()
"#
    ))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> BrowserResult<String> {
    serde_json::to_string(value)
        .map_err(|err| BrowserError::Configuration(format!("selector encoding failed: {err}")))
}
