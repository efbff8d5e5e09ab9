use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Status envelope returned by a structured source for one version hint.
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<RawPost>,
}

impl StructuredResponse {
    pub fn success(post: RawPost) -> Self {
        Self {
            status: "success".into(),
            message: None,
            result: Some(post),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: Some(message.into()),
            result: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// Post metadata. Only `video` decides whether the post is usable, so every
/// other field decodes to `None` when the source sends an unexpected shape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPost {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<RawAuthor>,
    #[serde(default, deserialize_with = "lenient")]
    pub cover: Option<UrlField>,
    #[serde(default, deserialize_with = "lenient")]
    pub dynamic_cover: Option<UrlField>,
    #[serde(default, deserialize_with = "lenient")]
    pub origin_cover: Option<UrlField>,
    #[serde(default, deserialize_with = "seconds")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "count")]
    pub play_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub digg_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub comment_count: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub share_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub video: Option<RawVideo>,
    #[serde(default)]
    pub music: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub music_info: Option<RawMusicInfo>,
}

impl RawPost {
    /// `music` is only usable when the source sent a plain URL.
    pub fn music_url(&self) -> Option<String> {
        self.music
            .as_ref()
            .and_then(|value| value.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    pub nickname: Option<String>,
    #[serde(alias = "uniqueId")]
    pub unique_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMusicInfo {
    pub title: Option<String>,
    pub play_url: Option<String>,
}

/// A URL that some source versions send as a list of mirrors.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UrlField {
    Many(Vec<String>),
    One(String),
}

impl UrlField {
    pub fn first(&self) -> Option<String> {
        match self {
            Self::Many(urls) => urls.iter().find(|u| !u.trim().is_empty()).cloned(),
            Self::One(url) if !url.trim().is_empty() => Some(url.clone()),
            Self::One(_) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawVideo {
    /// The platform lists the unwatermarked variant first.
    List(Vec<String>),
    Single(String),
    Variants(VideoVariants),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoVariants {
    pub no_watermark: Option<String>,
    pub watermark: Option<String>,
}

impl RawVideo {
    pub fn select(&self) -> Option<String> {
        let candidate = match self {
            Self::List(urls) => urls.first().cloned(),
            Self::Single(url) => Some(url.clone()),
            Self::Variants(variants) => variants
                .no_watermark
                .clone()
                .filter(|u| !u.trim().is_empty())
                .or_else(|| variants.watermark.clone()),
        };
        candidate.filter(|u| !u.trim().is_empty())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| serde_json::from_value(value).ok()))
}

fn number_like(value: Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn seconds<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(number_like))
}

/// Non-negative counter; fractions are truncated, negatives dropped.
fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) if n.is_u64() => n.as_u64(),
        Some(other) => number_like(other)
            .filter(|n| *n >= 0.0)
            .map(|n| n.trunc() as u64),
        None => None,
    })
}
