use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MessagesSection;
use crate::extractor::{ExtractionError, ExtractionResult};
use crate::fallback::Harvest;
use crate::format::{derive_video_id, format_count, format_duration};
use crate::primary::RawPost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Primary,
    Fallback,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Canonical media fields as produced by an extractor, before the
/// orchestrator tags them with a [`Method`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDraft {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub author_username: String,
    pub thumbnail_url: Option<String>,
    pub duration_label: String,
    pub views_label: String,
    pub likes_label: String,
    pub comments_label: String,
    pub shares_label: String,
    pub video_url: String,
    pub audio_url: Option<String>,
    pub music_title: String,
}

impl MediaDraft {
    /// Draft with every optional field at its placeholder value.
    pub fn new(
        video_id: impl Into<String>,
        video_url: impl Into<String>,
        messages: &MessagesSection,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            title: messages.default_title.clone(),
            author: messages.unknown_author.clone(),
            author_username: String::new(),
            thumbnail_url: None,
            duration_label: messages.unknown_duration.clone(),
            views_label: "0".into(),
            likes_label: "0".into(),
            comments_label: "0".into(),
            shares_label: "0".into(),
            video_url: video_url.into(),
            audio_url: None,
            music_title: messages.original_sound.clone(),
        }
    }

    /// Attaches the producing strategy. Returns `None` when the draft has no
    /// video URL, which is never a valid result.
    pub fn into_result(self, method: Method) -> Option<MediaResult> {
        if self.video_url.trim().is_empty() || self.video_id.is_empty() {
            return None;
        }
        Some(MediaResult {
            media: self,
            method,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaResult {
    #[serde(flatten)]
    pub media: MediaDraft,
    pub method: Method,
}

/// Maps strategy-specific payloads onto [`MediaDraft`].
#[derive(Debug, Clone)]
pub struct Normalizer {
    messages: MessagesSection,
}

impl Normalizer {
    pub fn new(messages: MessagesSection) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &MessagesSection {
        &self.messages
    }

    pub fn from_post(&self, page_url: &str, post: RawPost) -> ExtractionResult<MediaDraft> {
        let video_url = post
            .video
            .as_ref()
            .and_then(|video| video.select())
            .ok_or(ExtractionError::NoVideoInPayload)?;

        let video_id = non_empty(post.id.clone()).unwrap_or_else(|| derive_video_id(page_url));
        let mut draft = MediaDraft::new(video_id, video_url, &self.messages);

        if let Some(title) = non_empty(post.title.clone()).or_else(|| non_empty(post.desc.clone()))
        {
            draft.title = title;
        }

        let nickname = post.author.as_ref().and_then(|a| non_empty(a.nickname.clone()));
        let unique_id = post.author.as_ref().and_then(|a| non_empty(a.unique_id.clone()));
        if let Some(author) = nickname.or_else(|| unique_id.clone()) {
            draft.author = author;
        }
        draft.author_username = unique_id.unwrap_or_default();

        draft.thumbnail_url = [&post.cover, &post.dynamic_cover, &post.origin_cover]
            .into_iter()
            .find_map(|field| field.as_ref().and_then(|value| value.first()));

        if let Some(seconds) = post.duration.filter(|s| *s > 0.0) {
            draft.duration_label = format_duration(seconds);
        }
        draft.views_label = count_label(post.play_count);
        draft.likes_label = count_label(post.digg_count);
        draft.comments_label = count_label(post.comment_count);
        draft.shares_label = count_label(post.share_count);

        draft.audio_url = post.music_url().or_else(|| {
            post.music_info
                .as_ref()
                .and_then(|info| non_empty(info.play_url.clone()))
        });
        if let Some(title) = post
            .music_info
            .as_ref()
            .and_then(|info| non_empty(info.title.clone()))
        {
            draft.music_title = title;
        }

        Ok(draft)
    }

    pub fn from_harvest(&self, page_url: &str, harvest: Harvest) -> ExtractionResult<MediaDraft> {
        let video_url = harvest.video_url.ok_or(ExtractionError::NoVideoFound)?;
        let mut draft = MediaDraft::new(derive_video_id(page_url), video_url, &self.messages);
        if let Some(title) = non_empty(Some(harvest.title)) {
            draft.title = title;
        }
        match non_empty(Some(harvest.author)) {
            Some(author) => {
                draft.author_username = author.clone();
                draft.author = author;
            }
            None => draft.author = self.messages.fallback_author.clone(),
        }
        draft.thumbnail_url = non_empty(Some(harvest.thumbnail));
        draft.audio_url = harvest.audio_url;
        Ok(draft)
    }
}

fn count_label(value: Option<u64>) -> String {
    value.map(format_count).unwrap_or_else(|| "0".to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
