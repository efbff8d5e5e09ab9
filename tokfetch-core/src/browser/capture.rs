use std::collections::HashSet;

use serde::Serialize;

use super::session::ObservedResponse;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "aac", "ogg", "wav"];

/// Video and audio URLs harvested from network traffic, each kept once in
/// arrival order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MediaCandidates {
    video: Vec<String>,
    audio: Vec<String>,
    #[serde(skip)]
    seen_video: HashSet<String>,
    #[serde(skip)]
    seen_audio: HashSet<String>,
    responses_observed: u64,
}

impl MediaCandidates {
    pub fn observe(&mut self, response: &ObservedResponse) {
        self.responses_observed = self.responses_observed.saturating_add(1);
        let content_type = response.content_type.to_ascii_lowercase();
        let extension = path_extension(&response.url);
        let extension = extension.as_deref();

        let is_video = content_type.contains("video")
            || extension.is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext));
        let is_audio = content_type.contains("audio")
            || extension.is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext));

        if is_video && self.seen_video.insert(response.url.clone()) {
            self.video.push(response.url.clone());
        }
        if is_audio && self.seen_audio.insert(response.url.clone()) {
            self.audio.push(response.url.clone());
        }
    }

    pub fn extend<I>(&mut self, responses: I)
    where
        I: IntoIterator<Item = ObservedResponse>,
    {
        for response in responses {
            self.observe(&response);
        }
    }

    pub fn video(&self) -> &[String] {
        &self.video
    }

    pub fn audio(&self) -> &[String] {
        &self.audio
    }

    pub fn responses_observed(&self) -> u64 {
        self.responses_observed
    }

    /// First candidate without a watermark marker, else the first one.
    pub fn best_video(&self) -> Option<&str> {
        self.video
            .iter()
            .find(|url| !url.contains("watermark"))
            .or_else(|| self.video.first())
            .map(String::as_str)
    }

    pub fn first_audio(&self) -> Option<&str> {
        self.audio.first().map(String::as_str)
    }
}

fn path_extension(raw: &str) -> Option<String> {
    let path = match url::Url::parse(raw) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}
