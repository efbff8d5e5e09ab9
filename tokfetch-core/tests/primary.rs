mod support;

use std::sync::Arc;

use serde_json::json;
use support::{post_with_video, ScriptedSource, SourceReply, PAGE_URL};
use tokfetch_core::primary::{RawPost, RawVideo, StructuredResponse};
use tokfetch_core::{
    ExtractionError, Extractor, MessagesSection, Method, Normalizer, PrimaryExtractor,
};

fn extractor(source: ScriptedSource) -> (PrimaryExtractor, Arc<ScriptedSource>) {
    let source = Arc::new(source);
    let extractor = PrimaryExtractor::new(
        source.clone(),
        vec!["v1".into(), "v2".into(), "v3".into()],
        Normalizer::new(MessagesSection::default()),
    );
    (extractor, source)
}

#[tokio::test]
async fn first_successful_version_wins() {
    let (extractor, source) = extractor(
        ScriptedSource::default()
            .with("v1", SourceReply::Unreachable)
            .with("v2", SourceReply::Declined("rate limited"))
            .with(
                "v3",
                SourceReply::Success(post_with_video(RawVideo::List(vec![
                    "a.mp4".into(),
                    "b.mp4".into(),
                ]))),
            ),
    );

    let draft = extractor.extract(PAGE_URL).await.unwrap();
    assert_eq!(draft.video_url, "a.mp4");
    assert_eq!(draft.video_id, "7123456789");
    assert_eq!(source.asked(), vec!["v1", "v2", "v3"]);
    assert_eq!(extractor.method(), Method::Primary);
}

#[tokio::test]
async fn later_versions_are_not_queried_after_success() {
    let (extractor, source) = extractor(ScriptedSource::default().with(
        "v1",
        SourceReply::Success(post_with_video(RawVideo::Single("v.mp4".into()))),
    ));

    extractor.extract(PAGE_URL).await.unwrap();
    assert_eq!(source.asked(), vec!["v1"]);
}

#[tokio::test]
async fn no_answering_version_is_no_structured_data() {
    let (extractor, source) = extractor(
        ScriptedSource::default()
            .with("v1", SourceReply::Declined("private video"))
            .with("v2", SourceReply::Unreachable),
    );

    let err = extractor.extract(PAGE_URL).await.unwrap_err();
    assert!(matches!(err, ExtractionError::NoStructuredData));
    assert_eq!(source.asked().len(), 3);
}

#[tokio::test]
async fn success_without_video_is_not_retried() {
    let (extractor, source) = extractor(
        ScriptedSource::default()
            .with("v1", SourceReply::Success(RawPost::default()))
            .with(
                "v2",
                SourceReply::Success(post_with_video(RawVideo::Single("v.mp4".into()))),
            ),
    );

    let err = extractor.extract(PAGE_URL).await.unwrap_err();
    assert!(matches!(err, ExtractionError::NoVideoInPayload));
    assert_eq!(source.asked(), vec!["v1"]);
}

#[test]
fn envelope_decodes_library_shapes() {
    let response: StructuredResponse = serde_json::from_value(json!({
        "status": "success",
        "result": {
            "id": 7123456789u64,
            "desc": "dance",
            "author": { "nickname": "Dancer", "uniqueId": "dancer" },
            "cover": ["https://cdn/cover.jpg"],
            "duration": 65,
            "playCount": 2500000,
            "diggCount": 1500,
            "video": { "noWatermark": "https://cdn/clean.mp4", "watermark": "https://cdn/marked.mp4" },
            "music": { "id": 1 },
            "musicInfo": { "title": "tune", "playUrl": "https://cdn/tune.mp3" }
        }
    }))
    .unwrap();
    assert!(response.is_success());

    let draft = Normalizer::new(MessagesSection::default())
        .from_post(PAGE_URL, response.result.unwrap())
        .unwrap();
    assert_eq!(draft.video_id, "7123456789");
    assert_eq!(draft.title, "dance");
    assert_eq!(draft.author, "Dancer");
    assert_eq!(draft.author_username, "dancer");
    assert_eq!(draft.thumbnail_url.as_deref(), Some("https://cdn/cover.jpg"));
    assert_eq!(draft.duration_label, "1:05");
    assert_eq!(draft.views_label, "2.5M");
    assert_eq!(draft.likes_label, "1.5K");
    assert_eq!(draft.video_url, "https://cdn/clean.mp4");
    assert_eq!(draft.audio_url.as_deref(), Some("https://cdn/tune.mp3"));
    assert_eq!(draft.music_title, "tune");
}

#[test]
fn loosely_typed_payload_still_yields_the_video() {
    let response: StructuredResponse = serde_json::from_value(json!({
        "status": "success",
        "result": {
            "id": "7123456789",
            "duration": "65",
            "author": "someone",
            "playCount": -1,
            "video": ["https://cdn/a.mp4"]
        }
    }))
    .unwrap();

    let draft = Normalizer::new(MessagesSection::default())
        .from_post(PAGE_URL, response.result.unwrap())
        .unwrap();
    assert_eq!(draft.video_url, "https://cdn/a.mp4");
    assert_eq!(draft.duration_label, "1:05");
    assert_eq!(draft.author, "Unknown");
    assert_eq!(draft.views_label, "0");
}
