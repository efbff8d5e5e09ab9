mod support;

use std::sync::Arc;

use support::{post_with_video, ScriptedSource, SourceReply, StubExtractor, PAGE_URL};
use tokfetch_core::primary::RawVideo;
use tokfetch_core::{
    Extractor, MessagesSection, Method, Normalizer, Orchestrator, OrchestratorError,
    PrimaryExtractor, StatsCounters, StatsRegistry, ValidationError,
};

fn orchestrator(strategies: Vec<Arc<dyn Extractor>>) -> Orchestrator {
    Orchestrator::new(
        strategies,
        Arc::new(StatsRegistry::new()),
        vec!["tiktok.com".into()],
        MessagesSection::default(),
    )
}

#[tokio::test]
async fn primary_success_skips_fallback() {
    let primary = StubExtractor::succeeding(Method::Primary, "https://cdn/primary.mp4");
    let fallback = StubExtractor::succeeding(Method::Fallback, "https://cdn/fallback.mp4");
    let orchestrator = orchestrator(vec![primary.clone(), fallback.clone()]);

    let result = orchestrator.download(PAGE_URL).await.unwrap();
    assert_eq!(result.method, Method::Primary);
    assert_eq!(result.media.video_url, "https://cdn/primary.mp4");
    assert_eq!(fallback.calls(), 0);
    assert_eq!(
        orchestrator.stats().snapshot(),
        StatsCounters {
            primary_successes: 1,
            fallback_successes: 0,
            total_failures: 0,
        }
    );
}

#[tokio::test]
async fn fallback_runs_after_primary_failure() {
    let primary = StubExtractor::failing(Method::Primary);
    let fallback = StubExtractor::succeeding(Method::Fallback, "https://cdn/clean.mp4");
    let orchestrator = orchestrator(vec![primary.clone(), fallback.clone()]);

    let result = orchestrator.download(PAGE_URL).await.unwrap();
    assert_eq!(result.method, Method::Fallback);
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(
        orchestrator.stats().snapshot(),
        StatsCounters {
            primary_successes: 0,
            fallback_successes: 1,
            total_failures: 0,
        }
    );
}

#[tokio::test]
async fn exhausted_chain_reports_generic_message() {
    let orchestrator = orchestrator(vec![
        StubExtractor::failing(Method::Primary),
        StubExtractor::failing(Method::Fallback),
    ]);

    let err = orchestrator.download(PAGE_URL).await.unwrap_err();
    match err {
        OrchestratorError::Download(err) => {
            assert_eq!(err.message, "All methods failed. Please try again later.")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        orchestrator.stats().snapshot(),
        StatsCounters {
            primary_successes: 0,
            fallback_successes: 0,
            total_failures: 1,
        }
    );
}

#[tokio::test]
async fn draft_without_video_url_counts_as_strategy_failure() {
    let primary = StubExtractor::succeeding(Method::Primary, "");
    let fallback = StubExtractor::succeeding(Method::Fallback, "https://cdn/clean.mp4");
    let orchestrator = orchestrator(vec![primary, fallback]);

    let result = orchestrator.download(PAGE_URL).await.unwrap();
    assert_eq!(result.method, Method::Fallback);
    assert!(!result.media.video_url.is_empty());
}

#[tokio::test]
async fn invalid_urls_never_reach_strategies_or_counters() {
    let primary = StubExtractor::succeeding(Method::Primary, "https://cdn/primary.mp4");
    let orchestrator = orchestrator(vec![primary.clone()]);

    let err = orchestrator.download("").await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Validation(ValidationError::MissingUrl(_))
    ));
    let err = orchestrator
        .download("https://example.com/video/1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Validation(ValidationError::UnsupportedUrl(_))
    ));

    assert_eq!(primary.calls(), 0);
    assert_eq!(orchestrator.stats().snapshot(), StatsCounters::default());
}

#[tokio::test]
async fn payload_without_video_falls_through_to_fallback() {
    let source = ScriptedSource::default()
        .with("v1", SourceReply::Success(post_with_video(RawVideo::List(vec![]))));
    let primary = Arc::new(PrimaryExtractor::new(
        Arc::new(source),
        vec!["v1".into()],
        Normalizer::new(MessagesSection::default()),
    ));
    let fallback = StubExtractor::succeeding(Method::Fallback, "https://cdn/clean.mp4");
    let orchestrator = orchestrator(vec![primary, fallback.clone()]);

    let result = orchestrator.download(PAGE_URL).await.unwrap();
    assert_eq!(result.method, Method::Fallback);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(orchestrator.stats().snapshot().fallback_successes, 1);
}

#[tokio::test]
async fn concurrent_downloads_count_every_request() {
    let orchestrator = Arc::new(orchestrator(vec![StubExtractor::succeeding(
        Method::Primary,
        "https://cdn/primary.mp4",
    )]));
    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.download(PAGE_URL).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
    assert_eq!(orchestrator.stats().snapshot().primary_successes, 16);
}
