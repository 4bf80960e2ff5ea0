//! Stream resolution tests

mod common;

use common::*;
use vodplay::catalog;
use vodplay::models::{ContentItem, ContentType};
use vodplay::stream::resolver::{resolve, ResolveError};
use vodplay::tracks;

fn episode() -> ContentItem {
    catalog::normalize(&raw_episode(
        "E1",
        "Ep",
        &[("ja-JP", "G-JA"), ("es-ES", "G-ES")],
    ))
}

#[tokio::test]
async fn test_drm_only_response_uses_drm_manifest() {
    let service = FakeService::new().with_streams(
        "G-JA",
        streams(None, Some("https://cdn/drm.mpd"), &[], None),
    );
    let content = episode();
    let audio = &tracks::build_audio_tracks(&content)[0];

    let stream = resolve(&service, &content, audio).await.unwrap();
    assert_eq!(stream.url, "https://cdn/drm.mpd");
    assert!(stream.drm);
}

#[tokio::test]
async fn test_resolves_requested_audio_track() {
    let service = FakeService::new().with_streams(
        "G-ES",
        streams(
            Some("https://cdn/es.mpd"),
            Some("https://cdn/es-drm.mpd"),
            &["en-US", "es-ES"],
            Some("https://cdn/e1.bif"),
        ),
    );
    let content = episode();
    let audio_tracks = tracks::build_audio_tracks(&content);
    let spanish = tracks::select_default_audio(&audio_tracks, "es-ES").unwrap();

    let stream = resolve(&service, &content, spanish).await.unwrap();
    assert_eq!(stream.url, "https://cdn/es.mpd");
    assert!(!stream.drm);
    assert_eq!(stream.preview_container.as_deref(), Some("https://cdn/e1.bif"));
    assert_eq!(stream.audio_tracks.len(), 2);

    let locales: Vec<_> = stream
        .subtitle_tracks
        .iter()
        .map(|t| t.locale.as_str())
        .collect();
    assert_eq!(locales, vec!["off", "en-US", "es-ES"]);
    assert_eq!(*service.stream_requests.lock().unwrap(), vec!["G-ES"]);
}

#[tokio::test]
async fn test_no_manifest_is_unavailable() {
    let service =
        FakeService::new().with_streams("G-JA", streams(None, None, &["en-US"], None));
    let content = episode();
    let audio = &tracks::build_audio_tracks(&content)[0];

    let err = resolve(&service, &content, audio).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::StreamUnavailable { ref content_id, .. } if content_id == "E1"
    ));
}

#[tokio::test]
async fn test_transport_error_is_unavailable() {
    let service = FakeService::new().with_stream_failure("G-JA", 502);
    let content = episode();
    let audio = &tracks::build_audio_tracks(&content)[0];

    match resolve(&service, &content, audio).await {
        Err(ResolveError::StreamUnavailable { reason, .. }) => assert!(reason.contains("502")),
        other => panic!("expected StreamUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_type_is_unavailable() {
    let service = FakeService::new();
    let content = ContentItem::new("X1", ContentType::Other, "Mystery");
    let audio = &tracks::build_audio_tracks(&content)[0];

    assert!(resolve(&service, &content, audio).await.is_err());
    assert!(service.stream_requests.lock().unwrap().is_empty());
}
