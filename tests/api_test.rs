//! Content service client tests
//!
//! Request paths, auth, body shapes and error handling against a mock server.

use mockito::{Matcher, Server};
use vodplay::api::{ApiError, ContentService, HttpContentService};
use vodplay::catalog;
use vodplay::models::{ContentType, Step};

fn client(server: &Server) -> HttpContentService {
    HttpContentService::with_base_url(
        server.url(),
        Some("token-123".to_string()),
        Some("acct-9".to_string()),
    )
}

// =============================================================================
// Content
// =============================================================================

#[tokio::test]
async fn test_get_content_sends_bearer_and_parses() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/content/v2/cms/objects/GRDV0019R")
        .match_header("authorization", "Bearer token-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "data": [{
                    "id": "GRDV0019R",
                    "type": "episode",
                    "title": "The Journey's End",
                    "images": { "thumbnail": [[
                        { "source": "https://img/small.jpg", "width": 320 },
                        { "source": "https://img/large.jpg", "width": 1920 }
                    ]] },
                    "episode_metadata": {
                        "series_id": "GG5H5XQX4",
                        "series_title": "Frieren",
                        "season_number": 1,
                        "episode_number": 1,
                        "versions": [
                            { "audio_locale": "ja-JP", "guid": "G-JA" },
                            { "audio_locale": "es-ES", "guid": "G-ES", "title": "Castellano" }
                        ]
                    }
                }]
            }"#,
        )
        .create_async()
        .await;

    let raw = client(&server).get_content("GRDV0019R").await.unwrap().unwrap();
    mock.assert_async().await;

    let item = catalog::normalize(&raw);
    assert_eq!(item.content_type, ContentType::Episode);
    assert_eq!(item.subtitle.as_deref(), Some("Frieren"));
    assert_eq!(item.poster.as_deref(), Some("https://img/large.jpg"));
    assert_eq!(item.versions.len(), 2);
    assert_eq!(item.versions[1].media_guid, "G-ES");
}

#[tokio::test]
async fn test_missing_content_is_none() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/content/v2/cms/objects/NOPE")
        .with_status(404)
        .create_async()
        .await;

    let result = client(&server).get_content("NOPE").await.unwrap();
    mock.assert_async().await;
    assert!(result.is_none());
}

#[tokio::test]
async fn test_server_error_surfaces_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/content/v2/cms/objects/E1")
        .with_status(503)
        .create_async()
        .await;

    let err = client(&server).get_content("E1").await.unwrap_err();
    assert!(matches!(err, ApiError::ServerError(503)));
}

#[tokio::test]
async fn test_invalid_json_is_reported() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/content/v2/cms/objects/E1")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let err = client(&server).get_content("E1").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_rate_limit_retries() {
    let mut server = Server::new_async().await;

    // First request returns 429, second succeeds
    let mock_429 = server
        .mock("GET", "/content/v2/cms/objects/E1")
        .with_status(429)
        .with_header("Retry-After", "0")
        .expect(1)
        .create_async()
        .await;

    let mock_200 = server
        .mock("GET", "/content/v2/cms/objects/E1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": [{"id": "E1", "type": "episode"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let result = client(&server).get_content("E1").await;

    assert!(result.is_ok());
    mock_429.assert_async().await;
    mock_200.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_gives_up() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/content/v2/cms/objects/E1")
        .with_status(429)
        .with_header("Retry-After", "0")
        .expect(3)
        .create_async()
        .await;

    let err = client(&server).get_content("E1").await.unwrap_err();
    mock.assert_async().await;
    assert!(matches!(err, ApiError::RateLimited));
}

// =============================================================================
// Streams
// =============================================================================

#[tokio::test]
async fn test_stream_paths_by_content_type() {
    let mut server = Server::new_async().await;
    let body = r#"{
        "data": [{ "drm_adaptive_dash": { "": { "url": "https://cdn/drm.mpd" } } }],
        "meta": { "subtitles": {} }
    }"#;

    let video = server
        .mock("GET", "/content/v2/cms/videos/G-JA/streams")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;
    let music = server
        .mock("GET", "/content/v2/music/MV1/streams")
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = client(&server);
    let episode = client.get_streams(ContentType::Episode, "G-JA").await.unwrap();
    client.get_streams(ContentType::Video, "MV1").await.unwrap();

    video.assert_async().await;
    music.assert_async().await;
    assert_eq!(episode.data.len(), 1);
    assert!(client.get_streams(ContentType::Other, "X").await.is_err());
}

// =============================================================================
// Playheads
// =============================================================================

#[tokio::test]
async fn test_get_playheads_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/content/v2/acct-9/playheads")
        .match_query(Matcher::UrlEncoded("content_ids".into(), "E1,E2".into()))
        .with_status(200)
        .with_body(
            r#"{"data": [
                {"content_id": "E1", "playhead": 754.5, "fully_watched": false},
                {"content_id": "E2", "playhead": 1400, "fully_watched": true}
            ]}"#,
        )
        .create_async()
        .await;

    let records = client(&server)
        .get_playheads(&["E1".to_string(), "E2".to_string()])
        .await
        .unwrap();
    mock.assert_async().await;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].playhead, 754.5);
    assert!(records[1].fully_watched);
}

#[tokio::test]
async fn test_save_playhead_posts_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/content/v2/acct-9/playheads")
        .match_header("authorization", "Bearer token-123")
        .match_body(Matcher::Json(serde_json::json!({
            "content_id": "E1",
            "playhead": 42
        })))
        .with_status(204)
        .create_async()
        .await;

    client(&server).save_playhead("E1", 42).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_playheads_without_account() {
    let server = Server::new_async().await;
    let client = HttpContentService::with_base_url(server.url(), None, None);

    let err = client.save_playhead("E1", 1).await.unwrap_err();
    assert!(matches!(err, ApiError::NotConfigured(_)));
}

// =============================================================================
// Adjacency
// =============================================================================

#[tokio::test]
async fn test_adjacent_episode_routes() {
    let mut server = Server::new_async().await;
    let next = server
        .mock("GET", "/content/v2/discover/up_next/E1")
        .with_status(200)
        .with_body(r#"{"data": [{"panel": {"id": "E2", "type": "episode", "title": "Next"}}]}"#)
        .create_async()
        .await;
    let prev = server
        .mock("GET", "/content/v2/discover/previous_episode/E1")
        .with_status(404)
        .create_async()
        .await;

    let client = client(&server);
    let found = client.get_adjacent_episode("E1", Step::Next).await.unwrap();
    let none = client
        .get_adjacent_episode("E1", Step::Previous)
        .await
        .unwrap();

    next.assert_async().await;
    prev.assert_async().await;
    assert_eq!(catalog::normalize(&found.unwrap()).id, "E2");
    assert!(none.is_none());
}

#[tokio::test]
async fn test_music_lookups() {
    let mut server = Server::new_async().await;
    let artist = server
        .mock("GET", "/content/v2/music/artists/A1")
        .with_status(200)
        .with_body(r#"{"data": [{"id": "A1", "concerts": ["C1", "C2"], "videos": ["V1"]}]}"#)
        .create_async()
        .await;
    let concerts = server
        .mock("GET", "/content/v2/music/concerts/C2")
        .with_status(200)
        .with_body(r#"{"data": [{"id": "C2", "type": "musicConcert", "title": "Encore"}]}"#)
        .create_async()
        .await;

    let client = client(&server);
    let adjacency = client.get_artist_adjacency("A1").await.unwrap().unwrap();
    let items = client
        .get_music_items(ContentType::Concert, &["C2".to_string()])
        .await
        .unwrap();

    artist.assert_async().await;
    concerts.assert_async().await;
    assert_eq!(adjacency.concerts, vec!["C1", "C2"]);
    assert_eq!(items.len(), 1);
    assert_eq!(catalog::normalize(&items[0]).content_type, ContentType::Concert);
}

// =============================================================================
// Preview containers
// =============================================================================

#[tokio::test]
async fn test_preview_container_download_has_no_auth() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/bif/e1.bif")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(vec![0xFF, 0xD8, 0x01, 0xFF, 0xD8, 0x02])
        .create_async()
        .await;

    let url = format!("{}/bif/e1.bif", server.url());
    let bytes = client(&server).fetch_preview_container(&url).await.unwrap();
    mock.assert_async().await;
    assert_eq!(bytes.len(), 6);
}
