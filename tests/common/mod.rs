//! Shared fakes for integration tests
//!
//! An in-memory content service, a recording playback surface and a recording
//! subtitle factory.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use vodplay::api::wire::{
    ManifestMap, RawArtistRef, RawManifest, RawMetadata, RawStreamMeta, RawStreamSet,
    RawSubtitle, RawVersion, StreamsResponse,
};
use vodplay::api::{ApiError, ArtistAdjacency, ContentService, PlayheadRecord, RawContent};
use vodplay::models::{ContentType, PreviewImage, Step};
use vodplay::session::{LoadRequest, PlaybackSurface, SurfaceEvent};
use vodplay::stream::subtitles::{
    ChannelSubtitleSurface, SubtitleCommand, SubtitleSurface, SurfaceFactory,
};

// =============================================================================
// Raw fixtures
// =============================================================================

pub fn versions(entries: &[(&str, &str)]) -> Vec<RawVersion> {
    entries
        .iter()
        .map(|(locale, guid)| RawVersion {
            audio_locale: Some(locale.to_string()),
            media_guid: Some(guid.to_string()),
            title: None,
        })
        .collect()
}

pub fn raw_episode(id: &str, title: &str, audio: &[(&str, &str)]) -> RawContent {
    RawContent {
        id: Some(id.to_string()),
        kind: Some("episode".to_string()),
        title: Some(title.to_string()),
        episode_metadata: Some(RawMetadata {
            series_id: Some("SERIES1".to_string()),
            series_title: Some("Frieren".to_string()),
            season_number: Some(1),
            episode_number: Some(1),
            versions: Some(versions(audio)),
            ..RawMetadata::default()
        }),
        ..RawContent::default()
    }
}

pub fn raw_movie(id: &str, title: &str, listing_id: &str) -> RawContent {
    RawContent {
        id: Some(id.to_string()),
        kind: Some("movie".to_string()),
        title: Some(title.to_string()),
        movie_metadata: Some(RawMetadata {
            movie_listing_id: Some(listing_id.to_string()),
            ..RawMetadata::default()
        }),
        ..RawContent::default()
    }
}

pub fn raw_music(id: &str, kind: &str, artist_id: &str) -> RawContent {
    RawContent {
        id: Some(id.to_string()),
        kind: Some(kind.to_string()),
        title: Some(format!("Live {}", id)),
        artist: Some(RawArtistRef {
            id: Some(artist_id.to_string()),
            name: Some("Band".to_string()),
        }),
        ..RawContent::default()
    }
}

fn manifest_map(url: &str) -> ManifestMap {
    let mut map = ManifestMap::new();
    map.insert(
        String::new(),
        RawManifest {
            url: url.to_string(),
            hardsub_locale: None,
        },
    );
    map
}

/// Streams response with optional plain/DRM manifests and subtitle locales
pub fn streams(
    plain: Option<&str>,
    drm: Option<&str>,
    subtitles: &[&str],
    bifs: Option<&str>,
) -> StreamsResponse {
    StreamsResponse {
        data: vec![RawStreamSet {
            adaptive_dash: plain.map(manifest_map),
            drm_adaptive_dash: drm.map(manifest_map),
        }],
        meta: RawStreamMeta {
            bifs: bifs.map(str::to_string),
            subtitles: subtitles
                .iter()
                .map(|locale| {
                    (
                        locale.to_string(),
                        RawSubtitle {
                            locale: locale.to_string(),
                            url: Some(format!("https://cdn/subs/{}.ass", locale)),
                            format: Some("ass".to_string()),
                        },
                    )
                })
                .collect(),
        },
    }
}

/// `count` fake JPEGs behind the SOI marker
pub fn preview_container(count: usize) -> Vec<u8> {
    let mut bytes = vec![0x00, 0x01, 0x02];
    for i in 0..count {
        bytes.extend_from_slice(&[0xFF, 0xD8, 0x10 + i as u8, 0x20]);
    }
    bytes
}

// =============================================================================
// Fake content service
// =============================================================================

#[derive(Clone)]
enum StreamReply {
    Ok(StreamsResponse, Duration),
    Fail(u16),
}

/// In-memory service; every call is recorded
#[derive(Default)]
pub struct FakeService {
    contents: Mutex<HashMap<String, RawContent>>,
    streams: Mutex<HashMap<String, StreamReply>>,
    playheads: Mutex<HashMap<String, PlayheadRecord>>,
    adjacent: Mutex<HashMap<(String, bool), RawContent>>,
    adjacency_fails: Mutex<bool>,
    siblings: Mutex<HashMap<String, Vec<RawContent>>>,
    artists: Mutex<HashMap<String, ArtistAdjacency>>,
    music: Mutex<HashMap<String, RawContent>>,
    previews: Mutex<HashMap<String, Vec<u8>>>,
    saves_fail: Mutex<bool>,

    pub saves: Mutex<Vec<(String, u64)>>,
    pub stream_requests: Mutex<Vec<String>>,
    pub preview_requests: AtomicUsize,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(self, raw: RawContent) -> Self {
        let id = raw.id.clone().unwrap_or_default();
        self.contents.lock().unwrap().insert(id, raw);
        self
    }

    pub fn with_streams(self, media_id: &str, response: StreamsResponse) -> Self {
        self.with_slow_streams(media_id, response, Duration::ZERO)
    }

    /// Streams answered after `delay`
    pub fn with_slow_streams(self, media_id: &str, response: StreamsResponse, delay: Duration) -> Self {
        self.streams
            .lock()
            .unwrap()
            .insert(media_id.to_string(), StreamReply::Ok(response, delay));
        self
    }

    pub fn with_stream_failure(self, media_id: &str, status: u16) -> Self {
        self.streams
            .lock()
            .unwrap()
            .insert(media_id.to_string(), StreamReply::Fail(status));
        self
    }

    pub fn with_playhead(self, content_id: &str, position: f64, fully_watched: bool) -> Self {
        self.playheads.lock().unwrap().insert(
            content_id.to_string(),
            PlayheadRecord {
                content_id: content_id.to_string(),
                playhead: position,
                fully_watched,
            },
        );
        self
    }

    pub fn with_adjacent(self, content_id: &str, step: Step, raw: RawContent) -> Self {
        self.adjacent
            .lock()
            .unwrap()
            .insert((content_id.to_string(), step == Step::Next), raw);
        self
    }

    pub fn with_failing_adjacency(self) -> Self {
        *self.adjacency_fails.lock().unwrap() = true;
        self
    }

    pub fn with_siblings(self, listing_id: &str, movies: Vec<RawContent>) -> Self {
        self.siblings
            .lock()
            .unwrap()
            .insert(listing_id.to_string(), movies);
        self
    }

    pub fn with_artist(self, artist: ArtistAdjacency) -> Self {
        self.artists
            .lock()
            .unwrap()
            .insert(artist.id.clone(), artist);
        self
    }

    pub fn with_music(self, raw: RawContent) -> Self {
        let id = raw.id.clone().unwrap_or_default();
        self.music.lock().unwrap().insert(id, raw);
        self
    }

    pub fn with_preview_container(self, url: &str, bytes: Vec<u8>) -> Self {
        self.previews.lock().unwrap().insert(url.to_string(), bytes);
        self
    }

    pub fn with_failing_saves(self) -> Self {
        *self.saves_fail.lock().unwrap() = true;
        self
    }

    pub fn raw_content(&self, id: &str) -> Option<RawContent> {
        self.contents.lock().unwrap().get(id).cloned()
    }

    pub fn saved(&self) -> Vec<(String, u64)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentService for FakeService {
    async fn get_content(&self, content_id: &str) -> Result<Option<RawContent>, ApiError> {
        Ok(self.contents.lock().unwrap().get(content_id).cloned())
    }

    async fn get_streams(
        &self,
        _content_type: ContentType,
        media_id: &str,
    ) -> Result<StreamsResponse, ApiError> {
        self.stream_requests
            .lock()
            .unwrap()
            .push(media_id.to_string());
        let reply = self.streams.lock().unwrap().get(media_id).cloned();
        match reply {
            Some(StreamReply::Ok(response, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(response)
            }
            Some(StreamReply::Fail(status)) => Err(ApiError::ServerError(status)),
            None => Err(ApiError::NotFound),
        }
    }

    async fn get_playheads(
        &self,
        content_ids: &[String],
    ) -> Result<Vec<PlayheadRecord>, ApiError> {
        let playheads = self.playheads.lock().unwrap();
        Ok(content_ids
            .iter()
            .filter_map(|id| playheads.get(id).cloned())
            .collect())
    }

    async fn save_playhead(&self, content_id: &str, position_secs: u64) -> Result<(), ApiError> {
        if *self.saves_fail.lock().unwrap() {
            return Err(ApiError::ServerError(503));
        }
        self.saves
            .lock()
            .unwrap()
            .push((content_id.to_string(), position_secs));
        Ok(())
    }

    async fn get_adjacent_episode(
        &self,
        content_id: &str,
        step: Step,
    ) -> Result<Option<RawContent>, ApiError> {
        if *self.adjacency_fails.lock().unwrap() {
            return Err(ApiError::ServerError(500));
        }
        Ok(self
            .adjacent
            .lock()
            .unwrap()
            .get(&(content_id.to_string(), step == Step::Next))
            .cloned())
    }

    async fn get_sibling_movies(&self, listing_id: &str) -> Result<Vec<RawContent>, ApiError> {
        Ok(self
            .siblings
            .lock()
            .unwrap()
            .get(listing_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_artist_adjacency(
        &self,
        artist_id: &str,
    ) -> Result<Option<ArtistAdjacency>, ApiError> {
        Ok(self.artists.lock().unwrap().get(artist_id).cloned())
    }

    async fn get_music_items(
        &self,
        _content_type: ContentType,
        ids: &[String],
    ) -> Result<Vec<RawContent>, ApiError> {
        let music = self.music.lock().unwrap();
        Ok(ids.iter().filter_map(|id| music.get(id).cloned()).collect())
    }

    async fn fetch_preview_container(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.preview_requests.fetch_add(1, Ordering::SeqCst);
        self.previews
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(ApiError::NotFound)
    }
}

// =============================================================================
// Recording surfaces
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Load(LoadRequest),
    Pause,
    /// Size of the shown preview, `None` when cleared
    Preview(Option<usize>),
    Unload,
}

#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub calls: Arc<Mutex<Vec<SurfaceCall>>>,
    /// Set when every load should report a start failure on this channel
    fail_with: Option<mpsc::Sender<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface whose player dies on every load
    pub fn failing(events: mpsc::Sender<SurfaceEvent>) -> Self {
        Self {
            fail_with: Some(events),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn loads(&self) -> Vec<LoadRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::Load(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &SurfaceCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }
}

impl PlaybackSurface for RecordingSurface {
    fn load(&mut self, request: LoadRequest) {
        self.calls.lock().unwrap().push(SurfaceCall::Load(request));
        if let Some(events) = &self.fail_with {
            events
                .try_send(SurfaceEvent::Failed {
                    reason: "mpv exited with exit status: 2".to_string(),
                })
                .unwrap();
        }
    }

    fn pause(&mut self) {
        self.calls.lock().unwrap().push(SurfaceCall::Pause);
    }

    fn show_preview(&mut self, image: Option<&PreviewImage>) {
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::Preview(image.map(PreviewImage::len)));
    }

    fn unload(&mut self) {
        self.calls.lock().unwrap().push(SurfaceCall::Unload);
    }
}

/// Subtitle factory feeding a channel, plus a creation counter
pub fn recording_subtitles() -> (
    SurfaceFactory,
    mpsc::UnboundedReceiver<SubtitleCommand>,
    Arc<AtomicUsize>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let factory: SurfaceFactory = Box::new(move |_url: &str| -> Box<dyn SubtitleSurface> {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(ChannelSubtitleSurface::new(tx.clone()))
    });
    (factory, rx, created)
}

pub fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}
