//! Stream resolution
//!
//! Turns a (content, audio track) pair into a playable [`StreamDescriptor`].
//! Manifest preference: unencrypted adaptive, then DRM adaptive, else
//! `StreamUnavailable`.

use thiserror::Error;
use tracing::{debug, info};

use crate::api::wire::{ManifestMap, StreamsResponse};
use crate::api::ContentService;
use crate::models::{AudioTrack, ContentItem, ContentType, StreamDescriptor};
use crate::tracks;

/// Stream resolution failure; terminal for the attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No playable stream for {content_id}: {reason}")]
    StreamUnavailable { content_id: String, reason: String },
}

impl ResolveError {
    fn unavailable(content: &ContentItem, reason: impl Into<String>) -> Self {
        ResolveError::StreamUnavailable {
            content_id: content.id.clone(),
            reason: reason.into(),
        }
    }
}

/// Resolve a playable stream for `audio`, one of `content`'s audio tracks
pub async fn resolve(
    service: &dyn ContentService,
    content: &ContentItem,
    audio: &AudioTrack,
) -> Result<StreamDescriptor, ResolveError> {
    if audio.content_type == ContentType::Other {
        return Err(ResolveError::unavailable(content, "unsupported content type"));
    }

    debug!(
        content_id = %content.id,
        media_id = %audio.source_media_id,
        locale = %audio.locale,
        "resolving stream"
    );

    // A transport failure here means the session can't proceed either
    let response = service
        .get_streams(audio.content_type, &audio.source_media_id)
        .await
        .map_err(|e| ResolveError::unavailable(content, e.to_string()))?;

    let (url, drm) = select_manifest(&response)
        .ok_or_else(|| ResolveError::unavailable(content, "no adaptive manifest in response"))?;

    info!(content_id = %content.id, drm, "stream resolved");

    Ok(StreamDescriptor {
        url,
        drm,
        preview_container: response.meta.bifs.clone().filter(|b| !b.is_empty()),
        audio_tracks: tracks::build_audio_tracks(content),
        subtitle_tracks: tracks::build_subtitle_tracks(&response.meta),
    })
}

/// Pick the manifest url, returning whether it is DRM-protected
pub fn select_manifest(response: &StreamsResponse) -> Option<(String, bool)> {
    let plain = response
        .data
        .iter()
        .find_map(|set| set.adaptive_dash.as_ref().and_then(manifest_url));
    if let Some(url) = plain {
        return Some((url, false));
    }

    response
        .data
        .iter()
        .find_map(|set| set.drm_adaptive_dash.as_ref().and_then(manifest_url))
        .map(|url| (url, true))
}

/// Prefer the variant without burned-in subtitles (keyed by "")
fn manifest_url(manifests: &ManifestMap) -> Option<String> {
    manifests
        .get("")
        .filter(|m| !m.url.is_empty())
        .or_else(|| manifests.values().find(|m| !m.url.is_empty()))
        .map(|m| m.url.clone())
}
