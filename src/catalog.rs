//! Content normalization
//!
//! Folds the service's heterogeneous shapes (episode, movie, concert, music
//! video, discover panels) into one [`ContentItem`] so nothing downstream
//! branches on raw structure. Never fails: missing fields stay absent.

use crate::api::wire::{RawContent, RawImages, RawMetadata, RawVersion};
use crate::models::{ContentItem, ContentType, ContentVersion};

/// Normalize a raw content object
pub fn normalize(raw: &RawContent) -> ContentItem {
    // Discover responses carry the playable item in `panel`; its fields win
    // over the wrapper's, but the wrapper fills gaps.
    if let Some(panel) = &raw.panel {
        let mut merged = (**panel).clone();
        merged.id = merged.id.or_else(|| raw.id.clone());
        merged.kind = merged.kind.or_else(|| raw.kind.clone());
        merged.title = merged.title.or_else(|| raw.title.clone());
        merged.description = merged.description.or_else(|| raw.description.clone());
        merged.images = merged.images.or_else(|| raw.images.clone());
        merged.episode_metadata = merged
            .episode_metadata
            .or_else(|| raw.episode_metadata.clone());
        merged.movie_metadata = merged.movie_metadata.or_else(|| raw.movie_metadata.clone());
        merged.panel = None;
        return normalize(&merged);
    }

    let meta = raw
        .episode_metadata
        .as_ref()
        .or(raw.movie_metadata.as_ref());

    let mut content_type = raw
        .kind
        .as_deref()
        .map(ContentType::from_raw)
        .unwrap_or(ContentType::Other);
    if content_type == ContentType::Other {
        // Untyped objects are still recognisable by their metadata block
        if raw.episode_metadata.is_some() {
            content_type = ContentType::Episode;
        } else if raw.movie_metadata.is_some() {
            content_type = ContentType::Movie;
        }
    }

    let listing_id = raw
        .listing_id
        .clone()
        .or_else(|| meta.and_then(|m| m.movie_listing_id.clone()))
        .or_else(|| meta.and_then(|m| m.listing_id.clone()));

    let versions = meta
        .and_then(|m| m.versions.as_ref())
        .or(raw.versions.as_ref())
        .map(|v| normalize_versions(v))
        .unwrap_or_default();

    ContentItem {
        id: raw.id.clone().unwrap_or_default(),
        content_type,
        title: raw.title.clone().unwrap_or_default(),
        subtitle: raw
            .subtitle
            .clone()
            .or_else(|| meta.and_then(|m: &RawMetadata| m.series_title.clone())),
        description: raw.description.clone(),
        listing_id,
        series_id: meta.and_then(|m| m.series_id.clone()),
        artist_id: raw.artist.as_ref().and_then(|a| a.id.clone()),
        season_number: meta.and_then(|m| m.season_number),
        episode_number: meta.and_then(|m| m.episode_number),
        versions,
        poster: raw.images.as_ref().and_then(poster),
    }
}

/// Versions without a media id can't be streamed and are dropped
fn normalize_versions(raw: &[RawVersion]) -> Vec<ContentVersion> {
    raw.iter()
        .filter_map(|v| {
            let media_guid = v.media_guid.clone().filter(|g| !g.is_empty())?;
            Some(ContentVersion {
                audio_locale: v.audio_locale.clone().unwrap_or_default(),
                media_guid,
                title: v.title.clone(),
            })
        })
        .collect()
}

/// Poster image: the last (largest) entry of the first thumbnail set
pub fn poster(images: &RawImages) -> Option<String> {
    images
        .thumbnail
        .first()
        .and_then(|set| set.last())
        .map(|img| img.source.clone())
        .filter(|s| !s.is_empty())
}
