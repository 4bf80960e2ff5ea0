//! Track catalog
//!
//! Derives audio tracks from content metadata and subtitle tracks from a
//! resolved stream, and applies the default-selection policies.

use tracing::debug;

use crate::api::wire::RawStreamMeta;
use crate::models::{AudioTrack, ContentItem, SubtitleTrack};

/// Original-language locale used when the preferred audio locale is missing
pub const REFERENCE_AUDIO_LOCALE: &str = "ja-JP";

/// Locale recorded on the synthetic track of an item without versions
pub const UNSPECIFIED_LOCALE: &str = "none";

/// Audio tracks for a content item; never empty
pub fn build_audio_tracks(content: &ContentItem) -> Vec<AudioTrack> {
    if content.versions.is_empty() {
        return vec![AudioTrack {
            id: content.id.clone(),
            locale: UNSPECIFIED_LOCALE.to_string(),
            title: content
                .subtitle
                .clone()
                .unwrap_or_else(|| content.title.clone()),
            source_media_id: content.id.clone(),
            content_type: content.content_type,
        }];
    }

    content
        .versions
        .iter()
        .map(|version| AudioTrack {
            id: version.media_guid.clone(),
            locale: version.audio_locale.clone(),
            title: version
                .title
                .clone()
                .unwrap_or_else(|| version.audio_locale.clone()),
            source_media_id: version.media_guid.clone(),
            content_type: content.content_type,
        })
        .collect()
}

/// Default audio track: preferred locale, then the reference locale, then the first track
///
/// Returns `None` only for an empty list, which [`build_audio_tracks`] never produces.
pub fn select_default_audio<'a>(
    tracks: &'a [AudioTrack],
    preferred_locale: &str,
) -> Option<&'a AudioTrack> {
    if let Some(track) = tracks.iter().find(|t| t.locale == preferred_locale) {
        return Some(track);
    }

    let fallback = tracks
        .iter()
        .find(|t| t.locale == REFERENCE_AUDIO_LOCALE)
        .or_else(|| tracks.first());
    if let Some(track) = fallback {
        debug!(
            requested = preferred_locale,
            chosen = %track.locale,
            "audio locale unavailable, fallback applied"
        );
    }
    fallback
}

/// Subtitle tracks of a stream, with the "off" entry first
pub fn build_subtitle_tracks(meta: &RawStreamMeta) -> Vec<SubtitleTrack> {
    std::iter::once(SubtitleTrack::off())
        .chain(meta.subtitles.iter().map(|(key, sub)| SubtitleTrack {
            locale: if sub.locale.is_empty() {
                key.clone()
            } else {
                sub.locale.clone()
            },
            url: sub.url.clone().filter(|u| !u.is_empty()),
            format: sub.format.clone(),
        }))
        // A non-off entry without a url can never be rendered
        .filter(|t| t.is_off() || t.url.is_some())
        .collect()
}

/// Default subtitle: exact locale match only
///
/// `None` means no subtitle is selected, which callers treat like "off".
pub fn select_default_subtitle<'a>(
    tracks: &'a [SubtitleTrack],
    preferred_locale: &str,
) -> Option<&'a SubtitleTrack> {
    tracks
        .iter()
        .find(|t| !t.is_off() && t.locale == preferred_locale)
}
