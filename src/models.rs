//! Data structures and types for vodplay
//!
//! Contains the shared models used across the playback engine organized by domain:
//! - **Content**: canonical content record produced by the normalizer
//! - **Tracks**: audio and subtitle track descriptions
//! - **Stream**: resolved stream descriptor and scrub previews
//! - **Playback**: playhead and sampled media state

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Content Models
// =============================================================================

/// Content type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Episode,
    Movie,
    Concert,
    Video,
    /// Anything the service returns that we don't know how to play
    Other,
}

impl ContentType {
    /// Parse the service's type string (e.g. "episode", "musicConcert")
    pub fn from_raw(s: &str) -> Self {
        match s {
            "episode" => ContentType::Episode,
            "movie" => ContentType::Movie,
            "musicConcert" | "concert" | "music_concert" => ContentType::Concert,
            "musicVideo" | "music_video" | "video" => ContentType::Video,
            _ => ContentType::Other,
        }
    }

    /// Episodes and movies keep a remote playhead; music content does not
    pub fn tracks_playhead(&self) -> bool {
        matches!(self, ContentType::Episode | ContentType::Movie)
    }

    /// Music content streams from a different backing catalog
    pub fn is_music(&self) -> bool {
        matches!(self, ContentType::Concert | ContentType::Video)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Episode => write!(f, "Episode"),
            ContentType::Movie => write!(f, "Movie"),
            ContentType::Concert => write!(f, "Concert"),
            ContentType::Video => write!(f, "Music Video"),
            ContentType::Other => write!(f, "Other"),
        }
    }
}

/// Alternate audio version of a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub audio_locale: String,
    /// Media id used for the stream lookup of this version
    pub media_guid: String,
    pub title: Option<String>,
}

/// Canonical content record
///
/// Immutable once normalized; navigation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub content_type: ContentType,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    /// Movie listing this movie belongs to
    pub listing_id: Option<String>,
    /// Series this episode belongs to
    pub series_id: Option<String>,
    /// Artist owning this concert or music video
    pub artist_id: Option<String>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub versions: Vec<ContentVersion>,
    pub poster: Option<String>,
}

impl ContentItem {
    /// Minimal item, mostly useful for tests and fixtures
    pub fn new(id: impl Into<String>, content_type: ContentType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_type,
            title: title.into(),
            subtitle: None,
            description: None,
            listing_id: None,
            series_id: None,
            artist_id: None,
            season_number: None,
            episode_number: None,
            versions: Vec::new(),
            poster: None,
        }
    }
}

impl fmt::Display for ContentItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.season_number, self.episode_number) {
            (Some(season), Some(episode)) => {
                write!(f, "S{:02}E{:02} - {}", season, episode, self.title)
            }
            _ => write!(f, "{} [{}]", self.title, self.content_type),
        }
    }
}

// =============================================================================
// Track Models
// =============================================================================

/// Audio track available for a content item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Stable id within the item's track list
    pub id: String,
    pub locale: String,
    pub title: String,
    pub source_media_id: String,
    pub content_type: ContentType,
}

impl fmt::Display for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.locale)
    }
}

/// Subtitle track offered by a resolved stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub locale: String,
    pub url: Option<String>,
    pub format: Option<String>,
}

impl SubtitleTrack {
    /// Locale of the synthetic "no subtitles" entry
    pub const OFF: &'static str = "off";

    /// The synthetic "no subtitles" entry
    pub fn off() -> Self {
        Self {
            locale: Self::OFF.to_string(),
            url: None,
            format: None,
        }
    }

    pub fn is_off(&self) -> bool {
        self.locale == Self::OFF
    }
}

impl fmt::Display for SubtitleTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_off() {
            write!(f, "Off")
        } else {
            write!(f, "{}", self.locale)
        }
    }
}

// =============================================================================
// Stream Models
// =============================================================================

/// Playable stream resolved for one (content, audio track) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub url: String,
    /// True when the url came from the DRM-protected manifest
    pub drm: bool,
    /// Location of the thumbnail container used for scrub previews
    pub preview_container: Option<String>,
    pub audio_tracks: Vec<AudioTrack>,
    /// Always starts with the "off" entry
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

/// One scrub preview image (JPEG bytes)
#[derive(Clone, PartialEq, Eq)]
pub struct PreviewImage(pub Vec<u8>);

impl PreviewImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PreviewImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PreviewImage({} bytes)", self.0.len())
    }
}

/// Ordered scrub previews; empty is a valid result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewSet {
    images: Vec<PreviewImage>,
}

impl PreviewSet {
    pub fn new(images: Vec<PreviewImage>) -> Self {
        Self { images }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PreviewImage> {
        self.images.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PreviewImage> {
        self.images.iter()
    }

    /// Image for a scrub position given as a proportion of the timeline (0.0-1.0)
    pub fn at_proportion(&self, proportion: f64) -> Option<&PreviewImage> {
        if self.images.is_empty() || !proportion.is_finite() {
            return None;
        }
        let idx = (proportion.max(0.0) * self.images.len() as f64).floor() as usize;
        self.images.get(idx.min(self.images.len() - 1))
    }
}

// =============================================================================
// Playback Models
// =============================================================================

/// Last known playback position for a content item
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Playhead {
    pub position_secs: u64,
    pub fully_watched: bool,
}

impl Playhead {
    /// Position to start playback at (None means from the beginning)
    pub fn resume_at(&self) -> Option<u64> {
        if self.fully_watched || self.position_secs == 0 {
            None
        } else {
            Some(self.position_secs)
        }
    }
}

impl fmt::Display for Playhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.position_secs;
        write!(f, "{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)?;
        if self.fully_watched {
            write!(f, " (watched)")?;
        }
        Ok(())
    }
}

/// Navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Next,
    Previous,
}

impl Step {
    pub fn offset(&self) -> isize {
        match self {
            Step::Next => 1,
            Step::Previous => -1,
        }
    }
}

/// Playback state sampled from the surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaState {
    pub position_secs: f64,
    pub paused: bool,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            position_secs: 0.0,
            paused: true,
        }
    }
}
