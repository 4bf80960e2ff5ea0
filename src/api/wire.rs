//! Wire shapes of the content/account service
//!
//! These mirror the JSON the service returns. Everything is optional and
//! defaulted: the normalizer decides what missing fields mean.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content object as returned by catalog, discover and music endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawContent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "subTitle")]
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub listing_id: Option<String>,
    pub artist: Option<RawArtistRef>,
    pub episode_metadata: Option<RawMetadata>,
    pub movie_metadata: Option<RawMetadata>,
    /// Discover endpoints wrap the actual item in a panel
    pub panel: Option<Box<RawContent>>,
    pub images: Option<RawImages>,
    pub versions: Option<Vec<RawVersion>>,
}

/// Type-specific metadata block (episode_metadata / movie_metadata)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMetadata {
    pub series_id: Option<String>,
    pub series_title: Option<String>,
    pub season_number: Option<u32>,
    pub episode_number: Option<u32>,
    pub movie_listing_id: Option<String>,
    pub listing_id: Option<String>,
    pub versions: Option<Vec<RawVersion>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArtistRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawVersion {
    pub audio_locale: Option<String>,
    #[serde(alias = "guid")]
    pub media_guid: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawImages {
    /// Sets of the same thumbnail at increasing resolutions
    pub thumbnail: Vec<Vec<RawImage>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawImage {
    pub source: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Generic `{ "total": n, "data": [...] }` envelope
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

// =============================================================================
// Streams
// =============================================================================

/// Stream lookup response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamsResponse {
    pub data: Vec<RawStreamSet>,
    pub meta: RawStreamMeta,
}

/// Manifests keyed by hardsub locale ("" = no burned-in subtitles)
pub type ManifestMap = BTreeMap<String, RawManifest>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStreamSet {
    pub adaptive_dash: Option<ManifestMap>,
    pub drm_adaptive_dash: Option<ManifestMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawManifest {
    pub url: String,
    pub hardsub_locale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStreamMeta {
    /// Thumbnail container url
    pub bifs: Option<String>,
    pub subtitles: BTreeMap<String, RawSubtitle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSubtitle {
    pub locale: String,
    pub url: Option<String>,
    pub format: Option<String>,
}

// =============================================================================
// Playheads & Music
// =============================================================================

/// Remote resume record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayheadRecord {
    pub content_id: String,
    #[serde(default)]
    pub playhead: f64,
    #[serde(default)]
    pub fully_watched: bool,
}

/// Body of a playhead save request
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SavePlayheadBody<'a> {
    pub content_id: &'a str,
    pub playhead: u64,
}

/// Artist record listing its concerts and music videos by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistAdjacency {
    pub id: String,
    pub concerts: Vec<String>,
    pub videos: Vec<String>,
}
