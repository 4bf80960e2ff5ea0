//! vodplay - resumable VOD playback
//!
//! Turns a content reference into a running, track-selected, resumable,
//! navigable playback session.
//!
//! # Modules
//!
//! - `models` - Content, tracks, streams, playheads, previews
//! - `api` - Content/account service client and wire types
//! - `catalog` - Raw content normalization
//! - `tracks` - Audio/subtitle track policy
//! - `stream` - Stream resolution, previews, playhead sync, subtitles, local player
//! - `navigation` - Next/previous lookup
//! - `session` - The playback session state machine
//! - `config`, `cli`, `commands` - Command-line front end

pub mod api;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod navigation;
pub mod session;
pub mod stream;
pub mod tracks;

// Re-export commonly used types
pub use models::{
    AudioTrack, ContentItem, ContentType, MediaState, Playhead, PreviewImage, PreviewSet, Step,
    StreamDescriptor, SubtitleTrack,
};

pub use api::{ApiError, ContentService, HttpContentService};
pub use session::{
    PlaybackSession, SessionCommand, SessionConfig, SessionOutcome, SessionState, SurfaceEvent,
};
