//! Streaming infrastructure
//!
//! - Resolver: manifest and track selection for one audio track
//! - Preview: scrub thumbnails from the preview container
//! - Playhead: resume restore and periodic write-back
//! - Subtitles: renderer lifecycle
//! - Player: mpv/VLC as a playback surface

pub mod player;
pub mod playhead;
pub mod preview;
pub mod resolver;
pub mod subtitles;

pub use player::{LocalPlayer, PlayerError, PlayerType};
pub use playhead::{PlayheadLoop, PlayheadTracker};
pub use resolver::ResolveError;
pub use subtitles::{ChannelSubtitleSurface, SubtitleCommand, SubtitleRendererLifecycle};
