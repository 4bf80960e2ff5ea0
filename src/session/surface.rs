//! Host-side collaborators of a playback session
//!
//! The session is the only owner of these; nothing else in the crate holds a
//! playback surface.

use crate::models::PreviewImage;

/// What the surface should load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub url: String,
    pub title: String,
    pub poster: Option<String>,
    /// Resume position in seconds
    pub start_at: Option<u64>,
}

/// The media output
pub trait PlaybackSurface: Send {
    fn load(&mut self, request: LoadRequest);
    fn pause(&mut self);
    /// Show a scrub preview, or clear it with `None`
    fn show_preview(&mut self, image: Option<&PreviewImage>);
    /// Release the media output
    fn unload(&mut self);
}

/// Events the surface emits back to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// Subtitle rendering can be attached
    Attachable,
    TimeUpdate { position_secs: f64 },
    Paused,
    Resumed,
    /// End of stream
    Ended,
    /// The surface could not play the loaded stream
    Failed { reason: String },
    /// Scrub position as a proportion of the timeline
    Scrub { proportion: f64 },
    JumpForward,
    JumpBackward,
}

/// Application navigation
pub trait Navigator: Send {
    /// Leave the player for the previous screen
    fn exit(&mut self);
}

impl<F: FnMut() + Send> Navigator for F {
    fn exit(&mut self) {
        self()
    }
}
