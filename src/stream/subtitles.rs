//! Subtitle renderer lifecycle
//!
//! Owns the subtitle-compositing surface for one playback session. The
//! renderer is created lazily on the first non-off selection, detached (not
//! destroyed) when subtitles are switched off, and disposed exactly once.
//!
//! The compositor usually lives on its own worker; [`ChannelSubtitleSurface`]
//! talks to it purely by message passing.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::SubtitleTrack;

/// Operations of a subtitle-compositing surface
pub trait SubtitleSurface: Send {
    fn attach(&mut self, url: &str);
    fn switch_to(&mut self, url: &str);
    fn detach(&mut self);
    fn dispose(&mut self);
}

/// Creates a surface for the first subtitle url
pub type SurfaceFactory = Box<dyn FnMut(&str) -> Box<dyn SubtitleSurface> + Send>;

/// Message sent to a compositor worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleCommand {
    Attach(String),
    Switch(String),
    Detach,
    Dispose,
}

/// Surface that forwards every call to a worker over a channel
pub struct ChannelSubtitleSurface {
    tx: mpsc::UnboundedSender<SubtitleCommand>,
}

impl ChannelSubtitleSurface {
    pub fn new(tx: mpsc::UnboundedSender<SubtitleCommand>) -> Self {
        Self { tx }
    }

    /// Surface plus the receiving end for the worker
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SubtitleCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, command: SubtitleCommand) {
        if self.tx.send(command).is_err() {
            debug!("subtitle worker gone, command dropped");
        }
    }
}

impl SubtitleSurface for ChannelSubtitleSurface {
    fn attach(&mut self, url: &str) {
        self.send(SubtitleCommand::Attach(url.to_string()));
    }

    fn switch_to(&mut self, url: &str) {
        self.send(SubtitleCommand::Switch(url.to_string()));
    }

    fn detach(&mut self) {
        self.send(SubtitleCommand::Detach);
    }

    fn dispose(&mut self) {
        self.send(SubtitleCommand::Dispose);
    }
}

/// Subtitle selection errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubtitleError {
    #[error("Subtitle track '{0}' has no url")]
    MissingUrl(String),
    #[error("Subtitle renderer already disposed")]
    Disposed,
}

/// Lifecycle of the session's single subtitle renderer
pub struct SubtitleRendererLifecycle {
    factory: SurfaceFactory,
    renderer: Option<Box<dyn SubtitleSurface>>,
    current: Option<String>,
    disposed: bool,
}

impl SubtitleRendererLifecycle {
    pub fn new(factory: SurfaceFactory) -> Self {
        Self {
            factory,
            renderer: None,
            current: None,
            disposed: false,
        }
    }

    /// Url currently rendered, if any
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Render `url`, creating the renderer on first use
    pub fn attach(&mut self, url: &str) -> Result<(), SubtitleError> {
        if self.disposed {
            return Err(SubtitleError::Disposed);
        }

        match self.renderer.as_mut() {
            Some(renderer) => renderer.switch_to(url),
            None => {
                info!(url, "creating subtitle renderer");
                let mut renderer = (self.factory)(url);
                renderer.attach(url);
                self.renderer = Some(renderer);
            }
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    /// Switch tracks; same as [`attach`](Self::attach) when nothing is rendered yet
    pub fn switch_to(&mut self, url: &str) -> Result<(), SubtitleError> {
        if self.current.as_deref() == Some(url) {
            return Ok(());
        }
        self.attach(url)
    }

    /// Stop rendering but keep the renderer for later reuse
    pub fn detach(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            if self.current.take().is_some() {
                renderer.detach();
            }
        }
    }

    /// Apply a track selection; "off" detaches
    pub fn select(&mut self, track: &SubtitleTrack) -> Result<(), SubtitleError> {
        if track.is_off() {
            self.detach();
            return Ok(());
        }
        match track.url.as_deref() {
            Some(url) if !url.is_empty() => self.switch_to(url),
            _ => Err(SubtitleError::MissingUrl(track.locale.clone())),
        }
    }

    /// Release the renderer; later calls are no-ops
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.current = None;
        if let Some(mut renderer) = self.renderer.take() {
            renderer.dispose();
        } else {
            debug!("no subtitle renderer to dispose");
        }
    }
}

impl Drop for SubtitleRendererLifecycle {
    fn drop(&mut self) {
        if !self.disposed {
            warn!("subtitle renderer dropped without dispose");
            self.dispose();
        }
    }
}
