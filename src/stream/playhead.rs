//! Resume-position tracking
//!
//! Restores the remote playhead for a content item and keeps it in sync while
//! playing: every period the sampled media state is checked and, unless
//! paused, the position is written back. Write failures are logged and the
//! loop carries on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ContentService;
use crate::models::{ContentItem, MediaState, Playhead};

/// Default persistence period
pub const PERSIST_INTERVAL: Duration = Duration::from_secs(15);

/// Restores and persists playheads against the account service
#[derive(Clone)]
pub struct PlayheadTracker {
    service: Arc<dyn ContentService>,
    period: Duration,
}

impl PlayheadTracker {
    pub fn new(service: Arc<dyn ContentService>) -> Self {
        Self::with_period(service, PERSIST_INTERVAL)
    }

    pub fn with_period(service: Arc<dyn ContentService>, period: Duration) -> Self {
        Self { service, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Last remote playhead, or zero when there is none or it can't be fetched
    pub async fn restore(&self, content: &ContentItem) -> Playhead {
        if !content.content_type.tracks_playhead() {
            return Playhead::default();
        }

        match self.service.get_playheads(&[content.id.clone()]).await {
            Ok(records) => records
                .into_iter()
                .find(|r| r.content_id == content.id)
                .map(|r| Playhead {
                    position_secs: r.playhead.max(0.0).floor() as u64,
                    fully_watched: r.fully_watched,
                })
                .unwrap_or_default(),
            Err(e) => {
                warn!(content_id = %content.id, error = %e, "playhead restore failed");
                Playhead::default()
            }
        }
    }

    /// Write the current position once; `None` when nothing was written
    pub async fn persist(&self, content: &ContentItem, media: MediaState) -> Option<Playhead> {
        save(self.service.as_ref(), content, media).await
    }

    /// Start the periodic persistence loop for `content`
    ///
    /// `media` carries the surface's sampled state; the returned handle stops
    /// the loop when disposed or dropped.
    pub fn start_loop(
        &self,
        content: ContentItem,
        media: watch::Receiver<MediaState>,
    ) -> PlayheadLoop {
        let token = CancellationToken::new();
        let (saved_tx, saved_rx) = watch::channel(None);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.service),
            content,
            media,
            self.period,
            token.clone(),
            Arc::new(saved_tx),
        ));

        PlayheadLoop {
            token,
            handle: Some(handle),
            saved: saved_rx,
        }
    }
}

async fn save(
    service: &dyn ContentService,
    content: &ContentItem,
    media: MediaState,
) -> Option<Playhead> {
    if !content.content_type.tracks_playhead() {
        return None;
    }

    let position_secs = media.position_secs.max(0.0).floor() as u64;
    match service.save_playhead(&content.id, position_secs).await {
        Ok(()) => {
            debug!(content_id = %content.id, position_secs, "playhead saved");
            Some(Playhead {
                position_secs,
                fully_watched: false,
            })
        }
        Err(e) => {
            warn!(content_id = %content.id, error = %e, "playhead save failed");
            None
        }
    }
}

async fn run_loop(
    service: Arc<dyn ContentService>,
    content: ContentItem,
    media: watch::Receiver<MediaState>,
    period: Duration,
    token: CancellationToken,
    saved: Arc<watch::Sender<Option<Playhead>>>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let state = *media.borrow();
        if state.paused || token.is_cancelled() {
            continue;
        }

        // Writes overlap freely; they are idempotent position overwrites
        let service = Arc::clone(&service);
        let content = content.clone();
        let saved = Arc::clone(&saved);
        tokio::spawn(async move {
            if let Some(playhead) = save(service.as_ref(), &content, state).await {
                saved.send_replace(Some(playhead));
            }
        });
    }

    debug!(content_id = %content.id, "playhead loop stopped");
}

/// Handle to a running persistence loop
pub struct PlayheadLoop {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    saved: watch::Receiver<Option<Playhead>>,
}

impl PlayheadLoop {
    /// Playhead of the most recent successful write
    pub fn last_saved(&self) -> Option<Playhead> {
        *self.saved.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stop the loop; no tick fires after this returns
    pub fn dispose(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PlayheadLoop {
    fn drop(&mut self) {
        self.dispose();
    }
}
