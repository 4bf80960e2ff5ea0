//! Playback session
//!
//! One session turns a content item into running, track-selected, resumable,
//! navigable playback:
//!
//! ```text
//! Idle → Resolving → Ready → Playing ⇄ Paused → Navigating → Resolving …
//!                                                         ↘ Ended
//!        (any live state) → Failed
//! ```
//!
//! The session runs as a single task. Host commands and surface events arrive
//! on channels; stream resolutions and preview downloads run as spawned tasks
//! that report back tagged with a generation number. A result whose generation
//! is not the current one is dropped, so a superseded resolution can never be
//! applied. Teardown stops the persistence loop, disposes the subtitle
//! renderer and cancels in-flight work no matter how the session ends.

mod state;
mod surface;

pub use state::SessionState;
pub use surface::{LoadRequest, Navigator, PlaybackSurface, SurfaceEvent};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::ContentService;
use crate::models::{
    AudioTrack, ContentItem, MediaState, Playhead, PreviewSet, Step, StreamDescriptor,
    SubtitleTrack,
};
use crate::navigation;
use crate::stream::playhead::{PlayheadLoop, PlayheadTracker, PERSIST_INTERVAL};
use crate::stream::preview;
use crate::stream::resolver::{self, ResolveError};
use crate::stream::subtitles::{SubtitleRendererLifecycle, SurfaceFactory};
use crate::tracks::{self, REFERENCE_AUDIO_LOCALE};

/// Session errors surfaced to the host
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    StreamUnavailable(#[from] ResolveError),
    #[error("Playback surface failed: {0}")]
    Surface(String),
    #[error("Session already started")]
    AlreadyStarted,
    #[error("Session already closed")]
    Closed,
}

/// How a session finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Content ran out (no adjacent item)
    Ended,
    /// Stopped by the host or the user
    Stopped,
    Failed(SessionError),
}

/// Host requests
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Index into the content's audio tracks
    SelectAudio(usize),
    /// Index into the stream's subtitle tracks (0 is "off")
    SelectSubtitle(usize),
    Next,
    Previous,
    SwitchContent(ContentItem),
    Stop,
}

/// Per-session preferences
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub preferred_audio_locale: String,
    pub preferred_subtitle_locale: String,
    pub persist_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preferred_audio_locale: REFERENCE_AUDIO_LOCALE.to_string(),
            preferred_subtitle_locale: "en-US".to_string(),
            persist_interval: PERSIST_INTERVAL,
        }
    }
}

/// Receiving ends of the session's input channels
pub struct SessionInputs {
    pub commands: mpsc::Receiver<SessionCommand>,
    pub events: mpsc::Receiver<SurfaceEvent>,
}

/// Create the command and surface-event channels for a session
pub fn channels(
    buffer: usize,
) -> (
    mpsc::Sender<SessionCommand>,
    mpsc::Sender<SurfaceEvent>,
    SessionInputs,
) {
    let (command_tx, commands) = mpsc::channel(buffer);
    let (event_tx, events) = mpsc::channel(buffer);
    (command_tx, event_tx, SessionInputs { commands, events })
}

/// Host-side handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn new(commands: mpsc::Sender<SessionCommand>, state: watch::Receiver<SessionState>) -> Self {
        Self { commands, state }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the session reaches `target` or a terminal state
    pub async fn wait_for(&mut self, target: SessionState) -> SessionState {
        let reached = self
            .state
            .wait_for(|s| *s == target || s.is_terminal())
            .await
            .map(|s| *s);
        reached.unwrap_or_else(|_| *self.state.borrow())
    }

    /// Queue a command; `false` once the session is gone
    pub async fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    pub async fn next(&self) -> bool {
        self.send(SessionCommand::Next).await
    }

    pub async fn previous(&self) -> bool {
        self.send(SessionCommand::Previous).await
    }

    pub async fn stop(&self) -> bool {
        self.send(SessionCommand::Stop).await
    }
}

/// Results of spawned work, tagged with the generation that started it
enum Completion {
    Resolved {
        generation: u64,
        result: Result<(StreamDescriptor, Playhead), ResolveError>,
    },
    Previews {
        generation: u64,
        previews: PreviewSet,
    },
}

#[derive(Debug, Default)]
enum Previews {
    #[default]
    NotLoaded,
    Loading,
    Loaded(PreviewSet),
}

/// The playback orchestrator; see the module docs
pub struct PlaybackSession {
    id: Uuid,
    service: Arc<dyn ContentService>,
    config: SessionConfig,
    tracker: PlayheadTracker,
    surface: Box<dyn PlaybackSurface>,
    navigator: Box<dyn Navigator>,
    subtitles: SubtitleRendererLifecycle,

    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    content: Option<ContentItem>,
    audio_tracks: Vec<AudioTrack>,
    audio: Option<AudioTrack>,
    stream: Option<StreamDescriptor>,
    subtitle: SubtitleTrack,
    playhead: Playhead,
    previews: Previews,
    pending_scrub: Option<f64>,
    surface_attachable: bool,

    media_tx: watch::Sender<MediaState>,
    playhead_loop: Option<PlayheadLoop>,
    generation: u64,
    in_flight: Option<CancellationToken>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    torn_down: bool,
}

impl PlaybackSession {
    pub fn new(
        service: Arc<dyn ContentService>,
        config: SessionConfig,
        surface: Box<dyn PlaybackSurface>,
        subtitle_factory: SurfaceFactory,
        navigator: Box<dyn Navigator>,
    ) -> Self {
        let tracker = PlayheadTracker::with_period(Arc::clone(&service), config.persist_interval);
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (media_tx, _) = watch::channel(MediaState::default());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Self {
            id: Uuid::new_v4(),
            service,
            config,
            tracker,
            surface,
            navigator,
            subtitles: SubtitleRendererLifecycle::new(subtitle_factory),
            state: SessionState::Idle,
            state_tx,
            content: None,
            audio_tracks: Vec::new(),
            audio: None,
            stream: None,
            subtitle: SubtitleTrack::off(),
            playhead: Playhead::default(),
            previews: Previews::NotLoaded,
            pending_scrub: None,
            surface_attachable: false,
            media_tx,
            playhead_loop: None,
            generation: 0,
            in_flight: None,
            completions_tx,
            completions_rx,
            torn_down: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Handle for driving this session from elsewhere
    pub fn handle(&self, commands: mpsc::Sender<SessionCommand>) -> SessionHandle {
        SessionHandle::new(commands, self.subscribe())
    }

    pub fn content(&self) -> Option<&ContentItem> {
        self.content.as_ref()
    }

    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio_tracks
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    pub fn stream(&self) -> Option<&StreamDescriptor> {
        self.stream.as_ref()
    }

    pub fn subtitle(&self) -> &SubtitleTrack {
        &self.subtitle
    }

    /// Latest known playhead (restored, or last successful write)
    pub fn playhead(&self) -> Playhead {
        self.playhead_loop
            .as_ref()
            .and_then(PlayheadLoop::last_saved)
            .unwrap_or(self.playhead)
    }

    pub fn previews(&self) -> Option<&PreviewSet> {
        match &self.previews {
            Previews::Loaded(set) => Some(set),
            _ => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // =========================================================================
    // Driving the session
    // =========================================================================

    /// Begin playback of `content`
    pub fn start(&mut self, content: ContentItem) -> Result<(), SessionError> {
        if self.torn_down {
            return Err(SessionError::Closed);
        }
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyStarted);
        }
        info!(session = %self.id, content_id = %content.id, "starting session");
        self.begin(content);
        Ok(())
    }

    /// Process inputs until the session finishes
    pub async fn run(&mut self, inputs: &mut SessionInputs) -> SessionOutcome {
        loop {
            if let Some(outcome) = self.step(inputs).await {
                return outcome;
            }
        }
    }

    /// Handle one input; `Some` once the session has finished
    pub async fn step(&mut self, inputs: &mut SessionInputs) -> Option<SessionOutcome> {
        tokio::select! {
            biased;
            Some(completion) = self.completions_rx.recv() => self.on_completion(completion),
            command = inputs.commands.recv() => match command {
                Some(command) => self.on_command(command).await,
                None => Some(self.stop().await),
            },
            event = inputs.events.recv() => match event {
                Some(event) => self.on_surface_event(event).await,
                None => {
                    warn!(session = %self.id, "playback surface closed");
                    Some(self.stop().await)
                }
            },
        }
    }

    /// Stop playback: final best-effort persist, then full teardown
    pub async fn stop(&mut self) -> SessionOutcome {
        if matches!(self.state, SessionState::Playing | SessionState::Paused) {
            self.surface.pause();
            self.persist_now().await;
        }
        self.teardown();
        if self.state.can_transition_to(SessionState::Ended) {
            self.transition(SessionState::Ended);
        }
        self.navigator.exit();
        SessionOutcome::Stopped
    }

    // =========================================================================
    // Input handlers
    // =========================================================================

    async fn on_command(&mut self, command: SessionCommand) -> Option<SessionOutcome> {
        debug!(session = %self.id, ?command, state = ?self.state, "command");
        if self.state.is_terminal() {
            return None;
        }

        match command {
            SessionCommand::SelectAudio(index) => {
                let Some(track) = self.audio_tracks.get(index).cloned() else {
                    warn!(index, "no such audio track");
                    return None;
                };
                if self.audio.as_ref() == Some(&track) {
                    return None;
                }
                if self.state.has_stream() {
                    self.surface.pause();
                }
                self.audio = Some(track);
                self.begin_resolution();
                None
            }
            SessionCommand::SelectSubtitle(index) => {
                if !self.state.has_stream() {
                    debug!(index, state = ?self.state, "no stream loaded, subtitle selection ignored");
                    return None;
                }
                let Some(track) = self
                    .stream
                    .as_ref()
                    .and_then(|s| s.subtitle_tracks.get(index))
                    .cloned()
                else {
                    warn!(index, "no such subtitle track");
                    return None;
                };
                self.subtitle = track;
                self.apply_subtitle();
                None
            }
            SessionCommand::Next => self.navigate(Step::Next).await,
            SessionCommand::Previous => self.navigate(Step::Previous).await,
            SessionCommand::SwitchContent(content) => {
                if matches!(self.state, SessionState::Playing | SessionState::Paused) {
                    self.surface.pause();
                    self.persist_now().await;
                }
                self.begin(content);
                None
            }
            SessionCommand::Stop => Some(self.stop().await),
        }
    }

    async fn on_surface_event(&mut self, event: SurfaceEvent) -> Option<SessionOutcome> {
        match event {
            SurfaceEvent::Attachable => {
                self.surface_attachable = true;
                if self.state.has_stream() {
                    self.apply_subtitle();
                }
            }
            SurfaceEvent::TimeUpdate { position_secs } => {
                if self.state == SessionState::Ready {
                    self.transition(SessionState::Playing);
                }
                if self.state.has_stream() {
                    self.publish_media(Some(position_secs));
                }
            }
            SurfaceEvent::Paused => {
                if self.state == SessionState::Playing {
                    self.transition(SessionState::Paused);
                    self.publish_media(None);
                }
            }
            SurfaceEvent::Resumed => {
                if matches!(self.state, SessionState::Ready | SessionState::Paused) {
                    self.transition(SessionState::Playing);
                    self.publish_media(None);
                }
            }
            SurfaceEvent::Ended => {
                if self.state.has_stream() {
                    return self.navigate(Step::Next).await;
                }
            }
            SurfaceEvent::Failed { reason } => {
                // Only the currently loaded stream can fail
                if self.state.has_stream() {
                    return Some(self.fail(SessionError::Surface(reason)));
                }
            }
            SurfaceEvent::JumpForward => return self.navigate(Step::Next).await,
            SurfaceEvent::JumpBackward => return self.navigate(Step::Previous).await,
            SurfaceEvent::Scrub { proportion } => self.on_scrub(proportion),
        }
        None
    }

    fn on_completion(&mut self, completion: Completion) -> Option<SessionOutcome> {
        match completion {
            Completion::Resolved { generation, result } => {
                if generation != self.generation || self.state != SessionState::Resolving {
                    debug!(
                        session = %self.id,
                        generation,
                        current = self.generation,
                        "discarding stale resolution"
                    );
                    return None;
                }
                match result {
                    Ok((stream, playhead)) => {
                        self.on_resolved(stream, playhead);
                        None
                    }
                    Err(e) => Some(self.fail(e.into())),
                }
            }
            Completion::Previews {
                generation,
                previews,
            } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "discarding stale previews");
                    return None;
                }
                self.previews = Previews::Loaded(previews);
                if let Some(proportion) = self.pending_scrub.take() {
                    self.on_scrub(proportion);
                }
                None
            }
        }
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Make `content` current and resolve its default audio track
    fn begin(&mut self, content: ContentItem) {
        self.stop_playhead_loop();

        self.audio_tracks = tracks::build_audio_tracks(&content);
        self.audio =
            tracks::select_default_audio(&self.audio_tracks, &self.config.preferred_audio_locale)
                .cloned();
        self.content = Some(content);
        self.stream = None;
        self.subtitle = SubtitleTrack::off();
        self.playhead = Playhead::default();
        self.media_tx.send_replace(MediaState::default());
        self.begin_resolution();
    }

    /// Start a new resolution, superseding any in flight
    fn begin_resolution(&mut self) {
        let (Some(content), Some(audio)) = (self.content.clone(), self.audio.clone()) else {
            return;
        };
        if !self.transition(SessionState::Resolving) {
            return;
        }

        self.stop_playhead_loop();
        self.publish_media(None);
        self.previews = Previews::NotLoaded;
        self.pending_scrub = None;

        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());

        let service = Arc::clone(&self.service);
        let tracker = self.tracker.clone();
        let completions = self.completions_tx.clone();
        debug!(session = %self.id, generation, content_id = %content.id, "resolution started");

        tokio::spawn(async move {
            let work = async {
                tokio::join!(
                    resolver::resolve(service.as_ref(), &content, &audio),
                    tracker.restore(&content),
                )
            };
            tokio::select! {
                _ = token.cancelled() => {}
                (stream, playhead) = work => {
                    let result = stream.map(|s| (s, playhead));
                    let _ = completions.send(Completion::Resolved { generation, result });
                }
            }
        });
    }

    fn on_resolved(&mut self, stream: StreamDescriptor, playhead: Playhead) {
        self.in_flight = None;
        self.playhead = playhead;

        // Keep a user-picked subtitle locale across audio changes
        let wanted = if self.subtitle.is_off() {
            self.config.preferred_subtitle_locale.clone()
        } else {
            self.subtitle.locale.clone()
        };
        self.subtitle = tracks::select_default_subtitle(&stream.subtitle_tracks, &wanted)
            .cloned()
            .unwrap_or_else(SubtitleTrack::off);

        let Some(content) = self.content.clone() else {
            return;
        };
        let request = LoadRequest {
            url: stream.url.clone(),
            title: content.to_string(),
            poster: content.poster.clone(),
            start_at: playhead.resume_at(),
        };
        self.stream = Some(stream);
        self.transition(SessionState::Ready);
        // Until the surface reports progress the resume point is the position
        self.media_tx.send_modify(|media| {
            media.position_secs = playhead.position_secs as f64;
        });

        self.surface.load(request);
        self.playhead_loop = Some(
            self.tracker
                .start_loop(content, self.media_tx.subscribe()),
        );
        if self.surface_attachable {
            self.apply_subtitle();
        }
    }

    fn apply_subtitle(&mut self) {
        if !self.surface_attachable || !self.state.has_stream() {
            return;
        }
        if let Err(e) = self.subtitles.select(&self.subtitle) {
            warn!(session = %self.id, error = %e, "subtitle selection failed");
        }
    }

    fn on_scrub(&mut self, proportion: f64) {
        if !self.state.has_stream() {
            return;
        }
        match &self.previews {
            Previews::Loaded(set) => {
                let image = set.at_proportion(proportion);
                self.surface.show_preview(image);
            }
            Previews::Loading => self.pending_scrub = Some(proportion),
            Previews::NotLoaded => {
                let Some(url) = self
                    .stream
                    .as_ref()
                    .and_then(|s| s.preview_container.clone())
                else {
                    return;
                };
                self.previews = Previews::Loading;
                self.pending_scrub = Some(proportion);

                let generation = self.generation;
                let service = Arc::clone(&self.service);
                let completions = self.completions_tx.clone();
                tokio::spawn(async move {
                    let previews = preview::load_previews(service.as_ref(), &url).await;
                    let _ = completions.send(Completion::Previews {
                        generation,
                        previews,
                    });
                });
            }
        }
    }

    /// Pause, persist, then move to the adjacent item or end
    async fn navigate(&mut self, step: Step) -> Option<SessionOutcome> {
        let was_playing = matches!(self.state, SessionState::Playing | SessionState::Paused);
        if !self.transition(SessionState::Navigating) {
            return None;
        }
        self.surface.pause();
        // Nothing has played yet in Ready; the restored record stays as is
        if was_playing {
            self.persist_now().await;
        }
        self.stop_playhead_loop();
        self.publish_media(None);

        let content = self.content.clone()?;
        match navigation::find_adjacent(self.service.as_ref(), &content, step).await {
            Ok(Some(next)) => {
                info!(session = %self.id, from = %content.id, to = %next.id, ?step, "navigating");
                self.begin(next);
                None
            }
            Ok(None) => {
                info!(session = %self.id, content_id = %content.id, ?step, "no adjacent content");
                Some(self.finish())
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "adjacency lookup failed, ending");
                Some(self.finish())
            }
        }
    }

    fn finish(&mut self) -> SessionOutcome {
        self.teardown();
        self.transition(SessionState::Ended);
        self.navigator.exit();
        SessionOutcome::Ended
    }

    fn fail(&mut self, e: SessionError) -> SessionOutcome {
        error!(session = %self.id, error = %e, "playback failed");
        self.teardown();
        self.transition(SessionState::Failed);
        SessionOutcome::Failed(e)
    }

    /// Persist the current position right now
    async fn persist_now(&mut self) {
        let Some(content) = self.content.clone() else {
            return;
        };
        let media = *self.media_tx.borrow();
        if let Some(saved) = self.tracker.persist(&content, media).await {
            self.playhead = saved;
        }
    }

    fn stop_playhead_loop(&mut self) {
        if let Some(mut playhead_loop) = self.playhead_loop.take() {
            if let Some(saved) = playhead_loop.last_saved() {
                self.playhead = saved;
            }
            playhead_loop.dispose();
        }
    }

    /// Publish sampled media state; paused whenever we're not Playing
    fn publish_media(&self, position_secs: Option<f64>) {
        let paused = self.state != SessionState::Playing;
        self.media_tx.send_modify(|media| {
            if let Some(position) = position_secs {
                media.position_secs = position.max(0.0);
            }
            media.paused = paused;
        });
    }

    fn transition(&mut self, next: SessionState) -> bool {
        if self.state == next {
            return true;
        }
        if !self.state.can_transition_to(next) {
            warn!(session = %self.id, from = ?self.state, to = ?next, "rejected state transition");
            return false;
        }
        info!(session = %self.id, from = ?self.state, to = ?next, "state transition");
        self.state = next;
        self.state_tx.send_replace(next);
        true
    }

    /// Release everything the session owns; safe to call repeatedly
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.stop_playhead_loop();
        self.subtitles.dispose();
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        // Anything still in flight is stale from here on
        self.generation += 1;
        self.surface.unload();
        debug!(session = %self.id, "session torn down");
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
