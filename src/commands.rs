//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the appropriate backend services.
//! Each handler takes CLI args and Output, returns ExitCode.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::api::{ApiError, ContentService, HttpContentService};
use crate::catalog;
use crate::cli::{
    ContentArg, ExitCode, Output, PlayCmd, PlayResult, PreviewSummary, PreviewsCmd, StreamsCmd,
};
use crate::config::Config;
use crate::models::{AudioTrack, ContentItem, PreviewSet, Step};
use crate::navigation;
use crate::session::{self, PlaybackSession, SessionError, SessionOutcome};
use crate::stream::player::LocalPlayer;
use crate::stream::playhead::PlayheadTracker;
use crate::stream::subtitles::{ChannelSubtitleSurface, SubtitleCommand, SubtitleSurface};
use crate::stream::{preview, resolver, PlayerType};
use crate::tracks;

// =============================================================================
// Shared Helpers
// =============================================================================

fn service(config: &Config) -> Arc<dyn ContentService> {
    Arc::new(HttpContentService::with_base_url(
        config.api_base_url.clone(),
        config.access_token.clone(),
        config.account_id.clone(),
    ))
}

fn api_exit_code(e: &ApiError) -> ExitCode {
    match e {
        ApiError::NotFound => ExitCode::NotFound,
        ApiError::NotConfigured(_) => ExitCode::InvalidArgs,
        _ => ExitCode::NetworkError,
    }
}

/// Look up and normalize a content item
async fn fetch_content(
    service: &dyn ContentService,
    content_id: &str,
    output: &Output,
) -> Result<ContentItem, ExitCode> {
    output.info(format!("Looking up: {}", content_id));

    match service.get_content(content_id).await {
        Ok(Some(raw)) => Ok(catalog::normalize(&raw)),
        Ok(None) => Err(output.error(
            format!("Content not found: {}", content_id),
            ExitCode::NotFound,
        )),
        Err(e) => Err(output.error(format!("Content lookup failed: {}", e), api_exit_code(&e))),
    }
}

/// Audio track for an explicit locale, or the default policy
fn pick_audio(content: &ContentItem, locale: Option<&str>, config: &Config) -> Option<AudioTrack> {
    let audio_tracks = tracks::build_audio_tracks(content);
    let wanted = locale.unwrap_or(&config.preferred_audio_locale);
    tracks::select_default_audio(&audio_tracks, wanted).cloned()
}

fn print_or_error<T: Serialize>(output: &Output, data: T) -> ExitCode {
    match output.print(data) {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

// =============================================================================
// Tracks Command
// =============================================================================

#[derive(Serialize)]
struct TrackListing {
    content: ContentItem,
    audio_tracks: Vec<AudioTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_audio: Option<AudioTrack>,
}

pub async fn tracks_cmd(cmd: ContentArg, config: &Config, output: &Output) -> ExitCode {
    let service = service(config);
    let content = match fetch_content(service.as_ref(), &cmd.content_id, output).await {
        Ok(content) => content,
        Err(code) => return code,
    };

    let audio_tracks = tracks::build_audio_tracks(&content);
    let default_audio =
        tracks::select_default_audio(&audio_tracks, &config.preferred_audio_locale).cloned();

    print_or_error(
        output,
        TrackListing {
            content,
            audio_tracks,
            default_audio,
        },
    )
}

// =============================================================================
// Streams Command
// =============================================================================

pub async fn streams_cmd(cmd: StreamsCmd, config: &Config, output: &Output) -> ExitCode {
    let service = service(config);
    let content = match fetch_content(service.as_ref(), &cmd.content_id, output).await {
        Ok(content) => content,
        Err(code) => return code,
    };

    let Some(audio) = pick_audio(&content, cmd.audio.as_deref(), config) else {
        return output.error("No audio track available", ExitCode::StreamUnavailable);
    };
    output.info(format!("Resolving {} ({})...", content, audio.locale));

    match resolver::resolve(service.as_ref(), &content, &audio).await {
        Ok(stream) => print_or_error(output, &stream),
        Err(e) => output.error(e.to_string(), ExitCode::StreamUnavailable),
    }
}

// =============================================================================
// Playhead Command
// =============================================================================

pub async fn playhead_cmd(cmd: ContentArg, config: &Config, output: &Output) -> ExitCode {
    if config.account_id.is_none() {
        return output.error(
            "No account id configured (set VODPLAY_ACCOUNT_ID)",
            ExitCode::InvalidArgs,
        );
    }

    let service = service(config);
    let content = match fetch_content(service.as_ref(), &cmd.content_id, output).await {
        Ok(content) => content,
        Err(code) => return code,
    };

    let playhead = PlayheadTracker::new(service).restore(&content).await;
    output.info(format!("{}: {}", content, playhead));
    print_or_error(output, playhead)
}

// =============================================================================
// Next / Prev Commands
// =============================================================================

pub async fn adjacent_cmd(cmd: ContentArg, step: Step, config: &Config, output: &Output) -> ExitCode {
    let service = service(config);
    let content = match fetch_content(service.as_ref(), &cmd.content_id, output).await {
        Ok(content) => content,
        Err(code) => return code,
    };

    match navigation::find_adjacent(service.as_ref(), &content, step).await {
        Ok(Some(item)) => print_or_error(output, &item),
        Ok(None) => {
            let direction = match step {
                Step::Next => "next",
                Step::Previous => "previous",
            };
            output.error(
                format!("No {} item for {}", direction, content.id),
                ExitCode::NotFound,
            )
        }
        Err(e) => output.error(format!("Adjacency lookup failed: {}", e), api_exit_code(&e)),
    }
}

// =============================================================================
// Previews Command
// =============================================================================

pub async fn previews_cmd(cmd: PreviewsCmd, config: &Config, output: &Output) -> ExitCode {
    let service = service(config);
    let content = match fetch_content(service.as_ref(), &cmd.content_id, output).await {
        Ok(content) => content,
        Err(code) => return code,
    };

    let Some(audio) = pick_audio(&content, None, config) else {
        return output.error("No audio track available", ExitCode::StreamUnavailable);
    };
    let stream = match resolver::resolve(service.as_ref(), &content, &audio).await {
        Ok(stream) => stream,
        Err(e) => return output.error(e.to_string(), ExitCode::StreamUnavailable),
    };
    let Some(container_url) = stream.preview_container.as_deref() else {
        return output.error("Stream has no preview container", ExitCode::NotFound);
    };

    let previews = preview::load_previews(service.as_ref(), container_url).await;
    output.info(format!("Extracted {} previews", previews.len()));

    if let Some(dir) = cmd.out.as_deref() {
        if let Err(e) = write_previews(dir, &previews).await {
            return output.error(format!("{:#}", e), ExitCode::Error);
        }
    }

    print_or_error(
        output,
        PreviewSummary {
            count: previews.len(),
            sizes: previews.iter().map(|p| p.len()).collect(),
            written_to: cmd.out,
        },
    )
}

/// Write previews as NNNN.jpg files
async fn write_previews(dir: &Path, previews: &PreviewSet) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for (index, image) in previews.iter().enumerate() {
        let path = dir.join(format!("{:04}.jpg", index));
        tokio::fs::write(&path, image.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

// =============================================================================
// Play Command
// =============================================================================

pub async fn play_cmd(cmd: PlayCmd, config: &Config, output: &Output) -> ExitCode {
    let mut config = config.clone();
    if let Some(audio) = cmd.audio {
        config.preferred_audio_locale = audio;
    }
    if let Some(subtitle) = cmd.subtitle {
        config.preferred_subtitle_locale = subtitle;
    }
    let player_type: PlayerType = cmd
        .player
        .map(PlayerType::from)
        .unwrap_or_else(|| config.player_type());

    let service = service(&config);
    let content = match fetch_content(service.as_ref(), &cmd.content_id, output).await {
        Ok(content) => content,
        Err(code) => return code,
    };

    let (command_tx, event_tx, mut inputs) = session::channels(32);
    let player = LocalPlayer::new(player_type, event_tx);
    if !player.is_available().await {
        return output.error(
            format!("{} not found. Install it first.", player_type.display_name()),
            ExitCode::PlayerFailed,
        );
    }

    let (subtitle_tx, subtitle_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(subtitle_worker(subtitle_rx));
    let subtitle_factory = Box::new(move |_url: &str| -> Box<dyn SubtitleSurface> {
        Box::new(ChannelSubtitleSurface::new(subtitle_tx.clone()))
    });

    let mut session = PlaybackSession::new(
        service,
        config.session_config(),
        Box::new(player),
        subtitle_factory,
        Box::new(|| info!("leaving player")),
    );

    // Ctrl-C stops the session cleanly (final persist, teardown)
    let handle = session.handle(command_tx);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop().await;
        }
    });

    output.info(format!("Playing {} in {}...", content, player_type.display_name()));
    if let Err(e) = session.start(content) {
        return output.error(e.to_string(), ExitCode::Error);
    }

    let outcome = session.run(&mut inputs).await;
    let result = PlayResult {
        session_id: session.id().to_string(),
        outcome: match &outcome {
            SessionOutcome::Ended => "ended".to_string(),
            SessionOutcome::Stopped => "stopped".to_string(),
            SessionOutcome::Failed(e) => format!("failed: {}", e),
        },
        last_content_id: session.content().map(|c| c.id.clone()),
        position_secs: session.playhead().position_secs,
    };

    match outcome {
        SessionOutcome::Failed(e @ SessionError::Surface(_)) => {
            output.error(e.to_string(), ExitCode::PlayerFailed)
        }
        SessionOutcome::Failed(e) => output.error(e.to_string(), ExitCode::StreamUnavailable),
        _ => print_or_error(output, result),
    }
}

/// Stand-in compositor: external players load subtitles themselves
async fn subtitle_worker(mut rx: tokio::sync::mpsc::UnboundedReceiver<SubtitleCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            SubtitleCommand::Attach(url) | SubtitleCommand::Switch(url) => {
                info!(%url, "subtitle track selected");
            }
            SubtitleCommand::Detach => info!("subtitles off"),
            SubtitleCommand::Dispose => break,
        }
    }
}
