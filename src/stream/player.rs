//! Local Player - mpv/VLC playback surface
//!
//! Runs the resolved stream in an external player process and reports back to
//! the session as surface events: `Attachable` once the process is up, `Ended`
//! when the player exits cleanly and `Failed` when it can't be started or exits
//! with an error. Pausing or unloading kills the process without either.
//!
//! Position and pause state come from mpv's JSON IPC socket (`time-pos` and
//! `pause` property observers). VLC has no such channel here, so it reports no
//! progress and nothing is persisted for it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::PreviewImage;
use crate::session::{LoadRequest, PlaybackSurface, SurfaceEvent};

/// mpv creates its socket shortly after start
const IPC_CONNECT_ATTEMPTS: u32 = 50;
const IPC_CONNECT_RETRY: Duration = Duration::from_millis(100);

/// Supported local players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerType {
    /// mpv media player (default)
    #[default]
    Mpv,
    /// VLC media player
    Vlc,
}

impl PlayerType {
    /// Get the command name for this player
    pub fn command(&self) -> &'static str {
        match self {
            PlayerType::Vlc => {
                // On macOS, VLC is an app bundle - check for it
                #[cfg(target_os = "macos")]
                if std::path::Path::new("/Applications/VLC.app").exists() {
                    return "/Applications/VLC.app/Contents/MacOS/VLC";
                }
                "vlc"
            }
            PlayerType::Mpv => "mpv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Vlc => "VLC",
            PlayerType::Mpv => "mpv",
        }
    }

    /// Command-line arguments for `request`
    pub fn args(&self, request: &LoadRequest) -> Vec<String> {
        let mut args = vec![request.url.clone()];
        match self {
            PlayerType::Vlc => {
                if let Some(start) = request.start_at {
                    args.push(format!("--start-time={start}"));
                }
                args.push(format!("--meta-title={}", request.title));
                args.push("--no-video-title-show".to_string());
            }
            PlayerType::Mpv => {
                if let Some(start) = request.start_at {
                    args.push(format!("--start={start}"));
                }
                args.push(format!("--force-media-title={}", request.title));
                args.push("--force-window=immediate".to_string());
            }
        }
        args
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PlayerType {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mpv" => Ok(PlayerType::Mpv),
            "vlc" => Ok(PlayerType::Vlc),
            other => Err(PlayerError::Unknown(other.to_string())),
        }
    }
}

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
    #[error("Unknown player '{0}' (expected mpv or vlc)")]
    Unknown(String),
}

/// External player process driven as a playback surface
pub struct LocalPlayer {
    player_type: PlayerType,
    program: String,
    events: mpsc::Sender<SurfaceEvent>,
    running: Option<CancellationToken>,
}

impl LocalPlayer {
    pub fn new(player_type: PlayerType, events: mpsc::Sender<SurfaceEvent>) -> Self {
        Self {
            player_type,
            program: player_type.command().to_string(),
            events,
            running: None,
        }
    }

    /// Run a specific executable instead of the player's default command
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Check if the player is available on the system
    pub async fn is_available(&self) -> bool {
        let cmd = self.program.as_str();

        // If it's a full path (macOS app bundle), check if it exists
        if cmd.starts_with('/') {
            return std::path::Path::new(cmd).exists();
        }

        Command::new("which")
            .arg(cmd)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn spawn(&self, request: &LoadRequest, ipc: Option<&Path>) -> Result<Child, PlayerError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.player_type.args(request));
        if let Some(path) = ipc {
            cmd.arg(format!("--input-ipc-server={}", path.display()));
        }
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(self.program.clone())
            } else {
                PlayerError::StartFailed(e)
            }
        })
    }

    fn stop_child(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
        }
    }
}

impl PlaybackSurface for LocalPlayer {
    fn load(&mut self, request: LoadRequest) {
        self.stop_child();

        let ipc = (self.player_type == PlayerType::Mpv).then(ipc_socket_path);
        let child = match self.spawn(&request, ipc.as_deref()) {
            Ok(child) => child,
            Err(e) => {
                error!(player = %self.player_type, error = %e, "player failed to start");
                let events = self.events.clone();
                tokio::spawn(async move {
                    let _ = events
                        .send(SurfaceEvent::Failed {
                            reason: e.to_string(),
                        })
                        .await;
                });
                return;
            }
        };

        info!(player = %self.player_type, title = %request.title, start_at = ?request.start_at, "player started");
        let token = CancellationToken::new();
        self.running = Some(token.clone());
        tokio::spawn(watch_child(
            child,
            self.player_type,
            ipc,
            self.events.clone(),
            token,
        ));
    }

    fn pause(&mut self) {
        self.stop_child();
    }

    fn show_preview(&mut self, image: Option<&PreviewImage>) {
        debug!(bytes = image.map(PreviewImage::len), "scrub preview");
    }

    fn unload(&mut self) {
        self.stop_child();
    }
}

impl Drop for LocalPlayer {
    fn drop(&mut self) {
        self.stop_child();
    }
}

fn ipc_socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("vodplay-mpv-{}.sock", Uuid::new_v4()))
}

async fn watch_child(
    mut child: Child,
    player_type: PlayerType,
    ipc: Option<PathBuf>,
    events: mpsc::Sender<SurfaceEvent>,
    token: CancellationToken,
) {
    if events.send(SurfaceEvent::Attachable).await.is_err() {
        let _ = child.kill().await;
        return;
    }

    let reporter = ipc
        .clone()
        .map(|path| tokio::spawn(report_progress(path, events.clone())));

    let status = tokio::select! {
        biased;
        _ = token.cancelled() => {
            let _ = child.kill().await;
            debug!("player stopped");
            None
        }
        status = child.wait() => Some(status),
    };

    if let Some(reporter) = reporter {
        reporter.abort();
    }
    if let Some(path) = ipc {
        let _ = tokio::fs::remove_file(path).await;
    }

    let event = match status {
        None => return,
        Some(Ok(status)) if status.success() => {
            debug!(%status, "player exited");
            SurfaceEvent::Ended
        }
        Some(Ok(status)) => {
            warn!(player = %player_type, %status, "player exited with an error");
            SurfaceEvent::Failed {
                reason: format!("{} exited with {}", player_type, status),
            }
        }
        Some(Err(e)) => SurfaceEvent::Failed {
            reason: format!("lost track of {}: {}", player_type, e),
        },
    };
    let _ = events.send(event).await;
}

/// One line of mpv's JSON IPC output
#[derive(Debug, Deserialize)]
struct IpcMessage {
    event: Option<String>,
    name: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Map an mpv IPC line to a surface event
fn ipc_event(line: &str) -> Option<SurfaceEvent> {
    let message: IpcMessage = serde_json::from_str(line).ok()?;
    if message.event.as_deref() != Some("property-change") {
        return None;
    }
    match (message.name.as_deref()?, message.data) {
        ("time-pos", Value::Number(n)) => n
            .as_f64()
            .map(|position_secs| SurfaceEvent::TimeUpdate { position_secs }),
        ("pause", Value::Bool(true)) => Some(SurfaceEvent::Paused),
        ("pause", Value::Bool(false)) => Some(SurfaceEvent::Resumed),
        _ => None,
    }
}

fn observe_commands() -> [String; 2] {
    [
        serde_json::json!({ "command": ["observe_property", 1, "time-pos"] }).to_string(),
        serde_json::json!({ "command": ["observe_property", 2, "pause"] }).to_string(),
    ]
}

/// Forward mpv's position and pause state until the socket closes
#[cfg(unix)]
async fn report_progress(path: PathBuf, events: mpsc::Sender<SurfaceEvent>) {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    let mut stream = None;
    for _ in 0..IPC_CONNECT_ATTEMPTS {
        match UnixStream::connect(&path).await {
            Ok(connected) => {
                stream = Some(connected);
                break;
            }
            Err(_) => tokio::time::sleep(IPC_CONNECT_RETRY).await,
        }
    }
    let Some(stream) = stream else {
        warn!(path = %path.display(), "mpv IPC socket never appeared, no progress reported");
        return;
    };

    let (reader, mut writer) = stream.into_split();
    for command in observe_commands() {
        if writer.write_all(format!("{}\n", command).as_bytes()).await.is_err() {
            return;
        }
    }

    // time-pos changes every frame; the session only needs whole seconds
    let mut last_second = None;
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Some(event) = ipc_event(&line) else {
            continue;
        };
        if let SurfaceEvent::TimeUpdate { position_secs } = event {
            let second = position_secs.floor() as i64;
            if last_second == Some(second) {
                continue;
            }
            last_second = Some(second);
        }
        if events.send(event).await.is_err() {
            return;
        }
    }
}

#[cfg(not(unix))]
async fn report_progress(path: PathBuf, _events: mpsc::Sender<SurfaceEvent>) {
    warn!(path = %path.display(), "mpv IPC needs unix sockets, no progress reported");
}
