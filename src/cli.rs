//! CLI - Command Line Interface for vodplay
//!
//! Every lookup the player performs is scriptable on its own. All output is
//! JSON-parseable when stdout is not a terminal.
//!
//! # Examples
//!
//! ```bash
//! # Play an episode, resuming where you left off
//! vodplay play GRDV0019R --audio es-ES
//!
//! # Inspect tracks and the resolved stream
//! vodplay tracks GRDV0019R --json
//! vodplay streams GRDV0019R --audio ja-JP
//!
//! # Navigation and previews
//! vodplay next GRDV0019R
//! vodplay previews GRDV0019R --out ./thumbs
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::stream::PlayerType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Content or adjacent item not found
    NotFound = 4,
    /// No playable stream
    StreamUnavailable = 5,
    /// Player failed to start
    PlayerFailed = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// vodplay - resumable VOD playback from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "vodplay",
    version,
    about = "Resumable VOD playback from the terminal",
    long_about = "Resolves streams, picks audio and subtitle tracks, keeps your \
                  resume position in sync and moves on to the next episode.",
    after_help = "EXAMPLES:\n\
                  vodplay play GRDV0019R                Play, resuming if possible\n\
                  vodplay play GRDV0019R -a es-ES       Play the Spanish dub\n\
                  vodplay tracks GRDV0019R --json       List audio tracks\n\
                  vodplay next GRDV0019R                Show the next episode"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play content in a local player
    #[command(visible_alias = "p")]
    Play(PlayCmd),

    /// List audio tracks and the default selection
    #[command(visible_alias = "t")]
    Tracks(ContentArg),

    /// Resolve the stream for an audio track
    #[command(visible_alias = "st")]
    Streams(StreamsCmd),

    /// Show the saved resume position
    #[command(visible_alias = "ph")]
    Playhead(ContentArg),

    /// Show the next item
    #[command(visible_alias = "n")]
    Next(ContentArg),

    /// Show the previous item
    Prev(ContentArg),

    /// Extract scrub preview thumbnails
    #[command(visible_alias = "pv")]
    Previews(PreviewsCmd),
}

/// A single content id
#[derive(Args, Debug)]
pub struct ContentArg {
    /// Content id
    #[arg(required = true)]
    pub content_id: String,
}

/// Play content
#[derive(Args, Debug)]
pub struct PlayCmd {
    /// Content id
    #[arg(required = true)]
    pub content_id: String,

    /// Player to use (overrides config)
    #[arg(long, short = 'p', value_enum)]
    pub player: Option<PlayerChoice>,

    /// Preferred audio locale (overrides config)
    #[arg(long, short = 'a')]
    pub audio: Option<String>,

    /// Preferred subtitle locale (overrides config)
    #[arg(long, short = 's')]
    pub subtitle: Option<String>,
}

/// Player choice for local playback
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerChoice {
    Mpv,
    Vlc,
}

impl From<PlayerChoice> for PlayerType {
    fn from(choice: PlayerChoice) -> Self {
        match choice {
            PlayerChoice::Mpv => PlayerType::Mpv,
            PlayerChoice::Vlc => PlayerType::Vlc,
        }
    }
}

/// Resolve a stream
#[derive(Args, Debug)]
pub struct StreamsCmd {
    /// Content id
    #[arg(required = true)]
    pub content_id: String,

    /// Audio locale (default: preferred, then ja-JP, then first)
    #[arg(long, short = 'a')]
    pub audio: Option<String>,
}

/// Extract previews
#[derive(Args, Debug)]
pub struct PreviewsCmd {
    /// Content id
    #[arg(required = true)]
    pub content_id: String,

    /// Write each thumbnail as NNNN.jpg into this directory
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Preview extraction summary
#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub count: usize,
    pub sizes: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,
}

/// Result of a finished play command
#[derive(Debug, Serialize, Deserialize)]
pub struct PlayResult {
    pub session_id: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_content_id: Option<String>,
    pub position_secs: u64,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
