//! vodplay - resumable VOD playback from the terminal
//!
//! # Usage
//!
//! ```bash
//! vodplay play GRDV0019R
//! vodplay tracks GRDV0019R --json
//! RUST_LOG=vodplay=debug vodplay next GRDV0019R
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vodplay::cli::{Cli, Command, ExitCode, Output};
use vodplay::commands;
use vodplay::config::Config;
use vodplay::models::Step;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}

/// Logs go to stderr so stdout stays JSON-parseable
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vodplay=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path).with_env_overrides(),
        None => Config::load(),
    };

    match cli.command {
        Command::Play(cmd) => commands::play_cmd(cmd, &config, &output).await,
        Command::Tracks(cmd) => commands::tracks_cmd(cmd, &config, &output).await,
        Command::Streams(cmd) => commands::streams_cmd(cmd, &config, &output).await,
        Command::Playhead(cmd) => commands::playhead_cmd(cmd, &config, &output).await,
        Command::Next(cmd) => commands::adjacent_cmd(cmd, Step::Next, &config, &output).await,
        Command::Prev(cmd) => commands::adjacent_cmd(cmd, Step::Previous, &config, &output).await,
        Command::Previews(cmd) => commands::previews_cmd(cmd, &config, &output).await,
    }
}
