#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Stagehand - terminal shell for the scripted agent demo.
//!
//! Everything the agent "does" is scripted: streamed prose, tool calls with
//! sub-task progress, checkpoints that wait for a choice, a drill-down
//! dashboard and a generated slide deck.
//!
//! Run with: `cargo run -p stagehand-cli`
//!
//! Or start a query right away:
//! `cargo run -p stagehand-cli -- --query "analyze Q3 sales"`
//!
//! Or print frames without the interactive shell:
//! `cargo run -p stagehand-cli -- --snapshot --query "make a deck" --choices 6`

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stagehand_config::Config;
use tracing::info;

mod config_bridge;
mod snapshot;
mod ui;

use snapshot::SnapshotOptions;
use ui::App;

/// Smallest frame the layout can draw.
const MIN_WIDTH: u16 = 40;
const MIN_HEIGHT: u16 = 12;

/// Stagehand - scripted agent demo shell
#[derive(Parser, Debug)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the user config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Query to run right away
    #[arg(short, long)]
    query: Option<String>,

    /// Print frames instead of opening the interactive shell
    #[arg(long)]
    snapshot: bool,

    /// Frames to print in snapshot mode
    #[arg(long, default_value_t = 12)]
    frames: usize,

    /// Timer ticks delivered between snapshot frames
    #[arg(long, default_value_t = 60)]
    ticks: usize,

    /// Snapshot width (defaults to `demo.snapshot_width`)
    #[arg(long)]
    width: Option<u16>,

    /// Snapshot height (defaults to `demo.snapshot_height`)
    #[arg(long)]
    height: Option<u16>,

    /// Checkpoint answers in order, by value or label
    #[arg(long, value_delimiter = ',')]
    choices: Vec<String>,

    /// Keep ANSI colors in snapshot frames
    #[arg(long)]
    color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = !cli.snapshot;

    // Set up logging from config, with --verbose override.
    let loaded = Config::load(cli.config.as_deref());
    let mut log_config = match &loaded {
        Ok(l) => config_bridge::to_log_config(&l.config, interactive)
            .unwrap_or_else(|_| config_bridge::fallback_log_config(interactive)),
        // Fallback if config loading fails; the error is reported below.
        Err(_) => config_bridge::fallback_log_config(interactive),
    };
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = stagehand_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let loaded = loaded.context("failed to load configuration")?;
    info!(files = ?loaded.loaded_files, "configuration loaded");
    let config = loaded.config;

    let mut app = App::new(config_bridge::to_conversation_settings(&config));

    if cli.snapshot {
        match cli.query.as_deref() {
            Some(query) => app.submit(query),
            None => {
                let kind = config_bridge::default_scenario(&config);
                app.start_kind(kind, &kind.to_string());
            },
        }
        let options = SnapshotOptions {
            frames: cli.frames,
            ticks_per_frame: cli.ticks.max(1),
            width: cli.width.unwrap_or(config.demo.snapshot_width).max(MIN_WIDTH),
            height: cli.height.unwrap_or(config.demo.snapshot_height).max(MIN_HEIGHT),
            choices: cli.choices,
            color: cli.color,
        };
        let mut out = io::stdout().lock();
        snapshot::run(&mut app, &options, &mut out)?;
        return Ok(());
    }

    if let Some(query) = cli.query.as_deref() {
        app.submit(query);
    }

    let mut terminal = ui::init_terminal()?;
    let result = app.run(&mut terminal);
    ui::restore_terminal(&mut terminal)?;
    result?;

    info!("shell closed");
    Ok(())
}
