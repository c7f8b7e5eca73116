//! Zelf CLI
//!
//! Terminal client for a Zelf agent. Each line typed on stdin is one turn;
//! the answer streams to stdout while the agent's nodes, tools and embeds are
//! listed on stderr.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the default server (http://localhost:8000)
//! zelf
//!
//! # Another server, with a location for weather-style tools
//! zelf --url http://agent.local:8000 --lat 40.7 --lon -74.0
//!
//! # Replay a recorded response offline
//! zelf --replay transcript.sse
//!
//! # Probe the server and exit
//! zelf --check
//!
//! # With verbose logging
//! RUST_LOG=debug zelf
//! ```
//!
//! # Environment Variables
//!
//! - `ZELF_API_URL`: Agent server base URL
//! - `ZELF_STREAM_PATH`, `ZELF_CONNECT_TIMEOUT_MS`, `ZELF_REQUEST_TIMEOUT_MS`,
//!   `ZELF_ERROR_MESSAGE`: see the configuration file
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)
//!
//! # Keys
//!
//! - Ctrl-C: cancel the answer in progress; when idle, exit

mod commands;
mod render;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use zelf_conductor::{
    load_config, AgentBackend, Conductor, ConductorConfig, HttpBackend, Location,
    ScriptedBackend,
};

use crate::commands::{Command, HELP};
use crate::render::{Painter, REFRESH_INTERVAL};

type Terminal = Painter<std::io::Stdout, std::io::Stderr>;

/// Chat with a Zelf agent from the terminal
#[derive(Debug, Parser)]
#[command(name = "zelf", version, about)]
struct Args {
    /// Agent server base URL (overrides config and ZELF_API_URL)
    #[arg(long)]
    url: Option<String>,

    /// Configuration file (default: $XDG_CONFIG_HOME/zelf/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Latitude sent with each message
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude sent with each message
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Replay a recorded SSE transcript instead of calling the server
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Check that the server is reachable, then exit
    #[arg(long)]
    check: bool,

    /// Do not list nodes and tools while the agent works
    #[arg(long)]
    no_trace: bool,
}

impl Args {
    fn location(&self) -> Option<Location> {
        Some(Location::new(self.lat?, self.lon?))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is the conversation
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("zelf_cli=info".parse()?)
                .add_directive("zelf_conductor=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &args.url {
        config = config.with_base_url(url.clone());
        config.validate().context("Invalid --url")?;
    }

    if let Some(path) = &args.replay {
        let transcript = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read transcript {}", path.display()))?;
        info!(path = %path.display(), bytes = transcript.len(), "Replaying transcript");
        run(ScriptedBackend::new(transcript), config, &args).await
    } else {
        let backend = HttpBackend::new(&config).context("Failed to create HTTP backend")?;
        info!(url = %backend.stream_url(), "Using agent server");
        run(backend, config, &args).await
    }
}

async fn run<B: AgentBackend + 'static>(backend: B, config: ConductorConfig, args: &Args) -> Result<()> {
    let (tx, mut updates) = mpsc::channel(config.update_capacity.max(1));
    let mut painter = Painter::new(std::io::stdout(), std::io::stderr(), !args.no_trace);
    let conductor = Conductor::new(backend, config).with_updates(tx);

    if args.check {
        let name = conductor.backend().name().to_string();
        if conductor.health_check().await {
            println!("{name} backend is healthy");
            return Ok(());
        }
        bail!("{name} backend is not reachable");
    }

    if let Some(location) = args.location() {
        conductor.set_location(Some(location));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // Notifications can be dropped when the channel is full; the tick makes
    // sure a turn is still noticed ending
    let mut tick = tokio::time::interval(REFRESH_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                if !handle_line(&conductor, &mut painter, &line)? {
                    break;
                }
            }
            Some(_) = updates.recv() => repaint(&conductor, &mut painter)?,
            _ = tick.tick(), if painter.in_turn() => repaint(&conductor, &mut painter)?,
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                if !conductor.cancel() {
                    break;
                }
                repaint(&conductor, &mut painter)?;
            }
        }
    }

    conductor.cancel();
    info!("Goodbye");
    Ok(())
}

/// Paint from the Conductor's state; prompt again once the turn is printed
fn repaint<B: AgentBackend + 'static>(conductor: &Conductor<B>, painter: &mut Terminal) -> Result<()> {
    if painter.repaint(conductor).context("Failed to write output")? {
        prompt();
    }
    Ok(())
}

/// Act on one input line; `false` means quit
fn handle_line<B: AgentBackend + 'static>(
    conductor: &Conductor<B>,
    painter: &mut Terminal,
    line: &str,
) -> Result<bool> {
    match Command::parse(line) {
        Command::Quit => return Ok(false),
        Command::Empty => prompt(),
        Command::Say(text) => {
            if conductor.submit(text, None).is_some() {
                painter.begin();
            } else {
                eprintln!("  (still answering; /cancel or Ctrl-C to stop)");
            }
        }
        Command::Cancel => {
            if conductor.cancel() {
                repaint(conductor, painter)?;
            } else {
                eprintln!("  (nothing to cancel)");
                prompt();
            }
        }
        Command::Clear => {
            if conductor.clear() {
                eprintln!("  (new conversation)");
            } else {
                eprintln!("  (cannot clear while answering)");
            }
            prompt();
        }
        Command::Location(location) => {
            conductor.set_location(location);
            match location {
                Some(l) => eprintln!("  (location set to {}, {})", l.lat, l.lon),
                None => eprintln!("  (location off)"),
            }
            prompt();
        }
        Command::Help => {
            eprintln!("{HELP}");
            prompt();
        }
        Command::Invalid(reason) => {
            warn!(%reason, "Ignoring input");
            eprintln!("  ({reason}; /help for commands)");
            prompt();
        }
    }
    Ok(true)
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
