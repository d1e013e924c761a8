//! deercamp-voice - interactive voice-note player
//!
//! Loads the clips given on the command line (ids `1..=n`) and reads
//! commands from stdin:
//! - `<n>`   toggle clip n
//! - `s`     stop
//! - `state` print the current state as JSON
//! - `q`     dispose and quit

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use deercamp_common::config::load_config;
use deercamp_voice::{ClipRef, ClipView, PlaybackSessionManager, SymphoniaBackend};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for deercamp-voice
#[derive(Parser, Debug)]
#[command(name = "deercamp-voice")]
#[command(about = "Play DeerCamp voice notes one at a time")]
#[command(version)]
struct Args {
    /// Configuration file (overrides DEERCAMP_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (overrides the config file)
    #[arg(short, long, env = "DEERCAMP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Clip URIs: file://, http(s):// or plain paths
    #[arg(required = true)]
    uris: Vec<String>,
}

enum Command {
    Toggle(usize),
    Stop,
    State,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "" => None,
        "s" | "stop" => Some(Command::Stop),
        "state" => Some(Command::State),
        "q" | "quit" => Some(Command::Quit),
        other => other.parse().ok().map(Command::Toggle),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    let default_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("deercamp_voice={0},deercamp_common={0}", default_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting deercamp-voice with {} clip(s)", args.uris.len());

    let clips: Vec<ClipRef> = args
        .uris
        .iter()
        .enumerate()
        .map(|(i, uri)| ClipRef::new((i + 1).to_string(), uri.clone()))
        .collect();

    let backend = SymphoniaBackend::new(&config).context("Failed to initialize backend")?;
    let manager = Arc::new(PlaybackSessionManager::with_audio_mode(
        Arc::new(backend),
        config.audio_mode.clone(),
    ));

    let listed = clips.clone();
    let _subscription = manager.subscribe(move |state| {
        for clip in &listed {
            let view = ClipView::for_clip(state, clip);
            let marker = if view.is_active { '>' } else { ' ' };
            println!("{} [{}] {}", marker, clip.id, view.caption());
        }
        if let Some(error) = &state.last_error {
            println!("  ! {}", error);
        }
    });

    for clip in &clips {
        println!("  [{}] {}", clip.id, clip.source_uri);
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else {
            info!("stdin closed");
            break;
        };

        match parse_command(&line) {
            Some(Command::Toggle(n)) => match clips.get(n.wrapping_sub(1)) {
                Some(clip) => {
                    // Spawned so a slow load never blocks the next command
                    let manager = Arc::clone(&manager);
                    let clip = clip.clone();
                    tokio::spawn(async move { manager.toggle(&clip).await });
                }
                None => warn!("No clip {}", n),
            },
            Some(Command::Stop) => manager.stop().await,
            Some(Command::State) => {
                let state = manager.get_state();
                println!("{}", serde_json::to_string_pretty(&state)?);
                let progress = clips
                    .iter()
                    .find_map(|clip| ClipView::for_clip(&state, clip).progress_text);
                if let Some(progress) = progress {
                    println!("  {}", progress);
                }
            }
            Some(Command::Quit) => break,
            None => {
                if !line.trim().is_empty() {
                    warn!("Unknown command: {}", line.trim());
                }
            }
        }
    }

    manager.dispose().await;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
