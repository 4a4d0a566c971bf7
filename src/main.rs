//! Immersive Turntable - Command Line Viewer
//!
//! Drives one turntable session from stdin commands and prints every view
//! snapshot as a JSON line on stdout.
//!
//! Usage: `immersive-turntable <product.json> <asset-root> [settings.json]`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use immersive_turntable::gesture::Key;
use immersive_turntable::telemetry::{init_logging, LogConfig};
use immersive_turntable::{Engine, EngineSettings, FsFetcher, InputEvent, Intent, MaterialId, Product};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: left | right | home | end | zoom+ | zoom- | auto | reset | frame <n> | \
                    material <id> | key <name> | materials | health | stats | errors | help | quit";

/// One parsed stdin command
#[derive(Debug, PartialEq)]
enum Command {
    Intent(Intent),
    Key(Key),
    Material(MaterialId),
    Materials,
    Health,
    Stats,
    Errors,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        bail!("empty command");
    };
    let arg = parts.next();

    let command = match (word, arg) {
        ("left", None) => Command::Intent(Intent::RotateBy(-1)),
        ("right", None) => Command::Intent(Intent::RotateBy(1)),
        ("home", None) => Command::Intent(Intent::JumpToFrame(0)),
        ("end", None) => Command::Key(Key::End),
        ("zoom+", None) => Command::Key(Key::ZoomIn),
        ("zoom-", None) => Command::Key(Key::ZoomOut),
        ("auto", None) => Command::Intent(Intent::ToggleAutoRotate),
        ("reset", None) => Command::Intent(Intent::ResetView),
        ("frame", Some(n)) => {
            let frame = n.parse().with_context(|| format!("invalid frame index '{}'", n))?;
            Command::Intent(Intent::JumpToFrame(frame))
        }
        ("material", Some(id)) => Command::Material(MaterialId::from(id)),
        ("key", Some(name)) => match Key::from_name(name) {
            Some(key) => Command::Key(key),
            None => bail!("unknown key '{}'", name),
        },
        ("materials", None) => Command::Materials,
        ("health", None) => Command::Health,
        ("stats", None) => Command::Stats,
        ("errors", None) => Command::Errors,
        ("help", None) => Command::Help,
        ("quit" | "exit", None) => Command::Quit,
        _ => bail!("unrecognized command '{}'", line.trim()),
    };
    Ok(command)
}

fn print_snapshot(engine: &Engine) -> Result<()> {
    println!("{}", serde_json::to_string(&engine.snapshot())?);
    Ok(())
}

/// Run one command. Returns false when the session should end.
async fn run_command(engine: &mut Engine, command: Command) -> Result<bool> {
    match command {
        Command::Intent(intent) => {
            if let Err(e) = engine.apply_intent(intent) {
                eprintln!("{}", e);
            }
        }
        Command::Key(key) => engine.handle_input(InputEvent::Key { key, at: Instant::now() }),
        Command::Material(id) => {
            if let Err(e) = engine.select_material(&id) {
                eprintln!("{}", e);
            }
        }
        Command::Materials => {
            let product = engine.product();
            for option in &product.materials {
                let modifier = option.modifier_for(product.base_price);
                println!("{}\t{}\t{:+.2}", option.id, option.display_name, modifier);
            }
            return Ok(true);
        }
        Command::Health => {
            println!("{}", serde_json::to_string(&engine.health())?);
            return Ok(true);
        }
        Command::Stats => {
            println!("{}", serde_json::to_string(&engine.cache().stats())?);
            return Ok(true);
        }
        Command::Errors => {
            for error in engine.recent_errors() {
                println!("{}", error);
            }
            return Ok(true);
        }
        Command::Help => {
            println!("{}", HELP);
            return Ok(true);
        }
        Command::Quit => return Ok(false),
    }

    engine.settle().await;
    engine.poll(Instant::now());
    print_snapshot(engine)?;
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries snapshots; logs stay on stderr
    let log_config = LogConfig {
        file: std::env::var_os("TURNTABLE_LOG_FILE").map(PathBuf::from),
        ..LogConfig::default()
    };
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let mut args = std::env::args().skip(1);
    let (Some(product_path), Some(asset_root)) = (args.next(), args.next()) else {
        bail!("usage: immersive-turntable <product.json> <asset-root> [settings.json]");
    };
    let settings = match args.next() {
        Some(path) => EngineSettings::load_from_file(&PathBuf::from(&path))
            .with_context(|| format!("failed to load settings from {}", path))?,
        None => EngineSettings::default(),
    };
    let product = Product::load(&PathBuf::from(&product_path))
        .with_context(|| format!("failed to load product from {}", product_path))?;

    tracing::info!("Starting Immersive Turntable v{}", env!("CARGO_PKG_VERSION"));

    let fetcher = Arc::new(FsFetcher::new(asset_root));
    let mut engine = Engine::new(product, fetcher, settings).context("failed to open turntable session")?;
    tracing::info!(session = %engine.id(), product = %engine.product().id, "Session opened");

    engine.settle().await;
    print_snapshot(&engine)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(16));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => {
                        if !run_command(&mut engine, command).await? {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{}; {}", e, HELP),
                }
            }
            updated = engine.next_update() => {
                if updated {
                    print_snapshot(&engine)?;
                }
            }
            _ = ticker.tick() => {
                // Auto-rotate and inertia advance on their own
                if engine.poll(Instant::now()) {
                    print_snapshot(&engine)?;
                }
            }
        }
    }

    tracing::info!(session = %engine.id(), "Session closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("left").unwrap(), Command::Intent(Intent::RotateBy(-1)));
        assert_eq!(parse_command("  frame 12 ").unwrap(), Command::Intent(Intent::JumpToFrame(12)));
        assert_eq!(parse_command("material pt").unwrap(), Command::Material(MaterialId::from("pt")));
        assert_eq!(parse_command("key Escape").unwrap(), Command::Key(Key::Escape));
        assert_eq!(parse_command("zoom+").unwrap(), Command::Key(Key::ZoomIn));
        assert_eq!(parse_command("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("frame x").is_err());
        assert!(parse_command("material").is_err());
        assert!(parse_command("key Tab").is_err());
        assert!(parse_command("spin").is_err());
    }
}
