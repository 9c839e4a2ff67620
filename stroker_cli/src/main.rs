#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod device;
mod error_fmt;
mod inspect;
mod play;
mod rt;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use serde_json::json;
use stroker_config::{Config, Logging};
use stroker_core::AxisId;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE, json_mode};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => stroker_config::load_file(path),
        None => {
            let mut cfg = Config::default();
            cfg.normalize();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

/// Console logs go to stderr so stdout stays parseable; the optional file
/// sink always writes JSON lines.
fn init_tracing(cli: &Cli, logging: &Logging) {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let console = if cli.json {
        console.json().boxed()
    } else {
        console.boxed()
    };

    let file_layer = logging.file.as_deref().map(|file| {
        let path = std::path::Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path.file_name().unwrap_or(path.as_os_str());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::new(logging.level.as_deref().unwrap_or("info")))
    });

    let _ = tracing_subscriber::registry()
        .with(console.with_filter(console_filter))
        .with(file_layer)
        .try_init();
}

fn emit(value: &serde_json::Value) {
    println!("{value}");
}

fn run(cli: &Cli, shutdown: &AtomicBool) -> Result<()> {
    let cfg = load_config(cli)?;
    init_tracing(cli, &cfg.logging);

    match &cli.cmd {
        Commands::Play {
            media,
            start_ms,
            seconds,
            rt,
        } => {
            let s = play::play(&cfg, cli.sim, media, *start_ms, *seconds, *rt, shutdown)?;
            let axes: Vec<&str> = s.axes.iter().map(|a| a.name()).collect();
            if json_mode() {
                emit(&json!({
                    "command": "play",
                    "axes": axes,
                    "start_ms": s.start_ms,
                    "end_ms": s.end_ms,
                    "transport": s.transport,
                    "lines_sent": s.lines_sent,
                    "interrupted": s.interrupted,
                }));
            } else {
                println!(
                    "Played {} from {} ms to {} ms over {}{}",
                    axes.join(","),
                    s.start_ms,
                    s.end_ms,
                    s.transport,
                    if s.interrupted { " (interrupted)" } else { "" }
                );
                if let Some(n) = s.lines_sent {
                    println!("Lines sent: {n}");
                }
            }
        }
        Commands::Test {
            axis,
            speed,
            seconds,
            rt,
        } => {
            let axis = axis.parse::<AxisId>().wrap_err("--axis")?;
            let s = play::test_axis(&cfg, cli.sim, axis, *speed, *seconds, *rt, shutdown)?;
            if json_mode() {
                emit(&json!({
                    "command": "test",
                    "axis": s.axis.name(),
                    "speed_hz": s.speed_hz,
                    "settled": s.settled,
                    "transport": s.transport,
                    "lines_sent": s.lines_sent,
                }));
            } else {
                println!(
                    "Test on {} at {:.2} Hz {}",
                    s.axis.name(),
                    s.speed_hz,
                    if s.settled { "settled" } else { "stopped without settling" }
                );
            }
        }
        Commands::Inspect { script, axis } => {
            let tracks = inspect::inspect(script, axis)?;
            if json_mode() {
                let items: Vec<_> = tracks.iter().map(inspect::TrackSummary::to_json).collect();
                emit(&json!({ "command": "inspect", "tracks": items }));
            } else {
                for t in &tracks {
                    println!("{t}");
                }
            }
        }
        Commands::Match { media } => {
            let found = inspect::matches(media);
            if json_mode() {
                let map: serde_json::Map<_, _> = found
                    .iter()
                    .map(|(a, p)| (a.name().to_string(), json!(p.display().to_string())))
                    .collect();
                emit(&json!({ "command": "match", "scripts": map }));
            } else if found.is_empty() {
                println!("No scripts found for {}", media.display());
            } else {
                for (axis, path) in &found {
                    println!("{:<6} {}", axis.name(), path.display());
                }
            }
        }
        Commands::SelfCheck => {
            let s = inspect::self_check(&cfg, cli.sim)?;
            if json_mode() {
                emit(&json!({
                    "command": "self-check",
                    "ok": true,
                    "transport": s.transport,
                    "target": s.target,
                    "rate_hz": s.rate_hz,
                    "serial": s.serial,
                }));
            } else {
                println!("OK: {} transport ({}) at {} Hz", s.transport, s.target, s.rate_hz);
                println!("Serial support: {}", if s.serial { "yes" } else { "no" });
            }
        }
    }
    Ok(())
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            eprintln!("Warning: Ctrl-C handler not installed: {e}");
        }
    }

    if let Err(e) = run(&cli, &shutdown) {
        tracing::error!(error = %format!("{e:#}"), "command failed");
        if json_mode() {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}
