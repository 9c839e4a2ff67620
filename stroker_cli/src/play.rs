//! Commands that run the tick thread: `play` and `test`.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::{Result, WrapErr};
use stroker_config::Config;
use stroker_core::resolver::{HOMING_MS, RAMP_MS};
use stroker_core::{
    AxisId, EngineError, EngineEvent, EngineSettings, MotionEngine, load_for_media,
};
use stroker_traits::MonotonicClock;

use crate::cli::RtArgs;
use crate::device::{self, Device};
use crate::rt::setup_rt_once;

const POLL: Duration = Duration::from_millis(50);

pub struct PlaySummary {
    pub axes: Vec<AxisId>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub transport: &'static str,
    pub lines_sent: Option<u64>,
    pub interrupted: bool,
}

pub struct TestSummary {
    pub axis: AxisId,
    pub speed_hz: f64,
    pub settled: bool,
    pub transport: &'static str,
    pub lines_sent: Option<u64>,
}

enum Wait {
    Elapsed,
    Interrupted,
}

fn engine_for(cfg: &Config) -> Result<MotionEngine> {
    let settings = EngineSettings::try_from(cfg).wrap_err("invalid axis settings")?;
    Ok(MotionEngine::with_settings(
        settings,
        Arc::new(MonotonicClock::new()),
    ))
}

/// Sleep until `deadline`, returning early on Ctrl-C or a lost link.
fn run_until(engine: &MotionEngine, deadline: Instant, shutdown: &AtomicBool) -> Result<Wait> {
    let events = engine.events();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return Ok(Wait::Interrupted);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(Wait::Elapsed);
        }
        if let Ok(EngineEvent::TransportLost) = events.recv_timeout(POLL.min(deadline - now)) {
            return Err(EngineError::Transport("link lost".into()).into());
        }
    }
}

fn finish(engine: &mut MotionEngine, device: &Device) {
    engine.set_playing(false);
    engine.stop_timer();
    engine.clear_scripts();
    device.close();
}

pub fn play(
    cfg: &Config,
    force_sim: bool,
    media: &Path,
    start_ms: i64,
    seconds: Option<f64>,
    rt: RtArgs,
    shutdown: &AtomicBool,
) -> Result<PlaySummary> {
    let report = load_for_media(media);
    if report.matched.is_empty() {
        eyre::bail!("no scripts found next to {}", media.display());
    }
    if report.scripts.is_empty()
        && let Some((axis, err)) = report.failures.into_iter().next()
    {
        return Err(eyre::Report::new(err).wrap_err(format!("{axis} script")));
    }
    let axes: Vec<AxisId> = report.scripts.axes().collect();
    let last_ms = report
        .scripts
        .tracks()
        .iter()
        .flatten()
        .filter_map(|t| t.last().map(|k| k.at_ms))
        .max()
        .unwrap_or(0);
    let run_ms = match seconds {
        Some(s) if s.is_finite() && s > 0.0 => (s * 1000.0) as u64,
        _ => u64::try_from(last_ms.saturating_sub(start_ms)).unwrap_or(0),
    };

    let mut engine = engine_for(cfg)?;
    let device = device::open(&cfg.transport, force_sim)?;
    setup_rt_once(rt);

    engine.set_scripts(report.scripts);
    engine.set_time(start_ms);
    engine.connect(Arc::clone(&device.handle))?;
    engine.set_playing(true);
    tracing::info!(media = %media.display(), start_ms, run_ms, ?axes, "playback started");

    let waited = run_until(
        &engine,
        Instant::now() + Duration::from_millis(run_ms),
        shutdown,
    );
    let end_ms = engine.media_time_ms();
    finish(&mut engine, &device);
    let interrupted = matches!(waited?, Wait::Interrupted);
    tracing::info!(end_ms, interrupted, "playback stopped");

    Ok(PlaySummary {
        axes,
        start_ms,
        end_ms,
        transport: device.kind_name(),
        lines_sent: device.sim.as_ref().map(|c| c.lines()),
        interrupted,
    })
}

pub fn test_axis(
    cfg: &Config,
    force_sim: bool,
    axis: AxisId,
    speed_hz: f64,
    seconds: f64,
    rt: RtArgs,
    shutdown: &AtomicBool,
) -> Result<TestSummary> {
    let mut engine = engine_for(cfg)?;
    if !engine.axis_configs().get(axis).enabled() {
        eyre::bail!("axis {axis} is disabled in the config (axes.{}.enabled)", axis.name());
    }
    let device = device::open(&cfg.transport, force_sim)?;
    setup_rt_once(rt);

    let events = engine.events();
    engine.connect(Arc::clone(&device.handle))?;
    engine.start_test_axis(axis, speed_hz);
    tracing::info!(%axis, speed_hz, seconds, "axis test started");

    let run = Duration::from_secs_f64(seconds.max(0.0));
    let waited = run_until(&engine, Instant::now() + run, shutdown);
    if let Err(e) = waited {
        finish(&mut engine, &device);
        return Err(e);
    }

    engine.stop_test_axis(axis);
    // The ramp only advances once homing is over.
    let settle_by = Instant::now() + Duration::from_secs_f64((HOMING_MS + RAMP_MS * 2.0) / 1000.0);
    let mut settled = false;
    while !settled {
        let now = Instant::now();
        if now >= settle_by {
            tracing::warn!(%axis, "axis did not report settling in time");
            break;
        }
        match events.recv_timeout(settle_by - now) {
            Ok(EngineEvent::AxisTestStopped(a)) if a == axis => settled = true,
            Ok(EngineEvent::TransportLost) => {
                finish(&mut engine, &device);
                return Err(EngineError::Transport("link lost".into()).into());
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    finish(&mut engine, &device);

    Ok(TestSummary {
        axis,
        speed_hz,
        settled,
        transport: device.kind_name(),
        lines_sent: device.sim.as_ref().map(|c| c.lines()),
    })
}
