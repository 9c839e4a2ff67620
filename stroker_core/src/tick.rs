//! One tick: resolves every axis once and builds the command line.
//!
//! `MotionCore` is plain data with no threads, clocks or I/O; the engine
//! drives it from its timing thread, tests drive it directly with an explicit
//! `dt`. Stroke is resolved first so that axes following the stroke see the
//! value of the same tick.

use std::sync::Arc;

use crate::axis::{AXIS_COUNT, AxisConfigs, AxisId};
use crate::command::{CommandLine, to_wire};
use crate::keyframe::{KeyframeTrack, MIDPOINT};
use crate::pattern::StrokeDrive;
use crate::resolver::{AxisRuntime, TickContext};
use crate::status::AxisActivity;

/// Fixed seed for the random fill pattern.
pub const DEFAULT_SEED: u64 = 0x5EED_2024;

pub type Tracks = [Option<Arc<KeyframeTrack>>; AXIS_COUNT];

/// Everything one tick reads from the host side.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    pub configs: &'a AxisConfigs,
    pub tracks: &'a Tracks,
    /// Media time plus the global offset.
    pub script_time_ms: i64,
    pub interval_ms: u32,
    pub dt_s: f64,
}

/// What a tick produced.
#[derive(Debug)]
pub struct TickReport<'a> {
    /// The command line to send, `None` when no enabled axis changed.
    pub line: Option<&'a str>,
    /// Axes whose test finished settling on this tick.
    pub settled: [bool; AXIS_COUNT],
    /// Set when the last settling test finished on this tick.
    pub all_settled: bool,
    pub activity: [AxisActivity; AXIS_COUNT],
}

impl TickReport<'_> {
    pub fn settled_axes(&self) -> impl Iterator<Item = AxisId> + '_ {
        AxisId::ALL
            .into_iter()
            .filter(|a| self.settled[a.index()])
    }
}

#[derive(Debug)]
pub struct MotionCore {
    axes: [AxisRuntime; AXIS_COUNT],
    line: CommandLine,
    rng: fastrand::Rng,
    stroke_prev: Option<f64>,
    stroke_rising: bool,
    stroke_drive: StrokeDrive,
}

impl Default for MotionCore {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionCore {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            axes: AxisId::ALL.map(AxisRuntime::new),
            line: CommandLine::new(),
            rng: fastrand::Rng::with_seed(seed),
            stroke_prev: None,
            stroke_rising: true,
            stroke_drive: StrokeDrive::REST,
        }
    }

    pub fn axis(&self, axis: AxisId) -> &AxisRuntime {
        &self.axes[axis.index()]
    }

    fn axis_mut(&mut self, axis: AxisId) -> &mut AxisRuntime {
        &mut self.axes[axis.index()]
    }

    pub fn activity(&self, axis: AxisId) -> AxisActivity {
        self.axis(axis).activity()
    }

    pub fn is_testing(&self, axis: AxisId) -> bool {
        self.axis(axis).is_testing()
    }

    pub fn is_settling(&self, axis: AxisId) -> bool {
        self.axis(axis).is_settling()
    }

    pub fn any_testing(&self) -> bool {
        self.axes.iter().any(AxisRuntime::is_testing)
    }

    /// Drop dirty tracking and transient motion. Last outputs survive as
    /// homing start points.
    pub fn reset(&mut self) {
        for rt in &mut self.axes {
            rt.reset();
        }
        self.line.clear();
        self.stroke_prev = None;
        self.stroke_rising = true;
        self.stroke_drive = StrokeDrive::REST;
    }

    /// Arm homing on every enabled axis.
    pub fn arm_homing(&mut self, configs: &AxisConfigs) {
        for (axis, cfg) in configs.iter() {
            if cfg.enabled() {
                self.axis_mut(axis).arm_homing();
            }
        }
        tracing::debug!("homing armed");
    }

    pub fn start_test(&mut self, axis: AxisId, speed_hz: f64) {
        self.axis_mut(axis).start_test(speed_hz);
        tracing::debug!(%axis, speed_hz, "test started");
    }

    /// Returns false when the axis was not running a test.
    pub fn stop_test(&mut self, axis: AxisId) -> bool {
        let stopped = self.axis_mut(axis).stop_test();
        if stopped {
            tracing::debug!(%axis, "test stopping");
        }
        stopped
    }

    pub fn stop_all_tests(&mut self) -> usize {
        AxisId::ALL
            .into_iter()
            .filter(|&a| self.axis_mut(a).stop_test())
            .count()
    }

    /// End a test without ramping down.
    pub fn abort_test(&mut self, axis: AxisId) -> bool {
        self.axis_mut(axis).abort_test()
    }

    pub fn update_test_speed(&mut self, axis: AxisId, speed_hz: f64) {
        self.axis_mut(axis).update_test_speed(speed_hz);
    }

    /// Resolve all axes and encode the dirty enabled ones.
    pub fn tick(&mut self, input: &TickInput<'_>) -> TickReport<'_> {
        let was_testing = self.any_testing();
        let mut settled = [false; AXIS_COUNT];
        let mut activity = [AxisActivity::Idle; AXIS_COUNT];
        let mut outputs = [MIDPOINT; AXIS_COUNT];

        let dt_s = if input.dt_s.is_finite() {
            input.dt_s.max(0.0)
        } else {
            0.0
        };
        let mut ctx = TickContext {
            script_time_ms: input.script_time_ms,
            dt_s,
            stroke: self.stroke_drive,
            stroke_delta: 0.0,
            track: None,
        };

        for axis in AxisId::ALL {
            let i = axis.index();
            ctx.track = input.tracks[i].as_deref();
            let r = self.axes[i].resolve(&input.configs[axis], &ctx, &mut self.rng);
            if axis == AxisId::Stroke {
                if let Some(v) = r.normalized {
                    ctx.stroke_delta = self.stroke_prev.map_or(0.0, |p| v - p);
                    if ctx.stroke_delta > 0.0 {
                        self.stroke_rising = true;
                    } else if ctx.stroke_delta < 0.0 {
                        self.stroke_rising = false;
                    }
                    self.stroke_prev = Some(v);
                    self.stroke_drive = StrokeDrive::from_motion(v, self.stroke_rising);
                }
                ctx.stroke = self.stroke_drive;
            }
            settled[i] = r.test_settled;
            activity[i] = r.activity;
            outputs[i] = r.output;
        }

        self.line.clear();
        for (axis, cfg) in input.configs.iter() {
            let rt = &mut self.axes[axis.index()];
            if !cfg.enabled() {
                rt.last_sent = None;
                continue;
            }
            let value = to_wire(outputs[axis.index()]);
            if rt.last_sent != Some(value) {
                rt.last_sent = Some(value);
                self.line.push(axis, value, input.interval_ms);
            }
        }

        let all_settled = was_testing && settled.iter().any(|&s| s) && !self.any_testing();
        let line = self.line.finish();
        if let Some(l) = line {
            tracing::trace!(line = l.trim_end(), "tick");
        }
        TickReport {
            line,
            settled,
            all_settled,
            activity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_TRACKS: Tracks = [None, None, None, None];

    fn input<'a>(configs: &'a AxisConfigs, tracks: &'a Tracks, t: i64) -> TickInput<'a> {
        TickInput {
            configs,
            tracks,
            script_time_ms: t,
            interval_ms: 10,
            dt_s: 0.01,
        }
    }

    #[test]
    fn first_tick_sends_everything_then_nothing() {
        let configs = AxisConfigs::default();
        let mut core = MotionCore::new();
        let line = core.tick(&input(&configs, &NO_TRACKS, 0)).line.map(str::to_owned);
        assert_eq!(line.as_deref(), Some("L0500I10 R0500I10 R1500I10 R2500I10\n"));
        assert!(core.tick(&input(&configs, &NO_TRACKS, 0)).line.is_none());
    }

    #[test]
    fn disabled_axes_are_never_emitted() {
        let mut configs = AxisConfigs::default();
        configs.set_enabled(AxisId::Twist, false);
        configs.set_enabled(AxisId::Roll, false);
        configs.set_enabled(AxisId::Pitch, false);
        let mut core = MotionCore::new();
        let line = core.tick(&input(&configs, &NO_TRACKS, 0)).line.map(str::to_owned);
        assert_eq!(line.as_deref(), Some("L0500I10\n"));
        assert_eq!(core.axis(AxisId::Twist).last_sent, None);
    }

    #[test]
    fn reset_forces_a_full_resend() {
        let configs = AxisConfigs::default();
        let mut core = MotionCore::new();
        let _ = core.tick(&input(&configs, &NO_TRACKS, 0));
        core.reset();
        let report = core.tick(&input(&configs, &NO_TRACKS, 0));
        assert!(report.line.is_some_and(|l| l.starts_with("L0500I10")));
    }

    #[test]
    fn all_settled_fires_with_the_last_axis() {
        let configs = AxisConfigs::default();
        let mut core = MotionCore::new();
        core.start_test(AxisId::Twist, 1.0);
        core.start_test(AxisId::Roll, 1.0);
        assert!(core.stop_test(AxisId::Twist));
        let r = core.tick(&input(&configs, &NO_TRACKS, 0));
        assert!(r.settled[AxisId::Twist.index()]);
        assert!(!r.all_settled);
        assert_eq!(core.stop_all_tests(), 1);
        let r = core.tick(&input(&configs, &NO_TRACKS, 0));
        assert_eq!(r.settled_axes().collect::<Vec<_>>(), [AxisId::Roll]);
        assert!(r.all_settled);
    }

    #[test]
    fn stroke_follows_track_before_dependents() {
        let mut configs = AxisConfigs::default();
        configs
            .set_fill_mode(AxisId::Pitch, crate::pattern::FillMode::Grind)
            .expect("mode");
        let track = Arc::new(KeyframeTrack::from_keyframes(vec![
            crate::keyframe::Keyframe::new(0, 0.0),
            crate::keyframe::Keyframe::new(1000, 100.0),
        ]));
        let tracks: Tracks = [Some(track), None, None, None];
        let mut core = MotionCore::new();
        // Let the grind fade in completely.
        for i in 0..60 {
            let _ = core.tick(&input(&configs, &tracks, i * 10));
        }
        let _ = core.tick(&input(&configs, &tracks, 800));
        let pitch = core.axis(AxisId::Pitch).last_output();
        assert!((pitch - 20.0).abs() < 1e-9, "{pitch}");
    }
}
