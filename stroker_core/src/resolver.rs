//! Per-axis, per-tick resolution.
//!
//! Each axis picks exactly one source per tick, in priority order: homing,
//! test (ramp-down included), script, fill pattern, idle. The result is a
//! normalized 0..100 value, then remapped and offset into the final percent
//! of travel. Homing is the exception: it interpolates directly in the final
//! domain, from wherever the axis last was to its home position.

use crate::axis::{AxisConfig, AxisId};
use crate::keyframe::{KeyframeTrack, MIDPOINT};
use crate::pattern::{FillMode, PatternGenerator, StrokeDrive};
use crate::status::AxisActivity;

/// Duration of the homing move.
pub const HOMING_MS: f64 = 2000.0;
/// Duration of fill and test amplitude ramps.
pub const RAMP_MS: f64 = 500.0;
/// Stroke travel per second below which a synced fill freezes.
const SYNC_STILL_PER_S: f64 = 1.0;
/// Stroke travel (units of 0..100) in one full up-and-down cycle.
const STROKE_CYCLE: f64 = 200.0;

pub const MIN_TEST_SPEED_HZ: f64 = 0.1;
pub const MAX_TEST_SPEED_HZ: f64 = 3.0;

#[inline]
fn ramp_step(dt_s: f64) -> f64 {
    (dt_s * 1000.0 / RAMP_MS).max(0.0)
}

pub(crate) fn clamp_test_speed(hz: f64) -> f64 {
    if hz.is_finite() {
        hz.clamp(MIN_TEST_SPEED_HZ, MAX_TEST_SPEED_HZ)
    } else {
        1.0
    }
}

/// Pattern an axis runs while under test.
pub fn test_mode(axis: AxisId, configured: FillMode) -> FillMode {
    match (axis, configured) {
        (AxisId::Stroke, _) => FillMode::Triangle,
        (_, FillMode::None) => FillMode::Sine,
        (_, mode) => mode,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TestPhase {
    Off,
    Running,
    Settling,
}

/// Blend from `base` toward `target` by `amplitude`.
#[inline]
fn blend(base: f64, target: f64, amplitude: f64) -> f64 {
    base + (target - base) * amplitude
}

#[derive(Debug, Clone, Copy)]
struct TestState {
    phase: TestPhase,
    generator: PatternGenerator,
    speed_hz: f64,
    amplitude: f64,
    /// Value the ramp starts from; the midpoint once fully ramped in.
    base: f64,
    /// Leftover distance to `base`, shrunk with the amplitude while settling.
    carry: f64,
}

impl TestState {
    fn value(&self, raw: f64) -> f64 {
        blend(self.base, raw + self.carry, self.amplitude)
    }

    /// Re-anchor the ramp on the midpoint without moving the output.
    fn begin_settling(&mut self) {
        if self.amplitude > 0.0 {
            self.carry = (self.base - MIDPOINT) * (1.0 - self.amplitude) / self.amplitude;
            self.base = MIDPOINT;
        }
    }

    /// Undo `begin_settling`, again without moving the output.
    fn resume(&mut self) {
        if self.amplitude < 1.0 {
            self.base += self.carry * self.amplitude / (1.0 - self.amplitude);
        }
        self.carry = 0.0;
    }
}

impl Default for TestState {
    fn default() -> Self {
        Self {
            phase: TestPhase::Off,
            generator: PatternGenerator::new(),
            speed_hz: 1.0,
            amplitude: 0.0,
            base: MIDPOINT,
            carry: 0.0,
        }
    }
}

/// Fill amplitude ramp. `base` is where amplitude zero sits: the value the
/// axis held when its source last changed, the midpoint once fully faded in.
/// `FillMode::None` ramps toward the midpoint the same way.
#[derive(Debug, Clone, Copy)]
struct FillRamp {
    mode: FillMode,
    amplitude: f64,
    base: f64,
}

impl FillRamp {
    /// Start from `value` toward `mode` with zero amplitude.
    fn from_value(mode: FillMode, value: f64) -> Self {
        Self {
            mode,
            amplitude: 0.0,
            base: value,
        }
    }

    fn raise(&mut self, step: f64) {
        self.amplitude = (self.amplitude + step).min(1.0);
        if self.amplitude >= 1.0 {
            self.base = MIDPOINT;
        }
    }
}

impl Default for FillRamp {
    fn default() -> Self {
        Self::from_value(FillMode::None, MIDPOINT)
    }
}

#[derive(Debug, Clone, Copy)]
struct Homing {
    from: f64,
    elapsed_ms: f64,
}

/// Inputs shared by every axis on one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub script_time_ms: i64,
    pub dt_s: f64,
    pub stroke: StrokeDrive,
    /// Stroke travel on this tick, in normalized units.
    pub stroke_delta: f64,
    pub track: Option<&'a KeyframeTrack>,
}

/// Outcome of resolving one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    /// Normalized 0..100 value, absent while homing.
    pub normalized: Option<f64>,
    /// Final position in percent of travel, after remap and offset.
    pub output: f64,
    pub activity: AxisActivity,
    /// The axis finished a test ramp-down on this tick.
    pub test_settled: bool,
}

/// Mutable per-axis state owned by the tick thread.
#[derive(Debug, Clone)]
pub struct AxisRuntime {
    axis: AxisId,
    pub(crate) last_sent: Option<u16>,
    last_output: f64,
    /// Normalized value of the last non-homing tick.
    last_normalized: f64,
    pattern: PatternGenerator,
    fill: FillRamp,
    test: TestState,
    homing: Option<Homing>,
    activity: AxisActivity,
}

impl AxisRuntime {
    pub fn new(axis: AxisId) -> Self {
        Self {
            axis,
            last_sent: None,
            last_output: MIDPOINT,
            last_normalized: MIDPOINT,
            pattern: PatternGenerator::new(),
            fill: FillRamp::default(),
            test: TestState::default(),
            homing: None,
            activity: AxisActivity::Idle,
        }
    }

    pub fn axis(&self) -> AxisId {
        self.axis
    }

    pub fn activity(&self) -> AxisActivity {
        self.activity
    }

    pub fn last_output(&self) -> f64 {
        self.last_output
    }

    pub fn is_homing(&self) -> bool {
        self.homing.is_some()
    }

    pub fn is_testing(&self) -> bool {
        self.test.phase != TestPhase::Off
    }

    pub fn is_settling(&self) -> bool {
        self.test.phase == TestPhase::Settling
    }

    /// Forget what the device was last sent and any transient motion. The
    /// last output is kept as the start of the next homing move.
    pub fn reset(&mut self) {
        let last_output = self.last_output;
        *self = Self::new(self.axis);
        self.last_output = last_output;
    }

    /// Start a homing move from the last output.
    pub fn arm_homing(&mut self) {
        self.homing = Some(Homing {
            from: self.last_output,
            elapsed_ms: 0.0,
        });
        self.activity = AxisActivity::Homing;
    }

    /// Start (or resume from settling) a test at `speed_hz`. The amplitude
    /// ramps up from wherever it currently is; a fresh test starts from the
    /// axis's last value.
    pub fn start_test(&mut self, speed_hz: f64) {
        if self.test.phase == TestPhase::Off {
            self.test.generator.reset();
            self.test.amplitude = 0.0;
            self.test.base = self.last_normalized;
            self.test.carry = 0.0;
        } else {
            self.test.resume();
        }
        self.test.phase = TestPhase::Running;
        self.test.speed_hz = clamp_test_speed(speed_hz);
        if self.homing.is_none() {
            self.activity = AxisActivity::Testing;
        }
    }

    /// Begin the ramp-down. Returns false if no test was running.
    pub fn stop_test(&mut self) -> bool {
        if self.test.phase != TestPhase::Running {
            return false;
        }
        self.test.phase = TestPhase::Settling;
        self.test.begin_settling();
        if self.homing.is_none() {
            self.activity = AxisActivity::Settling;
        }
        true
    }

    /// End a test immediately, without a ramp. Returns false if no test was
    /// active.
    pub fn abort_test(&mut self) -> bool {
        if self.test.phase == TestPhase::Off {
            return false;
        }
        self.test.phase = TestPhase::Off;
        self.test.amplitude = 0.0;
        self.fill = FillRamp::from_value(self.fill.mode, self.last_normalized);
        if self.homing.is_none() {
            self.activity = AxisActivity::Idle;
        }
        true
    }

    pub fn update_test_speed(&mut self, speed_hz: f64) {
        self.test.speed_hz = clamp_test_speed(speed_hz);
    }

    /// Resolve this axis for one tick.
    pub fn resolve(
        &mut self,
        cfg: &AxisConfig,
        ctx: &TickContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> Resolved {
        let dt_ms = ctx.dt_s * 1000.0;

        if let Some(h) = self.homing.as_mut() {
            h.elapsed_ms += dt_ms;
            let home = cfg.home_position(self.axis);
            let frac = (h.elapsed_ms / HOMING_MS).clamp(0.0, 1.0);
            let output = h.from + (home - h.from) * frac;
            if frac >= 1.0 {
                self.homing = None;
                self.last_normalized = MIDPOINT;
                self.fill = FillRamp::from_value(self.fill.mode, MIDPOINT);
                tracing::debug!(axis = %self.axis, "homing complete");
            }
            self.last_output = output;
            self.activity = AxisActivity::Homing;
            return Resolved {
                normalized: None,
                output,
                activity: AxisActivity::Homing,
                test_settled: false,
            };
        }

        let mut test_settled = false;
        let (normalized, activity) = if self.test.phase == TestPhase::Off {
            match ctx.track {
                Some(track) if !track.is_empty() => {
                    let v = track.value_at(ctx.script_time_ms);
                    self.fill = FillRamp::from_value(self.fill_mode(cfg), v);
                    (v, AxisActivity::Scripted)
                }
                _ => self.fill_value(cfg, ctx, rng),
            }
        } else {
            let (v, settled) = self.test_value(cfg, ctx, rng);
            test_settled = settled;
            if settled {
                self.fill = FillRamp::from_value(self.fill_mode(cfg), v);
            }
            let activity = match self.test.phase {
                TestPhase::Running => AxisActivity::Testing,
                TestPhase::Settling => AxisActivity::Settling,
                TestPhase::Off => AxisActivity::Idle,
            };
            (v, activity)
        };

        let output = cfg.finalize(self.axis, normalized);
        self.last_normalized = normalized;
        self.last_output = output;
        self.activity = activity;
        Resolved {
            normalized: Some(normalized),
            output,
            activity,
            test_settled,
        }
    }

    fn fill_mode(&self, cfg: &AxisConfig) -> FillMode {
        if self.axis.allows(cfg.fill_mode()) {
            cfg.fill_mode()
        } else {
            FillMode::None
        }
    }

    fn fill_value(
        &mut self,
        cfg: &AxisConfig,
        ctx: &TickContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> (f64, AxisActivity) {
        let wanted = self.fill_mode(cfg);
        if wanted != self.fill.mode {
            self.fill = FillRamp::from_value(wanted, self.last_normalized);
        }
        self.fill.raise(ramp_step(ctx.dt_s));

        if self.fill.mode == FillMode::None {
            let v = blend(self.fill.base, MIDPOINT, self.fill.amplitude);
            return (v, AxisActivity::Idle);
        }

        // Synced: one up-and-down stroke is one cycle, so travel in either
        // direction moves the phase forward.
        let cycles = if cfg.sync_with_stroke() {
            let speed = ctx.stroke_delta.abs() / ctx.dt_s.max(f64::EPSILON);
            if speed < SYNC_STILL_PER_S {
                0.0
            } else {
                ctx.stroke_delta.abs() / STROKE_CYCLE
            }
        } else {
            cfg.fill_speed_hz() * ctx.dt_s
        };
        self.pattern.advance(cycles, rng);

        let raw = self.pattern.sample(self.fill.mode, self.axis, ctx.stroke);
        (blend(self.fill.base, raw, self.fill.amplitude), AxisActivity::Patterned)
    }

    fn test_value(
        &mut self,
        cfg: &AxisConfig,
        ctx: &TickContext<'_>,
        rng: &mut fastrand::Rng,
    ) -> (f64, bool) {
        let step = ramp_step(ctx.dt_s);
        let mut settled = false;
        match self.test.phase {
            TestPhase::Running => {
                self.test.amplitude = (self.test.amplitude + step).min(1.0);
                if self.test.amplitude >= 1.0 {
                    self.test.base = MIDPOINT;
                }
            }
            TestPhase::Settling => {
                self.test.amplitude = (self.test.amplitude - step).max(0.0);
                if self.test.amplitude <= 0.0 {
                    self.test.phase = TestPhase::Off;
                    settled = true;
                    tracing::debug!(axis = %self.axis, "test settled");
                }
            }
            TestPhase::Off => {}
        }

        self.test
            .generator
            .advance(self.test.speed_hz * ctx.dt_s, rng);
        let mode = test_mode(self.axis, cfg.fill_mode());
        let drive = StrokeDrive::from_phase(self.test.generator.phase());
        let raw = self.test.generator.sample(mode, self.axis, drive);
        (self.test.value(raw), settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisConfigs;
    use crate::keyframe::Keyframe;

    const DT: f64 = 0.01;

    fn ctx(track: Option<&KeyframeTrack>, t: i64) -> TickContext<'_> {
        TickContext {
            script_time_ms: t,
            dt_s: DT,
            stroke: StrokeDrive::REST,
            stroke_delta: 0.0,
            track,
        }
    }

    #[test]
    fn homing_reaches_home_after_window() {
        let mut configs = AxisConfigs::default();
        configs.set_position_offset(AxisId::Stroke, 10.0).expect("offset");
        let cfg = configs[AxisId::Stroke];
        let mut rng = fastrand::Rng::with_seed(1);
        let mut rt = AxisRuntime::new(AxisId::Stroke);
        rt.last_output = 95.0;
        rt.arm_homing();

        let halfway = (0..100).map(|_| rt.resolve(&cfg, &ctx(None, 0), &mut rng)).last();
        let halfway = halfway.expect("ticks").output;
        assert!((halfway - 77.5).abs() < 1e-6, "{halfway}");

        for _ in 0..100 {
            rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        }
        assert!(!rt.is_homing());
        let r = rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        assert!((r.output - 60.0).abs() < 1e-6);
        assert_eq!(r.activity, AxisActivity::Idle);
    }

    #[test]
    fn script_beats_fill() {
        let mut configs = AxisConfigs::default();
        configs
            .set_fill_mode(AxisId::Twist, FillMode::Sine)
            .expect("mode");
        let track = KeyframeTrack::from_keyframes(vec![Keyframe::new(0, 10.0), Keyframe::new(1000, 30.0)]);
        let mut rng = fastrand::Rng::with_seed(1);
        let mut rt = AxisRuntime::new(AxisId::Twist);
        let r = rt.resolve(&configs[AxisId::Twist], &ctx(Some(&track), 500), &mut rng);
        assert_eq!(r.activity, AxisActivity::Scripted);
        assert!((r.output - 20.0).abs() < 1e-9);
    }

    #[test]
    fn fill_ramps_in_from_midpoint() {
        let mut configs = AxisConfigs::default();
        configs
            .set_fill_mode(AxisId::Twist, FillMode::Square)
            .expect("mode");
        let cfg = configs[AxisId::Twist];
        let mut rng = fastrand::Rng::with_seed(1);
        let mut rt = AxisRuntime::new(AxisId::Twist);

        let first = rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        assert!((first.output - 50.0).abs() <= 1.0 + 1e-9);
        let second = rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        assert!((second.output - 50.0).abs() <= 2.0 + 1e-9);
        for _ in 0..60 {
            rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        }
        assert!((rt.fill.amplitude - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_ramps_down_then_settles_once() {
        let configs = AxisConfigs::default();
        let cfg = configs[AxisId::Roll];
        let mut rng = fastrand::Rng::with_seed(3);
        let mut rt = AxisRuntime::new(AxisId::Roll);
        rt.start_test(1.0);
        for _ in 0..60 {
            rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        }
        assert!(rt.stop_test());
        assert!(rt.is_settling());
        let r = rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        assert!(!r.test_settled);
        assert_eq!(r.activity, AxisActivity::Settling);

        let settled: usize = (0..100)
            .map(|_| rt.resolve(&cfg, &ctx(None, 0), &mut rng))
            .filter(|r| r.test_settled)
            .count();
        assert_eq!(settled, 1);
        assert!(!rt.is_testing());
        assert!((rt.last_output() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn mode_switch_crossfades_from_current_value() {
        let mut configs = AxisConfigs::default();
        configs
            .set_fill_mode(AxisId::Twist, FillMode::Square)
            .expect("mode");
        let mut rng = fastrand::Rng::with_seed(1);
        let mut rt = AxisRuntime::new(AxisId::Twist);
        for _ in 0..80 {
            rt.resolve(&configs[AxisId::Twist], &ctx(None, 0), &mut rng);
        }
        let before = rt.last_output();

        configs
            .set_fill_mode(AxisId::Twist, FillMode::None)
            .expect("mode");
        let cfg = configs[AxisId::Twist];
        let mut prev = before;
        for _ in 0..50 {
            let r = rt.resolve(&cfg, &ctx(None, 0), &mut rng);
            assert!((r.output - prev).abs() <= (before - 50.0).abs() * 0.02 + 1e-9);
            prev = r.output;
        }
        assert!((prev - 50.0).abs() < 1e-9);
    }

    #[test]
    fn early_stop_settles_to_midpoint_without_a_jump() {
        let configs = AxisConfigs::default();
        let cfg = configs[AxisId::Roll];
        let mut rng = fastrand::Rng::with_seed(3);
        let mut rt = AxisRuntime::new(AxisId::Roll);
        rt.last_normalized = 90.0;
        rt.start_test(1.0);
        for _ in 0..10 {
            rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        }
        let at_stop = rt.test.value(rt.test.generator.sample(
            FillMode::Sine,
            AxisId::Roll,
            StrokeDrive::from_phase(rt.test.generator.phase()),
        ));
        assert!(rt.stop_test());
        let after = rt.test.value(rt.test.generator.sample(
            FillMode::Sine,
            AxisId::Roll,
            StrokeDrive::from_phase(rt.test.generator.phase()),
        ));
        assert!((at_stop - after).abs() < 1e-9);

        rt.start_test(1.0);
        let resumed = rt.test.value(rt.test.generator.sample(
            FillMode::Sine,
            AxisId::Roll,
            StrokeDrive::from_phase(rt.test.generator.phase()),
        ));
        assert!((at_stop - resumed).abs() < 1e-9);

        assert!(rt.stop_test());
        let last = (0..100)
            .map(|_| rt.resolve(&cfg, &ctx(None, 0), &mut rng))
            .find(|r| r.test_settled)
            .expect("settles");
        assert!((last.output - 50.0).abs() < 1e-9);
    }

    #[test]
    fn stop_without_amplitude_settles_next_tick() {
        let configs = AxisConfigs::default();
        let mut rng = fastrand::Rng::with_seed(3);
        let mut rt = AxisRuntime::new(AxisId::Pitch);
        rt.start_test(2.0);
        assert!(rt.stop_test());
        let r = rt.resolve(&configs[AxisId::Pitch], &ctx(None, 0), &mut rng);
        assert!(r.test_settled);
        assert!(!rt.stop_test());
    }

    #[test]
    fn test_mode_substitutions() {
        assert_eq!(test_mode(AxisId::Stroke, FillMode::None), FillMode::Triangle);
        assert_eq!(test_mode(AxisId::Twist, FillMode::None), FillMode::Sine);
        assert_eq!(test_mode(AxisId::Pitch, FillMode::Grind), FillMode::Grind);
    }

    #[test]
    fn synced_fill_freezes_while_stroke_is_still() {
        let mut configs = AxisConfigs::default();
        configs
            .set_fill_mode(AxisId::Twist, FillMode::Triangle)
            .expect("mode");
        configs.set_sync_with_stroke(AxisId::Twist, true);
        let cfg = configs[AxisId::Twist];
        let mut rng = fastrand::Rng::with_seed(1);
        let mut rt = AxisRuntime::new(AxisId::Twist);
        for _ in 0..10 {
            rt.resolve(&cfg, &ctx(None, 0), &mut rng);
        }
        assert!(rt.pattern.phase().abs() < 1e-12);

        let moving = TickContext {
            stroke_delta: 2.0,
            ..ctx(None, 0)
        };
        rt.resolve(&cfg, &moving, &mut rng);
        assert!((rt.pattern.phase() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn synced_fill_advances_on_both_stroke_directions() {
        let mut configs = AxisConfigs::default();
        configs
            .set_fill_mode(AxisId::Twist, FillMode::Sine)
            .expect("mode");
        configs.set_sync_with_stroke(AxisId::Twist, true);
        let cfg = configs[AxisId::Twist];
        let mut rng = fastrand::Rng::with_seed(1);
        let mut rt = AxisRuntime::new(AxisId::Twist);
        for delta in [4.0, -4.0] {
            let moving = TickContext {
                stroke_delta: delta,
                ..ctx(None, 0)
            };
            rt.resolve(&cfg, &moving, &mut rng);
        }
        assert!((rt.pattern.phase() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn reset_keeps_last_output() {
        let mut rt = AxisRuntime::new(AxisId::Stroke);
        rt.last_output = 12.0;
        rt.last_sent = Some(120);
        rt.start_test(1.0);
        rt.reset();
        assert_eq!(rt.last_sent, None);
        assert!(!rt.is_testing());
        assert!((rt.last_output() - 12.0).abs() < 1e-12);
    }
}
