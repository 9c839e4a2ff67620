//! The motion engine: host-facing API plus the dedicated tick thread.
//!
//! Host calls write into one `Mutex<HostState>`; the tick thread takes that
//! lock once per tick, resolves every axis through `MotionCore`, publishes
//! per-axis activity into atomics and releases the lock before touching the
//! transport. Notifications go out on an unbounded crossbeam channel.
//!
//! Each running engine owns exactly one thread. `stop_timer` (and `Drop`)
//! signal it through an `AtomicBool` and join it, so a stop never lands in
//! the middle of a write.
use crossbeam_channel as xch;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use stroker_traits::{Clock, MonotonicClock, Transport};

use crate::axis::{AXIS_COUNT, AxisConfig, AxisConfigs, AxisId};
use crate::config::{EngineSettings, OutputCfg, clamp_offset_ms, clamp_rate_hz};
use crate::error::{ConfigError, EngineError};
use crate::script::ScriptSet;
use crate::status::{AxisActivity, EngineEvent};
use crate::tick::{MotionCore, TickInput, Tracks};
use crate::transport_error::map_transport_error;
use crate::util::{duration_ms_i64, period_ms, period_us};

/// Shared, lockable transport. The host keeps a clone to manage the link;
/// the engine only sends through it.
pub type TransportHandle = Arc<Mutex<dyn Transport>>;

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Longest `dt` a single tick integrates, in periods. Longer stalls are
/// absorbed rather than replayed.
const MAX_CATCHUP_PERIODS: u32 = 4;
const LINE_CAPACITY: usize = 64;

/// Wrap a transport into a handle.
pub fn transport_handle<T: Transport + 'static>(t: T) -> TransportHandle {
    Arc::new(Mutex::new(t))
}

struct HostState {
    configs: AxisConfigs,
    tracks: Tracks,
    output: OutputCfg,
    media_ms: i64,
    media_stamp: Instant,
    playing: bool,
    transport: Option<TransportHandle>,
    core: MotionCore,
}

impl HostState {
    fn media_ms_at(&self, now: Instant) -> i64 {
        if self.playing {
            self.media_ms
                .saturating_add(duration_ms_i64(now.saturating_duration_since(self.media_stamp)))
        } else {
            self.media_ms
        }
    }
}

struct Shared {
    state: Mutex<HostState>,
    activity: [AtomicU8; AXIS_COUNT],
    /// Bit per axis: a test is active (running or settling).
    testing: AtomicU8,
    /// Bit per axis: a stopped test is still ramping down.
    settling: AtomicU8,
    shutdown: AtomicBool,
    running: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_core(&self, core: &MotionCore) {
        let mut testing = 0u8;
        let mut settling = 0u8;
        for axis in AxisId::ALL {
            let bit = 1u8 << axis.index();
            self.activity[axis.index()].store(core.activity(axis).as_u8(), Ordering::Release);
            if core.is_testing(axis) {
                testing |= bit;
            }
            if core.is_settling(axis) {
                settling |= bit;
            }
        }
        self.testing.store(testing, Ordering::Release);
        self.settling.store(settling, Ordering::Release);
    }

    fn has_bit(mask: &AtomicU8, axis: AxisId) -> bool {
        mask.load(Ordering::Acquire) & (1u8 << axis.index()) != 0
    }

    fn activity(&self, axis: AxisId) -> AxisActivity {
        AxisActivity::from_u8(self.activity[axis.index()].load(Ordering::Acquire))
    }

    /// Forget `handle` unless the host already replaced it.
    fn drop_transport(&self, handle: &TransportHandle) {
        let mut st = self.lock();
        if st
            .transport
            .as_ref()
            .is_some_and(|t| Arc::ptr_eq(t, handle))
        {
            st.transport = None;
        }
    }
}

pub struct MotionEngine {
    shared: Arc<Shared>,
    clock: SharedClock,
    events_tx: xch::Sender<EngineEvent>,
    events_rx: xch::Receiver<EngineEvent>,
    join_handle: Option<JoinHandle<()>>,
}

impl Default for MotionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionEngine {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        let (events_tx, events_rx) = xch::unbounded();
        let now = clock.now();
        let state = HostState {
            configs: AxisConfigs::default(),
            tracks: Tracks::default(),
            output: OutputCfg::default(),
            media_ms: 0,
            media_stamp: now,
            playing: false,
            transport: None,
            core: MotionCore::new(),
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                activity: std::array::from_fn(|_| AtomicU8::new(AxisActivity::Idle.as_u8())),
                testing: AtomicU8::new(0),
                settling: AtomicU8::new(0),
                shutdown: AtomicBool::new(false),
                running: AtomicBool::new(false),
            }),
            clock,
            events_tx,
            events_rx,
            join_handle: None,
        }
    }

    pub fn with_settings(settings: EngineSettings, clock: SharedClock) -> Self {
        let engine = Self::with_clock(clock);
        {
            let mut st = engine.shared.lock();
            st.configs = settings.axes;
            st.output = settings.output.clamped();
        }
        engine
    }

    // ── configuration ────────────────────────────────────────────────────

    /// Replace every axis configuration. Takes effect on the next tick.
    pub fn set_axis_configs(&self, configs: AxisConfigs) {
        self.shared.lock().configs = configs;
    }

    /// Replace one axis's configuration, re-validated through the setters.
    /// On error nothing changes.
    pub fn set_axis_config(&self, axis: AxisId, cfg: &AxisConfig) -> Result<(), ConfigError> {
        self.update_axes(|axes| {
            let mut next = *axes;
            next.set_range(axis, cfg.min(), cfg.max())?;
            next.set_enabled(axis, cfg.enabled());
            next.set_fill_mode(axis, cfg.fill_mode())?;
            next.set_sync_with_stroke(axis, cfg.sync_with_stroke());
            next.set_fill_speed_hz(axis, cfg.fill_speed_hz());
            if axis.offset_kind() != crate::axis::OffsetKind::None {
                next.set_position_offset(axis, cfg.position_offset())?;
            }
            *axes = next;
            Ok(())
        })
    }

    /// Edit a copy of the axis configurations and install it. `f` runs
    /// without the host lock held, so the tick thread never waits on it.
    pub fn update_axes<T>(&self, f: impl FnOnce(&mut AxisConfigs) -> T) -> T {
        let mut next = self.axis_configs();
        let out = f(&mut next);
        self.shared.lock().configs = next;
        out
    }

    pub fn axis_configs(&self) -> AxisConfigs {
        self.shared.lock().configs
    }

    /// Install tracks. Axes absent from `scripts` lose their track.
    pub fn set_scripts(&self, scripts: ScriptSet) {
        let tracks = scripts.into_tracks();
        tracing::debug!(
            axes = tracks.iter().filter(|t| t.is_some()).count(),
            "scripts installed"
        );
        self.shared.lock().tracks = tracks;
    }

    pub fn clear_scripts(&self) {
        self.shared.lock().tracks = Tracks::default();
        tracing::debug!("scripts cleared");
    }

    /// Clamped to 30..=200 Hz.
    pub fn set_output_rate(&self, hz: u32) {
        self.shared.lock().output.rate_hz = clamp_rate_hz(hz);
    }

    /// Clamped to -500..=500 ms.
    pub fn set_offset(&self, ms: i32) {
        self.shared.lock().output.offset_ms = clamp_offset_ms(ms);
    }

    pub fn output(&self) -> OutputCfg {
        self.shared.lock().output
    }

    /// Current media position. While playing, the engine extrapolates from
    /// here until the next call.
    pub fn set_time(&self, ms: i64) {
        let now = self.clock.now();
        let mut st = self.shared.lock();
        st.media_ms = ms;
        st.media_stamp = now;
    }

    pub fn set_playing(&self, playing: bool) {
        let now = self.clock.now();
        let mut st = self.shared.lock();
        st.media_ms = st.media_ms_at(now);
        st.media_stamp = now;
        st.playing = playing;
    }

    pub fn media_time_ms(&self) -> i64 {
        let now = self.clock.now();
        self.shared.lock().media_ms_at(now)
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    /// Attach a connected transport, home every enabled axis and start
    /// ticking.
    pub fn connect(&mut self, transport: TransportHandle) -> Result<(), EngineError> {
        self.stop_timer();
        {
            let mut st = self.shared.lock();
            st.transport = Some(transport);
            let configs = st.configs;
            st.core.reset();
            st.core.arm_homing(&configs);
            self.shared.publish_core(&st.core);
        }
        tracing::debug!("transport attached");
        self.start()
    }

    /// Stop ticking and drop the transport handle. The link itself is left
    /// to its owner.
    pub fn disconnect(&mut self) {
        self.stop_timer();
        let mut st = self.shared.lock();
        st.transport = None;
        st.core.reset();
        self.shared.publish_core(&st.core);
        tracing::debug!("transport detached");
    }

    pub fn has_transport(&self) -> bool {
        self.shared.lock().transport.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Start the tick thread. A no-op when already running.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.is_running() {
            return Ok(());
        }
        self.reap();
        if self.shared.lock().transport.is_none() {
            return Err(EngineError::NoTransport);
        }
        self.shared.shutdown.store(false, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        let events = self.events_tx.clone();
        let spawned = std::thread::Builder::new()
            .name("stroker-tick".to_string())
            .spawn(move || run(&shared, clock.as_ref(), &events));
        match spawned {
            Ok(handle) => {
                self.join_handle = Some(handle);
                tracing::debug!("tick thread started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(EngineError::Thread(e.to_string()))
            }
        }
    }

    /// Stop the tick thread and wait for it. Safe to call repeatedly.
    pub fn stop_timer(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.reap();
        self.shared.shutdown.store(false, Ordering::Release);
    }

    fn reap(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("tick thread joined"),
                Err(e) => tracing::warn!(?e, "tick thread panicked"),
            }
        }
    }

    // ── commands ─────────────────────────────────────────────────────────

    /// Re-run the homing move on every enabled axis.
    pub fn home_axes(&self) {
        let mut st = self.shared.lock();
        let configs = st.configs;
        st.core.arm_homing(&configs);
        self.shared.publish_core(&st.core);
    }

    pub fn start_test_axis(&self, axis: AxisId, speed_hz: f64) {
        let mut st = self.shared.lock();
        st.core.start_test(axis, speed_hz);
        self.shared.publish_core(&st.core);
    }

    /// Begin the ramp-down of a running test. Without a running tick thread
    /// nothing would ramp, so the test ends at once.
    pub fn stop_test_axis(&self, axis: AxisId) -> bool {
        let mut st = self.shared.lock();
        let stopped = st.core.stop_test(axis);
        if stopped && !self.is_running() {
            self.settle_now(&mut st.core, axis);
        }
        self.shared.publish_core(&st.core);
        stopped
    }

    pub fn stop_all_test_axes(&self) -> usize {
        let mut st = self.shared.lock();
        let stopped = st.core.stop_all_tests();
        if stopped > 0 && !self.is_running() {
            for axis in AxisId::ALL {
                if st.core.is_settling(axis) {
                    self.settle_now(&mut st.core, axis);
                }
            }
        }
        self.shared.publish_core(&st.core);
        stopped
    }

    pub fn update_test_speed(&self, axis: AxisId, speed_hz: f64) {
        self.shared.lock().core.update_test_speed(axis, speed_hz);
    }

    fn settle_now(&self, core: &mut MotionCore, axis: AxisId) {
        if core.abort_test(axis) {
            let _ = self.events_tx.send(EngineEvent::AxisTestStopped(axis));
            if !core.any_testing() {
                let _ = self.events_tx.send(EngineEvent::AllTestsStopped);
            }
        }
    }

    // ── queries ──────────────────────────────────────────────────────────

    pub fn activity(&self, axis: AxisId) -> AxisActivity {
        self.shared.activity(axis)
    }

    /// Lock-free; reflects the last tick or command.
    pub fn is_settling(&self, axis: AxisId) -> bool {
        Shared::has_bit(&self.shared.settling, axis)
    }

    /// True from `start_test_axis` until the ramp-down completes, homing
    /// included.
    pub fn is_testing(&self, axis: AxisId) -> bool {
        Shared::has_bit(&self.shared.testing, axis)
    }

    pub fn events(&self) -> xch::Receiver<EngineEvent> {
        self.events_rx.clone()
    }
}

impl Drop for MotionEngine {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

fn deliver(transport: &TransportHandle, line: &str) -> Result<(), EngineError> {
    let mut t = transport
        .lock()
        .map_err(|_| EngineError::Transport("transport lock poisoned".to_string()))?;
    if !t.is_connected() {
        return Err(EngineError::Transport("link reported disconnected".to_string()));
    }
    if !line.is_empty() {
        t.send(line.as_bytes()).map_err(|e| map_transport_error(&*e))?;
    }
    Ok(())
}

fn run(shared: &Shared, clock: &(dyn Clock + Send + Sync), events: &xch::Sender<EngineEvent>) {
    let mut out = String::with_capacity(LINE_CAPACITY);
    let mut last = clock.now();
    let mut deadline = last;
    let mut first = true;

    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            tracing::debug!("tick thread received shutdown signal");
            break;
        }

        let now = clock.now();
        let (transport, period) = {
            let mut st = shared.lock();
            let Some(transport) = st.transport.clone() else {
                tracing::debug!("no transport, tick thread exiting");
                break;
            };
            let period = Duration::from_micros(period_us(st.output.rate_hz));
            let dt = if first {
                period
            } else {
                now.saturating_duration_since(last)
                    .min(period * MAX_CATCHUP_PERIODS)
            };
            let script_time_ms = st
                .media_ms_at(now)
                .saturating_add(i64::from(st.output.offset_ms));
            let interval_ms = period_ms(st.output.rate_hz);

            let HostState {
                configs,
                tracks,
                core,
                ..
            } = &mut *st;
            let report = core.tick(&TickInput {
                configs: &*configs,
                tracks: &*tracks,
                script_time_ms,
                interval_ms,
                dt_s: dt.as_secs_f64(),
            });
            out.clear();
            if let Some(line) = report.line {
                out.push_str(line);
            }
            let settled = report.settled;
            let all_settled = report.all_settled;
            shared.publish_core(core);
            for axis in AxisId::ALL.into_iter().filter(|a| settled[a.index()]) {
                let _ = events.send(EngineEvent::AxisTestStopped(axis));
            }
            if all_settled {
                let _ = events.send(EngineEvent::AllTestsStopped);
            }
            (transport, period)
        };
        first = false;
        last = now;

        if let Err(e) = deliver(&transport, &out) {
            tracing::error!(error = %e, "transport lost, halting output");
            shared.drop_transport(&transport);
            let _ = events.send(EngineEvent::TransportLost);
            break;
        }

        deadline += period;
        let now = clock.now();
        if now > deadline + period {
            tracing::trace!("tick overran by more than a period, resynchronising");
            deadline = now;
        }
        clock.sleep_until(deadline);
    }

    shared.running.store(false, Ordering::Release);
    tracing::trace!("tick thread exiting cleanly");
}
