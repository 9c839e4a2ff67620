//! Real-time process setup (Linux SCHED_FIFO + mlockall; macOS mlockall).
//!
//! Must run before the engine spawns its tick thread: new threads inherit
//! the scheduling policy of their creator.

use crate::cli::{RtArgs, RtLock};
use std::sync::OnceLock;

static RT_ONCE: OnceLock<()> = OnceLock::new();

/// Apply `--rt` settings once per process. Failures are warnings: the engine
/// still runs, only with ordinary scheduling.
pub fn setup_rt_once(args: RtArgs) {
    if !args.rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        let lock = args.rt_lock.unwrap_or_else(RtLock::os_default);
        match lock_memory(lock) {
            Ok(()) => tracing::info!(?lock, "rt: memory lock applied"),
            Err(e) => tracing::warn!(?lock, error = %e, "rt: mlockall failed"),
        }
        match apply_fifo(args.rt_prio) {
            Ok(Some(prio)) => tracing::info!(prio, "rt: SCHED_FIFO applied"),
            Ok(None) => tracing::warn!("rt: SCHED_FIFO unsupported on this OS"),
            Err(e) => tracing::warn!(
                error = %e,
                "rt: sched_setscheduler failed; needs CAP_SYS_NICE or root"
            ),
        }
    });
}

#[cfg(unix)]
fn lock_memory(lock: RtLock) -> std::io::Result<()> {
    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => libc::MCL_CURRENT,
        RtLock::All => libc::MCL_CURRENT | libc::MCL_FUTURE,
    };
    // SAFETY: mlockall takes only flags and touches no caller memory.
    let rc = unsafe { libc::mlockall(flags) };
    if rc == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if lock == RtLock::All && matches!(err.raw_os_error(), Some(libc::EPERM | libc::ENOMEM)) {
        tracing::debug!(error = %err, "rt: mlockall(current|future) failed, retrying current");
        return lock_memory(RtLock::Current);
    }
    Err(err)
}

#[cfg(not(unix))]
fn lock_memory(_lock: RtLock) -> std::io::Result<()> {
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_fifo(prio: Option<i32>) -> std::io::Result<Option<i32>> {
    // SAFETY: plain queries with no pointer arguments.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let prio = prio.unwrap_or(max).clamp(min, max);
    let param = libc::sched_param {
        sched_priority: prio,
    };
    // SAFETY: `param` is a valid, initialized sched_param for the call.
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc == 0 {
        Ok(Some(prio))
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_fifo(_prio: Option<i32>) -> std::io::Result<Option<i32>> {
    Ok(None)
}
