//! Common time/period helpers for stroker_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Tick period in microseconds for a rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Tick period in whole milliseconds, the interpolation interval put on the
/// wire. Integer division: 30 Hz yields 33.
#[inline]
pub fn period_ms(hz: u32) -> u32 {
    let ms = (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1);
    u32::try_from(ms).unwrap_or(u32::MAX)
}

/// Saturating `Duration` to whole milliseconds.
#[inline]
pub fn duration_ms_i64(d: std::time::Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
