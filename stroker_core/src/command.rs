//! Command line encoding.
//!
//! One line per tick: space-separated `<code><value>I<interval>` entries in
//! axis declaration order, terminated by `\n`. Values are three zero-padded
//! digits (`000`..=`999`) and the interval is the tick period in ms.

use std::fmt::Write as _;

use crate::axis::AxisId;

/// Largest value the three-digit field can carry.
pub const WIRE_MAX: u16 = 999;
/// Room for four entries with a generous interval field.
const LINE_CAPACITY: usize = 64;

/// Wire value for a position in percent of travel: `round(pct * 10)` clamped
/// to `0..=999`.
#[inline]
pub fn to_wire(pct: f64) -> u16 {
    if !pct.is_finite() {
        return 500;
    }
    // Clamped into u16 range before the cast.
    (pct * 10.0).round().clamp(0.0, f64::from(WIRE_MAX)) as u16
}

/// Reusable line buffer. Reserved once; `clear` keeps the allocation.
#[derive(Debug)]
pub struct CommandLine {
    buf: String,
    entries: usize,
}

impl Default for CommandLine {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandLine {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(LINE_CAPACITY),
            entries: 0,
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.entries = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Append one axis entry.
    pub fn push(&mut self, axis: AxisId, value: u16, interval_ms: u32) {
        if self.entries > 0 {
            self.buf.push(' ');
        }
        // Writing into a String cannot fail.
        let _ = write!(
            self.buf,
            "{}{:03}I{}",
            axis.code(),
            value.min(WIRE_MAX),
            interval_ms
        );
        self.entries += 1;
    }

    /// Terminate the line and return it, or `None` if no entry was pushed.
    pub fn finish(&mut self) -> Option<&str> {
        if self.entries == 0 {
            return None;
        }
        self.buf.push('\n');
        Some(&self.buf)
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}
