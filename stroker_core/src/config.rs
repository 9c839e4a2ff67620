//! Runtime configuration of the engine.
//!
//! Separate from the TOML schema in `stroker_config`; see `conversions` for
//! the mapping. Values are clamped on the way in, never rejected.

use crate::axis::AxisConfigs;

pub const MIN_RATE_HZ: u32 = 30;
pub const MAX_RATE_HZ: u32 = 200;
pub const DEFAULT_RATE_HZ: u32 = 100;
pub const MIN_OFFSET_MS: i32 = -500;
pub const MAX_OFFSET_MS: i32 = 500;

#[inline]
pub fn clamp_rate_hz(hz: u32) -> u32 {
    hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ)
}

#[inline]
pub fn clamp_offset_ms(ms: i32) -> i32 {
    ms.clamp(MIN_OFFSET_MS, MAX_OFFSET_MS)
}

/// Output timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputCfg {
    /// Tick rate in Hz, 30..=200.
    pub rate_hz: u32,
    /// Added to media time before every script lookup, -500..=500 ms.
    pub offset_ms: i32,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            rate_hz: DEFAULT_RATE_HZ,
            offset_ms: 0,
        }
    }
}

impl OutputCfg {
    pub fn clamped(self) -> Self {
        Self {
            rate_hz: clamp_rate_hz(self.rate_hz),
            offset_ms: clamp_offset_ms(self.offset_ms),
        }
    }
}

/// Everything the engine needs to start, as loaded from a config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    pub output: OutputCfg,
    pub axes: AxisConfigs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_bounds() {
        let cfg = OutputCfg {
            rate_hz: 5,
            offset_ms: 9000,
        }
        .clamped();
        assert_eq!(cfg.rate_hz, MIN_RATE_HZ);
        assert_eq!(cfg.offset_ms, MAX_OFFSET_MS);
        assert_eq!(clamp_rate_hz(1000), MAX_RATE_HZ);
        assert_eq!(clamp_offset_ms(-501), MIN_OFFSET_MS);
    }
}
