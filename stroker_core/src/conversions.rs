//! `From` implementations bridging `stroker_config` types to `stroker_core` types.
//!
//! Config files are validated before they get here, but the conversions still
//! go through the clamping setters so an unvalidated `Config` cannot break an
//! axis invariant.

use stroker_config::{Config, FillModeName};

use crate::axis::{AxisConfigs, AxisId};
use crate::config::{EngineSettings, OutputCfg};
use crate::error::ConfigError;
use crate::pattern::FillMode;

// ── FillMode ─────────────────────────────────────────────────────────────────

impl From<FillModeName> for FillMode {
    fn from(m: FillModeName) -> Self {
        match m {
            FillModeName::None => FillMode::None,
            FillModeName::Random => FillMode::Random,
            FillModeName::Triangle => FillMode::Triangle,
            FillModeName::Sine => FillMode::Sine,
            FillModeName::Saw => FillMode::Saw,
            FillModeName::SawtoothReverse => FillMode::SawtoothReverse,
            FillModeName::Square => FillMode::Square,
            FillModeName::Pulse => FillMode::Pulse,
            FillModeName::EaseInOut => FillMode::EaseInOut,
            FillModeName::Grind => FillMode::Grind,
            FillModeName::Figure8 => FillMode::Figure8,
        }
    }
}

// ── OutputCfg ────────────────────────────────────────────────────────────────

impl From<&stroker_config::Output> for OutputCfg {
    fn from(c: &stroker_config::Output) -> Self {
        Self {
            rate_hz: c.rate_hz,
            offset_ms: c.offset_ms,
        }
        .clamped()
    }
}

// ── AxisConfigs ──────────────────────────────────────────────────────────────

impl TryFrom<&stroker_config::Axes> for AxisConfigs {
    type Error = ConfigError;

    fn try_from(c: &stroker_config::Axes) -> Result<Self, Self::Error> {
        let mut axes = AxisConfigs::default();
        for (key, s) in c.iter() {
            let axis: AxisId = key.parse()?;
            axes.set_range(axis, s.min, s.max)?;
            axes.set_enabled(axis, s.enabled);
            axes.set_fill_mode(axis, s.fill_mode.into())?;
            axes.set_sync_with_stroke(axis, s.sync_with_stroke);
            axes.set_fill_speed_hz(axis, f64::from(s.fill_speed_hz));
        }
        Ok(axes)
    }
}

// ── EngineSettings ───────────────────────────────────────────────────────────

impl TryFrom<&Config> for EngineSettings {
    type Error = ConfigError;

    fn try_from(c: &Config) -> Result<Self, Self::Error> {
        Ok(Self {
            output: OutputCfg::from(&c.output),
            axes: AxisConfigs::try_from(&c.axes)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_converts() {
        let cfg = stroker_config::load_toml(
            r#"
[output]
rate_hz = 500
[axes.roll]
min = 20
max = 80
fill_mode = "figure8"
fill_speed_hz = 9.0
"#,
        )
        .expect("parse");
        let settings = EngineSettings::try_from(&cfg).expect("convert");
        assert_eq!(settings.output.rate_hz, 200);
        let roll = settings.axes[AxisId::Roll];
        assert_eq!((roll.min(), roll.max()), (20, 80));
        assert_eq!(roll.fill_mode(), FillMode::Figure8);
        assert!((roll.fill_speed_hz() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn disallowed_mode_is_rejected() {
        let cfg = stroker_config::load_toml("[axes.twist]\nfill_mode = \"grind\"\n").expect("parse");
        let err = AxisConfigs::try_from(&cfg.axes).expect_err("grind on twist");
        assert!(matches!(err, ConfigError::FillModeNotAllowed { axis: AxisId::Twist, .. }));
    }
}
