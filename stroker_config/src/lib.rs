#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the stroker workspace.
//!
//! - `Config` and its sections are deserialized from TOML. Every section and
//!   key is optional and falls back to the documented default.
//! - `normalize()` clamps numeric values into their allowed bounds (values come
//!   from sliders, so out-of-range input is corrected rather than rejected).
//! - `validate()` rejects what cannot be corrected: unknown schema versions,
//!   inverted axis ranges, fill modes an axis does not support, incomplete
//!   transport settings.
//!
//! Position offsets are session-only and deliberately absent from the schema.
use serde::Deserialize;
use std::path::Path;

/// Schema version understood by this build.
pub const CONFIG_VERSION: u32 = 1;

pub const MIN_RATE_HZ: u32 = 30;
pub const MAX_RATE_HZ: u32 = 200;
pub const MIN_OFFSET_MS: i32 = -500;
pub const MAX_OFFSET_MS: i32 = 500;
/// Allowed super-range for an axis range's lower bound.
pub const AXIS_MIN_BOUNDS: (i16, i16) = (-50, 149);
/// Allowed super-range for an axis range's upper bound.
pub const AXIS_MAX_BOUNDS: (i16, i16) = (-49, 150);
pub const MIN_FILL_SPEED_HZ: f32 = 0.1;
pub const MAX_FILL_SPEED_HZ: f32 = 3.0;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub output: Output,
    pub transport: TransportCfg,
    pub axes: Axes,
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            output: Output::default(),
            transport: TransportCfg::default(),
            axes: Axes::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Output {
    /// Tick rate of the output loop (Hz), 30..=200.
    pub rate_hz: u32,
    /// Global script offset in ms, -500..=500. Positive values read ahead.
    pub offset_ms: i32,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            rate_hz: 100,
            offset_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Datagrams to `address`.
    #[default]
    Udp,
    /// Character device at `device`, configured to `baud`.
    Serial,
    /// In-process sink that only logs the command lines.
    Sim,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TransportCfg {
    pub kind: TransportKind,
    /// `host:port` of the device for udp.
    pub address: Option<String>,
    /// Local bind address for udp.
    pub bind: String,
    /// Serial device path.
    pub device: Option<String>,
    pub baud: u32,
}

impl Default for TransportCfg {
    fn default() -> Self {
        Self {
            kind: TransportKind::Udp,
            address: Some("127.0.0.1:8000".to_string()),
            bind: "0.0.0.0:0".to_string(),
            device: None,
            baud: 115_200,
        }
    }
}

/// Fill pattern names as written in TOML.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FillModeName {
    #[default]
    None,
    Random,
    Triangle,
    Sine,
    Saw,
    SawtoothReverse,
    Square,
    Pulse,
    EaseInOut,
    Grind,
    Figure8,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AxisSettings {
    pub min: i16,
    pub max: i16,
    pub enabled: bool,
    pub fill_mode: FillModeName,
    pub sync_with_stroke: bool,
    pub fill_speed_hz: f32,
}

impl Default for AxisSettings {
    fn default() -> Self {
        Self {
            min: 0,
            max: 100,
            enabled: true,
            fill_mode: FillModeName::None,
            sync_with_stroke: false,
            fill_speed_hz: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Axes {
    pub stroke: AxisSettings,
    pub twist: AxisSettings,
    pub roll: AxisSettings,
    pub pitch: AxisSettings,
}

impl Axes {
    /// Iterate as (config key, settings) in wire declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AxisSettings)> {
        [
            ("stroke", &self.stroke),
            ("twist", &self.twist),
            ("roll", &self.roll),
            ("pitch", &self.pitch),
        ]
        .into_iter()
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut AxisSettings> {
        [
            &mut self.stroke,
            &mut self.twist,
            &mut self.roll,
            &mut self.pitch,
        ]
        .into_iter()
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse, clamp and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let mut cfg =
        load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))?;
    cfg.normalize();
    cfg.validate()?;
    Ok(cfg)
}

fn clamp_speed(hz: f32) -> f32 {
    if hz.is_finite() {
        hz.clamp(MIN_FILL_SPEED_HZ, MAX_FILL_SPEED_HZ)
    } else {
        1.0
    }
}

impl Config {
    /// Clamp every numeric value into its allowed bounds.
    pub fn normalize(&mut self) {
        self.output.rate_hz = self.output.rate_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ);
        self.output.offset_ms = self.output.offset_ms.clamp(MIN_OFFSET_MS, MAX_OFFSET_MS);
        for axis in self.axes.iter_mut() {
            axis.min = axis.min.clamp(AXIS_MIN_BOUNDS.0, AXIS_MIN_BOUNDS.1);
            axis.max = axis.max.clamp(AXIS_MAX_BOUNDS.0, AXIS_MAX_BOUNDS.1);
            axis.fill_speed_hz = clamp_speed(axis.fill_speed_hz);
        }
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.version != CONFIG_VERSION {
            eyre::bail!(
                "unsupported config version {} (expected {})",
                self.version,
                CONFIG_VERSION
            );
        }

        // Output
        if !(MIN_RATE_HZ..=MAX_RATE_HZ).contains(&self.output.rate_hz) {
            eyre::bail!("output.rate_hz must be in [{MIN_RATE_HZ}, {MAX_RATE_HZ}]");
        }
        if !(MIN_OFFSET_MS..=MAX_OFFSET_MS).contains(&self.output.offset_ms) {
            eyre::bail!("output.offset_ms must be in [{MIN_OFFSET_MS}, {MAX_OFFSET_MS}]");
        }

        // Axes
        for (name, axis) in self.axes.iter() {
            if axis.min >= axis.max {
                eyre::bail!(
                    "axes.{name}: min ({}) must be below max ({})",
                    axis.min,
                    axis.max
                );
            }
            if !fill_mode_allowed(name, axis.fill_mode) {
                eyre::bail!(
                    "axes.{name}: fill_mode {:?} is not supported on this axis",
                    axis.fill_mode
                );
            }
        }

        // Transport
        match self.transport.kind {
            TransportKind::Udp => {
                if self.transport.address.as_deref().is_none_or(str::is_empty) {
                    eyre::bail!("transport.address is required for udp");
                }
            }
            TransportKind::Serial => {
                if self.transport.device.as_deref().is_none_or(str::is_empty) {
                    eyre::bail!("transport.device is required for serial");
                }
                if self.transport.baud == 0 {
                    eyre::bail!("transport.baud must be > 0");
                }
            }
            TransportKind::Sim => {}
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

/// Per-axis fill mode restrictions: the stroke axis never fills, Grind only
/// exists on pitch, Figure8 on roll and pitch.
pub fn fill_mode_allowed(axis: &str, mode: FillModeName) -> bool {
    match axis {
        "stroke" => mode == FillModeName::None,
        "twist" => !matches!(mode, FillModeName::Grind | FillModeName::Figure8),
        "roll" => mode != FillModeName::Grind,
        _ => true,
    }
}
