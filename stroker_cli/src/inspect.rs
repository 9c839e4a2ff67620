//! Read-only commands: `inspect`, `match` and `self-check`.

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use serde_json::json;
use stroker_config::Config;
use stroker_core::{AxisId, EngineSettings, ScriptSet, load_script, match_scripts};

use crate::device;

pub struct TrackSummary {
    pub axis: AxisId,
    pub keyframes: usize,
    pub first_ms: i64,
    pub last_ms: i64,
    pub min_pos: f64,
    pub max_pos: f64,
}

impl TrackSummary {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "axis": self.axis.name(),
            "keyframes": self.keyframes,
            "first_ms": self.first_ms,
            "last_ms": self.last_ms,
            "min_pos": self.min_pos,
            "max_pos": self.max_pos,
        })
    }
}

impl std::fmt::Display for TrackSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<6} {:>6} keyframes  {}..{} ms  pos {:.0}..{:.0}",
            self.axis.name(),
            self.keyframes,
            self.first_ms,
            self.last_ms,
            self.min_pos,
            self.max_pos
        )
    }
}

pub fn summarize(set: &ScriptSet) -> Vec<TrackSummary> {
    AxisId::ALL
        .into_iter()
        .filter_map(|axis| {
            let track = set.get(axis)?;
            let frames = track.keyframes();
            let (min_pos, max_pos) = frames
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), k| (lo.min(k.pos), hi.max(k.pos)));
            Some(TrackSummary {
                axis,
                keyframes: frames.len(),
                first_ms: track.first().map_or(0, |k| k.at_ms),
                last_ms: track.last().map_or(0, |k| k.at_ms),
                min_pos,
                max_pos,
            })
        })
        .collect()
}

pub fn inspect(path: &Path, axis: &str) -> Result<Vec<TrackSummary>> {
    let primary: AxisId = axis.parse()?;
    let set = load_script(path, primary)?;
    Ok(summarize(&set))
}

pub fn matches(media: &Path) -> Vec<(AxisId, PathBuf)> {
    match_scripts(media)
        .iter()
        .map(|(axis, p)| (axis, p.to_path_buf()))
        .collect()
}

pub struct SelfCheck {
    pub transport: &'static str,
    pub target: String,
    pub rate_hz: u32,
    /// This build can open serial devices.
    pub serial: bool,
}

/// Validate the config end to end and open (then close) the transport.
pub fn self_check(cfg: &Config, force_sim: bool) -> Result<SelfCheck> {
    let settings = EngineSettings::try_from(cfg).wrap_err("invalid axis settings")?;
    let dev = device::open(&cfg.transport, force_sim)?;
    let out = SelfCheck {
        transport: dev.kind_name(),
        target: dev.target.clone(),
        rate_hz: settings.output.rate_hz,
        serial: stroker_hardware::serial_supported(),
    };
    dev.close();
    Ok(out)
}
