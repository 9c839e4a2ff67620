//! Procedural fill patterns.
//!
//! `FillMode` is a closed set; `shape` maps a phase in `[0, 1)` to a position
//! in `0..=100` with one arm per mode. `PatternGenerator` carries the only
//! state a pattern needs: the phase accumulator and the random targets.

use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use crate::axis::AxisId;
use crate::error::ConfigError;
use crate::keyframe::MIDPOINT;

/// Fraction of a Saw cycle spent snapping back to 0.
const SAW_SNAP: f64 = 0.1;
/// Fraction of a reverse saw cycle spent rising to 100.
const SAW_RISE: f64 = 0.1;
/// Per-edge transition fraction of Square.
const SQUARE_EDGE: f64 = 0.1;
/// Per-edge transition fraction of Pulse.
const PULSE_EDGE: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
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

impl FillMode {
    pub const ALL: [FillMode; 11] = [
        FillMode::None,
        FillMode::Random,
        FillMode::Triangle,
        FillMode::Sine,
        FillMode::Saw,
        FillMode::SawtoothReverse,
        FillMode::Square,
        FillMode::Pulse,
        FillMode::EaseInOut,
        FillMode::Grind,
        FillMode::Figure8,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            FillMode::None => "none",
            FillMode::Random => "random",
            FillMode::Triangle => "triangle",
            FillMode::Sine => "sine",
            FillMode::Saw => "saw",
            FillMode::SawtoothReverse => "sawtooth_reverse",
            FillMode::Square => "square",
            FillMode::Pulse => "pulse",
            FillMode::EaseInOut => "ease_in_out",
            FillMode::Grind => "grind",
            FillMode::Figure8 => "figure8",
        }
    }

    /// Modes whose output is a function of the stroke axis rather than of
    /// their own phase.
    pub const fn follows_stroke(self) -> bool {
        matches!(self, FillMode::Grind | FillMode::Figure8)
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FillMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        FillMode::ALL
            .into_iter()
            .find(|m| m.name() == norm)
            .ok_or_else(|| ConfigError::UnknownFillMode(s.to_string()))
    }
}

/// Cosine ease from 0 to 1 over `t` in `[0, 1]`.
#[inline]
pub fn ease_cos(t: f64) -> f64 {
    (1.0 - (PI * t.clamp(0.0, 1.0)).cos()) * 0.5
}

/// Cubic ease-in-out over `t` in `[0, 1]`.
#[inline]
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u * 0.5
    }
}

#[inline]
fn triangle(phase: f64) -> f64 {
    if phase < 0.5 {
        phase * 200.0
    } else {
        (1.0 - phase) * 200.0
    }
}

/// Eased rise, dwell high, eased fall, dwell low.
#[inline]
fn dwell(phase: f64, edge: f64) -> f64 {
    if phase < edge {
        100.0 * ease_cos(phase / edge)
    } else if phase < 0.5 {
        100.0
    } else if phase < 0.5 + edge {
        100.0 * (1.0 - ease_cos((phase - 0.5) / edge))
    } else {
        0.0
    }
}

/// Phase-only shapes. Random, Grind and Figure8 need more than a phase and
/// report the midpoint here; use `PatternGenerator::sample` for them.
pub fn shape(mode: FillMode, phase: f64) -> f64 {
    let p = phase.rem_euclid(1.0);
    match mode {
        FillMode::None | FillMode::Random | FillMode::Grind | FillMode::Figure8 => MIDPOINT,
        FillMode::Triangle => triangle(p),
        FillMode::Sine => 50.0 + 50.0 * (TAU * p).sin(),
        FillMode::Saw => {
            if p < 1.0 - SAW_SNAP {
                p / (1.0 - SAW_SNAP) * 100.0
            } else {
                100.0 * (1.0 - ease_cos((p - (1.0 - SAW_SNAP)) / SAW_SNAP))
            }
        }
        FillMode::SawtoothReverse => {
            if p < SAW_RISE {
                100.0 * ease_cos(p / SAW_RISE)
            } else {
                100.0 * (1.0 - (p - SAW_RISE) / (1.0 - SAW_RISE))
            }
        }
        FillMode::Square => dwell(p, SQUARE_EDGE),
        FillMode::Pulse => dwell(p, PULSE_EDGE),
        FillMode::EaseInOut => 100.0 * ease_cubic_in_out(triangle(p) / 100.0),
    }
}

/// What the stroke-following modes read from the stroke axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeDrive {
    /// Resolved stroke position, 0..100, before remapping.
    pub value: f64,
    /// Stroke phase in `[0, 1)`, reconstructed from value and direction.
    pub phase: f64,
}

impl StrokeDrive {
    pub const REST: StrokeDrive = StrokeDrive {
        value: MIDPOINT,
        phase: 0.25,
    };

    /// Place the stroke on a triangle cycle: rising covers `[0, 0.5)`, falling
    /// covers `[0.5, 1)`.
    pub fn from_motion(value: f64, rising: bool) -> Self {
        let v = value.clamp(0.0, 100.0);
        let phase = if rising { v / 200.0 } else { 1.0 - v / 200.0 };
        Self {
            value: v,
            phase: phase.rem_euclid(1.0),
        }
    }

    /// A synthetic stroke following a triangle at `phase`.
    pub fn from_phase(phase: f64) -> Self {
        let p = phase.rem_euclid(1.0);
        Self {
            value: triangle(p),
            phase: p,
        }
    }
}

/// Phase accumulator plus random-walk targets for one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternGenerator {
    phase: f64,
    random_from: f64,
    random_to: f64,
}

impl Default for PatternGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternGenerator {
    pub const fn new() -> Self {
        Self {
            phase: 0.0,
            random_from: MIDPOINT,
            random_to: MIDPOINT,
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance by `cycles` (fractions of a period). Every wrap picks a fresh
    /// random target, starting from the previous one.
    pub fn advance(&mut self, cycles: f64, rng: &mut fastrand::Rng) {
        if !cycles.is_finite() || cycles <= 0.0 {
            return;
        }
        let next = self.phase + cycles;
        if next >= 1.0 {
            self.random_from = self.random_to;
            self.random_to = rng.f64() * 100.0;
        }
        self.phase = next.rem_euclid(1.0);
    }

    /// Output of `mode` for `axis` at the current phase.
    pub fn sample(&self, mode: FillMode, axis: AxisId, stroke: StrokeDrive) -> f64 {
        match mode {
            FillMode::Random => {
                self.random_from + (self.random_to - self.random_from) * ease_cos(self.phase)
            }
            FillMode::Grind => 100.0 - stroke.value,
            FillMode::Figure8 => {
                // Roll sweeps once per stroke cycle, pitch twice: a figure-eight.
                let turns = if axis == AxisId::Pitch { 2.0 } else { 1.0 };
                50.0 + 50.0 * (TAU * turns * stroke.phase).sin()
            }
            other => shape(other, self.phase),
        }
    }
}
