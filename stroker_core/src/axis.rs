//! Axis identities and per-axis configuration.
//!
//! The four axes live in a fixed-size arena (`AxisConfigs`) indexed by
//! `AxisId`, so a snapshot is a plain copy and no lookup allocates.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::pattern::FillMode;

pub const AXIS_COUNT: usize = 4;

/// Lower-bound super-range for an axis range.
pub const RANGE_MIN_BOUNDS: (i16, i16) = (-50, 149);
/// Upper-bound super-range for an axis range.
pub const RANGE_MAX_BOUNDS: (i16, i16) = (-49, 150);
pub const MIN_FILL_SPEED_HZ: f64 = 0.1;
pub const MAX_FILL_SPEED_HZ: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisId {
    Stroke,
    Twist,
    Roll,
    Pitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Linear,
    Rotational,
}

/// How `position_offset` is interpreted for an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetKind {
    /// No offset support.
    None,
    /// Shift of the range centre in percent, -50..=50.
    Percent,
    /// Rotation of the neutral point in degrees, 0..=359.
    Degrees,
}

impl AxisId {
    /// Declaration order, which is also the order entries appear on the wire.
    pub const ALL: [AxisId; AXIS_COUNT] = [AxisId::Stroke, AxisId::Twist, AxisId::Roll, AxisId::Pitch];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis code used in command lines.
    pub const fn code(self) -> &'static str {
        match self {
            AxisId::Stroke => "L0",
            AxisId::Twist => "R0",
            AxisId::Roll => "R1",
            AxisId::Pitch => "R2",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            AxisId::Stroke => "stroke",
            AxisId::Twist => "twist",
            AxisId::Roll => "roll",
            AxisId::Pitch => "pitch",
        }
    }

    pub const fn kind(self) -> AxisKind {
        match self {
            AxisId::Stroke => AxisKind::Linear,
            _ => AxisKind::Rotational,
        }
    }

    pub const fn offset_kind(self) -> OffsetKind {
        match self {
            AxisId::Stroke => OffsetKind::Percent,
            AxisId::Twist => OffsetKind::Degrees,
            AxisId::Roll | AxisId::Pitch => OffsetKind::None,
        }
    }

    /// Literal inserted between the media stem and the script extension.
    pub const fn script_infix(self) -> Option<&'static str> {
        match self {
            AxisId::Stroke => None,
            AxisId::Twist => Some("twist"),
            AxisId::Roll => Some("roll"),
            AxisId::Pitch => Some("pitch"),
        }
    }

    /// Fill modes an axis may be configured with. The stroke axis never fills;
    /// Grind exists only on pitch, Figure8 on roll and pitch.
    pub fn allows(self, mode: FillMode) -> bool {
        match self {
            AxisId::Stroke => mode == FillMode::None,
            AxisId::Twist => !matches!(mode, FillMode::Grind | FillMode::Figure8),
            AxisId::Roll => mode != FillMode::Grind,
            AxisId::Pitch => true,
        }
    }

    /// Accepts wire codes (`L0`, `R2`) and names (`stroke`, `pitch`),
    /// case-insensitively.
    pub fn parse(s: &str) -> Option<AxisId> {
        let s = s.trim();
        AxisId::ALL
            .into_iter()
            .find(|a| s.eq_ignore_ascii_case(a.code()) || s.eq_ignore_ascii_case(a.name()))
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AxisId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AxisId::parse(s).ok_or_else(|| ConfigError::UnknownAxis(s.to_string()))
    }
}

/// Configuration of a single axis.
///
/// Fields are read-only from outside the crate; all mutation goes through
/// `AxisConfigs`, which owns the invariants (`min < max`, fill mode allowed
/// for the axis, clamped speed/offset).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConfig {
    pub(crate) min: i16,
    pub(crate) max: i16,
    pub(crate) enabled: bool,
    pub(crate) fill_mode: FillMode,
    pub(crate) sync_with_stroke: bool,
    pub(crate) fill_speed_hz: f64,
    pub(crate) position_offset: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 100,
            enabled: true,
            fill_mode: FillMode::None,
            sync_with_stroke: false,
            fill_speed_hz: 1.0,
            position_offset: 0.0,
        }
    }
}

impl AxisConfig {
    pub fn min(&self) -> i16 {
        self.min
    }
    pub fn max(&self) -> i16 {
        self.max
    }
    pub fn enabled(&self) -> bool {
        self.enabled
    }
    pub fn fill_mode(&self) -> FillMode {
        self.fill_mode
    }
    pub fn sync_with_stroke(&self) -> bool {
        self.sync_with_stroke
    }
    pub fn fill_speed_hz(&self) -> f64 {
        self.fill_speed_hz
    }
    pub fn position_offset(&self) -> f64 {
        self.position_offset
    }

    /// Map a normalized 0..100 value into this axis's `[min, max]`.
    #[inline]
    pub fn remap(&self, normalized: f64) -> f64 {
        let min = f64::from(self.min);
        let max = f64::from(self.max);
        min + normalized / 100.0 * (max - min)
    }

    /// Offset contribution in percent for the given axis.
    ///
    /// Degrees are taken on the circle, so 350° rotates by -10°.
    #[inline]
    pub fn offset_percent(&self, axis: AxisId) -> f64 {
        match axis.offset_kind() {
            OffsetKind::None => 0.0,
            OffsetKind::Percent => self.position_offset,
            OffsetKind::Degrees => {
                let deg = self.position_offset.rem_euclid(360.0);
                let signed = if deg >= 180.0 { deg - 360.0 } else { deg };
                signed / 360.0 * 100.0
            }
        }
    }

    /// Remap then apply the offset: the final position in percent of travel.
    /// May leave 0..100; the wire encoder clamps.
    #[inline]
    pub fn finalize(&self, axis: AxisId, normalized: f64) -> f64 {
        self.remap(normalized) + self.offset_percent(axis)
    }

    /// Where the axis rests: the remapped midpoint shifted by its offset.
    #[inline]
    pub fn home_position(&self, axis: AxisId) -> f64 {
        self.finalize(axis, 50.0)
    }
}

/// Fixed arena of the four axis configurations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisConfigs {
    slots: [AxisConfig; AXIS_COUNT],
}

impl Index<AxisId> for AxisConfigs {
    type Output = AxisConfig;

    fn index(&self, axis: AxisId) -> &AxisConfig {
        &self.slots[axis.index()]
    }
}

impl AxisConfigs {
    pub fn get(&self, axis: AxisId) -> &AxisConfig {
        &self[axis]
    }

    pub fn iter(&self) -> impl Iterator<Item = (AxisId, &AxisConfig)> {
        AxisId::ALL.into_iter().zip(self.slots.iter())
    }

    fn slot_mut(&mut self, axis: AxisId) -> &mut AxisConfig {
        &mut self.slots[axis.index()]
    }

    /// Set the output range. Each bound is clamped to its super-range first;
    /// if the clamped bounds are not strictly ordered the previous range is
    /// kept and an error returned.
    pub fn set_range(&mut self, axis: AxisId, min: i16, max: i16) -> Result<(), ConfigError> {
        let min = min.clamp(RANGE_MIN_BOUNDS.0, RANGE_MIN_BOUNDS.1);
        let max = max.clamp(RANGE_MAX_BOUNDS.0, RANGE_MAX_BOUNDS.1);
        if min >= max {
            return Err(ConfigError::RangeInverted { axis, min, max });
        }
        let slot = self.slot_mut(axis);
        slot.min = min;
        slot.max = max;
        Ok(())
    }

    /// Move only the lower bound, keeping the upper bound.
    pub fn set_min(&mut self, axis: AxisId, min: i16) -> Result<(), ConfigError> {
        let max = self[axis].max;
        self.set_range(axis, min, max)
    }

    /// Move only the upper bound, keeping the lower bound.
    pub fn set_max(&mut self, axis: AxisId, max: i16) -> Result<(), ConfigError> {
        let min = self[axis].min;
        self.set_range(axis, min, max)
    }

    pub fn set_enabled(&mut self, axis: AxisId, enabled: bool) {
        self.slot_mut(axis).enabled = enabled;
    }

    pub fn set_fill_mode(&mut self, axis: AxisId, mode: FillMode) -> Result<(), ConfigError> {
        if !axis.allows(mode) {
            return Err(ConfigError::FillModeNotAllowed { axis, mode });
        }
        self.slot_mut(axis).fill_mode = mode;
        Ok(())
    }

    /// Meaningless on the stroke axis, but stored as given.
    pub fn set_sync_with_stroke(&mut self, axis: AxisId, sync: bool) {
        self.slot_mut(axis).sync_with_stroke = sync;
    }

    pub fn set_fill_speed_hz(&mut self, axis: AxisId, hz: f64) {
        let hz = if hz.is_finite() {
            hz.clamp(MIN_FILL_SPEED_HZ, MAX_FILL_SPEED_HZ)
        } else {
            1.0
        };
        self.slot_mut(axis).fill_speed_hz = hz;
    }

    /// Clamp into the axis's offset domain: -50..=50 percent for the stroke,
    /// 0..=359 degrees for twist.
    pub fn set_position_offset(&mut self, axis: AxisId, offset: f64) -> Result<(), ConfigError> {
        let offset = if offset.is_finite() { offset } else { 0.0 };
        let value = match axis.offset_kind() {
            OffsetKind::None => return Err(ConfigError::OffsetNotSupported(axis)),
            OffsetKind::Percent => offset.clamp(-50.0, 50.0),
            OffsetKind::Degrees => offset.clamp(0.0, 359.0),
        };
        self.slot_mut(axis).position_offset = value;
        Ok(())
    }
}
