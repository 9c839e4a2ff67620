//! Per-axis activity and engine notifications.

use crate::axis::AxisId;

/// What an axis is doing on the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AxisActivity {
    /// Resting at the (offset-adjusted) midpoint.
    #[default]
    Idle = 0,
    /// Moving to the midpoint after a connect.
    Homing = 1,
    /// Following a keyframe track.
    Scripted = 2,
    /// Following its fill pattern.
    Patterned = 3,
    /// Running a test pattern.
    Testing = 4,
    /// Test stopped, amplitude ramping down.
    Settling = 5,
}

impl AxisActivity {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(v: u8) -> Self {
        match v {
            1 => AxisActivity::Homing,
            2 => AxisActivity::Scripted,
            3 => AxisActivity::Patterned,
            4 => AxisActivity::Testing,
            5 => AxisActivity::Settling,
            _ => AxisActivity::Idle,
        }
    }

    /// True while a test pattern still drives the axis, ramp-down included.
    pub const fn is_test(self) -> bool {
        matches!(self, AxisActivity::Testing | AxisActivity::Settling)
    }
}

/// Notifications published by the tick thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A stopped test finished ramping down.
    AxisTestStopped(AxisId),
    /// The last settling test finished; no axis is testing any more.
    AllTestsStopped,
    /// A send failed or the transport reported itself disconnected. The
    /// engine dropped its handle and stopped ticking.
    TransportLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_round_trips_through_u8() {
        for a in [
            AxisActivity::Idle,
            AxisActivity::Homing,
            AxisActivity::Scripted,
            AxisActivity::Patterned,
            AxisActivity::Testing,
            AxisActivity::Settling,
        ] {
            assert_eq!(AxisActivity::from_u8(a.as_u8()), a);
        }
        assert_eq!(AxisActivity::from_u8(200), AxisActivity::Idle);
    }
}
