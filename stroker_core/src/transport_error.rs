//! Maps `Box<dyn Error>` from the transport boundary to typed `EngineError`.
//!
//! `stroker_traits::Transport` returns boxed errors; this module converts
//! them, with an optional feature-gated path for `stroker_hardware::HwError`
//! downcasting.

use crate::error::EngineError;

/// Map a transport error to a typed `EngineError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> EngineError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<stroker_hardware::error::HwError>() {
            return match hw {
                stroker_hardware::error::HwError::Timeout => EngineError::Timeout,
                stroker_hardware::error::HwError::NotConnected => EngineError::NoTransport,
                other => EngineError::Transport(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timed out") || s.to_lowercase().contains("timeout") {
        EngineError::Timeout
    } else {
        EngineError::Transport(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_message() {
        let e = std::io::Error::other("write timed out");
        assert!(matches!(map_transport_error(&e), EngineError::Timeout));
        let e = std::io::Error::other("broken pipe");
        assert!(matches!(map_transport_error(&e), EngineError::Transport(m) if m == "broken pipe"));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_hardware_errors() {
        use stroker_hardware::error::HwError;
        assert!(matches!(map_transport_error(&HwError::NotConnected), EngineError::NoTransport));
        assert!(matches!(map_transport_error(&HwError::Timeout), EngineError::Timeout));
    }
}
