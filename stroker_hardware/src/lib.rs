#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Concrete transports for the stroker engine.
//!
//! - `UdpTransport`: one datagram per command line
//! - `SerialTransport`: raw tty via termios (`serial` feature, unix only)
//! - `SimulatedTransport`: accepts everything and logs it

pub mod error;
pub mod sim;
pub mod udp;

#[cfg(all(unix, feature = "serial"))]
pub mod serial;

pub use error::HwError;
pub use sim::{SimCounters, SimulatedTransport};
pub use udp::UdpTransport;

#[cfg(all(unix, feature = "serial"))]
pub use serial::SerialTransport;

/// Whether this build can open serial devices.
pub const fn serial_supported() -> bool {
    cfg!(all(unix, feature = "serial"))
}
