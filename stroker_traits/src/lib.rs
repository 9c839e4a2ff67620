pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at the trait boundary so any transport backend can report
/// its own error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Byte sink addressing the device.
///
/// Implementations are told where to connect by the caller; nothing here
/// performs discovery. `send` must not allocate: the engine hands over a
/// borrowed line that it reuses on the next tick.
pub trait Transport: Send {
    /// Open the link. `target` is an address (`host:port`) or a device path,
    /// depending on the backend.
    fn connect(&mut self, target: &str) -> Result<(), BoxError>;

    /// Write one complete command line.
    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError>;

    /// Close the link. Safe to call when already closed.
    fn disconnect(&mut self);

    /// Current link state. The engine polls this once per tick.
    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, target: &str) -> Result<(), BoxError> {
        (**self).connect(target)
    }
    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        (**self).send(bytes)
    }
    fn disconnect(&mut self) {
        (**self).disconnect();
    }
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
