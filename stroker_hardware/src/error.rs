use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("transport not connected")]
    NotConnected,
    #[error("timeout")]
    Timeout,
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),
    #[error("serial: {0}")]
    Serial(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;

impl HwError {
    /// Classify an I/O error from a write, folding timeouts into `Timeout`.
    pub fn from_write(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Self::Timeout,
            std::io::ErrorKind::NotConnected => Self::NotConnected,
            _ => Self::Io(e),
        }
    }
}
