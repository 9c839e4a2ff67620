//! Serial transport: raw-mode tty at a fixed baud rate.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;

use nix::sys::termios::{
    BaudRate, ControlFlags, FlushArg, SetArg, cfmakeraw, cfsetspeed, tcflush, tcgetattr, tcsetattr,
};
use stroker_traits::{BoxError, Transport};

use crate::error::{HwError, Result};

pub const DEFAULT_BAUD: u32 = 115_200;

/// Map a numeric baud rate onto the termios constant.
pub fn baud_rate(baud: u32) -> Result<BaudRate> {
    Ok(match baud {
        9_600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        other => return Err(HwError::UnsupportedBaud(other)),
    })
}

#[derive(Debug)]
pub struct SerialTransport {
    baud: u32,
    port: Option<File>,
}

impl SerialTransport {
    pub fn new(baud: u32) -> Self {
        Self { baud, port: None }
    }

    fn open(&mut self, device: &str) -> Result<()> {
        let speed = baud_rate(self.baud)?;
        let port = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(device)?;

        let mut tio = tcgetattr(&port).map_err(|e| HwError::Serial(format!("tcgetattr: {e}")))?;
        cfmakeraw(&mut tio);
        tio.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        cfsetspeed(&mut tio, speed).map_err(|e| HwError::Serial(format!("cfsetspeed: {e}")))?;
        tcsetattr(&port, SetArg::TCSANOW, &tio)
            .map_err(|e| HwError::Serial(format!("tcsetattr: {e}")))?;
        tcflush(&port, FlushArg::TCIOFLUSH)
            .map_err(|e| HwError::Serial(format!("tcflush: {e}")))?;

        tracing::debug!(device, baud = self.baud, "serial transport connected");
        self.port = Some(port);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(HwError::NotConnected)?;
        port.write_all(bytes).map_err(HwError::from_write)
    }
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD)
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self, target: &str) -> std::result::Result<(), BoxError> {
        self.disconnect();
        Ok(self.open(target)?)
    }

    fn send(&mut self, bytes: &[u8]) -> std::result::Result<(), BoxError> {
        Ok(self.write(bytes)?)
    }

    fn disconnect(&mut self) {
        if self.port.take().is_some() {
            tracing::debug!("serial transport closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(9_600, true)]
    #[case(115_200, true)]
    #[case(230_400, true)]
    #[case(12_345, false)]
    #[case(0, false)]
    fn baud_mapping(#[case] baud: u32, #[case] ok: bool) {
        assert_eq!(baud_rate(baud).is_ok(), ok);
    }

    #[test]
    fn missing_device_is_io_error() {
        let mut port = SerialTransport::default();
        let err = port.open("/nonexistent/tty-stroker").unwrap_err();
        assert!(matches!(err, HwError::Io(_)));
        assert!(!port.is_connected());
    }

    #[test]
    fn unsupported_baud_rejected_before_open() {
        let mut port = SerialTransport::new(1234);
        let err = port.open("/nonexistent/tty-stroker").unwrap_err();
        assert!(matches!(err, HwError::UnsupportedBaud(1234)));
    }
}
