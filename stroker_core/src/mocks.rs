//! Test and helper transports for stroker_core.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stroker_traits::{BoxError, Transport};

/// Records every line it is sent. Clones share the same log, so a test can
/// keep one clone and hand the other to the engine.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    lines: Arc<Mutex<Vec<String>>>,
    connected: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Already connected, for tests that skip `connect`.
    pub fn connected() -> Self {
        let t = Self::new();
        t.connected.store(true, Ordering::Relaxed);
        t
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn take_lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|mut l| std::mem::take(&mut *l))
            .unwrap_or_default()
    }

    /// Simulate the link dropping underneath the engine.
    pub fn drop_link(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }
}

impl Transport for RecordingTransport {
    fn connect(&mut self, _target: &str) -> Result<(), BoxError> {
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        if !self.connected.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "recording transport not connected",
            )));
        }
        if let Ok(mut l) = self.lines.lock() {
            l.push(String::from_utf8_lossy(bytes).into_owned());
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Accepts `ok_sends` lines, then fails every send.
#[derive(Debug, Default)]
pub struct FailingTransport {
    ok_sends: usize,
    sent: AtomicUsize,
}

impl FailingTransport {
    pub fn after(ok_sends: usize) -> Self {
        Self {
            ok_sends,
            sent: AtomicUsize::new(0),
        }
    }
}

impl Transport for FailingTransport {
    fn connect(&mut self, _target: &str) -> Result<(), BoxError> {
        Ok(())
    }

    fn send(&mut self, _bytes: &[u8]) -> Result<(), BoxError> {
        if self.sent.fetch_add(1, Ordering::Relaxed) >= self.ok_sends {
            return Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "link dropped",
            )));
        }
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn is_connected(&self) -> bool {
        true
    }
}

/// Swallows everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn connect(&mut self, _target: &str) -> Result<(), BoxError> {
        Ok(())
    }

    fn send(&mut self, _bytes: &[u8]) -> Result<(), BoxError> {
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn is_connected(&self) -> bool {
        true
    }
}
