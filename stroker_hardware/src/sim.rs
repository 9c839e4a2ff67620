//! Transport that accepts every line and reports it through `tracing`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stroker_traits::{BoxError, Transport};

use crate::error::HwError;

#[derive(Debug, Default)]
pub struct SimulatedTransport {
    target: Option<String>,
    lines: Arc<AtomicU64>,
    bytes: Arc<AtomicU64>,
}

/// Counters that stay readable after the transport moves into the engine.
#[derive(Debug, Clone)]
pub struct SimCounters {
    lines: Arc<AtomicU64>,
    bytes: Arc<AtomicU64>,
}

impl SimCounters {
    pub fn lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> SimCounters {
        SimCounters {
            lines: Arc::clone(&self.lines),
            bytes: Arc::clone(&self.bytes),
        }
    }
}

impl Transport for SimulatedTransport {
    fn connect(&mut self, target: &str) -> Result<(), BoxError> {
        tracing::debug!(target, "sim transport connected");
        self.target = Some(target.to_string());
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        if self.target.is_none() {
            return Err(Box::new(HwError::NotConnected));
        }
        let line = std::str::from_utf8(bytes).unwrap_or("<binary>");
        tracing::trace!(line = line.trim_end(), "sim send");
        self.lines.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.target = None;
    }

    fn is_connected(&self) -> bool {
        self.target.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_while_connected() {
        let mut sim = SimulatedTransport::new();
        let counters = sim.counters();
        assert!(sim.send(b"L0500I10\n").is_err());

        sim.connect("sim").unwrap();
        sim.send(b"L0500I10\n").unwrap();
        sim.send(b"R0500I10\n").unwrap();
        assert_eq!(counters.lines(), 2);
        assert_eq!(counters.bytes(), 18);

        sim.disconnect();
        assert!(!sim.is_connected());
    }
}
