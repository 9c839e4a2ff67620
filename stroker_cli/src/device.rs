//! Transport assembly from the `[transport]` config section.

use eyre::Result;
use stroker_config::{TransportCfg, TransportKind};
use stroker_core::transport_error::map_transport_error;
use stroker_core::{TransportHandle, transport_handle};
use stroker_hardware::{SimCounters, SimulatedTransport, UdpTransport};
use stroker_traits::{BoxError, Transport};

pub const SIM_TARGET: &str = "sim";

/// A connected transport ready to hand to the engine.
pub struct Device {
    pub handle: TransportHandle,
    pub target: String,
    pub kind: TransportKind,
    /// Present for the simulated transport only.
    pub sim: Option<SimCounters>,
}

impl Device {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TransportKind::Udp => "udp",
            TransportKind::Serial => "serial",
            TransportKind::Sim => "sim",
        }
    }

    pub fn close(&self) {
        if let Ok(mut t) = self.handle.lock() {
            t.disconnect();
        }
    }
}

/// Typed engine error for a failed connect, with the attempted target as
/// context.
fn link_error(e: &BoxError, what: &str) -> eyre::Report {
    eyre::Report::new(map_transport_error(e.as_ref())).wrap_err(what.to_string())
}

pub fn open(cfg: &TransportCfg, force_sim: bool) -> Result<Device> {
    let kind = if force_sim { TransportKind::Sim } else { cfg.kind };
    match kind {
        TransportKind::Sim => {
            let mut sim = SimulatedTransport::new();
            let counters = sim.counters();
            sim.connect(SIM_TARGET)
                .map_err(|e| link_error(&e, "open sim transport"))?;
            Ok(Device {
                handle: transport_handle(sim),
                target: SIM_TARGET.to_string(),
                kind,
                sim: Some(counters),
            })
        }
        TransportKind::Udp => {
            let target = cfg
                .address
                .clone()
                .ok_or_else(|| eyre::eyre!("transport.address is required for udp"))?;
            let mut udp = UdpTransport::new(cfg.bind.clone());
            udp.connect(&target)
                .map_err(|e| link_error(&e, &format!("open udp transport {target}")))?;
            Ok(Device {
                handle: transport_handle(udp),
                target,
                kind,
                sim: None,
            })
        }
        TransportKind::Serial => open_serial(cfg),
    }
}

#[cfg(all(unix, feature = "serial"))]
fn open_serial(cfg: &TransportCfg) -> Result<Device> {
    use stroker_hardware::SerialTransport;

    let device = cfg
        .device
        .clone()
        .ok_or_else(|| eyre::eyre!("transport.device is required for serial"))?;
    let mut port = SerialTransport::new(cfg.baud);
    port.connect(&device)
        .map_err(|e| link_error(&e, &format!("open serial device {device}")))?;
    Ok(Device {
        handle: transport_handle(port),
        target: device,
        kind: TransportKind::Serial,
        sim: None,
    })
}

#[cfg(not(all(unix, feature = "serial")))]
fn open_serial(cfg: &TransportCfg) -> Result<Device> {
    eyre::bail!(
        "serial transport unavailable in this build (device {:?}); rebuild with --features serial",
        cfg.device
    )
}
