//! Outbound telemetry socket
//!
//! Sends one fixed-layout datagram per aircraft state sample to a
//! single configured target, fire and forget. Send failures are logged
//! and dropped; a telemetry consumer that is not listening must never
//! stall the dispatch loop.

use crate::error::{Error, Result};
use crate::protocol;
use crate::sim::TelemetrySink;
use crate::types::AircraftState;
use std::net::{SocketAddr, UdpSocket};

/// UDP sender for aircraft state samples
pub struct TelemetrySender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl TelemetrySender {
    /// Bind an ephemeral local port for sending to `target`.
    pub fn new(target: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| Error::Other(format!("Failed to bind telemetry socket: {}", e)))?;
        Ok(Self { socket, target })
    }

    /// Configured destination for telemetry datagrams.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl TelemetrySink for TelemetrySender {
    fn publish(&self, state: &AircraftState) {
        let datagram = protocol::encode_state(state);
        match self.socket.send_to(&datagram, self.target) {
            Ok(_) => log::trace!("Telemetry sample sent to {}", self.target),
            Err(e) => log::warn!("Failed to send telemetry to {}: {}", self.target, e),
        }
    }
}
