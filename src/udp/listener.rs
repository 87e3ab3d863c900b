//! Inbound command socket
//!
//! Binds the well-known command port and feeds every datagram through
//! [`protocol::parse`] to a [`CommandHandler`]. One datagram is one
//! command; there is no framing, no fragmentation handling and no
//! reply channel. A malformed datagram is logged and dropped without
//! disturbing the stream.
//!
//! The loop uses a 500ms read timeout so the running flag is checked
//! periodically; clearing the flag stops the listener within one
//! timeout period.

use crate::error::{Error, Result};
use crate::protocol::{self, Command};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Read timeout so the loop can notice a shutdown request
const RECV_TIMEOUT_MS: u64 = 500;

/// Largest payload a single datagram can carry. Remove commands can
/// list thousands of ids, so the buffer covers the full datagram space
/// rather than a typical command size.
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Consumer of parsed indicator commands
pub trait CommandHandler: Send + Sync {
    fn handle_command(&self, command: Command);
}

/// UDP listener that dispatches indicator commands
pub struct CommandListener {
    socket: UdpSocket,
    handler: Box<dyn CommandHandler>,
    /// Global running flag (daemon shutdown)
    running: Arc<AtomicBool>,
    /// Reusable receive buffer (avoids allocation per datagram)
    recv_buffer: Vec<u8>,
}

impl CommandListener {
    /// Bind the command port on all interfaces.
    pub fn bind(
        port: u16,
        handler: Box<dyn CommandHandler>,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .map_err(|e| Error::Other(format!("Failed to bind command port {}: {}", port, e)))?;
        socket.set_read_timeout(Some(Duration::from_millis(RECV_TIMEOUT_MS)))?;

        Ok(Self {
            socket,
            handler,
            running,
            recv_buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    /// Address the socket actually bound (port 0 resolves here).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive and dispatch datagrams until the running flag clears.
    pub fn run(&mut self) {
        if let Ok(addr) = self.socket.local_addr() {
            log::info!("Listening for indicator commands on udp://{}", addr);
        }

        while self.running.load(Ordering::Relaxed) {
            let (len, peer) = match self.socket.recv_from(&mut self.recv_buffer) {
                Ok(received) => received,
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    log::error!("Command socket receive failed: {}", e);
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                }
            };

            match protocol::parse(&self.recv_buffer[..len]) {
                Ok(command) => {
                    log::debug!("Command from {}: {:?}", peer, command);
                    self.handler.handle_command(command);
                }
                Err(e) => {
                    log::warn!(
                        "Dropping invalid {}-byte datagram from {}: {}",
                        len,
                        peer,
                        e
                    );
                }
            }
        }

        log::info!("Command listener stopped");
    }
}
