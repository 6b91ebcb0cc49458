//! udp_tx.rs: UDP transmitter for SPL standard messages
//!
//! Sends each message to the tester port of the simulated team. Send errors are logged
//! and never stop the simulator.

use std::net::{SocketAddr, UdpSocket};

use tracing::{debug, warn};
use whistle_types::SplStandardMessage;

pub struct UdpTransmitter {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransmitter {
    pub fn new(target: SocketAddr) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Returns whether the datagram left the socket.
    pub fn send(&self, message: &SplStandardMessage) -> bool {
        let datagram = message.datagram();
        match self.socket.send_to(datagram, self.target) {
            Ok(sent) => {
                debug!("UDP → {} {sent} bytes (version {})", self.target, message.version);
                true
            }
            Err(e) => {
                warn!("UDP: send to {} failed: {e}", self.target);
                false
            }
        }
    }
}
