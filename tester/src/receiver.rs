//! # receiver
//!
//! UDP listener for one team's whistle reports.
//!
//! A receiver is bound to `base_port + team_number` for the lifetime of one challenge
//! pass and runs as its own Tokio task. Every datagram is validated on its own and the
//! result is forwarded to the session loop over an mpsc channel. Messages in the regular
//! gameplay format are dropped silently; any other rejection is forwarded so the operator
//! sees what the team sent.
//!
//! UDP errors are logged and never end the task. Dropping the receiver stops the task;
//! [`Receiver::close`] additionally waits until the port is free again.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use whistle_types::spl_message::SPL_STANDARD_MESSAGE_SIZE;
use whistle_types::{decode_whistle_report, MessageRejection, WhistleReport};

use crate::roster::MAX_TEAM_NUMBER;

/// Default first port; team `n` listens on `DEFAULT_BASE_PORT + n`
pub const DEFAULT_BASE_PORT: u16 = 10000;

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverEvent {
    Validated(WhistleReport),
    Rejected(MessageRejection),
}

pub struct Receiver {
    port: u16,
    task: JoinHandle<()>,
}

impl Receiver {
    /// Binds the team's port and starts listening.
    ///
    /// # Panics
    /// If `team_number` exceeds [`MAX_TEAM_NUMBER`].
    pub async fn bind(
        team_number: u8,
        base_port: u16,
        events: mpsc::Sender<ReceiverEvent>,
    ) -> io::Result<Self> {
        assert!(
            team_number <= MAX_TEAM_NUMBER,
            "team number {team_number} has no port assigned"
        );
        let port = base_port.checked_add(u16::from(team_number)).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("port {base_port} + {team_number} is out of range"),
            )
        })?;

        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await?;
        let port = socket.local_addr()?.port();
        info!("Listening for team {team_number} on UDP port {port}");

        let task = tokio::spawn(receive_loop(socket, team_number, events));
        Ok(Self { port, task })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stops listening and waits until the port is released.
    pub async fn close(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
        debug!("Closed UDP port {}", self.port);
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ── Receive loop ──────────────────────────────────────────────────────────────

async fn receive_loop(socket: UdpSocket, team_number: u8, events: mpsc::Sender<ReceiverEvent>) {
    // One byte of slack so an oversized datagram is seen as too long instead of truncated
    let mut buf = vec![0u8; SPL_STANDARD_MESSAGE_SIZE + 1];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!("UDP receive error on team {team_number} port: {e}");
                continue;
            }
        };

        let Some(event) = classify(&buf[..len], src, team_number) else {
            continue;
        };
        if events.send(event).await.is_err() {
            debug!("Session loop gone, stopping receiver for team {team_number}");
            return;
        }
    }
}

fn classify(datagram: &[u8], src: SocketAddr, team_number: u8) -> Option<ReceiverEvent> {
    match decode_whistle_report(datagram, team_number) {
        Ok(report) => {
            debug!("Whistle report from {src}: {report:?}");
            Some(ReceiverEvent::Validated(report))
        }
        Err(rejection) if rejection.is_silent() => {
            trace!("Ignoring datagram from {src}: {rejection}");
            None
        }
        Err(rejection) => {
            warn!("Rejected datagram from {src}: {rejection}");
            Some(ReceiverEvent::Rejected(rejection))
        }
    }
}
