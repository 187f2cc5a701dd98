// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! UDP echo responder.
//!
//! The counterpart a probe talks to: every received payload is returned
//! unchanged to the sender's host, and the `"stop"` sentinel shuts the
//! responder down. In a deployed benchmark the responder runs on a separate
//! machine and replies to its own well-known port; `reply_port` exists so a
//! probe and a responder can share one host.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use crate::probe::STOP_PAYLOAD;

pub struct EchoResponder {
    socket: UdpSocket,
    reply_port: u16,
}

impl EchoResponder {
    /// Bind the responder. Port 0 requests an ephemeral port; the reply
    /// port defaults to the port actually bound.
    pub fn bind(port: u16, reply_port: Option<u16>) -> io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        let bound = socket.local_addr()?.port();
        Ok(Self {
            socket,
            reply_port: reply_port.unwrap_or(bound),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serve echoes until the stop sentinel arrives.
    pub fn run(&self) -> io::Result<()> {
        let mut buf = [0u8; 1024];
        let local = self.socket.local_addr()?;
        tracing::info!(addr = %local, reply_port = self.reply_port, "Echo responder listening");

        loop {
            let (len, from) = self.socket.recv_from(&mut buf)?;
            let payload = &buf[..len];

            if payload == STOP_PAYLOAD {
                tracing::info!(%from, "Stop sentinel received, shutting down");
                return Ok(());
            }

            let reply_to = SocketAddr::new(from.ip(), self.reply_port);
            if let Err(e) = self.socket.send_to(payload, reply_to) {
                tracing::warn!(%reply_to, error = %e, "Failed to echo datagram");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_echoes_to_reply_port_and_stops() {
        // The test socket doubles as the sender and the echo destination.
        let client = UdpSocket::bind(("127.0.0.1", 0)).unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let client_port = client.local_addr().unwrap().port();

        let responder = EchoResponder::bind(0, Some(client_port)).unwrap();
        let responder_addr = ("127.0.0.1", responder.local_addr().unwrap().port());

        let handle = std::thread::spawn(move || responder.run());

        client.send_to(b"ping-1", responder_addr).unwrap();
        let mut buf = [0u8; 64];
        let (len, _) = client.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"ping-1");

        client.send_to(STOP_PAYLOAD, responder_addr).unwrap();
        handle.join().unwrap().unwrap();
    }
}
