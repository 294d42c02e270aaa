/*!
 * UDP Client
 * Sample request/reply client: one datagram out, first reply back
 */

use crate::config::UdpClientConfig;
use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::{MsgFlags, Protocol, SocketKind, SocketType};
use crate::net::SocketAddress;
use crate::sockets::{SocketHandle, SocketManager};
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// Sample UDP client
pub struct UdpClient;

impl UdpClient {
    /// Send `message` to the configured server and wait for one reply
    ///
    /// The reply is polled without blocking until the configured timeout, which
    /// surfaces as `SocketError::Timeout`.
    pub fn request(
        manager: &SocketManager,
        config: &UdpClientConfig,
        message: &[u8],
    ) -> SocketResult<(Vec<u8>, SocketAddress)> {
        let server = SocketAddress::from(config.server);
        let kind = SocketKind::new(server.family(), SocketType::Datagram, Protocol::Udp);
        let socket = manager.create(kind)?;

        let result = Self::exchange(manager, socket, server, config, message);
        let closed = manager.close(socket);
        let reply = result?;
        closed?;
        Ok(reply)
    }

    fn exchange(
        manager: &SocketManager,
        socket: SocketHandle,
        server: SocketAddress,
        config: &UdpClientConfig,
        message: &[u8],
    ) -> SocketResult<(Vec<u8>, SocketAddress)> {
        let sent = manager.send_to(socket, message, server, MsgFlags::empty())?;
        info!(server = %server, bytes = sent, "Sent request");

        let deadline = Instant::now() + config.timeout;
        loop {
            match manager.recv_from_vec(socket, config.recv_buffer, MsgFlags::DONTWAIT) {
                Ok((reply, from)) => {
                    info!(
                        from = %from,
                        bytes = reply.len(),
                        message = %String::from_utf8_lossy(&reply),
                        "Received reply"
                    );
                    return Ok((reply, from));
                }
                Err(SocketError::WouldBlock) | Err(SocketError::Interrupted) => {}
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(server = %server, "no reply before timeout");
                return Err(SocketError::Timeout(format!(
                    "no reply from {} within {:?}",
                    server, config.timeout
                )));
            }
            thread::sleep(config.poll_interval.min(deadline - now));
        }
    }
}
