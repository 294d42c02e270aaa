/*!
 * UDP Echo Server
 * Sample datagram server replying to every datagram with a fixed acknowledgement
 */

use crate::config::UdpServerConfig;
use crate::core::errors::SocketResult;
use crate::core::option::{OptionValue, SOL_SOCKET, SO_RCVTIMEO};
use crate::core::types::{MsgFlags, Protocol, SocketKind, SocketType};
use crate::net::SocketAddress;
use crate::sockets::{SocketHandle, SocketManager};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Sample UDP server bound to one socket
pub struct UdpEchoServer {
    manager: SocketManager,
    socket: SocketHandle,
    local_addr: SocketAddress,
    running: Arc<AtomicBool>,
    replies: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl UdpEchoServer {
    pub fn start(manager: SocketManager, config: UdpServerConfig) -> SocketResult<Self> {
        let bind = SocketAddress::from(config.bind);
        let kind = SocketKind::new(bind.family(), SocketType::Datagram, Protocol::Udp);
        let socket = manager.create(kind)?;

        let opened = manager
            .set_option(
                socket,
                SOL_SOCKET,
                SO_RCVTIMEO,
                &OptionValue::timeout(Some(config.poll_interval)),
            )
            .and_then(|_| manager.bind(socket, bind))
            .and_then(|_| manager.local_addr(socket));
        let local_addr = match opened {
            Ok(addr) => addr,
            Err(e) => {
                error!(addr = %bind, error = %e, "UDP server failed to start");
                let _ = manager.close(socket);
                return Err(e);
            }
        };

        let running = Arc::new(AtomicBool::new(true));
        let replies = Arc::new(AtomicU64::new(0));

        let spawned = {
            let manager = manager.clone();
            let running = Arc::clone(&running);
            let replies = Arc::clone(&replies);
            thread::Builder::new()
                .name(format!("udp-echo-{}", local_addr.port()))
                .spawn(move || receive_loop(manager, socket, config, running, replies))
        };
        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                let _ = manager.close(socket);
                return Err(e.into());
            }
        };

        info!(addr = %local_addr, "UDP server listening");
        Ok(Self {
            manager,
            socket,
            local_addr,
            running,
            replies,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddress {
        self.local_addr
    }

    /// Number of acknowledgements sent so far
    pub fn replies(&self) -> u64 {
        self.replies.load(Ordering::Relaxed)
    }

    /// Stop the receive loop and release the socket
    pub fn stop(mut self) -> SocketResult<u64> {
        self.stop_and_join()?;
        info!(addr = %self.local_addr, replies = self.replies(), "UDP server stopped");
        Ok(self.replies())
    }

    fn stop_and_join(&mut self) -> SocketResult<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.running.store(false, Ordering::Release);
        if thread.join().is_err() {
            error!(addr = %self.local_addr, "receive thread panicked");
        }
        self.manager.close(self.socket)
    }
}

impl Drop for UdpEchoServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop_and_join() {
            warn!(addr = %self.local_addr, error = %e, "UDP server cleanup failed");
        }
    }
}

fn receive_loop(
    manager: SocketManager,
    socket: SocketHandle,
    config: UdpServerConfig,
    running: Arc<AtomicBool>,
    replies: Arc<AtomicU64>,
) {
    while running.load(Ordering::Acquire) {
        let (data, from) = match manager.recv_from_vec(socket, config.recv_buffer, MsgFlags::empty())
        {
            Ok(received) => received,
            Err(e) if e.is_transient() => continue,
            Err(e) => {
                warn!(error = %e, "UDP receive failed");
                break;
            }
        };

        info!(
            from = %from,
            bytes = data.len(),
            message = %String::from_utf8_lossy(&data),
            "Received datagram"
        );

        match manager.send_to(socket, config.reply.as_bytes(), from, MsgFlags::empty()) {
            Ok(_) => {
                replies.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => warn!(to = %from, error = %e, "failed to send acknowledgement"),
        }
    }
    debug!("receive loop exited");
}
