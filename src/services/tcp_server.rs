/*!
 * TCP Server
 * Sample stream server: accept, read one message, close
 *
 * Each server owns its listener and accept thread, so any number of servers can
 * run side by side in one process. `stop` shuts the listener down, which wakes
 * the blocked accept with `SocketError::Shutdown`.
 */

use crate::config::TcpServerConfig;
use crate::core::errors::{SocketError, SocketResult};
use crate::core::option::{OptionValue, SOL_SOCKET, SO_RCVTIMEO, SO_REUSEADDR};
use crate::core::types::{MsgFlags, Protocol, Shutdown, SocketKind, SocketType};
use crate::net::SocketAddress;
use crate::sockets::{SocketHandle, SocketManager};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Snapshot of a running server's counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStats {
    pub local_addr: SocketAddress,
    pub connections: u64,
    pub messages: u64,
    pub bytes: u64,
    pub accept_errors: u64,
}

#[derive(Default)]
struct Counters {
    connections: AtomicU64,
    messages: AtomicU64,
    bytes: AtomicU64,
    accept_errors: AtomicU64,
}

/// Sample TCP server bound to one listener
pub struct TcpServer {
    manager: SocketManager,
    listener: SocketHandle,
    local_addr: SocketAddress,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    thread: Option<JoinHandle<()>>,
}

impl TcpServer {
    /// Bind, listen, and start the accept loop
    pub fn start(manager: SocketManager, config: TcpServerConfig) -> SocketResult<Self> {
        let bind = SocketAddress::from(config.bind);
        let kind = SocketKind::new(bind.family(), SocketType::Stream, Protocol::Tcp);
        let listener = manager.create(kind)?;

        let local_addr = match Self::open_listener(&manager, listener, bind, config.backlog) {
            Ok(addr) => addr,
            Err(e) => {
                error!(addr = %bind, error = %e, "TCP server failed to start");
                let _ = manager.close(listener);
                return Err(e);
            }
        };

        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());

        let thread = {
            let manager = manager.clone();
            let running = Arc::clone(&running);
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name(format!("tcp-accept-{}", local_addr.port()))
                .spawn(move || accept_loop(manager, listener, config, running, counters))
        };

        let thread = match thread {
            Ok(thread) => thread,
            Err(e) => {
                let _ = manager.close(listener);
                return Err(e.into());
            }
        };

        info!(addr = %local_addr, "TCP server listening");
        Ok(Self {
            manager,
            listener,
            local_addr,
            running,
            counters,
            thread: Some(thread),
        })
    }

    fn open_listener(
        manager: &SocketManager,
        listener: SocketHandle,
        bind: SocketAddress,
        backlog: i32,
    ) -> SocketResult<SocketAddress> {
        manager.set_option(listener, SOL_SOCKET, SO_REUSEADDR, &OptionValue::bool(true))?;
        manager.bind(listener, bind)?;
        manager.listen(listener, backlog)?;
        manager.local_addr(listener)
    }

    pub fn local_addr(&self) -> SocketAddress {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            local_addr: self.local_addr,
            connections: self.counters.connections.load(Ordering::Relaxed),
            messages: self.counters.messages.load(Ordering::Relaxed),
            bytes: self.counters.bytes.load(Ordering::Relaxed),
            accept_errors: self.counters.accept_errors.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting, wait for the accept loop, and release the listener
    pub fn stop(mut self) -> SocketResult<ServerStats> {
        self.shutdown_and_join()?;
        let stats = self.stats();
        info!(
            addr = %self.local_addr,
            connections = stats.connections,
            messages = stats.messages,
            "TCP server stopped"
        );
        Ok(stats)
    }

    fn shutdown_and_join(&mut self) -> SocketResult<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        self.running.store(false, Ordering::Release);
        let shutdown = self.manager.shutdown(self.listener, Shutdown::Read);

        if thread.join().is_err() {
            error!(addr = %self.local_addr, "accept thread panicked");
        }
        let closed = self.manager.close(self.listener);
        shutdown.and(closed)
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown_and_join() {
            warn!(addr = %self.local_addr, error = %e, "TCP server cleanup failed");
        }
    }
}

fn accept_loop(
    manager: SocketManager,
    listener: SocketHandle,
    config: TcpServerConfig,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
) {
    while running.load(Ordering::Acquire) {
        match manager.accept(listener, true) {
            Ok((client, peer)) => {
                counters.connections.fetch_add(1, Ordering::Relaxed);
                serve_client(&manager, client, peer, &config, &counters);
            }
            Err(SocketError::Shutdown) | Err(SocketError::InvalidHandle(_)) => break,
            Err(_) if !running.load(Ordering::Acquire) => break,
            Err(e) => {
                counters.accept_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "accept failed, retrying");
                thread::sleep(config.retry_delay);
            }
        }
    }
    debug!("accept loop exited");
}

fn serve_client(
    manager: &SocketManager,
    client: SocketHandle,
    peer: Option<SocketAddress>,
    config: &TcpServerConfig,
    counters: &Counters,
) {
    if let Some(timeout) = config.client_timeout {
        if let Err(e) =
            manager.set_option(client, SOL_SOCKET, SO_RCVTIMEO, &OptionValue::timeout(Some(timeout)))
        {
            debug!(handle = %client, error = %e, "could not set client receive timeout");
        }
    }

    match manager.recv_vec(client, config.recv_buffer, MsgFlags::empty()) {
        Ok(data) if data.is_empty() => {
            debug!(peer = ?peer, "client closed without sending");
        }
        Ok(data) => {
            counters.messages.fetch_add(1, Ordering::Relaxed);
            counters.bytes.fetch_add(data.len() as u64, Ordering::Relaxed);
            info!(
                peer = ?peer,
                bytes = data.len(),
                message = %String::from_utf8_lossy(&data),
                "Received message"
            );
        }
        Err(e) => warn!(peer = ?peer, error = %e, "receive from client failed"),
    }

    if let Err(e) = manager.close(client) {
        warn!(handle = %client, error = %e, "failed to close client");
    }
}
