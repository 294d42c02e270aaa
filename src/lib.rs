/*!
 * ksocket Library
 * BSD-style socket API over an in-process network stack
 */

pub mod config;
pub mod core;
pub mod monitoring;
pub mod net;
pub mod services;
pub mod sockets;
pub mod stack;

mod shim;

// Re-exports
pub use config::{ConfigError, SocketConfig, TcpServerConfig, UdpClientConfig, UdpServerConfig};
pub use crate::core::{
    AddressFamily, MsgFlags, OptionValue, Protocol, Shutdown, SocketError, SocketKind,
    SocketResult, SocketType,
};
pub use monitoring::init_tracing;
pub use net::{format_ipv4, parse_ipv4, AddressLen, SocketAddress};
pub use services::{ServerStats, TcpServer, UdpClient, UdpEchoServer};
pub use sockets::{HandleInfo, SocketHandle, SocketManager, SocketState, SocketStats};
pub use stack::{HostStack, NetworkStack, StackSocket};
