/*!
 * Services
 * Sample TCP and UDP consumers of the socket layer
 *
 * Each server is a value owned by its caller; dropping it stops it.
 */

mod tcp_server;
mod udp_client;
mod udp_server;

pub use tcp_server::{ServerStats, TcpServer};
pub use udp_client::UdpClient;
pub use udp_server::UdpEchoServer;
