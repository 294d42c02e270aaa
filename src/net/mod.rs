/*!
 * Address Translation
 * Wire-format socket addresses and IPv4 text helpers
 */

mod address;
mod ipv4;

pub use address::{AddressLen, SocketAddress, SOCKADDR_IN6_LEN, SOCKADDR_IN_LEN, SOCKADDR_MAX_LEN};
pub use ipv4::{format_ipv4, inet_addr, inet_ntoa, parse_ipv4};
