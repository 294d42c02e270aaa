/*!
 * Socket Addresses
 * Family-tagged addresses and their sockaddr wire layout
 *
 * The structured form keeps the port and address in host order. The wire form
 * follows the Linux `sockaddr_in` / `sockaddr_in6` layout: a native-endian
 * family tag followed by the port and address in network byte order.
 */

use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::AddressFamily;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

/// Size of an encoded `sockaddr_in`
pub const SOCKADDR_IN_LEN: usize = 16;

/// Size of an encoded `sockaddr_in6`
pub const SOCKADDR_IN6_LEN: usize = 28;

/// Largest encoded address (`sockaddr_storage` is larger, but nothing we emit is)
pub const SOCKADDR_MAX_LEN: usize = SOCKADDR_IN6_LEN;

/// Family-tagged socket address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketAddress(SocketAddr);

/// How much of a caller's address buffer an encode populated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressLen {
    /// Bytes actually written (never more than the buffer)
    pub written: usize,
    /// Bytes the full address needs
    pub required: usize,
}

impl AddressLen {
    /// Whether the caller's buffer was too small for the whole address
    pub fn truncated(&self) -> bool {
        self.written < self.required
    }
}

impl SocketAddress {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn v4(ip: Ipv4Addr, port: u16) -> Self {
        Self(SocketAddr::V4(SocketAddrV4::new(ip, port)))
    }

    /// Loopback with port 0, letting the stack pick an ephemeral port on bind
    pub fn loopback_ephemeral() -> Self {
        Self::v4(Ipv4Addr::LOCALHOST, 0)
    }

    pub fn family(&self) -> AddressFamily {
        match self.0 {
            SocketAddr::V4(_) => AddressFamily::Inet,
            SocketAddr::V6(_) => AddressFamily::Inet6,
        }
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    /// IPv4 address, if this is an IPv4 socket address
    pub fn ipv4(&self) -> Option<Ipv4Addr> {
        match self.0 {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        }
    }

    pub fn as_socket_addr(&self) -> SocketAddr {
        self.0
    }

    /// Length of the wire encoding
    pub fn encoded_len(&self) -> usize {
        match self.0 {
            SocketAddr::V4(_) => SOCKADDR_IN_LEN,
            SocketAddr::V6(_) => SOCKADDR_IN6_LEN,
        }
    }

    /// Encode into the caller's buffer without writing past its end
    pub fn encode_into(&self, out: &mut [u8]) -> AddressLen {
        let mut wire = [0u8; SOCKADDR_MAX_LEN];
        let required = self.encode_full(&mut wire);
        let written = required.min(out.len());
        out[..written].copy_from_slice(&wire[..written]);
        AddressLen { written, required }
    }

    /// Encode into a freshly allocated buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut wire = [0u8; SOCKADDR_MAX_LEN];
        let len = self.encode_full(&mut wire);
        wire[..len].to_vec()
    }

    fn encode_full(&self, wire: &mut [u8; SOCKADDR_MAX_LEN]) -> usize {
        let family = self.family().as_raw() as u16;
        wire[0..2].copy_from_slice(&family.to_ne_bytes());
        wire[2..4].copy_from_slice(&self.port().to_be_bytes());

        match self.0 {
            SocketAddr::V4(v4) => {
                wire[4..8].copy_from_slice(&v4.ip().octets());
                // sin_zero stays zeroed
                SOCKADDR_IN_LEN
            }
            SocketAddr::V6(v6) => {
                wire[4..8].copy_from_slice(&v6.flowinfo().to_be_bytes());
                wire[8..24].copy_from_slice(&v6.ip().octets());
                wire[24..28].copy_from_slice(&v6.scope_id().to_ne_bytes());
                SOCKADDR_IN6_LEN
            }
        }
    }

    /// Decode a wire address, validating the family tag and length
    pub fn decode(bytes: &[u8]) -> SocketResult<Self> {
        if bytes.len() < 2 {
            return Err(SocketError::MalformedAddress(format!(
                "address buffer of {} bytes has no family tag",
                bytes.len()
            )));
        }

        let family = u16::from_ne_bytes([bytes[0], bytes[1]]) as i32;
        let family = AddressFamily::from_raw(family)
            .map_err(|_| SocketError::MalformedAddress(format!("unknown family tag {}", family)))?;

        let needed = match family {
            AddressFamily::Inet => SOCKADDR_IN_LEN,
            AddressFamily::Inet6 => SOCKADDR_IN6_LEN,
        };
        if bytes.len() < needed {
            return Err(SocketError::MalformedAddress(format!(
                "{:?} address needs {} bytes, got {}",
                family,
                needed,
                bytes.len()
            )));
        }

        let port = u16::from_be_bytes([bytes[2], bytes[3]]);
        let addr = match family {
            AddressFamily::Inet => {
                let ip = Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]);
                SocketAddr::V4(SocketAddrV4::new(ip, port))
            }
            AddressFamily::Inet6 => {
                let flowinfo = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&bytes[8..24]);
                let scope_id = u32::from_ne_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
                SocketAddr::V6(SocketAddrV6::new(
                    Ipv6Addr::from(octets),
                    port,
                    flowinfo,
                    scope_id,
                ))
            }
        };

        Ok(Self(addr))
    }
}

impl From<SocketAddr> for SocketAddress {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl From<SocketAddrV4> for SocketAddress {
    fn from(addr: SocketAddrV4) -> Self {
        Self(SocketAddr::V4(addr))
    }
}

impl From<SocketAddress> for SocketAddr {
    fn from(addr: SocketAddress) -> Self {
        addr.0
    }
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
