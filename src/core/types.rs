/*!
 * Core Types
 * Socket families, types, protocols, and per-call flags
 */

use super::errors::{SocketError, SocketResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFamily {
    /// IPv4 (AF_INET)
    Inet,
    /// IPv6 (AF_INET6)
    Inet6,
}

impl AddressFamily {
    /// Translate a raw AF_* constant
    pub fn from_raw(domain: i32) -> SocketResult<Self> {
        match domain {
            libc::AF_INET => Ok(AddressFamily::Inet),
            libc::AF_INET6 => Ok(AddressFamily::Inet6),
            other => Err(SocketError::InvalidArgument(format!(
                "unknown address family {}",
                other
            ))),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            AddressFamily::Inet => libc::AF_INET,
            AddressFamily::Inet6 => libc::AF_INET6,
        }
    }
}

/// Socket type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketType {
    /// Stream socket (TCP)
    Stream,
    /// Datagram socket (UDP)
    Datagram,
}

impl SocketType {
    /// Translate a raw SOCK_* constant, splitting off the SOCK_NONBLOCK bit
    ///
    /// Returns the type and whether non-blocking mode was requested.
    pub fn from_raw(ty: i32) -> SocketResult<(Self, bool)> {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        let (base, nonblocking) = (ty & !libc::SOCK_NONBLOCK, ty & libc::SOCK_NONBLOCK != 0);
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        let (base, nonblocking) = (ty, false);

        match base {
            libc::SOCK_STREAM => Ok((SocketType::Stream, nonblocking)),
            libc::SOCK_DGRAM => Ok((SocketType::Datagram, nonblocking)),
            other => Err(SocketError::InvalidArgument(format!(
                "unknown socket type {}",
                other
            ))),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            SocketType::Stream => libc::SOCK_STREAM,
            SocketType::Datagram => libc::SOCK_DGRAM,
        }
    }
}

/// Transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Let the stack pick the default for the socket type (protocol 0)
    Default,
    Tcp,
    Udp,
}

impl Protocol {
    /// Translate a raw IPPROTO_* constant
    pub fn from_raw(protocol: i32) -> SocketResult<Self> {
        match protocol {
            0 => Ok(Protocol::Default),
            libc::IPPROTO_TCP => Ok(Protocol::Tcp),
            libc::IPPROTO_UDP => Ok(Protocol::Udp),
            other => Err(SocketError::InvalidArgument(format!(
                "unknown protocol {}",
                other
            ))),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Protocol::Default => 0,
            Protocol::Tcp => libc::IPPROTO_TCP,
            Protocol::Udp => libc::IPPROTO_UDP,
        }
    }
}

/// Which direction(s) a shutdown disables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shutdown {
    Read,
    Write,
    Both,
}

impl Shutdown {
    /// Translate a raw SHUT_* constant
    pub fn from_raw(how: i32) -> SocketResult<Self> {
        match how {
            libc::SHUT_RD => Ok(Shutdown::Read),
            libc::SHUT_WR => Ok(Shutdown::Write),
            libc::SHUT_RDWR => Ok(Shutdown::Both),
            other => Err(SocketError::InvalidArgument(format!(
                "unknown shutdown mode {}",
                other
            ))),
        }
    }

    pub fn covers_read(self) -> bool {
        matches!(self, Shutdown::Read | Shutdown::Both)
    }

    pub fn covers_write(self) -> bool {
        matches!(self, Shutdown::Write | Shutdown::Both)
    }
}

impl From<Shutdown> for std::net::Shutdown {
    fn from(how: Shutdown) -> Self {
        match how {
            Shutdown::Read => std::net::Shutdown::Read,
            Shutdown::Write => std::net::Shutdown::Write,
            Shutdown::Both => std::net::Shutdown::Both,
        }
    }
}

bitflags! {
    /// Per-call message flags passed through to the stack (MSG_*)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MsgFlags: i32 {
        const OOB = libc::MSG_OOB;
        const PEEK = libc::MSG_PEEK;
        const DONTROUTE = libc::MSG_DONTROUTE;
        const DONTWAIT = libc::MSG_DONTWAIT;
        const WAITALL = libc::MSG_WAITALL;
        #[cfg(any(target_os = "linux", target_os = "android"))]
        const NOSIGNAL = libc::MSG_NOSIGNAL;
    }
}

impl MsgFlags {
    /// Flags applied to every send so a dead peer surfaces as an error rather than SIGPIPE
    pub fn for_send(self) -> Self {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            self | MsgFlags::NOSIGNAL
        }
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        {
            self
        }
    }
}

/// Identity of a socket: what `create` was asked for, inherited by accepted children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketKind {
    pub family: AddressFamily,
    pub socket_type: SocketType,
    pub protocol: Protocol,
}

impl SocketKind {
    pub fn new(family: AddressFamily, socket_type: SocketType, protocol: Protocol) -> Self {
        Self {
            family,
            socket_type,
            protocol,
        }
    }

    pub fn tcp_v4() -> Self {
        Self::new(AddressFamily::Inet, SocketType::Stream, Protocol::Tcp)
    }

    pub fn udp_v4() -> Self {
        Self::new(AddressFamily::Inet, SocketType::Datagram, Protocol::Udp)
    }

    pub fn is_stream(&self) -> bool {
        self.socket_type == SocketType::Stream
    }

    pub fn is_datagram(&self) -> bool {
        self.socket_type == SocketType::Datagram
    }
}
