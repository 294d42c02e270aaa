/*!
 * Socket Option Values
 * Level routing and the value-blob encodings shared by callers and stacks
 *
 * Value blobs:
 * - integers and booleans: 4-byte native-endian `i32`
 * - SO_LINGER: 8 bytes, `i32` on/off followed by `i32` seconds
 * - SO_RCVTIMEO / SO_SNDTIMEO: 8-byte native-endian `u64` milliseconds, 0 = none
 */

use super::errors::{SocketError, SocketResult};
use std::time::Duration;

pub use libc::{
    IPPROTO_IP, IPPROTO_IPV6, IPPROTO_TCP, IPV6_V6ONLY, IP_TTL, SOL_SOCKET, SO_BROADCAST,
    SO_ERROR, SO_KEEPALIVE, SO_LINGER, SO_RCVBUF, SO_RCVTIMEO, SO_REUSEADDR, SO_SNDBUF,
    SO_SNDTIMEO, SO_TYPE, TCP_NODELAY,
};

/// Where an option is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionLevel {
    /// Generic socket level (SOL_SOCKET)
    Socket,
    /// Protocol-specific level (IPPROTO_*)
    Protocol(i32),
}

impl OptionLevel {
    pub fn from_raw(level: i32) -> Self {
        if level == SOL_SOCKET {
            OptionLevel::Socket
        } else {
            OptionLevel::Protocol(level)
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            OptionLevel::Socket => SOL_SOCKET,
            OptionLevel::Protocol(level) => level,
        }
    }
}

/// Direction of an option access, used when asking a stack for a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionAccess {
    Get,
    Set,
}

/// Encoders and decoders for option value blobs
pub struct OptionValue;

impl OptionValue {
    pub fn int(value: i32) -> Vec<u8> {
        value.to_ne_bytes().to_vec()
    }

    pub fn bool(value: bool) -> Vec<u8> {
        Self::int(value as i32)
    }

    pub fn timeout(value: Option<Duration>) -> Vec<u8> {
        let millis = value.map(|d| d.as_millis().max(1) as u64).unwrap_or(0);
        millis.to_ne_bytes().to_vec()
    }

    pub fn linger(value: Option<Duration>) -> Vec<u8> {
        let (onoff, secs) = match value {
            Some(d) => (1i32, d.as_secs().min(i32::MAX as u64) as i32),
            None => (0, 0),
        };
        let mut blob = Vec::with_capacity(8);
        blob.extend_from_slice(&onoff.to_ne_bytes());
        blob.extend_from_slice(&secs.to_ne_bytes());
        blob
    }

    pub fn parse_int(blob: &[u8]) -> SocketResult<i32> {
        let bytes: [u8; 4] = blob.try_into().map_err(|_| {
            SocketError::InvalidArgument(format!("integer option needs 4 bytes, got {}", blob.len()))
        })?;
        Ok(i32::from_ne_bytes(bytes))
    }

    pub fn parse_bool(blob: &[u8]) -> SocketResult<bool> {
        Ok(Self::parse_int(blob)? != 0)
    }

    /// Non-negative integer, e.g. a buffer size
    pub fn parse_size(blob: &[u8]) -> SocketResult<usize> {
        let value = Self::parse_int(blob)?;
        usize::try_from(value)
            .map_err(|_| SocketError::InvalidArgument(format!("negative size {}", value)))
    }

    pub fn parse_timeout(blob: &[u8]) -> SocketResult<Option<Duration>> {
        let bytes: [u8; 8] = blob.try_into().map_err(|_| {
            SocketError::InvalidArgument(format!("timeout option needs 8 bytes, got {}", blob.len()))
        })?;
        match u64::from_ne_bytes(bytes) {
            0 => Ok(None),
            millis => Ok(Some(Duration::from_millis(millis))),
        }
    }

    pub fn parse_linger(blob: &[u8]) -> SocketResult<Option<Duration>> {
        if blob.len() != 8 {
            return Err(SocketError::InvalidArgument(format!(
                "linger option needs 8 bytes, got {}",
                blob.len()
            )));
        }
        let onoff = Self::parse_int(&blob[..4])?;
        let secs = Self::parse_int(&blob[4..])?;
        if onoff == 0 {
            return Ok(None);
        }
        let secs = u64::try_from(secs)
            .map_err(|_| SocketError::InvalidArgument(format!("negative linger {}", secs)))?;
        Ok(Some(Duration::from_secs(secs)))
    }
}
