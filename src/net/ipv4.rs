/*!
 * IPv4 Text Helpers
 * Dotted-quad parsing and formatting (inet_addr / inet_ntoa)
 */

use crate::core::errors::{SocketError, SocketResult};
use crate::core::limits::IPV4_TEXT_MAX;
use std::fmt::Write;
use std::net::Ipv4Addr;

/// Parse dotted-quad text into an IPv4 address
///
/// Accepts exactly four dot-separated decimal integers, each in `0..=255`.
/// Signs, whitespace, empty octets and anything else fail with
/// [`SocketError::MalformedAddress`].
pub fn parse_ipv4(text: &str) -> SocketResult<Ipv4Addr> {
    let malformed = |reason: &str| SocketError::MalformedAddress(format!("{:?}: {}", text, reason));

    let mut octets = [0u8; 4];
    let mut parts = text.split('.');

    for (i, octet) in octets.iter_mut().enumerate() {
        let part = parts
            .next()
            .ok_or_else(|| malformed(&format!("expected 4 octets, got {}", i)))?;

        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(&format!("octet {} is not a decimal integer", i + 1)));
        }

        let value: u16 = part
            .parse()
            .map_err(|_| malformed(&format!("octet {} is not a decimal integer", i + 1)))?;
        *octet = u8::try_from(value)
            .map_err(|_| malformed(&format!("octet {} out of range: {}", i + 1, value)))?;
    }

    if parts.next().is_some() {
        return Err(malformed("more than 4 octets"));
    }

    Ok(Ipv4Addr::from(octets))
}

/// Format an IPv4 address as dotted-quad text
///
/// The output buffer is reserved up front through the fallible allocation path;
/// exhaustion surfaces as [`SocketError::AllocationFailed`].
pub fn format_ipv4(addr: Ipv4Addr) -> SocketResult<String> {
    let mut text = String::new();
    text.try_reserve_exact(IPV4_TEXT_MAX)?;

    let [a, b, c, d] = addr.octets();
    write!(text, "{}.{}.{}.{}", a, b, c, d)
        .map_err(|e| SocketError::AllocationFailed(format!("formatting address: {}", e)))?;
    Ok(text)
}

/// Parse dotted-quad text into the network-order `u32` used in `sin_addr`
pub fn inet_addr(text: &str) -> SocketResult<u32> {
    let addr = parse_ipv4(text)?;
    Ok(u32::from_ne_bytes(addr.octets()))
}

/// Format a network-order `sin_addr` value
pub fn inet_ntoa(s_addr: u32) -> SocketResult<String> {
    format_ipv4(Ipv4Addr::from(s_addr.to_ne_bytes()))
}
