/*!
 * Address Helper Tests
 * Properties of the IPv4 text helpers and the sockaddr wire encoding
 */

use ksocket::net::{inet_addr, inet_ntoa, SOCKADDR_IN6_LEN, SOCKADDR_IN_LEN};
use ksocket::{format_ipv4, parse_ipv4, SocketAddress, SocketError};
use proptest::prelude::*;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV6};

#[test]
fn test_rejects_out_of_range_and_short_forms() {
    assert!(matches!(
        parse_ipv4("256.1.1.1"),
        Err(SocketError::MalformedAddress(_))
    ));
    assert!(matches!(
        parse_ipv4("1.2.3"),
        Err(SocketError::MalformedAddress(_))
    ));
    for bad in ["", "1.2.3.4.5", "1..3.4", " 1.2.3.4", "1.2.3.-4", "+1.2.3.4", "0x1.2.3.4"] {
        assert!(parse_ipv4(bad).is_err(), "{:?} should be rejected", bad);
    }
}

#[test]
fn test_dotted_quad_round_trip() {
    let addr = parse_ipv4("192.168.0.1").unwrap();
    assert_eq!(format_ipv4(addr).unwrap(), "192.168.0.1");
}

#[test]
fn test_inet_addr_is_network_order() {
    let raw = inet_addr("127.0.0.1").unwrap();
    assert_eq!(raw.to_ne_bytes(), [127, 0, 0, 1]);
    assert_eq!(inet_ntoa(raw).unwrap(), "127.0.0.1");
}

#[test]
fn test_sockaddr_in_layout() {
    let addr = SocketAddress::v4(Ipv4Addr::new(10, 0, 0, 7), 0x1234);
    let wire = addr.encode();

    assert_eq!(wire.len(), SOCKADDR_IN_LEN);
    assert_eq!(u16::from_ne_bytes([wire[0], wire[1]]) as i32, libc::AF_INET);
    assert_eq!(&wire[2..4], &[0x12, 0x34]);
    assert_eq!(&wire[4..8], &[10, 0, 0, 7]);
    assert_eq!(&wire[8..], &[0; 8]);
}

#[test]
fn test_decode_rejects_bad_input() {
    assert!(matches!(
        SocketAddress::decode(&[0]),
        Err(SocketError::MalformedAddress(_))
    ));

    let mut wire = SocketAddress::v4(Ipv4Addr::LOCALHOST, 80).encode();
    assert!(SocketAddress::decode(&wire[..SOCKADDR_IN_LEN - 1]).is_err());

    wire[0..2].copy_from_slice(&(libc::AF_UNIX as u16).to_ne_bytes());
    assert!(matches!(
        SocketAddress::decode(&wire),
        Err(SocketError::MalformedAddress(_))
    ));
}

proptest! {
    #[test]
    fn prop_format_then_parse(octets in any::<[u8; 4]>()) {
        let addr = Ipv4Addr::from(octets);
        let text = format_ipv4(addr).unwrap();
        prop_assert_eq!(parse_ipv4(&text).unwrap(), addr);
    }

    #[test]
    fn prop_out_of_range_octet_rejected(
        octets in any::<[u8; 3]>(),
        big in 256u32..1000,
        position in 0usize..4,
    ) {
        let mut parts: Vec<String> = octets.iter().map(|o| o.to_string()).collect();
        parts.insert(position, big.to_string());
        let text = parts.join(".");
        prop_assert!(
            matches!(parse_ipv4(&text), Err(SocketError::MalformedAddress(_))),
            "{} accepted",
            text
        );
    }

    #[test]
    fn prop_wrong_octet_count_rejected(octets in prop::collection::vec(any::<u8>(), 0..8)) {
        prop_assume!(octets.len() != 4);
        let text = octets.iter().map(|o| o.to_string()).collect::<Vec<_>>().join(".");
        prop_assert!(parse_ipv4(&text).is_err());
    }

    #[test]
    fn prop_encode_into_never_overruns(
        ip in any::<[u8; 16]>(),
        port in any::<u16>(),
        v6 in any::<bool>(),
        capacity in 0usize..40,
    ) {
        let addr = if v6 {
            SocketAddress::new(SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::from(ip), port, 0, 0)))
        } else {
            SocketAddress::v4(Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]), port)
        };

        let mut buf = vec![0xAAu8; capacity + 8];
        let len = addr.encode_into(&mut buf[..capacity]);

        let required = if v6 { SOCKADDR_IN6_LEN } else { SOCKADDR_IN_LEN };
        prop_assert_eq!(len.required, required);
        prop_assert_eq!(len.written, required.min(capacity));
        prop_assert!(buf[capacity..].iter().all(|b| *b == 0xAA));
        if !len.truncated() {
            prop_assert_eq!(SocketAddress::decode(&buf[..len.written]).unwrap(), addr);
        }
    }
}
