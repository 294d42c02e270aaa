/*!
 * Datagram Tests
 * End-to-end UDP over the handle layer
 */

use ksocket::net::SOCKADDR_IN_LEN;
use ksocket::{
    MsgFlags, SocketAddress, SocketConfig, SocketError, SocketHandle, SocketKind, SocketManager,
    SocketState,
};
use pretty_assertions::assert_eq;
use std::net::Ipv4Addr;

fn bound_udp(manager: &SocketManager) -> (SocketHandle, SocketAddress) {
    let handle = manager.create(SocketKind::udp_v4()).unwrap();
    manager
        .bind(handle, SocketAddress::loopback_ephemeral())
        .unwrap();
    let addr = manager.local_addr(handle).unwrap();
    (handle, addr)
}

#[test]
fn test_five_byte_datagram_with_source() {
    let manager = SocketManager::host(SocketConfig::default());
    let (rx, rx_addr) = bound_udp(&manager);
    let (tx, tx_addr) = bound_udp(&manager);

    let sent = manager
        .send_to(tx, b"hello", rx_addr, MsgFlags::empty())
        .unwrap();
    assert_eq!(sent, 5);

    let mut buf = [0u8; 64];
    let (n, from) = manager.recv_from(rx, &mut buf, MsgFlags::empty()).unwrap();
    assert_eq!(n, 5);
    assert_eq!(&buf[..n], b"hello");
    assert_eq!(from, tx_addr);
    assert_eq!(from.ipv4(), Some(Ipv4Addr::LOCALHOST));
}

#[test]
fn test_each_datagram_is_independent() {
    let manager = SocketManager::host(SocketConfig::default());
    let (rx, rx_addr) = bound_udp(&manager);
    let (a, a_addr) = bound_udp(&manager);
    let (b, b_addr) = bound_udp(&manager);

    manager.send_to(a, b"from-a", rx_addr, MsgFlags::empty()).unwrap();
    manager.send_to(b, b"from-b", rx_addr, MsgFlags::empty()).unwrap();

    let (first, first_from) = manager.recv_from_vec(rx, 64, MsgFlags::empty()).unwrap();
    let (second, second_from) = manager.recv_from_vec(rx, 64, MsgFlags::empty()).unwrap();
    assert_eq!(first, b"from-a");
    assert_eq!(first_from, a_addr);
    assert_eq!(second, b"from-b");
    assert_eq!(second_from, b_addr);
}

#[test]
fn test_connected_datagram_socket() {
    let manager = SocketManager::host(SocketConfig::default());
    let (rx, rx_addr) = bound_udp(&manager);
    let (tx, tx_addr) = bound_udp(&manager);

    manager.connect(tx, rx_addr).unwrap();
    assert_eq!(manager.handle_info(tx).unwrap().state, SocketState::Connected);
    assert_eq!(manager.peer_addr(tx).unwrap(), rx_addr);

    manager.send(tx, b"direct", MsgFlags::empty()).unwrap();
    let (data, from) = manager.recv_from_vec(rx, 64, MsgFlags::empty()).unwrap();
    assert_eq!(data, b"direct");
    assert_eq!(from, tx_addr);
}

#[test]
fn test_recv_from_into_writes_wire_address() {
    let manager = SocketManager::host(SocketConfig::default());
    let (rx, rx_addr) = bound_udp(&manager);
    let (tx, tx_addr) = bound_udp(&manager);

    manager.send_to(tx, b"abc", rx_addr, MsgFlags::empty()).unwrap();

    let mut buf = [0u8; 8];
    let mut addr = [0xAAu8; SOCKADDR_IN_LEN + 4];
    let (n, len) = manager
        .recv_from_into(rx, &mut buf, &mut addr[..SOCKADDR_IN_LEN], MsgFlags::empty())
        .unwrap();

    assert_eq!(n, 3);
    assert_eq!(len.written, SOCKADDR_IN_LEN);
    assert!(!len.truncated());
    assert_eq!(SocketAddress::decode(&addr[..len.written]).unwrap(), tx_addr);
    assert_eq!(&addr[SOCKADDR_IN_LEN..], &[0xAA; 4]);
}

#[test]
fn test_datagram_operations_reject_stream_handles() {
    let manager = SocketManager::host(SocketConfig::default());
    let stream = manager.create(SocketKind::tcp_v4()).unwrap();
    let mut buf = [0u8; 8];

    assert!(matches!(
        manager.recv_from(stream, &mut buf, MsgFlags::empty()),
        Err(SocketError::InvalidState(_))
    ));
}

#[test]
fn test_unbound_recv_from_is_not_bound() {
    let manager = SocketManager::host(SocketConfig::default());
    let handle = manager.create(SocketKind::udp_v4()).unwrap();
    let mut buf = [0u8; 8];

    assert_eq!(
        manager.recv_from(handle, &mut buf, MsgFlags::DONTWAIT),
        Err(SocketError::NotBound)
    );
}
