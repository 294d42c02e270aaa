/*!
 * UDP Service Tests
 * Echo server and request/reply client over loopback
 */

use ksocket::{
    SocketAddress, SocketConfig, SocketError, SocketKind, SocketManager, UdpClient,
    UdpClientConfig, UdpEchoServer, UdpServerConfig,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

fn loopback_server(manager: &SocketManager) -> UdpEchoServer {
    let config = UdpServerConfig {
        bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        ..UdpServerConfig::default()
    };
    UdpEchoServer::start(manager.clone(), config).unwrap()
}

#[test]
fn test_request_gets_acknowledgement() {
    let manager = SocketManager::host(SocketConfig::default());
    let server = loopback_server(&manager);

    let config = UdpClientConfig {
        server: server.local_addr().as_socket_addr(),
        ..UdpClientConfig::default()
    };
    let (reply, from) = UdpClient::request(&manager, &config, b"Hello from UDP Client").unwrap();

    assert_eq!(reply, b"ACK from UDP Server");
    assert_eq!(from, server.local_addr());

    // the client released its handle
    assert_eq!(manager.stats().live_handles, 1);
    assert_eq!(server.stop().unwrap(), 1);
    assert_eq!(manager.stats().live_handles, 0);
}

#[test]
fn test_custom_reply() {
    let manager = SocketManager::host(SocketConfig::default());
    let server = UdpEchoServer::start(
        manager.clone(),
        UdpServerConfig {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            reply: "pong".into(),
            ..UdpServerConfig::default()
        },
    )
    .unwrap();

    let config = UdpClientConfig {
        server: server.local_addr().as_socket_addr(),
        ..UdpClientConfig::default()
    };
    let (reply, _) = UdpClient::request(&manager, &config, b"ping").unwrap();
    assert_eq!(reply, b"pong");
}

#[test]
fn test_request_times_out_without_server() {
    let manager = SocketManager::host(SocketConfig::default());

    // a bound socket that never answers
    let silent = manager.create(SocketKind::udp_v4()).unwrap();
    manager
        .bind(silent, SocketAddress::loopback_ephemeral())
        .unwrap();

    let config = UdpClientConfig {
        server: manager.local_addr(silent).unwrap().as_socket_addr(),
        timeout: Duration::from_millis(200),
        ..UdpClientConfig::default()
    };

    let start = Instant::now();
    let result = UdpClient::request(&manager, &config, b"anyone?");
    assert!(matches!(result, Err(SocketError::Timeout(_))));
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert!(start.elapsed() < Duration::from_secs(2));

    assert_eq!(manager.stats().live_handles, 1);
}

#[test]
fn test_stop_is_prompt() {
    let manager = SocketManager::host(SocketConfig::default());
    let server = loopback_server(&manager);

    let start = Instant::now();
    assert_eq!(server.stop().unwrap(), 0);
    assert!(start.elapsed() < Duration::from_secs(1));
}
