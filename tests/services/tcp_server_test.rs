/*!
 * TCP Server Tests
 * Sample server lifecycle over loopback
 */

use ksocket::{
    HostStack, MsgFlags, NetworkStack, SocketAddress, SocketConfig, SocketKind, SocketManager,
    TcpServer, TcpServerConfig,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn loopback_config() -> TcpServerConfig {
    TcpServerConfig {
        bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
        ..TcpServerConfig::default()
    }
}

fn send_message(manager: &SocketManager, server: SocketAddress, message: &[u8]) {
    let client = manager.create(SocketKind::tcp_v4()).unwrap();
    manager.connect(client, server).unwrap();
    manager.send(client, message, MsgFlags::empty()).unwrap();
    manager.close(client).unwrap();
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn test_server_receives_messages_and_stops() {
    let stack = HostStack::new();
    let manager = SocketManager::new(Arc::new(stack.clone()), SocketConfig::default());

    let server = TcpServer::start(manager.clone(), loopback_config()).unwrap();
    assert!(server.is_running());
    let addr = server.local_addr();
    assert_ne!(addr.port(), 0);

    send_message(&manager, addr, b"Hello from TCP Client");
    send_message(&manager, addr, b"second");
    assert!(wait_for(|| server.stats().messages == 2));

    let stats = server.stop().unwrap();
    assert_eq!(stats.connections, 2);
    assert_eq!(stats.messages, 2);
    assert_eq!(stats.bytes, 27);

    assert_eq!(manager.stats().live_handles, 0);
    assert!(wait_for(|| stack.open_objects() == 0));
}

#[test]
fn test_independent_servers_in_one_process() {
    let manager = SocketManager::host(SocketConfig::default());

    let first = TcpServer::start(manager.clone(), loopback_config()).unwrap();
    let second = TcpServer::start(manager.clone(), loopback_config()).unwrap();
    assert_ne!(first.local_addr(), second.local_addr());

    send_message(&manager, second.local_addr(), b"only second");
    assert!(wait_for(|| second.stats().messages == 1));
    assert_eq!(first.stats().messages, 0);

    first.stop().unwrap();
    assert_eq!(manager.stats().listening, 1);
    second.stop().unwrap();
    assert_eq!(manager.stats().live_handles, 0);
}

#[test]
fn test_client_closing_silently_is_not_a_message() {
    let manager = SocketManager::host(SocketConfig::default());
    let server = TcpServer::start(manager.clone(), loopback_config()).unwrap();

    let client = manager.create(SocketKind::tcp_v4()).unwrap();
    manager.connect(client, server.local_addr()).unwrap();
    manager.close(client).unwrap();

    assert!(wait_for(|| server.stats().connections == 1));
    let stats = server.stop().unwrap();
    assert_eq!(stats.messages, 0);
}

#[test]
fn test_start_on_taken_port_releases_listener() {
    let manager = SocketManager::host(SocketConfig::default());
    let server = TcpServer::start(manager.clone(), loopback_config()).unwrap();

    let taken = TcpServerConfig {
        bind: server.local_addr().as_socket_addr(),
        ..TcpServerConfig::default()
    };
    // SO_REUSEADDR does not allow two listeners on one port
    assert!(TcpServer::start(manager.clone(), taken).is_err());
    assert_eq!(manager.stats().live_handles, 1);

    drop(server);
    assert_eq!(manager.stats().live_handles, 0);
}
