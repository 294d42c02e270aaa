/*!
 * Cancellation Tests
 * Blocked calls woken by shutdown or close from another thread
 */

use ksocket::{
    MsgFlags, Shutdown, SocketAddress, SocketConfig, SocketError, SocketKind, SocketManager,
};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const WAKE_TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(100);

/// Run `blocked` on a thread, cancel it with `cancel`, and return what it saw
fn run_cancelled<T: Send + 'static>(
    blocked: impl FnOnce() -> T + Send + 'static,
    cancel: impl FnOnce(),
) -> T {
    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let _ = tx.send(blocked());
    });

    thread::sleep(SETTLE);
    cancel();

    let outcome = rx
        .recv_timeout(WAKE_TIMEOUT)
        .expect("blocked call was not woken");
    worker.join().unwrap();
    outcome
}

#[test]
fn test_shutdown_wakes_blocked_accept() {
    let manager = SocketManager::host(SocketConfig::default());
    let listener = manager.create(SocketKind::tcp_v4()).unwrap();
    manager
        .bind(listener, SocketAddress::loopback_ephemeral())
        .unwrap();
    manager.listen(listener, 4).unwrap();

    let outcome = {
        let worker_manager = manager.clone();
        run_cancelled(
            move || worker_manager.accept(listener, false),
            || manager.shutdown(listener, Shutdown::Read).unwrap(),
        )
    };

    assert_eq!(outcome, Err(SocketError::Shutdown));
    assert_eq!(manager.stats().live_handles, 1);
    assert_eq!(manager.stats().reserved_slots, 0);
    assert_eq!(manager.accept(listener, false), Err(SocketError::Shutdown));
    manager.close(listener).unwrap();
}

#[test]
fn test_shutdown_wakes_blocked_stream_recv() {
    let manager = SocketManager::host(SocketConfig::default());
    let listener = manager.create(SocketKind::tcp_v4()).unwrap();
    manager
        .bind(listener, SocketAddress::loopback_ephemeral())
        .unwrap();
    manager.listen(listener, 4).unwrap();
    let addr = manager.local_addr(listener).unwrap();

    let client = manager.create(SocketKind::tcp_v4()).unwrap();
    manager.connect(client, addr).unwrap();
    let (_server, _) = manager.accept(listener, false).unwrap();

    let outcome = {
        let worker_manager = manager.clone();
        run_cancelled(
            move || {
                let mut buf = [0u8; 16];
                worker_manager.recv(client, &mut buf, MsgFlags::empty())
            },
            || manager.shutdown(client, Shutdown::Read).unwrap(),
        )
    };

    assert_eq!(outcome, Err(SocketError::Shutdown));
    // the write direction is untouched
    assert!(manager.send(client, b"still open", MsgFlags::empty()).is_ok());
}

#[test]
fn test_shutdown_wakes_blocked_recv_from() {
    let manager = SocketManager::host(SocketConfig::default());
    let socket = manager.create(SocketKind::udp_v4()).unwrap();
    manager
        .bind(socket, SocketAddress::loopback_ephemeral())
        .unwrap();

    let outcome = {
        let worker_manager = manager.clone();
        run_cancelled(
            move || {
                let mut buf = [0u8; 16];
                worker_manager.recv_from(socket, &mut buf, MsgFlags::empty())
            },
            || manager.shutdown(socket, Shutdown::Both).unwrap(),
        )
    };

    assert_eq!(outcome, Err(SocketError::Shutdown));
}

#[test]
fn test_close_wakes_blocked_recv_from() {
    let manager = SocketManager::host(SocketConfig::default());
    let socket = manager.create(SocketKind::udp_v4()).unwrap();
    manager
        .bind(socket, SocketAddress::loopback_ephemeral())
        .unwrap();

    let outcome = {
        let worker_manager = manager.clone();
        run_cancelled(
            move || {
                let mut buf = [0u8; 16];
                worker_manager.recv_from(socket, &mut buf, MsgFlags::empty())
            },
            || manager.close(socket).unwrap(),
        )
    };

    assert!(matches!(
        outcome,
        Err(SocketError::Shutdown) | Err(SocketError::InvalidHandle(_))
    ));
    assert_eq!(manager.stats().live_handles, 0);
    assert_eq!(manager.open_objects(), 0);
}
