/*!
 * Handle Lifecycle Tests
 * Creation, release, stale handles, and resource probes
 */

use ksocket::{
    AddressFamily, HostStack, MsgFlags, NetworkStack, Protocol, SocketAddress, SocketConfig,
    SocketError, SocketHandle, SocketKind, SocketManager, SocketState, SocketType,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

fn manager_with_probe() -> (SocketManager, HostStack) {
    let stack = HostStack::new();
    let manager = SocketManager::new(Arc::new(stack.clone()), SocketConfig::default());
    (manager, stack)
}

#[test]
fn test_create_close_leaves_no_residue() {
    let (manager, stack) = manager_with_probe();

    for _ in 0..100 {
        let tcp = manager.create(SocketKind::tcp_v4()).unwrap();
        let udp = manager.create(SocketKind::udp_v4()).unwrap();
        manager.close(tcp).unwrap();
        manager.close(udp).unwrap();
    }

    let stats = manager.stats();
    assert_eq!(stats.live_handles, 0);
    assert_eq!(stats.reserved_slots, 0);
    assert_eq!(stack.open_objects(), 0);
}

#[test]
fn test_create_close_every_kind_leaves_no_residue() {
    let (manager, stack) = manager_with_probe();

    for family in [AddressFamily::Inet, AddressFamily::Inet6] {
        for (socket_type, matching) in [
            (SocketType::Stream, Protocol::Tcp),
            (SocketType::Datagram, Protocol::Udp),
        ] {
            for protocol in [Protocol::Default, matching] {
                let kind = SocketKind::new(family, socket_type, protocol);
                let handle = manager
                    .create(kind)
                    .unwrap_or_else(|e| panic!("create {:?}: {}", kind, e));
                assert_eq!(manager.handle_info(handle).unwrap().kind, kind);
                assert_eq!(stack.open_objects(), 1);

                manager.close(handle).unwrap();
                assert_eq!(stack.open_objects(), 0, "{:?} left an object behind", kind);
            }
        }
    }

    assert_eq!(manager.stats().live_handles, 0);
}

#[test]
fn test_close_twice_reports_invalid_handle() {
    let (manager, _stack) = manager_with_probe();
    let handle = manager.create(SocketKind::tcp_v4()).unwrap();

    assert_eq!(manager.close(handle), Ok(()));
    assert!(matches!(
        manager.close(handle),
        Err(SocketError::InvalidHandle(_))
    ));
}

#[test]
fn test_released_handle_rejected_everywhere() {
    let (manager, _stack) = manager_with_probe();
    let handle = manager.create(SocketKind::udp_v4()).unwrap();
    manager.close(handle).unwrap();

    // the slot is reused, the stale handle must stay dead
    let fresh = manager.create(SocketKind::udp_v4()).unwrap();
    assert_ne!(fresh, handle);

    let mut buf = [0u8; 4];
    let invalid = |r: Result<(), SocketError>| matches!(r, Err(SocketError::InvalidHandle(_)));
    assert!(invalid(manager.bind(handle, SocketAddress::loopback_ephemeral())));
    assert!(invalid(manager.listen(handle, 1)));
    assert!(invalid(manager.shutdown(handle, ksocket::Shutdown::Both)));
    assert!(invalid(manager.send(handle, b"x", MsgFlags::empty()).map(|_| ())));
    assert!(invalid(manager.recv(handle, &mut buf, MsgFlags::empty()).map(|_| ())));
    assert!(invalid(manager.local_addr(handle).map(|_| ())));
    assert!(invalid(manager.handle_info(handle).map(|_| ())));

    assert_eq!(
        manager.handle_info(fresh).unwrap().state,
        SocketState::Created
    );
}

#[test]
fn test_raw_handle_round_trip() {
    let (manager, _stack) = manager_with_probe();
    let handle = manager.create(SocketKind::udp_v4()).unwrap();

    let restored = SocketHandle::from_raw(handle.into_raw());
    assert!(manager.handle_info(restored).is_ok());

    let forged = SocketHandle::from_raw(u64::MAX);
    assert!(matches!(
        manager.close(forged),
        Err(SocketError::InvalidHandle(_))
    ));
}

#[test]
fn test_capacity_from_config() {
    let stack = HostStack::new();
    let manager = SocketManager::new(
        Arc::new(stack.clone()),
        SocketConfig::default().with_max_handles(3),
    );

    let handles: Vec<_> = (0..3)
        .map(|_| manager.create(SocketKind::udp_v4()).unwrap())
        .collect();
    assert!(matches!(
        manager.create(SocketKind::udp_v4()),
        Err(SocketError::AllocationFailed(_))
    ));
    assert_eq!(stack.open_objects(), 3);

    for handle in handles {
        manager.close(handle).unwrap();
    }
    assert_eq!(stack.open_objects(), 0);
}

#[test]
fn test_concurrent_handles_are_independent() {
    let (manager, stack) = manager_with_probe();

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let handle = manager.create(SocketKind::udp_v4()).unwrap();
                    manager
                        .bind(handle, SocketAddress::loopback_ephemeral())
                        .unwrap();
                    assert_eq!(
                        manager.handle_info(handle).unwrap().state,
                        SocketState::Bound
                    );
                    manager.close(handle).unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(manager.stats().live_handles, 0);
    assert_eq!(stack.open_objects(), 0);
}

#[test]
fn test_dropping_manager_releases_objects() {
    let stack = HostStack::new();
    {
        let manager = SocketManager::new(Arc::new(stack.clone()), SocketConfig::default());
        manager.create(SocketKind::tcp_v4()).unwrap();
        manager.create(SocketKind::udp_v4()).unwrap();
        assert_eq!(stack.open_objects(), 2);
    }
    assert_eq!(stack.open_objects(), 0);
}
