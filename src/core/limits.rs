/*!
 * Socket Limits and Constants
 *
 * Centralized location for socket-layer limits, defaults, and sample-service
 * parameters.
 *
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 * - Values that bound resource usage are marked with [RESOURCE]
 */

use std::time::Duration;

// =============================================================================
// HANDLE TABLE
// =============================================================================

/// Default handle-table capacity
/// [RESOURCE] create/accept fail with AllocationFailed past this
pub const DEFAULT_MAX_HANDLES: usize = 1024;

/// Initial slot capacity reserved by a new table
pub const INITIAL_HANDLE_SLOTS: usize = 64;

// =============================================================================
// LISTEN BACKLOG
// =============================================================================

/// Maximum pending-connection backlog
/// [LINUX-COMPAT] net.core.somaxconn default since 5.4
#[cfg(target_os = "linux")]
pub const SOMAXCONN: i32 = 4096;

/// Maximum pending-connection backlog
#[cfg(not(target_os = "linux"))]
pub const SOMAXCONN: i32 = 128;

// =============================================================================
// ADDRESS TEXT
// =============================================================================

/// Longest dotted-quad text ("255.255.255.255")
pub const IPV4_TEXT_MAX: usize = 15;

// =============================================================================
// SAMPLE SERVICES
// =============================================================================

/// TCP sample server port
pub const TCP_SERVER_PORT: u16 = 12345;

/// TCP sample server backlog
pub const TCP_SERVER_BACKLOG: i32 = 5;

/// TCP sample server receive buffer
pub const TCP_RECV_BUFFER: usize = 1024;

/// Back-off after a transient accept failure
pub const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// UDP sample server port
pub const UDP_SERVER_PORT: u16 = 4444;

/// UDP sample receive buffer
pub const UDP_RECV_BUFFER: usize = 256;

/// Reply sent by the UDP sample server
pub const UDP_ACK_MESSAGE: &str = "ACK from UDP Server";

/// How often the UDP server wakes to check for a stop request
pub const UDP_SERVER_POLL: Duration = Duration::from_millis(100);

/// UDP client reply timeout
pub const UDP_CLIENT_TIMEOUT: Duration = Duration::from_secs(2);

/// UDP client poll interval while waiting for a reply
pub const UDP_CLIENT_POLL: Duration = Duration::from_millis(50);

// =============================================================================
// MONITORING
// =============================================================================

/// Operations slower than this log a warning
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(100);
