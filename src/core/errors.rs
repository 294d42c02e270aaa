/*!
 * Error Types
 * Typed socket errors with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result alias used by every socket operation
pub type SocketResult<T> = Result<T, SocketError>;

/// Socket-layer errors
///
/// Every failing operation returns one of these; the underlying stack's failure
/// class is preserved where the taxonomy has a matching variant and passed through
/// as [`SocketError::Unspecified`] otherwise.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SocketError {
    #[error("Allocation failed: {0}")]
    #[diagnostic(
        code(socket::allocation_failed),
        help("The stack refused to create the socket or the handle table is full. Close unused handles or check the family/type/protocol combination.")
    )]
    AllocationFailed(String),

    #[error("Invalid handle: {0}")]
    #[diagnostic(
        code(socket::invalid_handle),
        help("The handle was already closed or never existed.")
    )]
    InvalidHandle(String),

    #[error("Invalid socket state: {0}")]
    #[diagnostic(
        code(socket::invalid_state),
        help("Operation cannot be performed in the handle's current state.")
    )]
    InvalidState(String),

    #[error("Address already in use: {0}")]
    #[diagnostic(
        code(socket::address_in_use),
        help("Another socket is bound to this address. Consider SO_REUSEADDR.")
    )]
    AddressInUse(String),

    #[error("Address not available: {0}")]
    #[diagnostic(code(socket::address_unavailable))]
    AddressUnavailable(String),

    #[error("Connection refused: {0}")]
    #[diagnostic(
        code(socket::connection_refused),
        help("Nothing is listening at the destination.")
    )]
    ConnectionRefused(String),

    #[error("Operation timed out: {0}")]
    #[diagnostic(code(socket::timeout))]
    Timeout(String),

    #[error("Destination unreachable: {0}")]
    #[diagnostic(code(socket::unreachable))]
    Unreachable(String),

    #[error("Operation would block")]
    #[diagnostic(
        code(socket::would_block),
        help("The handle is in non-blocking mode and no data, connection, or buffer space is available yet.")
    )]
    WouldBlock,

    #[error("Operation interrupted")]
    #[diagnostic(code(socket::interrupted))]
    Interrupted,

    #[error("Socket is not bound")]
    #[diagnostic(code(socket::not_bound))]
    NotBound,

    #[error("Socket is not connected")]
    #[diagnostic(code(socket::not_connected))]
    NotConnected,

    #[error("Socket has been shut down")]
    #[diagnostic(
        code(socket::shutdown),
        help("A local shutdown cancelled the operation.")
    )]
    Shutdown,

    #[error("Unsupported option: level={level}, name={name}")]
    #[diagnostic(
        code(socket::unsupported_option),
        help("The underlying stack has no handler for this (level, name) pair.")
    )]
    UnsupportedOption { level: i32, name: i32 },

    #[error("Malformed address: {0}")]
    #[diagnostic(
        code(socket::malformed_address),
        help("IPv4 addresses are exactly four dot-separated integers in 0-255.")
    )]
    MalformedAddress(String),

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(socket::invalid_argument))]
    InvalidArgument(String),

    #[error("Stack error (code {code:?}): {message}")]
    #[diagnostic(code(socket::unspecified))]
    Unspecified { code: Option<i32>, message: String },
}

impl SocketError {
    /// Raw OS error code for passthrough errors
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            SocketError::Unspecified { code, .. } => *code,
            _ => None,
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, SocketError::WouldBlock | SocketError::Interrupted)
    }
}

impl From<io::Error> for SocketError {
    fn from(err: io::Error) -> Self {
        use io::ErrorKind;

        // EINPROGRESS/EALREADY have no stable ErrorKind
        if let Some(code) = err.raw_os_error() {
            if code == libc::EINPROGRESS || code == libc::EALREADY {
                return SocketError::WouldBlock;
            }
            if code == libc::ENETUNREACH || code == libc::EHOSTUNREACH {
                return SocketError::Unreachable(err.to_string());
            }
        }

        match err.kind() {
            ErrorKind::AddrInUse => SocketError::AddressInUse(err.to_string()),
            ErrorKind::AddrNotAvailable => SocketError::AddressUnavailable(err.to_string()),
            ErrorKind::ConnectionRefused => SocketError::ConnectionRefused(err.to_string()),
            ErrorKind::TimedOut => SocketError::Timeout(err.to_string()),
            ErrorKind::WouldBlock => SocketError::WouldBlock,
            ErrorKind::Interrupted => SocketError::Interrupted,
            ErrorKind::NotConnected => SocketError::NotConnected,
            ErrorKind::OutOfMemory => SocketError::AllocationFailed(err.to_string()),
            _ => SocketError::Unspecified {
                code: err.raw_os_error(),
                message: err.to_string(),
            },
        }
    }
}

impl From<std::collections::TryReserveError> for SocketError {
    fn from(err: std::collections::TryReserveError) -> Self {
        SocketError::AllocationFailed(err.to_string())
    }
}
