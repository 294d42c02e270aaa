/*!
 * Socket Options
 * setsockopt/getsockopt dispatch between socket-level and protocol handlers
 */

use crate::core::errors::{SocketError, SocketResult};
use crate::core::option::{OptionAccess, OptionLevel};
use crate::monitoring::span_operation;
use crate::sockets::{SocketHandle, SocketManager};
use tracing::{debug, warn};

impl SocketManager {
    /// Set an option from its encoded value blob
    ///
    /// Options the handle has no handler for fail with `UnsupportedOption`
    /// before anything reaches the stack.
    pub fn set_option(
        &self,
        handle: SocketHandle,
        level: i32,
        name: i32,
        value: &[u8],
    ) -> SocketResult<()> {
        let span = span_operation("socket_set_option");
        let _guard = span.enter();
        span.record_handle(handle);

        let result = self.entry(handle).and_then(|entry| {
            let socket = entry.socket();
            if !socket.has_option(level, name, OptionAccess::Set) {
                warn!(handle = %handle, level, name, "unsupported option");
                return Err(SocketError::UnsupportedOption { level, name });
            }
            match OptionLevel::from_raw(level) {
                OptionLevel::Socket => socket.set_socket_option(name, value),
                OptionLevel::Protocol(level) => socket.set_protocol_option(level, name, value),
            }
        });

        if result.is_ok() {
            debug!(handle = %handle, level, name, len = value.len(), "Set socket option");
        }
        span.finish(result)
    }

    /// Read an option as its encoded value blob
    pub fn get_option(&self, handle: SocketHandle, level: i32, name: i32) -> SocketResult<Vec<u8>> {
        let span = span_operation("socket_get_option");
        let _guard = span.enter();
        span.record_handle(handle);

        let result = self.entry(handle).and_then(|entry| {
            let socket = entry.socket();
            if !socket.has_option(level, name, OptionAccess::Get) {
                warn!(handle = %handle, level, name, "unsupported option");
                return Err(SocketError::UnsupportedOption { level, name });
            }
            match OptionLevel::from_raw(level) {
                OptionLevel::Socket => socket.get_socket_option(name),
                OptionLevel::Protocol(level) => socket.get_protocol_option(level, name),
            }
        });

        if let Ok(value) = &result {
            span.record_bytes(value.len());
        }
        span.finish(result)
    }
}
