/*!
 * Socket Handle Manager
 * Opaque handles over stack socket objects and their lifecycle
 */

mod entry;
mod handle;
mod manager;
mod table;

pub(crate) use entry::{Direction, SocketEntry};
pub use entry::SocketState;
pub use handle::SocketHandle;
pub use manager::{HandleInfo, SocketManager, SocketStats};
