/*!
 * I/O & Control Shim
 * BSD-style calls translated onto stack socket objects
 *
 * Every call resolves its handle through the manager and never creates or
 * releases handles itself.
 */

mod control;
mod options;
mod transfer;
