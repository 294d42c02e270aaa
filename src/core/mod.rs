/*!
 * Core Module
 * Fundamental socket types, option encodings, limits, and error handling
 */

pub mod errors;
pub mod limits;
pub mod option;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use option::{OptionAccess, OptionLevel, OptionValue};
pub use types::*;
