/*!
 * Core Module
 * Fundamental types, ids, limits, codec and error handling
 */

pub mod bincode;
pub mod errors;
pub mod id;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use id::random_table_id;
pub use types::{Status, StatusCode, Tag};
