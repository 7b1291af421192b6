//! Share storage traits and implementations
//!
//! The trait-based design allows swapping between in-memory and SQLite
//! storage implementations.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryShareStore;
pub use sqlite::SqliteShareStore;
pub use traits::{ShareStore, ShareUpdate};
