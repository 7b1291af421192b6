//! Storage trait definitions

use crate::models::ShareRecord;
use anyhow::Result;

/// A mutation applied through the ownership filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareUpdate {
    /// Clear `is_active`
    Deactivate,
    /// Replace the display name
    Rename(String),
}

/// Trait for share record storage
///
/// Abstracts over the backing table so the share lifecycle can run against
/// SQLite in production and an in-memory map in tests.
pub trait ShareStore: Send + Sync {
    /// Insert a new record; fails if the share id is already taken
    fn insert(&self, record: ShareRecord) -> Result<()>;

    /// Get a record by share id
    fn get(&self, share_id: &str) -> Result<Option<ShareRecord>>;

    /// Apply `update` to the record matching both `share_id` and `created_by`
    ///
    /// Returns the number of records affected (0 or 1). A missing share and a
    /// share owned by someone else both yield 0.
    fn update_owned(&self, share_id: &str, created_by: &str, update: ShareUpdate) -> Result<usize>;

    /// Overwrite the access count of a record
    fn set_access_count(&self, share_id: &str, access_count: u64) -> Result<()>;

    /// All records created by `created_by`, newest first
    fn list_by_creator(&self, created_by: &str) -> Result<Vec<ShareRecord>>;
}
