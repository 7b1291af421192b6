//! In-memory share storage
//!
//! Used in tests and for sessions that do not need shares to outlive the
//! process.

use anyhow::{Result, anyhow, bail};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{ShareStore, ShareUpdate};
use crate::models::ShareRecord;

/// Stored record plus its insertion sequence, used to order same-instant records
struct StoredShare {
    record: ShareRecord,
    seq: u64,
}

#[derive(Default)]
struct Shares {
    by_id: HashMap<String, StoredShare>,
    next_seq: u64,
}

/// In-memory implementation of [`ShareStore`]
#[derive(Default)]
pub struct InMemoryShareStore {
    shares: RwLock<Shares>,
}

impl InMemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Shares>> {
        self.shares
            .read()
            .map_err(|_| anyhow!("share store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Shares>> {
        self.shares
            .write()
            .map_err(|_| anyhow!("share store lock poisoned"))
    }
}

impl ShareStore for InMemoryShareStore {
    fn insert(&self, record: ShareRecord) -> Result<()> {
        let mut shares = self.write()?;
        if shares.by_id.contains_key(&record.share_id) {
            bail!("duplicate share id {}", record.share_id);
        }
        let seq = shares.next_seq;
        shares.next_seq += 1;
        shares
            .by_id
            .insert(record.share_id.clone(), StoredShare { record, seq });
        Ok(())
    }

    fn get(&self, share_id: &str) -> Result<Option<ShareRecord>> {
        Ok(self.read()?.by_id.get(share_id).map(|s| s.record.clone()))
    }

    fn update_owned(&self, share_id: &str, created_by: &str, update: ShareUpdate) -> Result<usize> {
        let mut shares = self.write()?;
        let Some(stored) = shares
            .by_id
            .get_mut(share_id)
            .filter(|s| s.record.created_by == created_by)
        else {
            return Ok(0);
        };

        match update {
            ShareUpdate::Deactivate => stored.record.is_active = false,
            ShareUpdate::Rename(name) => stored.record.name = name,
        }
        Ok(1)
    }

    fn set_access_count(&self, share_id: &str, access_count: u64) -> Result<()> {
        if let Some(stored) = self.write()?.by_id.get_mut(share_id) {
            stored.record.access_count = access_count;
        }
        Ok(())
    }

    fn list_by_creator(&self, created_by: &str) -> Result<Vec<ShareRecord>> {
        let shares = self.read()?;
        let mut owned: Vec<&StoredShare> = shares
            .by_id
            .values()
            .filter(|s| s.record.created_by == created_by)
            .collect();
        owned.sort_by_key(|s| Reverse((s.record.created_at, s.seq)));
        Ok(owned.into_iter().map(|s| s.record.clone()).collect())
    }
}
