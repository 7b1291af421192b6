//! SQLite-based share storage

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::{ShareStore, ShareUpdate};
use crate::models::ShareRecord;

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        r#"
        CREATE TABLE shared_emails (
            share_id TEXT PRIMARY KEY,
            email_id TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            name TEXT NOT NULL,
            access_count INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX idx_shared_emails_creator
            ON shared_emails(created_by, created_at DESC);
        "#,
    )])
}

const SELECT_COLUMNS: &str = "share_id, email_id, created_by, created_at, expires_at, name, access_count, is_active";

/// SQLite-based share storage
pub struct SqliteShareStore {
    conn: Mutex<Connection>,
}

impl SqliteShareStore {
    /// Open (or create) the share database at `db_path`
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("share database lock poisoned"))
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ShareRecord> {
    let created_at: String = row.get(3)?;
    let expires_at: String = row.get(4)?;
    let access_count: i64 = row.get(6)?;
    Ok(ShareRecord {
        share_id: row.get(0)?,
        email_id: row.get(1)?,
        created_by: row.get(2)?,
        created_at: parse_time(&created_at)?,
        expires_at: parse_time(&expires_at)?,
        name: row.get(5)?,
        access_count: access_count.max(0) as u64,
        is_active: row.get(7)?,
    })
}

impl ShareStore for SqliteShareStore {
    fn insert(&self, record: ShareRecord) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO shared_emails
                 (share_id, email_id, created_by, created_at, expires_at, name, access_count, is_active)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.share_id,
                    record.email_id,
                    record.created_by,
                    format_time(&record.created_at),
                    format_time(&record.expires_at),
                    record.name,
                    record.access_count as i64,
                    record.is_active,
                ],
            )
            .with_context(|| format!("Failed to insert share {}", record.share_id))?;
        Ok(())
    }

    fn get(&self, share_id: &str) -> Result<Option<ShareRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("SELECT {} FROM shared_emails WHERE share_id = ?", SELECT_COLUMNS),
                [share_id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn update_owned(&self, share_id: &str, created_by: &str, update: ShareUpdate) -> Result<usize> {
        let conn = self.conn()?;
        let affected = match update {
            ShareUpdate::Deactivate => conn.execute(
                "UPDATE shared_emails SET is_active = 0 WHERE share_id = ? AND created_by = ?",
                params![share_id, created_by],
            )?,
            ShareUpdate::Rename(name) => conn.execute(
                "UPDATE shared_emails SET name = ? WHERE share_id = ? AND created_by = ?",
                params![name, share_id, created_by],
            )?,
        };
        Ok(affected)
    }

    fn set_access_count(&self, share_id: &str, access_count: u64) -> Result<()> {
        self.conn()?.execute(
            "UPDATE shared_emails SET access_count = ? WHERE share_id = ?",
            params![access_count as i64, share_id],
        )?;
        Ok(())
    }

    fn list_by_creator(&self, created_by: &str) -> Result<Vec<ShareRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM shared_emails WHERE created_by = ?
             ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))?;

        let records = stmt
            .query_map([created_by], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn share(id: &str, owner: &str, age_minutes: i64) -> ShareRecord {
        let created = Utc::now() - Duration::minutes(age_minutes);
        ShareRecord::new(id, "m1", owner, "Share", created, created + Duration::days(7))
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let store = SqliteShareStore::in_memory().unwrap();
        let mut record = share("s1", "alice", 0);
        record.access_count = 3;
        store.insert(record.clone()).unwrap();

        let loaded = store.get("s1").unwrap().unwrap();
        assert_eq!(loaded.share_id, "s1");
        assert_eq!(loaded.email_id, "m1");
        assert_eq!(loaded.access_count, 3);
        assert!(loaded.is_active);
        // Stored at microsecond precision
        assert_eq!(
            loaded.expires_at.timestamp_micros(),
            record.expires_at.timestamp_micros()
        );
        assert!(store.get("s2").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_share_id_rejected() {
        let store = SqliteShareStore::in_memory().unwrap();
        store.insert(share("s1", "alice", 0)).unwrap();
        assert!(store.insert(share("s1", "bob", 0)).is_err());
    }

    #[test]
    fn test_update_filtered_by_owner() {
        let store = SqliteShareStore::in_memory().unwrap();
        store.insert(share("s1", "alice", 0)).unwrap();

        assert_eq!(store.update_owned("s1", "mallory", ShareUpdate::Deactivate).unwrap(), 0);
        assert!(store.get("s1").unwrap().unwrap().is_active);

        let rename = ShareUpdate::Rename("Quarterly report".to_string());
        assert_eq!(store.update_owned("s1", "alice", rename).unwrap(), 1);
        assert_eq!(store.update_owned("s1", "alice", ShareUpdate::Deactivate).unwrap(), 1);

        let loaded = store.get("s1").unwrap().unwrap();
        assert_eq!(loaded.name, "Quarterly report");
        assert!(!loaded.is_active);
    }

    #[test]
    fn test_list_newest_first() {
        let store = SqliteShareStore::in_memory().unwrap();
        store.insert(share("old", "alice", 60)).unwrap();
        store.insert(share("new", "alice", 1)).unwrap();
        store.insert(share("other", "bob", 0)).unwrap();

        let ids: Vec<_> = store
            .list_by_creator("alice")
            .unwrap()
            .into_iter()
            .map(|s| s.share_id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shares.test.sqlite");

        {
            let store = SqliteShareStore::new(&path).unwrap();
            store.insert(share("s1", "alice", 0)).unwrap();
            store.set_access_count("s1", 2).unwrap();
        }

        let store = SqliteShareStore::new(&path).unwrap();
        assert_eq!(store.get("s1").unwrap().unwrap().access_count, 2);
    }
}
