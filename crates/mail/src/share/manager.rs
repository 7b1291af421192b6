//! Share lifecycle: create, resolve, revoke, rename, list

use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::ShareError;
use crate::models::{ShareLink, ShareOptions, ShareRecord};
use crate::storage::{ShareStore, ShareUpdate};

/// Name given to shares created without one
pub const DEFAULT_SHARE_NAME: &str = "Unnamed Share";

/// Default share lifetime in days
pub const DEFAULT_SHARE_TTL_DAYS: i64 = 7;

/// Mints and manages time-bounded share links over a [`ShareStore`]
pub struct ShareManager {
    store: Arc<dyn ShareStore>,
    base_url: String,
    default_ttl: Duration,
}

impl ShareManager {
    /// Create a manager building links on `base_url` (e.g. `https://app.example.com`)
    pub fn new(store: Arc<dyn ShareStore>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            base_url: base_url.into(),
            default_ttl: Duration::days(DEFAULT_SHARE_TTL_DAYS),
        }
    }

    pub fn from_config(store: Arc<dyn ShareStore>, config: &ServiceConfig) -> Self {
        Self::new(store, config.app_url.clone()).with_default_ttl(config.share_ttl())
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Public link for a share id
    pub fn share_link(&self, share_id: &str) -> String {
        format!("{}/share/{}", self.base_url.trim_end_matches('/'), share_id)
    }

    /// Mint a new active share for `email_id`
    pub fn create(&self, email_id: &str, options: ShareOptions) -> Result<ShareLink, ShareError> {
        let now = Utc::now();
        let share_id = Uuid::new_v4().to_string();
        let expires_at = options.expires_at.unwrap_or(now + self.default_ttl);
        let name = options
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_SHARE_NAME.to_string());

        let record = ShareRecord::new(&share_id, email_id, options.user_id, name, now, expires_at);
        self.store.insert(record).map_err(|e| {
            error!("Share creation error: {:#}", e);
            ShareError::Create {
                message: format!("{:#}", e),
            }
        })?;

        info!("Created share {} for message {}", share_id, email_id);
        Ok(ShareLink {
            share_link: self.share_link(&share_id),
            share_id,
            expires_at,
        })
    }

    /// Resolve a share for access, counting the access
    pub fn resolve(&self, share_id: &str) -> Result<ShareRecord, ShareError> {
        self.resolve_at(share_id, Utc::now())
    }

    /// Resolve as of `now`
    ///
    /// Checks, in order: existence, revocation, expiry. On success the access
    /// count is read, incremented and written back; concurrent resolutions may
    /// race and under-count.
    pub fn resolve_at(&self, share_id: &str, now: DateTime<Utc>) -> Result<ShareRecord, ShareError> {
        let mut record = self
            .store
            .get(share_id)
            .map_err(|e| {
                error!("Share retrieval error: {:#}", e);
                ShareError::Lookup {
                    message: format!("{:#}", e),
                }
            })?
            .ok_or_else(|| ShareError::NotFound {
                share_id: share_id.to_string(),
            })?;

        if !record.is_active {
            warn!("Share {} has been deactivated", share_id);
            return Err(ShareError::Inactive);
        }
        if record.is_expired_at(now) {
            warn!("Share {} has expired", share_id);
            return Err(ShareError::Expired);
        }

        record.access_count += 1;
        self.store
            .set_access_count(share_id, record.access_count)
            .map_err(|e| {
                error!("Share access count update error: {:#}", e);
                ShareError::Lookup {
                    message: format!("{:#}", e),
                }
            })?;
        Ok(record)
    }

    /// Look up a share without counting an access
    pub fn find(&self, share_id: &str) -> Result<Option<ShareRecord>, ShareError> {
        self.store.get(share_id).map_err(|e| ShareError::Lookup {
            message: format!("{:#}", e),
        })
    }

    /// Deactivate a share owned by `user_id`
    ///
    /// Returns `false` when nothing matched, which covers both an unknown share
    /// and one owned by another user. Use [`ShareManager::find`] to tell them
    /// apart.
    pub fn revoke(&self, share_id: &str, user_id: &str) -> Result<bool, ShareError> {
        let affected = self
            .store
            .update_owned(share_id, user_id, ShareUpdate::Deactivate)
            .map_err(|e| {
                error!("Share cancellation error: {:#}", e);
                ShareError::Cancel {
                    message: format!("{:#}", e),
                }
            })?;

        if affected > 0 {
            info!("Revoked share {}", share_id);
        }
        Ok(affected > 0)
    }

    /// Rename a share owned by `user_id`; same matching rules as [`ShareManager::revoke`]
    pub fn rename(&self, share_id: &str, user_id: &str, name: &str) -> Result<bool, ShareError> {
        let affected = self
            .store
            .update_owned(share_id, user_id, ShareUpdate::Rename(name.to_string()))
            .map_err(|e| {
                error!("Share update error: {:#}", e);
                ShareError::Update {
                    message: format!("{:#}", e),
                }
            })?;

        if affected > 0 {
            info!("Renamed share {}", share_id);
        }
        Ok(affected > 0)
    }

    /// Every share created by `user_id`, newest first
    pub fn list(&self, user_id: &str) -> Result<Vec<ShareRecord>, ShareError> {
        self.store.list_by_creator(user_id).map_err(|e| {
            error!("Share list error: {:#}", e);
            ShareError::List {
                message: format!("{:#}", e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShareStatus;
    use crate::storage::InMemoryShareStore;

    fn manager() -> ShareManager {
        ShareManager::new(Arc::new(InMemoryShareStore::new()), "https://mail.example.com/")
    }

    #[test]
    fn test_create_defaults() {
        let manager = manager();
        let before = Utc::now();
        let link = manager.create("m1", ShareOptions::for_user("alice")).unwrap();

        assert_eq!(
            link.share_link,
            format!("https://mail.example.com/share/{}", link.share_id)
        );
        assert!(link.expires_at >= before + Duration::days(7));
        assert!(link.expires_at <= Utc::now() + Duration::days(7));

        let record = manager.find(&link.share_id).unwrap().unwrap();
        assert_eq!(record.name, DEFAULT_SHARE_NAME);
        assert_eq!(record.email_id, "m1");
        assert_eq!(record.created_by, "alice");
        assert_eq!(record.access_count, 0);
        assert!(record.is_active);
        assert_eq!(record.expires_at, link.expires_at);
    }

    #[test]
    fn test_create_with_options() {
        let manager = manager();
        let expires = Utc::now() + Duration::hours(1);
        let link = manager
            .create("m1", ShareOptions::for_user("alice").name("Invoice").expires_at(expires))
            .unwrap();
        assert_eq!(link.expires_at, expires);
        assert_eq!(manager.find(&link.share_id).unwrap().unwrap().name, "Invoice");
    }

    #[test]
    fn test_create_empty_name_uses_default() {
        let manager = manager();
        let link = manager
            .create("m1", ShareOptions::for_user("alice").name(""))
            .unwrap();
        let record = manager.find(&link.share_id).unwrap().unwrap();
        assert_eq!(record.name, DEFAULT_SHARE_NAME);
    }

    #[test]
    fn test_share_ids_are_unique() {
        let manager = manager();
        let a = manager.create("m1", ShareOptions::for_user("alice")).unwrap();
        let b = manager.create("m1", ShareOptions::for_user("alice")).unwrap();
        assert_ne!(a.share_id, b.share_id);
    }

    #[test]
    fn test_resolve_counts_each_access() {
        let manager = manager();
        let link = manager.create("m1", ShareOptions::for_user("alice")).unwrap();

        for expected in 1..=3 {
            let record = manager.resolve(&link.share_id).unwrap();
            assert_eq!(record.access_count, expected);
        }
        assert_eq!(manager.find(&link.share_id).unwrap().unwrap().access_count, 3);
    }

    #[test]
    fn test_resolve_unknown_share() {
        let err = manager().resolve("missing").unwrap_err();
        assert_eq!(err.code(), "SHARE_NOT_FOUND");
    }

    #[test]
    fn test_resolve_expired_share() {
        let manager = manager();
        let expires = Utc::now() + Duration::minutes(5);
        let link = manager
            .create("m1", ShareOptions::for_user("alice").expires_at(expires))
            .unwrap();

        assert!(manager.resolve_at(&link.share_id, expires).is_ok());
        let err = manager
            .resolve_at(&link.share_id, expires + Duration::seconds(1))
            .unwrap_err();
        assert!(matches!(err, ShareError::Expired));

        // Failed resolutions do not count
        assert_eq!(manager.find(&link.share_id).unwrap().unwrap().access_count, 1);
    }

    #[test]
    fn test_revoked_and_expired_reports_inactive() {
        let manager = manager();
        let link = manager
            .create(
                "m1",
                ShareOptions::for_user("alice").expires_at(Utc::now() - Duration::days(1)),
            )
            .unwrap();
        assert!(manager.revoke(&link.share_id, "alice").unwrap());

        let err = manager.resolve(&link.share_id).unwrap_err();
        assert!(matches!(err, ShareError::Inactive));
        assert_eq!(err.code(), "SHARE_INACTIVE");

        let record = manager.find(&link.share_id).unwrap().unwrap();
        assert_eq!(record.status(Utc::now()), ShareStatus::Revoked);
    }

    #[test]
    fn test_revoke_by_non_owner_changes_nothing() {
        let manager = manager();
        let link = manager.create("m1", ShareOptions::for_user("alice")).unwrap();
        let before = manager.find(&link.share_id).unwrap().unwrap();

        assert!(!manager.revoke(&link.share_id, "mallory").unwrap());
        assert!(!manager.rename(&link.share_id, "mallory", "pwned").unwrap());

        assert_eq!(manager.find(&link.share_id).unwrap().unwrap(), before);
        assert!(manager.resolve(&link.share_id).is_ok());
    }

    #[test]
    fn test_revoke_unknown_share_is_false() {
        assert!(!manager().revoke("missing", "alice").unwrap());
    }

    #[test]
    fn test_rename_by_owner() {
        let manager = manager();
        let link = manager.create("m1", ShareOptions::for_user("alice")).unwrap();
        assert!(manager.rename(&link.share_id, "alice", "Contract").unwrap());
        let record = manager.find(&link.share_id).unwrap().unwrap();
        assert_eq!(record.name, "Contract");
        assert!(record.is_active);
    }

    #[test]
    fn test_list_only_own_shares() {
        let manager = manager();
        manager.create("m1", ShareOptions::for_user("alice")).unwrap();
        manager.create("m2", ShareOptions::for_user("bob")).unwrap();
        manager.create("m3", ShareOptions::for_user("alice")).unwrap();

        let emails: Vec<_> = manager
            .list("alice")
            .unwrap()
            .into_iter()
            .map(|s| s.email_id)
            .collect();
        assert_eq!(emails, vec!["m3", "m1"]);
    }
}
