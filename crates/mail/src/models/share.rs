//! Share records granting time-bounded access to a single mail item

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A revocable, expiring pointer to one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub share_id: String,
    /// Message ID of the shared mail item
    pub email_id: String,
    /// User who minted the share; the only one allowed to revoke or rename it
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub name: String,
    /// Number of successful resolutions
    pub access_count: u64,
    /// Cleared on revocation, never set again
    pub is_active: bool,
}

impl ShareRecord {
    /// Create a fresh, active record with no accesses
    pub fn new(
        share_id: impl Into<String>,
        email_id: impl Into<String>,
        created_by: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            share_id: share_id.into(),
            email_id: email_id.into(),
            created_by: created_by.into(),
            created_at,
            expires_at,
            name: name.into(),
            access_count: 0,
            is_active: true,
        }
    }

    /// Whether the share is past its expiry at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Lifecycle state at `now`; revocation is reported ahead of expiry
    pub fn status(&self, now: DateTime<Utc>) -> ShareStatus {
        if !self.is_active {
            ShareStatus::Revoked
        } else if self.is_expired_at(now) {
            ShareStatus::Expired
        } else {
            ShareStatus::Active
        }
    }
}

/// Lifecycle state of a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareStatus {
    Active,
    Expired,
    Revoked,
}

/// Options for minting a share
#[derive(Debug, Clone, Default)]
pub struct ShareOptions {
    pub user_id: String,
    pub name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShareOptions {
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Result of minting a share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub share_link: String,
    pub share_id: String,
    pub expires_at: DateTime<Utc>,
}
