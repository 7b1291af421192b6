//! Mail crate - retrieval, normalization and sharing of mailbox items
//!
//! This crate provides:
//! - Domain models (Message, EmailAddress, ShareRecord)
//! - Gmail API client and OAuth authentication
//! - Decomposition of nested MIME trees into a flat message record
//! - A TTL cache guarding folder page fetches
//! - The retrieval service (list, fetch, normalize, aggregate)
//! - The share lifecycle manager and its storage backends
//!
//! All services are explicitly constructed and passed around; there is no
//! process-wide client or cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod gmail;
pub mod models;
pub mod provider;
pub mod retrieval;
pub mod share;
pub mod storage;

pub use cache::{CacheEntry, TtlCache};
pub use config::{GmailCredentials, ServiceConfig};
pub use error::{AuthError, MailError, ShareError};
pub use gmail::{GmailAuth, GmailClient, TokenSet, api::ProfileResponse, normalize_message};
pub use models::{
    Attachment, EmailAddress, Message, MessageBody, MessageId, ShareLink, ShareOptions,
    ShareRecord, ShareStatus, ThreadId,
};
pub use provider::{AttachmentData, ListRequest, MailProvider, MessageIdPage, SessionProvider};
pub use retrieval::{FetchCriteria, MailService, PageResult, SearchCriteria};
pub use share::ShareManager;
pub use storage::{InMemoryShareStore, ShareStore, ShareUpdate, SqliteShareStore};
