//! Traits for the external collaborators the core consumes
//!
//! The retrieval service only talks to a mailbox through [`MailProvider`], and
//! callers resolve the acting user through [`SessionProvider`]. Gmail
//! implementations live in [`crate::gmail`]; tests swap in fakes.

use anyhow::Result;

use crate::gmail::api::GmailMessage;

/// Parameters of a "list message ids" call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Provider query string (`in:inbox`, `label:work`, free-text search...)
    pub query: String,
    pub page_token: Option<String>,
    pub max_results: u32,
    /// Restrict to messages carrying all of these label IDs
    pub label_ids: Vec<String>,
}

/// One page of message ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageIdPage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Attachment payload as delivered by the provider
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttachmentData {
    /// base64url encoded bytes, passed through untouched
    pub data: String,
    pub size: u64,
}

/// Remote mailbox operations
pub trait MailProvider: Send + Sync {
    /// List message ids matching a query
    fn list_message_ids(&self, request: &ListRequest) -> Result<MessageIdPage>;

    /// Fetch a message with its full MIME tree
    fn get_full_message(&self, id: &str) -> Result<GmailMessage>;

    /// Fetch the contents of one attachment
    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentData>;
}

/// Identity of the signed-in user
pub trait SessionProvider: Send + Sync {
    /// Whether the current access token is still usable
    fn is_token_valid(&self) -> bool;

    /// Stable identifier of the current user
    fn current_user_id(&self) -> Result<String>;
}
