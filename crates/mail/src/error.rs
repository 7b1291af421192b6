//! Typed errors returned at the service boundary
//!
//! Each variant carries a stable string code for programmatic branching and a
//! human-readable message for logging.

/// Errors from message retrieval
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Failed to fetch emails: {message}")]
    Fetch { message: String },

    #[error("Failed to search emails: {message}")]
    Search { message: String },

    #[error("Failed to fetch attachment: {message}")]
    Attachment { message: String },

    #[error("Failed to fetch message {message_id}: {message}")]
    Message { message_id: String, message: String },

    #[error("Failed to decode message {message_id}: {reason}")]
    Decode { message_id: String, reason: String },
}

impl MailError {
    pub fn code(&self) -> &'static str {
        match self {
            MailError::Fetch { .. } => "FETCH_ERROR",
            MailError::Search { .. } => "SEARCH_ERROR",
            MailError::Attachment { .. } => "ATTACHMENT_ERROR",
            MailError::Message { .. } => "MESSAGE_ERROR",
            MailError::Decode { .. } => "DECODE_ERROR",
        }
    }
}

/// Errors from the share lifecycle
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("Share not found: {share_id}")]
    NotFound { share_id: String },

    #[error("Share has been deactivated")]
    Inactive,

    #[error("Share has expired")]
    Expired,

    #[error("Failed to create share link: {message}")]
    Create { message: String },

    #[error("Failed to load share: {message}")]
    Lookup { message: String },

    #[error("Failed to cancel share: {message}")]
    Cancel { message: String },

    #[error("Failed to list shares: {message}")]
    List { message: String },

    #[error("Failed to update share name: {message}")]
    Update { message: String },
}

impl ShareError {
    pub fn code(&self) -> &'static str {
        match self {
            ShareError::NotFound { .. } => "SHARE_NOT_FOUND",
            ShareError::Inactive => "SHARE_INACTIVE",
            ShareError::Expired => "SHARE_EXPIRED",
            ShareError::Create { .. } => "SHARE_CREATE_ERROR",
            ShareError::Lookup { .. } => "SHARE_ERROR",
            ShareError::Cancel { .. } => "SHARE_CANCEL_ERROR",
            ShareError::List { .. } => "SHARE_LIST_ERROR",
            ShareError::Update { .. } => "SHARE_UPDATE_ERROR",
        }
    }
}

/// Errors from the identity/session provider
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No valid tokens found")]
    NotAuthenticated,

    #[error("Authentication failed: {message}")]
    Provider { message: String },
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NotAuthenticated => "AUTH_REQUIRED",
            AuthError::Provider { .. } => "AUTH_ERROR",
        }
    }
}
