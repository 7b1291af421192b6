//! Normalized message model produced from provider message trees

use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a thread (Gmail thread ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An email address with a display name (empty when the header had none)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: String,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Parse a header value like `"John Doe" <john@example.com>`
    ///
    /// The display name is trimmed and one surrounding quote character (`"` or
    /// `'`) is removed from each end. Values without a `name <email>` shape are
    /// kept whole as the email, with an empty name.
    pub fn parse(value: &str) -> Self {
        match split_display_form(value) {
            Some((name, email)) => Self::with_name(strip_quotes(name.trim()), email),
            None => Self::new(value),
        }
    }
}

/// Split `name <email>` into its two halves.
///
/// The name must be at least one character long and the bracketed email at
/// least one character; the first `<` satisfying both wins, and the email ends
/// at the first `>` after its opening character.
fn split_display_form(value: &str) -> Option<(&str, &str)> {
    for (open, _) in value.match_indices('<') {
        if open == 0 {
            continue;
        }
        let rest = &value[open + 1..];
        let Some(first) = rest.chars().next() else {
            continue;
        };
        let skip = first.len_utf8();
        if let Some(close) = rest[skip..].find('>') {
            return Some((&value[..open], &rest[..skip + close]));
        }
    }
    None
}

fn strip_quotes(name: &str) -> &str {
    let name = name.strip_prefix(['"', '\'']).unwrap_or(name);
    name.strip_suffix(['"', '\'']).unwrap_or(name)
}

/// The single body representation selected for a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    /// Either `text/html` or `text/plain`
    pub mime_type: String,
    pub content: String,
}

impl MessageBody {
    pub const HTML: &'static str = "text/html";
    pub const PLAIN: &'static str = "text/plain";

    /// Empty plain-text body used when a message has no text parts
    pub fn empty() -> Self {
        Self {
            mime_type: Self::PLAIN.to_string(),
            content: String::new(),
        }
    }
}

impl Default for MessageBody {
    fn default() -> Self {
        Self::empty()
    }
}

/// Reference to an attachment; the bytes are fetched separately
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    /// Size in bytes as reported by the provider
    pub size: u64,
    pub attachment_id: Option<String>,
}

/// A mail item flattened from its multi-part tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Gmail message ID
    pub id: MessageId,
    /// ID of the thread this message belongs to
    pub thread_id: ThreadId,
    pub from: EmailAddress,
    pub to: EmailAddress,
    pub subject: String,
    /// Raw `Date` header value
    pub date: String,
    pub body: MessageBody,
    pub attachments: Vec<Attachment>,
    /// Gmail label IDs (e.g., "INBOX", "SENT", "UNREAD")
    pub labels: Vec<String>,
}
