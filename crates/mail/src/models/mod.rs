//! Domain models for mail and share entities

mod message;
mod share;

pub use message::{Attachment, EmailAddress, Message, MessageBody, MessageId, ThreadId};
pub use share::{ShareLink, ShareOptions, ShareRecord, ShareStatus};
