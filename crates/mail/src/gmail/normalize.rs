//! Gmail message decomposition
//!
//! Flattens a Gmail message tree into a [`Message`]: headers, a single
//! selected body, and attachment references. Each conversion works on a
//! borrowed, immutable tree, so independent messages can be normalized in
//! parallel.

use base64::prelude::*;
use log::debug;

use super::api::{GmailMessage, Header, MessagePart};
use crate::error::MailError;
use crate::models::{Attachment, EmailAddress, Message, MessageBody, MessageId, ThreadId};

/// Normalize a Gmail API message
///
/// Fails only when the message has no payload; missing headers and parts
/// degrade to empty values.
pub fn normalize_message(gmail_msg: &GmailMessage) -> Result<Message, MailError> {
    let payload = gmail_msg.payload.as_ref().ok_or_else(|| MailError::Decode {
        message_id: gmail_msg.id.clone(),
        reason: "message has no payload".to_string(),
    })?;

    let headers = payload.headers.as_deref().unwrap_or_default();

    Ok(Message {
        id: MessageId::new(&gmail_msg.id),
        thread_id: ThreadId::new(&gmail_msg.thread_id),
        from: EmailAddress::parse(extract_header(headers, "from")),
        to: EmailAddress::parse(extract_header(headers, "to")),
        subject: extract_header(headers, "subject").to_string(),
        date: extract_header(headers, "date").to_string(),
        body: extract_body(payload),
        attachments: extract_attachments(payload),
        labels: gmail_msg.label_ids.clone().unwrap_or_default(),
    })
}

/// Look up a header value by case-insensitive name, or "" when absent
fn extract_header<'a>(headers: &'a [Header], name: &str) -> &'a str {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
        .unwrap_or_default()
}

/// Select the body: first `text/html` part, else first `text/plain`, else empty
fn extract_body(payload: &MessagePart) -> MessageBody {
    let mut texts = Vec::new();
    collect_text_parts(payload, &mut texts);

    let pick = |mime: &str| texts.iter().position(|(m, _)| *m == mime);
    match pick(MessageBody::HTML).or_else(|| pick(MessageBody::PLAIN)) {
        Some(index) => {
            let (mime_type, content) = texts.swap_remove(index);
            MessageBody {
                mime_type: mime_type.to_string(),
                content,
            }
        }
        None => MessageBody::empty(),
    }
}

/// Depth-first walk collecting decoded text leaves; children before the part itself
fn collect_text_parts<'a>(part: &'a MessagePart, out: &mut Vec<(&'a str, String)>) {
    for child in part.parts.iter().flatten() {
        collect_text_parts(child, out);
    }

    let Some(mime) = part.mime_type.as_deref() else {
        return;
    };
    if mime == MessageBody::PLAIN || mime == MessageBody::HTML {
        let content = part
            .body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .map(decode_body_data)
            .unwrap_or_default();
        out.push((mime, content));
    }
}

/// Enumerate attachment references in traversal order
///
/// A part is an attachment when it has a non-empty filename and a body,
/// even if that body carries no inline data.
fn extract_attachments(payload: &MessagePart) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    collect_attachments(payload, &mut attachments);
    attachments
}

fn collect_attachments(part: &MessagePart, out: &mut Vec<Attachment>) {
    for child in part.parts.iter().flatten() {
        collect_attachments(child, out);
    }

    if let Some(filename) = part.filename.as_deref().filter(|f| !f.is_empty())
        && let Some(body) = &part.body
    {
        out.push(Attachment {
            filename: filename.to_string(),
            mime_type: part.mime_type.clone().unwrap_or_default(),
            size: body.size.unwrap_or(0),
            attachment_id: body.attachment_id.clone(),
        });
    }
}

/// Decode base64-encoded body data to text
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
/// Invalid UTF-8 is replaced rather than rejected; data no decoder accepts
/// yields an empty string.
pub fn decode_body_data(data: &str) -> String {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data) {
            return String::from_utf8_lossy(&decoded).into_owned();
        }
    }

    debug!("Undecodable body data ({} bytes), using empty content", data.len());
    String::new()
}
