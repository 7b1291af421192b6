//! Gmail API HTTP client
//!
//! Implements [`MailProvider`] and [`SessionProvider`] on top of the Gmail
//! REST API. Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use url::Url;

use super::GmailAuth;
use super::api::{AttachmentResponse, GmailMessage, ListMessagesResponse, ProfileResponse};
use crate::provider::{AttachmentData, ListRequest, MailProvider, MessageIdPage, SessionProvider};

/// Gmail API client
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1/users/me";

    /// Largest page the API will return
    pub const MAX_PAGE_SIZE: u32 = 500;

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &GmailAuth {
        &self.auth
    }

    /// Fetch the authenticated user's profile
    pub fn profile(&self) -> Result<ProfileResponse> {
        self.get_json(&self.endpoint("profile")?, "profile")
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}/{}", Self::BASE_URL, path)).context("Invalid Gmail API URL")
    }

    /// Authorized GET returning parsed JSON
    fn get_json<T: DeserializeOwned>(&self, url: &Url, what: &str) -> Result<T> {
        let access_token = self.auth.access_token()?;

        let mut response = ureq::get(url.as_str())
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to send {} request", what))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", what))
    }
}

impl MailProvider for GmailClient {
    fn list_message_ids(&self, request: &ListRequest) -> Result<MessageIdPage> {
        let mut url = self.endpoint("messages")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(
                "maxResults",
                &request.max_results.clamp(1, Self::MAX_PAGE_SIZE).to_string(),
            );
            if !request.query.is_empty() {
                query.append_pair("q", &request.query);
            }
            if let Some(token) = &request.page_token {
                query.append_pair("pageToken", token);
            }
            for label in &request.label_ids {
                query.append_pair("labelIds", label);
            }
        }

        let list: ListMessagesResponse = self.get_json(&url, "list messages")?;
        Ok(MessageIdPage {
            ids: list
                .messages
                .unwrap_or_default()
                .into_iter()
                .map(|m| m.id)
                .collect(),
            next_page_token: list.next_page_token,
        })
    }

    fn get_full_message(&self, id: &str) -> Result<GmailMessage> {
        let mut url = self.endpoint(&format!("messages/{}", urlencoding::encode(id)))?;
        url.query_pairs_mut().append_pair("format", "full");
        self.get_json(&url, "get message")
    }

    fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentData> {
        let url = self.endpoint(&format!(
            "messages/{}/attachments/{}",
            urlencoding::encode(message_id),
            urlencoding::encode(attachment_id)
        ))?;
        let attachment: AttachmentResponse = self.get_json(&url, "get attachment")?;
        Ok(AttachmentData {
            size: attachment.size.unwrap_or(0),
            data: attachment.data,
        })
    }
}

impl SessionProvider for GmailClient {
    fn is_token_valid(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// The mailbox address doubles as the user id
    fn current_user_id(&self) -> Result<String> {
        Ok(self.profile()?.email_address)
    }
}
