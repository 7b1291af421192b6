//! Request parameters for folder pages and searches

use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Well-known folders with dedicated provider queries
pub mod folders {
    pub const INBOX: &str = "INBOX";
    pub const SENT: &str = "SENT";
}

/// Which folder/label page to fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchCriteria {
    /// Folder or label; `None` or empty means the whole mailbox
    pub label: Option<String>,
    pub page_token: Option<String>,
    /// Also restrict by label ID, not just by query
    pub include_labels: bool,
    /// Page size; the service default applies when `None`
    pub max_results: Option<u32>,
}

impl FetchCriteria {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    pub fn include_labels(mut self, include: bool) -> Self {
        self.include_labels = include;
        self
    }

    pub fn max_results(mut self, max: u32) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Label as a non-empty string, if any
    pub fn effective_label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }

    /// Cache key from every field that shapes the result set
    pub fn cache_key(&self, max_results: u32) -> String {
        format!(
            "{:?}|{:?}|{}|{}",
            self.effective_label(),
            self.page_token,
            self.include_labels,
            max_results
        )
    }

    /// Label IDs to filter by when `include_labels` is set
    pub fn label_filter(&self) -> Vec<String> {
        match self.effective_label() {
            Some(label) if self.include_labels => vec![label.to_string()],
            _ => Vec::new(),
        }
    }
}

/// Translate a folder/label into a provider query string
pub fn build_query(label: Option<&str>) -> String {
    match label {
        None | Some("") => String::new(),
        Some(folders::SENT) => "in:sent".to_string(),
        Some(folders::INBOX) => "in:inbox".to_string(),
        Some(label) => format!("label:{}", label),
    }
}

/// Options for a free-text search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub page_token: Option<String>,
    pub max_results: Option<u32>,
    pub label_ids: Vec<String>,
}

/// One page of normalized messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub emails: Vec<Message>,
    /// Continuation cursor; `None` on the last page
    pub next_page_token: Option<String>,
}
