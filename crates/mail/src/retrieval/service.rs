//! Retrieval service: list ids, fetch, normalize, aggregate
//!
//! Per-message fetches fan out over the rayon pool. A message that fails to
//! fetch or normalize is logged and dropped; the page keeps the original id
//! order of whatever survived.

use log::{debug, error, warn};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use super::criteria::{FetchCriteria, PageResult, SearchCriteria, build_query};
use crate::cache::TtlCache;
use crate::config::ServiceConfig;
use crate::error::MailError;
use crate::gmail::normalize_message;
use crate::models::Message;
use crate::provider::{AttachmentData, ListRequest, MailProvider};

/// Default page size
pub const DEFAULT_MAX_RESULTS: u32 = 100;

/// Fetches and normalizes mail through a [`MailProvider`], caching folder pages
pub struct MailService {
    provider: Arc<dyn MailProvider>,
    cache: TtlCache<PageResult>,
    default_max_results: u32,
}

impl MailService {
    /// Create a service whose folder pages stay cached for `cache_ttl`
    pub fn new(provider: Arc<dyn MailProvider>, cache_ttl: Duration) -> Self {
        Self {
            provider,
            cache: TtlCache::new(cache_ttl),
            default_max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn from_config(provider: Arc<dyn MailProvider>, config: &ServiceConfig) -> Self {
        Self::new(provider, config.cache_ttl()).with_default_max_results(config.default_max_results)
    }

    pub fn with_default_max_results(mut self, max_results: u32) -> Self {
        self.default_max_results = max_results;
        self
    }

    /// Fetch one folder/label page
    ///
    /// With `use_cache`, a fresh cached page is returned without touching the
    /// provider, and a freshly fetched page is stored before returning.
    pub fn fetch_page(
        &self,
        criteria: &FetchCriteria,
        use_cache: bool,
    ) -> Result<PageResult, MailError> {
        let max_results = self.page_size(criteria.max_results);
        let cache_key = criteria.cache_key(max_results);

        if use_cache {
            if let Some(page) = self.cache.get(&cache_key) {
                debug!("Cache hit for {}", cache_key);
                return Ok(page);
            }
            debug!("Cache miss for {}", cache_key);
        }

        let request = ListRequest {
            query: build_query(criteria.effective_label()),
            page_token: criteria.page_token.clone(),
            max_results,
            label_ids: criteria.label_filter(),
        };
        let page = self.list_and_load(&request).map_err(|e| {
            error!("Email fetch error: {:#}", e);
            MailError::Fetch {
                message: format!("{:#}", e),
            }
        })?;

        if use_cache {
            self.cache.set(cache_key, page.clone());
        }
        Ok(page)
    }

    /// Run a provider search; results are never cached
    pub fn search(&self, query: &str, criteria: &SearchCriteria) -> Result<PageResult, MailError> {
        let request = ListRequest {
            query: query.to_string(),
            page_token: criteria.page_token.clone(),
            max_results: self.page_size(criteria.max_results),
            label_ids: criteria.label_ids.clone(),
        };
        self.list_and_load(&request).map_err(|e| {
            error!("Email search error: {:#}", e);
            MailError::Search {
                message: format!("{:#}", e),
            }
        })
    }

    /// Fetch and normalize a single message
    pub fn get_message(&self, id: &str) -> Result<Message, MailError> {
        let raw = self
            .provider
            .get_full_message(id)
            .map_err(|e| MailError::Message {
                message_id: id.to_string(),
                message: format!("{:#}", e),
            })?;
        normalize_message(&raw)
    }

    /// Fetch attachment contents; failures are returned, not swallowed
    pub fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentData, MailError> {
        self.provider
            .get_attachment(message_id, attachment_id)
            .map_err(|e| {
                error!("Attachment fetch error: {:#}", e);
                MailError::Attachment {
                    message: format!("{:#}", e),
                }
            })
    }

    /// Drop the cached page for `criteria`, if any
    pub fn invalidate(&self, criteria: &FetchCriteria) {
        let max_results = self.page_size(criteria.max_results);
        self.cache.delete(&criteria.cache_key(max_results));
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Requested page size; absent or zero means the service default
    fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .filter(|&n| n > 0)
            .unwrap_or(self.default_max_results)
    }

    fn list_and_load(&self, request: &ListRequest) -> anyhow::Result<PageResult> {
        let listing = self.provider.list_message_ids(request)?;
        Ok(PageResult {
            emails: self.load_messages(&listing.ids),
            next_page_token: listing.next_page_token,
        })
    }

    /// Fetch and normalize concurrently, keeping id order and dropping failures
    fn load_messages(&self, ids: &[String]) -> Vec<Message> {
        ids.par_iter()
            .map(|id| self.load_message(id))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn load_message(&self, id: &str) -> Option<Message> {
        match self.get_message(id) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!("Error processing message {}: {}", id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gmail::api::{GmailMessage, Header, MessagePart, PartBody};
    use crate::provider::MessageIdPage;
    use anyhow::{Result, anyhow};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeProvider {
        messages: HashMap<String, GmailMessage>,
        listing: Vec<String>,
        next_page_token: Option<String>,
        broken: HashSet<String>,
        fail_list: bool,
        list_calls: AtomicUsize,
        requests: Mutex<Vec<ListRequest>>,
    }

    impl FakeProvider {
        fn with_messages(ids: &[&str]) -> Self {
            let mut fake = Self::default();
            for id in ids {
                fake.messages.insert(id.to_string(), raw_message(id, Some(id)));
                fake.listing.push(id.to_string());
            }
            fake
        }

        fn last_request(&self) -> ListRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl MailProvider for FakeProvider {
        fn list_message_ids(&self, request: &ListRequest) -> Result<MessageIdPage> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_list {
                return Err(anyhow!("provider unavailable"));
            }
            Ok(MessageIdPage {
                ids: self.listing.clone(),
                next_page_token: self.next_page_token.clone(),
            })
        }

        fn get_full_message(&self, id: &str) -> Result<GmailMessage> {
            if self.broken.contains(id) {
                return Err(anyhow!("HTTP 500"));
            }
            self.messages
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow!("no message {}", id))
        }

        fn get_attachment(&self, _message_id: &str, attachment_id: &str) -> Result<AttachmentData> {
            match attachment_id {
                "att-1" => Ok(AttachmentData {
                    data: "aGVsbG8".to_string(),
                    size: 5,
                }),
                _ => Err(anyhow!("attachment not found")),
            }
        }
    }

    fn raw_message(id: &str, subject: Option<&str>) -> GmailMessage {
        GmailMessage {
            id: id.to_string(),
            thread_id: format!("thread-{}", id),
            label_ids: None,
            snippet: None,
            internal_date: None,
            payload: subject.map(|s| MessagePart {
                mime_type: Some("text/plain".to_string()),
                headers: Some(vec![Header {
                    name: "Subject".to_string(),
                    value: s.to_string(),
                }]),
                body: Some(PartBody::default()),
                ..Default::default()
            }),
        }
    }

    fn service(fake: FakeProvider) -> (MailService, Arc<FakeProvider>) {
        let fake = Arc::new(fake);
        let service = MailService::new(fake.clone(), Duration::from_secs(60));
        (service, fake)
    }

    fn subjects(page: &PageResult) -> Vec<&str> {
        page.emails.iter().map(|m| m.subject.as_str()).collect()
    }

    #[test]
    fn test_fetch_page_keeps_id_order() {
        let ids = ["m1", "m2", "m3", "m4", "m5", "m6", "m7", "m8"];
        let (service, _) = service(FakeProvider::with_messages(&ids));
        let page = service.fetch_page(&FetchCriteria::label("INBOX"), false).unwrap();
        assert_eq!(subjects(&page), ids.to_vec());
        assert_eq!(page.next_page_token, None);
    }

    #[test]
    fn test_failed_messages_are_dropped() {
        let mut fake = FakeProvider::with_messages(&["m1", "m2", "m3"]);
        fake.broken.insert("m2".to_string());
        fake.messages.insert("m3".to_string(), raw_message("m3", None));
        fake.listing.push("missing".to_string());

        let (service, _) = service(fake);
        let page = service.fetch_page(&FetchCriteria::default(), false).unwrap();
        assert_eq!(subjects(&page), vec!["m1"]);
    }

    #[test]
    fn test_cache_hit_skips_provider() {
        let (service, fake) = service(FakeProvider::with_messages(&["m1"]));
        let criteria = FetchCriteria::label("INBOX");

        let first = service.fetch_page(&criteria, true).unwrap();
        let second = service.fetch_page(&criteria, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 1);

        // A different page token is a different key
        service.fetch_page(&criteria.clone().page_token("p2"), true).unwrap();
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_without_cache_always_hits_provider() {
        let (service, fake) = service(FakeProvider::with_messages(&["m1"]));
        let criteria = FetchCriteria::label("INBOX");
        service.fetch_page(&criteria, false).unwrap();
        service.fetch_page(&criteria, false).unwrap();
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 2);

        // Nothing was stored either
        service.fetch_page(&criteria, true).unwrap();
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let (service, fake) = service(FakeProvider::with_messages(&["m1"]));
        let criteria = FetchCriteria::label("INBOX");
        service.fetch_page(&criteria, true).unwrap();
        service.invalidate(&criteria);
        service.fetch_page(&criteria, true).unwrap();
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_request_translation() {
        let mut fake = FakeProvider::with_messages(&[]);
        fake.next_page_token = Some("next".to_string());
        let (service, fake) = service(fake);

        let page = service
            .fetch_page(
                &FetchCriteria::label("Work").include_labels(true).page_token("p1"),
                false,
            )
            .unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("next"));
        assert_eq!(
            fake.last_request(),
            ListRequest {
                query: "label:Work".to_string(),
                page_token: Some("p1".to_string()),
                max_results: DEFAULT_MAX_RESULTS,
                label_ids: vec!["Work".to_string()],
            }
        );

        service
            .fetch_page(&FetchCriteria::label("SENT").max_results(20), false)
            .unwrap();
        let request = fake.last_request();
        assert_eq!(request.query, "in:sent");
        assert_eq!(request.max_results, 20);
        assert!(request.label_ids.is_empty());
    }

    #[test]
    fn test_zero_page_size_uses_default() {
        let (service, fake) = service(FakeProvider::with_messages(&["m1"]));
        let criteria = FetchCriteria::label("INBOX").max_results(0);

        service.fetch_page(&criteria, true).unwrap();
        assert_eq!(fake.last_request().max_results, DEFAULT_MAX_RESULTS);

        // Zero and absent share a cache entry
        service.fetch_page(&FetchCriteria::label("INBOX"), true).unwrap();
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 1);
        service.invalidate(&criteria);
        service.fetch_page(&FetchCriteria::label("INBOX"), true).unwrap();
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 2);

        let search = SearchCriteria {
            max_results: Some(0),
            ..Default::default()
        };
        service.search("from:bob", &search).unwrap();
        assert_eq!(fake.last_request().max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn test_list_failure_is_typed() {
        let mut fake = FakeProvider::with_messages(&["m1"]);
        fake.fail_list = true;
        let (service, _) = service(fake);

        let err = service.fetch_page(&FetchCriteria::default(), true).unwrap_err();
        assert_eq!(err.code(), "FETCH_ERROR");
        let err = service.search("from:bob", &SearchCriteria::default()).unwrap_err();
        assert_eq!(err.code(), "SEARCH_ERROR");
    }

    #[test]
    fn test_search_is_not_cached() {
        let (service, fake) = service(FakeProvider::with_messages(&["m1", "m2"]));
        let criteria = SearchCriteria {
            label_ids: vec!["INBOX".to_string()],
            ..Default::default()
        };
        let page = service.search("from:bob", &criteria).unwrap();
        assert_eq!(page.emails.len(), 2);
        service.search("from:bob", &criteria).unwrap();
        assert_eq!(fake.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(fake.last_request().query, "from:bob");
        assert_eq!(fake.last_request().label_ids, vec!["INBOX".to_string()]);
    }

    #[test]
    fn test_get_message_surfaces_errors() {
        let mut fake = FakeProvider::with_messages(&["m1"]);
        fake.messages.insert("bare".to_string(), raw_message("bare", None));
        let (service, _) = service(fake);

        assert_eq!(service.get_message("m1").unwrap().subject, "m1");
        assert_eq!(service.get_message("nope").unwrap_err().code(), "MESSAGE_ERROR");
        assert_eq!(service.get_message("bare").unwrap_err().code(), "DECODE_ERROR");
    }

    #[test]
    fn test_get_attachment() {
        let (service, _) = service(FakeProvider::default());
        let data = service.get_attachment("m1", "att-1").unwrap();
        assert_eq!(data.size, 5);
        let err = service.get_attachment("m1", "att-2").unwrap_err();
        assert_eq!(err.code(), "ATTACHMENT_ERROR");
    }
}
