//! Folder page retrieval and search over a mail provider

mod criteria;
mod service;

pub use criteria::{FetchCriteria, PageResult, SearchCriteria, build_query, folders};
pub use service::{DEFAULT_MAX_RESULTS, MailService};
