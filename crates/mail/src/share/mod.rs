//! Time-bounded, revocable sharing of individual messages

mod manager;

pub use manager::{DEFAULT_SHARE_NAME, DEFAULT_SHARE_TTL_DAYS, ShareManager};
