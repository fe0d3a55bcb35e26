//! Tessera Session
//!
//! Key-value storage scoped to one client session, plus the records the
//! execution layer keeps in it.

mod error;
mod pagination;
mod store;

pub use error::SessionError;
pub use pagination::{PAGINATION_INFO_STORAGE_KEY, ResultPaginationInfo, mark_new_workflow_executed};
pub use store::{MemorySessionStore, SessionStore, SessionStoreExt};
