use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SessionError;
use crate::store::{SessionStore, SessionStoreExt};

pub const PAGINATION_INFO_STORAGE_KEY: &str = "result-pagination-info";

/// Where the result panel last was, so it can be restored on reopen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPaginationInfo {
  /// Set when a new execution was submitted after this record was written;
  /// the result panel then discards the stored position and loads fresh data.
  #[serde(default)]
  pub new_workflow_executed: bool,
  #[serde(default)]
  pub current_page_index: u32,
  #[serde(rename = "operatorID", default)]
  pub operator_id: Option<String>,
}

/// Flag the stored pagination record as stale after a new submission.
///
/// Only an existing record is updated. Returns whether a record was found.
pub fn mark_new_workflow_executed<S: SessionStore + ?Sized>(
  store: &S,
) -> Result<bool, SessionError> {
  let Some(info) = store.get_object::<ResultPaginationInfo>(PAGINATION_INFO_STORAGE_KEY)? else {
    return Ok(false);
  };

  store.set_object(
    PAGINATION_INFO_STORAGE_KEY,
    &ResultPaginationInfo {
      new_workflow_executed: true,
      ..info
    },
  )?;
  debug!("flagged stored result pagination as stale");
  Ok(true)
}
