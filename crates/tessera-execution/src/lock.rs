//! Maps execution state to whether the workflow may be edited.

use crate::model::WorkflowModel;
use crate::state::ExecutionStateInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionLock {
  pub locked: bool,
}

/// Whether edits must be blocked in this state.
pub fn lock_policy(state: &ExecutionStateInfo) -> ActionLock {
  // No wildcard: a new state must be classified here before it compiles.
  let locked = match state {
    ExecutionStateInfo::Uninitialized
    | ExecutionStateInfo::Completed
    | ExecutionStateInfo::Failed { .. }
    | ExecutionStateInfo::Killed => false,
    ExecutionStateInfo::Initializing
    | ExecutionStateInfo::Running
    | ExecutionStateInfo::Pausing
    | ExecutionStateInfo::Paused { .. }
    | ExecutionStateInfo::Resuming
    | ExecutionStateInfo::Recovering => true,
  };
  ActionLock { locked }
}

/// Push the lock for `state` onto the model.
pub fn apply_action_lock(model: &dyn WorkflowModel, state: &ExecutionStateInfo) -> ActionLock {
  let lock = lock_policy(state);
  if lock.locked {
    model.disable_workflow_modification();
  } else {
    model.enable_workflow_modification();
  }
  lock
}
