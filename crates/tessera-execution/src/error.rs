use tessera_plan::PlanError;
use thiserror::Error;

use crate::state::ExecutionState;

/// Why a user command was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
  #[error("cannot {action}, the current execution state is {state}")]
  IllegalState {
    action: &'static str,
    state: ExecutionState,
  },

  #[error("operator not found: {0}")]
  OperatorNotFound(String),

  #[error("failed to build logical plan: {0}")]
  Plan(#[from] PlanError),

  #[error("cannot submit an execution outside a tokio runtime")]
  NoRuntime,
}

/// Errors raised when editing the workflow model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
  #[error("workflow modification is disabled while the execution is active")]
  ModificationDisabled,

  #[error(transparent)]
  Plan(#[from] PlanError),
}
