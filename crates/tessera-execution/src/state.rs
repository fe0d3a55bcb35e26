//! Execution state as the client tracks it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of an execution state, without payload.
///
/// This is what the server sends in `WorkflowStateEvent`, and what error
/// messages print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionState {
  Uninitialized,
  Initializing,
  Running,
  Pausing,
  Paused,
  Resuming,
  Recovering,
  Completed,
  Failed,
  Killed,
}

impl fmt::Display for ExecutionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ExecutionState::Uninitialized => "Uninitialized",
      ExecutionState::Initializing => "Initializing",
      ExecutionState::Running => "Running",
      ExecutionState::Pausing => "Pausing",
      ExecutionState::Paused => "Paused",
      ExecutionState::Resuming => "Resuming",
      ExecutionState::Recovering => "Recovering",
      ExecutionState::Completed => "Completed",
      ExecutionState::Failed => "Failed",
      ExecutionState::Killed => "Killed",
    };
    f.write_str(name)
  }
}

/// The tuple a single worker is currently holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerTuple {
  #[serde(rename = "workerID")]
  pub worker_id: String,
  #[serde(default)]
  pub tuple: Vec<serde_json::Value>,
}

/// Tuples held by each worker of one operator while the workflow is paused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorCurrentTuples {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  #[serde(default)]
  pub tuples: Vec<WorkerTuple>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FatalErrorType {
  CompilationError,
  ExecutionFailure,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
  pub seconds: i64,
  #[serde(default)]
  pub nanos: i32,
}

/// A fatal error reported by the backend for a failed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowFatalError {
  #[serde(rename = "type")]
  pub error_type: FatalErrorType,
  #[serde(default)]
  pub timestamp: Timestamp,
  pub message: String,
  #[serde(default)]
  pub details: String,
  #[serde(default)]
  pub operator_id: String,
  #[serde(default)]
  pub worker_id: String,
}

/// Execution state plus the payload that only exists in some states.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum ExecutionStateInfo {
  #[default]
  Uninitialized,
  Initializing,
  Running,
  Pausing,
  Paused {
    #[serde(rename = "currentTuples", default)]
    current_tuples: HashMap<String, OperatorCurrentTuples>,
  },
  Resuming,
  Recovering,
  Completed,
  Failed {
    #[serde(rename = "errorMessages", default)]
    error_messages: Vec<WorkflowFatalError>,
  },
  Killed,
}

impl ExecutionStateInfo {
  /// `Paused` with no tuples recorded yet.
  pub fn paused() -> Self {
    ExecutionStateInfo::Paused {
      current_tuples: HashMap::new(),
    }
  }

  /// The state with an empty payload where the state carries one.
  pub fn from_state(state: ExecutionState) -> Self {
    match state {
      ExecutionState::Uninitialized => ExecutionStateInfo::Uninitialized,
      ExecutionState::Initializing => ExecutionStateInfo::Initializing,
      ExecutionState::Running => ExecutionStateInfo::Running,
      ExecutionState::Pausing => ExecutionStateInfo::Pausing,
      ExecutionState::Paused => ExecutionStateInfo::paused(),
      ExecutionState::Resuming => ExecutionStateInfo::Resuming,
      ExecutionState::Recovering => ExecutionStateInfo::Recovering,
      ExecutionState::Completed => ExecutionStateInfo::Completed,
      ExecutionState::Failed => ExecutionStateInfo::Failed {
        error_messages: Vec::new(),
      },
      ExecutionState::Killed => ExecutionStateInfo::Killed,
    }
  }

  pub fn state(&self) -> ExecutionState {
    match self {
      ExecutionStateInfo::Uninitialized => ExecutionState::Uninitialized,
      ExecutionStateInfo::Initializing => ExecutionState::Initializing,
      ExecutionStateInfo::Running => ExecutionState::Running,
      ExecutionStateInfo::Pausing => ExecutionState::Pausing,
      ExecutionStateInfo::Paused { .. } => ExecutionState::Paused,
      ExecutionStateInfo::Resuming => ExecutionState::Resuming,
      ExecutionStateInfo::Recovering => ExecutionState::Recovering,
      ExecutionStateInfo::Completed => ExecutionState::Completed,
      ExecutionStateInfo::Failed { .. } => ExecutionState::Failed,
      ExecutionStateInfo::Killed => ExecutionState::Killed,
    }
  }
}

/// One accepted change of execution state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
  pub previous: ExecutionStateInfo,
  pub current: ExecutionStateInfo,
}
