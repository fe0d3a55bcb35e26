//! Events pushed by the backend over the workflow connection.

use serde::{Deserialize, Serialize};

use crate::state::{ExecutionState, OperatorCurrentTuples, WorkflowFatalError};

/// An inbound event, tagged by its `type` field on the wire.
///
/// Event types this client does not handle deserialize as `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowEvent {
  WorkerAssignmentUpdateEvent {
    #[serde(rename = "operatorId")]
    operator_id: String,
    #[serde(rename = "workerIds")]
    worker_ids: Vec<String>,
  },

  WorkflowStateEvent {
    state: ExecutionState,
  },

  RecoveryStartedEvent {},

  OperatorCurrentTuplesUpdateEvent(OperatorCurrentTuples),

  WorkflowErrorEvent {
    #[serde(rename = "fatalErrors")]
    fatal_errors: Vec<WorkflowFatalError>,
  },

  ModifyLogicResponse {
    #[serde(rename = "isValid")]
    is_valid: bool,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
  },

  ModifyLogicCompletedEvent {
    #[serde(rename = "opIds")]
    op_ids: Vec<String>,
  },

  #[serde(other)]
  Other,
}

impl WorkflowEvent {
  /// The wire `type` of this event, for logging.
  pub fn type_name(&self) -> &'static str {
    match self {
      WorkflowEvent::WorkerAssignmentUpdateEvent { .. } => "WorkerAssignmentUpdateEvent",
      WorkflowEvent::WorkflowStateEvent { .. } => "WorkflowStateEvent",
      WorkflowEvent::RecoveryStartedEvent {} => "RecoveryStartedEvent",
      WorkflowEvent::OperatorCurrentTuplesUpdateEvent(_) => "OperatorCurrentTuplesUpdateEvent",
      WorkflowEvent::WorkflowErrorEvent { .. } => "WorkflowErrorEvent",
      WorkflowEvent::ModifyLogicResponse { .. } => "ModifyLogicResponse",
      WorkflowEvent::ModifyLogicCompletedEvent { .. } => "ModifyLogicCompletedEvent",
      WorkflowEvent::Other => "Other",
    }
  }
}
