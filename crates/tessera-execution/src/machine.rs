//! The execution state machine.
//!
//! `apply` is a pure function from the current state and one inbound event to
//! the next state. Whether the result counts as a transition is decided by the
//! caller, which compares it against the current state.

use crate::event::WorkflowEvent;
use crate::state::{ExecutionState, ExecutionStateInfo, WorkflowFatalError};

/// What the backend's escaped newlines are rewritten to.
pub const LINE_BREAK_MARKER: &str = "<br>";

/// Compute the state an event moves the execution to.
///
/// Returns `None` when the event leaves the state unchanged or is not a state
/// event at all.
pub fn apply(current: &ExecutionStateInfo, event: &WorkflowEvent) -> Option<ExecutionStateInfo> {
  match event {
    WorkflowEvent::WorkflowStateEvent { state } => match state {
      ExecutionState::Paused => match current {
        ExecutionStateInfo::Paused { .. } => None,
        _ => Some(ExecutionStateInfo::paused()),
      },
      // The backend follows this with a WorkflowErrorEvent carrying the errors.
      ExecutionState::Failed => None,
      other => Some(ExecutionStateInfo::from_state(*other)),
    },

    WorkflowEvent::RecoveryStartedEvent {} => Some(ExecutionStateInfo::Recovering),

    WorkflowEvent::OperatorCurrentTuplesUpdateEvent(update) => {
      let mut current_tuples = match current {
        ExecutionStateInfo::Paused { current_tuples } => current_tuples.clone(),
        _ => Default::default(),
      };
      current_tuples.insert(update.operator_id.clone(), update.clone());
      Some(ExecutionStateInfo::Paused { current_tuples })
    }

    WorkflowEvent::WorkflowErrorEvent { fatal_errors } => Some(ExecutionStateInfo::Failed {
      error_messages: fatal_errors.iter().map(with_line_breaks).collect(),
    }),

    WorkflowEvent::WorkerAssignmentUpdateEvent { .. }
    | WorkflowEvent::ModifyLogicResponse { .. }
    | WorkflowEvent::ModifyLogicCompletedEvent { .. }
    | WorkflowEvent::Other => None,
  }
}

fn with_line_breaks(error: &WorkflowFatalError) -> WorkflowFatalError {
  WorkflowFatalError {
    message: error.message.replace("\\n", LINE_BREAK_MARKER),
    ..error.clone()
  }
}
