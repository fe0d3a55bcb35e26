//! The execution service.
//!
//! `ExecutionService` owns the client's view of one workflow execution. It
//! folds backend events into the current state, keeps the workflow model's
//! edit lock in step with that state, and turns user commands into requests.

use std::collections::HashMap;
use std::sync::Arc;

use tessera_plan::{LogicalPlan, translate};
use tessera_session::{MemorySessionStore, SessionStore, mark_new_workflow_executed};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ExecutionConfig;
use crate::error::CommandError;
use crate::event::WorkflowEvent;
use crate::lock::apply_action_lock;
use crate::machine::apply;
use crate::model::WorkflowModel;
use crate::notify::{LogNotifier, Notifier};
use crate::request::{
  OperatorLogic, ReplayExecutionInfo, WorkflowExecuteRequest, WorkflowRequest,
};
use crate::state::{ExecutionState, ExecutionStateInfo, StateTransition, WorkflowFatalError};
use crate::status::{NoopStatusTracker, StatusTracker};
use crate::transport::Transport;

/// Tracks one workflow execution and dispatches commands for it.
///
/// All execution state is mutated through `&mut self`. Observers follow
/// state changes through [`ExecutionService::subscribe`].
pub struct ExecutionService {
  model: Arc<dyn WorkflowModel>,
  transport: Arc<dyn Transport>,
  notifier: Arc<dyn Notifier>,
  status: Arc<dyn StatusTracker>,
  session: Arc<dyn SessionStore>,
  config: ExecutionConfig,

  state: ExecutionStateInfo,
  /// Worker IDs per operator, as last assigned by the backend.
  worker_ids: HashMap<String, Vec<String>>,
  /// Set by a `Failed` state event until the matching error event arrives.
  failure_pending: bool,
  computing_unit_id: Option<u32>,
  transitions: broadcast::Sender<StateTransition>,
}

impl ExecutionService {
  pub fn new(model: Arc<dyn WorkflowModel>, transport: Arc<dyn Transport>) -> Self {
    Self::with_config(model, transport, ExecutionConfig::default())
  }

  pub fn with_config(
    model: Arc<dyn WorkflowModel>,
    transport: Arc<dyn Transport>,
    config: ExecutionConfig,
  ) -> Self {
    let (transitions, _) = broadcast::channel(config.state_stream_capacity.max(1));
    Self {
      model,
      transport,
      notifier: Arc::new(LogNotifier),
      status: Arc::new(NoopStatusTracker),
      session: Arc::new(MemorySessionStore::new()),
      config,
      state: ExecutionStateInfo::Uninitialized,
      worker_ids: HashMap::new(),
      failure_pending: false,
      computing_unit_id: None,
      transitions,
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_status_tracker(mut self, status: Arc<dyn StatusTracker>) -> Self {
    self.status = status;
    self
  }

  pub fn with_session_store(mut self, session: Arc<dyn SessionStore>) -> Self {
    self.session = session;
    self
  }

  pub fn config(&self) -> &ExecutionConfig {
    &self.config
  }

  pub fn execution_state(&self) -> &ExecutionStateInfo {
    &self.state
  }

  /// Errors of the current execution; empty unless it failed.
  pub fn error_messages(&self) -> &[WorkflowFatalError] {
    match &self.state {
      ExecutionStateInfo::Failed { error_messages } => error_messages,
      _ => &[],
    }
  }

  pub fn worker_ids(&self, operator_id: &str) -> &[String] {
    self
      .worker_ids
      .get(operator_id)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn is_failure_pending(&self) -> bool {
    self.failure_pending
  }

  /// Choose the computing unit new executions are submitted to.
  pub fn select_computing_unit(&mut self, computing_unit_id: Option<u32>) {
    self.computing_unit_id = computing_unit_id;
  }

  /// Stream of accepted state transitions.
  pub fn subscribe(&self) -> broadcast::Receiver<StateTransition> {
    self.transitions.subscribe()
  }

  /// Fold one backend event into the execution.
  pub fn handle_event(&mut self, event: WorkflowEvent) {
    debug!(event_type = %event.type_name(), "workflow event received");

    match &event {
      WorkflowEvent::WorkerAssignmentUpdateEvent {
        operator_id,
        worker_ids,
      } => {
        self.worker_ids.insert(operator_id.clone(), worker_ids.clone());
        return;
      }
      WorkflowEvent::WorkflowStateEvent {
        state: ExecutionState::Failed,
      } => {
        // A repeated Failed after the details arrived must not re-arm the fallback
        if !matches!(self.state, ExecutionStateInfo::Failed { .. }) {
          self.failure_pending = true;
          warn!("execution reported failed, waiting for error details");
        }
      }
      WorkflowEvent::WorkflowErrorEvent { .. } => {
        self.failure_pending = false;
      }
      WorkflowEvent::ModifyLogicResponse {
        is_valid,
        error_message,
      } => {
        if *is_valid {
          self.notifier.info("reconfiguration registered");
        } else {
          self
            .notifier
            .error(error_message.as_deref().unwrap_or("reconfiguration rejected"));
        }
      }
      WorkflowEvent::ModifyLogicCompletedEvent { op_ids } => {
        self.notifier.info(&format!(
          "reconfiguration on operator(s) {} complete",
          op_ids.join(",")
        ));
      }
      _ => {}
    }

    if let Some(next) = apply(&self.state, &event) {
      self.update_execution_state(next);
    }
  }

  /// Called when the workflow connection closes.
  ///
  /// A failure announced without its error details becomes `Failed` with no
  /// messages.
  pub fn handle_disconnect(&mut self) {
    if !self.failure_pending {
      return;
    }
    warn!("workflow connection closed before failure details arrived");
    self.failure_pending = false;
    self.update_execution_state(ExecutionStateInfo::Failed {
      error_messages: Vec::new(),
    });
  }

  /// Process events until the channel closes or `cancel` fires.
  pub async fn run(&mut self, mut events: mpsc::Receiver<WorkflowEvent>, cancel: CancellationToken) {
    info!("starting execution event loop");

    loop {
      tokio::select! {
        _ = cancel.cancelled() => {
          info!("execution event loop cancelled");
          break;
        }
        event = events.recv() => {
          match event {
            Some(event) => self.handle_event(event),
            None => {
              info!("workflow connection closed");
              self.handle_disconnect();
              break;
            }
          }
        }
      }
    }
  }

  /// Submit the workflow, or the part of it feeding `target_operator_id`.
  pub fn execute_workflow(
    &mut self,
    execution_name: &str,
    target_operator_id: Option<&str>,
  ) -> Result<JoinHandle<()>, CommandError> {
    self.execute_workflow_with_email_notification(execution_name, false, target_operator_id)
  }

  pub fn execute_workflow_with_email_notification(
    &mut self,
    execution_name: &str,
    email_notification_enabled: bool,
    target_operator_id: Option<&str>,
  ) -> Result<JoinHandle<()>, CommandError> {
    let logical_plan = translate(&self.model.graph(), target_operator_id)?;
    current_runtime()?;
    self.prepare_submission();
    self.send_execution_request(
      execution_name,
      logical_plan,
      None,
      email_notification_enabled,
    )
  }

  /// Re-run an earlier execution up to one of its recorded interactions.
  pub fn execute_workflow_with_replay(
    &mut self,
    replay: ReplayExecutionInfo,
  ) -> Result<JoinHandle<()>, CommandError> {
    let logical_plan = translate(&self.model.graph(), None)?;
    current_runtime()?;
    self.prepare_submission();
    let execution_name = format!("Replay run of {} to {}", replay.eid, replay.interaction);
    self.send_execution_request(&execution_name, logical_plan, Some(replay), false)
  }

  /// Build an execute request and send it once the debounce delay elapses.
  ///
  /// The returned handle completes after the send; dropping it does not
  /// cancel the send. Must be called from within a tokio runtime.
  pub fn send_execution_request(
    &self,
    execution_name: &str,
    logical_plan: LogicalPlan,
    replay_from_execution: Option<ReplayExecutionInfo>,
    email_notification_enabled: bool,
  ) -> Result<JoinHandle<()>, CommandError> {
    let runtime = current_runtime()?;
    if self.computing_unit_id.is_none() {
      warn!("no computing unit selected for workflow execution");
    }

    let request = WorkflowRequest::WorkflowExecuteRequest(WorkflowExecuteRequest {
      execution_name: execution_name.to_string(),
      engine_version: self.config.engine_version.clone(),
      logical_plan,
      replay_from_execution,
      workflow_settings: self.model.workflow_settings(),
      email_notification_enabled,
      computing_unit_id: self.computing_unit_id,
    });

    info!(
      execution_name = %execution_name,
      computing_unit_id = ?self.computing_unit_id,
      "submitting workflow execution"
    );

    let transport = Arc::clone(&self.transport);
    let debounce = self.config.debounce;
    let handle = runtime.spawn(async move {
      tokio::time::sleep(debounce).await;
      transport.send(request);
    });

    if let Err(e) = mark_new_workflow_executed(self.session.as_ref()) {
      warn!(error = %e, "failed to flag stored result pagination");
    }

    Ok(handle)
  }

  /// Forget the previous execution.
  pub fn reset_execution_state(&mut self) {
    self.worker_ids.clear();
    self.failure_pending = false;
    self.update_execution_state(ExecutionStateInfo::Uninitialized);
  }

  pub fn pause_workflow(&self) -> Result<(), CommandError> {
    self.require(
      "pause workflow",
      matches!(self.state, ExecutionStateInfo::Running),
    )?;
    self.transport.send(WorkflowRequest::WorkflowPauseRequest {});
    Ok(())
  }

  pub fn resume_workflow(&self) -> Result<(), CommandError> {
    self.require("resume workflow", self.is_paused())?;
    self.transport.send(WorkflowRequest::WorkflowResumeRequest {});
    Ok(())
  }

  pub fn kill_workflow(&self) -> Result<(), CommandError> {
    self.require("kill workflow", self.has_started_and_not_completed())?;
    self.transport.send(WorkflowRequest::WorkflowKillRequest {});
    Ok(())
  }

  pub fn take_global_checkpoint(&self) -> Result<(), CommandError> {
    self.require("take checkpoint", self.has_started_and_not_completed())?;
    self.transport.send(WorkflowRequest::WorkflowCheckpointRequest {});
    Ok(())
  }

  pub fn skip_tuples(&self, workers: Vec<String>) -> Result<(), CommandError> {
    self.require("skip tuples", self.is_paused())?;
    self.transport.send(WorkflowRequest::SkipTupleRequest { workers });
    Ok(())
  }

  pub fn retry_execution(&self, workers: Vec<String>) -> Result<(), CommandError> {
    self.require("retry the current tuple", self.is_paused())?;
    self.transport.send(WorkflowRequest::RetryRequest { workers });
    Ok(())
  }

  /// Push an operator's edited logic into the paused execution.
  pub fn modify_operator_logic(&self, operator_id: &str) -> Result<(), CommandError> {
    self.require("modify logic", self.is_paused())?;
    let operator = self
      .model
      .operator(operator_id)
      .ok_or_else(|| CommandError::OperatorNotFound(operator_id.to_string()))?;
    self.transport.send(WorkflowRequest::ModifyLogicRequest {
      operator: OperatorLogic::from(&operator),
    });
    Ok(())
  }

  fn prepare_submission(&mut self) {
    self.reset_execution_state();
    self.status.reset_status();
  }

  fn is_paused(&self) -> bool {
    matches!(self.state, ExecutionStateInfo::Paused { .. })
  }

  fn has_started_and_not_completed(&self) -> bool {
    !matches!(
      self.state,
      ExecutionStateInfo::Uninitialized | ExecutionStateInfo::Completed
    )
  }

  fn require(&self, action: &'static str, allowed: bool) -> Result<(), CommandError> {
    if allowed {
      Ok(())
    } else {
      Err(CommandError::IllegalState {
        action,
        state: self.state.state(),
      })
    }
  }

  /// Accept `next` if it differs from the current state. The model's lock is
  /// updated before the transition is published.
  fn update_execution_state(&mut self, next: ExecutionStateInfo) -> bool {
    if next == self.state {
      return false;
    }

    let previous = std::mem::replace(&mut self.state, next);
    self.failure_pending = false;
    let lock = apply_action_lock(self.model.as_ref(), &self.state);

    info!(
      previous = %previous.state(),
      current = %self.state.state(),
      locked = lock.locked,
      "execution state changed"
    );

    // No subscribers is fine
    let _ = self.transitions.send(StateTransition {
      previous,
      current: self.state.clone(),
    });
    true
  }
}

fn current_runtime() -> Result<Handle, CommandError> {
  Handle::try_current().map_err(|_| CommandError::NoRuntime)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::SharedWorkflowModel;
  use crate::transport::NoopTransport;
  use tessera_plan::WorkflowGraph;

  fn service() -> ExecutionService {
    let model = Arc::new(SharedWorkflowModel::new(WorkflowGraph::default()));
    ExecutionService::new(model, Arc::new(NoopTransport))
  }

  #[test]
  fn test_starts_uninitialized() {
    let service = service();
    assert_eq!(service.execution_state(), &ExecutionStateInfo::Uninitialized);
    assert!(service.error_messages().is_empty());
  }

  #[test]
  fn test_worker_assignment_is_recorded() {
    let mut service = service();
    service.handle_event(WorkflowEvent::WorkerAssignmentUpdateEvent {
      operator_id: "X".to_string(),
      worker_ids: vec!["X-w0".to_string(), "X-w1".to_string()],
    });

    assert_eq!(service.worker_ids("X"), ["X-w0", "X-w1"]);
    assert!(service.worker_ids("Y").is_empty());
    assert_eq!(service.execution_state(), &ExecutionStateInfo::Uninitialized);
  }

  #[test]
  fn test_repeated_state_is_not_a_transition() {
    let mut service = service();
    let mut rx = service.subscribe();

    let running = WorkflowEvent::WorkflowStateEvent {
      state: ExecutionState::Running,
    };
    service.handle_event(running.clone());
    service.handle_event(running);

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
  }

  #[test]
  fn test_reset_without_change_publishes_nothing() {
    let mut service = service();
    let mut rx = service.subscribe();
    service.reset_execution_state();
    assert!(rx.try_recv().is_err());
  }

  #[test]
  fn test_disconnect_without_pending_failure_keeps_state() {
    let mut service = service();
    service.handle_event(WorkflowEvent::WorkflowStateEvent {
      state: ExecutionState::Running,
    });
    service.handle_disconnect();
    assert_eq!(service.execution_state(), &ExecutionStateInfo::Running);
  }
}
