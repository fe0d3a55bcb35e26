//! Tests for the execution service against in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tessera_execution::{
  ChannelNotifier, ChannelTransport, CommandError, ExecutionConfig, ExecutionService,
  ExecutionState, ExecutionStateInfo, FatalErrorType, NotificationLevel, OperatorCurrentTuples,
  ReplayExecutionInfo, SharedWorkflowModel, StatusTracker, Timestamp, Transport, WorkerTuple,
  WorkflowEvent, WorkflowFatalError, WorkflowModel, WorkflowRequest,
};
use tessera_plan::{OperatorLink, OperatorPredicate, WorkflowGraph};
use tessera_session::{
  MemorySessionStore, PAGINATION_INFO_STORAGE_KEY, ResultPaginationInfo, SessionStore,
  SessionStoreExt,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingTransport {
  sent: Mutex<Vec<WorkflowRequest>>,
}

impl RecordingTransport {
  fn sent(&self) -> Vec<WorkflowRequest> {
    self.sent.lock().unwrap().clone()
  }
}

impl Transport for RecordingTransport {
  fn send(&self, request: WorkflowRequest) {
    self.sent.lock().unwrap().push(request);
  }
}

#[derive(Default)]
struct CountingStatusTracker {
  resets: AtomicUsize,
}

impl StatusTracker for CountingStatusTracker {
  fn reset_status(&self) {
    self.resets.fetch_add(1, Ordering::SeqCst);
  }
}

/// scan A -> filter B, with results requested for A and a missing C.
fn create_graph() -> WorkflowGraph {
  let mut graph = WorkflowGraph::default();
  graph
    .add_operator(
      OperatorPredicate::new("A", "CSVFileScan")
        .with_output_port("o1")
        .with_property("fileName", json!("data.csv")),
    )
    .unwrap();
  graph
    .add_operator(
      OperatorPredicate::new("B", "Filter")
        .with_input_port("i1")
        .with_output_port("o1")
        .with_property("condition", json!("x > 1")),
    )
    .unwrap();
  graph
    .add_link(OperatorLink::new("link-1", ("A", "o1"), ("B", "i1")))
    .unwrap();
  graph.operators_to_view_result.insert("A".to_string());
  graph.operators_to_view_result.insert("C".to_string());
  graph
}

struct Harness {
  service: ExecutionService,
  model: Arc<SharedWorkflowModel>,
  transport: Arc<RecordingTransport>,
  status: Arc<CountingStatusTracker>,
}

fn create_harness() -> Harness {
  let model = Arc::new(SharedWorkflowModel::new(create_graph()));
  let transport = Arc::new(RecordingTransport::default());
  let status = Arc::new(CountingStatusTracker::default());
  let service = ExecutionService::new(model.clone(), transport.clone())
    .with_status_tracker(status.clone());
  Harness {
    service,
    model,
    transport,
    status,
  }
}

fn state_event(state: ExecutionState) -> WorkflowEvent {
  WorkflowEvent::WorkflowStateEvent { state }
}

fn tuples_event(operator_id: &str) -> WorkflowEvent {
  WorkflowEvent::OperatorCurrentTuplesUpdateEvent(OperatorCurrentTuples {
    operator_id: operator_id.to_string(),
    tuples: vec![WorkerTuple {
      worker_id: format!("{}-w0", operator_id),
      tuple: vec![json!(1)],
    }],
  })
}

fn error_event(message: &str) -> WorkflowEvent {
  WorkflowEvent::WorkflowErrorEvent {
    fatal_errors: vec![WorkflowFatalError {
      error_type: FatalErrorType::ExecutionFailure,
      timestamp: Timestamp::default(),
      message: message.to_string(),
      details: String::new(),
      operator_id: "B".to_string(),
      worker_id: "B-w0".to_string(),
    }],
  }
}

fn execute_request(request: &WorkflowRequest) -> &tessera_execution::WorkflowExecuteRequest {
  match request {
    WorkflowRequest::WorkflowExecuteRequest(request) => request,
    other => panic!("expected execute request, got {}", other.type_name()),
  }
}

#[test]
fn test_running_paused_tuples_paused_sequence() {
  let mut h = create_harness();

  h.service.handle_event(state_event(ExecutionState::Running));
  h.service.handle_event(state_event(ExecutionState::Paused));
  assert_eq!(h.service.execution_state(), &ExecutionStateInfo::paused());

  h.service.handle_event(tuples_event("X"));
  let with_tuples = h.service.execution_state().clone();
  match &with_tuples {
    ExecutionStateInfo::Paused { current_tuples } => {
      assert_eq!(current_tuples.len(), 1);
      assert!(current_tuples.contains_key("X"));
    }
    other => panic!("expected Paused, got {:?}", other),
  }

  h.service.handle_event(state_event(ExecutionState::Paused));
  assert_eq!(h.service.execution_state(), &with_tuples);
}

#[test]
fn test_leaving_pause_resets_tuples() {
  let mut h = create_harness();

  h.service.handle_event(state_event(ExecutionState::Paused));
  h.service.handle_event(tuples_event("X"));
  h.service.handle_event(state_event(ExecutionState::Resuming));
  h.service.handle_event(state_event(ExecutionState::Paused));

  assert_eq!(h.service.execution_state(), &ExecutionStateInfo::paused());
}

#[test]
fn test_published_stream_has_no_equal_neighbours() {
  let mut h = create_harness();
  let mut rx = h.service.subscribe();

  for event in [
    state_event(ExecutionState::Initializing),
    state_event(ExecutionState::Running),
    state_event(ExecutionState::Running),
    state_event(ExecutionState::Paused),
    state_event(ExecutionState::Paused),
    tuples_event("X"),
    state_event(ExecutionState::Paused),
    state_event(ExecutionState::Failed),
    WorkflowEvent::Other,
  ] {
    h.service.handle_event(event);
  }

  let mut transitions = Vec::new();
  while let Ok(transition) = rx.try_recv() {
    assert_ne!(transition.previous, transition.current);
    transitions.push(transition);
  }
  assert_eq!(transitions.len(), 4);
  for pair in transitions.windows(2) {
    assert_eq!(pair[0].current, pair[1].previous);
  }
}

#[test]
fn test_pause_when_uninitialized_names_the_state() {
  let h = create_harness();

  let err = h.service.pause_workflow().unwrap_err();
  assert!(err.to_string().contains("Uninitialized"));
  assert!(h.transport.sent().is_empty());
}

#[test]
fn test_resume_requires_paused() {
  let mut h = create_harness();
  h.service.handle_event(state_event(ExecutionState::Running));

  let err = h.service.resume_workflow().unwrap_err();
  assert_eq!(
    err,
    CommandError::IllegalState {
      action: "resume workflow",
      state: ExecutionState::Running,
    }
  );

  h.service.pause_workflow().unwrap();
  assert_eq!(h.transport.sent(), vec![WorkflowRequest::WorkflowPauseRequest {}]);
}

#[test]
fn test_kill_and_checkpoint_guards() {
  let mut h = create_harness();
  assert!(h.service.kill_workflow().is_err());
  assert!(h.service.take_global_checkpoint().is_err());

  h.service.handle_event(state_event(ExecutionState::Running));
  h.service.kill_workflow().unwrap();
  h.service.take_global_checkpoint().unwrap();

  h.service.handle_event(state_event(ExecutionState::Completed));
  let err = h.service.take_global_checkpoint().unwrap_err();
  assert_eq!(
    err.to_string(),
    "cannot take checkpoint, the current execution state is Completed"
  );

  assert_eq!(
    h.transport.sent(),
    vec![
      WorkflowRequest::WorkflowKillRequest {},
      WorkflowRequest::WorkflowCheckpointRequest {},
    ]
  );
}

#[test]
fn test_debugging_commands_while_paused() {
  let mut h = create_harness();
  let workers = vec!["B-w0".to_string()];

  assert!(h.service.skip_tuples(workers.clone()).is_err());
  let err = h.service.retry_execution(workers.clone()).unwrap_err();
  assert!(err.to_string().starts_with("cannot retry the current tuple"));

  h.service.handle_event(state_event(ExecutionState::Paused));
  h.service.skip_tuples(workers.clone()).unwrap();
  h.service.retry_execution(workers.clone()).unwrap();

  assert_eq!(
    h.transport.sent(),
    vec![
      WorkflowRequest::SkipTupleRequest {
        workers: workers.clone()
      },
      WorkflowRequest::RetryRequest { workers },
    ]
  );
}

#[test]
fn test_modify_operator_logic() {
  let mut h = create_harness();

  let err = h.service.modify_operator_logic("B").unwrap_err();
  assert!(err.to_string().starts_with("cannot modify logic"));

  h.service.handle_event(state_event(ExecutionState::Paused));
  assert_eq!(
    h.service.modify_operator_logic("missing").unwrap_err(),
    CommandError::OperatorNotFound("missing".to_string())
  );

  h.service.modify_operator_logic("B").unwrap();
  let sent = h.transport.sent();
  let value = serde_json::to_value(&sent[0]).unwrap();
  assert_eq!(
    value,
    json!({
      "type": "ModifyLogicRequest",
      "operator": { "operatorID": "B", "operatorType": "Filter", "condition": "x > 1" }
    })
  );
}

#[test]
fn test_action_lock_follows_transitions() {
  let mut h = create_harness();
  let mut rx = h.service.subscribe();
  assert!(h.model.is_modification_enabled());

  h.service.handle_event(state_event(ExecutionState::Running));
  assert!(rx.try_recv().is_ok());
  assert!(!h.model.is_modification_enabled());

  h.service.handle_event(error_event("boom"));
  assert!(h.model.is_modification_enabled());
}

#[test]
fn test_failed_state_event_waits_for_error_details() {
  let mut h = create_harness();
  h.service.handle_event(state_event(ExecutionState::Running));

  h.service.handle_event(state_event(ExecutionState::Failed));
  assert_eq!(h.service.execution_state(), &ExecutionStateInfo::Running);
  assert!(h.service.is_failure_pending());

  h.service.handle_event(error_event("bad row\\nat line 3"));
  assert!(!h.service.is_failure_pending());
  assert_eq!(h.service.error_messages().len(), 1);
  assert_eq!(h.service.error_messages()[0].message, "bad row<br>at line 3");
}

#[test]
fn test_reconfiguration_notifications() {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let mut h = create_harness();
  h.service = h.service.with_notifier(Arc::new(ChannelNotifier::new(tx)));

  h.service.handle_event(WorkflowEvent::ModifyLogicResponse {
    is_valid: false,
    error_message: Some("schema mismatch".to_string()),
  });
  h.service.handle_event(WorkflowEvent::ModifyLogicResponse {
    is_valid: true,
    error_message: None,
  });
  h.service.handle_event(WorkflowEvent::ModifyLogicCompletedEvent {
    op_ids: vec!["A".to_string(), "B".to_string()],
  });

  let rejected = rx.try_recv().unwrap();
  assert_eq!(rejected.level, NotificationLevel::Error);
  assert_eq!(rejected.message, "schema mismatch");
  assert_eq!(rx.try_recv().unwrap().message, "reconfiguration registered");
  assert_eq!(
    rx.try_recv().unwrap().message,
    "reconfiguration on operator(s) A,B complete"
  );
  assert_eq!(h.service.execution_state(), &ExecutionStateInfo::Uninitialized);
}

#[tokio::test(start_paused = true)]
async fn test_submit_resets_previous_failure() {
  let mut h = create_harness();
  h.service.handle_event(WorkflowEvent::WorkerAssignmentUpdateEvent {
    operator_id: "B".to_string(),
    worker_ids: vec!["B-w0".to_string()],
  });
  h.service.handle_event(state_event(ExecutionState::Running));
  h.service.handle_event(error_event("boom"));

  let mut rx = h.service.subscribe();
  let handle = h.service.execute_workflow("run 2", None).unwrap();

  let transition = rx.try_recv().unwrap();
  assert_eq!(transition.previous.state(), ExecutionState::Failed);
  assert_eq!(transition.current, ExecutionStateInfo::Uninitialized);
  assert!(h.service.worker_ids("B").is_empty());
  assert_eq!(h.status.resets.load(Ordering::SeqCst), 1);

  handle.await.unwrap();
  let sent = h.transport.sent();
  assert_eq!(sent.len(), 1);
  let request = execute_request(&sent[0]);
  assert_eq!(request.execution_name, "run 2");
  assert_eq!(request.engine_version, h.service.config().engine_version);
  assert_eq!(request.logical_plan.operators.len(), 2);
  assert_eq!(request.logical_plan.ops_to_view_result.len(), 1);
  assert!(request.logical_plan.ops_to_view_result.contains("A"));
  assert_eq!(request.computing_unit_id, None);
}

#[tokio::test(start_paused = true)]
async fn test_translation_failure_leaves_state_untouched() {
  let mut h = create_harness();
  h.service.handle_event(state_event(ExecutionState::Running));

  let err = h.service.execute_workflow("run", Some("missing")).unwrap_err();
  assert!(matches!(err, CommandError::Plan(_)));
  assert_eq!(h.service.execution_state(), &ExecutionStateInfo::Running);
  assert_eq!(h.status.resets.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_execute_request_is_debounced() {
  let (tx, mut requests) = mpsc::unbounded_channel();
  let model = Arc::new(SharedWorkflowModel::new(create_graph()));
  let config = ExecutionConfig {
    engine_version: "test-engine".to_string(),
    ..ExecutionConfig::default()
  };
  let mut service =
    ExecutionService::with_config(model, Arc::new(ChannelTransport::new(tx)), config);
  service.select_computing_unit(Some(7));

  let handle = service.execute_workflow("run", Some("B")).unwrap();

  tokio::time::sleep(Duration::from_millis(100)).await;
  assert!(requests.try_recv().is_err());

  handle.await.unwrap();
  let request = requests.try_recv().unwrap();
  let request = execute_request(&request);
  assert_eq!(request.engine_version, "test-engine");
  assert_eq!(request.computing_unit_id, Some(7));
  assert!(!request.email_notification_enabled);
}

#[tokio::test(start_paused = true)]
async fn test_replay_submission() {
  let mut h = create_harness();

  let handle = h
    .service
    .execute_workflow_with_replay(ReplayExecutionInfo {
      eid: 12,
      interaction: "checkpoint-3".to_string(),
    })
    .unwrap();
  handle.await.unwrap();

  let sent = h.transport.sent();
  let request = execute_request(&sent[0]);
  assert_eq!(request.execution_name, "Replay run of 12 to checkpoint-3");
  assert_eq!(
    request.replay_from_execution,
    Some(ReplayExecutionInfo {
      eid: 12,
      interaction: "checkpoint-3".to_string(),
    })
  );
  assert_eq!(request.logical_plan.operators.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_email_notification_flag_is_sent() {
  let mut h = create_harness();

  let handle = h
    .service
    .execute_workflow_with_email_notification("run", true, None)
    .unwrap();
  handle.await.unwrap();

  assert!(execute_request(&h.transport.sent()[0]).email_notification_enabled);
}

#[tokio::test(start_paused = true)]
async fn test_pagination_record_flagged_only_when_present() {
  let mut h = create_harness();
  let session = Arc::new(MemorySessionStore::new());
  h.service = h.service.with_session_store(session.clone());

  h.service.execute_workflow("first", None).unwrap();
  assert!(session.get(PAGINATION_INFO_STORAGE_KEY).is_none());

  session
    .set_object(
      PAGINATION_INFO_STORAGE_KEY,
      &ResultPaginationInfo {
        new_workflow_executed: false,
        current_page_index: 2,
        operator_id: Some("A".to_string()),
      },
    )
    .unwrap();
  h.service.execute_workflow("second", None).unwrap();

  let info: ResultPaginationInfo = session
    .get_object(PAGINATION_INFO_STORAGE_KEY)
    .unwrap()
    .unwrap();
  assert!(info.new_workflow_executed);
  assert_eq!(info.current_page_index, 2);
}

#[tokio::test]
async fn test_run_applies_events_in_order_and_handles_disconnect() {
  let mut h = create_harness();
  let (tx, rx) = mpsc::channel(8);

  tx.send(state_event(ExecutionState::Running)).await.unwrap();
  tx.send(state_event(ExecutionState::Failed)).await.unwrap();
  drop(tx);

  h.service.run(rx, CancellationToken::new()).await;

  assert_eq!(
    h.service.execution_state(),
    &ExecutionStateInfo::Failed {
      error_messages: Vec::new()
    }
  );
  assert!(!h.service.is_failure_pending());
  assert!(h.model.is_modification_enabled());
}

#[tokio::test]
async fn test_run_stops_on_cancel() {
  let mut h = create_harness();
  let (tx, rx) = mpsc::channel(8);
  let cancel = CancellationToken::new();
  cancel.cancel();

  h.service.run(rx, cancel).await;

  tx.send(state_event(ExecutionState::Running)).await.unwrap_err();
  assert_eq!(h.service.execution_state(), &ExecutionStateInfo::Uninitialized);
}

#[test]
fn test_repeated_failure_keeps_error_details_on_disconnect() {
  let mut h = create_harness();
  let mut rx = h.service.subscribe();
  h.service.handle_event(state_event(ExecutionState::Running));

  h.service.handle_event(state_event(ExecutionState::Failed));
  h.service.handle_event(error_event("boom"));
  h.service.handle_event(state_event(ExecutionState::Failed));
  h.service.handle_event(error_event("boom"));
  assert!(!h.service.is_failure_pending());

  h.service.handle_disconnect();

  assert_eq!(h.service.error_messages().len(), 1);
  assert_eq!(h.service.error_messages()[0].message, "boom");
  let mut transitions = 0;
  while rx.try_recv().is_ok() {
    transitions += 1;
  }
  // Uninitialized -> Running -> Failed, nothing after
  assert_eq!(transitions, 2);
}

#[test]
fn test_submit_outside_runtime_changes_nothing() {
  let mut h = create_harness();
  h.service.handle_event(WorkflowEvent::WorkerAssignmentUpdateEvent {
    operator_id: "B".to_string(),
    worker_ids: vec!["B-w0".to_string()],
  });
  h.service.handle_event(state_event(ExecutionState::Running));
  h.service.handle_event(error_event("boom"));
  let before = h.service.execution_state().clone();

  let err = h.service.execute_workflow("run", None).unwrap_err();
  assert_eq!(err, CommandError::NoRuntime);

  let err = h
    .service
    .execute_workflow_with_replay(ReplayExecutionInfo {
      eid: 1,
      interaction: "i".to_string(),
    })
    .unwrap_err();
  assert_eq!(err, CommandError::NoRuntime);

  assert_eq!(h.service.execution_state(), &before);
  assert_eq!(h.service.worker_ids("B"), ["B-w0"]);
  assert_eq!(h.status.resets.load(Ordering::SeqCst), 0);
  assert!(h.transport.sent().is_empty());
}
