//! Requests sent to the backend over the workflow connection.

use serde::{Deserialize, Serialize};
use tessera_plan::{LogicalPlan, OperatorPredicate};

/// Backend tuning that travels with every execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSettings {
  pub data_transfer_batch_size: u32,
}

impl Default for WorkflowSettings {
  fn default() -> Self {
    Self {
      data_transfer_batch_size: 400,
    }
  }
}

/// Identifies an earlier execution and the interaction to replay up to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayExecutionInfo {
  pub eid: u64,
  pub interaction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecuteRequest {
  pub execution_name: String,
  pub engine_version: String,
  pub logical_plan: LogicalPlan,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub replay_from_execution: Option<ReplayExecutionInfo>,
  pub workflow_settings: WorkflowSettings,
  pub email_notification_enabled: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub computing_unit_id: Option<u32>,
}

/// The operator snapshot sent when changing an operator's logic mid-run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorLogic {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  pub operator_type: String,
  #[serde(flatten)]
  pub properties: serde_json::Map<String, serde_json::Value>,
}

impl From<&OperatorPredicate> for OperatorLogic {
  fn from(op: &OperatorPredicate) -> Self {
    let mut properties = op.operator_properties.clone();
    properties.remove("operatorID");
    properties.remove("operatorType");
    Self {
      operator_id: op.operator_id.clone(),
      operator_type: op.operator_type.clone(),
      properties,
    }
  }
}

/// An outbound request, tagged by its `type` field on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkflowRequest {
  WorkflowExecuteRequest(WorkflowExecuteRequest),
  WorkflowPauseRequest {},
  WorkflowResumeRequest {},
  WorkflowKillRequest {},
  WorkflowCheckpointRequest {},
  SkipTupleRequest { workers: Vec<String> },
  RetryRequest { workers: Vec<String> },
  ModifyLogicRequest { operator: OperatorLogic },
}

impl WorkflowRequest {
  /// The wire `type` of this request, for logging.
  pub fn type_name(&self) -> &'static str {
    match self {
      WorkflowRequest::WorkflowExecuteRequest(_) => "WorkflowExecuteRequest",
      WorkflowRequest::WorkflowPauseRequest {} => "WorkflowPauseRequest",
      WorkflowRequest::WorkflowResumeRequest {} => "WorkflowResumeRequest",
      WorkflowRequest::WorkflowKillRequest {} => "WorkflowKillRequest",
      WorkflowRequest::WorkflowCheckpointRequest {} => "WorkflowCheckpointRequest",
      WorkflowRequest::SkipTupleRequest { .. } => "SkipTupleRequest",
      WorkflowRequest::RetryRequest { .. } => "RetryRequest",
      WorkflowRequest::ModifyLogicRequest { .. } => "ModifyLogicRequest",
    }
  }
}
