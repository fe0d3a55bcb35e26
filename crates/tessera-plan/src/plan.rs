use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::operator::PortDescriptor;

/// An operator in the backend's logical plan.
///
/// The editor's operator properties are flattened next to the identifying
/// fields, which is the shape the backend deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalOperator {
  #[serde(rename = "operatorID")]
  pub operator_id: String,
  pub operator_type: String,
  pub input_ports: Vec<PortDescriptor>,
  pub output_ports: Vec<PortDescriptor>,
  #[serde(flatten)]
  pub properties: serde_json::Map<String, serde_json::Value>,
}

/// Wire address of a port: its ordinal within the operator's port list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortIdentity {
  pub id: usize,
  /// Reserved; always false for links drawn in the editor.
  pub internal: bool,
}

impl PortIdentity {
  pub fn external(id: usize) -> Self {
    Self {
      id,
      internal: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalLink {
  pub from_op_id: String,
  pub from_port_id: PortIdentity,
  pub to_op_id: String,
  pub to_port_id: PortIdentity,
}

/// The plan submitted to the backend for execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalPlan {
  pub operators: Vec<LogicalOperator>,
  pub links: Vec<LogicalLink>,
  pub ops_to_view_result: BTreeSet<String>,
  pub ops_to_reuse_result: BTreeSet<String>,
}
