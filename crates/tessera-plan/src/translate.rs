//! Graph to logical plan translation.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::error::{PlanError, PortDirection};
use crate::graph::WorkflowGraph;
use crate::operator::{OperatorLink, OperatorPredicate};
use crate::plan::{LogicalLink, LogicalOperator, LogicalPlan, PortIdentity};

/// Keys the plan sets explicitly; an operator property with one of these
/// names would otherwise be serialized twice.
const RESERVED_KEYS: [&str; 4] = ["operatorID", "operatorType", "inputPorts", "outputPorts"];

/// Translate a workflow graph into a logical plan.
///
/// With a `target_operator_id`, only the target and the operators feeding it
/// are included. Result-viewing and reuse marks are intersected with the
/// included operators, so a marked operator that is not submitted never
/// appears in the plan.
pub fn translate(
  graph: &WorkflowGraph,
  target_operator_id: Option<&str>,
) -> Result<LogicalPlan, PlanError> {
  validate(graph)?;

  let sub_dag = graph.sub_dag(target_operator_id)?;

  let operators = sub_dag
    .operators
    .iter()
    .map(|op| to_logical_operator(op))
    .collect();

  let links = sub_dag
    .links
    .iter()
    .map(|link| to_logical_link(graph, link))
    .collect::<Result<Vec<_>, _>>()?;

  let operator_ids = sub_dag.operator_ids();
  let ops_to_view_result = intersect(&operator_ids, graph.operators_to_view_result());
  let ops_to_reuse_result = intersect(&operator_ids, graph.operators_marked_for_reuse_result());

  debug!(
    target_operator = ?target_operator_id,
    operators = operator_ids.len(),
    links = links.len(),
    "translated workflow graph to logical plan"
  );

  Ok(LogicalPlan {
    operators,
    links,
    ops_to_view_result,
    ops_to_reuse_result,
  })
}

/// Operator IDs must be unique and every link must point at a known operator.
fn validate(graph: &WorkflowGraph) -> Result<(), PlanError> {
  let mut seen = HashSet::new();
  for op in &graph.operators {
    if !seen.insert(op.operator_id.as_str()) {
      return Err(PlanError::DuplicateOperator(op.operator_id.clone()));
    }
  }
  for link in &graph.links {
    for endpoint in [&link.source, &link.target] {
      if !seen.contains(endpoint.operator_id.as_str()) {
        return Err(PlanError::OperatorNotFound(endpoint.operator_id.clone()));
      }
    }
  }
  Ok(())
}

fn to_logical_operator(op: &OperatorPredicate) -> LogicalOperator {
  let mut properties = op.operator_properties.clone();
  properties.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));

  LogicalOperator {
    operator_id: op.operator_id.clone(),
    operator_type: op.operator_type.clone(),
    input_ports: op.input_ports.clone(),
    output_ports: op.output_ports.clone(),
    properties,
  }
}

fn to_logical_link(graph: &WorkflowGraph, link: &OperatorLink) -> Result<LogicalLink, PlanError> {
  let from_ordinal = port_ordinal(
    graph,
    &link.source.operator_id,
    &link.source.port_id,
    PortDirection::Output,
  )?;
  let to_ordinal = port_ordinal(
    graph,
    &link.target.operator_id,
    &link.target.port_id,
    PortDirection::Input,
  )?;

  Ok(LogicalLink {
    from_op_id: link.source.operator_id.clone(),
    from_port_id: PortIdentity::external(from_ordinal),
    to_op_id: link.target.operator_id.clone(),
    to_port_id: PortIdentity::external(to_ordinal),
  })
}

fn port_ordinal(
  graph: &WorkflowGraph,
  operator_id: &str,
  port_id: &str,
  direction: PortDirection,
) -> Result<usize, PlanError> {
  let op = graph
    .get_operator(operator_id)
    .ok_or_else(|| PlanError::OperatorNotFound(operator_id.to_string()))?;

  let ordinal = match direction {
    PortDirection::Input => op.input_port_ordinal(port_id),
    PortDirection::Output => op.output_port_ordinal(port_id),
  };

  ordinal.ok_or_else(|| PlanError::PortNotFound {
    operator_id: operator_id.to_string(),
    port_id: port_id.to_string(),
    direction,
  })
}

fn intersect(operator_ids: &HashSet<&str>, marked: &HashSet<String>) -> BTreeSet<String> {
  marked
    .iter()
    .filter(|id| operator_ids.contains(id.as_str()))
    .cloned()
    .collect()
}
