use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::operator::{OperatorLink, OperatorPredicate};

/// The editor's workflow graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
  #[serde(default)]
  pub operators: Vec<OperatorPredicate>,
  #[serde(default)]
  pub links: Vec<OperatorLink>,
  /// Operators whose results the user wants displayed after execution.
  #[serde(default)]
  pub operators_to_view_result: HashSet<String>,
  /// Operators whose cached results the backend may reuse.
  #[serde(default)]
  pub operators_marked_for_reuse_result: HashSet<String>,
}

/// A borrowed view of the part of a graph selected for execution.
#[derive(Debug, Clone)]
pub struct SubDag<'a> {
  pub operators: Vec<&'a OperatorPredicate>,
  pub links: Vec<&'a OperatorLink>,
}

impl<'a> SubDag<'a> {
  /// IDs of the operators in this sub-DAG.
  pub fn operator_ids(&self) -> HashSet<&'a str> {
    self
      .operators
      .iter()
      .map(|op| op.operator_id.as_str())
      .collect()
  }
}

impl WorkflowGraph {
  /// Get an operator by ID.
  pub fn get_operator(&self, operator_id: &str) -> Option<&OperatorPredicate> {
    self
      .operators
      .iter()
      .find(|op| op.operator_id == operator_id)
  }

  pub fn has_operator(&self, operator_id: &str) -> bool {
    self.get_operator(operator_id).is_some()
  }

  pub fn add_operator(&mut self, operator: OperatorPredicate) -> Result<(), PlanError> {
    if self.has_operator(&operator.operator_id) {
      return Err(PlanError::DuplicateOperator(operator.operator_id));
    }
    self.operators.push(operator);
    Ok(())
  }

  /// Add a link. Both endpoints must already be in the graph.
  pub fn add_link(&mut self, link: OperatorLink) -> Result<(), PlanError> {
    for endpoint in [&link.source, &link.target] {
      if !self.has_operator(&endpoint.operator_id) {
        return Err(PlanError::OperatorNotFound(endpoint.operator_id.clone()));
      }
    }
    self.links.push(link);
    Ok(())
  }

  pub fn operators_to_view_result(&self) -> &HashSet<String> {
    &self.operators_to_view_result
  }

  pub fn operators_marked_for_reuse_result(&self) -> &HashSet<String> {
    &self.operators_marked_for_reuse_result
  }

  /// Select the part of the graph to execute.
  ///
  /// Without a target this is every enabled operator. With a target it is the
  /// target plus every enabled operator upstream of it. Links are kept only
  /// when both endpoints are selected. A disabled target selects nothing.
  pub fn sub_dag(&self, target_operator_id: Option<&str>) -> Result<SubDag<'_>, PlanError> {
    let enabled: HashSet<&str> = self
      .operators
      .iter()
      .filter(|op| !op.is_disabled)
      .map(|op| op.operator_id.as_str())
      .collect();

    let selected = match target_operator_id {
      None => enabled,
      Some(target) => {
        let target = self
          .get_operator(target)
          .ok_or_else(|| PlanError::OperatorNotFound(target.to_string()))?;
        self.upstream_closure(&target.operator_id, &enabled)
      }
    };

    let operators = self
      .operators
      .iter()
      .filter(|op| selected.contains(op.operator_id.as_str()))
      .collect();
    let links = self
      .links
      .iter()
      .filter(|link| {
        selected.contains(link.source.operator_id.as_str())
          && selected.contains(link.target.operator_id.as_str())
      })
      .collect();

    Ok(SubDag { operators, links })
  }

  /// The target and everything that feeds it, restricted to `enabled`.
  fn upstream_closure<'g>(
    &'g self,
    target: &'g str,
    enabled: &HashSet<&'g str>,
  ) -> HashSet<&'g str> {
    let mut reverse_adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in &self.links {
      reverse_adjacency
        .entry(link.target.operator_id.as_str())
        .or_default()
        .push(link.source.operator_id.as_str());
    }

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    if enabled.contains(target) {
      queue.push_back(target);
    }
    while let Some(id) = queue.pop_front() {
      if !visited.insert(id) {
        continue;
      }
      for upstream in reverse_adjacency.get(id).into_iter().flatten() {
        if enabled.contains(upstream) && !visited.contains(upstream) {
          queue.push_back(*upstream);
        }
      }
    }
    visited
  }
}
