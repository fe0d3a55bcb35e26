//! The workflow model the execution service reads from and locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use tessera_plan::{OperatorPredicate, WorkflowGraph};

use crate::error::ModelError;
use crate::request::WorkflowSettings;

/// Read access to the edited workflow, plus its editability switch.
///
/// The execution service never edits the graph; it only snapshots it for
/// submission and toggles whether the user may edit it.
pub trait WorkflowModel: Send + Sync {
  /// A snapshot of the current graph.
  fn graph(&self) -> WorkflowGraph;

  fn operator(&self, operator_id: &str) -> Option<OperatorPredicate>;

  fn workflow_settings(&self) -> WorkflowSettings;

  fn enable_workflow_modification(&self);

  fn disable_workflow_modification(&self);

  fn is_modification_enabled(&self) -> bool;
}

/// An in-memory workflow model shared between the editor and the service.
#[derive(Debug)]
pub struct SharedWorkflowModel {
  graph: RwLock<WorkflowGraph>,
  settings: RwLock<WorkflowSettings>,
  modification_enabled: AtomicBool,
}

impl SharedWorkflowModel {
  pub fn new(graph: WorkflowGraph) -> Self {
    Self {
      graph: RwLock::new(graph),
      settings: RwLock::new(WorkflowSettings::default()),
      modification_enabled: AtomicBool::new(true),
    }
  }

  pub fn with_settings(self, settings: WorkflowSettings) -> Self {
    *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    self
  }

  /// Edit the graph in place.
  ///
  /// Fails with `ModificationDisabled` while an execution holds the lock.
  pub fn modify<F>(&self, edit: F) -> Result<(), ModelError>
  where
    F: FnOnce(&mut WorkflowGraph) -> Result<(), ModelError>,
  {
    if !self.is_modification_enabled() {
      return Err(ModelError::ModificationDisabled);
    }
    let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
    edit(&mut graph)
  }
}

impl WorkflowModel for SharedWorkflowModel {
  fn graph(&self) -> WorkflowGraph {
    self.graph.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn operator(&self, operator_id: &str) -> Option<OperatorPredicate> {
    let graph = self.graph.read().unwrap_or_else(PoisonError::into_inner);
    graph.get_operator(operator_id).cloned()
  }

  fn workflow_settings(&self) -> WorkflowSettings {
    self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn enable_workflow_modification(&self) {
    self.modification_enabled.store(true, Ordering::SeqCst);
  }

  fn disable_workflow_modification(&self) {
    self.modification_enabled.store(false, Ordering::SeqCst);
  }

  fn is_modification_enabled(&self) -> bool {
    self.modification_enabled.load(Ordering::SeqCst)
  }
}
