use std::fmt;

use thiserror::Error;

/// Which port list of an operator a lookup was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
  Input,
  Output,
}

impl fmt::Display for PortDirection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PortDirection::Input => f.write_str("input"),
      PortDirection::Output => f.write_str("output"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
  #[error("operator not found: {0}")]
  OperatorNotFound(String),

  #[error("{direction} port '{port_id}' not found on operator '{operator_id}'")]
  PortNotFound {
    operator_id: String,
    port_id: String,
    direction: PortDirection,
  },

  #[error("duplicate operator id: {0}")]
  DuplicateOperator(String),
}
