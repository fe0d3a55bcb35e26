//! Tessera Plan
//!
//! This crate holds the editor-side workflow graph and the translation of that
//! graph into the backend's logical plan.
//!
//! The graph (`WorkflowGraph`) is what the canvas edits: operators with named
//! ports, links between named ports, and the sets of operators the user marked
//! for result viewing or result reuse. The logical plan (`LogicalPlan`) is what
//! the backend executes: the same operators with their properties flattened,
//! and links addressed by port ordinal instead of port name.
//!
//! ```text
//! WorkflowGraph ── sub_dag(target?) ──▶ SubDag ── translate ──▶ LogicalPlan
//! ```

mod error;
mod graph;
mod operator;
mod plan;
mod translate;

pub use error::{PlanError, PortDirection};
pub use graph::{SubDag, WorkflowGraph};
pub use operator::{LinkEndpoint, OperatorLink, OperatorPredicate, PortDescriptor};
pub use plan::{LogicalLink, LogicalOperator, LogicalPlan, PortIdentity};
pub use translate::translate;
