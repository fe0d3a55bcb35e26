//! Client-side execution tracking for tessera workflows.
//!
//! This crate follows a workflow execution running on a remote backend:
//!
//! - [`machine::apply`] folds backend events into an [`ExecutionStateInfo`]
//! - [`lock`] decides whether the workflow may be edited in each state
//! - [`ExecutionService`] owns the current state, dispatches user commands as
//!   [`WorkflowRequest`]s, and publishes every state transition
//!
//! Everything outside the service is reached through traits such as
//! [`Transport`] and [`WorkflowModel`].

mod config;
mod error;
mod event;
pub mod lock;
pub mod machine;
mod model;
mod notify;
mod request;
mod service;
mod state;
mod status;
mod transport;

pub use config::{ExecutionConfig, FORM_DEBOUNCE_TIME_MS};
pub use error::{CommandError, ModelError};
pub use event::WorkflowEvent;
pub use lock::{ActionLock, apply_action_lock, lock_policy};
pub use machine::{LINE_BREAK_MARKER, apply};
pub use model::{SharedWorkflowModel, WorkflowModel};
pub use notify::{ChannelNotifier, LogNotifier, Notification, NotificationLevel, Notifier};
pub use request::{
  OperatorLogic, ReplayExecutionInfo, WorkflowExecuteRequest, WorkflowRequest, WorkflowSettings,
};
pub use service::ExecutionService;
pub use state::{
  ExecutionState, ExecutionStateInfo, FatalErrorType, OperatorCurrentTuples, StateTransition,
  Timestamp, WorkerTuple, WorkflowFatalError,
};
pub use status::{NoopStatusTracker, StatusTracker};
pub use transport::{ChannelTransport, NoopTransport, Transport};
