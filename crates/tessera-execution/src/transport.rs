//! Outbound request transport.

use tokio::sync::mpsc;
use tracing::warn;

use crate::request::WorkflowRequest;

/// Sends requests to the backend.
///
/// Sending is fire-and-forget; the backend answers through `WorkflowEvent`s.
pub trait Transport: Send + Sync {
  fn send(&self, request: WorkflowRequest);
}

/// A transport that drops every request.
#[derive(Debug, Clone, Default)]
pub struct NoopTransport;

impl Transport for NoopTransport {
  fn send(&self, _request: WorkflowRequest) {}
}

/// A transport that forwards requests to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
  sender: mpsc::UnboundedSender<WorkflowRequest>,
}

impl ChannelTransport {
  pub fn new(sender: mpsc::UnboundedSender<WorkflowRequest>) -> Self {
    Self { sender }
  }
}

impl Transport for ChannelTransport {
  fn send(&self, request: WorkflowRequest) {
    let request_type = request.type_name();
    if self.sender.send(request).is_err() {
      warn!(request_type = %request_type, "workflow connection closed, request dropped");
    }
  }
}
