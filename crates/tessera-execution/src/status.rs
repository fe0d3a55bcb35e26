/// Per-operator execution status display, reset on every new submission.
pub trait StatusTracker: Send + Sync {
  fn reset_status(&self);
}

#[derive(Debug, Clone, Default)]
pub struct NoopStatusTracker;

impl StatusTracker for NoopStatusTracker {
  fn reset_status(&self) {}
}
