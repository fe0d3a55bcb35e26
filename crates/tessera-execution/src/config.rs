use std::time::Duration;

/// Delay before a submitted execution request is sent.
pub const FORM_DEBOUNCE_TIME_MS: u64 = 150;

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
  /// How long to wait before sending an execute request, so pending
  /// operator edits land first.
  pub debounce: Duration,
  /// Version string stamped on every execute request.
  pub engine_version: String,
  /// Buffer size of the state-change broadcast channel.
  pub state_stream_capacity: usize,
}

impl Default for ExecutionConfig {
  fn default() -> Self {
    Self {
      debounce: Duration::from_millis(FORM_DEBOUNCE_TIME_MS),
      engine_version: env!("CARGO_PKG_VERSION").to_string(),
      state_stream_capacity: 64,
    }
  }
}
