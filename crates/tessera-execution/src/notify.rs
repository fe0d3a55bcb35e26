//! User-facing notifications.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
  Info,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub level: NotificationLevel,
  pub message: String,
}

/// Surfaces short messages to the user.
pub trait Notifier: Send + Sync {
  fn info(&self, message: &str);

  fn error(&self, message: &str);
}

/// A notifier that writes to the tracing log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn info(&self, message: &str) {
    info!(target: "tessera::notify", "{}", message);
  }

  fn error(&self, message: &str) {
    error!(target: "tessera::notify", "{}", message);
  }
}

/// A notifier that sends notifications to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<Notification>) -> Self {
    Self { sender }
  }

  fn push(&self, level: NotificationLevel, message: &str) {
    // Receiver may have been dropped
    let _ = self.sender.send(Notification {
      level,
      message: message.to_string(),
    });
  }
}

impl Notifier for ChannelNotifier {
  fn info(&self, message: &str) {
    self.push(NotificationLevel::Info, message);
  }

  fn error(&self, message: &str) {
    self.push(NotificationLevel::Error, message);
  }
}
