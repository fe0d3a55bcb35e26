use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("session record '{key}' could not be (de)serialized")]
  Serialization {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}
