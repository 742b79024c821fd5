//! Message source abstraction.
//!
//! A source is the transport between field devices and the dispatcher: it
//! reports connection state, accepts topic subscriptions, and yields raw
//! `(topic, payload)` messages. Sources never parse payloads.

use async_trait::async_trait;
use thiserror::Error;

/// One event from a message source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// Transport is (re)connected; subscriptions must be (re)issued.
    Connected,
    Message { topic: String, payload: Vec<u8> },
    Disconnected { reason: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid topic filter: {0:?}")]
    InvalidTopic(String),

    #[error("Message source is closed")]
    Closed,
}

/// Pub/sub style transport feeding the ingest loop.
#[async_trait]
pub trait MessageSource: Send {
    /// Start delivering messages published on `topic`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the subscription cannot be registered.
    async fn subscribe(&mut self, topic: &str) -> Result<(), SourceError>;

    /// Wait for the next event; `None` once the source is exhausted or closed.
    async fn next_event(&mut self) -> Option<SourceEvent>;

    /// Release the transport. Further calls to `next_event` yield `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the transport fails to shut down cleanly.
    async fn close(&mut self) -> Result<(), SourceError>;
}

/// Topics are exact names; empty names and wildcards are rejected.
pub(crate) fn check_topic(topic: &str) -> Result<(), SourceError> {
    if topic.is_empty() || topic.contains(['#', '+', '\n']) {
        return Err(SourceError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}
