//! In-process message source.
//!
//! Behaves like a clean-session broker connection: the first event is
//! `Connected`, only subscribed topics are delivered, and a disconnect drops
//! every subscription until the consumer subscribes again.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use crate::source::{MessageSource, SourceError, SourceEvent, check_topic};

#[derive(Debug)]
enum Frame {
    Publish { topic: String, payload: Vec<u8> },
    Disconnect(String),
    Reconnect,
}

/// Create a connected publisher/source pair with a bounded queue.
pub fn channel(capacity: usize) -> (ChannelPublisher, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ChannelPublisher { tx },
        ChannelSource {
            rx,
            subscriptions: HashSet::new(),
            announce_connect: true,
            closed: false,
        },
    )
}

/// Publishing half; cheap to clone. The source ends when every publisher is
/// dropped.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::Sender<Frame>,
}

impl ChannelPublisher {
    /// Publish a raw payload on `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Closed`] if the source was dropped.
    pub async fn publish(&self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Result<(), SourceError> {
        self.send(Frame::Publish {
            topic: topic.into(),
            payload: payload.into(),
        })
        .await
    }

    /// Simulate a dropped connection.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Closed`] if the source was dropped.
    pub async fn disconnect(&self, reason: impl Into<String>) -> Result<(), SourceError> {
        self.send(Frame::Disconnect(reason.into())).await
    }

    /// Simulate the connection coming back.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Closed`] if the source was dropped.
    pub async fn reconnect(&self) -> Result<(), SourceError> {
        self.send(Frame::Reconnect).await
    }

    async fn send(&self, frame: Frame) -> Result<(), SourceError> {
        self.tx.send(frame).await.map_err(|_closed| SourceError::Closed)
    }
}

/// Receiving half, driven by the ingest loop.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Frame>,
    subscriptions: HashSet<String>,
    announce_connect: bool,
    closed: bool,
}

impl ChannelSource {
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.contains(topic)
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn subscribe(&mut self, topic: &str) -> Result<(), SourceError> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        check_topic(topic)?;
        self.subscriptions.insert(topic.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<SourceEvent> {
        if self.closed {
            return None;
        }
        if self.announce_connect {
            self.announce_connect = false;
            return Some(SourceEvent::Connected);
        }

        loop {
            match self.rx.recv().await? {
                Frame::Publish { topic, payload } => {
                    if self.subscriptions.contains(&topic) {
                        return Some(SourceEvent::Message { topic, payload });
                    }
                    trace!(topic = %topic, "Dropping message on unsubscribed topic");
                }
                Frame::Disconnect(reason) => {
                    self.subscriptions.clear();
                    return Some(SourceEvent::Disconnected { reason });
                }
                Frame::Reconnect => return Some(SourceEvent::Connected),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.closed = true;
        self.subscriptions.clear();
        self.rx.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn test_connected_is_first_event() -> TestResult {
        let (_publisher, mut source) = channel(8);
        assert_eq!(source.next_event().await, Some(SourceEvent::Connected));
        Ok(())
    }

    #[tokio::test]
    async fn test_only_subscribed_topics_are_delivered() -> TestResult {
        let (publisher, mut source) = channel(8);
        assert_eq!(source.next_event().await, Some(SourceEvent::Connected));
        source.subscribe("iot/piezo").await?;

        publisher.publish("iot/other", "{}").await?;
        publisher.publish("iot/piezo", "{\"a\":1}").await?;
        drop(publisher);

        assert_eq!(
            source.next_event().await,
            Some(SourceEvent::Message {
                topic: "iot/piezo".to_string(),
                payload: b"{\"a\":1}".to_vec(),
            })
        );
        assert_eq!(source.next_event().await, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_disconnect_drops_subscriptions() -> TestResult {
        let (publisher, mut source) = channel(8);
        source.next_event().await;
        source.subscribe("iot/piezo").await?;

        publisher.disconnect("keepalive timeout").await?;
        publisher.publish("iot/piezo", "lost").await?;
        publisher.reconnect().await?;

        assert_eq!(
            source.next_event().await,
            Some(SourceEvent::Disconnected {
                reason: "keepalive timeout".to_string()
            })
        );
        assert!(!source.is_subscribed("iot/piezo"));
        assert_eq!(source.next_event().await, Some(SourceEvent::Connected));
        Ok(())
    }

    #[tokio::test]
    async fn test_close_ends_stream_and_rejects_publishers() -> TestResult {
        let (publisher, mut source) = channel(8);
        source.close().await?;

        assert_eq!(source.next_event().await, None);
        assert!(matches!(source.subscribe("iot/piezo").await, Err(SourceError::Closed)));
        assert!(matches!(publisher.publish("iot/piezo", "{}").await, Err(SourceError::Closed)));
        Ok(())
    }
}
