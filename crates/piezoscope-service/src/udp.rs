//! UDP bridge source.
//!
//! A broker bridge (or a device on the LAN) forwards each pub/sub message as
//! one datagram: the topic, a newline, then the raw payload.
//!
//! ```text
//! iot/piezo\n{"Sensor1":[{"ts":1717171717000,"v":3.5}]}
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::source::{MessageSource, SourceError, SourceEvent, check_topic};

/// Largest datagram accepted; anything longer is truncated by the kernel.
pub const MAX_DATAGRAM_SIZE: usize = 64 * 1024;

const RECV_BACKOFF_BASE: Duration = Duration::from_millis(10);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause after the `consecutive`-th receive error in a row (1-based).
///
/// Doubles from 10 ms up to 1 s.
pub fn recv_error_backoff(consecutive: u32) -> Duration {
    let shift = consecutive.saturating_sub(1).min(7);
    RECV_BACKOFF_BASE
        .saturating_mul(1u32 << shift)
        .min(RECV_BACKOFF_MAX)
}

/// Split a datagram into topic and payload.
///
/// Returns `None` without a newline separator, with an empty topic, or with
/// a topic that is not UTF-8.
pub fn split_datagram(datagram: &[u8]) -> Option<(&str, &[u8])> {
    let newline = datagram.iter().position(|b| *b == b'\n')?;
    let (topic, rest) = datagram.split_at(newline);
    let topic = std::str::from_utf8(topic).ok()?.trim_end_matches('\r');
    if topic.is_empty() {
        return None;
    }
    Some((topic, rest.get(1..).unwrap_or_default()))
}

/// Message source reading topic-framed datagrams from a UDP socket.
#[derive(Debug)]
pub struct UdpBridgeSource {
    socket: Option<UdpSocket>,
    local_addr: SocketAddr,
    subscriptions: HashSet<String>,
    buf: Vec<u8>,
    announce_connect: bool,
}

impl UdpBridgeSource {
    /// Bind the bridge socket.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the address cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self, SourceError> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        info!(%local_addr, "UDP bridge source bound");
        Ok(Self {
            socket: Some(socket),
            local_addr,
            subscriptions: HashSet::new(),
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
            announce_connect: true,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl MessageSource for UdpBridgeSource {
    async fn subscribe(&mut self, topic: &str) -> Result<(), SourceError> {
        if self.socket.is_none() {
            return Err(SourceError::Closed);
        }
        check_topic(topic)?;
        self.subscriptions.insert(topic.to_string());
        debug!(topic, "Subscribed");
        Ok(())
    }

    async fn next_event(&mut self) -> Option<SourceEvent> {
        let socket = self.socket.as_ref()?;
        if self.announce_connect {
            self.announce_connect = false;
            return Some(SourceEvent::Connected);
        }

        let mut errors = 0u32;
        loop {
            let (len, peer) = match socket.recv_from(&mut self.buf).await {
                Ok(received) => received,
                Err(error) => {
                    errors = errors.saturating_add(1);
                    let backoff = recv_error_backoff(errors);
                    if errors == 1 {
                        warn!(error = %error, "UDP bridge receive error");
                    } else {
                        debug!(error = %error, errors, ?backoff, "UDP bridge receive error repeated");
                    }
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };
            errors = 0;

            let datagram = self.buf.get(..len).unwrap_or_default();
            let Some((topic, payload)) = split_datagram(datagram) else {
                debug!(%peer, len, "Dropping datagram without a topic line");
                continue;
            };
            if !self.subscriptions.contains(topic) {
                debug!(%peer, topic, "Dropping datagram on unsubscribed topic");
                continue;
            }

            return Some(SourceEvent::Message {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            });
        }
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if self.socket.take().is_some() {
            info!(local_addr = %self.local_addr, "UDP bridge source closed");
        }
        self.subscriptions.clear();
        Ok(())
    }
}
