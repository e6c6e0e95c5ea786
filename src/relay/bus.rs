//! Channels between the agents
//!
//! Requests to the background agent go through a bounded mpsc queue.
//! Outbound notifications are broadcast; with nobody subscribed they are
//! dropped, which is the normal state when no progress UI is attached.

use tokio::sync::{broadcast, mpsc};

use super::messages::{BackgroundRequest, Outbound};
use crate::error::{CollectError, CollectResult};

/// Default queue depth of both channels
pub const DEFAULT_RELAY_CAPACITY: usize = 64;

/// Broadcast side of the relay. Holding one does not keep the request
/// queue open.
#[derive(Debug, Clone)]
pub struct Publisher {
    outbound: broadcast::Sender<Outbound>,
}

impl Publisher {
    /// Broadcast `message`; returns how many listeners received it
    pub fn publish(&self, message: Outbound) -> usize {
        match self.outbound.send(message) {
            Ok(listeners) => listeners,
            Err(broadcast::error::SendError(message)) => {
                log::info!("No listener for {message:?}");
                0
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct MessageRelay {
    publisher: Publisher,
    requests: mpsc::Sender<BackgroundRequest>,
}

impl MessageRelay {
    /// Relay plus the receiving end the background agent consumes
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BackgroundRequest>) {
        let (outbound, _) = broadcast::channel(capacity);
        let (requests, receiver) = mpsc::channel(capacity);
        let publisher = Publisher { outbound };
        (Self { publisher, requests }, receiver)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.publisher.outbound.subscribe()
    }

    #[must_use]
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    pub fn publish(&self, message: Outbound) -> usize {
        self.publisher.publish(message)
    }

    /// Queue work for the background agent
    pub async fn request(&self, request: BackgroundRequest) -> CollectResult<()> {
        self.requests
            .send(request)
            .await
            .map_err(|e| CollectError::RelayClosed(format!("dropped {:?}", e.0)))
    }
}
