//! Session termination broadcast
//!
//! A fire-and-forget "session ended" signal. Consumers call
//! [`TerminationBroadcast::subscribe`] and hold the returned
//! [`TerminationSubscription`]; dropping it unsubscribes. Firing with no
//! subscribers is not an error.

use std::sync::{Arc, RwLock};

use tokio::sync::broadcast;

/// Capacity of the underlying channel. Terminations are rare; a lagging
/// subscriber only needs to know that at least one happened.
const CHANNEL_CAPACITY: usize = 16;

/// The termination event. Carries no payload beyond "the session ended".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnded;

/// Cloneable handle to the process's termination channel.
#[derive(Debug, Clone)]
pub struct TerminationBroadcast {
    sender: Arc<RwLock<Option<broadcast::Sender<SessionEnded>>>>,
}

impl Default for TerminationBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminationBroadcast {
    /// Creates an open channel with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender: Arc::new(RwLock::new(Some(sender))),
        }
    }

    /// Registers a new subscriber.
    ///
    /// Subscribing after [`close`](Self::close) yields a subscription that
    /// reports the channel as closed immediately.
    pub fn subscribe(&self) -> TerminationSubscription {
        let receiver = self
            .sender
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.subscribe()));
        TerminationSubscription { receiver }
    }

    /// Fires the event. Returns the number of subscribers that will see it.
    pub fn fire(&self) -> usize {
        let delivered = self
            .sender
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.send(SessionEnded).unwrap_or(0)))
            .unwrap_or(0);
        tracing::debug!(subscribers = delivered, "Session termination broadcast");
        delivered
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.receiver_count()))
            .unwrap_or(0)
    }

    /// Closes the channel. Pending subscribers drain buffered events and then
    /// observe the end of the stream.
    pub fn close(&self) {
        if let Ok(mut guard) = self.sender.write() {
            guard.take();
        }
    }
}

/// A registered interest in session termination.
#[derive(Debug)]
pub struct TerminationSubscription {
    receiver: Option<broadcast::Receiver<SessionEnded>>,
}

impl TerminationSubscription {
    /// Waits for the next termination.
    ///
    /// Returns `None` once the broadcast has been closed. Lagged events are
    /// collapsed into a single delivery.
    pub async fn recv(&mut self) -> Option<SessionEnded> {
        let receiver = self.receiver.as_mut()?;
        match receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => Some(SessionEnded),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Returns a pending termination without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEnded> {
        let receiver = self.receiver.as_mut()?;
        match receiver.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => Some(SessionEnded),
            Err(_) => None,
        }
    }
}
