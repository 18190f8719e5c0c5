//! Fan-out of generation events to registered subscribers
//!
//! Every subscriber owns an unbounded queue, so each one sees the complete,
//! ordered sequence published after it registered regardless of how slowly it
//! drains. There is no replay: a late subscriber starts at the next publish.

use futures::Stream;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::generation::GenerationEvent;

/// Registry of live subscribers
#[derive(Debug, Default)]
pub struct EventStream {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<GenerationEvent>>>,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber that receives every event published from now on
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.senders().push(sender);
        Subscription { receiver }
    }

    /// Deliver an event to every live subscriber, pruning dropped ones
    pub fn publish(&self, event: GenerationEvent) {
        let mut senders = self.senders();
        senders.retain(|sender| sender.send(event.clone()).is_ok());
        tracing::trace!(subscribers = senders.len(), ?event, "published event");
    }

    pub fn subscriber_count(&self) -> usize {
        let mut senders = self.senders();
        senders.retain(|sender| !sender.is_closed());
        senders.len()
    }

    fn senders(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<GenerationEvent>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// One subscriber's view of the event sequence
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<GenerationEvent>,
}

impl Subscription {
    /// Wait for the next event; `None` once the publishing side is gone
    pub async fn recv(&mut self) -> Option<GenerationEvent> {
        self.receiver.recv().await
    }

    /// Take an already delivered event without waiting
    pub fn try_recv(&mut self) -> Option<GenerationEvent> {
        self.receiver.try_recv().ok()
    }

    /// Collect events up to and including the next terminal `StateChanged`
    pub async fn until_terminal(&mut self) -> Vec<GenerationEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }
}

impl Stream for Subscription {
    type Item = GenerationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
