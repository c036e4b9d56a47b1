//! In-process event bus
//!
//! An explicit instance handed to whoever needs it. Delivery is
//! best-effort: a subscriber that falls more than `capacity` events behind
//! loses the oldest ones and is expected to catch up with a pull query.

use crate::EventPublishError;
use futures::stream::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use trustlens_domain::{EntityId, TrustEvent, UpdateEvent};

/// Default number of buffered events per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcasts [`TrustEvent`]s to subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrustEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        debug!("Event bus initialized with capacity {}", capacity.max(1));
        Self { tx }
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, event: TrustEvent) -> Result<usize, EventPublishError> {
        let type_name = event.type_name();
        match self.tx.send(event) {
            Ok(count) => {
                debug!("Published {} to {} subscribers", type_name, count);
                Ok(count)
            }
            Err(_) => Err(EventPublishError::NoSubscribers(type_name)),
        }
    }

    /// Subscribe to all events, or to one entity's events
    ///
    /// Entity-filtered subscriptions do not see `source.degraded` notices.
    pub fn subscribe(&self, entity_id: Option<EntityId>) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter: entity_id,
            missed: 0,
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

fn matches(filter: &Option<EntityId>, event: &TrustEvent) -> bool {
    match filter {
        None => true,
        Some(wanted) => event.entity_id() == Some(wanted),
    }
}

/// A push subscription
///
/// Dropping it disconnects.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<TrustEvent>,
    filter: Option<EntityId>,
    missed: u64,
}

impl Subscription {
    /// Next matching event; `None` once the bus is gone
    ///
    /// Lag is skipped over (and counted), never surfaced as an error.
    pub async fn recv(&mut self) -> Option<TrustEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if matches(&self.filter, &event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!("Subscriber lagged, {} events dropped", n);
                    self.missed += n;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next `entity.trust.updated` event, skipping other kinds
    pub async fn recv_update(&mut self) -> Option<UpdateEvent> {
        loop {
            match self.recv().await? {
                TrustEvent::TrustUpdated(update) => return Some(update),
                _ => continue,
            }
        }
    }

    /// Events already buffered, without waiting
    pub fn drain(&mut self) -> Vec<TrustEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) if matches(&self.filter, &event) => events.push(event),
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(n)) => self.missed += n,
                Err(_) => return events,
            }
        }
    }

    /// Events dropped because this subscriber fell behind
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Convert into a stream of matching events
    pub fn into_stream(self) -> impl Stream<Item = TrustEvent> {
        let filter = self.filter;
        BroadcastStream::new(self.rx).filter_map(move |result| {
            let event = match result {
                Ok(event) if matches(&filter, &event) => Some(event),
                Ok(_) => None,
                Err(e) => {
                    // Lagged; the pull query is the backstop
                    warn!("Subscriber stream error: {:?}", e);
                    None
                }
            };
            async move { event }
        })
    }
}
