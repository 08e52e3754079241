//! Event fan-out
//!
//! Distributes raw events from the feed to the aggregation service and to
//! any number of filtered subscribers (the dump follower, tests). Slow
//! subscribers drop events rather than stall ingestion.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::{channel, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::events::RawEvent;
use crate::stats::BatteryStatsService;

const CHANNEL_CAPACITY: usize = 128;

/// Which events a subscriber wants to see
pub enum EventFilter {
    All,
    /// Only events from these domains
    Domains(HashSet<String>),
    Custom(Box<dyn Fn(&RawEvent) -> bool + Send + Sync>),
}

impl EventFilter {
    pub fn all() -> Self {
        Self::All
    }

    pub fn domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Domains(domains.into_iter().map(Into::into).collect())
    }

    pub fn custom<F>(filter_fn: F) -> Self
    where
        F: Fn(&RawEvent) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Box::new(filter_fn))
    }

    pub fn matches(&self, event: &RawEvent) -> bool {
        match self {
            Self::All => true,
            Self::Domains(domains) => domains.contains(&event.domain),
            Self::Custom(filter_fn) => filter_fn(event),
        }
    }
}

impl std::fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "EventFilter::All"),
            Self::Domains(domains) => write!(f, "EventFilter::Domains({:?})", domains),
            Self::Custom(_) => write!(f, "EventFilter::Custom(<function>)"),
        }
    }
}

pub type SubscriberId = u32;

struct Subscriber {
    id: SubscriberId,
    sender: Sender<RawEvent>,
    filter: EventFilter,
}

/// Fan-out hub between the feed and its consumers
pub struct EventBroker {
    next_subscriber_id: SubscriberId,
    subscribers: Vec<Subscriber>,
    event_sender: Sender<RawEvent>,
    event_receiver: Option<Receiver<RawEvent>>,
    dispatch_task: Option<JoinHandle<()>>,
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroker {
    pub fn new() -> Self {
        let (tx, rx) = channel(CHANNEL_CAPACITY);
        Self {
            next_subscriber_id: 1,
            subscribers: Vec::new(),
            event_sender: tx,
            event_receiver: Some(rx),
            dispatch_task: None,
        }
    }

    /// Handle the feed writes into
    pub fn sender(&self) -> Sender<RawEvent> {
        self.event_sender.clone()
    }

    /// Register a filtered consumer; must happen before `start`
    pub fn subscribe(&mut self, filter: EventFilter) -> (SubscriberId, Receiver<RawEvent>) {
        let (tx, rx) = channel(CHANNEL_CAPACITY);
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.push(Subscriber {
            id,
            sender: tx,
            filter,
        });
        (id, rx)
    }

    /// Like `subscribe`, but as a `Stream` for combinator-style consumers
    pub fn subscribe_stream(
        &mut self,
        filter: EventFilter,
    ) -> (SubscriberId, ReceiverStream<RawEvent>) {
        let (id, rx) = self.subscribe(filter);
        (id, ReceiverStream::new(rx))
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|s| s.id != id);
    }

    /// Spawn the dispatch loop. Every event reaches the service; subscribers
    /// get the ones their filter accepts.
    pub fn start(&mut self, service: Arc<BatteryStatsService>) {
        let Some(mut rx) = self.event_receiver.take() else {
            log::warn!("Event broker already started");
            return;
        };
        let subscribers = std::mem::take(&mut self.subscribers);

        self.dispatch_task = Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                service.handle_event(&event);
                for subscriber in &subscribers {
                    if subscriber.filter.matches(&event) {
                        // A full subscriber queue drops the event
                        let _ = subscriber.sender.try_send(event.clone());
                    }
                }
            }
            log::info!("Event feed closed, broker stopping");
        }));
    }

    /// Stop the dispatch loop and drop all subscriber channels
    pub fn shutdown(&mut self) {
        if let Some(task) = self.dispatch_task.take() {
            task.abort();
        }
        self.subscribers.clear();
        let (tx, rx) = channel(CHANNEL_CAPACITY);
        self.event_sender = tx;
        self.event_receiver = Some(rx);
    }
}
