//! Fan-out of committed events to subscribed listeners.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{trace, warn};

use crate::bus::event::{ALL_TOPICS, WmEvent};
use crate::common::collections::{BTreeMap, BTreeSet};
use crate::model::server::ServerMessage;

/// Identifies one subscriber, typically one IPC connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "listener-{}", self.0) }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("{0} is no longer connected")]
    Disconnected(ListenerId),
}

/// Where serialized events end up.
pub trait EventSink: Send + Sync {
    fn deliver(&self, listener: ListenerId, message: &str) -> Result<(), SinkError>;
}

/// Forwards messages into a channel, tagged with their listener.
#[derive(Clone)]
pub struct ChannelSink {
    tx: crossbeam_channel::Sender<(ListenerId, String)>,
}

impl ChannelSink {
    pub fn new(tx: crossbeam_channel::Sender<(ListenerId, String)>) -> Self { Self { tx } }
}

impl EventSink for ChannelSink {
    fn deliver(&self, listener: ListenerId, message: &str) -> Result<(), SinkError> {
        self.tx
            .send((listener, message.to_string()))
            .map_err(|_| SinkError::Disconnected(listener))
    }
}

/// Topic to listener mapping. Publishing to a topic nobody listens to is a
/// no-op.
#[derive(Default)]
pub struct SubscriptionRegistry {
    topics: BTreeMap<String, BTreeSet<ListenerId>>,
    sink: Option<Arc<dyn EventSink>>,
}

static_assertions::assert_impl_all!(SubscriptionRegistry: Send, Sync);

impl SubscriptionRegistry {
    pub fn set_sink(&mut self, sink: impl EventSink + 'static) { self.sink = Some(Arc::new(sink)); }

    pub fn subscribe(&mut self, topic: &str, listener: ListenerId) {
        trace!(%listener, topic, "subscribed");
        self.topics.entry(topic.to_string()).or_default().insert(listener);
    }

    /// Drops every subscription held by `listener`. Returns whether it had any.
    pub fn unsubscribe(&mut self, listener: ListenerId) -> bool {
        let mut found = false;
        self.topics.retain(|_, listeners| {
            found |= listeners.remove(&listener);
            !listeners.is_empty()
        });
        found
    }

    pub fn listeners(&self, topic: &str) -> Vec<ListenerId> {
        self.topics.get(topic).map(|l| l.iter().copied().collect()).unwrap_or_default()
    }

    pub fn topics_of(&self, listener: ListenerId) -> Vec<&str> {
        self.topics
            .iter()
            .filter(|(_, listeners)| listeners.contains(&listener))
            .map(|(topic, _)| topic.as_str())
            .collect()
    }

    /// Sends `event` to everyone subscribed to its topic or to every topic.
    /// Returns how many listeners it was delivered to.
    pub fn publish(&self, event: &WmEvent) -> usize {
        let recipients: BTreeSet<ListenerId> = [event.topic(), ALL_TOPICS]
            .into_iter()
            .filter_map(|topic| self.topics.get(topic))
            .flatten()
            .copied()
            .collect();
        if recipients.is_empty() {
            return 0;
        }
        let Some(sink) = &self.sink else {
            trace!(topic = event.topic(), "no sink attached, dropping event");
            return 0;
        };
        let data = match serde_json::to_value(event) {
            Ok(data) => data,
            Err(err) => {
                warn!(topic = event.topic(), %err, "could not serialize event");
                return 0;
            }
        };
        let message = ServerMessage::SubscribedEvent { data }.to_json();
        recipients
            .into_iter()
            .filter(|&listener| match sink.deliver(listener, &message) {
                Ok(()) => true,
                Err(err) => {
                    warn!(%err, "event delivery failed");
                    false
                }
            })
            .count()
    }
}
