//! Fan-out of live readings to subscriber connections.
//!
//! Each connection registers an outbound queue and gets a [`ConnectionId`].
//! A connection either receives every reading or, after a `subscribe`
//! control message, only readings from one sensor.
//!
//! # Delivery guarantees
//!
//! - The registry lock is held for the whole fan-out of one reading, so a
//!   connection registering or leaving at the same time either receives that
//!   reading or does not; it never sees part of a broadcast.
//! - Outbound queues are bounded FIFO channels of [`OUTBOUND_CAPACITY`]
//!   messages, so successive readings reach one subscriber in ingestion
//!   order. A subscriber whose queue is full misses readings until it catches
//!   up; other subscribers are unaffected.
//! - A connection whose receiving half is gone is skipped silently until it
//!   is deregistered.
//! - A bad control message only produces an error reply on the connection
//!   that sent it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use thermo_types::Reading;

use crate::events::ReadingSink;
use crate::messages::{ClientMessage, INVALID_MESSAGE, ServerMessage};

/// Identifier assigned to a connection on registration.
pub type ConnectionId = u64;

/// Messages buffered per connection before readings are dropped for it.
pub const OUTBOUND_CAPACITY: usize = 256;

/// Sending half of a connection's outbound queue.
pub type Outbound = mpsc::Sender<ServerMessage>;

/// Receiving half of a connection's outbound queue.
pub type OutboundReceiver = mpsc::Receiver<ServerMessage>;

/// Create an outbound queue of [`OUTBOUND_CAPACITY`] messages.
pub fn outbound_channel() -> (Outbound, OutboundReceiver) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

#[derive(Debug)]
struct Subscription {
    outbound: Outbound,
    filter: Option<i64>,
    /// Set while readings are being dropped because the queue is full.
    lagging: bool,
}

impl Subscription {
    fn wants(&self, reading: &Reading) -> bool {
        self.filter
            .is_none_or(|sensor_id| sensor_id == i64::from(reading.sensor_id))
    }

    fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    fn send(&mut self, id: ConnectionId, message: ServerMessage) -> bool {
        match self.outbound.try_send(message) {
            Ok(()) => {
                if self.lagging {
                    self.lagging = false;
                    info!(connection = id, "Subscriber caught up");
                }
                true
            }
            Err(TrySendError::Full(_)) => {
                if !self.lagging {
                    self.lagging = true;
                    warn!(connection = id, "Subscriber queue full, dropping messages");
                }
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Owns the live connections and their subscription filters.
#[derive(Debug, Default)]
pub struct Broadcaster {
    next_id: AtomicU64,
    subscriptions: Mutex<HashMap<ConnectionId, Subscription>>,
}

impl Broadcaster {
    /// Create an empty broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<ConnectionId, Subscription>> {
        // Registry updates are single inserts/removes, so a poisoned map is
        // still consistent.
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection with no filter and greet it.
    pub fn on_connect(&self, outbound: Outbound) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscription = Subscription {
            outbound,
            filter: None,
            lagging: false,
        };
        subscription.send(id, ServerMessage::connected());

        let mut registry = self.registry();
        registry.insert(id, subscription);
        info!(connection = id, total = registry.len(), "Subscriber connected");
        id
    }

    /// Deliver `reading` to every open connection whose filter matches.
    ///
    /// Returns the number of connections the reading was queued for. Full
    /// queues are skipped.
    pub fn on_reading(&self, reading: &Reading) -> usize {
        let mut registry = self.registry();
        let mut delivered = 0;
        for (&id, sub) in registry.iter_mut() {
            if sub.wants(reading)
                && sub.is_open()
                && sub.send(id, ServerMessage::Reading { data: *reading })
            {
                delivered += 1;
            }
        }
        delivered
    }

    /// Handle a control message from connection `id`.
    ///
    /// Every outcome, including parse failures, is answered on the same
    /// connection only. Unknown connections are ignored.
    pub fn on_client_message(&self, id: ConnectionId, raw: &str) {
        let mut registry = self.registry();
        let Some(subscription) = registry.get_mut(&id) else {
            debug!(connection = id, "Control message for unknown connection");
            return;
        };

        let reply = match ClientMessage::parse(raw) {
            Ok(ClientMessage::Subscribe {
                sensor_id: Some(sensor_id),
            }) => {
                subscription.filter = Some(sensor_id);
                info!(connection = id, sensor_id, "Subscriber filtered to sensor");
                Some(ServerMessage::Subscribed { sensor_id })
            }
            Ok(ClientMessage::Subscribe { sensor_id: None }) => {
                warn!(connection = id, "Ignoring subscribe without an integer sensorId");
                None
            }
            Ok(ClientMessage::Unsubscribe) => {
                let previous = subscription.filter.take();
                info!(connection = id, previous = ?previous, "Subscriber filter cleared");
                Some(ServerMessage::Unsubscribed {
                    sensor_id: previous,
                })
            }
            Ok(ClientMessage::Unknown(kind)) => {
                debug!(connection = id, kind = %kind, "Unknown control message");
                Some(ServerMessage::error(format!("unknown message type: {kind}")))
            }
            Err(e) => {
                debug!(connection = id, error = %e, "Unparsable control message");
                Some(ServerMessage::error(INVALID_MESSAGE))
            }
        };

        if let Some(reply) = reply
            && subscription.is_open()
        {
            subscription.send(id, reply);
        }
    }

    /// Deregister a connection that closed normally.
    ///
    /// Returns `false` if the connection was not registered.
    pub fn on_disconnect(&self, id: ConnectionId) -> bool {
        let mut registry = self.registry();
        let removed = registry.remove(&id).is_some();
        if removed {
            info!(connection = id, total = registry.len(), "Subscriber disconnected");
        }
        removed
    }

    /// Deregister a connection whose transport failed.
    pub fn on_transport_error(&self, id: ConnectionId, error: &dyn fmt::Display) -> bool {
        warn!(connection = id, error = %error, "Subscriber transport error");
        self.on_disconnect(id)
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry().len()
    }

    /// Current filter of a connection: `None` if unknown, `Some(None)` if it
    /// receives every reading.
    pub fn filter(&self, id: ConnectionId) -> Option<Option<i64>> {
        self.registry().get(&id).map(|sub| sub.filter)
    }
}

impl ReadingSink for Broadcaster {
    fn publish(&self, reading: &Reading) {
        self.on_reading(reading);
    }
}
