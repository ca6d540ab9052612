//! Process-wide notification bus.
//!
//! The event channel publishes here; UI collaborators subscribe here. Neither
//! side holds a reference to the other. Backed by a
//! [`tokio::sync::broadcast`] channel so every subscriber sees every
//! notification it asked for, in publish order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

const BUS_CAPACITY: usize = 256;

// ── Notification ─────────────────────────────────────────────────────

/// Names of the notifications carried by the bus.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum NotificationKind {
    InventoryUpdate,
    NewSale,
    LowStockAlert,
    /// Raised locally when the event channel gives up reconnecting.
    ConnectionError,
}

impl NotificationKind {
    /// Kinds the server pushes over the event channel. `connection-error`
    /// is local-only and never accepted from the wire.
    pub fn is_server_event(self) -> bool {
        !matches!(self, Self::ConnectionError)
    }
}

/// One published event. The payload is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self { kind, payload }
    }
}

// ── Bus ──────────────────────────────────────────────────────────────

/// Cheaply cloneable publish/subscribe handle.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<Arc<Notification>>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish to every current subscriber. Returns how many receivers were
    /// reached; publishing with nobody listening is not an error.
    pub fn publish(&self, notification: Notification) -> usize {
        let kind = notification.kind;
        match self.tx.send(Arc::new(notification)) {
            Ok(receivers) => {
                tracing::trace!(%kind, receivers, "notification published");
                receivers
            }
            Err(_) => {
                tracing::debug!(%kind, "notification dropped, no subscribers");
                0
            }
        }
    }

    /// Subscribe to the given kinds only.
    pub fn subscribe(&self, kinds: impl IntoIterator<Item = NotificationKind>) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            kinds: Some(kinds.into_iter().collect()),
        }
    }

    /// Subscribe to every kind.
    pub fn subscribe_all(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            kinds: None,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ── Subscription ─────────────────────────────────────────────────────

/// A live subscription. Dropping it, or calling
/// [`unsubscribe`](Self::unsubscribe), detaches it from the bus.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Arc<Notification>>,
    kinds: Option<Vec<NotificationKind>>,
}

impl Subscription {
    fn wants(&self, kind: NotificationKind) -> bool {
        self.kinds.as_ref().is_none_or(|k| k.contains(&kind))
    }

    /// Wait for the next matching notification.
    ///
    /// Returns `None` once every bus handle has been dropped. A subscriber
    /// that falls behind skips the overwritten notifications and carries on.
    pub async fn recv(&mut self) -> Option<Arc<Notification>> {
        loop {
            match self.rx.recv().await {
                Ok(n) if self.wants(n.kind) => return Some(n),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Return the next matching notification that is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<Notification>> {
        loop {
            match self.rx.try_recv() {
                Ok(n) if self.wants(n.kind) => return Some(n),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Detach from the bus.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn kinds_use_wire_names() {
        let names: Vec<String> = NotificationKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            ["inventory-update", "new-sale", "low-stock-alert", "connection-error"]
        );
        assert_eq!(
            NotificationKind::from_str("low-stock-alert").unwrap(),
            NotificationKind::LowStockAlert
        );
        assert!(NotificationKind::from_str("connect").is_err());
        assert!(!NotificationKind::ConnectionError.is_server_event());
    }

    #[test]
    fn filtered_subscription_skips_other_kinds() {
        let bus = NotificationBus::new();
        let mut sales = bus.subscribe([NotificationKind::NewSale]);
        let mut everything = bus.subscribe_all();

        bus.publish(Notification::new(
            NotificationKind::LowStockAlert,
            json!({ "productName": "Milk", "currentStock": 2 }),
        ));
        bus.publish(Notification::new(NotificationKind::NewSale, json!({ "total": 500 })));

        let sale = sales.try_recv().unwrap();
        assert_eq!(sale.kind, NotificationKind::NewSale);
        assert!(sales.try_recv().is_none());

        assert_eq!(everything.try_recv().unwrap().kind, NotificationKind::LowStockAlert);
        assert_eq!(everything.try_recv().unwrap().kind, NotificationKind::NewSale);
    }

    #[test]
    fn unsubscribe_detaches() {
        let bus = NotificationBus::new();
        let sub = bus.subscribe_all();
        assert_eq!(bus.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            bus.publish(Notification::new(NotificationKind::NewSale, json!({}))),
            0
        );
    }

    #[tokio::test]
    async fn recv_ends_when_bus_is_dropped() {
        let bus = NotificationBus::new();
        let mut sub = bus.subscribe_all();
        drop(bus);
        assert!(sub.recv().await.is_none());
    }
}
