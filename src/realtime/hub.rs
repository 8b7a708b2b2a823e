//! In-process fan-out of topic messages to WebSocket connections.
//!
//! Every connection holds a receiver on one `tokio::sync::broadcast` channel
//! and filters by the destinations it has subscribed to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::record::InventoryUpdate;

pub const AUTH_TOPIC: &str = "/topic/auth";
pub const ACTIVE_USERS_TOPIC: &str = "/topic/active-users";
pub const INVENTORY_TOPIC: &str = "/topic/inventory";

const CHANNEL_CAPACITY: usize = 256;

/// A serialized payload addressed to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    pub destination: String,
    pub body: String,
}

/// Payload published on [`AUTH_TOPIC`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthNotification {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Shared broadcaster plus the table of connected STOMP sessions.
#[derive(Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<TopicMessage>,
    sessions: Arc<DashMap<String, DateTime<Utc>>>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TopicMessage> {
        self.sender.subscribe()
    }

    /// Serialize `payload` as JSON and publish it to `destination`.
    ///
    /// Publishing with no connected clients is not an error.
    pub fn publish<T: Serialize>(&self, destination: &str, payload: &T) {
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(destination, error = %e, "Failed to serialize topic payload");
                return;
            }
        };

        let delivered = self
            .sender
            .send(TopicMessage {
                destination: destination.to_string(),
                body,
            })
            .unwrap_or(0);

        tracing::debug!(destination, receivers = delivered, "Published topic message");
    }

    pub fn session_connected(&self, session_id: &str) {
        self.sessions.insert(session_id.to_string(), Utc::now());
        tracing::info!(session_id, active = self.active_users(), "WebSocket session connected");
        self.broadcast_active_users();
    }

    pub fn session_disconnected(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            tracing::info!(session_id, active = self.active_users(), "WebSocket session closed");
            self.broadcast_active_users();
        }
    }

    pub fn active_users(&self) -> usize {
        self.sessions.len()
    }

    pub fn broadcast_active_users(&self) {
        self.publish(ACTIVE_USERS_TOPIC, &self.active_users());
    }

    /// Publish a `SUCCESS` notification on the auth topic.
    pub fn notify_auth(&self, message: impl Into<String>) {
        let notification = AuthNotification {
            message: message.into(),
            kind: "SUCCESS".to_string(),
        };
        self.publish(AUTH_TOPIC, &notification);
    }

    pub fn publish_inventory_update(&self, update: &InventoryUpdate) {
        self.publish(INVENTORY_TOPIC, update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::InventoryUpdateType;

    #[tokio::test]
    async fn session_changes_broadcast_count() {
        let hub = RealtimeHub::new();
        let mut rx = hub.subscribe();

        hub.session_connected("a");
        hub.session_connected("b");
        hub.session_disconnected("a");

        let counts: Vec<String> = (0..3).map(|_| rx.try_recv().unwrap().body).collect();
        assert_eq!(counts, vec!["1", "2", "1"]);
        assert_eq!(hub.active_users(), 1);
    }

    #[tokio::test]
    async fn unknown_session_disconnect_is_silent() {
        let hub = RealtimeHub::new();
        let mut rx = hub.subscribe();

        hub.session_disconnected("never-connected");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn auth_notification_shape() {
        let hub = RealtimeHub::new();
        let mut rx = hub.subscribe();

        hub.notify_auth("User logged in: ada@example.com");

        let message = rx.try_recv().unwrap();
        assert_eq!(message.destination, AUTH_TOPIC);
        let body: serde_json::Value = serde_json::from_str(&message.body).unwrap();
        assert_eq!(body["message"], "User logged in: ada@example.com");
        assert_eq!(body["type"], "SUCCESS");
    }

    #[tokio::test]
    async fn inventory_update_goes_to_inventory_topic() {
        let hub = RealtimeHub::new();
        let mut rx = hub.subscribe();

        hub.publish_inventory_update(&InventoryUpdate {
            record_id: 9,
            title: "Abbey Road".to_string(),
            quantity: 2,
            update_type: InventoryUpdateType::Purchased,
        });

        let message = rx.try_recv().unwrap();
        assert_eq!(message.destination, INVENTORY_TOPIC);
        assert!(message.body.contains("\"update_type\":\"PURCHASED\""));
    }

    #[test]
    fn publish_without_receivers_does_not_panic() {
        RealtimeHub::new().broadcast_active_users();
    }
}
