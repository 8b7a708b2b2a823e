//! Per-connection STOMP session state.
//!
//! Pure state machine: it turns client frames into [`SessionAction`]s and
//! hub messages into MESSAGE frames. The socket loop in `ws.rs` performs
//! the I/O.

use std::collections::HashMap;

use super::hub::TopicMessage;
use super::stomp::{Command, Frame};

/// Heart-beat interval advertised and honoured in both directions (ms).
pub const HEARTBEAT_MS: u64 = 5_000;

/// Application destinations clients may SEND to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRequest {
    ActiveUsers,
    Inventory,
}

impl AppRequest {
    fn from_destination(destination: &str) -> Option<Self> {
        match destination {
            "/app/request-active-users" => Some(AppRequest::ActiveUsers),
            "/app/request-inventory" => Some(AppRequest::Inventory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Write a frame to the client.
    Reply(Frame),
    /// Handshake completed; count the session as active.
    Connected,
    Request(AppRequest),
    /// Close the connection after any preceding replies.
    Close,
}

#[derive(Debug)]
pub struct StompSession {
    session_id: String,
    connected: bool,
    /// subscription id -> destination
    subscriptions: HashMap<String, String>,
    next_message_id: u64,
}

impl StompSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            connected: false,
            subscriptions: HashMap::new(),
            next_message_id: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn handle_frame(&mut self, frame: Frame) -> Vec<SessionAction> {
        match frame.command {
            Command::Connect | Command::Stomp => self.on_connect(),
            _ if !self.connected => error_and_close("Not connected", &frame),
            Command::Subscribe => self.on_subscribe(&frame),
            Command::Unsubscribe => self.on_unsubscribe(&frame),
            Command::Send => self.on_send(&frame),
            Command::Disconnect => {
                let mut actions = receipt_for(&frame);
                actions.push(SessionAction::Close);
                actions
            }
            Command::Ack | Command::Nack | Command::Begin | Command::Commit | Command::Abort => {
                receipt_for(&frame)
            }
            Command::Connected | Command::Message | Command::Receipt | Command::Error => {
                error_and_close("Server frame sent by client", &frame)
            }
        }
    }

    /// MESSAGE frames for every subscription matching the topic message.
    pub fn deliver(&mut self, message: &TopicMessage) -> Vec<Frame> {
        let mut matching: Vec<&String> = self
            .subscriptions
            .iter()
            .filter(|(_, destination)| **destination == message.destination)
            .map(|(id, _)| id)
            .collect();
        matching.sort();

        let mut frames = Vec::with_capacity(matching.len());
        for subscription in matching {
            let message_id = format!("{}-{}", self.session_id, self.next_message_id);
            self.next_message_id += 1;
            frames.push(
                Frame::new(Command::Message)
                    .header("subscription", subscription.as_str())
                    .header("message-id", message_id)
                    .header("destination", message.destination.as_str())
                    .header("content-type", "application/json")
                    .header("content-length", message.body.len().to_string())
                    .body(message.body.as_str()),
            );
        }
        frames
    }

    fn on_connect(&mut self) -> Vec<SessionAction> {
        if self.connected {
            return vec![
                SessionAction::Reply(error_frame("Already connected", None)),
                SessionAction::Close,
            ];
        }
        self.connected = true;
        let connected = Frame::new(Command::Connected)
            .header("version", "1.2")
            .header("heart-beat", format!("{HEARTBEAT_MS},{HEARTBEAT_MS}"))
            .header("session", self.session_id.as_str());
        vec![SessionAction::Reply(connected), SessionAction::Connected]
    }

    fn on_subscribe(&mut self, frame: &Frame) -> Vec<SessionAction> {
        let (Some(id), Some(destination)) = (frame.get("id"), frame.get("destination")) else {
            return error_and_close("SUBSCRIBE requires id and destination headers", frame);
        };
        if !destination.starts_with("/topic/") {
            return error_and_close("Only /topic destinations can be subscribed to", frame);
        }
        self.subscriptions
            .insert(id.to_string(), destination.to_string());
        tracing::debug!(session_id = %self.session_id, id, destination, "Subscribed");
        receipt_for(frame)
    }

    fn on_unsubscribe(&mut self, frame: &Frame) -> Vec<SessionAction> {
        let Some(id) = frame.get("id") else {
            return error_and_close("UNSUBSCRIBE requires an id header", frame);
        };
        self.subscriptions.remove(id);
        receipt_for(frame)
    }

    fn on_send(&mut self, frame: &Frame) -> Vec<SessionAction> {
        let Some(request) = frame.get("destination").and_then(AppRequest::from_destination) else {
            return error_and_close("Unknown destination", frame);
        };
        let mut actions = receipt_for(frame);
        actions.push(SessionAction::Request(request));
        actions
    }
}

fn receipt_for(frame: &Frame) -> Vec<SessionAction> {
    frame
        .get("receipt")
        .map(|receipt| {
            SessionAction::Reply(Frame::new(Command::Receipt).header("receipt-id", receipt))
        })
        .into_iter()
        .collect()
}

fn error_frame(message: &str, receipt: Option<&str>) -> Frame {
    let mut frame = Frame::new(Command::Error).header("message", message);
    if let Some(receipt) = receipt {
        frame = frame.header("receipt-id", receipt);
    }
    frame
}

fn error_and_close(message: &str, frame: &Frame) -> Vec<SessionAction> {
    vec![
        SessionAction::Reply(error_frame(message, frame.get("receipt"))),
        SessionAction::Close,
    ]
}

/// ERROR frame for input that could not be decoded at all.
pub fn malformed_frame_error(detail: &str) -> Frame {
    error_frame("Malformed frame", None).body(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::hub::INVENTORY_TOPIC;

    fn connected_session() -> StompSession {
        let mut session = StompSession::new("s1");
        session.handle_frame(Frame::new(Command::Connect).header("accept-version", "1.2"));
        session
    }

    fn subscribe(id: &str, destination: &str) -> Frame {
        Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
    }

    #[test]
    fn connect_replies_connected_with_heartbeat() {
        let mut session = StompSession::new("s1");
        let actions = session.handle_frame(Frame::new(Command::Stomp));

        let SessionAction::Reply(frame) = &actions[0] else {
            panic!("expected CONNECTED reply, got {actions:?}");
        };
        assert_eq!(frame.command, Command::Connected);
        assert_eq!(frame.get("version"), Some("1.2"));
        assert_eq!(frame.get("heart-beat"), Some("5000,5000"));
        assert_eq!(actions[1], SessionAction::Connected);
        assert!(session.is_connected());
    }

    #[test]
    fn frames_before_connect_are_rejected() {
        let mut session = StompSession::new("s1");
        let actions = session.handle_frame(subscribe("0", INVENTORY_TOPIC));

        assert!(matches!(&actions[0], SessionAction::Reply(f) if f.command == Command::Error));
        assert_eq!(actions.last(), Some(&SessionAction::Close));
    }

    #[test]
    fn delivers_only_subscribed_topics() {
        let mut session = connected_session();
        session.handle_frame(subscribe("sub-0", INVENTORY_TOPIC));

        let other = TopicMessage {
            destination: "/topic/auth".to_string(),
            body: "{}".to_string(),
        };
        assert!(session.deliver(&other).is_empty());

        let inventory = TopicMessage {
            destination: INVENTORY_TOPIC.to_string(),
            body: "[]".to_string(),
        };
        let frames = session.deliver(&inventory);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].get("subscription"), Some("sub-0"));
        assert_eq!(frames[0].get("message-id"), Some("s1-0"));
        assert_eq!(frames[0].get("content-type"), Some("application/json"));
        assert_eq!(frames[0].body, "[]");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut session = connected_session();
        session.handle_frame(subscribe("sub-0", INVENTORY_TOPIC));
        session.handle_frame(Frame::new(Command::Unsubscribe).header("id", "sub-0"));

        let message = TopicMessage {
            destination: INVENTORY_TOPIC.to_string(),
            body: "[]".to_string(),
        };
        assert!(session.deliver(&message).is_empty());
    }

    #[test]
    fn send_to_app_destination_requests_data() {
        let mut session = connected_session();
        let actions = session.handle_frame(
            Frame::new(Command::Send).header("destination", "/app/request-active-users"),
        );
        assert_eq!(actions, vec![SessionAction::Request(AppRequest::ActiveUsers)]);

        let actions = session.handle_frame(
            Frame::new(Command::Send).header("destination", "/app/request-inventory"),
        );
        assert_eq!(actions, vec![SessionAction::Request(AppRequest::Inventory)]);
    }

    #[test]
    fn disconnect_with_receipt() {
        let mut session = connected_session();
        let actions = session.handle_frame(Frame::new(Command::Disconnect).header("receipt", "77"));

        let SessionAction::Reply(receipt) = &actions[0] else {
            panic!("expected RECEIPT, got {actions:?}");
        };
        assert_eq!(receipt.command, Command::Receipt);
        assert_eq!(receipt.get("receipt-id"), Some("77"));
        assert_eq!(actions[1], SessionAction::Close);
    }

    #[test]
    fn subscribe_without_destination_is_an_error() {
        let mut session = connected_session();
        let actions = session.handle_frame(Frame::new(Command::Subscribe).header("id", "0"));
        assert_eq!(actions.last(), Some(&SessionAction::Close));
    }
}
