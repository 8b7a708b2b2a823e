//! `GET /ws`: WebSocket upgrade and the per-connection STOMP loop.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header},
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::hub::INVENTORY_TOPIC;
use super::session::{AppRequest, HEARTBEAT_MS, SessionAction, StompSession, malformed_frame_error};
use super::stomp::{self, Frame};
use crate::{
    AppState,
    error::{AppError, Result},
    services::record_service,
};

/// Upgrade to a WebSocket if the browser origin is allowed.
///
/// Requests without an `Origin` header (non-browser clients) are accepted.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    if let Some(origin) = headers.get(header::ORIGIN) {
        let origin = origin.to_str().map_err(|_| AppError::Forbidden)?;
        if origin != state.config.frontend_origin {
            tracing::warn!(origin, "Rejected WebSocket handshake from foreign origin");
            return Err(AppError::Forbidden);
        }
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut session = StompSession::new(Uuid::new_v4().to_string());
    let (mut sink, mut stream) = socket.split();
    let mut updates = state.hub.subscribe();
    let mut heartbeat = tokio::time::interval(Duration::from_millis(HEARTBEAT_MS));

    loop {
        tokio::select! {
            incoming = stream.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            let _ = send_frame(&mut sink, &malformed_frame_error("Frame is not UTF-8")).await;
                            break;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(session_id = session.session_id(), error = %e, "WebSocket read failed");
                        break;
                    }
                };

                let frame = match stomp::decode(&text) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::debug!(session_id = session.session_id(), error = %e, "Malformed STOMP frame");
                        let _ = send_frame(&mut sink, &malformed_frame_error(&e.to_string())).await;
                        break;
                    }
                };

                tracing::trace!(session_id = session.session_id(), command = %frame.command, "STOMP frame");
                let actions = session.handle_frame(frame);
                if !apply_actions(&state, &session, &mut sink, actions).await {
                    break;
                }
            }

            update = updates.recv() => match update {
                Ok(message) => {
                    let mut failed = false;
                    for frame in session.deliver(&message) {
                        if send_frame(&mut sink, &frame).await.is_err() {
                            failed = true;
                            break;
                        }
                    }
                    if failed {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = session.session_id(), skipped, "WebSocket client lagging, messages dropped");
                }
                Err(RecvError::Closed) => break,
            },

            _ = heartbeat.tick(), if session.is_connected() => {
                if sink.send(Message::Text("\n".into())).await.is_err() {
                    break;
                }
            }
        }
    }

    if session.is_connected() {
        state.hub.session_disconnected(session.session_id());
    }
}

/// Run the actions produced by a client frame. Returns false when the
/// connection should close.
async fn apply_actions(
    state: &AppState,
    session: &StompSession,
    sink: &mut SplitSink<WebSocket, Message>,
    actions: Vec<SessionAction>,
) -> bool {
    for action in actions {
        match action {
            SessionAction::Reply(frame) => {
                if send_frame(sink, &frame).await.is_err() {
                    return false;
                }
            }
            SessionAction::Connected => state.hub.session_connected(session.session_id()),
            SessionAction::Request(AppRequest::ActiveUsers) => state.hub.broadcast_active_users(),
            SessionAction::Request(AppRequest::Inventory) => {
                match record_service::list_records(&state.pool).await {
                    Ok(records) => state.hub.publish(INVENTORY_TOPIC, &records),
                    Err(e) => tracing::error!(error = %e, "Failed to load inventory for WebSocket request"),
                }
            }
            SessionAction::Close => return false,
        }
    }
    true
}

async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: &Frame,
) -> std::result::Result<(), axum::Error> {
    sink.send(Message::Text(frame.encode().into())).await
}
