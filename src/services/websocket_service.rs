use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, InboundError, ServerMessage},
    error::ServiceError,
    services::{matchmaking_service, room_service},
    state::{ClientConnection, SharedState},
};

/// Errors raised while handling a frame from a game client.
///
/// Distinct from `AppError`, which is used for HTTP responses. Everything except
/// [`GatewayError::ConnectionClosed`] is reported back to the client as an `error` event.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
    /// Frame could not be parsed or failed validation.
    #[error(transparent)]
    Inbound(#[from] InboundError),
    /// Binary frames carry no game messages.
    #[error("binary frames are not supported")]
    Binary,
    /// Rejection from the room or matchmaking layer.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Handle the full lifecycle of one game WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4().to_string();
    state.connections().insert(
        connection_id.clone(),
        ClientConnection::new(connection_id.clone(), outbound_tx.clone()),
    );
    info!(connection_id = %connection_id, "client connected");

    while let Some(message) = receiver.next().await {
        let outcome = match message {
            Ok(Message::Text(text)) => {
                debug!(connection_id = %connection_id, payload = %text.as_str(), "received client message");
                handle_text(&state, &connection_id, text.as_str()).await
            }
            Ok(Message::Binary(_)) => Err(GatewayError::Binary),
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
                Ok(())
            }
            Ok(Message::Pong(_)) => Ok(()),
            Ok(Message::Close(frame)) => {
                info!(connection_id = %connection_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Err(err) => {
                warn!(connection_id = %connection_id, error = %err, "websocket error");
                break;
            }
        };

        if let Err(err) = outcome {
            if matches!(err, GatewayError::ConnectionClosed) {
                info!(connection_id = %connection_id, "connection closed while handling message, terminating");
                break;
            }
            warn!(connection_id = %connection_id, error = %err, "rejected client message");
            if send_message_to_websocket(&outbound_tx, &ServerMessage::error(err.to_string()))
                .is_err()
            {
                break;
            }
        }
    }

    room_service::disconnect(&state, &connection_id).await;
    info!(connection_id = %connection_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Parse one text frame and route it to the matching service.
async fn handle_text(
    state: &SharedState,
    connection_id: &str,
    text: &str,
) -> Result<(), GatewayError> {
    let message = ClientMessage::from_json_str(text)?;
    debug!(
        connection_id,
        event = message.name(),
        room_id = ?message.room_id(),
        "dispatching client message"
    );

    match message {
        ClientMessage::JoinQueue(req) => {
            matchmaking_service::join_queue(state, connection_id, &req.nickname, req.mode).await?
        }
        ClientMessage::JoinRoom(req) => {
            room_service::join_room(state, connection_id, &req.nickname, &req.room_id).await?
        }
        ClientMessage::StartMatch(req) => {
            room_service::start_match(state, connection_id, &req.room_id).await?
        }
        ClientMessage::PlayerReady(req) => {
            room_service::player_ready(state, connection_id, &req.room_id).await?
        }
        ClientMessage::WordTyped(req) => {
            room_service::submit_word(state, connection_id, &req.room_id, &req.word).await?
        }
        ClientMessage::UseElement(req) => {
            room_service::use_element(state, connection_id, &req.room_id, req.element, req.action)
                .await?
        }
        ClientMessage::LeaveMatch(req) => {
            room_service::leave_match(state, connection_id, &req.room_id).await?
        }
    }
    Ok(())
}

/// Serialize a payload into a text frame. Serialization failures are logged and yield `None`.
pub(crate) fn encode_message<T>(value: &T) -> Option<Message>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    match serde_json::to_string(value) {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(err) => {
            // Serialization failure is a permanent error (bug in code)
            warn!(error = %err, "failed to serialize message `{value:?}`");
            None
        }
    }
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `Ok(())` if the message was queued or could not be serialized (nothing to retry).
/// Returns `Err(GatewayError::ConnectionClosed)` if the writer channel is closed.
pub(crate) fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), GatewayError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let Some(frame) = encode_message(value) else {
        return Ok(());
    };
    tx.send(frame).map_err(|_| GatewayError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, ClientConnection},
    };

    fn connect(state: &SharedState, id: &str) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .connections()
            .insert(id.to_string(), ClientConnection::new(id.to_string(), tx));
        rx
    }

    fn next_event(rx: &mut mpsc::UnboundedReceiver<Message>) -> serde_json::Value {
        match rx.try_recv() {
            Ok(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frames_are_rejected_before_services() {
        let state = AppState::new(AppConfig::default());
        let _rx = connect(&state, "c1");

        let err = handle_text(&state, "c1", "not json").await.unwrap_err();
        assert!(matches!(err, GatewayError::Inbound(InboundError::Malformed(_))));

        let err = handle_text(
            &state,
            "c1",
            r#"{"event":"word_typed","data":{"roomId":"r1","word":"flame"}}"#,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GatewayError::Service(ServiceError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn join_room_frame_seats_the_client() {
        let state = AppState::new(AppConfig::default());
        let mut rx = connect(&state, "c1");

        handle_text(
            &state,
            "c1",
            r#"{"event":"join_room","data":{"roomId":"arena","nickname":"ana"}}"#,
        )
        .await
        .unwrap();

        let matched = next_event(&mut rx);
        assert_eq!(matched["event"], "matched");
        assert_eq!(matched["data"]["roomId"], "arena");
        assert_eq!(next_event(&mut rx)["event"], "room_update");
        assert_eq!(state.current_room("c1").as_deref(), Some("arena"));
    }

    #[test]
    fn closed_writer_is_reported() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let err = send_message_to_websocket(&tx, &ServerMessage::error("x")).unwrap_err();
        assert!(matches!(err, GatewayError::ConnectionClosed));
    }
}
