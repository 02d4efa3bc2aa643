use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientConnectedPayload, ClientMessage, ServerMessage},
    error::{ErrorCode, ProtocolError, ServiceError},
    services::{live_events, room_service},
    state::{SharedState, hub::LiveConnection, state_machine::RoomStatus},
};

/// Per-connection state kept by the reader loop.
#[derive(Debug, Default)]
pub struct Session {
    user_id: Option<Uuid>,
}

impl Session {
    /// User bound by `CLIENT_CONNECTED`, if any.
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }
}

/// Handle the full lifecycle of a live room connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket, room_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (connection, mut outbound_rx) = state.hub().register(room_id).await;
    info!(room_id = %room_id, connection_id = %connection.id, "live connection opened");

    // The writer ends once the hub drops the sender, on unregister or on eviction.
    let mut writer_task: JoinHandle<()> = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut session = Session::default();
    let mut writer_done = false;
    loop {
        tokio::select! {
            _ = &mut writer_task => {
                debug!(connection_id = %connection.id, "writer stopped, closing connection");
                writer_done = true;
                break;
            }
            message = receiver.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&state, &connection, &mut session, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Binary(_))) => {
                    reply_error(
                        &state,
                        &connection,
                        ProtocolError::new(ErrorCode::InvalidMessage, "binary frames are not supported"),
                    )
                    .await;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(connection_id = %connection.id, error = %err, "websocket error");
                    break;
                }
            }
        }
    }

    state.hub().unregister(&connection).await;
    if !writer_done {
        let _ = writer_task.await;
    }
    info!(
        room_id = %room_id,
        connection_id = %connection.id,
        user_id = ?session.user_id,
        "live connection closed"
    );
}

/// Parse and dispatch one inbound text frame. Failures are answered to this connection only.
pub async fn handle_text(
    state: &SharedState,
    connection: &LiveConnection,
    session: &mut Session,
    text: &str,
) {
    let result = match ClientMessage::from_json_str(text) {
        Ok(message) => dispatch(state, connection, session, message).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        warn!(
            room_id = %connection.room_id,
            connection_id = %connection.id,
            code = ?err.code,
            message = %err.message,
            "live message rejected"
        );
        reply_error(state, connection, err).await;
    }
}

async fn reply_error(state: &SharedState, connection: &LiveConnection, err: ProtocolError) {
    state
        .hub()
        .send_to(connection, &ServerMessage::from(err))
        .await;
}

async fn dispatch(
    state: &SharedState,
    connection: &LiveConnection,
    session: &mut Session,
    message: ClientMessage,
) -> Result<(), ProtocolError> {
    let room_id = connection.room_id;

    if let ClientMessage::ClientConnected(payload) = message {
        return identify(state, connection, session, payload).await;
    }
    let Some(user_id) = session.user_id else {
        return Err(ProtocolError::new(
            ErrorCode::NotIdentified,
            "send CLIENT_CONNECTED first",
        ));
    };

    match message {
        ClientMessage::ClientConnected(_) => Ok(()),
        ClientMessage::FetchParticipants => {
            live_events::broadcast_participants(state, room_id).await?;
            Ok(())
        }
        ClientMessage::SubmitTopic(round) => {
            let outcome = room_service::start_discussion(state, room_id, user_id, &round).await?;
            if outcome.room.status() == RoomStatus::Discussing {
                live_events::mirror_room_state(
                    state,
                    room_id,
                    RoomStatus::Discussing,
                    outcome.transitioned,
                )
                .await?;
            }
            Ok(())
        }
        ClientMessage::Answering(payload) => {
            room_service::submit_final_answer(state, room_id, user_id, &payload).await?;
            live_events::mirror_room_state(state, room_id, RoomStatus::Checking, false).await?;
            Ok(())
        }
    }
}

async fn identify(
    state: &SharedState,
    connection: &LiveConnection,
    session: &mut Session,
    payload: ClientConnectedPayload,
) -> Result<(), ProtocolError> {
    let room_id = connection.room_id;
    match state
        .participants()
        .find_by_room_and_user(room_id, payload.user_id)
        .await
    {
        Ok(_) => {}
        Err(err) if err.is_not_found() => {
            return Err(ProtocolError::new(
                ErrorCode::Forbidden,
                format!("user `{}` is not a participant of this room", payload.user_id),
            ));
        }
        Err(err) => return Err(ServiceError::from(err).into()),
    }

    if let Some(previous) = session.user_id.replace(payload.user_id) {
        if previous != payload.user_id {
            warn!(connection_id = %connection.id, %previous, "connection re-identified as another user");
        }
    }
    info!(
        room_id = %room_id,
        user_id = %payload.user_id,
        user_name = %payload.user_name,
        "live client identified"
    );

    let room = room_service::load_room(state, room_id).await?;
    let snapshot = live_events::build_room_state(state, &room, room.status()).await;
    state.hub().send_to(connection, &snapshot).await;
    live_events::broadcast_participants(state, room_id).await?;
    Ok(())
}
