use axum::extract::{
    Query, State,
    ws::{self, WebSocket, WebSocketUpgrade},
};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game_logic::messages::{ClientToServerMessage, ServerToClientMessage};
use crate::game_logic::QuizSession;
use crate::session_actor::{SessionActorHandle, SessionOptions};
use crate::state::AppState;

const SESSION_CHANNEL_SIZE: usize = 32;

/// Query string of the quiz page: `?g=<game id>`.
#[derive(Deserialize, Debug, Default)]
pub struct PlayQuery {
    pub g: Option<String>,
}

pub async fn ws_handler(
    ws_upgrade: WebSocketUpgrade,
    State(app_state): State<AppState>,
    Query(query): Query<PlayQuery>,
) -> impl IntoResponse {
    let game_id = query
        .g
        .filter(|g| !g.trim().is_empty())
        .unwrap_or_else(|| app_state.quiz_config.default_game_id.clone());
    tracing::info!(game.id = %game_id, "WebSocket: Connection attempt");
    ws_upgrade.on_upgrade(move |socket| handle_socket(socket, app_state, game_id))
}

#[tracing::instrument(skip(socket, app_state))]
pub async fn handle_socket(socket: WebSocket, app_state: AppState, game_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let records = match app_state.loader.load(&game_id).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket: Could not load question set. Closing");
            let error_response = ServerToClientMessage::SystemError {
                message: format!("Could not load {}", game_id),
            };
            if let Ok(ws_msg) = error_response.to_ws_text() {
                let _ = ws_sender.send(ws_msg).await;
            }
            let _ = ws_sender.close().await;
            return;
        }
    };

    let session = QuizSession::new(&records, app_state.quiz_config.questions_per_session);
    let session_id = Uuid::new_v4();

    let (outbound_tx, mut outbound_rx) =
        mpsc::channel::<ServerToClientMessage>(SESSION_CHANNEL_SIZE);

    let game_info = ServerToClientMessage::GameInfo {
        title: app_state.titles.resolve(&game_id),
        page_title: app_state.titles.page_title(&game_id),
        pool_size: session.pool_size(),
        skipped_questions: session.rejected().len(),
        game_id: game_id.clone(),
    };
    // Buffered until the send task drains it, so it always precedes the first snapshot.
    if outbound_tx.send(game_info).await.is_err() {
        return;
    }

    let session_handle = SessionActorHandle::spawn(
        session_id,
        SESSION_CHANNEL_SIZE,
        session,
        SessionOptions::from(app_state.quiz_config.as_ref()),
        outbound_tx,
    );
    tracing::info!(session.id = %session_id, "WebSocket: Session created");

    if let Err(e) = session_handle.send_command(ClientToServerMessage::Start).await {
        tracing::error!(session.id = %session_id, "Failed to start session: {}", e);
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let ws_msg = match message.to_ws_text() {
                Ok(ws_msg) => ws_msg,
                Err(e) => {
                    tracing::error!(session.id = %session_id, "Failed to serialize message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(ws_msg).await.is_err() {
                tracing::info!(
                    session.id = %session_id,
                    "WS send error, client likely disconnected"
                );
                break;
            }
        }
        tracing::debug!(session.id = %session_id, "Send task terminating");
        let _ = ws_sender.close().await;
    });

    let recv_handle = session_handle.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            match ws_receiver.next().await {
                Some(Ok(ws::Message::Text(text_msg))) => {
                    tracing::debug!(session.id = %session_id, "Received text from WS: {:?}", text_msg);
                    if let Err(e) = recv_handle.forward_client_event(text_msg.to_string()).await {
                        tracing::debug!(session.id = %session_id, "Session gone: {}", e);
                        break;
                    }
                }
                Some(Ok(ws::Message::Close(_))) => {
                    tracing::info!(session.id = %session_id, "WebSocket closed by client");
                    break;
                }
                Some(Ok(other)) => {
                    tracing::trace!(session.id = %session_id, "Ignoring WS frame: {:?}", other);
                }
                Some(Err(e)) => {
                    tracing::warn!(session.id = %session_id, "WebSocket error (recv): {}", e);
                    break;
                }
                None => {
                    tracing::info!(session.id = %session_id, "WebSocket connection closed");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            tracing::debug!(session.id = %session_id, "Send task finished, aborting recv task");
            recv_task.abort();
        },
        _ = (&mut recv_task) => {
            tracing::debug!(session.id = %session_id, "Recv task finished, aborting send task");
            send_task.abort();
        },
    }

    // Dropping the last handle closes the actor's channel, which cancels any pending reveal.
    drop(session_handle);
    tracing::info!(session.id = %session_id, "WebSocket: Session torn down");
}
