use std::sync::Arc;

use axum::{
    Router,
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    server::app_state::AppState,
    session::actor::SessionHandle,
    ws::{
        events::{ClientEvent, ServerEvent},
        registry,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Host,
    Participant,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
    pub name: Option<String>,
    pub participant_id: Option<Uuid>,
}

pub fn ws_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{code}", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!(
        "WebSocket connection request: code={}, role={:?}",
        code, params.role
    );

    ws.on_upgrade(move |socket| handle_socket(socket, code, params, state))
}

async fn handle_socket(socket: WebSocket, code: String, params: WsQuery, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();

    // Outbound path: one writer task per connection, fed by a bounded
    // queue so the session actor never blocks on this socket.
    let (out_tx, mut out_rx) = registry::outbound_channel();
    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Role is an explicit part of the handshake; ambiguous connections
    // are rejected outright.
    let role = match params.role.as_deref() {
        Some("host") => Role::Host,
        Some("participant") => Role::Participant,
        other => {
            debug!("Rejected connection with role {:?}", other);
            send_direct(
                &out_tx,
                ServerEvent::ProtocolError {
                    reason: "Missing or unknown role".into(),
                },
            )
            .await;
            return;
        }
    };

    let Some(handle) = state.get_sessions().get(&code) else {
        send_direct(
            &out_tx,
            ServerEvent::SessionError {
                code: "session_not_found",
                reason: format!("No active session with code {}", code),
            },
        )
        .await;
        return;
    };

    let connections = state.get_connections();
    let mut participant_id = None;

    // A replacement host registration fires this; the stale loop below
    // sees it and winds down instead of keeping host authority.
    let mut replaced: Option<oneshot::Receiver<()>> = None;

    match role {
        Role::Host => {
            let (shutdown_tx, shutdown_rx) = oneshot::channel();
            if !connections.register_host(&code, out_tx.clone(), shutdown_tx) {
                send_direct(
                    &out_tx,
                    ServerEvent::SessionError {
                        code: "session_not_found",
                        reason: format!("No active session with code {}", code),
                    },
                )
                .await;
                return;
            }
            replaced = Some(shutdown_rx);
        }
        Role::Participant => {
            // First join with a display name, rejoin with the id handed
            // out earlier. The score survives the disconnect either way.
            let joined = match (params.participant_id, params.name) {
                (Some(id), _) => handle.rejoin(id).await,
                (None, Some(name)) => handle.join(name).await,
                (None, None) => {
                    send_direct(
                        &out_tx,
                        ServerEvent::ProtocolError {
                            reason: "Participant connection requires a name".into(),
                        },
                    )
                    .await;
                    return;
                }
            };

            let ack = match joined {
                Ok(ack) => ack,
                Err(e) => {
                    send_direct(
                        &out_tx,
                        ServerEvent::SessionError {
                            code: e.code(),
                            reason: e.to_string(),
                        },
                    )
                    .await;
                    return;
                }
            };

            participant_id = Some(ack.participant_id);
            if !connections.register_participant(
                &code,
                ack.participant_id,
                &ack.display_name,
                out_tx.clone(),
            ) {
                send_direct(
                    &out_tx,
                    ServerEvent::SessionError {
                        code: "session_not_found",
                        reason: format!("No active session with code {}", code),
                    },
                )
                .await;
                return;
            }
        }
    }

    // Inbound loop: decode, validate the sender's role, hand the command
    // to the owning actor. Malformed frames only ever hurt this sender.
    loop {
        let next = match replaced.as_mut() {
            Some(shutdown) => tokio::select! {
                _ = shutdown => {
                    debug!("Host connection for session {} was replaced", code);
                    break;
                }
                message = stream.next() => message,
            },
            None => stream.next().await,
        };
        let Some(message) = next else { break };

        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => dispatch(event, role, participant_id, &handle, &out_tx).await,
                Err(e) => {
                    debug!("Malformed frame in session {}: {}", code, e);
                    send_direct(
                        &out_tx,
                        ServerEvent::ProtocolError {
                            reason: format!("Invalid message: {}", e),
                        },
                    )
                    .await;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error in session {}: {}", code, e);
                break;
            }
        }
    }

    // Disconnects are routine lifecycle, not errors. A connection that was
    // already replaced tears down only itself: the registry refuses the
    // stale unregister and the actor never hears about it.
    match role {
        Role::Host => {
            if connections.unregister_host(&code, &out_tx) {
                handle.host_gone().await;
                info!("Host disconnected from session {}", code);
            }
        }
        Role::Participant => {
            if let Some(id) = participant_id {
                if connections.unregister_participant(&code, id, &out_tx) {
                    handle.leave(id).await;
                    info!("Participant {} disconnected from session {}", id, code);
                }
            }
        }
    }

    drop(out_tx);
    let _ = writer.await;
}

async fn dispatch(
    event: ClientEvent,
    role: Role,
    participant_id: Option<Uuid>,
    handle: &SessionHandle,
    out_tx: &mpsc::Sender<ServerEvent>,
) {
    let allowed = match role {
        Role::Host => event.host_only(),
        Role::Participant => !event.host_only(),
    };
    if !allowed {
        send_direct(
            out_tx,
            ServerEvent::ProtocolError {
                reason: "Event not permitted for this role".into(),
            },
        )
        .await;
        return;
    }

    match event {
        ClientEvent::StartSession => handle.start().await,
        ClientEvent::NextQuestion { expected_index } => {
            handle.advance_question(expected_index).await
        }
        ClientEvent::EndSession => handle.end().await,
        ClientEvent::ScoreAnswer { answer_id, score } => handle.rescore(answer_id, score).await,
        ClientEvent::SubmitAnswer {
            question_id,
            answer_text,
            time_taken_seconds,
        } => {
            let Some(id) = participant_id else {
                error!("Participant connection without an id");
                return;
            };
            handle
                .submit_answer(id, question_id, answer_text, time_taken_seconds)
                .await
        }
    }
}

async fn send_direct(out_tx: &mpsc::Sender<ServerEvent>, event: ServerEvent) {
    let _ = out_tx.send(event).await;
}
