//! WebSocket session handling.
//!
//! One socket per participant. The handshake is strict: the first text
//! frame must be the join request, anything else gets an `error` frame
//! and a close. After admission the socket splits into a reader loop
//! (decode → apply → fan out) and a writer task draining the
//! participant's bounded outbound queue; either side ending tears the
//! session down and evicts the participant from its room.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::time::timeout;

use crate::protocol::robotics::RoboticsMessage;
use crate::protocol::video::VideoMessage;
use crate::protocol::{wire_now, JoinRequest, ParticipantRole};
use crate::room::{Outbound, OutboundQueue, Target};

use super::AppState;

pub async fn robotics_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
) -> Response {
    ws.on_upgrade(move |socket| robotics_session(socket, state, workspace_id, room_id))
}

pub async fn video_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
) -> Response {
    ws.on_upgrade(move |socket| video_session(socket, state, workspace_id, room_id))
}

/// Wait for the join frame that must open every session. Ping/pong
/// frames are transparent; any other non-text frame is a violation.
async fn read_join(
    receiver: &mut SplitStream<WebSocket>,
    join_timeout: Duration,
) -> Result<JoinRequest, String> {
    let first_frame = async {
        while let Some(Ok(frame)) = receiver.next().await {
            match frame {
                Message::Ping(_) | Message::Pong(_) => continue,
                other => return Some(other),
            }
        }
        None
    };

    let frame = match timeout(join_timeout, first_frame).await {
        Ok(Some(frame)) => frame,
        Ok(None) => return Err("connection closed before join".into()),
        Err(_) => return Err("timed out waiting for join message".into()),
    };

    let Message::Text(text) = frame else {
        return Err("first frame must be a text join message".into());
    };
    serde_json::from_str::<JoinRequest>(&text).map_err(|e| format!("invalid join message: {e}"))
}

async fn send_json<M: Serialize>(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &M,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}

/// Writer half: drain the outbound queue onto the socket until the
/// queue closes or the peer goes away.
fn spawn_writer<M: Serialize + Send + Sync + 'static>(
    mut sender: SplitSink<WebSocket, Message>,
    queue: Arc<OutboundQueue<M>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            if send_json(&mut sender, &message).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

async fn robotics_session(
    socket: WebSocket,
    state: AppState,
    workspace_id: String,
    room_id: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let join = match read_join(&mut receiver, state.config.join_timeout).await {
        Ok(join) => join,
        Err(reason) => {
            let _ = send_json(&mut sender, &RoboticsMessage::error(reason)).await;
            let _ = sender.close().await;
            return;
        }
    };

    let room = match state.robotics.get(&workspace_id, &room_id).await {
        Ok(room) => room,
        Err(e) => {
            let _ = send_json(&mut sender, &RoboticsMessage::error(e.to_string())).await;
            let _ = sender.close().await;
            return;
        }
    };

    let queue = Arc::new(OutboundQueue::new(
        state.config.outbound_queue_capacity,
        RoboticsMessage::backpressure_notice,
    ));

    // Admit under the room lock; a robotics consumer also catches up on
    // the current snapshot, after the join acknowledgment.
    let snapshot = {
        let mut room = room.write().await;
        if let Err(e) = room
            .roster
            .admit(&join.participant_id, join.role, Arc::clone(&queue))
        {
            drop(room);
            let _ = send_json(&mut sender, &RoboticsMessage::error(e.to_string())).await;
            let _ = sender.close().await;
            return;
        }
        if join.role == ParticipantRole::Consumer && !room.joints().is_empty() {
            Some(room.snapshot())
        } else {
            None
        }
    };

    state.stats.robotics().opened();
    tracing::info!(
        workspace = %workspace_id,
        room = %room_id,
        participant = %join.participant_id,
        role = %join.role,
        "Participant joined robotics room"
    );

    queue
        .push(RoboticsMessage::Joined {
            room_id: room_id.clone(),
            workspace_id: workspace_id.clone(),
            role: join.role,
            timestamp: Some(wire_now()),
        })
        .await;
    if let Some(joints) = snapshot {
        queue
            .push(RoboticsMessage::StateSync {
                data: joints,
                timestamp: Some(wire_now()),
            })
            .await;
    }

    let writer = spawn_writer(sender, Arc::clone(&queue));

    while let Some(Ok(frame)) = receiver.next().await {
        match frame {
            Message::Text(text) => {
                let message: RoboticsMessage = match serde_json::from_str(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!(
                            participant = %join.participant_id,
                            error = %e,
                            "Undecodable frame"
                        );
                        queue
                            .push(RoboticsMessage::error(format!("invalid message: {e}")))
                            .await;
                        continue;
                    }
                };

                let mut room = room.write().await;
                let plan = room.apply(&join.participant_id, join.role, message);
                for outbound in plan {
                    room.roster.deliver(&join.participant_id, outbound).await;
                }
            }
            Message::Binary(_) => {
                queue
                    .push(RoboticsMessage::error("binary frames are not supported"))
                    .await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    room.write().await.roster.evict(&join.participant_id);
    queue.close().await;
    let _ = writer.await;

    state.stats.robotics().closed();
    tracing::info!(
        workspace = %workspace_id,
        room = %room_id,
        participant = %join.participant_id,
        "Participant left robotics room"
    );
}

async fn video_session(
    socket: WebSocket,
    state: AppState,
    workspace_id: String,
    room_id: String,
) {
    let (mut sender, mut receiver) = socket.split();

    let join = match read_join(&mut receiver, state.config.join_timeout).await {
        Ok(join) => join,
        Err(reason) => {
            let _ = send_json(&mut sender, &VideoMessage::error(reason)).await;
            let _ = sender.close().await;
            return;
        }
    };

    let room = match state.video.get(&workspace_id, &room_id).await {
        Ok(room) => room,
        Err(e) => {
            let _ = send_json(&mut sender, &VideoMessage::error(e.to_string())).await;
            let _ = sender.close().await;
            return;
        }
    };

    let queue = Arc::new(OutboundQueue::new(
        state.config.outbound_queue_capacity,
        VideoMessage::backpressure_notice,
    ));

    {
        let mut room = room.write().await;
        if let Err(e) = room
            .roster
            .admit(&join.participant_id, join.role, Arc::clone(&queue))
        {
            drop(room);
            let _ = send_json(&mut sender, &VideoMessage::error(e.to_string())).await;
            let _ = sender.close().await;
            return;
        }

        // Video rooms announce arrivals to everyone already present.
        room.roster
            .deliver(
                &join.participant_id,
                Outbound::new(
                    Target::Others,
                    VideoMessage::ParticipantJoined {
                        room_id: room_id.clone(),
                        participant_id: join.participant_id.clone(),
                        role: join.role,
                        timestamp: Some(wire_now()),
                    },
                ),
            )
            .await;
    }

    state.stats.video().opened();
    tracing::info!(
        workspace = %workspace_id,
        room = %room_id,
        participant = %join.participant_id,
        role = %join.role,
        "Participant joined video room"
    );

    queue
        .push(VideoMessage::Joined {
            room_id: room_id.clone(),
            workspace_id: workspace_id.clone(),
            role: join.role,
            timestamp: Some(wire_now()),
        })
        .await;

    let writer = spawn_writer(sender, Arc::clone(&queue));

    while let Some(Ok(frame)) = receiver.next().await {
        match frame {
            Message::Text(text) => {
                let message: VideoMessage = match serde_json::from_str(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!(
                            participant = %join.participant_id,
                            error = %e,
                            "Undecodable frame"
                        );
                        queue
                            .push(VideoMessage::error(format!("invalid message: {e}")))
                            .await;
                        continue;
                    }
                };

                let mut room = room.write().await;
                let plan = room.apply(&join.participant_id, join.role, message);
                for outbound in plan {
                    room.roster.deliver(&join.participant_id, outbound).await;
                }
            }
            Message::Binary(_) => {
                queue
                    .push(VideoMessage::error("binary frames are not supported"))
                    .await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut room = room.write().await;
        if let Some(role) = room.roster.evict(&join.participant_id) {
            room.roster
                .deliver(
                    &join.participant_id,
                    Outbound::new(
                        Target::Room,
                        VideoMessage::ParticipantLeft {
                            room_id: room_id.clone(),
                            participant_id: join.participant_id.clone(),
                            role,
                            timestamp: Some(wire_now()),
                        },
                    ),
                )
                .await;
        }
    }
    queue.close().await;
    let _ = writer.await;

    state.stats.video().closed();
    tracing::info!(
        workspace = %workspace_id,
        room = %room_id,
        participant = %join.participant_id,
        "Participant left video room"
    );
}
