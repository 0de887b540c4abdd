//! REST surface for both protocol prefixes.
//!
//! Thin handlers over the registry and room state machines. All bodies
//! are JSON envelopes with a `success` flag; errors map to
//! `{ success: false, error }` with the matching status code.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::robotics::{JointUpdate, RoboticsMessage};
use crate::protocol::signal::SignalRequest;
use crate::protocol::video::{RecoveryConfig, RecoveryPolicy, VideoConfig, VideoMessage};
use crate::protocol::ParticipantRole;
use crate::registry::RegistryError;
use crate::room::{RoboticsRoom, VideoRoom};
use crate::signaling::{self, SignalError};

use super::AppState;

/// REST error with its protocol status code.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("room already exists: {0}")]
    RoomExists(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("target peer not found: {0}")]
    PeerNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::RoomNotFound => StatusCode::NOT_FOUND,
            ApiError::RoomExists(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PeerNotFound(_) => StatusCode::NOT_FOUND,
        };
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::RoomNotFound { .. } => ApiError::RoomNotFound,
            RegistryError::RoomExists {
                workspace_id,
                room_id,
            } => ApiError::RoomExists(format!("{workspace_id}/{room_id}")),
        }
    }
}

impl From<SignalError> for ApiError {
    fn from(err: SignalError) -> Self {
        match err {
            SignalError::UnknownPeer(peer) => ApiError::PeerNotFound(peer),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Room creation request, shared by both protocols. The video fields
/// are ignored by the robotics surface.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRoomRequest {
    pub room_id: Option<String>,
    /// Accepted for wire compatibility; the path workspace wins.
    pub workspace_id: Option<String>,
    pub config: Option<VideoConfig>,
    pub recovery_config: Option<RecoveryConfig>,
}

/// Joint commands injected over REST instead of a producer socket.
#[derive(Debug, Clone, Deserialize)]
pub struct JointCommandRequest {
    pub joints: Vec<JointUpdate>,
}

// ============= SHARED =============

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server_running": true,
    }))
}

// ============= ROBOTICS =============

pub async fn robotics_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "robotics"}))
}

pub async fn robotics_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "robotics",
        "status": "active",
        "workspaces_count": state.robotics.workspace_count().await,
        "rooms_count": state.robotics.room_count().await,
        "connections_count": state.stats.robotics().active(),
        "version": env!("CARGO_PKG_VERSION"),
        "supported_roles": [
            ParticipantRole::Producer.as_str(),
            ParticipantRole::Consumer.as_str(),
        ],
    }))
}

pub async fn robotics_list_rooms(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> Json<Value> {
    let mut rooms = Vec::new();
    for room in state.robotics.list(&workspace_id).await {
        rooms.push(room.read().await.info());
    }

    Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "total": rooms.len(),
        "rooms": rooms,
    }))
}

pub async fn robotics_create_room(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    body: Option<Json<CreateRoomRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = body.map(|Json(body)| body).unwrap_or_default();

    let room_id = state
        .robotics
        .create_room(&workspace_id, request.room_id, |id| {
            RoboticsRoom::new(&workspace_id, id)
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "room_id": room_id,
        "message": format!("Room {room_id} created successfully in workspace {workspace_id}"),
    })))
}

pub async fn robotics_get_room(
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let room = state.robotics.get(&workspace_id, &room_id).await?;
    let info = room.read().await.info();

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "room": info,
    })))
}

pub async fn robotics_room_state(
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let room = state.robotics.get(&workspace_id, &room_id).await?;
    let room_state = room.read().await.state();

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "state": room_state,
    })))
}

pub async fn robotics_delete_room(
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let room = state.robotics.remove(&workspace_id, &room_id).await?;

    room.write()
        .await
        .roster
        .close_all(Some(RoboticsMessage::error("room_deleted")))
        .await;

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "message": format!("Room {room_id} deleted successfully from workspace {workspace_id}"),
    })))
}

/// Inject joint commands into a room as if the producer had sent them.
/// The fan-out carries `source: "api"`.
pub async fn robotics_send_command(
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
    Json(command): Json<JointCommandRequest>,
) -> Result<Json<Value>, ApiError> {
    let room = state.robotics.get(&workspace_id, &room_id).await?;

    let joints_updated = command.joints.len();
    let mut room = room.write().await;
    let plan = room.apply(
        "api",
        ParticipantRole::Producer,
        RoboticsMessage::JointUpdate {
            data: command.joints,
            source: None,
            timestamp: None,
        },
    );
    for outbound in plan {
        room.roster.deliver("api", outbound).await;
    }

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "room_id": room_id,
        "joints_updated": joints_updated,
        "message": "Commands sent successfully",
    })))
}

// ============= VIDEO =============

pub async fn video_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "video"}))
}

pub async fn video_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "video",
        "status": "active",
        "workspaces_count": state.video.workspace_count().await,
        "rooms_count": state.video.room_count().await,
        "connections_count": state.stats.video().active(),
        "version": env!("CARGO_PKG_VERSION"),
        "supported_roles": [
            ParticipantRole::Producer.as_str(),
            ParticipantRole::Consumer.as_str(),
        ],
        "supported_encodings": ["jpeg", "h264", "vp8", "vp9"],
        "recovery_policies": RecoveryPolicy::all()
            .iter()
            .map(|policy| policy.as_str())
            .collect::<Vec<_>>(),
    }))
}

pub async fn video_list_rooms(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> Json<Value> {
    let mut rooms = Vec::new();
    for room in state.video.list(&workspace_id).await {
        rooms.push(room.read().await.info());
    }

    Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "total": rooms.len(),
        "rooms": rooms,
    }))
}

pub async fn video_create_room(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
    body: Option<Json<CreateRoomRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = body.map(|Json(body)| body).unwrap_or_default();

    let room_id = state
        .video
        .create_room(&workspace_id, request.room_id, |id| {
            VideoRoom::new(&workspace_id, id, request.config, request.recovery_config)
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "room_id": room_id,
        "message": format!(
            "Video room {room_id} created successfully in workspace {workspace_id}"
        ),
    })))
}

pub async fn video_get_room(
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let room = state.video.get(&workspace_id, &room_id).await?;
    let info = room.read().await.info();

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "room": info,
    })))
}

pub async fn video_room_state(
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let room = state.video.get(&workspace_id, &room_id).await?;
    let room_state = room.read().await.state();

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "state": room_state,
    })))
}

pub async fn video_delete_room(
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let room = state.video.remove(&workspace_id, &room_id).await?;

    room.write()
        .await
        .roster
        .close_all(Some(VideoMessage::error("room_deleted")))
        .await;

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "message": format!("Room {room_id} deleted successfully from workspace {workspace_id}"),
    })))
}

pub async fn video_signal(
    State(state): State<AppState>,
    Path((workspace_id, room_id)): Path<(String, String)>,
    Json(request): Json<SignalRequest>,
) -> Result<Json<Value>, ApiError> {
    let room = state.video.get(&workspace_id, &room_id).await?;

    let room = room.read().await;
    let outcome = signaling::relay(&room, &request.client_id, request.message).await?;

    Ok(Json(json!({
        "success": true,
        "workspace_id": workspace_id,
        "response": {
            "success": true,
            "message": outcome.note,
        },
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::signal::RawSignal;
    use crate::room::OutboundQueue;
    use crate::server::ServerConfig;

    fn state() -> AppState {
        AppState::new(ServerConfig::default())
    }

    fn create_body(room_id: &str) -> Option<Json<CreateRoomRequest>> {
        Some(Json(CreateRoomRequest {
            room_id: Some(room_id.into()),
            ..CreateRoomRequest::default()
        }))
    }

    #[tokio::test]
    async fn create_then_get_room_round_trip() {
        let state = state();

        let Json(created) = robotics_create_room(
            State(state.clone()),
            Path("W1".into()),
            create_body("R1"),
        )
        .await
        .unwrap();
        assert_eq!(created["success"], true);
        assert_eq!(created["room_id"], "R1");
        assert_eq!(created["workspace_id"], "W1");

        let Json(fetched) =
            robotics_get_room(State(state), Path(("W1".into(), "R1".into())))
                .await
                .unwrap();
        assert_eq!(fetched["room"]["id"], "R1");
        assert_eq!(fetched["room"]["participants"]["total"], 0);
        assert_eq!(fetched["room"]["has_producer"], false);
    }

    #[tokio::test]
    async fn create_without_body_generates_room_id() {
        let state = state();
        let Json(created) = robotics_create_room(State(state), Path("W1".into()), None)
            .await
            .unwrap();

        let room_id = created["room_id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(room_id).is_ok());
    }

    #[tokio::test]
    async fn duplicate_room_is_a_conflict() {
        let state = state();
        robotics_create_room(State(state.clone()), Path("W1".into()), create_body("R1"))
            .await
            .unwrap();

        let err = robotics_create_room(State(state), Path("W1".into()), create_body("R1"))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_room_is_not_found() {
        let state = state();
        let err = robotics_get_room(State(state.clone()), Path(("W1".into(), "nope".into())))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = robotics_delete_room(State(state), Path(("W1".into(), "nope".into())))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let state = state();
        robotics_create_room(State(state.clone()), Path("W1".into()), create_body("R1"))
            .await
            .unwrap();

        robotics_delete_room(State(state.clone()), Path(("W1".into(), "R1".into())))
            .await
            .unwrap();

        let err = robotics_room_state(State(state), Path(("W1".into(), "R1".into())))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn command_updates_state_and_fans_out() {
        let state = state();
        robotics_create_room(State(state.clone()), Path("W1".into()), create_body("R1"))
            .await
            .unwrap();

        // Wire a consumer queue into the room the way the WS layer does.
        let queue = Arc::new(OutboundQueue::new(
            16,
            RoboticsMessage::backpressure_notice,
        ));
        {
            let room = state.robotics.get("W1", "R1").await.unwrap();
            room.write()
                .await
                .roster
                .admit("c1", ParticipantRole::Consumer, Arc::clone(&queue))
                .unwrap();
        }

        let Json(response) = robotics_send_command(
            State(state.clone()),
            Path(("W1".into(), "R1".into())),
            Json(JointCommandRequest {
                joints: vec![JointUpdate {
                    name: "shoulder".into(),
                    value: 45.0,
                    speed: None,
                }],
            }),
        )
        .await
        .unwrap();
        assert_eq!(response["joints_updated"], 1);

        let Json(room_state) =
            robotics_room_state(State(state), Path(("W1".into(), "R1".into())))
                .await
                .unwrap();
        assert_eq!(room_state["state"]["joints"]["shoulder"], 45.0);

        match queue.recv().await.unwrap() {
            RoboticsMessage::JointUpdate { data, source, .. } => {
                assert_eq!(data[0].name, "shoulder");
                assert_eq!(source.as_deref(), Some("api"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn video_room_carries_config() {
        let state = state();
        let Json(created) = video_create_room(
            State(state.clone()),
            Path("W1".into()),
            Some(Json(CreateRoomRequest {
                room_id: Some("V1".into()),
                config: Some(VideoConfig {
                    framerate: Some(60),
                    ..VideoConfig::default()
                }),
                ..CreateRoomRequest::default()
            })),
        )
        .await
        .unwrap();
        assert_eq!(created["room_id"], "V1");

        let Json(fetched) = video_get_room(State(state), Path(("W1".into(), "V1".into())))
            .await
            .unwrap();
        assert_eq!(fetched["room"]["config"]["framerate"], 60);
        assert_eq!(fetched["room"]["frame_count"], 0);
    }

    #[tokio::test]
    async fn signal_endpoint_relays_to_target() {
        let state = state();
        video_create_room(State(state.clone()), Path("W1".into()), create_body("V1"))
            .await
            .unwrap();

        let vc_queue = Arc::new(OutboundQueue::new(16, VideoMessage::backpressure_notice));
        {
            let room = state.video.get("W1", "V1").await.unwrap();
            let mut room = room.write().await;
            room.roster
                .admit(
                    "VP",
                    ParticipantRole::Producer,
                    Arc::new(OutboundQueue::new(16, VideoMessage::backpressure_notice)),
                )
                .unwrap();
            room.roster
                .admit("VC", ParticipantRole::Consumer, Arc::clone(&vc_queue))
                .unwrap();
        }

        let Json(response) = video_signal(
            State(state),
            Path(("W1".into(), "V1".into())),
            Json(SignalRequest {
                client_id: "VP".into(),
                message: RawSignal::Offer {
                    sdp: "v=0...".into(),
                    target_consumer: Some("VC".into()),
                },
            }),
        )
        .await
        .unwrap();
        assert_eq!(response["success"], true);
        assert_eq!(response["response"]["message"], "Offer forwarded to consumer");

        match vc_queue.recv().await.unwrap() {
            VideoMessage::WebrtcOffer { from_producer, .. } => {
                assert_eq!(from_producer, "VP");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn signal_to_missing_peer_is_not_found() {
        let state = state();
        video_create_room(State(state.clone()), Path("W1".into()), create_body("V1"))
            .await
            .unwrap();
        {
            let room = state.video.get("W1", "V1").await.unwrap();
            room.write()
                .await
                .roster
                .admit(
                    "VP",
                    ParticipantRole::Producer,
                    Arc::new(OutboundQueue::new(16, VideoMessage::backpressure_notice)),
                )
                .unwrap();
        }

        let err = video_signal(
            State(state),
            Path(("W1".into(), "V1".into())),
            Json(SignalRequest {
                client_id: "VP".into(),
                message: RawSignal::Offer {
                    sdp: "v=0...".into(),
                    target_consumer: Some("VC".into()),
                },
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_and_status_envelopes() {
        let Json(health) = health().await;
        assert_eq!(health["status"], "healthy");

        let state = state();
        let Json(status) = video_status(State(state)).await;
        assert_eq!(status["service"], "video");
        assert_eq!(status["rooms_count"], 0);
        assert!(status["recovery_policies"]
            .as_array()
            .unwrap()
            .contains(&json!("freeze_last_frame")));
    }
}
