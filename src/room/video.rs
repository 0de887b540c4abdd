//! Video room: stream configuration, telemetry, and router policy.
//!
//! The fabric sees no frame bytes; media flows peer-to-peer once the
//! signaling broker has relayed the negotiation. This room only routes
//! lifecycle and observability traffic and keeps the stream config
//! authoritative.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::video::{RecoveryConfig, VideoConfig, VideoMessage};
use crate::protocol::{wire_now, ParticipantRole, ParticipantSummary};

use super::roster::Roster;
use super::Outbound;

/// A video room: one producer slot, a consumer set, the stream config,
/// and frame telemetry self-reported by the producer.
pub struct VideoRoom {
    pub workspace_id: String,
    pub room_id: String,
    pub created_at: DateTime<Utc>,
    pub roster: Roster<VideoMessage>,
    config: VideoConfig,
    recovery_config: RecoveryConfig,
    frame_count: u64,
    last_frame_at: Option<DateTime<Utc>>,
}

/// Basic room information.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRoomInfo {
    pub id: String,
    pub workspace_id: String,
    pub participants: ParticipantSummary,
    pub frame_count: u64,
    pub config: VideoConfig,
    pub has_producer: bool,
    pub active_consumers: usize,
}

/// Detailed room state.
#[derive(Debug, Clone, Serialize)]
pub struct VideoRoomState {
    pub room_id: String,
    pub workspace_id: String,
    pub participants: ParticipantSummary,
    pub frame_count: u64,
    pub last_frame_time: Option<String>,
    pub current_config: VideoConfig,
    pub timestamp: String,
}

impl VideoRoom {
    pub fn new(
        workspace_id: impl Into<String>,
        room_id: impl Into<String>,
        config: Option<VideoConfig>,
        recovery_config: Option<RecoveryConfig>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            room_id: room_id.into(),
            created_at: Utc::now(),
            roster: Roster::new(),
            config: config.unwrap_or_default(),
            recovery_config: recovery_config.unwrap_or_default(),
            frame_count: 0,
            last_frame_at: None,
        }
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    pub fn recovery_config(&self) -> &RecoveryConfig {
        &self.recovery_config
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn info(&self) -> VideoRoomInfo {
        VideoRoomInfo {
            id: self.room_id.clone(),
            workspace_id: self.workspace_id.clone(),
            participants: self.roster.summary(),
            frame_count: self.frame_count,
            config: self.config.clone(),
            has_producer: self.roster.has_producer(),
            active_consumers: self.roster.consumer_count(),
        }
    }

    pub fn state(&self) -> VideoRoomState {
        VideoRoomState {
            room_id: self.room_id.clone(),
            workspace_id: self.workspace_id.clone(),
            participants: self.roster.summary(),
            frame_count: self.frame_count,
            last_frame_time: self.last_frame_at.map(|t| t.to_rfc3339()),
            current_config: self.config.clone(),
            timestamp: wire_now(),
        }
    }

    fn role_error(kind: &str, role: ParticipantRole) -> Vec<Outbound<VideoMessage>> {
        vec![Outbound::to_sender(VideoMessage::error(format!(
            "message type not supported for {role}: {kind}"
        )))]
    }

    /// Apply one inbound message and return the dispatch plan.
    pub fn apply(
        &mut self,
        sender: &str,
        role: ParticipantRole,
        message: VideoMessage,
    ) -> Vec<Outbound<VideoMessage>> {
        match message {
            VideoMessage::StreamStarted {
                config, timestamp, ..
            } => {
                if role != ParticipantRole::Producer {
                    return Self::role_error("stream_started", role);
                }
                // A new stream restarts frame telemetry.
                self.frame_count = 0;
                self.last_frame_at = None;
                tracing::info!(
                    workspace = %self.workspace_id,
                    room = %self.room_id,
                    participant = %sender,
                    "Stream started"
                );
                vec![Outbound::to_consumers(VideoMessage::StreamStarted {
                    config,
                    participant_id: sender.into(),
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            VideoMessage::StreamStopped {
                reason, timestamp, ..
            } => {
                if role != ParticipantRole::Producer {
                    return Self::role_error("stream_stopped", role);
                }
                tracing::info!(
                    workspace = %self.workspace_id,
                    room = %self.room_id,
                    participant = %sender,
                    "Stream stopped"
                );
                vec![Outbound::to_consumers(VideoMessage::StreamStopped {
                    participant_id: sender.into(),
                    reason,
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            VideoMessage::VideoConfigUpdate {
                config, timestamp, ..
            } => {
                if role != ParticipantRole::Producer {
                    return Self::role_error("video_config_update", role);
                }
                self.config.merge(&config);
                vec![Outbound::to_consumers(VideoMessage::VideoConfigUpdate {
                    config,
                    source: Some(sender.into()),
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            VideoMessage::RecoveryTriggered {
                policy,
                reason,
                timestamp,
            } => {
                if role != ParticipantRole::Consumer {
                    return Self::role_error("recovery_triggered", role);
                }
                vec![Outbound::to_others(VideoMessage::RecoveryTriggered {
                    policy,
                    reason,
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            VideoMessage::EmergencyStop {
                reason, timestamp, ..
            } => {
                tracing::warn!(
                    workspace = %self.workspace_id,
                    room = %self.room_id,
                    participant = %sender,
                    "Emergency stop triggered"
                );
                let reason = if reason.is_empty() {
                    "Emergency stop triggered".to_string()
                } else {
                    reason
                };
                vec![Outbound::to_room(VideoMessage::EmergencyStop {
                    reason,
                    source: Some(sender.into()),
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            VideoMessage::StatusUpdate {
                status,
                data,
                timestamp,
            } => vec![Outbound::to_others(VideoMessage::StatusUpdate {
                status,
                data,
                timestamp: timestamp.or_else(|| Some(wire_now())),
            })],
            VideoMessage::StreamStats { stats, timestamp } => {
                // The producer's own stats refresh the room telemetry.
                if role == ParticipantRole::Producer {
                    self.frame_count = stats.frame_count;
                    self.last_frame_at = Some(Utc::now());
                }
                vec![Outbound::to_others(VideoMessage::StreamStats {
                    stats,
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            VideoMessage::Heartbeat { .. } => {
                vec![Outbound::to_sender(VideoMessage::HeartbeatAck {
                    timestamp: Some(wire_now()),
                })]
            }
            other => Self::role_error(other.kind(), role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::video::{Resolution, StreamStats, VideoEncoding};
    use crate::room::Target;

    fn room() -> VideoRoom {
        VideoRoom::new("W1", "V1", None, None)
    }

    #[test]
    fn config_update_merges_and_broadcasts() {
        let mut room = room();
        let patch = VideoConfig {
            encoding: None,
            resolution: Some(Resolution {
                width: 1280,
                height: 720,
            }),
            framerate: Some(60),
            bitrate: None,
            quality: None,
        };

        let plan = room.apply(
            "vp",
            ParticipantRole::Producer,
            VideoMessage::VideoConfigUpdate {
                config: patch,
                source: None,
                timestamp: None,
            },
        );

        assert_eq!(
            room.config().resolution,
            Some(Resolution {
                width: 1280,
                height: 720
            })
        );
        assert_eq!(room.config().framerate, Some(60));
        // Defaults for fields not mentioned in the patch survive.
        assert_eq!(room.config().encoding, Some(VideoEncoding::Vp8));

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].target, Target::Consumers);
        match &plan[0].message {
            VideoMessage::VideoConfigUpdate { source, .. } => {
                assert_eq!(source.as_deref(), Some("vp"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn consumer_cannot_update_config() {
        let mut room = room();
        let before = room.config().clone();

        let plan = room.apply(
            "vc",
            ParticipantRole::Consumer,
            VideoMessage::VideoConfigUpdate {
                config: VideoConfig {
                    encoding: Some(VideoEncoding::H264),
                    resolution: None,
                    framerate: None,
                    bitrate: None,
                    quality: None,
                },
                source: None,
                timestamp: None,
            },
        );

        assert_eq!(room.config(), &before);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].target, Target::Sender);
        assert!(matches!(plan[0].message, VideoMessage::Error { .. }));
    }

    #[test]
    fn stream_started_resets_telemetry_and_names_sender() {
        let mut room = room();
        room.frame_count = 99;

        let plan = room.apply(
            "vp",
            ParticipantRole::Producer,
            VideoMessage::StreamStarted {
                config: VideoConfig::default(),
                participant_id: String::new(),
                timestamp: None,
            },
        );

        assert_eq!(room.frame_count(), 0);
        assert_eq!(plan[0].target, Target::Consumers);
        match &plan[0].message {
            VideoMessage::StreamStarted { participant_id, .. } => {
                assert_eq!(participant_id, "vp");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn producer_stats_refresh_room_telemetry() {
        let mut room = room();
        let stats = StreamStats {
            stream_id: "s1".into(),
            frame_count: 120,
            ..StreamStats::default()
        };

        let plan = room.apply(
            "vp",
            ParticipantRole::Producer,
            VideoMessage::StreamStats {
                stats: stats.clone(),
                timestamp: None,
            },
        );

        assert_eq!(room.frame_count(), 120);
        assert!(room.state().last_frame_time.is_some());
        assert_eq!(plan[0].target, Target::Others);

        // Consumer-reported stats are relayed without touching telemetry.
        room.apply(
            "vc",
            ParticipantRole::Consumer,
            VideoMessage::StreamStats {
                stats: StreamStats {
                    frame_count: 7,
                    ..StreamStats::default()
                },
                timestamp: None,
            },
        );
        assert_eq!(room.frame_count(), 120);
    }

    #[test]
    fn recovery_triggered_is_consumer_only() {
        let mut room = room();

        let plan = room.apply(
            "vc",
            ParticipantRole::Consumer,
            VideoMessage::RecoveryTriggered {
                policy: crate::protocol::video::RecoveryPolicy::BlackScreen,
                reason: "frame loss".into(),
                timestamp: None,
            },
        );
        assert_eq!(plan[0].target, Target::Others);

        let plan = room.apply(
            "vp",
            ParticipantRole::Producer,
            VideoMessage::RecoveryTriggered {
                policy: crate::protocol::video::RecoveryPolicy::BlackScreen,
                reason: "frame loss".into(),
                timestamp: None,
            },
        );
        assert!(matches!(plan[0].message, VideoMessage::Error { .. }));
    }

    #[test]
    fn emergency_stop_reaches_the_whole_room() {
        let mut room = room();
        let plan = room.apply(
            "vc",
            ParticipantRole::Consumer,
            VideoMessage::EmergencyStop {
                reason: String::new(),
                source: None,
                timestamp: None,
            },
        );

        assert_eq!(plan[0].target, Target::Room);
        match &plan[0].message {
            VideoMessage::EmergencyStop { reason, source, .. } => {
                assert_eq!(reason, "Emergency stop triggered");
                assert_eq!(source.as_deref(), Some("vc"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn inbound_webrtc_over_websocket_is_rejected() {
        let mut room = room();
        let plan = room.apply(
            "vp",
            ParticipantRole::Producer,
            VideoMessage::WebrtcOffer {
                offer: crate::protocol::video::SessionDescription {
                    kind: "offer".into(),
                    sdp: "v=0...".into(),
                },
                from_producer: "vp".into(),
                timestamp: None,
            },
        );

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].target, Target::Sender);
        match &plan[0].message {
            VideoMessage::Error { message, .. } => assert!(message.contains("webrtc_offer")),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn state_reports_config_and_telemetry() {
        let room = room();
        let state = room.state();
        assert_eq!(state.room_id, "V1");
        assert_eq!(state.frame_count, 0);
        assert!(state.last_frame_time.is_none());
        assert_eq!(state.current_config, VideoConfig::default());
    }

    #[test]
    fn recovery_config_is_kept_as_given() {
        use crate::protocol::video::{RecoveryConfig, RecoveryPolicy};

        let recovery = RecoveryConfig {
            recovery_policy: RecoveryPolicy::FadeToBlack,
            max_frame_reuse_count: 5,
            ..RecoveryConfig::default()
        };
        let room = VideoRoom::new("W1", "V1", None, Some(recovery.clone()));

        assert_eq!(room.recovery_config(), &recovery);
        assert_eq!(
            room.recovery_config().recovery_policy,
            RecoveryPolicy::FadeToBlack
        );
    }
}
