//! Video room messages, stream configuration, and recovery metadata.
//!
//! Video rooms never carry frame bytes; the fabric only routes
//! signaling and lifecycle. The recovery configuration is stored and
//! forwarded so consumers can handle frame loss locally. The server
//! never acts on it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{wire_now, ParticipantRole};

/// Supported video encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoEncoding {
    Jpeg,
    H264,
    Vp8,
    Vp9,
}

/// Consumer-side policies for handling video interruptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Reuse the last valid frame.
    FreezeLastFrame,
    /// Show an informative status frame.
    ConnectionInfo,
    /// Black screen with the same dimensions.
    BlackScreen,
    /// Gradually fade the last frame to black.
    FadeToBlack,
    /// Show the last frame with a status overlay.
    OverlayStatus,
}

impl RecoveryPolicy {
    pub fn all() -> [RecoveryPolicy; 5] {
        [
            RecoveryPolicy::FreezeLastFrame,
            RecoveryPolicy::ConnectionInfo,
            RecoveryPolicy::BlackScreen,
            RecoveryPolicy::FadeToBlack,
            RecoveryPolicy::OverlayStatus,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryPolicy::FreezeLastFrame => "freeze_last_frame",
            RecoveryPolicy::ConnectionInfo => "connection_info",
            RecoveryPolicy::BlackScreen => "black_screen",
            RecoveryPolicy::FadeToBlack => "fade_to_black",
            RecoveryPolicy::OverlayStatus => "overlay_status",
        }
    }
}

/// Stream resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Stream configuration stored per room.
///
/// All fields are optional on the wire; a partial update merges into the
/// stored config field-wise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<VideoEncoding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framerate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            encoding: Some(VideoEncoding::Vp8),
            resolution: Some(Resolution {
                width: 640,
                height: 480,
            }),
            framerate: Some(30),
            bitrate: Some(1_000_000),
            quality: Some(80),
        }
    }
}

impl VideoConfig {
    /// Merge a partial update into this config; absent fields are kept.
    pub fn merge(&mut self, patch: &VideoConfig) {
        if patch.encoding.is_some() {
            self.encoding = patch.encoding;
        }
        if patch.resolution.is_some() {
            self.resolution = patch.resolution;
        }
        if patch.framerate.is_some() {
            self.framerate = patch.framerate;
        }
        if patch.bitrate.is_some() {
            self.bitrate = patch.bitrate;
        }
        if patch.quality.is_some() {
            self.quality = patch.quality;
        }
    }
}

/// Frame recovery configuration, pass-through metadata only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "defaults::frame_timeout_ms")]
    pub frame_timeout_ms: u32,
    #[serde(default = "defaults::max_frame_reuse_count")]
    pub max_frame_reuse_count: u32,
    #[serde(default = "defaults::recovery_policy")]
    pub recovery_policy: RecoveryPolicy,
    #[serde(default = "defaults::fallback_policy")]
    pub fallback_policy: RecoveryPolicy,
    #[serde(default = "defaults::show_hold_indicators")]
    pub show_hold_indicators: bool,
    #[serde(default = "defaults::info_frame_bg_color")]
    pub info_frame_bg_color: (u8, u8, u8),
    #[serde(default = "defaults::info_frame_text_color")]
    pub info_frame_text_color: (u8, u8, u8),
    #[serde(default = "defaults::fade_intensity")]
    pub fade_intensity: f32,
    #[serde(default = "defaults::overlay_opacity")]
    pub overlay_opacity: f32,
}

mod defaults {
    use super::RecoveryPolicy;

    pub fn frame_timeout_ms() -> u32 {
        100
    }
    pub fn max_frame_reuse_count() -> u32 {
        3
    }
    pub fn recovery_policy() -> RecoveryPolicy {
        RecoveryPolicy::FreezeLastFrame
    }
    pub fn fallback_policy() -> RecoveryPolicy {
        RecoveryPolicy::ConnectionInfo
    }
    pub fn show_hold_indicators() -> bool {
        true
    }
    pub fn info_frame_bg_color() -> (u8, u8, u8) {
        (20, 30, 60)
    }
    pub fn info_frame_text_color() -> (u8, u8, u8) {
        (200, 200, 200)
    }
    pub fn fade_intensity() -> f32 {
        0.7
    }
    pub fn overlay_opacity() -> f32 {
        0.3
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            frame_timeout_ms: defaults::frame_timeout_ms(),
            max_frame_reuse_count: defaults::max_frame_reuse_count(),
            recovery_policy: defaults::recovery_policy(),
            fallback_policy: defaults::fallback_policy(),
            show_hold_indicators: defaults::show_hold_indicators(),
            info_frame_bg_color: defaults::info_frame_bg_color(),
            info_frame_text_color: defaults::info_frame_text_color(),
            fade_intensity: defaults::fade_intensity(),
            overlay_opacity: defaults::overlay_opacity(),
        }
    }
}

/// SDP session description relayed verbatim between peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

/// Stream statistics self-reported by a participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamStats {
    #[serde(default)]
    pub stream_id: String,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub frame_count: u64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default)]
    pub average_fps: f64,
    #[serde(default)]
    pub average_bitrate: f64,
}

/// Messages exchanged on a video room socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VideoMessage {
    Joined {
        room_id: String,
        workspace_id: String,
        role: ParticipantRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    Heartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    HeartbeatAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Producer began streaming; carries the stream configuration.
    StreamStarted {
        #[serde(default)]
        config: VideoConfig,
        #[serde(default)]
        participant_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    StreamStopped {
        #[serde(default)]
        participant_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Partial stream configuration update, merged into the room config.
    VideoConfigUpdate {
        #[serde(default)]
        config: VideoConfig,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Consumer self-report that a recovery policy fired.
    RecoveryTriggered {
        policy: RecoveryPolicy,
        #[serde(default)]
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    EmergencyStop {
        #[serde(default)]
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    StatusUpdate {
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    StreamStats {
        stats: StreamStats,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    ParticipantJoined {
        room_id: String,
        participant_id: String,
        role: ParticipantRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    ParticipantLeft {
        room_id: String,
        participant_id: String,
        role: ParticipantRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Offer relayed from a producer to one consumer.
    WebrtcOffer {
        offer: SessionDescription,
        from_producer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Answer relayed from a consumer back to the producer.
    WebrtcAnswer {
        answer: SessionDescription,
        from_consumer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// ICE candidate relayed in either direction, payload untouched.
    WebrtcIce {
        candidate: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_producer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_consumer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

impl VideoMessage {
    /// Server-originated error with a fresh timestamp.
    pub fn error(message: impl Into<String>) -> Self {
        VideoMessage::Error {
            message: message.into(),
            code: None,
            timestamp: Some(wire_now()),
        }
    }

    /// One-shot notice sent to a participant whose queue overflowed.
    pub fn backpressure_notice() -> Self {
        VideoMessage::Error {
            message: "backpressure_drop".into(),
            code: Some("backpressure".into()),
            timestamp: Some(wire_now()),
        }
    }

    /// The wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            VideoMessage::Joined { .. } => "joined",
            VideoMessage::Error { .. } => "error",
            VideoMessage::Heartbeat { .. } => "heartbeat",
            VideoMessage::HeartbeatAck { .. } => "heartbeat_ack",
            VideoMessage::StreamStarted { .. } => "stream_started",
            VideoMessage::StreamStopped { .. } => "stream_stopped",
            VideoMessage::VideoConfigUpdate { .. } => "video_config_update",
            VideoMessage::RecoveryTriggered { .. } => "recovery_triggered",
            VideoMessage::EmergencyStop { .. } => "emergency_stop",
            VideoMessage::StatusUpdate { .. } => "status_update",
            VideoMessage::StreamStats { .. } => "stream_stats",
            VideoMessage::ParticipantJoined { .. } => "participant_joined",
            VideoMessage::ParticipantLeft { .. } => "participant_left",
            VideoMessage::WebrtcOffer { .. } => "webrtc_offer",
            VideoMessage::WebrtcAnswer { .. } => "webrtc_answer",
            VideoMessage::WebrtcIce { .. } => "webrtc_ice",
        }
    }
}
