//! Robotics control messages.
//!
//! The producer drives the room with `joint_update` and `state_sync`;
//! the server fans those out to consumers and answers `heartbeat`
//! directly. `emergency_stop` is a priority broadcast with no state
//! effect.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{wire_now, ParticipantRole};

/// Single joint position update.
///
/// `value` is passed through unclamped; range enforcement belongs to the
/// robot, not the fabric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointUpdate {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// Messages exchanged on a robotics room socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoboticsMessage {
    /// Confirmation of a successful room join.
    Joined {
        room_id: String,
        workspace_id: String,
        role: ParticipantRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Error notification.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Client ping for connection health.
    Heartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Server response to a heartbeat.
    HeartbeatAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Joint position commands, producer to consumers.
    JointUpdate {
        data: Vec<JointUpdate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Full joint map in one payload, for catch-up and resync.
    StateSync {
        data: HashMap<String, f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Safety-critical halt, broadcast to everyone else in the room.
    EmergencyStop {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
}

fn default_true() -> bool {
    true
}

impl RoboticsMessage {
    /// Server-originated error with a fresh timestamp.
    pub fn error(message: impl Into<String>) -> Self {
        RoboticsMessage::Error {
            message: message.into(),
            code: None,
            timestamp: Some(wire_now()),
        }
    }

    /// One-shot notice sent to a consumer whose queue overflowed.
    pub fn backpressure_notice() -> Self {
        RoboticsMessage::Error {
            message: "backpressure_drop".into(),
            code: Some("backpressure".into()),
            timestamp: Some(wire_now()),
        }
    }

    /// The wire tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            RoboticsMessage::Joined { .. } => "joined",
            RoboticsMessage::Error { .. } => "error",
            RoboticsMessage::Heartbeat { .. } => "heartbeat",
            RoboticsMessage::HeartbeatAck { .. } => "heartbeat_ack",
            RoboticsMessage::JointUpdate { .. } => "joint_update",
            RoboticsMessage::StateSync { .. } => "state_sync",
            RoboticsMessage::EmergencyStop { .. } => "emergency_stop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joint_update_round_trip() {
        let frame = r#"{"type":"joint_update","data":[{"name":"shoulder","value":45.0}]}"#;
        let msg: RoboticsMessage = serde_json::from_str(frame).unwrap();

        match &msg {
            RoboticsMessage::JointUpdate { data, source, .. } => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].name, "shoulder");
                assert_eq!(data[0].value, 45.0);
                assert_eq!(data[0].speed, None);
                assert!(source.is_none());
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"joint_update\""));
        // Absent speed must not appear on the wire.
        assert!(!json.contains("speed"));
    }

    #[test]
    fn state_sync_carries_joint_map() {
        let frame = r#"{"type":"state_sync","data":{"a":1.0,"b":2.0}}"#;
        let msg: RoboticsMessage = serde_json::from_str(frame).unwrap();

        match msg {
            RoboticsMessage::StateSync { data, .. } => {
                assert_eq!(data.get("a"), Some(&1.0));
                assert_eq!(data.get("b"), Some(&2.0));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn emergency_stop_defaults_to_enabled() {
        let frame = r#"{"type":"emergency_stop","reason":"test"}"#;
        let msg: RoboticsMessage = serde_json::from_str(frame).unwrap();

        match msg {
            RoboticsMessage::EmergencyStop { enabled, reason, .. } => {
                assert!(enabled);
                assert_eq!(reason.as_deref(), Some("test"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_a_decode_error() {
        let result = serde_json::from_str::<RoboticsMessage>(r#"{"type":"warp_drive"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn joined_serializes_flat() {
        let msg = RoboticsMessage::Joined {
            room_id: "R1".into(),
            workspace_id: "W1".into(),
            role: ParticipantRole::Producer,
            timestamp: Some(wire_now()),
        };
        let value: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "joined");
        assert_eq!(value["room_id"], "R1");
        assert_eq!(value["role"], "producer");
    }
}
