//! Robotics room: authoritative joint state and router policy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::protocol::robotics::{JointUpdate, RoboticsMessage};
use crate::protocol::{wire_now, ParticipantRole, ParticipantSummary};

use super::roster::Roster;
use super::Outbound;

/// A robotics room: one producer slot, a consumer set, and the latest
/// authoritative joint snapshot.
///
/// The snapshot keeps only the most recent value per joint name and
/// survives producer departure; it is cleared only when the room is
/// deleted.
#[derive(Debug)]
pub struct RoboticsRoom {
    pub workspace_id: String,
    pub room_id: String,
    pub created_at: DateTime<Utc>,
    pub roster: Roster<RoboticsMessage>,
    joints: HashMap<String, f64>,
    last_update_at: Option<DateTime<Utc>>,
}

/// Basic room information.
#[derive(Debug, Clone, Serialize)]
pub struct RoboticsRoomInfo {
    pub id: String,
    pub workspace_id: String,
    pub participants: ParticipantSummary,
    pub joints_count: usize,
    pub has_producer: bool,
    pub active_consumers: usize,
}

/// Detailed room state.
#[derive(Debug, Clone, Serialize)]
pub struct RoboticsRoomState {
    pub room_id: String,
    pub workspace_id: String,
    pub joints: HashMap<String, f64>,
    pub participants: ParticipantSummary,
    pub timestamp: String,
}

impl RoboticsRoom {
    pub fn new(workspace_id: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            room_id: room_id.into(),
            created_at: Utc::now(),
            roster: Roster::new(),
            joints: HashMap::new(),
            last_update_at: None,
        }
    }

    pub fn joints(&self) -> &HashMap<String, f64> {
        &self.joints
    }

    /// Clone of the current joint snapshot, for `state_sync` catch-up.
    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.joints.clone()
    }

    /// When the snapshot last changed, if ever.
    pub fn last_update_at(&self) -> Option<DateTime<Utc>> {
        self.last_update_at
    }

    pub fn info(&self) -> RoboticsRoomInfo {
        RoboticsRoomInfo {
            id: self.room_id.clone(),
            workspace_id: self.workspace_id.clone(),
            participants: self.roster.summary(),
            joints_count: self.joints.len(),
            has_producer: self.roster.has_producer(),
            active_consumers: self.roster.consumer_count(),
        }
    }

    pub fn state(&self) -> RoboticsRoomState {
        RoboticsRoomState {
            room_id: self.room_id.clone(),
            workspace_id: self.workspace_id.clone(),
            joints: self.joints.clone(),
            participants: self.roster.summary(),
            timestamp: wire_now(),
        }
    }

    fn merge_joints(&mut self, updates: &[JointUpdate]) {
        for joint in updates {
            self.joints.insert(joint.name.clone(), joint.value);
        }
        self.last_update_at = Some(Utc::now());
    }

    /// Apply one inbound message and return the dispatch plan.
    ///
    /// Mutation happens here, under the room lock; the returned plan is
    /// executed against the roster queues by the caller.
    pub fn apply(
        &mut self,
        sender: &str,
        role: ParticipantRole,
        message: RoboticsMessage,
    ) -> Vec<Outbound<RoboticsMessage>> {
        match message {
            RoboticsMessage::JointUpdate {
                data, timestamp, ..
            } => {
                if role != ParticipantRole::Producer {
                    return vec![Outbound::to_sender(RoboticsMessage::error(
                        "joint_update is not supported for consumers",
                    ))];
                }
                // An empty update list is a no-op and is not broadcast.
                if data.is_empty() {
                    return Vec::new();
                }
                self.merge_joints(&data);
                vec![Outbound::to_consumers(RoboticsMessage::JointUpdate {
                    data,
                    source: Some(sender.into()),
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            RoboticsMessage::StateSync { data, timestamp } => {
                if role != ParticipantRole::Producer {
                    return vec![Outbound::to_sender(RoboticsMessage::error(
                        "state_sync is not supported for consumers",
                    ))];
                }
                // Merge: keys absent from the payload are left unchanged.
                // Idempotent payloads are still applied and broadcast,
                // since consumers may have missed prior traffic.
                let mut entries: Vec<JointUpdate> = data
                    .iter()
                    .map(|(name, value)| JointUpdate {
                        name: name.clone(),
                        value: *value,
                        speed: None,
                    })
                    .collect();
                entries.sort_by(|a, b| a.name.cmp(&b.name));
                self.merge_joints(&entries);

                vec![Outbound::to_consumers(RoboticsMessage::JointUpdate {
                    data: entries,
                    source: Some(sender.into()),
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            RoboticsMessage::EmergencyStop {
                enabled,
                reason,
                timestamp,
                ..
            } => {
                tracing::warn!(
                    workspace = %self.workspace_id,
                    room = %self.room_id,
                    participant = %sender,
                    "Emergency stop triggered"
                );
                vec![Outbound::to_others(RoboticsMessage::EmergencyStop {
                    enabled,
                    reason: reason.or_else(|| Some(format!("Emergency stop from {sender}"))),
                    source: Some(sender.into()),
                    timestamp: timestamp.or_else(|| Some(wire_now())),
                })]
            }
            RoboticsMessage::Heartbeat { .. } => {
                vec![Outbound::to_sender(RoboticsMessage::HeartbeatAck {
                    timestamp: Some(wire_now()),
                })]
            }
            other => vec![Outbound::to_sender(RoboticsMessage::error(format!(
                "message type not supported for {role}: {}",
                other.kind()
            )))],
        }
    }
}
