//! Wire protocol types for both transport surfaces.
//!
//! Every WebSocket frame is a single JSON object discriminated by a
//! `type` field; the robotics and video surfaces each have their own
//! tagged union. Timestamps are RFC 3339 strings. The server stamps
//! messages it originates and preserves client timestamps when relaying.

pub mod robotics;
pub mod signal;
pub mod video;

use serde::{Deserialize, Serialize};

/// Participant roles within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// Controller or camera origin; the single authoritative sender.
    Producer,
    /// Robot, visualizer, or viewer; subscribes to the fan-out stream.
    Consumer,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Producer => "producer",
            ParticipantRole::Consumer => "consumer",
        }
    }
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First frame a client must send after the socket opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub participant_id: String,
    pub role: ParticipantRole,
}

/// Participant summary embedded in room info and state payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub producer: Option<String>,
    pub consumers: Vec<String>,
    pub total: usize,
}

/// Current wall-clock time as the RFC 3339 string carried on the wire.
pub fn wire_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
