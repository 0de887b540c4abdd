//! Raw WebRTC signaling submitted over REST.
//!
//! Producers and consumers negotiate peer connections by posting these
//! payloads to the signaling endpoint; the broker wraps them into
//! `webrtc_*` messages and relays them to the targeted peer's socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST .../webrtc/signal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRequest {
    pub client_id: String,
    pub message: RawSignal,
}

/// Raw signaling payload as produced by the browser WebRTC API.
///
/// Targeting is directional: producers address consumers with
/// `target_consumer`, consumers address producers with `target_producer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSignal {
    Offer {
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_consumer: Option<String>,
    },
    Answer {
        sdp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_producer: Option<String>,
    },
    Ice {
        candidate: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_consumer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_producer: Option<String>,
    },
}
