//! # fleetlink
//!
//! Real-time transport fabric for robotics fleets. Producers
//! (controllers, cameras) and consumers (robots, observers) meet inside
//! named rooms grouped into isolated workspaces; the fabric brokers
//! low-latency control traffic and relays WebRTC signaling so media can
//! flow peer-to-peer. It is authoritative for control state (latest
//! joint snapshot per room) and stateless with respect to media.
//!
//! # Architecture
//!
//! ```text
//!   REST (axum)          WebSocket (axum)
//!       │                      │
//!       ▼                      ▼
//!   ┌─────────────────────────────────┐
//!   │ Registry<R>: workspace → rooms  │
//!   └───────────────┬─────────────────┘
//!                   ▼
//!   ┌─────────────────────────────────┐     per-participant
//!   │ Room: producer slot, consumers, │──► bounded queues ──► sockets
//!   │ authoritative state, router     │     (drop-oldest)
//!   └─────────────────────────────────┘
//! ```
//!
//! Invariants the core enforces:
//! - at most one producer per room, unbounded consumers;
//! - a participant id appears in one role per room at a time;
//! - per-producer message order is preserved into each consumer queue;
//! - a slow consumer only ever loses its own oldest messages.

pub mod error;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod server;
pub mod signaling;
pub mod stats;

pub use error::{Error, Result};
pub use registry::Registry;
pub use room::{RoboticsRoom, VideoRoom};
pub use server::{AppState, ServerConfig};
