//! Per-room state machines and fan-out.
//!
//! A room coordinates one producer slot, a consumer set, and the
//! authoritative state for that room. Inbound messages are applied
//! under the room lock and yield a dispatch plan; delivery pushes into
//! bounded per-participant queues and never blocks on a socket.
//!
//! # Architecture
//!
//! ```text
//!                    Arc<RwLock<RoboticsRoom>>
//!                  ┌───────────────────────────┐
//!                  │ roster: producer slot +   │
//!                  │         consumer handles  │
//!                  │ joints: HashMap<name, f64>│
//!                  └─────────────┬─────────────┘
//!                                │ apply() → Vec<Outbound>
//!              ┌─────────────────┼─────────────────┐
//!              ▼                 ▼                 ▼
//!         [Producer]       [Consumer]        [Consumer]
//!         reader loop      queue.recv()      queue.recv()
//!              │                 │                 │
//!              └──► roster.deliver() ──► bounded queue ──► WS
//! ```

pub mod queue;
pub mod robotics;
pub mod roster;
pub mod video;

pub use queue::OutboundQueue;
pub use robotics::RoboticsRoom;
pub use roster::{AdmitError, Roster};
pub use video::VideoRoom;

/// Recipients of one outbound message, as chosen by the router policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The participant that sent the inbound message.
    Sender,
    /// Every consumer in the room, sender excluded.
    Consumers,
    /// Everyone in the room except the sender.
    Others,
    /// Everyone in the room, sender included.
    Room,
    /// One specific participant by id.
    Peer(String),
}

/// One entry of a dispatch plan: a message and who receives it.
#[derive(Debug, Clone)]
pub struct Outbound<M> {
    pub target: Target,
    pub message: M,
}

impl<M> Outbound<M> {
    pub fn new(target: Target, message: M) -> Self {
        Self { target, message }
    }

    pub fn to_sender(message: M) -> Self {
        Self::new(Target::Sender, message)
    }

    pub fn to_consumers(message: M) -> Self {
        Self::new(Target::Consumers, message)
    }

    pub fn to_others(message: M) -> Self {
        Self::new(Target::Others, message)
    }

    pub fn to_room(message: M) -> Self {
        Self::new(Target::Room, message)
    }
}
