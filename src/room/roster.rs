//! Room membership: the producer slot and the consumer set.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::protocol::{ParticipantRole, ParticipantSummary};

use super::queue::OutboundQueue;
use super::{Outbound, Target};

/// Error returned when a participant cannot be admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmitError {
    #[error("room already has a producer: {0}")]
    ProducerExists(String),
    #[error("participant id already in room: {0}")]
    DuplicateId(String),
}

/// Handle to one admitted participant.
#[derive(Debug)]
pub struct ParticipantHandle<M> {
    pub id: String,
    pub role: ParticipantRole,
    pub connected_at: DateTime<Utc>,
    queue: Arc<OutboundQueue<M>>,
}

/// Membership and delivery for one room.
///
/// At most one producer at any moment; a participant id appears at most
/// once per room. Each participant owns a bounded outbound queue, so
/// delivery never blocks the room on a slow socket.
#[derive(Debug)]
pub struct Roster<M> {
    producer: Option<String>,
    participants: HashMap<String, ParticipantHandle<M>>,
}

impl<M: Clone> Roster<M> {
    pub fn new() -> Self {
        Self {
            producer: None,
            participants: HashMap::new(),
        }
    }

    /// Atomically place a participant according to its role.
    pub fn admit(
        &mut self,
        id: &str,
        role: ParticipantRole,
        queue: Arc<OutboundQueue<M>>,
    ) -> Result<(), AdmitError> {
        if self.participants.contains_key(id) {
            return Err(AdmitError::DuplicateId(id.into()));
        }
        if role == ParticipantRole::Producer {
            if let Some(current) = &self.producer {
                return Err(AdmitError::ProducerExists(current.clone()));
            }
            self.producer = Some(id.into());
        }

        self.participants.insert(
            id.into(),
            ParticipantHandle {
                id: id.into(),
                role,
                connected_at: Utc::now(),
                queue,
            },
        );
        Ok(())
    }

    /// Remove a participant, clearing the producer slot if it held it.
    /// Returns the departed participant's role.
    pub fn evict(&mut self, id: &str) -> Option<ParticipantRole> {
        let handle = self.participants.remove(id)?;
        if self.producer.as_deref() == Some(id) {
            self.producer = None;
        }
        Some(handle.role)
    }

    pub fn producer_id(&self) -> Option<&str> {
        self.producer.as_deref()
    }

    pub fn has_producer(&self) -> bool {
        self.producer.is_some()
    }

    pub fn role_of(&self, id: &str) -> Option<ParticipantRole> {
        self.participants.get(id).map(|h| h.role)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    pub fn consumer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .participants
            .values()
            .filter(|h| h.role == ParticipantRole::Consumer)
            .map(|h| h.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn consumer_count(&self) -> usize {
        self.participants
            .values()
            .filter(|h| h.role == ParticipantRole::Consumer)
            .count()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Snapshot of membership for room info and state payloads.
    pub fn summary(&self) -> ParticipantSummary {
        ParticipantSummary {
            producer: self.producer.clone(),
            consumers: self.consumer_ids(),
            total: self.participants.len(),
        }
    }

    /// Enqueue a message on one participant's queue. Returns `false`
    /// when the participant is absent or its queue is closed.
    pub async fn unicast(&self, id: &str, message: M) -> bool {
        match self.participants.get(id) {
            Some(handle) => handle.queue.push(message).await,
            None => false,
        }
    }

    /// Execute one entry of a dispatch plan. Returns how many queues
    /// accepted the message.
    pub async fn deliver(&self, sender: &str, outbound: Outbound<M>) -> usize {
        match outbound.target {
            Target::Sender => self.unicast(sender, outbound.message).await as usize,
            Target::Peer(id) => self.unicast(&id, outbound.message).await as usize,
            Target::Consumers => {
                self.fan_out(outbound.message, |h| {
                    h.role == ParticipantRole::Consumer && h.id != sender
                })
                .await
            }
            Target::Others => self.fan_out(outbound.message, |h| h.id != sender).await,
            Target::Room => self.fan_out(outbound.message, |_| true).await,
        }
    }

    async fn fan_out(&self, message: M, eligible: impl Fn(&ParticipantHandle<M>) -> bool) -> usize {
        let mut delivered = 0;
        for handle in self.participants.values() {
            if eligible(handle) && handle.queue.push(message.clone()).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Close every participant's queue, optionally after a farewell
    /// frame, and clear the room.
    pub async fn close_all(&mut self, farewell: Option<M>) {
        for handle in self.participants.values() {
            if let Some(message) = farewell.clone() {
                handle.queue.push(message).await;
            }
            handle.queue.close().await;
        }
        self.participants.clear();
        self.producer = None;
    }
}

impl<M: Clone> Default for Roster<M> {
    fn default() -> Self {
        Self::new()
    }
}
