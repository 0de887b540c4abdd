//! WebRTC signaling broker.
//!
//! Stateless relay of offer/answer/ICE between a named producer and a
//! named consumer within one room. The broker validates the sender's
//! role against the targeting direction, wraps the payload into the
//! matching `webrtc_*` message, and enqueues it on exactly the target's
//! outbound queue. It holds no negotiation state and never inspects SDP
//! or candidate payloads; correlation is the clients' responsibility.

use crate::protocol::signal::RawSignal;
use crate::protocol::video::{SessionDescription, VideoMessage};
use crate::protocol::{wire_now, ParticipantRole};
use crate::room::VideoRoom;

/// Error returned to the signaling sender. None of these are fatal to
/// the room.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    #[error("client {0} is not a participant of the room")]
    UnknownSender(String),
    #[error("target peer not found: {0}")]
    UnknownPeer(String),
    #[error("{0}")]
    InvalidTarget(&'static str),
}

/// Successful relay: who received the wrapped message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalOutcome {
    pub delivered_to: String,
    pub note: &'static str,
}

/// Relay one raw signaling payload within a room.
pub async fn relay(
    room: &VideoRoom,
    client_id: &str,
    signal: RawSignal,
) -> Result<SignalOutcome, SignalError> {
    let role = room
        .roster
        .role_of(client_id)
        .ok_or_else(|| SignalError::UnknownSender(client_id.into()))?;

    match signal {
        RawSignal::Offer {
            sdp,
            target_consumer,
        } => {
            if role != ParticipantRole::Producer {
                return Err(SignalError::InvalidTarget(
                    "offers are sent by the producer",
                ));
            }
            let target = target_consumer
                .ok_or(SignalError::InvalidTarget("offer is missing target_consumer"))?;

            let message = VideoMessage::WebrtcOffer {
                offer: SessionDescription {
                    kind: "offer".into(),
                    sdp,
                },
                from_producer: client_id.into(),
                timestamp: Some(wire_now()),
            };
            deliver(room, client_id, target, message, "Offer forwarded to consumer").await
        }
        RawSignal::Answer {
            sdp,
            target_producer,
        } => {
            if role != ParticipantRole::Consumer {
                return Err(SignalError::InvalidTarget(
                    "answers are sent by a consumer",
                ));
            }
            let target = target_producer
                .ok_or(SignalError::InvalidTarget("answer is missing target_producer"))?;

            let message = VideoMessage::WebrtcAnswer {
                answer: SessionDescription {
                    kind: "answer".into(),
                    sdp,
                },
                from_consumer: client_id.into(),
                timestamp: Some(wire_now()),
            };
            deliver(room, client_id, target, message, "Answer forwarded to producer").await
        }
        RawSignal::Ice {
            candidate,
            target_consumer,
            target_producer,
        } => match (role, target_consumer, target_producer) {
            (ParticipantRole::Producer, Some(target), _) => {
                let message = VideoMessage::WebrtcIce {
                    candidate,
                    from_producer: Some(client_id.into()),
                    from_consumer: None,
                    timestamp: Some(wire_now()),
                };
                deliver(
                    room,
                    client_id,
                    target,
                    message,
                    "ICE candidate forwarded to consumer",
                )
                .await
            }
            (ParticipantRole::Consumer, _, Some(target)) => {
                let message = VideoMessage::WebrtcIce {
                    candidate,
                    from_producer: None,
                    from_consumer: Some(client_id.into()),
                    timestamp: Some(wire_now()),
                };
                deliver(
                    room,
                    client_id,
                    target,
                    message,
                    "ICE candidate forwarded to producer",
                )
                .await
            }
            _ => Err(SignalError::InvalidTarget(
                "ice candidate target does not match the sender role",
            )),
        },
    }
}

async fn deliver(
    room: &VideoRoom,
    sender: &str,
    target: String,
    message: VideoMessage,
    note: &'static str,
) -> Result<SignalOutcome, SignalError> {
    if room.roster.unicast(&target, message).await {
        tracing::debug!(
            workspace = %room.workspace_id,
            room = %room.room_id,
            from = %sender,
            to = %target,
            "Signaling message relayed"
        );
        Ok(SignalOutcome {
            delivered_to: target,
            note,
        })
    } else {
        Err(SignalError::UnknownPeer(target))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::room::OutboundQueue;

    type Queue = Arc<OutboundQueue<VideoMessage>>;

    fn queue() -> Queue {
        Arc::new(OutboundQueue::new(16, VideoMessage::backpressure_notice))
    }

    /// Room with producer VP and consumers VC1, VC2; returns their queues.
    fn wired_room() -> (VideoRoom, Queue, Queue, Queue) {
        let mut room = VideoRoom::new("W1", "V1", None, None);
        let (vp, vc1, vc2) = (queue(), queue(), queue());
        room.roster
            .admit("VP", ParticipantRole::Producer, Arc::clone(&vp))
            .unwrap();
        room.roster
            .admit("VC1", ParticipantRole::Consumer, Arc::clone(&vc1))
            .unwrap();
        room.roster
            .admit("VC2", ParticipantRole::Consumer, Arc::clone(&vc2))
            .unwrap();
        (room, vp, vc1, vc2)
    }

    #[tokio::test]
    async fn offer_reaches_only_the_targeted_consumer() {
        let (room, vp, vc1, vc2) = wired_room();

        let outcome = relay(
            &room,
            "VP",
            RawSignal::Offer {
                sdp: "v=0...".into(),
                target_consumer: Some("VC1".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.delivered_to, "VC1");
        assert_eq!(vc1.len().await, 1);
        assert_eq!(vc2.len().await, 0);
        assert_eq!(vp.len().await, 0);

        match vc1.recv().await.unwrap() {
            VideoMessage::WebrtcOffer {
                offer,
                from_producer,
                ..
            } => {
                assert_eq!(offer.kind, "offer");
                assert_eq!(offer.sdp, "v=0...");
                assert_eq!(from_producer, "VP");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn answer_flows_back_to_the_producer() {
        let (room, vp, _vc1, _vc2) = wired_room();

        relay(
            &room,
            "VC1",
            RawSignal::Answer {
                sdp: "v=0...".into(),
                target_producer: Some("VP".into()),
            },
        )
        .await
        .unwrap();

        match vp.recv().await.unwrap() {
            VideoMessage::WebrtcAnswer {
                answer,
                from_consumer,
                ..
            } => {
                assert_eq!(answer.kind, "answer");
                assert_eq!(from_consumer, "VC1");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn ice_is_wrapped_per_direction() {
        let (room, vp, vc1, _vc2) = wired_room();
        let candidate = json!({"candidate": "candidate:1 ...", "sdpMid": "0"});

        relay(
            &room,
            "VP",
            RawSignal::Ice {
                candidate: candidate.clone(),
                target_consumer: Some("VC1".into()),
                target_producer: None,
            },
        )
        .await
        .unwrap();
        match vc1.recv().await.unwrap() {
            VideoMessage::WebrtcIce {
                from_producer,
                from_consumer,
                candidate: got,
                ..
            } => {
                assert_eq!(from_producer.as_deref(), Some("VP"));
                assert!(from_consumer.is_none());
                assert_eq!(got, candidate);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        relay(
            &room,
            "VC1",
            RawSignal::Ice {
                candidate: candidate.clone(),
                target_consumer: None,
                target_producer: Some("VP".into()),
            },
        )
        .await
        .unwrap();
        match vp.recv().await.unwrap() {
            VideoMessage::WebrtcIce { from_consumer, .. } => {
                assert_eq!(from_consumer.as_deref(), Some("VC1"));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn consumer_cannot_send_offers() {
        let (room, ..) = wired_room();
        let err = relay(
            &room,
            "VC1",
            RawSignal::Offer {
                sdp: "v=0...".into(),
                target_consumer: Some("VC2".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SignalError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn unknown_sender_is_rejected() {
        let (room, ..) = wired_room();
        let err = relay(
            &room,
            "ghost",
            RawSignal::Offer {
                sdp: "v=0...".into(),
                target_consumer: Some("VC1".into()),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err, SignalError::UnknownSender("ghost".into()));
    }

    #[tokio::test]
    async fn missing_target_is_a_soft_failure() {
        let (room, ..) = wired_room();
        let err = relay(
            &room,
            "VP",
            RawSignal::Offer {
                sdp: "v=0...".into(),
                target_consumer: Some("VC9".into()),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err, SignalError::UnknownPeer("VC9".into()));
        // The room is unaffected by the failed relay.
        assert_eq!(room.roster.len(), 3);
    }
}
