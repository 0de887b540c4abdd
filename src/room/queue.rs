//! Bounded outbound queue with drop-oldest overflow.

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

/// Per-participant outbound message queue.
///
/// Bounded FIFO between the room (push side) and the session writer
/// task (recv side). On overflow the oldest pending message is dropped
/// so one slow peer never stalls the room or grows memory without
/// bound. The first drop of an overflow episode arms a one-shot
/// backpressure notice, delivered ahead of the retained messages and
/// re-armed once the peer drains its queue.
#[derive(Debug)]
pub struct OutboundQueue<M> {
    inner: Mutex<Inner<M>>,
    notify: Notify,
    capacity: usize,
    notice: fn() -> M,
}

#[derive(Debug)]
struct Inner<M> {
    buf: VecDeque<M>,
    closed: bool,
    /// A backpressure notice is due before the next delivery.
    notice_due: bool,
    /// Whether the next overflow should produce a notice.
    notice_armed: bool,
    /// Total messages dropped over the queue's lifetime.
    dropped: u64,
}

impl<M> OutboundQueue<M> {
    /// Create a queue holding at most `capacity` pending messages.
    pub fn new(capacity: usize, notice: fn() -> M) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::new(),
                closed: false,
                notice_due: false,
                notice_armed: true,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
            notice,
        }
    }

    /// Enqueue a message, dropping the oldest pending one on overflow.
    ///
    /// Returns `false` if the queue is already closed.
    pub async fn push(&self, message: M) -> bool {
        {
            let mut inner = self.inner.lock().await;
            if inner.closed {
                return false;
            }
            if inner.buf.len() == self.capacity {
                inner.buf.pop_front();
                inner.dropped += 1;
                if inner.notice_armed {
                    inner.notice_armed = false;
                    inner.notice_due = true;
                }
            }
            inner.buf.push_back(message);
        }
        self.notify.notify_one();
        true
    }

    /// Receive the next message, or `None` once the queue is closed and
    /// drained.
    pub async fn recv(&self) -> Option<M> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().await;
                if inner.notice_due {
                    inner.notice_due = false;
                    return Some((self.notice)());
                }
                if let Some(message) = inner.buf.pop_front() {
                    if inner.buf.is_empty() {
                        inner.notice_armed = true;
                    }
                    return Some(message);
                }
                if inner.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Close the queue. Pending messages remain receivable; further
    /// pushes are rejected. Idempotent.
    pub async fn close(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.closed = true;
        }
        self.notify.notify_one();
    }

    /// Number of messages currently pending.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.buf.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.buf.is_empty()
    }

    /// Total messages dropped to overflow so far.
    pub async fn dropped(&self) -> u64 {
        self.inner.lock().await.dropped
    }
}
