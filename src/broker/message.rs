use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message as handed to a puller.
///
/// `id` is assigned at publish time and is stable across redeliveries of
/// the same message within a subscription. `tries` counts delivery
/// attempts: it is 0 on the first delivery and grows by one each time the
/// ack deadline elapses without an acknowledgment.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub time: DateTime<Utc>,
    pub tries: u32,
    pub data: String,
}

/// A published message as a topic retains it and as it is replicated into
/// each bound subscription's arena.
///
/// The expiry deadline is stamped once, at publish time, from the owning
/// topic's message TTL. Later TTL changes on the topic do not move it.
#[derive(Clone, Debug)]
pub(crate) struct StoredMessage {
    pub id: Uuid,
    pub time: DateTime<Utc>,
    pub data: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredMessage {
    /// Stamp a fresh message. A zero `message_ttl` means it never expires.
    pub fn new(data: String, now: DateTime<Utc>, message_ttl: Duration) -> Self {
        let expires_at = if message_ttl.is_zero() {
            None
        } else {
            Some(now + message_ttl)
        };
        Self {
            id: Uuid::new_v4(),
            time: now,
            data,
            expires_at,
        }
    }

    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// Delivery state of one message within one subscription.
///
/// `Pending` records are eligible for the next pull. `Reserved` records
/// are invisible to pulls until their deadline passes; acknowledging a
/// reserved record removes it for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DeliveryState {
    Pending,
    Reserved { deadline: DateTime<Utc> },
}
