use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broker::message::{DeliveryState, Message, StoredMessage};

/// One message inside a subscription's arena, together with its delivery
/// bookkeeping for this subscription only.
#[derive(Debug)]
struct MessageRecord {
    message: StoredMessage,
    tries: u32,
    state: DeliveryState,
}

/// Internal state of one subscription.
///
/// The subscription owns its message set exclusively: an arena of records
/// indexed by message id, plus a FIFO index of the ids currently eligible
/// for delivery. Every pull, ack, and sweep against the subscription is a
/// single transaction under the caller's lock, which is what makes the
/// reserve step atomic: a message popped off the pending index cannot be
/// handed to a second concurrent pull.
///
/// The reservation timer is evaluated lazily. Each transaction first
/// purges messages past their publish-time expiry, then returns every
/// reservation whose deadline has elapsed to the pending index with its
/// tries count incremented. An acknowledgment past the deadline therefore
/// finds the record already pending again and ignores it.
#[derive(Debug)]
pub(crate) struct SubscriptionState {
    pub name: String,
    pub topic: String,
    pub ack_deadline: Duration,
    pub ttl: Duration,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    records: HashMap<Uuid, MessageRecord>,
    pending: VecDeque<Uuid>,
}

impl SubscriptionState {
    pub fn new(
        name: &str,
        topic: &str,
        ack_deadline: Duration,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: String::from(name),
            topic: String::from(topic),
            ack_deadline,
            ttl,
            created: now,
            updated: now,
            records: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Replicate one published message into the arena.
    pub fn enqueue(&mut self, message: StoredMessage) {
        let id = message.id;
        self.records.insert(
            id,
            MessageRecord {
                message,
                tries: 0,
                state: DeliveryState::Pending,
            },
        );
        self.pending.push_back(id);
    }

    /// Seed a historical subscription from a topic's retained log. The log
    /// is already in publish order.
    pub fn seed(&mut self, log: &[StoredMessage]) {
        for message in log {
            self.enqueue(message.clone());
        }
    }

    /// Take up to `max` pending messages, reserving each until
    /// `now + ack_deadline`.
    pub fn pull(&mut self, max: usize, now: DateTime<Utc>) -> Vec<Message> {
        self.touch(now);
        self.purge_expired(now);
        self.release_expired(now);

        let mut messages = Vec::with_capacity(max.min(self.pending.len()));
        while messages.len() < max {
            let Some(id) = self.pending.pop_front() else {
                break;
            };
            let Some(record) = self.records.get_mut(&id) else {
                continue;
            };
            record.state = DeliveryState::Reserved {
                deadline: now + self.ack_deadline,
            };
            messages.push(Message {
                id,
                time: record.message.time,
                tries: record.tries,
                data: record.message.data.clone(),
            });
        }
        messages
    }

    /// Acknowledge the given ids, returning the subset actually removed.
    ///
    /// Only ids currently reserved count. Unknown ids, ids acked before,
    /// and ids whose deadline already returned them to pending are
    /// silently skipped, so acking twice is a no-op rather than an error.
    pub fn ack(&mut self, ids: &[Uuid], now: DateTime<Utc>) -> Vec<Uuid> {
        self.touch(now);
        self.purge_expired(now);
        self.release_expired(now);

        let mut acked = Vec::with_capacity(ids.len());
        for id in ids {
            let reserved = matches!(
                self.records.get(id),
                Some(record) if matches!(record.state, DeliveryState::Reserved { .. })
            );
            if reserved {
                self.records.remove(id);
                acked.push(*id);
            }
        }
        acked
    }

    /// Return every reservation whose deadline has elapsed to the pending
    /// index, oldest publish first, ahead of anything not yet delivered.
    pub fn release_expired(&mut self, now: DateTime<Utc>) {
        let mut released: Vec<(DateTime<Utc>, Uuid)> = Vec::new();
        for (id, record) in &mut self.records {
            if let DeliveryState::Reserved { deadline } = record.state {
                if now >= deadline {
                    record.state = DeliveryState::Pending;
                    record.tries += 1;
                    released.push((record.message.time, *id));
                }
            }
        }
        released.sort();
        for (_, id) in released.into_iter().rev() {
            self.pending.push_front(id);
        }
    }

    /// Drop messages past their publish-time expiry, whatever their
    /// delivery state. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.message.expired(now));
        if self.records.len() != before {
            let records = &self.records;
            self.pending.retain(|id| records.contains_key(id));
        }
        before - self.records.len()
    }

    /// Whether the subscription has outlived its inactivity window. A zero
    /// TTL means it never does.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        !self.ttl.is_zero() && now - self.updated > self.ttl
    }

    /// Messages currently held for this subscription, pending or reserved.
    pub fn message_count(&self) -> usize {
        self.records.len()
    }

    pub fn set_ack_deadline(&mut self, ack_deadline: Duration, now: DateTime<Utc>) {
        self.touch(now);
        self.ack_deadline = ack_deadline;
    }

    pub fn set_ttl(&mut self, ttl: Duration, now: DateTime<Utc>) {
        self.touch(now);
        self.ttl = ttl;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated = now;
    }
}

/// A subscription as reported over the wire, with durations widened to
/// signed whole seconds.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Subscription {
    pub name: String,
    pub topic: String,
    pub ack_deadline: i64,
    pub ttl: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<&SubscriptionState> for Subscription {
    fn from(state: &SubscriptionState) -> Self {
        Self {
            name: state.name.clone(),
            topic: state.topic.clone(),
            ack_deadline: state.ack_deadline.num_seconds(),
            ttl: state.ttl.num_seconds(),
            created: state.created,
            updated: state.updated,
        }
    }
}
