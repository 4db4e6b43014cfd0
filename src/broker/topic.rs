use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::message::StoredMessage;

/// Internal state of one topic.
///
/// A topic owns the log of its live published messages and the set of
/// subscription names bound to it. The log is what seeds a subscription
/// created with `historical`; it is trimmed whenever messages outlive the
/// TTL they were stamped with at publish time.
#[derive(Debug)]
pub(crate) struct TopicState {
    pub name: String,
    pub message_ttl: Duration,
    pub ttl: Duration,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub log: Vec<StoredMessage>,
    pub subscriptions: HashSet<String>,
}

impl TopicState {
    pub fn new(name: &str, message_ttl: Duration, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            name: String::from(name),
            message_ttl,
            ttl,
            created: now,
            updated: now,
            log: Vec::new(),
            subscriptions: HashSet::new(),
        }
    }

    /// Append one payload as a stamped message and count it as publish
    /// activity for the topic TTL.
    pub fn publish(&mut self, data: String, now: DateTime<Utc>) -> StoredMessage {
        self.touch(now);
        let message = StoredMessage::new(data, now, self.message_ttl);
        self.log.push(message.clone());
        message
    }

    /// Drop expired messages from the retained log. Returns how many were
    /// removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.log.len();
        self.log.retain(|m| !m.expired(now));
        before - self.log.len()
    }

    /// Whether the topic itself has outlived its inactivity window. A zero
    /// TTL means it never does.
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        !self.ttl.is_zero() && now - self.updated > self.ttl
    }

    pub fn set_message_ttl(&mut self, message_ttl: Duration, now: DateTime<Utc>) {
        self.touch(now);
        self.message_ttl = message_ttl;
    }

    pub fn set_ttl(&mut self, ttl: Duration, now: DateTime<Utc>) {
        self.touch(now);
        self.ttl = ttl;
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated = now;
    }
}

/// A topic as reported over the wire, with durations widened to signed
/// whole seconds.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub message_ttl: i64,
    pub ttl: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl From<&TopicState> for Topic {
    fn from(state: &TopicState) -> Self {
        Self {
            name: state.name.clone(),
            message_ttl: state.message_ttl.num_seconds(),
            ttl: state.ttl.num_seconds(),
            created: state.created,
            updated: state.updated,
        }
    }
}
