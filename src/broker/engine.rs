use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broker::message::Message;
use crate::broker::subscription::{Subscription, SubscriptionState};
use crate::broker::topic::{Topic, TopicState};
use crate::config::BrokerSettings;
use crate::utils::error::BrokerError;

const MAX_NAME_LEN: usize = 255;

/// Default attributes applied when a create request leaves a field unset.
/// Zero TTLs mean the resource never expires.
#[derive(Clone, Debug)]
pub struct BrokerDefaults {
    pub message_ttl: Duration,
    pub topic_ttl: Duration,
    pub ack_deadline: Duration,
    pub subscription_ttl: Duration,
    pub max_messages: usize,
}

impl Default for BrokerDefaults {
    fn default() -> Self {
        Self {
            message_ttl: Duration::seconds(3600),
            topic_ttl: Duration::zero(),
            ack_deadline: Duration::seconds(60),
            subscription_ttl: Duration::zero(),
            max_messages: 1,
        }
    }
}

impl From<&BrokerSettings> for BrokerDefaults {
    fn from(settings: &BrokerSettings) -> Self {
        Self {
            message_ttl: secs(settings.default_message_ttl_secs),
            topic_ttl: secs(settings.default_topic_ttl_secs),
            ack_deadline: secs(settings.default_ack_deadline_secs),
            subscription_ttl: secs(settings.default_subscription_ttl_secs),
            max_messages: settings.default_max_messages,
        }
    }
}

/// Counts reported by one sweep pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub topics_removed: usize,
    pub subscriptions_removed: usize,
    pub messages_removed: usize,
}

/// Gauge snapshot of the registries.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct BrokerStats {
    pub topics: usize,
    pub subscriptions: usize,
    pub pending_messages: usize,
}

/// The broker: a registry of topics and a registry of subscriptions.
///
/// The maps are guarded by `RwLock`s used only for resource lifecycle;
/// each topic and subscription sits behind its own mutex, so a pull on one
/// subscription never blocks a pull on another. Lock discipline: a map
/// guard may be held while taking a resource lock, but a resource lock is
/// never held across a map lookup.
#[derive(Debug, Default)]
pub struct Broker {
    defaults: BrokerDefaults,
    topics: RwLock<HashMap<String, Arc<Mutex<TopicState>>>>,
    subscriptions: RwLock<HashMap<String, Arc<Mutex<SubscriptionState>>>>,
}

impl Broker {
    pub fn new(defaults: BrokerDefaults) -> Self {
        Self {
            defaults,
            topics: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a topic under a caller-supplied name. Fails if a live topic
    /// already holds the name.
    pub fn create_topic(
        &self,
        name: &str,
        message_ttl: Option<u32>,
        ttl: Option<u32>,
    ) -> Result<Topic, BrokerError> {
        validate_name(name)?;
        self.insert_topic(String::from(name), message_ttl, ttl)
    }

    /// Create a topic under a generated UUID name and return it with the
    /// assigned name filled in.
    pub fn create_topic_anonymous(
        &self,
        message_ttl: Option<u32>,
        ttl: Option<u32>,
    ) -> Result<Topic, BrokerError> {
        self.insert_topic(Uuid::new_v4().to_string(), message_ttl, ttl)
    }

    fn insert_topic(
        &self,
        name: String,
        message_ttl: Option<u32>,
        ttl: Option<u32>,
    ) -> Result<Topic, BrokerError> {
        let now = Utc::now();
        let message_ttl = message_ttl.map(secs).unwrap_or(self.defaults.message_ttl);
        let ttl = ttl.map(secs).unwrap_or(self.defaults.topic_ttl);

        let mut topics = self.topics.write().unwrap();
        if topics.contains_key(&name) {
            return Err(BrokerError::AlreadyExists(name));
        }
        let state = TopicState::new(&name, message_ttl, ttl, now);
        let topic = Topic::from(&state);
        topics.insert(name.clone(), Arc::new(Mutex::new(state)));
        tracing::info!(topic = %name, "topic created");
        Ok(topic)
    }

    /// Apply the fields present in the update, leaving absent ones
    /// untouched.
    pub fn update_topic(
        &self,
        name: &str,
        message_ttl: Option<u32>,
        ttl: Option<u32>,
    ) -> Result<Topic, BrokerError> {
        validate_name(name)?;
        let now = Utc::now();
        let topic = self.topic(name)?;
        let mut topic = topic.lock().unwrap();
        if let Some(message_ttl) = message_ttl {
            topic.set_message_ttl(secs(message_ttl), now);
        }
        if let Some(ttl) = ttl {
            topic.set_ttl(secs(ttl), now);
        }
        Ok(Topic::from(&*topic))
    }

    /// Remove a topic. Bound subscriptions are left in place: they keep
    /// serving what they already hold but receive nothing further, and a
    /// later topic under the same name does not re-attach them.
    pub fn delete_topic(&self, name: &str) -> Result<(), BrokerError> {
        validate_name(name)?;
        let removed = self.topics.write().unwrap().remove(name);
        match removed {
            Some(_) => {
                tracing::info!(topic = %name, "topic deleted");
                Ok(())
            }
            None => Err(BrokerError::NotFound(String::from(name))),
        }
    }

    pub fn get_topic(&self, name: &str) -> Result<Topic, BrokerError> {
        validate_name(name)?;
        let topic = self.topic(name)?;
        let topic = topic.lock().unwrap();
        Ok(Topic::from(&*topic))
    }

    pub fn list_topics(&self) -> Vec<Topic> {
        let topics = self.topics.read().unwrap();
        let mut out: Vec<Topic> = topics
            .values()
            .map(|t| Topic::from(&*t.lock().unwrap()))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Names of the subscriptions bound to a topic, sorted.
    pub fn topic_subscriptions(&self, name: &str) -> Result<Vec<String>, BrokerError> {
        validate_name(name)?;
        let topic = self.topic(name)?;
        let topic = topic.lock().unwrap();
        let mut names: Vec<String> = topic.subscriptions.iter().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Publish payloads to a topic, replicating each resulting message
    /// into every bound subscription. Returns the assigned ids in input
    /// order.
    pub fn publish(&self, topic: &str, data: Vec<String>) -> Result<Vec<Uuid>, BrokerError> {
        self.publish_at(topic, data, Utc::now())
    }

    pub(crate) fn publish_at(
        &self,
        topic_name: &str,
        data: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, BrokerError> {
        validate_name(topic_name)?;
        let topic = self.topic(topic_name)?;

        let (messages, bound) = {
            let mut topic = topic.lock().unwrap();
            let mut messages = Vec::with_capacity(data.len());
            for datum in data {
                messages.push(topic.publish(datum, now));
            }
            let bound: Vec<String> = topic.subscriptions.iter().cloned().collect();
            (messages, bound)
        };

        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let subscriptions = self.subscriptions.read().unwrap();
        for name in bound {
            if let Some(subscription) = subscriptions.get(&name) {
                let mut subscription = subscription.lock().unwrap();
                for message in &messages {
                    subscription.enqueue(message.clone());
                }
            }
        }
        tracing::debug!(topic = %topic_name, count = ids.len(), "published");
        Ok(ids)
    }

    /// Create a subscription under a caller-supplied name, bound to an
    /// existing topic. `historical` seeds it with every message the topic
    /// still retains; otherwise it starts empty.
    pub fn create_subscription(
        &self,
        name: &str,
        topic: &str,
        ack_deadline: Option<u32>,
        ttl: Option<u32>,
        historical: bool,
    ) -> Result<Subscription, BrokerError> {
        validate_name(name)?;
        validate_name(topic)?;
        self.insert_subscription(String::from(name), topic, ack_deadline, ttl, historical)
    }

    /// Create a subscription under a generated UUID name.
    pub fn create_subscription_anonymous(
        &self,
        topic: &str,
        ack_deadline: Option<u32>,
        ttl: Option<u32>,
        historical: bool,
    ) -> Result<Subscription, BrokerError> {
        validate_name(topic)?;
        self.insert_subscription(
            Uuid::new_v4().to_string(),
            topic,
            ack_deadline,
            ttl,
            historical,
        )
    }

    fn insert_subscription(
        &self,
        name: String,
        topic_name: &str,
        ack_deadline: Option<u32>,
        ttl: Option<u32>,
        historical: bool,
    ) -> Result<Subscription, BrokerError> {
        let now = Utc::now();
        let ack_deadline = ack_deadline.map(secs).unwrap_or(self.defaults.ack_deadline);
        let ttl = ttl.map(secs).unwrap_or(self.defaults.subscription_ttl);

        let topic = {
            let topics = self.topics.read().unwrap();
            topics
                .get(topic_name)
                .cloned()
                .ok_or_else(|| BrokerError::MissingTopic(String::from(topic_name)))?
        };

        let mut state = SubscriptionState::new(&name, topic_name, ack_deadline, ttl, now);
        if historical {
            let mut topic = topic.lock().unwrap();
            topic.purge_expired(now);
            state.seed(&topic.log);
        }

        let subscription = Subscription::from(&state);
        {
            let mut subscriptions = self.subscriptions.write().unwrap();
            if subscriptions.contains_key(&name) {
                return Err(BrokerError::AlreadyExists(name));
            }
            subscriptions.insert(name.clone(), Arc::new(Mutex::new(state)));
        }
        topic.lock().unwrap().subscriptions.insert(name.clone());
        tracing::info!(subscription = %name, topic = %topic_name, "subscription created");
        Ok(subscription)
    }

    pub fn update_subscription(
        &self,
        name: &str,
        ack_deadline: Option<u32>,
        ttl: Option<u32>,
    ) -> Result<Subscription, BrokerError> {
        validate_name(name)?;
        let now = Utc::now();
        let subscription = self.subscription(name)?;
        let mut subscription = subscription.lock().unwrap();
        if let Some(ack_deadline) = ack_deadline {
            subscription.set_ack_deadline(secs(ack_deadline), now);
        }
        if let Some(ttl) = ttl {
            subscription.set_ttl(secs(ttl), now);
        }
        Ok(Subscription::from(&*subscription))
    }

    pub fn delete_subscription(&self, name: &str) -> Result<(), BrokerError> {
        validate_name(name)?;
        let removed = self.subscriptions.write().unwrap().remove(name);
        let Some(state) = removed else {
            return Err(BrokerError::NotFound(String::from(name)));
        };
        let topic_name = state.lock().unwrap().topic.clone();
        self.unbind(&topic_name, name);
        tracing::info!(subscription = %name, "subscription deleted");
        Ok(())
    }

    pub fn get_subscription(&self, name: &str) -> Result<Subscription, BrokerError> {
        validate_name(name)?;
        let subscription = self.subscription(name)?;
        let subscription = subscription.lock().unwrap();
        Ok(Subscription::from(&*subscription))
    }

    pub fn list_subscriptions(&self) -> Vec<Subscription> {
        let subscriptions = self.subscriptions.read().unwrap();
        let mut out: Vec<Subscription> = subscriptions
            .values()
            .map(|s| Subscription::from(&*s.lock().unwrap()))
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Pull up to `max_messages` pending messages (configured default when
    /// unset), reserving each until its ack deadline.
    pub fn pull(&self, name: &str, max_messages: Option<usize>) -> Result<Vec<Message>, BrokerError> {
        self.pull_at(name, max_messages, Utc::now())
    }

    pub(crate) fn pull_at(
        &self,
        name: &str,
        max_messages: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Message>, BrokerError> {
        validate_name(name)?;
        let subscription = self.subscription(name)?;
        let max = max_messages.unwrap_or(self.defaults.max_messages);
        let messages = subscription.lock().unwrap().pull(max, now);
        tracing::debug!(subscription = %name, count = messages.len(), "pulled");
        Ok(messages)
    }

    /// Acknowledge reserved messages, returning the subset actually
    /// removed.
    pub fn ack(&self, name: &str, ids: &[Uuid]) -> Result<Vec<Uuid>, BrokerError> {
        self.ack_at(name, ids, Utc::now())
    }

    pub(crate) fn ack_at(
        &self,
        name: &str,
        ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, BrokerError> {
        validate_name(name)?;
        let subscription = self.subscription(name)?;
        let acked = subscription.lock().unwrap().ack(ids, now);
        tracing::debug!(subscription = %name, count = acked.len(), "acked");
        Ok(acked)
    }

    /// One garbage-collection pass: drop expired messages, then expired
    /// topics and subscriptions.
    pub fn sweep(&self) -> SweepStats {
        self.sweep_at(Utc::now())
    }

    pub(crate) fn sweep_at(&self, now: DateTime<Utc>) -> SweepStats {
        let mut stats = SweepStats::default();

        let mut dead_topics = Vec::new();
        {
            let topics = self.topics.read().unwrap();
            for (name, topic) in topics.iter() {
                let mut topic = topic.lock().unwrap();
                stats.messages_removed += topic.purge_expired(now);
                if topic.expired(now) {
                    dead_topics.push(name.clone());
                }
            }
        }
        if !dead_topics.is_empty() {
            let mut topics = self.topics.write().unwrap();
            for name in dead_topics {
                // Re-check under the write lock: a publish may have landed
                // between the scan and the removal.
                let still_expired = topics
                    .get(&name)
                    .is_some_and(|t| t.lock().unwrap().expired(now));
                if still_expired {
                    topics.remove(&name);
                    stats.topics_removed += 1;
                    tracing::info!(topic = %name, "topic expired");
                }
            }
        }

        let mut dead_subscriptions = Vec::new();
        {
            let subscriptions = self.subscriptions.read().unwrap();
            for (name, subscription) in subscriptions.iter() {
                let mut subscription = subscription.lock().unwrap();
                stats.messages_removed += subscription.purge_expired(now);
                subscription.release_expired(now);
                if subscription.expired(now) {
                    dead_subscriptions.push((name.clone(), subscription.topic.clone()));
                }
            }
        }
        for (name, topic_name) in dead_subscriptions {
            let removed = {
                let mut subscriptions = self.subscriptions.write().unwrap();
                let still_expired = subscriptions
                    .get(&name)
                    .is_some_and(|s| s.lock().unwrap().expired(now));
                if still_expired {
                    subscriptions.remove(&name);
                    true
                } else {
                    false
                }
            };
            if removed {
                stats.subscriptions_removed += 1;
                self.unbind(&topic_name, &name);
                tracing::info!(subscription = %name, "subscription expired");
            }
        }

        stats
    }

    /// Gauge snapshot: live topics, live subscriptions, and messages held
    /// across all subscription arenas.
    pub fn stats(&self) -> BrokerStats {
        let topics = self.topics.read().unwrap().len();
        let subscriptions = self.subscriptions.read().unwrap();
        let pending_messages = subscriptions
            .values()
            .map(|s| s.lock().unwrap().message_count())
            .sum();
        BrokerStats {
            topics,
            subscriptions: subscriptions.len(),
            pending_messages,
        }
    }

    fn topic(&self, name: &str) -> Result<Arc<Mutex<TopicState>>, BrokerError> {
        self.topics
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::NotFound(String::from(name)))
    }

    fn subscription(&self, name: &str) -> Result<Arc<Mutex<SubscriptionState>>, BrokerError> {
        self.subscriptions
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::NotFound(String::from(name)))
    }

    fn unbind(&self, topic_name: &str, subscription_name: &str) {
        if let Some(topic) = self.topics.read().unwrap().get(topic_name) {
            topic.lock().unwrap().subscriptions.remove(subscription_name);
        }
    }
}

/// Run `sweep` forever at the given interval. A zero interval disables
/// the sweeper.
pub async fn sweep_loop(broker: Arc<Broker>, every: std::time::Duration) {
    if every.is_zero() {
        tracing::info!("sweeper disabled");
        return;
    }
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let stats = broker.sweep();
        tracing::debug!(
            topics = stats.topics_removed,
            subscriptions = stats.subscriptions_removed,
            messages = stats.messages_removed,
            "sweep finished"
        );
    }
}

/// Resource names are non-empty, at most 255 bytes, and drawn from
/// letters, digits, `-`, `_`, and `.`. Generated UUID names satisfy this.
pub(crate) fn validate_name(name: &str) -> Result<(), BrokerError> {
    let charset_ok = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.');
    if name.is_empty() || name.len() > MAX_NAME_LEN || !charset_ok {
        return Err(BrokerError::InvalidName(String::from(name)));
    }
    Ok(())
}

fn secs(value: u32) -> Duration {
    Duration::seconds(i64::from(value))
}
