//! Request and response bodies of the HTTP protocol, shared by the server
//! handlers and the client binding.
//!
//! Fields a caller may leave unset are `Option`s that are skipped when
//! absent, so an omitted field is distinguishable from one set to zero.
//! Partial updates rely on this: only fields present in the payload are
//! applied.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broker::message::Message;
use crate::broker::subscription::Subscription;
use crate::broker::topic::Topic;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TopicCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct TopicUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TopicList {
    pub topics: Vec<Topic>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubscriptionCreate {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_deadline: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical: Option<bool>,
}

impl SubscriptionCreate {
    /// A create body bound to `topic` with every optional field unset.
    pub fn new(topic: &str) -> Self {
        Self {
            topic: String::from(topic),
            ack_deadline: None,
            ttl: None,
            historical: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack_deadline: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubscriptionList {
    pub subscriptions: Vec<Subscription>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubscriptionNameList {
    pub subscription_names: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawMessage {
    pub data: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawMessageList {
    pub raw_messages: Vec<RawMessage>,
}

impl RawMessageList {
    pub fn new(data: Vec<String>) -> Self {
        Self {
            raw_messages: data.into_iter().map(|data| RawMessage { data }).collect(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct MessageIdList {
    pub message_ids: Vec<Uuid>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct MessageList {
    pub messages: Vec<Message>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PullOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<usize>,
}
