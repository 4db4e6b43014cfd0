use reqwest::blocking::Response;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::broker::engine::BrokerStats;
use crate::broker::message::Message;
use crate::broker::subscription::Subscription;
use crate::broker::topic::Topic;
use crate::transport::wire::{
    MessageIdList, MessageList, PullOptions, RawMessageList, SubscriptionCreate,
    SubscriptionList, SubscriptionNameList, SubscriptionUpdate, TopicCreate, TopicList,
    TopicUpdate,
};
use crate::utils::error::ClientError;

static TOPICS_PATH: &str = "/api/v1/topics";
static SUBSCRIPTIONS_PATH: &str = "/api/v1/subscriptions";

/// A typed, blocking binding for the broker's HTTP API.
///
/// One request per call, no session state beyond the base address, no
/// retries. Each call either returns the decoded typed result or exactly
/// one classified fault; a request that did not complete has had no
/// effect on the broker.
pub struct Client {
    base_url: Url,
    http: reqwest::blocking::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::Transport(e.to_string()))?;
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { base_url, http })
    }

    pub fn create_topic(&self, name: &str, config: &TopicCreate) -> Result<Topic, ClientError> {
        let url = self.url(&format!("{TOPICS_PATH}/{name}"))?;
        self.put_json(url, config)
    }

    /// Create a topic whose name the broker assigns; the returned topic
    /// carries it.
    pub fn create_topic_anonymous(&self, config: &TopicCreate) -> Result<Topic, ClientError> {
        let url = self.url(&format!("{TOPICS_PATH}/"))?;
        self.put_json(url, config)
    }

    pub fn update_topic(&self, name: &str, config: &TopicUpdate) -> Result<Topic, ClientError> {
        let url = self.url(&format!("{TOPICS_PATH}/{name}"))?;
        let response = self.http.patch(url.clone()).json(config).send();
        self.decode(response, &url)
    }

    pub fn delete_topic(&self, name: &str) -> Result<(), ClientError> {
        let url = self.url(&format!("{TOPICS_PATH}/{name}"))?;
        let response = self.http.delete(url.clone()).send();
        classify(response, &url).map(|_| ())
    }

    pub fn get_topic(&self, name: &str) -> Result<Topic, ClientError> {
        let url = self.url(&format!("{TOPICS_PATH}/{name}"))?;
        let response = self.http.get(url.clone()).send();
        self.decode(response, &url)
    }

    pub fn list_topics(&self) -> Result<Vec<Topic>, ClientError> {
        let url = self.url(&format!("{TOPICS_PATH}/"))?;
        let response = self.http.get(url.clone()).send();
        let list: TopicList = self.decode(response, &url)?;
        Ok(list.topics)
    }

    /// Publish payloads, returning the assigned message ids in order.
    pub fn publish(&self, topic: &str, data: Vec<String>) -> Result<Vec<Uuid>, ClientError> {
        let url = self.url(&format!("{TOPICS_PATH}/{topic}/publish"))?;
        let body = RawMessageList::new(data);
        let response = self.http.post(url.clone()).json(&body).send();
        let ids: MessageIdList = self.decode(response, &url)?;
        Ok(ids.message_ids)
    }

    pub fn publish_one(&self, topic: &str, data: String) -> Result<Vec<Uuid>, ClientError> {
        self.publish(topic, vec![data])
    }

    pub fn topic_subscriptions(&self, topic: &str) -> Result<Vec<String>, ClientError> {
        let url = self.url(&format!("{TOPICS_PATH}/{topic}/subscriptions"))?;
        let response = self.http.get(url.clone()).send();
        let names: SubscriptionNameList = self.decode(response, &url)?;
        Ok(names.subscription_names)
    }

    pub fn create_subscription(
        &self,
        name: &str,
        config: &SubscriptionCreate,
    ) -> Result<Subscription, ClientError> {
        let url = self.url(&format!("{SUBSCRIPTIONS_PATH}/{name}"))?;
        self.put_json(url, config)
    }

    pub fn create_subscription_anonymous(
        &self,
        config: &SubscriptionCreate,
    ) -> Result<Subscription, ClientError> {
        let url = self.url(&format!("{SUBSCRIPTIONS_PATH}/"))?;
        self.put_json(url, config)
    }

    pub fn update_subscription(
        &self,
        name: &str,
        config: &SubscriptionUpdate,
    ) -> Result<Subscription, ClientError> {
        let url = self.url(&format!("{SUBSCRIPTIONS_PATH}/{name}"))?;
        let response = self.http.patch(url.clone()).json(config).send();
        self.decode(response, &url)
    }

    pub fn delete_subscription(&self, name: &str) -> Result<(), ClientError> {
        let url = self.url(&format!("{SUBSCRIPTIONS_PATH}/{name}"))?;
        let response = self.http.delete(url.clone()).send();
        classify(response, &url).map(|_| ())
    }

    pub fn get_subscription(&self, name: &str) -> Result<Subscription, ClientError> {
        let url = self.url(&format!("{SUBSCRIPTIONS_PATH}/{name}"))?;
        let response = self.http.get(url.clone()).send();
        self.decode(response, &url)
    }

    pub fn list_subscriptions(&self) -> Result<Vec<Subscription>, ClientError> {
        let url = self.url(&format!("{SUBSCRIPTIONS_PATH}/"))?;
        let response = self.http.get(url.clone()).send();
        let list: SubscriptionList = self.decode(response, &url)?;
        Ok(list.subscriptions)
    }

    /// Pull up to `max_messages` messages; each comes reserved until the
    /// subscription's ack deadline.
    pub fn pull(&self, name: &str, max_messages: usize) -> Result<Vec<Message>, ClientError> {
        let url = self.url(&format!("{SUBSCRIPTIONS_PATH}/{name}/pull"))?;
        let body = PullOptions {
            max_messages: Some(max_messages),
        };
        let response = self.http.post(url.clone()).json(&body).send();
        let list: MessageList = self.decode(response, &url)?;
        Ok(list.messages)
    }

    pub fn pull_one(&self, name: &str) -> Result<Vec<Message>, ClientError> {
        self.pull(name, 1)
    }

    /// Acknowledge pulled messages; the result is the subset of ids the
    /// broker actually removed.
    pub fn ack(&self, name: &str, message_ids: Vec<Uuid>) -> Result<Vec<Uuid>, ClientError> {
        let url = self.url(&format!("{SUBSCRIPTIONS_PATH}/{name}/ack"))?;
        let body = MessageIdList { message_ids };
        let response = self.http.post(url.clone()).json(&body).send();
        let acked: MessageIdList = self.decode(response, &url)?;
        Ok(acked.message_ids)
    }

    pub fn ack_one(&self, name: &str, message_id: Uuid) -> Result<Vec<Uuid>, ClientError> {
        self.ack(name, vec![message_id])
    }

    /// Liveness probe; true when the broker answers with a success status.
    pub fn heartbeat(&self) -> bool {
        match self.url("/api/v1/heartbeat") {
            Ok(url) => self
                .http
                .get(url)
                .send()
                .map(|r| r.status().is_success())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    pub fn stats(&self) -> Result<BrokerStats, ClientError> {
        let url = self.url("/api/v1/stats")?;
        let response = self.http.get(url.clone()).send();
        self.decode(response, &url)
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.http.put(url.clone()).json(body).send();
        self.decode(response, &url)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::Result<Response>,
        url: &Url,
    ) -> Result<T, ClientError> {
        let response = classify(response, url)?;
        let body = response
            .text()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }
}

/// Sort a response into the fault taxonomy: 4xx is the caller's fault,
/// 5xx is the broker's, anything else unexpected is a decode fault, and
/// a failure to send at all is a transport fault.
fn classify(response: reqwest::Result<Response>, url: &Url) -> Result<Response, ClientError> {
    let response = response.map_err(|e| ClientError::Transport(e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status.is_client_error() {
        Err(ClientError::Client {
            status: status.as_u16(),
            url: url.to_string(),
        })
    } else if status.is_server_error() {
        Err(ClientError::Server {
            status: status.as_u16(),
            url: url.to_string(),
        })
    } else {
        Err(ClientError::Decode {
            url: url.to_string(),
            detail: format!("unexpected status {status}"),
        })
    }
}
