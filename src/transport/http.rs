use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::broker::engine::BrokerStats;
use crate::broker::subscription::Subscription;
use crate::broker::topic::Topic;
use crate::broker::Broker;
use crate::transport::wire::{
    MessageIdList, MessageList, PullOptions, RawMessageList, SubscriptionCreate,
    SubscriptionList, SubscriptionNameList, SubscriptionUpdate, TopicCreate, TopicList,
    TopicUpdate,
};
use crate::utils::error::BrokerError;

type SharedBroker = Arc<Broker>;

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = match self {
            BrokerError::NotFound(_) => StatusCode::NOT_FOUND,
            BrokerError::AlreadyExists(_) => StatusCode::CONFLICT,
            BrokerError::MissingTopic(_) | BrokerError::InvalidName(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

/// Build the API router. Named creation and anonymous creation are two
/// separate routes with their own handlers; the collection root (with the
/// trailing slash) hosts listing and anonymous creation.
pub fn router(broker: SharedBroker) -> Router {
    let api = Router::new()
        .route("/heartbeat", get(heartbeat))
        .route("/stats", get(stats))
        .route("/topics/", get(list_topics).put(create_topic_anonymous))
        .route(
            "/topics/{name}",
            get(get_topic)
                .put(create_topic)
                .patch(update_topic)
                .delete(delete_topic),
        )
        .route("/topics/{name}/publish", post(publish))
        .route("/topics/{name}/subscriptions", get(topic_subscriptions))
        .route(
            "/subscriptions/",
            get(list_subscriptions).put(create_subscription_anonymous),
        )
        .route(
            "/subscriptions/{name}",
            get(get_subscription)
                .put(create_subscription)
                .patch(update_subscription)
                .delete(delete_subscription),
        )
        .route("/subscriptions/{name}/pull", post(pull))
        .route("/subscriptions/{name}/ack", post(ack));
    Router::new().nest("/api/v1", api).with_state(broker)
}

/// Bind `addr` and serve the API until the task is dropped.
pub async fn start_http_server(addr: &str, broker: SharedBroker) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router(broker)).await
}

pub(crate) async fn heartbeat() -> &'static str {
    "ok"
}

pub(crate) async fn stats(State(broker): State<SharedBroker>) -> Json<BrokerStats> {
    Json(broker.stats())
}

pub(crate) async fn create_topic(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
    Json(body): Json<TopicCreate>,
) -> Result<(StatusCode, Json<Topic>), BrokerError> {
    let topic = broker.create_topic(&name, body.message_ttl, body.ttl)?;
    Ok((StatusCode::CREATED, Json(topic)))
}

pub(crate) async fn create_topic_anonymous(
    State(broker): State<SharedBroker>,
    Json(body): Json<TopicCreate>,
) -> Result<(StatusCode, Json<Topic>), BrokerError> {
    let topic = broker.create_topic_anonymous(body.message_ttl, body.ttl)?;
    Ok((StatusCode::CREATED, Json(topic)))
}

pub(crate) async fn update_topic(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
    Json(body): Json<TopicUpdate>,
) -> Result<Json<Topic>, BrokerError> {
    Ok(Json(broker.update_topic(&name, body.message_ttl, body.ttl)?))
}

pub(crate) async fn delete_topic(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
) -> Result<StatusCode, BrokerError> {
    broker.delete_topic(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn get_topic(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
) -> Result<Json<Topic>, BrokerError> {
    Ok(Json(broker.get_topic(&name)?))
}

pub(crate) async fn list_topics(State(broker): State<SharedBroker>) -> Json<TopicList> {
    Json(TopicList {
        topics: broker.list_topics(),
    })
}

pub(crate) async fn publish(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
    Json(body): Json<RawMessageList>,
) -> Result<Json<MessageIdList>, BrokerError> {
    let data = body.raw_messages.into_iter().map(|m| m.data).collect();
    let message_ids = broker.publish(&name, data)?;
    Ok(Json(MessageIdList { message_ids }))
}

pub(crate) async fn topic_subscriptions(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
) -> Result<Json<SubscriptionNameList>, BrokerError> {
    Ok(Json(SubscriptionNameList {
        subscription_names: broker.topic_subscriptions(&name)?,
    }))
}

pub(crate) async fn create_subscription(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
    Json(body): Json<SubscriptionCreate>,
) -> Result<(StatusCode, Json<Subscription>), BrokerError> {
    let subscription = broker.create_subscription(
        &name,
        &body.topic,
        body.ack_deadline,
        body.ttl,
        body.historical.unwrap_or(false),
    )?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub(crate) async fn create_subscription_anonymous(
    State(broker): State<SharedBroker>,
    Json(body): Json<SubscriptionCreate>,
) -> Result<(StatusCode, Json<Subscription>), BrokerError> {
    let subscription = broker.create_subscription_anonymous(
        &body.topic,
        body.ack_deadline,
        body.ttl,
        body.historical.unwrap_or(false),
    )?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub(crate) async fn update_subscription(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
    Json(body): Json<SubscriptionUpdate>,
) -> Result<Json<Subscription>, BrokerError> {
    Ok(Json(broker.update_subscription(
        &name,
        body.ack_deadline,
        body.ttl,
    )?))
}

pub(crate) async fn delete_subscription(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
) -> Result<StatusCode, BrokerError> {
    broker.delete_subscription(&name)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn get_subscription(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
) -> Result<Json<Subscription>, BrokerError> {
    Ok(Json(broker.get_subscription(&name)?))
}

pub(crate) async fn list_subscriptions(
    State(broker): State<SharedBroker>,
) -> Json<SubscriptionList> {
    Json(SubscriptionList {
        subscriptions: broker.list_subscriptions(),
    })
}

pub(crate) async fn pull(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
    Json(body): Json<PullOptions>,
) -> Result<Json<MessageList>, BrokerError> {
    let messages = broker.pull(&name, body.max_messages)?;
    Ok(Json(MessageList { messages }))
}

pub(crate) async fn ack(
    State(broker): State<SharedBroker>,
    Path(name): Path<String>,
    Json(body): Json<MessageIdList>,
) -> Result<Json<MessageIdList>, BrokerError> {
    let message_ids = broker.ack(&name, &body.message_ids)?;
    Ok(Json(MessageIdList { message_ids }))
}
