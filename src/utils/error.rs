//! Error types for the two halves of the crate.
//!
//! `BrokerError` is what the registries report; the HTTP layer maps each
//! variant to a status code. `ClientError` is the fault taxonomy of the
//! typed binding: every call either fully succeeds with a typed result or
//! fails with exactly one classified fault. The binding never retries.

use thiserror::Error;

/// Outcome of a broker operation that could not be completed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The named topic or subscription does not exist.
    #[error("resource '{0}' was not found")]
    NotFound(String),
    /// A live resource with this name already exists.
    #[error("resource '{0}' already exists")]
    AlreadyExists(String),
    /// A subscription referenced a topic that does not exist.
    #[error("topic '{0}' does not exist")]
    MissingTopic(String),
    /// The supplied resource name is empty, too long, or outside the
    /// allowed charset.
    #[error("invalid resource name '{0}'")]
    InvalidName(String),
}

/// A fault surfaced by the HTTP client binding.
///
/// Callers must treat every variant as terminal for that call; none imply
/// a retry by the binding.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the request (any 4xx status).
    #[error("client fault: status {status} from {url}")]
    Client { status: u16, url: String },
    /// The broker failed internally (any 5xx status).
    #[error("server fault: status {status} from {url}")]
    Server { status: u16, url: String },
    /// The request could not be built or sent; no status was received.
    #[error("transport fault: {0}")]
    Transport(String),
    /// A response arrived but its body did not match the expected shape.
    #[error("decode fault from {url}: {detail}")]
    Decode { url: String, detail: String },
}
