//! The `transport` module is the HTTP face of the broker.
//!
//! It defines the JSON bodies exchanged with clients and implements the
//! axum server that maps each resource path onto a broker operation and
//! each broker outcome onto a status code.

pub mod http;
pub mod wire;
