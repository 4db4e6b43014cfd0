//! The `client` module is the typed binding for the broker's HTTP API.
//!
//! It wraps one blocking request per method and decodes each response
//! into the shared wire types, classifying every failure into the
//! `ClientError` taxonomy.

pub mod http_client;
pub use http_client::Client;

#[cfg(test)]
mod tests;
