//! chatframe-core — Live chat feed client, no UI.
//!
//! Loads a history snapshot and display colours over HTTP, keeps a
//! reconnecting push channel open, and folds every message into a bounded
//! log. Frontends subscribe to changes via tokio::broadcast.

pub mod api;
pub mod config;
pub mod display;
pub mod error;
pub mod events;
pub mod feed;
pub mod grouping;
pub mod live;
pub mod log;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{FeedError, FeedResult};
pub use feed::FeedClient;
pub use types::{LinkState, Message};
