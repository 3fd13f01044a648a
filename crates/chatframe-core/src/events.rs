//! FeedEvent enum — broadcast from the feed client to renderers via tokio::broadcast.

use serde::Serialize;

use crate::display::DisplayConfig;
use crate::types::{LinkState, Message};

/// State changes a renderer must react to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum FeedEvent {
    /// The log was replaced wholesale (history snapshot applied)
    #[serde(rename = "reset")]
    Reset(Vec<Message>),

    /// One message appended; renderers evict their own oldest entry at capacity
    #[serde(rename = "appended")]
    Appended(Message),

    /// Colours changed
    #[serde(rename = "display")]
    Display(DisplayConfig),

    /// Push connection state changed
    #[serde(rename = "link")]
    Link(LinkState),
}

/// Commands sent TO a running feed client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCommand {
    Connect,
    Disconnect,
    /// Re-broadcast the current log, colours, and link state
    Resync,
    Stop,
}
