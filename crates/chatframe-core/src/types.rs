//! Core types — Message, LinkState.

use serde::{Deserialize, Serialize};

// ── Chat message ──

/// One chat line as delivered by `/hist` and the push channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Seconds since the Unix epoch
    pub ts: i64,
    pub channel: String,
    pub user: String,
    pub text: String,
}

impl Message {
    pub fn new(ts: i64, channel: &str, user: &str, text: &str) -> Self {
        Self {
            ts,
            channel: channel.to_string(),
            user: user.to_string(),
            text: text.to_string(),
        }
    }

    /// Case-insensitive channel match, the same rule the server used for its channel list.
    pub fn in_channels(&self, channels: &[String]) -> bool {
        channels.is_empty() || channels.iter().any(|c| c.eq_ignore_ascii_case(&self.channel))
    }
}

// ── Push link state ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Never connected
    Idle,
    /// Connect attempt in flight
    Pending,
    Connected,
    /// Connection lost, waiting out the reconnect delay
    Reconnecting,
    /// Explicitly disconnected
    Closed,
}

impl LinkState {
    /// True while a logical connection exists (pending, open, or waiting to retry).
    pub fn is_live(self) -> bool {
        matches!(
            self,
            LinkState::Pending | LinkState::Connected | LinkState::Reconnecting
        )
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Idle => write!(f, "idle"),
            LinkState::Pending => write!(f, "connecting"),
            LinkState::Connected => write!(f, "live"),
            LinkState::Reconnecting => write!(f, "reconnecting"),
            LinkState::Closed => write!(f, "closed"),
        }
    }
}
