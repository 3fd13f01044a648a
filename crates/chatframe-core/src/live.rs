//! Push channel — one logical WebSocket connection with fixed-delay reconnect.
//!
//! `ConnectionManager` owns the live session (a supervisor task plus its
//! cancellation token). The supervisor connects, forwards every parsed
//! message to the caller's handler, and on close or failure waits the fixed
//! delay before the next attempt, forever. `disconnect` cancels the token,
//! which also cancels a reconnect wait that is already scheduled.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{FeedError, FeedResult};
use crate::types::{LinkState, Message};

/// Text payloads of one open connection; ends when the connection closes.
pub type FrameStream = Pin<Box<dyn Stream<Item = FeedResult<String>> + Send>>;

/// Opens the push transport.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> FeedResult<FrameStream>;
}

/// `Connector` over tokio-tungstenite.
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> FeedResult<FrameStream> {
        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        let frames = socket.filter_map(|msg| {
            futures::future::ready(match msg {
                Ok(WsMessage::Text(text)) => Some(Ok(text.as_str().to_owned())),
                // Pings are answered by tungstenite; binary frames carry nothing for us
                Ok(_) => None,
                Err(e) => Some(Err(FeedError::from(e))),
            })
        });
        Ok(Box::pin(frames))
    }
}

/// Parse one push frame. Empty payloads and `null` are rejected.
pub fn parse_frame(text: &str) -> FeedResult<Message> {
    if text.trim().is_empty() {
        return Err(FeedError::EmptyFrame);
    }
    let msg: Option<Message> = serde_json::from_str(text)?;
    msg.ok_or(FeedError::EmptyFrame)
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owner of the single logical push connection.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,
    state: Arc<watch::Sender<LinkState>>,
    session: Option<Session>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, reconnect_delay: Duration) -> Self {
        let (state, _) = watch::channel(LinkState::Idle);
        Self {
            connector,
            reconnect_delay,
            state: Arc::new(state),
            session: None,
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Receiver that sees every link state transition.
    pub fn watch(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Start the push connection. A no-op (returning `false`) while a session
    /// is pending, open, or waiting to reconnect.
    pub fn connect_live<F>(&mut self, on_message: F) -> bool
    where
        F: FnMut(Message) + Send + 'static,
    {
        if self.session.is_some() {
            debug!("connect_live ignored, link is {}", self.state());
            return false;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(supervise(
            Arc::clone(&self.connector),
            self.reconnect_delay,
            Arc::clone(&self.state),
            cancel.clone(),
            on_message,
        ));
        self.session = Some(Session { cancel, task });
        true
    }

    /// Close the live connection and cancel any scheduled reconnect.
    /// Returns `false` when there was nothing to close.
    pub fn disconnect(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        session.cancel.cancel();
        session.task.abort();
        self.state.send_replace(LinkState::Closed);
        info!("Push channel disconnected");
        true
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            session.task.abort();
        }
    }
}

/// Publish a transition unless the session was cancelled; the check runs
/// under the watch lock so a concurrent `disconnect` always wins.
fn publish(state: &watch::Sender<LinkState>, cancel: &CancellationToken, next: LinkState) {
    state.send_if_modified(|current| {
        if cancel.is_cancelled() || *current == next {
            return false;
        }
        *current = next;
        true
    });
}

async fn supervise<F>(
    connector: Arc<dyn Connector>,
    delay: Duration,
    state: Arc<watch::Sender<LinkState>>,
    cancel: CancellationToken,
    mut on_message: F,
) where
    F: FnMut(Message) + Send + 'static,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        publish(&state, &cancel, LinkState::Pending);

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = connector.connect() => result,
        };

        match connected {
            Ok(mut frames) => {
                info!("Push channel connected (attempt {})", attempt);
                publish(&state, &cancel, LinkState::Connected);
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        next = frames.next() => next,
                    };
                    match next {
                        Some(Ok(text)) => match parse_frame(&text) {
                            Ok(msg) => on_message(msg),
                            Err(e) => debug!("Dropping push frame: {}", e),
                        },
                        Some(Err(e)) => {
                            warn!("Push channel error: {}", e);
                            break;
                        }
                        None => {
                            info!("Push channel closed");
                            break;
                        }
                    }
                }
            }
            Err(e) => warn!("Push channel connect failed (attempt {}): {}", attempt, e),
        }

        publish(&state, &cancel, LinkState::Reconnecting);
        debug!("Reconnecting in {:?}", delay);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
