//! The feed client — bootstraps history and colours, owns the push link, and
//! is the single place the message log and display config change.
//!
//! Fetch results and pushed messages arrive on an internal inbox and are
//! applied one at a time, either by `run` or by an explicit `drain`. Pushes
//! that land while a history fetch is outstanding are held behind a ready
//! gate and replayed right after the snapshot replaces the log. Only the
//! result of the most recent `initialize` opens the gate.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::api::{Endpoints, FeedApi, HttpApi};
use crate::config::Config;
use crate::display::{DisplayConfig, DisplayOverrides};
use crate::error::FeedResult;
use crate::events::{FeedCommand, FeedEvent};
use crate::live::{ConnectionManager, Connector, WsConnector};
use crate::log::BoundedLog;
use crate::types::{LinkState, Message};

/// Inputs produced off the mutation point.
enum Inbox {
    Display(FeedResult<DisplayOverrides>),
    History(u64, FeedResult<Vec<Message>>),
    Pushed(Message),
}

/// Holds pushes back until a history snapshot (or its failure) is applied.
/// Held pushes share the log's capacity; older ones could not survive replay.
enum ReadyGate {
    Waiting(BoundedLog),
    Open,
}

pub struct FeedClient {
    api: Arc<dyn FeedApi>,
    link: ConnectionManager,
    log: BoundedLog,
    display_defaults: DisplayConfig,
    display: DisplayConfig,
    channels: Vec<String>,
    gate: ReadyGate,
    /// Bumped by every `initialize`; older history results are stale.
    history_generation: u64,

    event_tx: broadcast::Sender<FeedEvent>,
    inbox_tx: mpsc::UnboundedSender<Inbox>,
    inbox_rx: mpsc::UnboundedReceiver<Inbox>,
    link_rx: watch::Receiver<LinkState>,
}

impl FeedClient {
    pub fn new(api: Arc<dyn FeedApi>, connector: Arc<dyn Connector>, config: &Config) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let link = ConnectionManager::new(connector, config.reconnect_delay());
        let link_rx = link.watch();
        let display_defaults = config.display_defaults();

        Self {
            api,
            link,
            log: BoundedLog::new(config.max_messages),
            display: display_defaults.clone(),
            display_defaults,
            channels: config.channels.clone(),
            gate: ReadyGate::Open,
            history_generation: 0,
            event_tx,
            inbox_tx,
            inbox_rx,
            link_rx,
        }
    }

    /// HTTP snapshot calls plus a WebSocket push link, all from `config.server_url`.
    pub fn from_config(config: &Config) -> FeedResult<Self> {
        let endpoints = Endpoints::new(&config.server_url)?;
        let api = Arc::new(HttpApi::new(config)?);
        let connector = Arc::new(WsConnector::new(endpoints.ws));
        Ok(Self::new(api, connector, config))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    pub fn messages(&self) -> &BoundedLog {
        &self.log
    }

    pub fn display(&self) -> &DisplayConfig {
        &self.display
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// False while a history fetch started by `initialize` is outstanding.
    pub fn is_ready(&self) -> bool {
        matches!(self.gate, ReadyGate::Open)
    }

    fn broadcast(&self, event: FeedEvent) {
        let _ = self.event_tx.send(event);
    }

    // ── Operations ──

    /// Fire both bootstrap fetches. They run independently; each result is
    /// applied whenever it reaches the mutation point. Pushes are held until
    /// the latest history result lands.
    pub fn initialize(&mut self) {
        if let ReadyGate::Open = self.gate {
            self.gate = ReadyGate::Waiting(BoundedLog::new(self.log.capacity()));
        }
        self.history_generation += 1;
        let generation = self.history_generation;

        let api = Arc::clone(&self.api);
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Inbox::Display(api.fetch_display().await));
        });

        let api = Arc::clone(&self.api);
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Inbox::History(generation, api.fetch_history().await));
        });
    }

    /// Open the push link. No-op while one is pending, open, or reconnecting.
    pub fn connect_live(&mut self) -> bool {
        let tx = self.inbox_tx.clone();
        self.link.connect_live(move |msg| {
            let _ = tx.send(Inbox::Pushed(msg));
        })
    }

    /// Close the push link and cancel any scheduled reconnect.
    pub fn disconnect(&mut self) -> bool {
        self.link.disconnect()
    }

    /// Append one message (through the ready gate) and notify renderers.
    pub fn on_message(&mut self, msg: Message) {
        if !self.wanted(&msg) {
            debug!("Skipping message from #{}", msg.channel);
            return;
        }
        match self.gate {
            ReadyGate::Waiting(ref mut held) => {
                if let Some(dropped) = held.push(msg) {
                    debug!("Held push buffer full, dropping message at {}", dropped.ts);
                }
            }
            ReadyGate::Open => self.append(msg),
        }
    }

    fn wanted(&self, msg: &Message) -> bool {
        !msg.text.is_empty() && msg.in_channels(&self.channels)
    }

    fn append(&mut self, msg: Message) {
        self.log.push(msg.clone());
        self.broadcast(FeedEvent::Appended(msg));
    }

    fn apply_display(&mut self, result: FeedResult<DisplayOverrides>) {
        match result {
            Ok(overrides) => {
                self.display = self.display_defaults.merged(&overrides);
                info!("Display config loaded ({} overrides)", overrides.len());
                self.broadcast(FeedEvent::Display(self.display.clone()));
            }
            Err(e) => warn!("Failed to load display config, keeping defaults: {}", e),
        }
    }

    fn apply_history(&mut self, generation: u64, result: FeedResult<Vec<Message>>) {
        if generation != self.history_generation {
            debug!(
                "Ignoring stale history result (generation {}, current {})",
                generation, self.history_generation
            );
            return;
        }

        match result {
            Ok(snapshot) => {
                let snapshot: Vec<Message> = snapshot.into_iter().filter(|m| self.wanted(m)).collect();
                self.log.replace(snapshot);
                info!("History loaded ({} messages)", self.log.len());
                self.broadcast(FeedEvent::Reset(self.log.to_vec()));
            }
            Err(e) => warn!("Failed to load history, keeping current log: {}", e),
        }

        let held = match std::mem::replace(&mut self.gate, ReadyGate::Open) {
            ReadyGate::Waiting(held) => held.to_vec(),
            ReadyGate::Open => Vec::new(),
        };
        if !held.is_empty() {
            debug!("Replaying {} early pushes", held.len());
        }
        for msg in held {
            self.append(msg);
        }
    }

    /// Re-send the full current state, for renderers that fell behind.
    pub fn resync(&self) {
        self.broadcast(FeedEvent::Reset(self.log.to_vec()));
        self.broadcast(FeedEvent::Display(self.display.clone()));
        self.broadcast(FeedEvent::Link(self.link.state()));
    }

    fn handle(&mut self, input: Inbox) {
        match input {
            Inbox::Display(result) => self.apply_display(result),
            Inbox::History(generation, result) => self.apply_history(generation, result),
            Inbox::Pushed(msg) => self.on_message(msg),
        }
    }

    fn forward_link_state(&mut self) {
        if self.link_rx.has_changed().unwrap_or(false) {
            let state = *self.link_rx.borrow_and_update();
            self.broadcast(FeedEvent::Link(state));
        }
    }

    /// Apply everything that has arrived so far without waiting.
    /// Returns the number of inbox entries handled.
    pub fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(input) = self.inbox_rx.try_recv() {
            self.handle(input);
            handled += 1;
        }
        self.forward_link_state();
        handled
    }

    /// Event loop: bootstrap, connect, then apply inputs and commands until
    /// `Stop` or until every command sender is gone.
    pub async fn run(mut self, mut commands: mpsc::Receiver<FeedCommand>) {
        self.initialize();
        self.connect_live();

        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(FeedCommand::Connect) => {
                        self.connect_live();
                    }
                    Some(FeedCommand::Disconnect) => {
                        self.disconnect();
                    }
                    Some(FeedCommand::Resync) => self.resync(),
                    Some(FeedCommand::Stop) | None => break,
                },
                Some(input) = self.inbox_rx.recv() => self.handle(input),
                Ok(()) = self.link_rx.changed() => {
                    let state = *self.link_rx.borrow_and_update();
                    self.broadcast(FeedEvent::Link(state));
                }
            }
        }

        self.disconnect();
        info!("Feed client stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ColorRole;
    use crate::error::FeedError;
    use crate::live::FrameStream;
    use async_trait::async_trait;
    use futures::channel::mpsc as fmpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    const HISTORY_DELAY: Duration = Duration::from_millis(100);

    fn msg(ts: i64, text: &str) -> Message {
        Message::new(ts, "general", "ann", text)
    }

    fn failure(path: &'static str) -> FeedError {
        FeedError::Status {
            path,
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Answers after fixed delays; `None` means the call fails.
    struct MockApi {
        display: Option<Vec<(&'static str, &'static str)>>,
        history: Option<Vec<Message>>,
        display_delay: Duration,
        history_delay: Duration,
    }

    #[async_trait]
    impl FeedApi for MockApi {
        async fn fetch_display(&self) -> FeedResult<DisplayOverrides> {
            tokio::time::sleep(self.display_delay).await;
            let pairs = self.display.as_ref().ok_or_else(|| failure("/state"))?;
            let mut overrides = DisplayOverrides::default();
            for (key, color) in pairs {
                if let Some(role) = ColorRole::from_key(key) {
                    overrides.insert(role, *color);
                }
            }
            Ok(overrides)
        }

        async fn fetch_history(&self) -> FeedResult<Vec<Message>> {
            tokio::time::sleep(self.history_delay).await;
            self.history.clone().ok_or_else(|| failure("/hist"))
        }
    }

    /// First connect streams whatever the test sends; later connects stall.
    struct ChannelConnector {
        frames: Mutex<Option<fmpsc::UnboundedReceiver<FeedResult<String>>>>,
    }

    #[async_trait]
    impl Connector for ChannelConnector {
        async fn connect(&self) -> FeedResult<FrameStream> {
            let frames = self.frames.lock().unwrap().take();
            match frames {
                Some(rx) => Ok(Box::pin(rx)),
                None => futures::future::pending().await,
            }
        }
    }

    struct Harness {
        client: FeedClient,
        push: fmpsc::UnboundedSender<FeedResult<String>>,
    }

    impl Harness {
        fn send(&self, msg: &Message) {
            let frame = serde_json::to_string(msg).unwrap();
            self.push.unbounded_send(Ok(frame)).unwrap();
        }
    }

    fn harness(api: MockApi, config: Config) -> Harness {
        let (push, rx) = fmpsc::unbounded();
        let connector = Arc::new(ChannelConnector {
            frames: Mutex::new(Some(rx)),
        });
        Harness {
            client: FeedClient::new(Arc::new(api), connector, &config),
            push,
        }
    }

    fn api(history: Option<Vec<Message>>) -> MockApi {
        MockApi {
            display: Some(Vec::new()),
            history,
            display_delay: Duration::from_millis(10),
            history_delay: HISTORY_DELAY,
        }
    }

    fn texts(client: &FeedClient) -> Vec<String> {
        client.messages().iter().map(|m| m.text.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_truncates_large_history() {
        let history: Vec<Message> = (0..1200).map(|n| msg(n, &format!("m{}", n))).collect();
        let mut h = harness(api(Some(history)), Config::default());

        h.client.initialize();
        tokio::time::sleep(HISTORY_DELAY * 2).await;
        h.client.drain();

        let log = h.client.messages();
        assert_eq!(log.len(), 1000);
        assert_eq!(log.get(0).map(|m| m.ts), Some(200));
        assert_eq!(log.iter().last().map(|m| m.ts), Some(1199));
        assert!(h.client.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_merge_over_configured_defaults() {
        let config = Config {
            colors: Some("text:#333".into()),
            ..Config::default()
        };
        let mut mock = api(Some(Vec::new()));
        mock.display = Some(vec![("user", "#f00"), ("datesep", "#111")]);
        let mut h = harness(mock, config);
        let mut events = h.client.subscribe();

        h.client.initialize();
        tokio::time::sleep(HISTORY_DELAY * 2).await;
        h.client.drain();

        let display = h.client.display();
        assert_eq!(display.user, "#f00");
        assert_eq!(display.date_sep, "#111");
        assert_eq!(display.text, "#333");
        assert_eq!(display.date, "#999");

        let first = events.recv().await.unwrap();
        assert!(matches!(first, FeedEvent::Display(ref d) if d.user == "#f00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetches_keep_defaults() {
        let mut mock = api(None);
        mock.display = None;
        let mut h = harness(mock, Config::default());

        h.client.initialize();
        tokio::time::sleep(HISTORY_DELAY * 2).await;
        assert_eq!(h.client.drain(), 2);

        assert_eq!(h.client.display(), &DisplayConfig::default());
        assert!(h.client.messages().is_empty());
        assert!(h.client.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_pushes_replayed_after_snapshot() {
        let mut h = harness(api(Some(vec![msg(1, "old1"), msg(2, "old2")])), Config::default());
        let mut events = h.client.subscribe();

        h.client.initialize();
        h.client.connect_live();
        h.send(&msg(3, "early1"));
        h.send(&msg(4, "early2"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        h.client.drain();
        assert!(h.client.messages().is_empty());
        assert!(!h.client.is_ready());

        tokio::time::sleep(HISTORY_DELAY).await;
        h.client.drain();
        assert_eq!(texts(&h.client), vec!["old1", "old2", "early1", "early2"]);

        h.send(&msg(5, "late"));
        tokio::time::sleep(Duration::from_millis(1)).await;
        h.client.drain();
        assert_eq!(texts(&h.client).last().map(String::as_str), Some("late"));

        // Renderers see the same order: reset, then the replayed appends
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            match event {
                FeedEvent::Reset(messages) => seen.push(format!("reset:{}", messages.len())),
                FeedEvent::Appended(m) => seen.push(m.text),
                _ => {}
            }
        }
        assert_eq!(seen, vec!["reset:2", "early1", "early2", "late"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_pushes_survive_failed_history() {
        let mut h = harness(api(None), Config::default());

        h.client.initialize();
        h.client.connect_live();
        h.send(&msg(3, "early"));
        tokio::time::sleep(HISTORY_DELAY * 2).await;
        h.client.drain();

        assert_eq!(texts(&h.client), vec!["early"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushes_reach_log_without_initialize() {
        let mut h = harness(api(Some(Vec::new())), Config::default());
        assert!(h.client.is_ready());

        h.client.connect_live();
        h.send(&msg(1, "live"));
        tokio::time::sleep(Duration::from_millis(1)).await;
        h.client.drain();
        h.client.on_message(msg(2, "direct"));

        assert_eq!(texts(&h.client), vec!["live", "direct"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_pushes_bounded_by_capacity() {
        let config = Config {
            max_messages: 3,
            ..Config::default()
        };
        let mut mock = api(Some(vec![msg(0, "old")]));
        mock.history_delay = Duration::from_secs(3600);
        let mut h = harness(mock, config);

        h.client.initialize();
        for n in 1..=5000 {
            h.client.on_message(msg(n, &format!("m{}", n)));
        }
        match &h.client.gate {
            ReadyGate::Waiting(held) => assert_eq!(held.len(), 3),
            ReadyGate::Open => panic!("gate opened before history arrived"),
        }

        tokio::time::sleep(Duration::from_secs(3601)).await;
        h.client.drain();
        assert_eq!(texts(&h.client), vec!["m4998", "m4999", "m5000"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinitialize_ignores_stale_history() {
        let mut h = harness(api(Some(vec![msg(1, "old")])), Config::default());

        h.client.initialize();
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.client.initialize();

        // First snapshot lands; the gate stays shut for the second one
        tokio::time::sleep(Duration::from_millis(60)).await;
        h.client.drain();
        assert!(!h.client.is_ready());
        h.client.on_message(msg(2, "pushed"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        h.client.drain();
        assert!(h.client.is_ready());
        assert_eq!(texts(&h.client), vec!["old", "pushed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_rebroadcasts_state() {
        let mut h = harness(api(Some(vec![msg(1, "old")])), Config::default());
        h.client.initialize();
        tokio::time::sleep(HISTORY_DELAY * 2).await;
        h.client.drain();

        let mut events = h.client.subscribe();
        h.client.resync();

        assert!(matches!(events.try_recv(), Ok(FeedEvent::Reset(ref m)) if m.len() == 1));
        assert!(matches!(events.try_recv(), Ok(FeedEvent::Display(_))));
        assert!(matches!(events.try_recv(), Ok(FeedEvent::Link(LinkState::Idle))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_message_respects_capacity() {
        let config = Config {
            max_messages: 3,
            ..Config::default()
        };
        let mut h = harness(api(Some(Vec::new())), config);
        h.client.initialize();
        tokio::time::sleep(HISTORY_DELAY * 2).await;
        h.client.drain();

        for n in 0..5 {
            h.client.on_message(msg(n, &format!("m{}", n)));
            assert!(h.client.messages().len() <= 3);
        }
        assert_eq!(texts(&h.client), vec!["m2", "m3", "m4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_push_leaves_log_untouched() {
        let mut h = harness(api(Some(vec![msg(1, "old")])), Config::default());
        h.client.initialize();
        h.client.connect_live();
        tokio::time::sleep(HISTORY_DELAY * 2).await;
        h.client.drain();

        h.push.unbounded_send(Ok("{broken".to_string())).unwrap();
        h.push.unbounded_send(Ok(String::new())).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        h.client.drain();

        assert_eq!(texts(&h.client), vec!["old"]);
        assert_eq!(h.client.link_state(), LinkState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_filter_and_empty_text() {
        let config = Config {
            channels: vec!["General".into()],
            ..Config::default()
        };
        let history = vec![msg(1, "keep"), Message::new(2, "random", "bob", "drop"), msg(3, "")];
        let mut h = harness(api(Some(history)), config);

        h.client.initialize();
        tokio::time::sleep(HISTORY_DELAY * 2).await;
        h.client.drain();
        h.client.on_message(Message::new(4, "random", "bob", "drop too"));
        h.client.on_message(msg(5, "keep too"));

        assert_eq!(texts(&h.client), vec!["keep", "keep too"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_live_twice_is_noop() {
        let mut h = harness(api(Some(Vec::new())), Config::default());
        assert!(h.client.connect_live());
        assert!(!h.client.connect_live());
        assert!(h.client.disconnect());
        assert_eq!(h.client.link_state(), LinkState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_loop_applies_inputs_and_stops() {
        let h = harness(api(Some(vec![msg(1, "old")])), Config::default());
        let push = h.push.clone();
        let mut events = h.client.subscribe();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let task = tokio::spawn(h.client.run(cmd_rx));

        let frame = serde_json::to_string(&msg(2, "pushed")).unwrap();
        push.unbounded_send(Ok(frame)).unwrap();

        let mut appended = None;
        let mut saw_reset = false;
        let mut saw_live = false;
        while appended.is_none() {
            match events.recv().await.unwrap() {
                FeedEvent::Reset(messages) => {
                    saw_reset = true;
                    assert_eq!(messages.len(), 1);
                }
                FeedEvent::Appended(m) => appended = Some(m),
                FeedEvent::Link(LinkState::Connected) => saw_live = true,
                _ => {}
            }
        }
        assert!(saw_reset);
        assert!(saw_live);
        assert_eq!(appended.map(|m| m.text), Some("pushed".to_string()));

        cmd_tx.send(FeedCommand::Stop).await.unwrap();
        task.await.unwrap();
    }
}
