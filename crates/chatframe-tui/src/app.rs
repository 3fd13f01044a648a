//! App state and feed event handling.

use chatframe_core::config::Config;
use chatframe_core::display::DisplayConfig;
use chatframe_core::events::FeedEvent;
use chatframe_core::log::BoundedLog;
use chatframe_core::types::LinkState;

/// Lines moved per scroll step.
const SCROLL_STEP: usize = 3;

/// The main application state: a mirror of the feed client's log and colours.
pub struct App {
    pub server_url: String,
    pub log: BoundedLog,
    pub display: DisplayConfig,
    pub link: LinkState,
    /// Rendered lines between the bottom of the feed and the bottom of the view
    pub scroll_offset: usize,
    /// Largest useful offset for the last drawn frame
    pub max_scroll: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        App {
            server_url: config.server_url.clone(),
            log: BoundedLog::new(config.max_messages),
            display: config.display_defaults(),
            link: LinkState::Idle,
            scroll_offset: 0,
            max_scroll: 0,
            should_quit: false,
        }
    }

    /// Apply a feed event.
    pub fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Reset(messages) => {
                self.log.replace(messages);
                self.scroll_offset = 0;
            }
            FeedEvent::Appended(msg) => {
                self.log.push(msg);
                // Follow the newest message
                self.scroll_offset = 0;
            }
            FeedEvent::Display(display) => {
                self.display = display;
            }
            FeedEvent::Link(state) => {
                self.link = state;
            }
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(SCROLL_STEP).min(self.max_scroll);
    }

    /// Record how far the feed can scroll, given its rendered line count and
    /// the visible height.
    pub fn set_scroll_limit(&mut self, lines: usize, height: usize) {
        self.max_scroll = lines.saturating_sub(height);
        self.scroll_offset = self.scroll_offset.min(self.max_scroll);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(SCROLL_STEP);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }
}
