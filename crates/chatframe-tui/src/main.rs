//! chatframe-tui — Terminal viewer for a live chat frame.
//! Uses Ratatui + Crossterm for rendering.

mod app;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use chatframe_core::config::Config;
use chatframe_core::events::{FeedCommand, FeedEvent};
use chatframe_core::FeedClient;

use app::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing to a file (not stdout, since we own the terminal)
    let _guard = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(|| -> Box<dyn io::Write> {
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open("chatframe-tui.log")
            {
                Ok(file) => Box::new(file),
                Err(_) => Box::new(io::sink()),
            }
        })
        .try_init();

    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = Config::load_from_dir(&project_root)?;

    let client = FeedClient::from_config(&config).context("Failed to set up feed client")?;
    let mut events = client.subscribe();
    let (command_tx, command_rx) = mpsc::channel(8);
    let feed_task = tokio::spawn(client.run(command_rx));

    info!("Starting TUI against {}", config.server_url);
    let mut app = App::new(&config);

    // Setup terminal
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &mut events, &command_tx).await;

    // Cleanup
    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;

    let _ = command_tx.send(FeedCommand::Stop).await;
    let _ = feed_task.await;

    result
}

async fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut broadcast::Receiver<FeedEvent>,
    commands: &mpsc::Sender<FeedCommand>,
) -> anyhow::Result<()> {
    loop {
        // Draw
        terminal.draw(|frame| ui::draw(frame, app))?;

        // Handle feed events (non-blocking)
        loop {
            match events.try_recv() {
                Ok(event) => app.handle_event(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    // Missed appends would leave the mirror diverged; ask for a fresh reset
                    warn!("TUI lagged {} feed events, resyncing", n);
                    let _ = commands.send(FeedCommand::Resync).await;
                }
                Err(_) => break,
            }
        }

        // Handle terminal events
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match (key.code, key.modifiers) {
                    // Quit
                    (KeyCode::Char('c'), KeyModifiers::CONTROL) => app.should_quit = true,
                    (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => app.should_quit = true,
                    // Link control
                    (KeyCode::Char('r'), _) => {
                        let _ = commands.send(FeedCommand::Connect).await;
                    }
                    (KeyCode::Char('d'), _) => {
                        let _ = commands.send(FeedCommand::Disconnect).await;
                    }
                    // Scroll
                    (KeyCode::Up, _) | (KeyCode::PageUp, _) => app.scroll_up(),
                    (KeyCode::Down, _) | (KeyCode::PageDown, _) => app.scroll_down(),
                    (KeyCode::End, _) => app.scroll_to_bottom(),
                    _ => {}
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
