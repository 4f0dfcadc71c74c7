//! Postboard - a terminal client for the postboard API.
//!
//! Sign in or register, publish and delete posts, and view the signed-in
//! profile. The session survives restarts through the configured storage
//! backend.
//!
//! Usage: `postboard [path]` where `path` is an optional starting route
//! such as `/profile`.

mod app;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use postboard_core::config::Config;
use postboard_core::Route;

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_NAME: &str = "postboard.log";

/// Initialize the tracing subscriber. The terminal is owned by the UI, so
/// logs go to a file in the data directory.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=postboard_core=debug).
fn init_tracing(data_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(data_dir)?;
    let appender = tracing_appender::rolling::never(data_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let (mut config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    let data_dir = config.data_dir().unwrap_or_else(|_| PathBuf::from("./data"));

    let _log_guard = init_tracing(&data_dir)?;
    info!("Postboard starting");

    // Reported only now that the subscriber is installed
    if let Some(e) = load_error {
        warn!(error = %e, "Could not load config, using defaults");
    }
    for ignored in config.apply_env_overrides(|key| std::env::var(key).ok()) {
        warn!("{}", ignored);
    }

    let start = match std::env::args().nth(1) {
        Some(path) => match Route::from_path(&path) {
            Some(route) => Some(route),
            None => {
                warn!(path = %path, "Unknown start route");
                None
            }
        },
        None => None,
    };

    let mut app = App::new(config, data_dir)?;
    if let Some(route) = start {
        app.navigate(route);
    }
    app.restore_session();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Postboard shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Apply session changes before drawing
        app.tick();
        app.check_background_tasks();

        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        // Check if we should quit
        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
