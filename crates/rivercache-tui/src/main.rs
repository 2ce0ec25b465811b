//! rivercache - a terminal dashboard for river conditions.
//!
//! Shows USGS gauge readings, weather, alerts and fishing reports for the
//! Upper Delaware basin, refreshing each in the background and keeping the
//! last known data on screen when the API is unreachable.

mod app;
mod ui;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rivercache_core::{ApiClient, Config, Dashboard, SnapshotStore};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_PREFIX: &str = "rivercache.log";

const USAGE: &str = "\
Usage: rivercache [OPTIONS]

Options:
  --dump             Fetch every resource once and print it as JSON
  --api-url <URL>    Override the API base URL
  -h, --help         Show this help";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    dump: bool,
    api_url: Option<String>,
    help: bool,
}

impl CliArgs {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut parsed = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--dump" => parsed.dump = true,
                "--api-url" => {
                    let url = args.next().context("--api-url requires a value")?;
                    parsed.api_url = Some(url);
                }
                "-h" | "--help" => parsed.help = true,
                other => match other.strip_prefix("--api-url=") {
                    Some(url) => parsed.api_url = Some(url.to_string()),
                    None => bail!("Unknown argument: {}\n\n{}", other, USAGE),
                },
            }
        }
        Ok(parsed)
    }
}

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr; used when the terminal is not taken over.
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Log to a daily-rolled file, since the TUI owns the terminal.
/// The returned guard must live until exit so buffered lines are flushed.
fn init_file_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse(std::env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load().context("Failed to load config")?;
    config.apply_api_url(args.api_url);

    if args.dump {
        init_stderr_tracing();
        return dump(&config).await;
    }

    let cache_dir = config.cache_dir()?;
    let _log_guard = init_file_tracing(&cache_dir.join("logs"))?;
    info!(api = %config.api_base_url, "rivercache starting");

    let snapshots = match SnapshotStore::new(cache_dir.join("snapshots")) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "Snapshots disabled");
            None
        }
    };
    let client = ApiClient::new(&config.api_base_url, config.request_timeout())?;
    let mut dashboard = Dashboard::new(Arc::new(client), &config, snapshots);
    dashboard.mount();
    let mut app = App::new(config, dashboard);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("rivercache shutting down");
    Ok(())
}

/// Fetch every resource once through the cache and print all entries.
async fn dump(config: &Config) -> Result<()> {
    eprintln!("Fetching from {}...", config.api_base_url);

    let client = ApiClient::new(&config.api_base_url, config.request_timeout())?;
    let mut dashboard = Dashboard::new(Arc::new(client), config, None);
    dashboard.mount();
    dashboard.settle().await;

    let json = serde_json::to_string_pretty(&dashboard.to_json())?;
    println!("{}", json);

    eprintln!(
        "Done! {} stations visible under {}.",
        dashboard.visible_stations().len(),
        dashboard.filter().label()
    );
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Apply cache updates that arrived since the last frame
        app.tick();

        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout so background updates get drawn
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key) {
                    return Ok(());
                }
            }
        }

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
