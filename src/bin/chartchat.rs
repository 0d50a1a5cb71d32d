use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use color_eyre::Result;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CEvent, EventStream,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing::error;

use chartchat::action::Action;
use chartchat::api::BackendClient;
use chartchat::app::App;
use chartchat::config::Config;

/// Terminal client for a dataset charting + AI analysis backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the backend serving /api/chat, /api/plot, /api/columns
    /// and /api/upload
    #[arg(
        long = "backend",
        value_name = "URL",
        default_value = "http://127.0.0.1:8000"
    )]
    backend: String,
    /// Enable file logging at the given level (overrides RUST_LOG)
    #[arg(long = "logging", value_enum)]
    logging: Option<LogLevel>,
    /// Path to a config file (overrides default config discovery)
    #[arg(long = "config", value_name = "PATH")]
    config: Option<PathBuf>,
    /// Upload a dataset file on startup
    #[arg(long = "upload", value_name = "PATH")]
    upload: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn initialize_panic_handler() {
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        #[cfg(not(debug_assertions))]
        {
            use human_panic::{Metadata, handle_dump, print_msg};
            let meta = Metadata::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            let file_path = handle_dump(&meta, panic_info);
            let _ = print_msg(file_path, &meta);
        }
        #[cfg(debug_assertions)]
        {
            better_panic::Settings::auto()
                .most_recent_first(false)
                .lineno_suffix(true)
                .create_panic_handler()(panic_info);
        }
        std::process::exit(1);
    }));
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Log to a file in the current working directory; the TUI owns stdout
    let cwd = std::env::current_dir()?;
    let log_path = cwd.join("chartchat.log");
    let level = match args.logging {
        Some(LogLevel::Error) => Some(tracing::Level::ERROR),
        Some(LogLevel::Warn) => Some(tracing::Level::WARN),
        Some(LogLevel::Info) => Some(tracing::Level::INFO),
        Some(LogLevel::Debug) => Some(tracing::Level::DEBUG),
        Some(LogLevel::Trace) => Some(tracing::Level::TRACE),
        None => Some(tracing::Level::WARN),
    };
    chartchat::logging::init_with(Some(log_path), level)?;
    initialize_panic_handler();

    let config = Config::from_path(args.config.as_ref())?;
    let client = BackendClient::new(args.backend.clone())
        .map_err(|e| color_eyre::eyre::eyre!("failed to build HTTP client: {e}"))?;
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    let mut app = App::new(config, client, action_tx.clone());

    // Startup work: populate the column directory, then any CLI upload
    let _ = action_tx.send(Action::RefreshColumns);
    if let Some(path) = args.upload {
        let _ = action_tx.send(Action::UploadRequested(path));
    }

    let mut terminal = setup_terminal()?;
    let result = run_app(&mut terminal, &mut app, &mut action_rx).await;
    restore_terminal()?;
    if let Err(e) = result {
        error!("Error: {e}");
        return Err(e);
    }
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    action_rx: &mut mpsc::UnboundedReceiver<Action>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(250));

    loop {
        terminal.draw(|frame| app.render(frame))?;

        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(CEvent::Key(key))) => {
                        if let Err(e) = app.handle_key_event(key) {
                            error!("Error handling key event: {e}");
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => error!("Terminal event error: {e}"),
                    None => break,
                }
            }
            Some(action) = action_rx.recv() => {
                if let Err(e) = app.handle_action(action) {
                    error!("Error applying action: {e}");
                }
            }
            _ = tick.tick() => {
                let _ = app.handle_action(Action::Tick);
            }
        }

        if app.should_quit() {
            break;
        }
    }
    Ok(())
}
