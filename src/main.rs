mod app;
mod config;
mod constants;
mod engine;
mod input;
mod pipeline;
mod reference;
mod search;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;

use app::App;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Search service URL (overrides the configured endpoint)
  #[arg(short, long)]
  endpoint: Option<String>,
}

// --- Logging ---

/// Log to a rolling file in the platform data directory. Writing to the
/// terminal would fight with the TUI, so there is no console layer.
fn init_logging() -> Option<WorkerGuard> {
  let proj_dirs = ProjectDirs::from("", "", "cpsearch")?;
  let log_dir = proj_dirs.data_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;

  let file_appender = tracing_appender::rolling::daily(log_dir, "cpsearch.log");
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  let env_filter =
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "cpsearch=info".into());

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(non_blocking)
    .with_ansi(false)
    .init();

  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_logging();

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, args).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args) -> Result<()> {
  let mut app = App::new(args.endpoint);

  loop {
    app.check_pending();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key);
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  Ok(())
}
