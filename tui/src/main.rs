use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use dotenvy::dotenv;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;

mod api;
mod app;
mod config;
mod debounce;
mod error;
mod fetcher;
#[cfg(test)]
mod testing;
mod ui;

use crate::api::{HttpImageSource, ImageSource};
use crate::app::{App, handle_key};
use crate::config::{config_dir, load_config};
use crate::fetcher::ImageListFetcher;

const TICK_MS: u64 = 100;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logging()?;

    let config_path = config_dir().join("config.toml");
    let mut config = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    config.apply_env(|name| std::env::var(name).ok());
    info!(base_url = %config.api.base_url, "starting alt-seo");

    let source = HttpImageSource::new(&config.api)?;
    let fetcher = Arc::new(ImageListFetcher::new(source, config.list.page_size));
    let mut app = App::new(
        fetcher,
        Duration::from_millis(config.list.debounce_ms),
        config.list.page_size,
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start();
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }

    Ok(())
}

/// The terminal is owned by the UI, so logs only go to `ALT_SEO_LOG` when set.
fn init_logging() -> Result<()> {
    let Ok(path) = std::env::var("ALT_SEO_LOG") else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {path}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_app<S: ImageSource>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S>,
) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = TICK_MS.saturating_sub(last_tick.elapsed().as_millis() as u64);
        if event::poll(Duration::from_millis(timeout))? {
            if let Event::Key(key) = event::read()? {
                if handle_key(app, key) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= Duration::from_millis(TICK_MS) {
            app.tick();
            last_tick = Instant::now();
        }
    }
}
