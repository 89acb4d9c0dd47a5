mod tui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;
use tracing_subscriber::EnvFilter;

use padseq::audio::{self, BlockRenderer};
use padseq::loader::{self, FileSampleSource};
use padseq::middle::Middle;
use padseq::pipeline::persistence;
use padseq::pipeline::session::Session;
use padseq::shared::InputEvent;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// The terminal belongs to the TUI, so logs go to <project_dir>/.padseq/padseq.log
fn init_logging(project_dir: &Path) -> anyhow::Result<()> {
    let path = persistence::log_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .padseq/ if needed
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run() -> anyhow::Result<()> {
    // padseq [PROJECT_DIR] [CATALOG.json]
    let mut args = std::env::args().skip(1);
    let project_dir: PathBuf = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let catalog_path = args.next().map(PathBuf::from);

    init_logging(&project_dir)?;
    let config = persistence::load_config(&project_dir)?;
    if !persistence::config_exists(&project_dir) {
        // leave an editable copy of the defaults behind
        persistence::save_config(&project_dir, &config)?;
    }

    // relative sample paths resolve next to the catalog, or in the project dir
    let (presets, base_dir) = match &catalog_path {
        Some(path) => {
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (loader::load_catalog(path)?, base)
        }
        None => (vec![loader::directory_preset(&project_dir)?], project_dir.clone()),
    };
    info!(project = %project_dir.display(), presets = presets.len(), "starting");

    let audio = audio::start_audio()?;
    let session = Session::new(audio, config, Some(Box::new(BlockRenderer)));
    let source = Arc::new(FileSampleSource::new(base_dir));
    let mut middle = Middle::new(session, source, presets, project_dir);
    middle.start();

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    crossterm::execute!(std::io::stdout(), terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        middle.poll();

        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        let ds = middle.display_state().clone();
        tui_state.replaying = ds.replaying;

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, blink_on);
        })?;

        // wake up early when a replay hit is due before the next frame
        let timeout = middle
            .next_wakeup_in()
            .map_or(tick_rate, |wait| wait.min(tick_rate));
        let events = tui::input::poll_input(timeout, &mut tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                info!("quit");
                return Ok(());
            }
            middle.handle_input(event);
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(std::io::stdout(), terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
