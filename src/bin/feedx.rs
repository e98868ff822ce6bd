// Native binary for feedx - Terminal UI mode

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;

use feedx::{
    app::{App, InputMode},
    blocklist::BlockList,
    config::{load, Config},
    feed_api::{self, FeedClient},
    platform,
    prefs::{Preferences, ThresholdField},
    refresh::{self, RefreshSettings},
    store::{KvStore, MemoryStore, SqliteStore},
    types::{AppEvent, DetailKey, RefreshCommand},
    ui,
};

fn init_logging(cfg: &Config) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.log_file)
        .with_context(|| format!("Failed to open log file {}", cfg.log_file))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// One SQLite connection per consumer; both fall back to a shared in-memory
/// store when the database cannot be opened.
fn open_stores(path: &str) -> (Box<dyn KvStore>, Box<dyn KvStore>) {
    match (SqliteStore::open(path), SqliteStore::open(path)) {
        (Ok(a), Ok(b)) => (Box::new(a), Box::new(b)),
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("[store] cannot open {path}, preferences will not persist: {e:#}");
            let mem = MemoryStore::new();
            (Box::new(mem.clone()), Box::new(mem))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();

    let cfg = load().context("Failed to load configuration")?;
    init_logging(&cfg)?;
    cfg.log_summary();

    let (prefs_store, block_store) = open_stores(&cfg.prefs_db_path);
    let prefs = Preferences::load(prefs_store);
    let blocklist = BlockList::load(block_store);

    let client = Arc::new(FeedClient::new(&cfg)?);

    // app + channels
    let (tx, rx) = unbounded_channel::<AppEvent>();
    let (refresh_tx, refresh_rx) = unbounded_channel::<RefreshCommand>();
    let (detail_tx, detail_rx) = unbounded_channel::<DetailKey>();

    let refresh_task: JoinHandle<Result<()>> = {
        let fetcher = client.clone();
        let tx = tx.clone();
        let settings = RefreshSettings::from(&cfg);
        tokio::spawn(async move { refresh::run_refresh(settings, fetcher, refresh_rx, tx).await })
    };
    let detail_task: JoinHandle<Result<()>> = {
        let client = client.clone();
        let tx = tx.clone();
        tokio::spawn(async move { feed_api::run_detail_fetch(client.as_ref(), detail_rx, tx).await })
    };
    let signal_task: JoinHandle<()> = {
        let tx = tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(AppEvent::Quit);
            }
        })
    };

    let mut app = App::new(
        prefs,
        blocklist,
        cfg.render_fps,
        cfg.auto_update,
        Some(refresh_tx),
        Some(detail_tx),
    )
    .with_refresh_interval(cfg.refresh_interval());

    // terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // main loop
    let result = run_loop(&mut app, &mut terminal, rx).await;

    // cleanup
    app.quit();
    if tokio::time::timeout(Duration::from_millis(500), refresh_task).await.is_err() {
        log::warn!("refresh task did not stop in time");
    }
    detail_task.abort();
    signal_task.abort();
    execute!(terminal.backend_mut(), DisableMouseCapture)?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

async fn run_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut rx: UnboundedReceiver<AppEvent>,
) -> Result<()> {
    let mut last_frame = Instant::now();

    loop {
        // frame budget (coalesced renders)
        let frame_ms = 1000u32.saturating_div(app.fps().max(1)) as u64;
        let budget = Duration::from_millis(frame_ms.max(1));
        let wait = budget.saturating_sub(last_frame.elapsed());

        // input or refresh events
        if event::poll(wait)? {
            match event::read()? {
                Event::Key(k) => {
                    if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                        handle_key(app, k);
                    }
                }
                Event::Mouse(m) => handle_mouse(app, m),
                Event::FocusLost => app.set_hover(false),
                _ => {}
            }
        }
        while let Ok(ev) = rx.try_recv() {
            app.on_event(ev);
        }

        if last_frame.elapsed() >= budget {
            terminal.draw(|f| ui::draw(f, app))?;
            last_frame = Instant::now();
        }
        if app.quit_flag() {
            break;
        }
    }
    Ok(())
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => app.on_mouse_move(mouse.column, mouse.row),
        MouseEventKind::Down(MouseButton::Left) => {
            app.on_mouse_move(mouse.column, mouse.row);
            app.on_mouse_click(mouse.column, mouse.row);
        }
        MouseEventKind::ScrollUp => app.scroll_details(-3),
        MouseEventKind::ScrollDown => app.scroll_details(3),
        _ => {}
    }
}

fn handle_key(app: &mut App, k: KeyEvent) {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (k.code, k.modifiers) {
        app.quit();
        return;
    }

    // Threshold editing
    if let InputMode::EditThreshold(_) = app.input_mode() {
        match k.code {
            KeyCode::Char(c) => app.edit_add_char(c),
            KeyCode::Backspace => app.edit_backspace(),
            KeyCode::Tab => app.edit_next_field(),
            KeyCode::Enter => app.commit_edit(),
            KeyCode::Esc => app.cancel_edit(),
            _ => {}
        }
        return;
    }

    // Block-list overlay
    if app.input_mode() == InputMode::BlockList {
        match k.code {
            KeyCode::Up | KeyCode::Char('k') => app.up(),
            KeyCode::Down | KeyCode::Char('j') => app.down(),
            KeyCode::Char('u') | KeyCode::Delete => app.unblock_selected(),
            KeyCode::Char('C') => app.clear_blocklist(),
            KeyCode::Esc | KeyCode::Char('B') | KeyCode::Char('q') => app.close_blocklist(),
            _ => {}
        }
        return;
    }

    // Normal mode keys
    match k.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Up | KeyCode::Char('k') => app.up(),
        KeyCode::Down | KeyCode::Char('j') => app.down(),
        KeyCode::Home => app.home(),
        KeyCode::End => app.end(),
        KeyCode::PageUp => app.scroll_details(-10),
        KeyCode::PageDown => app.scroll_details(10),
        KeyCode::Char('a') => app.toggle_auto_update(),
        KeyCode::Char('r') => app.refresh_now(),
        KeyCode::Char(' ') => app.toggle_hold(),
        KeyCode::Char('t') => app.start_edit(ThresholdField::Followers),
        KeyCode::Char('o') => app.toggle_combinator(),
        KeyCode::Char('m') => app.toggle_show_only_matching(),
        KeyCode::Char('b') => app.block_selected(),
        KeyCode::Char('B') => app.open_blocklist(),
        KeyCode::Char('i') => app.request_user_details(),
        KeyCode::Char('d') => app.request_token_details(),
        KeyCode::Char('R') => app.reset_rules(),
        KeyCode::Char('c') => match app.copy_content() {
            Some(ca) if platform::copy_to_clipboard(&ca) => app.show_toast("Copied contract address".to_string()),
            Some(_) => app.show_toast("Copy failed".to_string()),
            None => app.show_toast("No contract address on this post".to_string()),
        },
        _ => {}
    }
}
