mod display;

use std::fs::File;
use std::io::{stdout, BufWriter, Write};
use std::path::Path;
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal, ExecutableCommand,
};
use rand::rngs::ThreadRng;
use rand::thread_rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use display::menus;
use display::{Effects, Viewport, PAUSE_ITEMS};
use letter_rain::config::{
    load_settings, save_settings, Paths, SessionConfig, Settings, DEFAULT_FIELD,
    FAULT_LIMIT_CHOICES, TIME_LIMIT_CHOICES_MINUTES,
};
use letter_rain::entities::{EndReason, GameMode, SessionExit, SessionStatus};
use letter_rain::session::GameSession;
use letter_rain::snapshot::SaveRecord;
use letter_rain::storage::{normalize_initials, HighScoreTable, SaveStore, MAX_NAME_LEN};

// ── Input ─────────────────────────────────────────────────────────────────────

/// Key presses only; repeats and releases are dropped.
fn next_key(rx: &mpsc::Receiver<Event>) -> Option<KeyEvent> {
    loop {
        match rx.recv() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => return Some(key),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

enum Pick {
    Chosen(usize),
    Back,
    Interrupted,
}

/// Arrow/number navigation over a list drawn by `draw`.
fn pick_from<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    len: usize,
    mut selected: usize,
    mut draw: impl FnMut(&mut W, Viewport, usize) -> std::io::Result<()>,
) -> Result<Pick> {
    loop {
        draw(out, Viewport::current()?, selected)?;
        let Some(key) = next_key(rx) else {
            return Ok(Pick::Interrupted);
        };
        if is_interrupt(&key) {
            return Ok(Pick::Interrupted);
        }
        match key.code {
            KeyCode::Up if len > 0 => selected = (selected + len - 1) % len,
            KeyCode::Down if len > 0 => selected = (selected + 1) % len,
            KeyCode::Enter if len > 0 => return Ok(Pick::Chosen(selected)),
            KeyCode::Esc => return Ok(Pick::Back),
            KeyCode::Char(c) => {
                if let Some(n) = c.to_digit(10) {
                    let n = n as usize;
                    if n >= 1 && n <= len {
                        return Ok(Pick::Chosen(n - 1));
                    }
                }
            }
            _ => {}
        }
    }
}

// ── Menus ─────────────────────────────────────────────────────────────────────

enum MenuResult {
    Start(SessionConfig),
    Resume(SaveRecord),
    Quit,
}

fn main_menu<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    settings: &mut Settings,
    store: &SaveStore,
    paths: &Paths,
) -> Result<MenuResult> {
    let mut selected = 0;
    loop {
        let items = vec![
            "Arcane   (1 player)".to_string(),
            "Versus   (2 players)".to_string(),
            "Load game".to_string(),
            "High scores".to_string(),
            format!("Letter colour: {:?}", settings.letter_color),
            "Quit".to_string(),
        ];
        let pick = pick_from(out, rx, items.len(), selected, |out, view, sel| {
            menus::draw_list(out, view, "★  L E T T E R   R A I N  ★", None, &items, sel)
        })?;
        let choice = match pick {
            Pick::Chosen(i) => i,
            Pick::Back | Pick::Interrupted => return Ok(MenuResult::Quit),
        };
        selected = choice;
        match choice {
            0 => {
                if let Some(limit) = choose_fault_limit(out, rx, settings)? {
                    return Ok(MenuResult::Start(SessionConfig::arcane(limit)));
                }
            }
            1 => {
                if let Some(minutes) = choose_time_limit(out, rx, settings)? {
                    return Ok(MenuResult::Start(SessionConfig::versus(minutes)));
                }
            }
            2 => {
                if let Some(record) = save_browser(out, rx, store)? {
                    return Ok(MenuResult::Resume(record));
                }
            }
            3 => high_scores_screen(out, rx, &paths.high_scores)?,
            4 => settings.letter_color = settings.letter_color.next(),
            _ => return Ok(MenuResult::Quit),
        }
    }
}

fn choose_fault_limit<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    settings: &mut Settings,
) -> Result<Option<i64>> {
    let items: Vec<String> = FAULT_LIMIT_CHOICES
        .iter()
        .map(|n| format!("{} faults", n))
        .collect();
    let start = FAULT_LIMIT_CHOICES
        .iter()
        .position(|n| *n == settings.fault_limit)
        .unwrap_or(1);
    let pick = pick_from(out, rx, items.len(), start, |out, view, sel| {
        menus::draw_list(out, view, "ARCANE", Some("How many faults are allowed?"), &items, sel)
    })?;
    Ok(match pick {
        Pick::Chosen(i) => {
            settings.fault_limit = FAULT_LIMIT_CHOICES[i];
            Some(settings.fault_limit)
        }
        _ => None,
    })
}

fn choose_time_limit<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    settings: &mut Settings,
) -> Result<Option<i64>> {
    let items: Vec<String> = TIME_LIMIT_CHOICES_MINUTES
        .iter()
        .map(|m| format!("{} minute{}", m, if *m == 1 { "" } else { "s" }))
        .collect();
    let start = TIME_LIMIT_CHOICES_MINUTES
        .iter()
        .position(|m| *m == settings.time_limit_minutes)
        .unwrap_or(1);
    let pick = pick_from(out, rx, items.len(), start, |out, view, sel| {
        menus::draw_list(out, view, "VERSUS", Some("Match length"), &items, sel)
    })?;
    Ok(match pick {
        Pick::Chosen(i) => {
            settings.time_limit_minutes = TIME_LIMIT_CHOICES_MINUTES[i];
            Some(settings.time_limit_minutes)
        }
        _ => None,
    })
}

fn save_browser<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    store: &SaveStore,
) -> Result<Option<SaveRecord>> {
    let mut records = store.load();
    let mut selected = 0;
    loop {
        selected = selected.min(records.len().saturating_sub(1));
        menus::draw_saves(out, Viewport::current()?, &records, selected)?;
        let Some(key) = next_key(rx) else {
            return Ok(None);
        };
        match key.code {
            KeyCode::Up if !records.is_empty() => {
                selected = (selected + records.len() - 1) % records.len()
            }
            KeyCode::Down if !records.is_empty() => selected = (selected + 1) % records.len(),
            KeyCode::Enter if !records.is_empty() => return Ok(Some(records.remove(selected))),
            KeyCode::Char('d') | KeyCode::Char('D') if !records.is_empty() => {
                let ts = records[selected].timestamp;
                if let Err(e) = store.delete(ts) {
                    warn!("could not delete save {}: {}", ts, e);
                }
                records = store.load();
            }
            KeyCode::Esc => return Ok(None),
            _ if is_interrupt(&key) => return Ok(None),
            _ => {}
        }
    }
}

fn high_scores_screen<W: Write>(out: &mut W, rx: &mpsc::Receiver<Event>, path: &Path) -> Result<()> {
    let mut table = HighScoreTable::load(path);
    loop {
        menus::draw_high_scores(out, Viewport::current()?, table.entries())?;
        let Some(key) = next_key(rx) else {
            return Ok(());
        };
        match key.code {
            KeyCode::Char('x') | KeyCode::Char('X') => {
                table.clear();
                if let Err(e) = table.save(path) {
                    warn!("could not reset high scores: {}", e);
                }
            }
            KeyCode::Esc | KeyCode::Enter => return Ok(()),
            _ if is_interrupt(&key) => return Ok(()),
            _ => {}
        }
    }
}

/// Returns the entered initials, or `None` when skipped.
fn enter_initials<W: Write>(out: &mut W, rx: &mpsc::Receiver<Event>, score: u32) -> Result<Option<String>> {
    let mut typed = String::new();
    loop {
        menus::draw_initials(out, Viewport::current()?, score, &typed)?;
        let Some(key) = next_key(rx) else {
            return Ok(None);
        };
        match key.code {
            KeyCode::Char(c) if c.is_ascii_alphabetic() && typed.len() < MAX_NAME_LEN => {
                typed.push(c.to_ascii_uppercase())
            }
            KeyCode::Backspace => {
                typed.pop();
            }
            KeyCode::Enter => {
                if let Some(name) = normalize_initials(&typed) {
                    return Ok(Some(name));
                }
            }
            KeyCode::Esc => return Ok(None),
            _ => {}
        }
    }
}

// ── Game loop ─────────────────────────────────────────────────────────────────

enum LoopResult {
    /// The session reached `Ended`; the reason is on the session.
    Finished,
    /// Ctrl-C or the input thread went away.
    Interrupted,
}

fn game_loop<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    session: &mut GameSession,
    store: &mut SaveStore,
    settings: &Settings,
    rng: &mut ThreadRng,
) -> Result<LoopResult> {
    let frame = Duration::from_millis(1000 / u64::from(settings.fps_cap.clamp(10, 120)));
    let mut effects = Effects::default();
    let mut pause_selection = 0usize;
    let mut last = Instant::now();

    loop {
        let frame_start = Instant::now();

        // ── Drain all pending input events (non-blocking) ─────────────────────
        loop {
            let key = match rx.try_recv() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                Ok(_) => continue,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return Ok(LoopResult::Interrupted),
            };
            if is_interrupt(&key) {
                session.quit_without_saving();
                return Ok(LoopResult::Interrupted);
            }
            match session.status() {
                SessionStatus::Running => match key.code {
                    KeyCode::Esc => {
                        session.pause();
                        pause_selection = 0;
                    }
                    KeyCode::Char(c) => session.on_key_typed(c, rng),
                    _ => {}
                },
                SessionStatus::Paused { .. } => {
                    let chosen = match key.code {
                        KeyCode::Up => {
                            pause_selection = (pause_selection + PAUSE_ITEMS.len() - 1) % PAUSE_ITEMS.len();
                            None
                        }
                        KeyCode::Down => {
                            pause_selection = (pause_selection + 1) % PAUSE_ITEMS.len();
                            None
                        }
                        KeyCode::Enter => Some(pause_selection),
                        KeyCode::Esc => Some(0),
                        KeyCode::Char(c) => c
                            .to_digit(10)
                            .map(|n| n as usize)
                            .filter(|n| (1..=PAUSE_ITEMS.len()).contains(n))
                            .map(|n| n - 1),
                        _ => None,
                    };
                    match chosen {
                        Some(0) => {
                            session.resume();
                        }
                        Some(1) => {
                            if session.save_and_quit(store).is_none() {
                                warn!("game was not saved");
                            }
                        }
                        Some(_) => session.quit_without_saving(),
                        None => {}
                    }
                }
                SessionStatus::Ended(_) => {}
            }
        }

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f64();
        last = now;
        session.update(dt, rng);

        effects.tick();
        effects.absorb(&session.drain_events());

        if session.is_over() {
            return Ok(LoopResult::Finished);
        }

        display::render(
            out,
            Viewport::current()?,
            session,
            settings.letter_color,
            &effects,
            pause_selection,
        )?;

        let elapsed = frame_start.elapsed();
        if elapsed < frame {
            thread::sleep(frame - elapsed);
        }
    }
}

/// Game-over screen. Offers the high-score entry first when it qualifies.
fn after_game<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    session: &GameSession,
    settings: &Settings,
    paths: &Paths,
) -> Result<Option<SessionExit>> {
    let summary = session.summary();
    if let Some(score) = summary.high_score_candidate() {
        let mut table = HighScoreTable::load(&paths.high_scores);
        if table.qualifies(score) {
            if let Some(name) = enter_initials(out, rx, score)? {
                table.insert(&name, score);
                match table.save(&paths.high_scores) {
                    Ok(()) => info!("high score {} for {}", score, name),
                    Err(e) => warn!("could not save high score: {}", e),
                }
            }
        }
    }

    let effects = Effects::default();
    loop {
        display::render(out, Viewport::current()?, session, settings.letter_color, &effects, 0)?;
        let Some(key) = next_key(rx) else {
            return Ok(None);
        };
        match key.code {
            KeyCode::Char('r') | KeyCode::Char('R') => return Ok(Some(SessionExit::Restart)),
            KeyCode::Char('m') | KeyCode::Char('M') | KeyCode::Esc | KeyCode::Enter => {
                return Ok(Some(SessionExit::MainMenu))
            }
            _ if is_interrupt(&key) => return Ok(None),
            _ => {}
        }
    }
}

/// Plays until the player goes back to the menu. Returns `false` when the
/// program should exit.
fn play<W: Write>(
    out: &mut W,
    rx: &mpsc::Receiver<Event>,
    mut session: GameSession,
    store: &mut SaveStore,
    settings: &Settings,
    paths: &Paths,
    rng: &mut ThreadRng,
) -> Result<bool> {
    loop {
        if let LoopResult::Interrupted = game_loop(out, rx, &mut session, store, settings, rng)? {
            return Ok(false);
        }
        if session.status() == SessionStatus::Ended(EndReason::UserQuit) {
            return Ok(true);
        }
        match after_game(out, rx, &session, settings, paths)? {
            Some(SessionExit::Restart) => {
                info!("result: {}", SessionExit::Restart.tag());
                let config = session.config().clone();
                session = GameSession::new(config, rng).context("restarting session")?;
            }
            Some(SessionExit::MainMenu) => {
                info!("result: {}", SessionExit::MainMenu.tag());
                return Ok(true);
            }
            None => return Ok(false),
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_logging(path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match File::create(path) {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::sink)
            .init(),
    }
}

fn restore_terminal() {
    let mut out = stdout();
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

fn main() -> Result<()> {
    let paths = Paths::resolve().unwrap_or_else(|_| Paths::in_dir(Path::new(".")));
    init_logging(&paths.log);
    info!("data directory: {}", paths.saves.display());

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    let mut out = BufWriter::new(stdout());
    terminal::enable_raw_mode().context("enabling raw mode")?;
    out.execute(terminal::EnterAlternateScreen)?;
    out.execute(cursor::Hide)?;

    // Dedicate a thread exclusively to blocking event reads, sending them
    // through a channel so the game loop never has to block on I/O.
    let (tx, rx) = mpsc::channel::<Event>();
    thread::spawn(move || {
        while let Ok(ev) = event::read() {
            if tx.send(ev).is_err() {
                break;
            }
        }
    });

    let result = run(&mut out, &rx, &paths);

    restore_terminal();
    result
}

fn run<W: Write>(out: &mut W, rx: &mpsc::Receiver<Event>, paths: &Paths) -> Result<()> {
    let mut settings = load_settings(&paths.settings);
    let mut store = SaveStore::new(&paths.saves);
    let mut rng = thread_rng();

    loop {
        let choice = main_menu(out, rx, &mut settings, &store, paths)?;
        if let Err(e) = save_settings(&paths.settings, &settings) {
            warn!("could not save settings: {}", e);
        }
        let session = match choice {
            MenuResult::Quit => break,
            MenuResult::Start(config) => {
                GameSession::new(config.with_field(DEFAULT_FIELD), &mut rng).context("starting session")?
            }
            MenuResult::Resume(record) => {
                let config = SessionConfig::from_saved(record.mode, &record.state, DEFAULT_FIELD);
                match GameSession::resume_from(config, record.state, Some(record.timestamp), &mut rng) {
                    Ok(session) => session,
                    Err(e) => {
                        warn!("could not resume save {}: {}", record.timestamp, e);
                        continue;
                    }
                }
            }
        };
        if session.mode() == GameMode::Versus {
            info!("versus match, {}s", session.config().time_limit_seconds);
        }
        if !play(out, rx, session, &mut store, &settings, paths, &mut rng)? {
            break;
        }
    }
    Ok(())
}
