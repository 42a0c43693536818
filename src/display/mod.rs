/// Rendering layer. All terminal output lives here.
///
/// Each function receives a mutable writer and an immutable view of the
/// session. No game logic is performed; this module only translates state
/// into terminal commands. The simulation runs in virtual field units, which
/// `Viewport` scales onto whatever terminal size is current.

pub mod menus;

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal, QueueableCommand,
};
use letter_rain::config::LetterColor;
use letter_rain::entities::{
    EndReason, FallingLetter, GameMode, PlayField, PlayerId, PowerUpKind, SessionEvent,
    SessionStatus, SpawnStyle,
};
use letter_rain::session::GameSession;

// ── Colour palette ────────────────────────────────────────────────────────────

const C_BORDER: Color = Color::DarkBlue;
const C_HUD: Color = Color::Yellow;
const C_FAULTS: Color = Color::Red;
const C_CARRIER: Color = Color::DarkGrey;
const C_DIVIDER: Color = Color::DarkGrey;
const C_J1: Color = Color::Green;
const C_J2: Color = Color::Yellow;
const C_BANNER: Color = Color::Magenta;
const C_HINT: Color = Color::DarkGrey;

pub fn letter_color(c: LetterColor) -> Color {
    match c {
        LetterColor::White => Color::White,
        LetterColor::Cyan => Color::Cyan,
        LetterColor::Green => Color::Green,
        LetterColor::Yellow => Color::Yellow,
        LetterColor::Magenta => Color::Magenta,
    }
}

fn player_color(player: PlayerId) -> Color {
    match player {
        PlayerId::J1 => C_J1,
        PlayerId::J2 => C_J2,
    }
}

fn power_up_color(kind: PowerUpKind) -> Color {
    match kind {
        PowerUpKind::Slow => Color::Cyan,
        PowerUpKind::Shield => Color::Blue,
        PowerUpKind::DoubleScore => Color::Yellow,
    }
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Terminal size for the current frame. Row 0 is the HUD, rows 1 and h-2 the
/// border, row h-1 the hint line.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn current() -> std::io::Result<Viewport> {
        let (width, height) = terminal::size()?;
        Ok(Viewport { width, height })
    }

    fn centre(&self) -> (u16, u16) {
        (self.width / 2, self.height / 2)
    }

    /// Maps a field position onto an interior cell, or `None` when it falls
    /// outside the border.
    fn cell(&self, field: &PlayField, x: f64, y: f64) -> Option<(u16, u16)> {
        let cols = self.width.saturating_sub(3) as f64;
        let rows = self.height.saturating_sub(5) as f64;
        if x < 0.0 || y < 0.0 || x > field.width || y > field.height {
            return None;
        }
        let col = 1 + (x / field.width * cols).round() as u16;
        let row = 2 + (y / field.height * rows).round() as u16;
        (col < self.width.saturating_sub(1) && row < self.height.saturating_sub(2))
            .then_some((col, row))
    }
}

// ── Hit popups ────────────────────────────────────────────────────────────────

struct Popup {
    x: f64,
    y: f64,
    text: String,
    color: Color,
    frames_left: u32,
}

/// Short-lived "+1"/"+2" markers and the border flash on a miss, fed from
/// session events.
#[derive(Default)]
pub struct Effects {
    popups: Vec<Popup>,
    flash_frames: u32,
}

const POPUP_FRAMES: u32 = 15;

impl Effects {
    pub fn absorb(&mut self, events: &[SessionEvent]) {
        for event in events {
            match event {
                SessionEvent::Hit { player, points, x, y, .. } => self.popups.push(Popup {
                    x: *x,
                    y: *y,
                    text: format!("+{}", points),
                    color: player_color(*player),
                    frames_left: POPUP_FRAMES,
                }),
                SessionEvent::Miss { shielded: false, .. } => self.flash_frames = 4,
                _ => {}
            }
        }
    }

    pub fn tick(&mut self) {
        self.flash_frames = self.flash_frames.saturating_sub(1);
        for p in self.popups.iter_mut() {
            p.frames_left = p.frames_left.saturating_sub(1);
        }
        self.popups.retain(|p| p.frames_left > 0);
    }
}

// ── Public entry point ────────────────────────────────────────────────────────

/// Render one complete frame. `pause_selection` is the highlighted pause-menu
/// entry while paused.
pub fn render<W: Write>(
    out: &mut W,
    view: Viewport,
    session: &GameSession,
    colour: LetterColor,
    effects: &Effects,
    pause_selection: usize,
) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;

    draw_border(out, view, effects.flash_frames > 0)?;
    draw_hud(out, view, session)?;

    match session.mode() {
        GameMode::SinglePlayer => {
            for letter in session.letters() {
                draw_letter(out, view, session.field(), letter, letter_color(colour))?;
            }
        }
        GameMode::Versus => {
            draw_divider(out, view, session.current_turn())?;
            if let Some(active) = session.active_letter() {
                draw_letter(out, view, session.field(), &active.letter, player_color(active.owner))?;
            }
        }
    }

    for popup in &effects.popups {
        if let Some((col, row)) = view.cell(session.field(), popup.x, popup.y) {
            out.queue(cursor::MoveTo(col, row))?;
            out.queue(style::SetForegroundColor(popup.color))?;
            out.queue(Print(&popup.text))?;
        }
    }

    if let Some(level) = session.banner() {
        draw_banner(out, view, level)?;
    }
    draw_controls_hint(out, view)?;

    match session.status() {
        SessionStatus::Paused { .. } => draw_pause(out, view, pause_selection)?,
        SessionStatus::Ended(reason) => draw_game_over(out, view, session, reason)?,
        SessionStatus::Running => {}
    }

    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(0, view.height.saturating_sub(1)))?;
    out.flush()?;
    Ok(())
}

// ── Border ────────────────────────────────────────────────────────────────────

fn draw_border<W: Write>(out: &mut W, view: Viewport, flash: bool) -> std::io::Result<()> {
    let w = view.width as usize;
    let h = view.height;

    out.queue(style::SetForegroundColor(if flash { C_FAULTS } else { C_BORDER }))?;

    out.queue(cursor::MoveTo(0, 1))?;
    out.queue(Print(format!("┌{}┐", "─".repeat(w.saturating_sub(2)))))?;

    out.queue(cursor::MoveTo(0, h.saturating_sub(2)))?;
    out.queue(Print(format!("└{}┘", "─".repeat(w.saturating_sub(2)))))?;

    for row in 2..h.saturating_sub(2) {
        out.queue(cursor::MoveTo(0, row))?;
        out.queue(Print("│"))?;
        out.queue(cursor::MoveTo(view.width.saturating_sub(1), row))?;
        out.queue(Print("│"))?;
    }

    Ok(())
}

// ── HUD (row 0) ───────────────────────────────────────────────────────────────

fn clock_text(seconds: f64) -> String {
    let s = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", s / 60, s % 60)
}

fn draw_hud<W: Write>(out: &mut W, view: Viewport, session: &GameSession) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, 0))?;
    match session.mode() {
        GameMode::SinglePlayer => {
            let t = session.tracker(PlayerId::J1);
            out.queue(style::SetForegroundColor(C_HUD))?;
            out.queue(Print(format!(
                "Score {:>4}  Streak {:>3}  Lv {}  Spd {:.1}  {}  ",
                t.score(),
                t.streak(),
                session.level().level(),
                session.fall_speed(),
                clock_text(session.elapsed())
            )))?;
            out.queue(style::SetForegroundColor(C_FAULTS))?;
            out.queue(Print(format!(
                "Faults {}/{}",
                t.misses(),
                session.config().fault_limit
            )))?;
        }
        GameMode::Versus => {
            for player in [PlayerId::J1, PlayerId::J2] {
                let t = session.tracker(player);
                out.queue(style::SetForegroundColor(player_color(player)))?;
                out.queue(Print(format!(
                    "{} {:>4} ({} miss)  ",
                    player.label(),
                    t.score(),
                    t.misses()
                )))?;
            }
            let left = session.time_remaining().unwrap_or(0.0);
            out.queue(style::SetForegroundColor(C_HUD))?;
            out.queue(Print(format!("Time {}", clock_text(left))))?;
        }
    }

    // Power-ups, right-aligned.
    let now = session.elapsed();
    let active: Vec<(PowerUpKind, String)> = session
        .power_ups()
        .active()
        .map(|(kind, _)| {
            let secs = session.power_ups().remaining_secs(kind, now).ceil() as u32;
            (kind, format!(" {} {}s", kind.label(), secs))
        })
        .collect();
    let total: usize = active.iter().map(|(_, s)| s.chars().count()).sum();
    let mut col = view.width.saturating_sub(total as u16 + 1);
    for (kind, text) in &active {
        out.queue(cursor::MoveTo(col, 0))?;
        out.queue(style::SetForegroundColor(power_up_color(*kind)))?;
        out.queue(Print(text))?;
        col += text.chars().count() as u16;
    }
    Ok(())
}

// ── Play field ────────────────────────────────────────────────────────────────

fn draw_letter<W: Write>(
    out: &mut W,
    view: Viewport,
    field: &PlayField,
    letter: &FallingLetter,
    color: Color,
) -> std::io::Result<()> {
    // Carrier: rotor above a dropped letter, a little truck beside a towed one.
    let (ax, ay) = letter.carrier_anchor();
    let carrier = match letter.spawn_style {
        SpawnStyle::FromTop => "-+-",
        SpawnStyle::FromLeft => "o=>",
        SpawnStyle::FromRight => "<=o",
    };
    if let Some((col, row)) = view.cell(field, ax.clamp(0.0, field.width), ay.max(0.0)) {
        out.queue(cursor::MoveTo(col.saturating_sub(1).max(1), row))?;
        out.queue(style::SetForegroundColor(C_CARRIER))?;
        out.queue(Print(carrier))?;
    }
    if let Some((col, row)) = view.cell(field, letter.x, letter.y) {
        out.queue(cursor::MoveTo(col, row))?;
        out.queue(style::SetForegroundColor(color))?;
        out.queue(style::SetAttribute(style::Attribute::Bold))?;
        out.queue(Print(letter.character))?;
        out.queue(style::SetAttribute(style::Attribute::Reset))?;
    }
    Ok(())
}

fn draw_divider<W: Write>(out: &mut W, view: Viewport, turn: PlayerId) -> std::io::Result<()> {
    let mid = view.width / 2;
    out.queue(style::SetForegroundColor(C_DIVIDER))?;
    for row in 2..view.height.saturating_sub(2) {
        out.queue(cursor::MoveTo(mid, row))?;
        out.queue(Print("┊"))?;
    }
    let marker = format!("▼ {} ▼", turn.label());
    let col = match turn {
        PlayerId::J1 => view.width / 4,
        PlayerId::J2 => view.width / 4 * 3,
    };
    out.queue(cursor::MoveTo(col.saturating_sub(marker.chars().count() as u16 / 2), 1))?;
    out.queue(style::SetForegroundColor(player_color(turn)))?;
    out.queue(Print(marker))?;
    Ok(())
}

fn draw_banner<W: Write>(out: &mut W, view: Viewport, level: u32) -> std::io::Result<()> {
    let text = format!("★  LEVEL {}  ★", level);
    let (cx, cy) = view.centre();
    out.queue(cursor::MoveTo(
        cx.saturating_sub(text.chars().count() as u16 / 2),
        cy.saturating_sub(4),
    ))?;
    out.queue(style::SetForegroundColor(C_BANNER))?;
    out.queue(Print(text))?;
    Ok(())
}

// ── Controls hint (last row) ──────────────────────────────────────────────────

fn draw_controls_hint<W: Write>(out: &mut W, view: Viewport) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, view.height.saturating_sub(1)))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print("A-Z : Type the letter   ESC : Pause"))?;
    Ok(())
}

// ── Overlays ──────────────────────────────────────────────────────────────────

pub const PAUSE_ITEMS: [&str; 3] = ["Resume", "Save and exit", "Exit without saving"];

fn draw_box<W: Write>(out: &mut W, view: Viewport, lines: &[(String, Color)]) -> std::io::Result<()> {
    let (cx, cy) = view.centre();
    let start_row = cy.saturating_sub(lines.len() as u16 / 2);
    for (i, (msg, color)) in lines.iter().enumerate() {
        let row = start_row + i as u16;
        let col = cx.saturating_sub(msg.chars().count() as u16 / 2);
        out.queue(cursor::MoveTo(col, row))?;
        out.queue(style::SetForegroundColor(*color))?;
        out.queue(Print(msg))?;
    }
    Ok(())
}

fn draw_pause<W: Write>(out: &mut W, view: Viewport, selected: usize) -> std::io::Result<()> {
    let mut lines = vec![
        ("╔══════════════════╗".to_string(), Color::Cyan),
        ("║      PAUSED      ║".to_string(), Color::Cyan),
        ("╚══════════════════╝".to_string(), Color::Cyan),
    ];
    for (i, item) in PAUSE_ITEMS.iter().enumerate() {
        let (mark, color) = if i == selected {
            ("▶", Color::White)
        } else {
            (" ", Color::DarkGrey)
        };
        lines.push((format!("{} [{}] {:<20}", mark, i + 1, item), color));
    }
    draw_box(out, view, &lines)
}

fn draw_game_over<W: Write>(
    out: &mut W,
    view: Viewport,
    session: &GameSession,
    reason: EndReason,
) -> std::io::Result<()> {
    let summary = session.summary();
    let why = match reason {
        EndReason::FaultLimitReached => "Fault limit reached",
        EndReason::TimeLimitReached => "Time is up",
        EndReason::UserQuit => "Game left",
    };
    let mut lines = vec![
        ("╔══════════════════╗".to_string(), Color::Red),
        ("║    GAME  OVER    ║".to_string(), Color::Red),
        ("╚══════════════════╝".to_string(), Color::Red),
        (why.to_string(), Color::DarkGrey),
    ];
    for t in &summary.players {
        lines.push((
            format!("{}  score {}  hits {}  misses {}", t.player.label(), t.score, t.hits, t.misses),
            player_color(t.player),
        ));
    }
    if let Some(winner) = summary.winner() {
        lines.push((format!("Winner: {}", winner.label()), player_color(winner)));
    }
    lines.push(("R - Play Again  M - Menu".to_string(), Color::White));
    draw_box(out, view, &lines)
}
