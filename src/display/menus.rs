/// Full-screen menus drawn between games.

use std::io::Write;

use crossterm::{
    cursor,
    style::{self, Color, Print},
    terminal, QueueableCommand,
};
use letter_rain::snapshot::SaveRecord;
use letter_rain::storage::HighScore;

use super::Viewport;

const C_TITLE: Color = Color::Cyan;
const C_SELECTED: Color = Color::White;
const C_IDLE: Color = Color::DarkGrey;
const C_HINT: Color = Color::DarkGrey;

fn centred<W: Write>(out: &mut W, view: Viewport, row: u16, text: &str, color: Color) -> std::io::Result<()> {
    let col = (view.width / 2).saturating_sub(text.chars().count() as u16 / 2);
    out.queue(cursor::MoveTo(col, row))?;
    out.queue(style::SetForegroundColor(color))?;
    out.queue(Print(text))?;
    Ok(())
}

fn finish<W: Write>(out: &mut W, view: Viewport, hint: &str) -> std::io::Result<()> {
    out.queue(cursor::MoveTo(1, view.height.saturating_sub(1)))?;
    out.queue(style::SetForegroundColor(C_HINT))?;
    out.queue(Print(hint))?;
    out.queue(style::ResetColor)?;
    out.flush()
}

/// Title plus a vertical list with one highlighted entry.
pub fn draw_list<W: Write>(
    out: &mut W,
    view: Viewport,
    title: &str,
    subtitle: Option<&str>,
    items: &[String],
    selected: usize,
) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let cy = view.height / 2;
    let top = cy.saturating_sub(items.len() as u16 / 2 + 4);

    centred(out, view, top, title, C_TITLE)?;
    if let Some(sub) = subtitle {
        centred(out, view, top + 1, sub, Color::Yellow)?;
    }

    let width = items.iter().map(|s| s.chars().count()).max().unwrap_or(0) + 8;
    let left = (view.width / 2).saturating_sub(width as u16 / 2);
    for (i, item) in items.iter().enumerate() {
        let row = top + 3 + i as u16;
        out.queue(cursor::MoveTo(left, row))?;
        if i == selected {
            out.queue(style::SetForegroundColor(C_SELECTED))?;
            out.queue(Print(format!("▶ [{}] {}", i + 1, item)))?;
        } else {
            out.queue(style::SetForegroundColor(C_IDLE))?;
            out.queue(Print(format!("  [{}] {}", i + 1, item)))?;
        }
    }
    finish(out, view, "↑ ↓ : Move   ENTER : Select   ESC : Back")
}

pub fn draw_high_scores<W: Write>(
    out: &mut W,
    view: Viewport,
    entries: &[HighScore],
) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let top = (view.height / 2).saturating_sub(5);
    centred(out, view, top, "★  HIGH  SCORES  ★", C_TITLE)?;
    if entries.is_empty() {
        centred(out, view, top + 3, "No scores yet", C_IDLE)?;
    }
    for (i, entry) in entries.iter().enumerate() {
        let color = if i == 0 { Color::Yellow } else { Color::White };
        let line = format!("{}. {:<3}  {:>6}", i + 1, entry.name, entry.score);
        centred(out, view, top + 3 + i as u16, &line, color)?;
    }
    finish(out, view, "X : Reset table   ESC / ENTER : Back")
}

pub fn draw_initials<W: Write>(
    out: &mut W,
    view: Viewport,
    score: u32,
    typed: &str,
) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let cy = view.height / 2;
    centred(out, view, cy.saturating_sub(3), "NEW HIGH SCORE!", Color::Yellow)?;
    centred(out, view, cy.saturating_sub(1), &format!("Score: {}", score), Color::White)?;
    let mut slots = String::new();
    for i in 0..3 {
        slots.push(typed.chars().nth(i).unwrap_or('_'));
        slots.push(' ');
    }
    centred(out, view, cy + 1, slots.trim_end(), C_TITLE)?;
    finish(out, view, "A-Z : Initials   BACKSPACE : Erase   ENTER : Confirm   ESC : Skip")
}

pub fn draw_saves<W: Write>(
    out: &mut W,
    view: Viewport,
    records: &[SaveRecord],
    selected: usize,
) -> std::io::Result<()> {
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    let top = (view.height / 2).saturating_sub(5);
    centred(out, view, top, "SAVED GAMES", C_TITLE)?;
    if records.is_empty() {
        centred(out, view, top + 3, "No saved games", C_IDLE)?;
    }
    for (i, record) in records.iter().enumerate() {
        let (mark, color) = if i == selected {
            ("▶", C_SELECTED)
        } else {
            (" ", C_IDLE)
        };
        let line = format!("{} {}", mark, record.summary_line());
        centred(out, view, top + 3 + i as u16, &line, color)?;
    }
    finish(out, view, "↑ ↓ : Move   ENTER : Load   D : Delete   ESC : Back")
}
