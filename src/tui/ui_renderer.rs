use super::app_logic::PickerApp;
use super::app_state::{Badge, EditState, Refresh, StatusKind};
use super::terminal::CursorDriver;
use crate::glyphs::{Glyph, GlyphResolver};
use crate::tree_model::Entry;
use crate::utils;
use crossterm::{
    queue,
    style::{
        Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
        SetForegroundColor,
    },
};
use ratatui::prelude::*;
use std::io::{self, Write};
use std::path::PathBuf;

const NORMAL_HINT: &str =
    "space pick  d/y/x mark  D delete  p paste  r rename  a add  / search  q quit";
const EDIT_HINT: &str = "enter confirm  esc cancel";
const EMPTY_HINT: &str = "empty directory  q quit";

/// Knobs for laying out a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Columns of indentation per directory level.
    pub indent_width: usize,
    /// Rows left free below the frame.
    pub page_margin: u16,
}

impl Default for FrameLayout {
    fn default() -> Self {
        FrameLayout {
            indent_width: 1,
            page_margin: 2,
        }
    }
}

/// One row of the tree page: a real entry, or the name being typed in add
/// mode.
enum Row<'a> {
    Entry(usize, &'a Entry),
    Phantom { depth: usize, name: &'a str },
}

// --- Frame building ---

pub struct Renderer {
    glyphs: Box<dyn GlyphResolver>,
    layout: FrameLayout,
    last_frame: Vec<Line<'static>>,
}

impl Renderer {
    pub fn new(glyphs: Box<dyn GlyphResolver>, layout: FrameLayout) -> Self {
        Renderer {
            glyphs,
            layout,
            last_frame: Vec::new(),
        }
    }

    /// Breadcrumb, one page of rows and a footer, each cut to the terminal
    /// width.
    pub fn build_frame(&self, app: &PickerApp) -> Vec<Line<'static>> {
        let viewport = app.viewport;
        let capacity = viewport
            .rows
            .saturating_sub(self.layout.page_margin.saturating_add(2))
            .max(1) as usize;

        let rows = visible_rows(app);
        let focus = match (&app.edit, app.cursor) {
            (EditState::Adding(_), Some(i)) => i + 1,
            (_, cursor) => cursor.unwrap_or(0),
        };
        let (start, end) = page_bounds(rows.len(), focus, capacity);

        let mut lines = Vec::with_capacity(end - start + 2);
        lines.push(self.breadcrumb_line(app));
        for row in &rows[start..end] {
            lines.push(match row {
                Row::Entry(index, entry) => self.entry_line(app, *index, entry),
                Row::Phantom { depth, name } => self.phantom_line(*depth, name),
            });
        }
        lines.push(self.footer_line(app));

        lines.truncate(viewport.rows.max(1) as usize);
        let cols = viewport.cols.max(1) as usize;
        lines.into_iter().map(|l| truncate_line(l, cols)).collect()
    }

    fn breadcrumb_line(&self, app: &PickerApp) -> Line<'static> {
        let path = app
            .current_entry()
            .map(|e| e.path.clone())
            .unwrap_or_else(|| app.tree.root().to_path_buf());
        let mut trail = app.tree.breadcrumb(&path).join("/");
        if !trail.ends_with('/') {
            trail.push('/');
        }
        let glyph = self.glyphs.glyph(&trail, true);
        Line::from(vec![
            glyph_span(glyph),
            Span::styled(
                trail,
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            ),
        ])
    }

    fn entry_line(&self, app: &PickerApp, index: usize, entry: &Entry) -> Line<'static> {
        let is_cursor = app.cursor == Some(index);
        let (name, renaming) = match &app.edit {
            EditState::Renaming(buffer) if is_cursor => (buffer.clone(), true),
            _ if index == 0 => (".".to_string(), false),
            _ => (utils::display_name(&entry.path), false),
        };

        let mut spans = Vec::with_capacity(6);
        spans.push(if is_cursor {
            Span::styled("> ", Style::default().add_modifier(Modifier::REVERSED))
        } else {
            Span::raw("  ")
        });

        let indent = app.tree.depth(&entry.path) * self.layout.indent_width;
        if app.picked.contains(&entry.path) {
            // The pick marker takes the place of up to two indent columns.
            spans.push(Span::raw(" ".repeat(indent.saturating_sub(2))));
            spans.push(Span::styled(
                "* ",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(" ".repeat(indent)));
        }

        spans.push(glyph_span(self.glyphs.glyph(&name, entry.is_dir)));

        let mut style = Style::default();
        if entry.is_dir {
            style = style.add_modifier(Modifier::BOLD);
        }
        if app.marks.delete.contains(&entry.path) {
            style = style.add_modifier(Modifier::CROSSED_OUT);
        }
        if is_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        spans.push(Span::styled(name, style));

        let badge = app
            .marks
            .badge_for(&entry.path)
            .or(renaming.then_some(Badge::Renaming));
        if let Some(badge) = badge {
            spans.push(Span::styled(
                self.glyphs.badge_label(badge),
                badge_style(badge),
            ));
        }
        Line::from(spans)
    }

    fn phantom_line(&self, depth: usize, name: &str) -> Line<'static> {
        let is_dir = name.ends_with('/');
        Line::from(vec![
            Span::raw("  "),
            Span::raw(" ".repeat(depth * self.layout.indent_width)),
            glyph_span(self.glyphs.glyph(name, is_dir)),
            Span::styled(
                name.to_string(),
                Style::default().add_modifier(Modifier::UNDERLINED),
            ),
            Span::styled(self.glyphs.badge_label(Badge::New), badge_style(Badge::New)),
        ])
    }

    fn footer_line(&self, app: &PickerApp) -> Line<'static> {
        if let Some(status) = &app.status {
            let style = match status.kind {
                StatusKind::Info => Style::default().fg(Color::Yellow),
                StatusKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            };
            return Line::from(Span::styled(status.text.clone(), style));
        }
        let hint = Style::default().fg(Color::DarkGray);
        match &app.edit {
            EditState::Searching(query) => Line::from(vec![
                Span::styled("/", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(query.clone()),
                Span::styled(" ", Style::default().add_modifier(Modifier::REVERSED)),
            ]),
            EditState::Renaming(_) | EditState::Adding(_) => {
                Line::from(Span::styled(EDIT_HINT, hint))
            }
            EditState::Idle if app.tree.is_empty() => Line::from(Span::styled(EMPTY_HINT, hint)),
            EditState::Idle => Line::from(Span::styled(NORMAL_HINT, hint)),
        }
    }

    // --- Terminal output ---

    /// Writes `frame` below the anchor. Only rows that differ from the
    /// previous frame are rewritten, unless `refresh` asks for more.
    pub fn render<W: Write>(
        &mut self,
        driver: &mut CursorDriver<W>,
        frame: Vec<Line<'static>>,
        refresh: Refresh,
    ) -> io::Result<()> {
        match refresh {
            Refresh::Diff => {}
            Refresh::Region => {
                driver.clear_region()?;
                self.last_frame.clear();
            }
            Refresh::Screen => {
                driver.clear_screen()?;
                self.last_frame.clear();
            }
        }

        let height = u16::try_from(frame.len()).unwrap_or(u16::MAX);
        driver.reserve(height)?;

        for (offset, line) in frame.iter().enumerate() {
            if self.last_frame.get(offset) == Some(line) {
                continue;
            }
            driver.move_to_frame_row(offset as u16)?;
            driver.clear_line()?;
            write_line(driver.writer(), line)?;
        }
        // Rows the previous frame had but this one does not.
        for offset in frame.len()..self.last_frame.len() {
            driver.move_to_frame_row(offset as u16)?;
            driver.clear_line()?;
        }

        driver.move_to_anchor()?;
        driver.flush()?;
        self.last_frame = frame;
        Ok(())
    }

    /// Wipes everything drawn so far and leaves the cursor at the anchor.
    pub fn clear<W: Write>(&mut self, driver: &mut CursorDriver<W>) -> io::Result<()> {
        driver.clear_region()?;
        driver.flush()?;
        self.last_frame.clear();
        Ok(())
    }
}

fn visible_rows(app: &PickerApp) -> Vec<Row<'_>> {
    let mut rows: Vec<Row<'_>> = app
        .tree
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| Row::Entry(i, e))
        .collect();

    if let (EditState::Adding(name), Some(cursor)) = (&app.edit, app.cursor) {
        if let Some(entry) = app.tree.get(cursor) {
            let base: PathBuf = if entry.is_dir {
                entry.path.clone()
            } else {
                entry
                    .path
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| entry.path.clone())
            };
            let depth = app.tree.depth(&base) + 1;
            rows.insert(cursor + 1, Row::Phantom { depth, name });
        }
    }
    rows
}

/// Window `[start, end)` of at most `capacity` rows out of `total`, centred on
/// `focus` and clamped to the ends.
fn page_bounds(total: usize, focus: usize, capacity: usize) -> (usize, usize) {
    if total <= capacity {
        return (0, total);
    }
    let start = focus.saturating_sub(capacity / 2).min(total - capacity);
    (start, start + capacity)
}

fn glyph_span(glyph: Glyph) -> Span<'static> {
    match glyph.color {
        Some(color) => Span::styled(glyph.icon, Style::default().fg(color)),
        None => Span::raw(glyph.icon),
    }
}

fn badge_style(badge: Badge) -> Style {
    let color = match badge {
        Badge::Copy => Color::Green,
        Badge::Cut => Color::Yellow,
        Badge::Delete => Color::Red,
        Badge::New => Color::Cyan,
        Badge::Renaming => Color::Magenta,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Cuts `line` to at most `cols` characters.
fn truncate_line(line: Line<'static>, cols: usize) -> Line<'static> {
    let mut room = cols;
    let mut spans = Vec::with_capacity(line.spans.len());
    for span in line.spans {
        if room == 0 {
            break;
        }
        let len = span.content.chars().count();
        if len <= room {
            room -= len;
            spans.push(span);
        } else {
            let cut: String = span.content.chars().take(room).collect();
            room = 0;
            spans.push(Span::styled(cut, span.style));
        }
    }
    Line::from(spans).style(line.style)
}

// --- ratatui style -> escape sequences ---

fn term_color(color: Color) -> TermColor {
    match color {
        Color::Reset => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        Color::Indexed(i) => TermColor::AnsiValue(i),
    }
}

fn queue_style<W: Write>(out: &mut W, style: Style) -> io::Result<()> {
    if let Some(fg) = style.fg {
        queue!(out, SetForegroundColor(term_color(fg)))?;
    }
    if let Some(bg) = style.bg {
        queue!(out, SetBackgroundColor(term_color(bg)))?;
    }
    let attributes = [
        (Modifier::BOLD, Attribute::Bold),
        (Modifier::DIM, Attribute::Dim),
        (Modifier::ITALIC, Attribute::Italic),
        (Modifier::UNDERLINED, Attribute::Underlined),
        (Modifier::REVERSED, Attribute::Reverse),
        (Modifier::CROSSED_OUT, Attribute::CrossedOut),
    ];
    for (modifier, attribute) in attributes {
        if style.add_modifier.contains(modifier) {
            queue!(out, SetAttribute(attribute))?;
        }
    }
    Ok(())
}

fn write_line<W: Write>(out: &mut W, line: &Line<'_>) -> io::Result<()> {
    for span in &line.spans {
        let style = line.style.patch(span.style);
        let styled = style != Style::default();
        if styled {
            queue_style(out, style)?;
        }
        queue!(out, Print(&span.content))?;
        if styled {
            queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
        }
    }
    Ok(())
}
