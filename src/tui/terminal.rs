use super::app_state::Viewport;
use crossterm::{
    cursor::{Hide, MoveDown, MoveLeft, MoveRight, MoveTo, MoveUp, Show},
    queue,
    terminal::{Clear, ClearType},
};
use log::{debug, warn};
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

// --- Input ---

/// Byte-at-a-time input. `timeout: None` blocks until a byte arrives;
/// `Some(d)` returns `Ok(None)` if nothing came within `d`.
pub trait ByteSource {
    fn next_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>>;
}

/// Raw stdin bytes, read on a helper thread so waits can be bounded.
/// Assumes the terminal is already in raw mode.
pub struct StdinBytes {
    rx: Receiver<io::Result<u8>>,
}

impl StdinBytes {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for byte in io::stdin().lock().bytes() {
                let failed = byte.is_err();
                if tx.send(byte).is_err() || failed {
                    break;
                }
            }
        });
        StdinBytes { rx }
    }
}

impl ByteSource for StdinBytes {
    fn next_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        let received = match timeout {
            None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(wait) => self.rx.recv_timeout(wait),
        };
        match received {
            Ok(byte) => byte.map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "standard input closed",
            )),
        }
    }
}

// --- Cursor position query ---

const POSITION_QUERY: &[u8] = b"\x1b[6n";
const MAX_RESPONSE_LEN: usize = 32;
/// Longest gap tolerated between bytes of a reply that arrives after the
/// deadline.
const REPLY_GRACE: Duration = Duration::from_millis(30);

/// Reads and drops the rest of a position reply, up to its final `R`.
fn drain_reply<S: ByteSource>(input: &mut S) -> io::Result<()> {
    for _ in 0..MAX_RESPONSE_LEN {
        match input.next_byte(Some(REPLY_GRACE))? {
            None | Some(b'R') => break,
            Some(_) => {}
        }
    }
    Ok(())
}

/// Parses `ESC [ row ; col R` into zero-based `(row, col)`. Anything before
/// the last `ESC [` is ignored.
pub fn parse_position_response(bytes: &[u8]) -> Option<(u16, u16)> {
    let start = bytes.windows(2).rposition(|w| w == b"\x1b[")?;
    let body = bytes.get(start + 2..)?.strip_suffix(b"R")?;
    let body = std::str::from_utf8(body).ok()?;
    let (row, col) = body.split_once(';')?;
    let row: u16 = row.parse().ok()?;
    let col: u16 = col.parse().ok()?;
    Some((row.checked_sub(1)?, col.checked_sub(1)?))
}

// --- Cursor / viewport driver ---

/// Issues cursor movement and clearing sequences to `out` and tracks where the
/// cursor is believed to be. All frame rows are addressed relative to
/// `anchor_row`, the screen row where drawing started.
pub struct CursorDriver<W: Write> {
    out: W,
    viewport: Viewport,
    anchor_row: u16,
    row: u16,
    col: u16,
}

impl<W: Write> CursorDriver<W> {
    pub fn new(out: W, viewport: Viewport) -> Self {
        CursorDriver {
            out,
            viewport,
            anchor_row: 0,
            row: 0,
            col: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if self.anchor_row >= viewport.rows {
            self.anchor_row = viewport.rows.saturating_sub(1);
        }
    }

    pub fn anchor_row(&self) -> u16 {
        self.anchor_row
    }

    /// Believed `(row, col)` of the terminal cursor.
    pub fn position(&self) -> (u16, u16) {
        (self.row, self.col)
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    /// Asks the terminal where its cursor is. Waits at most `timeout` in total;
    /// `None` means the terminal did not answer or answered garbage.
    pub fn query_position<S: ByteSource>(
        &mut self,
        input: &mut S,
        timeout: Duration,
    ) -> io::Result<Option<(u16, u16)>> {
        self.out.write_all(POSITION_QUERY)?;
        self.out.flush()?;

        let deadline = Instant::now() + timeout;
        let mut response = Vec::with_capacity(MAX_RESPONSE_LEN);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let byte = if remaining.is_zero() {
                None
            } else {
                input.next_byte(Some(remaining))?
            };
            match byte {
                None => {
                    warn!("cursor position query timed out");
                    // A reply cut off by the deadline must not reach the key
                    // decoder as "5;1R". A reply that has not started yet is
                    // swallowed there as an unknown CSI sequence.
                    if !response.is_empty() {
                        drain_reply(input)?;
                    }
                    return Ok(None);
                }
                Some(b'R') => {
                    response.push(b'R');
                    let parsed = parse_position_response(&response);
                    debug!("cursor position response {:?} -> {:?}", response, parsed);
                    return Ok(parsed);
                }
                Some(byte) => {
                    response.push(byte);
                    if response.len() > MAX_RESPONSE_LEN {
                        warn!("cursor position response too long, giving up");
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Anchors drawing at `position`'s row. Without a position the screen is
    /// cleared and drawing starts at the top-left corner.
    pub fn anchor_at(&mut self, position: Option<(u16, u16)>) -> io::Result<()> {
        match position {
            Some((row, col)) => {
                self.anchor_row = row.min(self.viewport.rows.saturating_sub(1));
                self.row = row;
                self.col = col;
                if col > 0 {
                    // Start on a fresh line.
                    self.out.write_all(b"\r\n")?;
                    self.col = 0;
                    if self.anchor_row + 1 < self.viewport.rows {
                        self.anchor_row += 1;
                        self.row = self.anchor_row;
                    }
                }
                Ok(())
            }
            None => self.clear_screen(),
        }
    }

    pub fn move_up(&mut self, lines: u16) -> io::Result<()> {
        if lines > 0 {
            queue!(self.out, MoveUp(lines))?;
            self.row = self.row.saturating_sub(lines);
        }
        Ok(())
    }

    pub fn move_down(&mut self, lines: u16) -> io::Result<()> {
        if lines > 0 {
            queue!(self.out, MoveDown(lines))?;
            self.row = self.row.saturating_add(lines);
        }
        Ok(())
    }

    pub fn move_left(&mut self, columns: u16) -> io::Result<()> {
        if columns > 0 {
            queue!(self.out, MoveLeft(columns))?;
            self.col = self.col.saturating_sub(columns);
        }
        Ok(())
    }

    pub fn move_right(&mut self, columns: u16) -> io::Result<()> {
        if columns > 0 {
            queue!(self.out, MoveRight(columns))?;
            self.col = self.col.saturating_add(columns);
        }
        Ok(())
    }

    /// Absolute move, zero-based.
    pub fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))?;
        self.row = row;
        self.col = col;
        Ok(())
    }

    pub fn carriage_return(&mut self) -> io::Result<()> {
        self.out.write_all(b"\r")?;
        self.col = 0;
        Ok(())
    }

    /// Moves to column 0 of frame row `offset` (0 = anchor row), relative to
    /// the tracked position.
    pub fn move_to_frame_row(&mut self, offset: u16) -> io::Result<()> {
        let target = self.anchor_row.saturating_add(offset);
        self.carriage_return()?;
        if target > self.row {
            self.move_down(target - self.row)
        } else {
            self.move_up(self.row - target)
        }
    }

    pub fn move_to_anchor(&mut self) -> io::Result<()> {
        self.move_to_frame_row(0)
    }

    pub fn clear_line(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::CurrentLine))?;
        Ok(())
    }

    /// Clears from the anchor row to the bottom of the screen.
    pub fn clear_region(&mut self) -> io::Result<()> {
        self.move_to_anchor()?;
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        Ok(())
    }

    /// Clears everything and re-anchors at the top-left corner.
    pub fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))?;
        self.anchor_row = 0;
        self.move_to(0, 0)
    }

    /// Makes sure `height` rows fit below the anchor, scrolling the terminal
    /// up if the anchor sits too close to the bottom.
    pub fn reserve(&mut self, height: u16) -> io::Result<()> {
        let rows = self.viewport.rows.max(1);
        let height = height.min(rows);
        let bottom = self.anchor_row.saturating_add(height);
        if bottom <= rows {
            return Ok(());
        }
        let excess = bottom - rows;
        self.move_to(rows - 1, 0)?;
        for _ in 0..excess {
            self.out.write_all(b"\n")?;
        }
        self.anchor_row -= excess;
        debug!("scrolled {} rows, anchor now {}", excess, self.anchor_row);
        Ok(())
    }

    pub fn hide_cursor(&mut self) -> io::Result<()> {
        queue!(self.out, Hide)?;
        Ok(())
    }

    pub fn show_cursor(&mut self) -> io::Result<()> {
        queue!(self.out, Show)?;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Scripted input for tests. Runs dry like a silent terminal: bounded reads
/// return `None`, unbounded reads fail with EOF.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedBytes {
    bytes: std::collections::VecDeque<u8>,
}

#[cfg(test)]
impl ScriptedBytes {
    pub(crate) fn new(bytes: &[u8]) -> Self {
        ScriptedBytes {
            bytes: bytes.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
impl ByteSource for ScriptedBytes {
    fn next_byte(&mut self, timeout: Option<Duration>) -> io::Result<Option<u8>> {
        match (self.bytes.pop_front(), timeout) {
            (Some(byte), _) => Ok(Some(byte)),
            (None, Some(_)) => Ok(None),
            (None, None) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "script exhausted",
            )),
        }
    }
}
