use super::app_logic::PickerApp;
use super::terminal::ByteSource;
use anyhow::Result;
use std::collections::VecDeque;
use std::time::Duration;

/// How long to wait after a lone ESC for the rest of an escape sequence.
const ESCAPE_GRACE: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    /// Ctrl-L: repaint the screen and refresh the terminal size.
    Redraw,
    /// Ctrl-C.
    Interrupt,
}

/// Turns raw bytes into keys: control bytes, CSI arrow sequences and
/// multi-byte UTF-8 characters. Undecodable input is dropped.
pub struct KeyDecoder<S: ByteSource> {
    source: S,
    pending: VecDeque<u8>,
}

impl<S: ByteSource> KeyDecoder<S> {
    pub fn new(source: S) -> Self {
        KeyDecoder {
            source,
            pending: VecDeque::new(),
        }
    }

    fn next_byte(&mut self, timeout: Option<Duration>) -> std::io::Result<Option<u8>> {
        if let Some(byte) = self.pending.pop_front() {
            return Ok(Some(byte));
        }
        self.source.next_byte(timeout)
    }

    fn blocking_byte(&mut self) -> std::io::Result<u8> {
        loop {
            if let Some(byte) = self.next_byte(None)? {
                return Ok(byte);
            }
        }
    }

    /// Blocks until one whole key has been read.
    pub fn next_key(&mut self) -> std::io::Result<Key> {
        loop {
            let byte = self.blocking_byte()?;
            let key = match byte {
                3 => Some(Key::Interrupt),
                8 | 127 => Some(Key::Backspace),
                10 | 13 => Some(Key::Enter),
                12 => Some(Key::Redraw),
                27 => self.decode_escape()?,
                0x00..=0x7f => Some(Key::Char(byte as char)),
                _ => self.decode_utf8(byte)?,
            };
            if let Some(key) = key {
                return Ok(key);
            }
        }
    }

    fn decode_escape(&mut self) -> std::io::Result<Option<Key>> {
        match self.next_byte(Some(ESCAPE_GRACE))? {
            None => Ok(Some(Key::Esc)),
            Some(b'[') => {
                let mut last = match self.next_byte(Some(ESCAPE_GRACE))? {
                    Some(b) => b,
                    None => return Ok(Some(Key::Esc)),
                };
                // Skip parameter bytes of longer CSI sequences, including a
                // cursor position reply that arrived after its query gave up.
                while !(0x40..=0x7e).contains(&last) {
                    last = match self.next_byte(Some(ESCAPE_GRACE))? {
                        Some(b) => b,
                        None => return Ok(None),
                    };
                }
                Ok(match last {
                    b'A' => Some(Key::Up),
                    b'B' => Some(Key::Down),
                    b'C' => Some(Key::Right),
                    b'D' => Some(Key::Left),
                    _ => None,
                })
            }
            Some(other) => {
                // ESC followed by an ordinary key (alt-modified): report the ESC
                // and replay the key.
                self.pending.push_back(other);
                Ok(Some(Key::Esc))
            }
        }
    }

    fn decode_utf8(&mut self, lead: u8) -> std::io::Result<Option<Key>> {
        let width = match lead {
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Ok(None),
        };
        let mut buf = vec![lead];
        for _ in 1..width {
            buf.push(self.blocking_byte()?);
        }
        Ok(std::str::from_utf8(&buf)
            .ok()
            .and_then(|s| s.chars().next())
            .map(Key::Char))
    }
}

/// Reads one key and routes it to the handler for the current mode.
pub(super) fn handle_events<S: ByteSource>(
    app: &mut PickerApp,
    keys: &mut KeyDecoder<S>,
) -> Result<()> {
    let key = keys.next_key()?;
    app.clear_status();
    match key {
        Key::Interrupt => app.interrupt(),
        Key::Redraw => app.request_full_redraw(),
        _ if app.edit.is_editing() => app.handle_edit_mode_input(key),
        _ => app.handle_normal_mode_input(key),
    }
    Ok(())
}
