//! Input decoding using the VTE crate.
//!
//! SSH delivers whatever bytes the client terminal emits: printable UTF-8,
//! C0 control codes and CSI/SS3 escape sequences. [`InputDecoder`] runs them
//! through a persistent VTE state machine so a sequence split across two
//! channel packets still decodes to a single key.
//!
//! The one exception is a read that ends on a bare ESC. Terminals send an
//! escape sequence in a single write, so that ESC is the Escape key itself
//! and is reported at once instead of prefixing the next keypress.

use tracing::trace;
use vte::{Params, Perform};

use yoshimi_core::Key;

/// Streaming decoder from terminal input bytes to [`Key`]s.
pub struct InputDecoder {
    parser: vte::Parser,
    collector: KeyCollector,
}

impl std::fmt::Debug for InputDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDecoder")
            .field("pending", &self.collector.keys.len())
            .finish_non_exhaustive()
    }
}

impl InputDecoder {
    /// Create a decoder in the ground state.
    pub fn new() -> Self {
        Self {
            parser: vte::Parser::new(),
            collector: KeyCollector::default(),
        }
    }

    /// Feed bytes and return every key completed by them, in order.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Key> {
        for byte in bytes {
            // DEL is what most terminals send for Backspace
            if *byte == 0x7F {
                self.collector.push(Key::Backspace);
                continue;
            }
            self.parser.advance(&mut self.collector, *byte);
        }
        if bytes.last() == Some(&0x1B) {
            self.parser = vte::Parser::new();
            self.collector.ss3 = false;
            self.collector.push(Key::Escape);
        }
        std::mem::take(&mut self.collector.keys)
    }
}

impl Default for InputDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct KeyCollector {
    keys: Vec<Key>,
    /// Set after `ESC O`; the next printable is an SS3 final byte.
    ss3: bool,
    /// Last key was a carriage return, so a following LF is swallowed.
    after_cr: bool,
}

impl KeyCollector {
    fn push(&mut self, key: Key) {
        self.after_cr = false;
        self.keys.push(key);
    }
}

fn cursor_key(final_char: char) -> Option<Key> {
    match final_char {
        'A' => Some(Key::Up),
        'B' => Some(Key::Down),
        'C' => Some(Key::Right),
        'D' => Some(Key::Left),
        'H' => Some(Key::Home),
        'F' => Some(Key::End),
        _ => None,
    }
}

impl Perform for KeyCollector {
    fn print(&mut self, c: char) {
        if std::mem::take(&mut self.ss3) {
            if let Some(key) = cursor_key(c) {
                self.push(key);
            }
            return;
        }

        match c {
            '\u{7f}' => self.push(Key::Backspace),
            _ => self.push(Key::Char(c)),
        }
    }

    fn execute(&mut self, byte: u8) {
        self.ss3 = false;
        match byte {
            0x0D => {
                self.push(Key::Enter);
                self.after_cr = true;
            }
            0x0A => {
                if !std::mem::take(&mut self.after_cr) {
                    self.push(Key::Enter);
                }
            }
            0x09 => self.push(Key::Tab),
            0x08 | 0x7F => self.push(Key::Backspace),
            // Ctrl+A .. Ctrl+Z
            0x01..=0x1A => self.push(Key::Ctrl((b'a' + byte - 1) as char)),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, _intermediates: &[u8], ignore: bool, c: char) {
        self.ss3 = false;
        if ignore {
            return;
        }

        let mut iter = params.iter();
        let first = iter.next().map(|p| p[0]).unwrap_or(0);
        let modifier = iter.next().map(|p| p[0]).unwrap_or(1);

        let key = match c {
            'Z' => Some(Key::Shift(Box::new(Key::Tab))),
            '~' => match first {
                1 | 7 => Some(Key::Home),
                3 => Some(Key::Delete),
                4 | 8 => Some(Key::End),
                _ => None,
            },
            other => cursor_key(other),
        };

        match key {
            // xterm modifier parameter: 2 = Shift
            Some(key) if modifier == 2 && c != 'Z' => self.push(Key::Shift(Box::new(key))),
            Some(key) => self.push(key),
            None => trace!("Ignoring CSI {} {}", first, c),
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        if !intermediates.is_empty() {
            return;
        }
        match byte {
            b'O' => self.ss3 = true,
            0x20..=0x7E => self.push(Key::Alt(byte as char)),
            _ => {}
        }
    }
}
