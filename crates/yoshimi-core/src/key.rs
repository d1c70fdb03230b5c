//! Keyboard input types for terminal interaction.

/// Keyboard key received from a remote terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    // Character keys
    /// Regular character
    Char(char),

    // Navigation
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Home key
    Home,
    /// End key
    End,

    // Actions
    /// Enter/Return key
    Enter,
    /// Tab key
    Tab,
    /// Escape key
    Escape,
    /// Backspace key
    Backspace,
    /// Delete key
    Delete,

    // Modified keys
    /// Ctrl + character
    Ctrl(char),
    /// Alt + character
    Alt(char),
    /// Shift + key
    Shift(Box<Key>),
}

impl Key {
    /// Whether this key unconditionally ends the session.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Key::Ctrl('c'))
    }

    /// Whether this key is Shift+Tab.
    pub fn is_back_tab(&self) -> bool {
        matches!(self, Key::Shift(inner) if **inner == Key::Tab)
    }

    /// Convert key to the bytes a terminal would send for it.
    pub fn to_escape_sequence(&self) -> Vec<u8> {
        match self {
            Key::Char(c) => c.to_string().into_bytes(),
            Key::Enter => vec![0x0D], // CR
            Key::Tab => vec![0x09],
            Key::Escape => vec![0x1B],
            Key::Backspace => vec![0x7F],
            Key::Delete => b"\x1b[3~".to_vec(),
            Key::Up => b"\x1b[A".to_vec(),
            Key::Down => b"\x1b[B".to_vec(),
            Key::Right => b"\x1b[C".to_vec(),
            Key::Left => b"\x1b[D".to_vec(),
            Key::Home => b"\x1b[H".to_vec(),
            Key::End => b"\x1b[F".to_vec(),
            Key::Ctrl(c) => {
                // Ctrl+A = 0x01, Ctrl+Z = 0x1A
                let code = (*c as u8).to_ascii_lowercase().wrapping_sub(b'a').wrapping_add(1);
                vec![code]
            }
            Key::Alt(c) => {
                // Alt sends ESC prefix
                let mut seq = vec![0x1B];
                seq.extend(c.to_string().bytes());
                seq
            }
            Key::Shift(inner) => match inner.as_ref() {
                Key::Tab => b"\x1b[Z".to_vec(),
                Key::Up => b"\x1b[1;2A".to_vec(),
                Key::Down => b"\x1b[1;2B".to_vec(),
                Key::Right => b"\x1b[1;2C".to_vec(),
                Key::Left => b"\x1b[1;2D".to_vec(),
                _ => inner.to_escape_sequence(),
            },
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(' ') => write!(f, "Space"),
            Key::Char(c) => write!(f, "{c}"),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
            Key::Home => write!(f, "Home"),
            Key::End => write!(f, "End"),
            Key::Enter => write!(f, "Enter"),
            Key::Tab => write!(f, "Tab"),
            Key::Escape => write!(f, "Escape"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
            Key::Ctrl(c) => write!(f, "Ctrl+{c}"),
            Key::Alt(c) => write!(f, "Alt+{c}"),
            Key::Shift(k) => write!(f, "Shift+{k}"),
        }
    }
}
