//! Editable text field.
//!
//! A small line editor behind the form: it owns its value and cursor,
//! applies editing keys, and renders itself to styled lines.

use unicode_width::UnicodeWidthChar;
use yoshimi_core::Key;
use yoshimi_terminal::{Color, Line, Span, Style};

/// An editable single- or multi-line text field.
#[derive(Debug, Clone)]
pub struct TextField {
    value: Vec<char>,
    cursor: usize,
    placeholder: String,
    width: usize,
    focused: bool,
    mask: Option<char>,
    multiline: bool,
}

impl TextField {
    /// Create an empty, unfocused single-line field.
    pub fn new(placeholder: impl Into<String>, width: u16) -> Self {
        Self {
            value: Vec::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            width: usize::from(width.max(1)),
            focused: false,
            mask: None,
            multiline: false,
        }
    }

    /// Display every character as `mask`.
    pub fn masked(mut self, mask: char) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Let Enter insert a newline.
    pub fn multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    /// Current value.
    pub fn value(&self) -> String {
        self.value.iter().collect()
    }

    /// Replace the value and move the cursor to its end.
    pub fn set_value(&mut self, value: &str) {
        self.value = value.chars().collect();
        self.cursor = self.value.len();
    }

    /// Empty the field.
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Whether the field has no text.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Current placeholder text.
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Replace the placeholder text.
    pub fn set_placeholder(&mut self, placeholder: impl Into<String>) {
        self.placeholder = placeholder.into();
    }

    /// Give the field keyboard focus.
    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Remove keyboard focus.
    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Whether the field has focus.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Cursor offset in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply an editing key. Returns whether the value or cursor changed.
    ///
    /// Keys that mean nothing to a text field (Tab, arrows up/down, other
    /// control chords) are ignored.
    pub fn handle_key(&mut self, key: &Key) -> bool {
        match key {
            Key::Char(c) if !c.is_control() => {
                self.value.insert(self.cursor, *c);
                self.cursor += 1;
                true
            }
            Key::Enter if self.multiline => {
                self.value.insert(self.cursor, '\n');
                self.cursor += 1;
                true
            }
            Key::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                self.value.remove(self.cursor);
                true
            }
            Key::Delete if self.cursor < self.value.len() => {
                self.value.remove(self.cursor);
                true
            }
            Key::Left if self.cursor > 0 => {
                self.cursor -= 1;
                true
            }
            Key::Right if self.cursor < self.value.len() => {
                self.cursor += 1;
                true
            }
            Key::Home | Key::Ctrl('a') if self.cursor > 0 => {
                self.cursor = 0;
                true
            }
            Key::End | Key::Ctrl('e') if self.cursor < self.value.len() => {
                self.cursor = self.value.len();
                true
            }
            Key::Ctrl('u') if self.cursor > 0 => {
                self.value.drain(..self.cursor);
                self.cursor = 0;
                true
            }
            Key::Ctrl('k') if self.cursor < self.value.len() => {
                self.value.truncate(self.cursor);
                true
            }
            _ => false,
        }
    }

    /// Render the field as styled lines.
    ///
    /// Empty fields show the placeholder dimmed. A focused field draws its
    /// cursor as a reverse-video cell and scrolls horizontally so the cursor
    /// stays within `width`.
    pub fn view(&self) -> Vec<Line> {
        let placeholder_style = Style::new().fg(Color::BrightBlack);
        let cursor_style = Style::new().reverse();

        if self.value.is_empty() {
            let mut chars = self.placeholder.chars();
            if self.focused {
                let first = chars.next().map(String::from).unwrap_or_else(|| " ".into());
                let mut line = Line::from(Span::styled(first, cursor_style.fg(Color::BrightBlack)));
                let rest: String = chars.collect();
                if !rest.is_empty() {
                    line.push(Span::styled(rest, placeholder_style));
                }
                return vec![line];
            }
            return vec![Line::styled(self.placeholder.clone(), placeholder_style)];
        }

        let display: Vec<char> = match self.mask {
            Some(mask) => self
                .value
                .iter()
                .map(|c| if *c == '\n' { '\n' } else { mask })
                .collect(),
            None => self.value.clone(),
        };

        // Split into visual lines, tracking which line/column holds the cursor.
        let mut lines: Vec<Vec<char>> = vec![Vec::new()];
        let mut cursor_at = (0, 0);
        for (i, c) in display.iter().enumerate() {
            if i == self.cursor {
                cursor_at = (lines.len() - 1, lines[lines.len() - 1].len());
            }
            if *c == '\n' {
                lines.push(Vec::new());
            } else if let Some(last) = lines.last_mut() {
                last.push(*c);
            }
        }
        if self.cursor == display.len() {
            cursor_at = (lines.len() - 1, lines[lines.len() - 1].len());
        }

        lines
            .into_iter()
            .enumerate()
            .map(|(row, chars)| {
                let cursor_col = (self.focused && row == cursor_at.0).then_some(cursor_at.1);
                self.view_line(&chars, cursor_col, cursor_style)
            })
            .collect()
    }

    fn view_line(&self, chars: &[char], cursor_col: Option<usize>, cursor_style: Style) -> Line {
        let Some(col) = cursor_col else {
            let start = fitting_start(chars, chars.len(), self.width);
            return Line::raw(chars[start..].iter().collect::<String>());
        };

        // Keep the cursor cell visible: window ends at the cursor when it
        // would otherwise fall off the right edge.
        let under = chars.get(col).copied().unwrap_or(' ');
        let under_width = cell_width(under).max(1);
        let start = fitting_start(chars, col, self.width.saturating_sub(under_width));
        let mut used = under_width + chars[start..col].iter().map(|c| cell_width(*c)).sum::<usize>();
        let mut end = (col + 1).min(chars.len());
        while let Some(c) = chars.get(end) {
            if used + cell_width(*c) > self.width {
                break;
            }
            used += cell_width(*c);
            end += 1;
        }

        let before: String = chars[start..col].iter().collect();
        let after: String = chars.get(col + 1..end).map(|s| s.iter().collect()).unwrap_or_default();

        let mut line = Line::empty();
        if !before.is_empty() {
            line.push(Span::raw(before));
        }
        line.push(Span::styled(under.to_string(), cursor_style));
        if !after.is_empty() {
            line.push(Span::raw(after));
        }
        line
    }
}

fn cell_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// First index such that `chars[start..end]` fits in `cells` terminal cells.
fn fitting_start(chars: &[char], end: usize, cells: usize) -> usize {
    let mut used = 0;
    let mut start = end;
    while start > 0 {
        let w = cell_width(chars[start - 1]);
        if used + w > cells {
            break;
        }
        used += w;
        start -= 1;
    }
    start
}
