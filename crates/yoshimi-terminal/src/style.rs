//! Styled text for frames.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Terminal foreground color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    /// Default terminal color
    #[default]
    Default,
    /// ANSI Red
    Red,
    /// ANSI Green
    Green,
    /// ANSI Yellow
    Yellow,
    /// ANSI Cyan
    Cyan,
    /// ANSI Magenta
    Magenta,
    /// Bright black (grey)
    BrightBlack,
    /// 256-color palette index (0-255)
    Indexed(u8),
    /// True color RGB (24-bit)
    Rgb {
        /// Red component
        r: u8,
        /// Green component
        g: u8,
        /// Blue component
        b: u8,
    },
}

impl Color {
    /// Parse a `#RRGGBB` hex string.
    pub fn hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix('#')?;
        if s.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(s.get(i..i + 2)?, 16).ok();
        Some(Color::Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    fn sgr(&self) -> Option<String> {
        match self {
            Color::Default => None,
            Color::Red => Some("31".to_string()),
            Color::Green => Some("32".to_string()),
            Color::Yellow => Some("33".to_string()),
            Color::Magenta => Some("35".to_string()),
            Color::Cyan => Some("36".to_string()),
            Color::BrightBlack => Some("90".to_string()),
            Color::Indexed(n) => Some(format!("38;5;{n}")),
            Color::Rgb { r, g, b } => Some(format!("38;2;{r};{g};{b}")),
        }
    }
}

/// Text attributes for a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    /// Foreground color
    pub fg: Color,
    /// Bold/bright text
    pub bold: bool,
    /// Dimmed text
    pub dim: bool,
    /// Reverse video (swap fg/bg)
    pub reverse: bool,
}

impl Style {
    /// Plain style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the foreground color.
    pub fn fg(mut self, color: Color) -> Self {
        self.fg = color;
        self
    }

    /// Enable bold.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Enable dim.
    pub fn dim(mut self) -> Self {
        self.dim = true;
        self
    }

    /// Enable reverse video.
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Check if the style has no formatting.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    /// SGR escape sequence selecting this style (empty when plain).
    pub fn to_sgr(&self) -> String {
        let mut codes = Vec::new();
        if self.bold {
            codes.push("1".to_string());
        }
        if self.dim {
            codes.push("2".to_string());
        }
        if self.reverse {
            codes.push("7".to_string());
        }
        if let Some(fg) = self.fg.sgr() {
            codes.push(fg);
        }
        if codes.is_empty() {
            String::new()
        } else {
            format!("\x1b[{}m", codes.join(";"))
        }
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Text content (no newlines)
    pub text: String,
    /// Style applied to the text
    pub style: Style,
}

impl Span {
    /// Unstyled span.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::styled(text, Style::default())
    }

    /// Styled span.
    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Width in terminal cells.
    pub fn width(&self) -> usize {
        UnicodeWidthStr::width(self.text.as_str())
    }
}

/// One row of spans.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    /// Spans in display order
    pub spans: Vec<Span>,
}

impl Line {
    /// Empty line.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Line made of one unstyled span.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::from(Span::raw(text))
    }

    /// Line made of one styled span.
    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        Self::from(Span::styled(text, style))
    }

    /// Append a span.
    pub fn push(&mut self, span: Span) {
        self.spans.push(span);
    }

    /// Width in terminal cells.
    pub fn width(&self) -> usize {
        self.spans.iter().map(Span::width).sum()
    }

    /// Text without styling.
    pub fn plain(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Cut the line down to at most `max` terminal cells.
    ///
    /// A wide character that would straddle the limit is dropped whole.
    pub fn truncate(&mut self, max: usize) {
        let mut used = 0;
        let mut keep = 0;
        for span in &mut self.spans {
            keep += 1;
            let width = span.width();
            if used + width <= max {
                used += width;
                continue;
            }
            let mut cut = String::new();
            for c in span.text.chars() {
                let w = c.width().unwrap_or(0);
                if used + w > max {
                    break;
                }
                used += w;
                cut.push(c);
            }
            span.text = cut;
            break;
        }
        self.spans.truncate(keep);
    }

    /// Split multi-line text from an untrusted source into unstyled lines.
    ///
    /// Escape sequences and control characters are removed and tabs are
    /// expanded, so the text cannot move the cursor once drawn.
    pub fn from_text(text: &str) -> Vec<Line> {
        text.split('\n').map(|l| Line::raw(printable(l))).collect()
    }
}

const TAB_STOP: usize = 4;

fn printable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\t' => {
                let col = UnicodeWidthStr::width(out.as_str());
                out.push_str(&" ".repeat(TAB_STOP - col % TAB_STOP));
            }
            '\x1b' => match chars.next() {
                // CSI: parameters up to a final byte in @..~
                Some('[') => {
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: up to BEL or ST
                Some(']') => {
                    while let Some(c) = chars.next() {
                        if c == '\x07' || (c == '\x1b' && chars.next_if_eq(&'\\').is_some()) {
                            break;
                        }
                    }
                }
                _ => {}
            },
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

impl From<Span> for Line {
    fn from(span: Span) -> Self {
        Self { spans: vec![span] }
    }
}

impl From<Vec<Span>> for Line {
    fn from(spans: Vec<Span>) -> Self {
        Self { spans }
    }
}
