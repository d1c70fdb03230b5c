//! Frame composition and ANSI encoding.
//!
//! A [`Frame`] is a full screen of positioned lines. Frames are always
//! written whole: clear, then every line at its absolute position.

use unicode_width::UnicodeWidthStr;
use yoshimi_core::{Dimensions, Position};

use crate::style::Line;

/// Switch to the alternate screen buffer.
pub const ENTER_ALT_SCREEN: &str = "\x1b[?1049h";
/// Return to the main screen buffer.
pub const LEAVE_ALT_SCREEN: &str = "\x1b[?1049l";
/// Hide the terminal cursor.
pub const HIDE_CURSOR: &str = "\x1b[?25l";
/// Show the terminal cursor.
pub const SHOW_CURSOR: &str = "\x1b[?25h";

const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";
const RESET: &str = "\x1b[0m";

/// Horizontal alignment of lines inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Flush left
    #[default]
    Left,
    /// Centered on the widest line
    Center,
}

/// A group of lines laid out together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    /// Lines top to bottom
    pub lines: Vec<Line>,
    /// Alignment of each line within the block
    pub align: Align,
    /// Trailing lines that survive cropping
    pub footer: usize,
}

impl Block {
    /// Create a block.
    pub fn new(lines: Vec<Line>, align: Align) -> Self {
        Self {
            lines,
            align,
            footer: 0,
        }
    }

    /// Keep the last `footer` lines when the block is cropped.
    pub fn with_footer(mut self, footer: usize) -> Self {
        self.footer = footer;
        self
    }

    /// Crop the block to a terminal.
    ///
    /// Lines past the bottom edge are dropped from the middle so the footer
    /// stays on screen, then every line is cut to the terminal width.
    pub fn fit(&mut self, dims: Dimensions) {
        let rows = usize::from(dims.rows);
        if self.lines.len() > rows {
            let footer = self.footer.min(rows);
            let tail = self.lines.split_off(self.lines.len() - footer);
            self.lines.truncate(rows - footer);
            self.lines.extend(tail);
        }
        for line in &mut self.lines {
            line.truncate(usize::from(dims.cols));
        }
    }

    /// Width of the widest line.
    pub fn width(&self) -> usize {
        self.lines.iter().map(Line::width).max().unwrap_or(0)
    }

    /// Number of lines.
    pub fn height(&self) -> usize {
        self.lines.len()
    }
}

/// A screen of positioned lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    rows: Vec<(Position, Line)>,
}

impl Frame {
    /// Place a block in the middle of a terminal of the given size.
    ///
    /// Without a known size the block is laid out from the top-left corner.
    /// A block larger than the terminal is cropped with [`Block::fit`] and
    /// pinned to the top-left edge.
    pub fn place_center(mut block: Block, size: Option<Dimensions>) -> Self {
        if let Some(dims) = size {
            block.fit(dims);
        }
        let block_width = block.width();
        let (top, left) = match size {
            Some(dims) => (
                (dims.rows as usize).saturating_sub(block.height()) / 2,
                (dims.cols as usize).saturating_sub(block_width) / 2,
            ),
            None => (0, 0),
        };

        let rows = block
            .lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let inset = match block.align {
                    Align::Left => 0,
                    Align::Center => (block_width - line.width()) / 2,
                };
                (Position::new(to_u16(top + i), to_u16(left + inset)), line)
            })
            .collect();

        Self { rows }
    }

    /// Positioned lines.
    pub fn rows(&self) -> &[(Position, Line)] {
        &self.rows
    }

    /// Plain-text rendering, one string per screen row up to the last
    /// non-empty row, padded with spaces to each line's column.
    pub fn to_plain_rows(&self) -> Vec<String> {
        let height = self
            .rows
            .iter()
            .map(|(pos, _)| pos.row as usize + 1)
            .max()
            .unwrap_or(0);
        let mut out = vec![String::new(); height];
        for (pos, line) in &self.rows {
            let row = &mut out[pos.row as usize];
            let used = UnicodeWidthStr::width(row.as_str());
            let col = pos.col as usize;
            if col > used {
                row.push_str(&" ".repeat(col - used));
            }
            row.push_str(&line.plain());
        }
        out
    }

    /// Plain-text rendering joined with newlines.
    pub fn to_plain_text(&self) -> String {
        self.to_plain_rows().join("\n")
    }

    /// Encode the frame as terminal output: clear, then each line at its
    /// position with SGR styling.
    pub fn to_ansi(&self) -> Vec<u8> {
        let mut out = String::from(CLEAR_SCREEN);
        for (pos, line) in &self.rows {
            out.push_str(&format!("\x1b[{};{}H", pos.row + 1, pos.col + 1));
            for span in &line.spans {
                if span.style.is_plain() {
                    out.push_str(&span.text);
                } else {
                    out.push_str(&span.style.to_sgr());
                    out.push_str(&span.text);
                    out.push_str(RESET);
                }
            }
        }
        out.into_bytes()
    }
}

fn to_u16(v: usize) -> u16 {
    u16::try_from(v).unwrap_or(u16::MAX)
}
