//! Geometry types for terminal sizes and positions.

use crate::{Error, Result};

/// Position in the terminal grid (row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Row index (0-based)
    pub row: u16,
    /// Column index (0-based)
    pub col: u16,
}

impl Position {
    /// Create a new position.
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    /// Origin position (0, 0).
    pub fn origin() -> Self {
        Self { row: 0, col: 0 }
    }
}

/// Dimensions of a terminal in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Number of rows
    pub rows: u16,
    /// Number of columns
    pub cols: u16,
}

impl Dimensions {
    /// Create new dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Build dimensions from the `(cols, rows)` pair an SSH client reports.
    ///
    /// Values wider than `u16` are clamped; a zero side is rejected.
    pub fn from_ssh(cols: u32, rows: u32) -> Result<Self> {
        let clamp = |v: u32| u16::try_from(v).unwrap_or(u16::MAX);
        let dims = Self::new(clamp(rows), clamp(cols));
        if dims.rows == 0 || dims.cols == 0 {
            return Err(Error::InvalidDimensions {
                rows: dims.rows,
                cols: dims.cols,
            });
        }
        Ok(dims)
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.cols, self.rows)
    }
}
