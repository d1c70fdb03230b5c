//! # yoshimi-terminal
//!
//! Remote terminal plumbing for the yoshimi SSH form server.
//!
//! This crate provides:
//! - VTE-based decoding of the raw bytes a client terminal sends into keys
//! - Styled text spans and lines
//! - Frame composition (centering) and ANSI encoding
//!
//! ## Architecture
//!
//! This is Layer 1 in the architecture - it depends on yoshimi-core and
//! knows nothing about sessions or SSH.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod frame;
pub mod parser;
pub mod style;

// Re-export commonly used types
pub use frame::{Align, Block, Frame};
pub use parser::InputDecoder;
pub use style::{Color, Line, Span, Style};
